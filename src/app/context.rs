use std::io::{self, Write};
use std::sync::Arc;

use crate::app::error::Result;
use crate::app::session::Session;
use crate::config::{JsonConfigStore, MemoryConfigStore};
use crate::fetcher::{FeedFetcher, Fetcher, HttpFetcher};
use crate::store::{FeedStore, SqliteStore, UserStore};

/// Shared state handed to every command handler.
pub struct AppContext {
    pub session: Session,
    pub users: Arc<dyn UserStore>,
    pub feeds: Arc<dyn FeedStore>,
    pub feed_fetcher: FeedFetcher,
    /// Where command results are printed. Stdout unless replaced.
    pub out: Box<dyn Write + Send>,
}

impl AppContext {
    /// Wire up the SQLite store and HTTP fetcher described by the config file.
    pub fn new(config_store: JsonConfigStore) -> Result<Self> {
        let config = config_store.config();
        let db_path = config.database_path()?;
        let fetcher = match config.request_timeout() {
            Some(timeout) => HttpFetcher::with_timeout(timeout)?,
            None => HttpFetcher::new()?,
        };

        tracing::debug!("Opening database at {}", db_path.display());
        let store = Arc::new(SqliteStore::new(&db_path)?);

        Ok(Self::from_parts(
            Session::load(Box::new(config_store)),
            store.clone(),
            store,
            Arc::new(fetcher),
        ))
    }

    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);

        Ok(Self::from_parts(
            Session::load(Box::new(MemoryConfigStore::new())),
            store.clone(),
            store,
            Arc::new(HttpFetcher::new()?),
        ))
    }

    pub fn from_parts(
        session: Session,
        users: Arc<dyn UserStore>,
        feeds: Arc<dyn FeedStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        Self {
            session,
            users,
            feeds,
            feed_fetcher: FeedFetcher::new(fetcher),
            out: Box::new(io::stdout()),
        }
    }

    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }
}
