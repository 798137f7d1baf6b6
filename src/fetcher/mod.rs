pub mod http_fetcher;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::ParsedFeed;
use crate::normalizer::Normalizer;

pub use http_fetcher::HttpFetcher;

#[async_trait]
pub trait Fetcher {
    /// GET `url` and return the full response body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// One fetch-and-parse pass over a single feed URL. No retries.
#[derive(Clone)]
pub struct FeedFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
}

impl FeedFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
        }
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed> {
        let body = self.fetcher.fetch(url).await?;
        let feed = self.normalizer.parse(&body)?;
        tracing::debug!("Parsed {} items from {}", feed.items.len(), url);
        Ok(feed)
    }
}
