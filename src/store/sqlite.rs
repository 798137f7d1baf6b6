use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use uuid::Uuid;

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, FeedFollowView, User};
use crate::store::{FeedStore, UserStore};

const USER_COLUMNS: &str = "id, name, created_at, updated_at";
const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at";

const FOLLOW_VIEW_QUERY: &str = "SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
        f.name, f.url, u.name
 FROM feed_follows ff
 JOIN feeds f ON f.id = ff.feed_id
 JOIN users u ON u.id = ff.user_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
        let text: String = row.get(idx)?;
        Uuid::parse_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    /// Timestamps are stored as RFC 3339 text; anything else is a conversion error.
    fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let text: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: Self::uuid_at(row, 0)?,
            name: row.get(1)?,
            created_at: Self::datetime_at(row, 2)?,
            updated_at: Self::datetime_at(row, 3)?,
        })
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: Self::uuid_at(row, 0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: Self::uuid_at(row, 3)?,
            created_at: Self::datetime_at(row, 4)?,
            updated_at: Self::datetime_at(row, 5)?,
        })
    }

    fn follow_view_from_row(row: &Row<'_>) -> rusqlite::Result<FeedFollowView> {
        Ok(FeedFollowView {
            follow: FeedFollow {
                id: Self::uuid_at(row, 0)?,
                user_id: Self::uuid_at(row, 1)?,
                feed_id: Self::uuid_at(row, 2)?,
                created_at: Self::datetime_at(row, 3)?,
                updated_at: Self::datetime_at(row, 4)?,
            },
            feed_name: row.get(5)?,
            feed_url: row.get(6)?,
            user_name: row.get(7)?,
        })
    }

    fn insert_follow(conn: &Connection, follow: &FeedFollow) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                follow.id.to_string(),
                follow.user_id.to_string(),
                follow.feed_id.to_string(),
                follow.created_at.to_rfc3339(),
                follow.updated_at.to_rfc3339()
            ],
        )
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.name,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339()
            ],
        )?;
        tracing::debug!("Created user {}", user.name);
        Ok(())
    }

    fn get_user(&self, name: &str) -> Result<User> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE name = ?1", USER_COLUMNS),
            params![name],
            Self::user_from_row,
        )
        .optional()?
        .ok_or_else(|| GatorError::UserNotFound(name.to_string()))
    }

    fn get_user_by_id(&self, id: Uuid) -> Result<User> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id.to_string()],
            Self::user_from_row,
        )
        .optional()?
        .ok_or_else(|| GatorError::UserNotFound(id.to_string()))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY name",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn reset_users(&self) -> Result<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM users", [])?;
        tracing::info!("Deleted {} users", removed);
        Ok(())
    }
}

impl FeedStore for SqliteStore {
    fn create_feed_and_follow(&self, feed: &Feed, follow: &FeedFollow) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                feed.id.to_string(),
                feed.name,
                feed.url,
                feed.user_id.to_string(),
                feed.created_at.to_rfc3339(),
                feed.updated_at.to_rfc3339()
            ],
        )?;
        Self::insert_follow(&tx, follow)?;

        tx.commit()?;
        tracing::debug!("Created feed {} with follow {}", feed.url, follow.id);
        Ok(())
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeds ORDER BY created_at, name",
            FEED_COLUMNS
        ))?;

        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM feeds WHERE url = ?1", FEED_COLUMNS),
            params![url],
            Self::feed_from_row,
        )
        .optional()?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))
    }

    fn create_feed_follow(&self, follow: &FeedFollow) -> Result<FeedFollowView> {
        let conn = self.lock()?;
        Self::insert_follow(&conn, follow)?;

        let view = conn.query_row(
            &format!("{} WHERE ff.id = ?1", FOLLOW_VIEW_QUERY),
            params![follow.id.to_string()],
            Self::follow_view_from_row,
        )?;

        Ok(view)
    }

    fn feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollowView>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE ff.user_id = ?1 ORDER BY ff.created_at, f.name",
            FOLLOW_VIEW_QUERY
        ))?;

        let follows = stmt
            .query_map(params![user_id.to_string()], Self::follow_view_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn delete_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id.to_string(), feed_id.to_string()],
        )?;

        if removed == 0 {
            return Err(GatorError::NotFollowing(feed_id.to_string()));
        }
        Ok(())
    }
}
