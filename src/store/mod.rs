pub mod sqlite;

use uuid::Uuid;

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, FeedFollowView, User};

pub use sqlite::SqliteStore;

pub trait UserStore: Send + Sync {
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, name: &str) -> Result<User>;
    fn get_user_by_id(&self, id: Uuid) -> Result<User>;
    fn list_users(&self) -> Result<Vec<User>>;
    /// Delete every user. Their feeds and follows go with them.
    fn reset_users(&self) -> Result<()>;
}

pub trait FeedStore: Send + Sync {
    /// Insert a feed together with its owner's follow, atomically.
    fn create_feed_and_follow(&self, feed: &Feed, follow: &FeedFollow) -> Result<()>;
    fn list_feeds(&self) -> Result<Vec<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Feed>;
    fn create_feed_follow(&self, follow: &FeedFollow) -> Result<FeedFollowView>;
    fn feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollowView>>;
    fn delete_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<()>;
}
