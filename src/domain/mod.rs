pub mod feed;
pub mod follow;
pub mod parsed;
pub mod user;

pub use feed::Feed;
pub use follow::{FeedFollow, FeedFollowView};
pub use parsed::{ParsedFeed, ParsedItem};
pub use user::User;
