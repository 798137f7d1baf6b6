use thiserror::Error;

use crate::cli::Arity;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("{command} takes {arity} (usage: {usage})")]
    Argument {
        command: String,
        arity: Arity,
        usage: &'static str,
    },

    #[error("you must be logged in to use this command")]
    NotLoggedIn,

    #[error("failed to get user {name}: {source}")]
    UserResolution {
        name: String,
        #[source]
        source: Box<GatorError>,
    },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("HTTP error: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Not following feed: {0}")]
    NotFollowing(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GatorError>;
