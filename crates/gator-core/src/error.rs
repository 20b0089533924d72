use thiserror::Error;

use crate::feed::FetchError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not connect to database: {0}")]
    StoreConnect(#[source] sqlx::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid polling interval {input:?}: {reason}")]
    InvalidInterval { input: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidFeedUrl(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("No user is logged in, run `gator login <name>` first")]
    NotLoggedIn,
}

pub type Result<T> = std::result::Result<T, Error>;
