use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkymarkError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid signing secret: {0}")]
    Secret(#[from] hex::FromHexError),

    #[error("Bluesky request failed ({status}): {message}")]
    Bsky { status: u16, message: String },

    #[error("Sign-in requires the one-time code emailed to the account")]
    AuthFactorRequired,

    #[error("Sign-in rate limited, retry in about {minutes} minutes")]
    RateLimitedLogin { minutes: i64 },

    #[error("Expired session token")]
    ExpiredSession,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not a feed post record: {0}")]
    UnsupportedPostKind(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SkymarkError>;
