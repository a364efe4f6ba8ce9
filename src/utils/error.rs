use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Tab creation error: {0}")]
    TabCreation(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Timed out waiting for {what}")]
    SiteTimeout { what: String },

    #[error("Alert delivery error: {0}")]
    Alert(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Whether the failing step is worth retrying against the same
    /// browser process. Session failures need a relaunch instead and
    /// everything else points at config or site problems.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WatchError::TabCreation(_) | WatchError::SiteTimeout { .. }
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatchError>;
