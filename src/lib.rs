pub mod browser;
pub mod config;
pub mod detector;
pub mod models;
pub mod notify;
pub mod poller;
pub mod sites;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::WatchError;

pub type Result<T> = std::result::Result<T, WatchError>;
