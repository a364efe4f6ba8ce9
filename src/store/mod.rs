pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::Result;

/// Persistence boundary for per-site listing baselines. Backends are
/// interchangeable; detection semantics never depend on which one is
/// plugged in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Addresses currently considered present on a site.
    async fn get_known(&self, source: &str) -> Result<HashSet<String>>;

    /// Replace the baseline for a source with exactly the given
    /// addresses. Records that drop out stay around as inactive
    /// history where the backend keeps history at all. An empty
    /// `current` is a no-op, so a glitched extraction can never wipe
    /// a site's baseline.
    async fn set_known(&self, source: &str, current: &[String]) -> Result<()>;

    /// Record a single observation without touching other records.
    async fn upsert_observation(&self, source: &str, address: &str) -> Result<()>;

    /// Deactivate every record for a source that is not in `current`.
    /// A no-op when `current` is empty, so a glitched extraction can
    /// never wipe a whole site.
    async fn mark_inactive_except(&self, source: &str, current: &[String]) -> Result<()>;
}
