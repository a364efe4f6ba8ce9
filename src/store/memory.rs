use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;
use crate::store::ResultStore;

/// Volatile baseline store. Nothing survives a restart, so the first
/// cycle after startup re-baselines every site instead of alerting on
/// the whole backlog.
#[derive(Default)]
pub struct MemoryStore {
    known: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn get_known(&self, source: &str) -> Result<HashSet<String>> {
        let known = self.known.read().await;
        Ok(known.get(source).cloned().unwrap_or_default())
    }

    async fn set_known(&self, source: &str, current: &[String]) -> Result<()> {
        if current.is_empty() {
            return Ok(());
        }
        let mut known = self.known.write().await;
        known.insert(source.to_string(), current.iter().cloned().collect());
        Ok(())
    }

    async fn upsert_observation(&self, source: &str, address: &str) -> Result<()> {
        let mut known = self.known.write().await;
        known
            .entry(source.to_string())
            .or_default()
            .insert(address.to_string());
        Ok(())
    }

    async fn mark_inactive_except(&self, source: &str, current: &[String]) -> Result<()> {
        if current.is_empty() {
            return Ok(());
        }
        let mut known = self.known.write().await;
        if let Some(addresses) = known.get_mut(source) {
            addresses.retain(|address| current.contains(address));
        }
        Ok(())
    }
}
