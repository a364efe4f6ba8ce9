use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::Result;
use crate::models::Extraction;
use crate::notify::AlertDispatcher;
use crate::store::ResultStore;

/// Per-site detection state. Owned by the poll loop and handed in by
/// reference each cycle; nothing here is shared across sites.
#[derive(Debug, Clone)]
pub struct SourceState {
    pub source: String,
    /// Burst candidates from the previous cycle, waiting for a second
    /// sighting before an alert goes out.
    pub pending: Vec<String>,
}

impl SourceState {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pending: Vec::new(),
        }
    }
}

/// What one detection cycle concluded for a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Unchanged,
    Fresh(String),
    /// Two or more new listings at once. Held back one cycle because
    /// multi-listing jumps are usually a site glitch, not real supply.
    BurstHeld(Vec<String>),
    /// The burst reproduced on the next cycle and was alerted.
    Burst(Vec<String>),
}

/// De-duplicate, keeping the first occurrence of each item in order.
fn dedupe(items: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Items in `current` that are not in the known baseline, in the
/// order the site listed them.
fn new_listings(current: &[String], known: &HashSet<String>) -> Vec<String> {
    current
        .iter()
        .filter(|item| !known.contains(item.as_str()))
        .cloned()
        .collect()
}

/// Diffs each extraction against the stored baseline and decides
/// whether to alert. One instance serves every site; all per-site
/// state lives in `SourceState`.
pub struct ChangeDetector {
    store: Arc<dyn ResultStore>,
    dispatcher: AlertDispatcher,
    debug: bool,
}

impl ChangeDetector {
    pub fn new(store: Arc<dyn ResultStore>, dispatcher: AlertDispatcher, debug: bool) -> Self {
        Self {
            store,
            dispatcher,
            debug,
        }
    }

    pub async fn process(
        &self,
        state: &mut SourceState,
        extraction: &Extraction,
    ) -> Result<Classification> {
        let current = dedupe(&extraction.items);
        let known = self.store.get_known(&state.source).await?;
        let new_items = new_listings(&current, &known);
        let had_pending = !state.pending.is_empty();

        let classification = match new_items.len() {
            0 => {
                info!("no new listings");
                state.pending.clear();
                Classification::Unchanged
            }
            1 => {
                let address = &new_items[0];
                warn!(address = %address, "new listing found");
                if self.debug {
                    debug!("debug mode, alert suppressed");
                } else {
                    self.dispatcher.send_single(&state.source, address).await;
                }
                state.pending.clear();
                Classification::Fresh(address.clone())
            }
            count if !had_pending => {
                warn!(count, "multiple new listings, holding for one cycle");
                state.pending = new_items.clone();
                Classification::BurstHeld(new_items)
            }
            count => {
                warn!(count, "burst reproduced, sending aggregated alert");
                if self.debug {
                    debug!("debug mode, alert suppressed");
                } else {
                    self.dispatcher.send_burst(&state.source, &new_items).await;
                }
                state.pending.clear();
                Classification::Burst(new_items)
            }
        };

        // A held burst diffs against the same baseline next cycle. A
        // failed or empty extraction carries no information about what
        // disappeared, so it never shrinks the baseline either.
        let held = matches!(classification, Classification::BurstHeld(_));
        if held || !extraction.succeeded() || current.is_empty() {
            debug!(
                held,
                succeeded = extraction.succeeded(),
                "baseline update skipped"
            );
        } else {
            self.store.set_known(&state.source, &current).await?;
        }

        Ok(classification)
    }
}
