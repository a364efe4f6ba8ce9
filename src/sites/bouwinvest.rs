use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::Tab;
use tracing::{debug, info};

use super::{SiteAdapter, select_texts, tidy};
use crate::config::BouwinvestConfig;
use crate::models::Extraction;
use crate::{Result, WatchError};

const LISTING_TITLE_SELECTOR: &str = "span.h2.fw-book.color-orange";

/// Bouwinvest's public search. No login, but results are paginated,
/// so one extraction walks up to `max_pages` result pages.
pub struct BouwinvestSite {
    search_url: String,
    max_pages: u32,
    action_timeout: Duration,
}

impl BouwinvestSite {
    pub fn new(config: &BouwinvestConfig, action_timeout: Duration) -> Self {
        Self {
            search_url: config.search_url.clone(),
            max_pages: config.max_pages,
            action_timeout,
        }
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}&page={}", self.search_url, page)
    }

    async fn fetch_page(&self, tab: &Tab, page: u32) -> Result<Vec<String>> {
        let url = self.page_url(page);
        debug!(page, "visiting result page");

        tab.navigate_to(&url)
            .map_err(|e| WatchError::Extraction(format!("navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| WatchError::Extraction(format!("page load failed: {}", e)))?;
        tab.wait_for_element_with_custom_timeout(LISTING_TITLE_SELECTOR, self.action_timeout)
            .map_err(|_| WatchError::SiteTimeout {
                what: format!("listing titles on page {}", page),
            })?;

        let html = tab
            .get_content()
            .map_err(|e| WatchError::Extraction(format!("failed to get page content: {}", e)))?;
        Ok(tidy(select_texts(&html, LISTING_TITLE_SELECTOR)?))
    }
}

#[async_trait]
impl SiteAdapter for BouwinvestSite {
    fn name(&self) -> &str {
        "BOUWINVEST"
    }

    async fn extract(&self, tab: &Tab) -> Extraction {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for page in 1..=self.max_pages {
            match self.fetch_page(tab, page).await {
                Ok(addresses) => {
                    for address in addresses {
                        if seen.insert(address.clone()) {
                            items.push(address);
                        }
                    }
                }
                Err(e) => {
                    // Keep what earlier pages yielded; detection still
                    // runs on the partial set
                    return Extraction::failed(items, format!("page {}: {}", page, e));
                }
            }
        }

        info!(count = items.len(), "addresses extracted");
        Extraction::complete(items)
    }
}
