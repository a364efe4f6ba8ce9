use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::Tab;
use tracing::debug;

use super::{SiteAdapter, select_texts, tidy};
use crate::config::BeumerConfig;
use crate::models::Extraction;
use crate::{Result, WatchError};

const CARD_SELECTOR: &str = "div.card-house__content";
const TITLE_SELECTOR: &str = "div.card-house__content h3";

/// Beumer's public rental search, a single unpaginated card grid.
pub struct BeumerSite {
    search_url: String,
    action_timeout: Duration,
}

impl BeumerSite {
    pub fn new(config: &BeumerConfig, action_timeout: Duration) -> Self {
        Self {
            search_url: config.search_url.clone(),
            action_timeout,
        }
    }

    async fn fetch_addresses(&self, tab: &Tab) -> Result<Vec<String>> {
        tab.navigate_to(&self.search_url)
            .map_err(|e| WatchError::Extraction(format!("navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| WatchError::Extraction(format!("page load failed: {}", e)))?;
        tab.wait_for_element_with_custom_timeout(CARD_SELECTOR, self.action_timeout)
            .map_err(|_| WatchError::SiteTimeout {
                what: "listing cards".to_string(),
            })?;

        let html = tab
            .get_content()
            .map_err(|e| WatchError::Extraction(format!("failed to get page content: {}", e)))?;
        Ok(tidy(select_texts(&html, TITLE_SELECTOR)?))
    }
}

#[async_trait]
impl SiteAdapter for BeumerSite {
    fn name(&self) -> &str {
        "BEUMER"
    }

    async fn extract(&self, tab: &Tab) -> Extraction {
        match self.fetch_addresses(tab).await {
            Ok(items) => {
                debug!(count = items.len(), "addresses extracted");
                Extraction::complete(items)
            }
            Err(e) => Extraction::failed(Vec::new(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_titles_parse_from_fixture() {
        let html = r#"
            <html><body>
                <div class="card-house">
                    <div class="card-house__content">
                        <h3>Adriaen van Ostadelaan 18</h3>
                        <p>Utrecht</p>
                    </div>
                </div>
                <div class="card-house">
                    <div class="card-house__content">
                        <h3> Vleutenseweg 210 </h3>
                    </div>
                </div>
            </body></html>
        "#;

        let titles = tidy(select_texts(html, TITLE_SELECTOR).unwrap());
        assert_eq!(
            titles,
            vec!["Adriaen van Ostadelaan 18", "Vleutenseweg 210"]
        );
    }

    #[test]
    fn test_site_name() {
        let site = BeumerSite::new(&BeumerConfig::default(), Duration::from_secs(5));
        assert_eq!(site.name(), "BEUMER");
    }
}
