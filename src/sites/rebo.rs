use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::Tab;
use tracing::debug;

use super::{SiteAdapter, eval_string_array, portal_login, tidy};
use crate::config::PortalSiteConfig;
use crate::models::Extraction;
use crate::{Result, WatchError};

const RESULT_LINKS_JS: &str =
    "Array.from(document.querySelectorAll('a.stretched-link')).map(el => el.textContent.trim())";

/// REBO Wonen Huur. The search results live behind an account, so
/// every cycle goes through the shared portal login first.
pub struct ReboSite {
    login_url: String,
    results_url: String,
    username: String,
    password: String,
    action_timeout: Duration,
}

impl ReboSite {
    pub fn new(config: &PortalSiteConfig, username: &str, action_timeout: Duration) -> Self {
        Self {
            login_url: config.login_url.clone(),
            results_url: config.results_url.clone(),
            username: username.to_string(),
            password: config.password.clone(),
            action_timeout,
        }
    }

    async fn fetch_addresses(&self, tab: &Tab) -> Result<Vec<String>> {
        tab.navigate_to(&self.results_url)
            .map_err(|e| WatchError::Extraction(format!("navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| WatchError::Extraction(format!("results page load failed: {}", e)))?;
        tab.wait_for_element_with_custom_timeout("a.stretched-link", self.action_timeout)
            .map_err(|_| WatchError::SiteTimeout {
                what: "search results".to_string(),
            })?;

        let raw = eval_string_array(tab, RESULT_LINKS_JS)?;
        Ok(tidy(raw))
    }
}

#[async_trait]
impl SiteAdapter for ReboSite {
    fn name(&self) -> &str {
        "REBO"
    }

    async fn login(&self, tab: &Tab) -> Result<()> {
        portal_login(
            tab,
            &self.login_url,
            &self.username,
            &self.password,
            self.action_timeout,
        )
        .await
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
