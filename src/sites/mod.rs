pub mod beumer;
pub mod bouwinvest;
pub mod rebo;
pub mod vesteda;

pub use beumer::BeumerSite;
pub use bouwinvest::BouwinvestSite;
pub use rebo::ReboSite;
pub use vesteda::VestedaSite;

use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::Tab;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::models::Extraction;
use crate::{Result, WatchError};

/// One watched rental site. Adapters never talk to the store or the
/// alert channels; they turn a tab into a list of addresses.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Upper-case source tag, also the key listings are stored under.
    fn name(&self) -> &str;

    /// Bring the tab into a state where `extract` can run. Sites
    /// without an account area keep the default no-op.
    async fn login(&self, _tab: &Tab) -> Result<()> {
        Ok(())
    }

    /// Pull the current listing addresses out of the page. Failures
    /// are encoded in the returned `Extraction`, keeping any items
    /// collected before the error.
    async fn extract(&self, tab: &Tab) -> Extraction;
}

/// Instantiate the enabled sites in a fixed visit order.
pub fn from_config(config: &AppConfig) -> Vec<Box<dyn SiteAdapter>> {
    let action_timeout = Duration::from_secs(config.browser.action_timeout_secs);
    let mut adapters: Vec<Box<dyn SiteAdapter>> = Vec::new();

    if config.sites.rebo.enabled {
        adapters.push(Box::new(ReboSite::new(
            &config.sites.rebo,
            &config.sites.username,
            action_timeout,
        )));
    }
    if config.sites.vesteda.enabled {
        adapters.push(Box::new(VestedaSite::new(
            &config.sites.vesteda,
            &config.sites.username,
            action_timeout,
        )));
    }
    if config.sites.bouwinvest.enabled {
        adapters.push(Box::new(BouwinvestSite::new(
            &config.sites.bouwinvest,
            action_timeout,
        )));
    }
    if config.sites.beumer.enabled {
        adapters.push(Box::new(BeumerSite::new(&config.sites.beumer, action_timeout)));
    }

    adapters
}

/// Evaluate a JS expression that yields a boolean.
pub(crate) fn eval_bool(tab: &Tab, js: &str) -> Result<bool> {
    let result = tab
        .evaluate(js, false)
        .map_err(|e| WatchError::Extraction(format!("script evaluation failed: {}", e)))?;
    Ok(matches!(result.value, Some(serde_json::Value::Bool(true))))
}

/// Evaluate a JS expression yielding an array of strings. The array
/// is stringified inside the page because the DevTools protocol only
/// returns primitives by value.
pub(crate) fn eval_string_array(tab: &Tab, expression: &str) -> Result<Vec<String>> {
    let js = format!("JSON.stringify({})", expression);
    let result = tab
        .evaluate(&js, false)
        .map_err(|e| WatchError::Extraction(format!("script evaluation failed: {}", e)))?;

    let Some(serde_json::Value::String(payload)) = result.value else {
        return Err(WatchError::Extraction(
            "script did not return a string payload".into(),
        ));
    };
    serde_json::from_str(&payload).map_err(WatchError::from)
}

/// Collect the text of every element matching a CSS selector from a
/// raw HTML document.
pub(crate) fn select_texts(html: &str, selector: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let css_selector = Selector::parse(selector).map_err(|e| {
        WatchError::Extraction(format!("invalid CSS selector '{}': {:?}", selector, e))
    })?;

    Ok(document
        .select(&css_selector)
        .map(|element| {
            element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string()
        })
        .collect())
}

/// Trim every entry and drop the blanks.
pub(crate) fn tidy(raw: Vec<String>) -> Vec<String> {
    raw.iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

const ALREADY_LOGGED_IN_JS: &str = r#"
    Array.from(document.querySelectorAll('div.alert')).some(
        alert => alert.innerText.includes('Welkom, je bent reeds ingelogd.')
    )
"#;

const CLICK_LOGIN_BUTTON_JS: &str = r#"
    (function() {
        const result = document.evaluate(
            "//button[contains(text(), 'Inloggen')]",
            document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null
        );
        const button = result.singleNodeValue;
        if (!button) { return false; }
        button.click();
        return true;
    })()
"#;

const LOGIN_CONFIRMED_JS: &str = "document.body.innerText.includes('Welkom')";

/// The shared account-portal login flow. Skips straight through when
/// the session cookie is still valid.
pub(crate) async fn portal_login(
    tab: &Tab,
    login_url: &str,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<()> {
    tab.navigate_to(login_url)
        .map_err(|e| WatchError::Extraction(format!("navigation to login page failed: {}", e)))?;
    tab.wait_until_navigated()
        .map_err(|e| WatchError::Extraction(format!("login page load failed: {}", e)))?;

    if eval_bool(tab, ALREADY_LOGGED_IN_JS)? {
        debug!("already logged in");
        return Ok(());
    }

    info!("logging in");
    let email_input = tab
        .wait_for_element_with_custom_timeout(r#"input[name="txtEmail"]"#, timeout)
        .map_err(|_| WatchError::SiteTimeout {
            what: "login form".to_string(),
        })?;
    email_input
        .type_into(username)
        .map_err(|e| WatchError::Authentication(format!("could not enter username: {}", e)))?;

    let password_input = tab
        .find_element(r#"input[name="txtWachtwoord"]"#)
        .map_err(|e| WatchError::Authentication(format!("password field not found: {}", e)))?;
    password_input
        .type_into(password)
        .map_err(|e| WatchError::Authentication(format!("could not enter password: {}", e)))?;

    if !eval_bool(tab, CLICK_LOGIN_BUTTON_JS)? {
        return Err(WatchError::Authentication(
            "login button not found".to_string(),
        ));
    }

    // The portal redirects after a successful login; poll for the
    // welcome text until the action deadline
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if eval_bool(tab, LOGIN_CONFIRMED_JS)? {
            info!("login confirmed");
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(WatchError::Authentication(
                "welcome message not found after login".to_string(),
            ));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
