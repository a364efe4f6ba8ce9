use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tokio::sync::Mutex;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::{Result, WatchError};

/// The tab a site keeps across poll cycles, tagged with the browser
/// generation it was created under. A generation mismatch means the
/// browser was relaunched and the tab handle points at a dead process.
pub struct SiteSession {
    source: String,
    tab: Option<Arc<Tab>>,
    generation: u64,
}

impl SiteSession {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tab: None,
            generation: 0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_tab(&self) -> bool {
        self.tab.is_some()
    }
}

struct SessionInner {
    browser: Option<Browser>,
    alive: bool,
    generation: u64,
    tab_count: usize,
}

/// Owns the one shared Chrome process. All liveness checks, tab
/// bookkeeping and recreation run under a single lock, so only one
/// relaunch can ever be in flight.
pub struct BrowserSession {
    inner: Mutex<SessionInner>,
    config: BrowserConfig,
}

fn launch_browser(config: &BrowserConfig) -> Result<Browser> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false) // Often needed in containerized environments
        .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
        .args(vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-setuid-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--ignore-certificate-errors"),
            OsStr::new("--disable-extensions"),
        ])
        .build()
        .map_err(|e| WatchError::Session(format!("failed to assemble launch options: {}", e)))?;

    // Set Chrome path if provided
    if let Some(chrome_path) = &config.chrome_path {
        launch_options.path = Some(PathBuf::from(chrome_path));
    }

    Browser::new(launch_options)
        .map_err(|e| WatchError::Session(format!("failed to launch browser: {}", e)))
}

impl BrowserSession {
    /// A session with no browser process yet. `ensure_alive` performs
    /// the first launch.
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                browser: None,
                alive: false,
                generation: 0,
                tab_count: 0,
            }),
            config,
        }
    }

    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let session = Self::new(config);
        session.ensure_alive().await?;
        Ok(session)
    }

    /// Probe the browser process and relaunch it if it is gone. Safe
    /// to call every cycle; a healthy session costs one version query.
    pub async fn ensure_alive(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.alive {
            let responsive = inner
                .browser
                .as_ref()
                .map(|browser| browser.get_version().is_ok())
                .unwrap_or(false);
            if responsive {
                return Ok(());
            }
            inner.alive = false;
            warn!("browser stopped responding, recreating");
        }

        let attempts = self.config.launch_attempts.max(1);
        let strategy =
            FixedInterval::from_millis(self.config.launch_retry_delay_ms).take(attempts - 1);
        let config = &self.config;
        let browser = Retry::spawn(strategy, || async move { launch_browser(config) }).await?;

        // Tabs from the previous process are gone; bumping the
        // generation tells every site session to recreate its own
        inner.browser = Some(browser);
        inner.alive = true;
        inner.generation += 1;
        inner.tab_count = 0;
        info!(generation = inner.generation, "browser session ready");
        Ok(())
    }

    pub async fn create_tab(&self, site: &mut SiteSession) -> Result<Arc<Tab>> {
        let mut inner = self.inner.lock().await;

        if !inner.alive {
            return Err(WatchError::TabCreation(
                "browser session is not alive".into(),
            ));
        }
        let Some(browser) = inner.browser.as_ref() else {
            return Err(WatchError::TabCreation(
                "browser session not initialized".into(),
            ));
        };

        let tab = browser
            .new_tab()
            .map_err(|e| WatchError::TabCreation(e.to_string()))?;
        tab.set_default_timeout(Duration::from_secs(self.config.action_timeout_secs));

        inner.tab_count += 1;
        site.tab = Some(Arc::clone(&tab));
        site.generation = inner.generation;
        debug!(source = %site.source, tab_count = inner.tab_count, "tab created");
        Ok(tab)
    }

    /// Release a site's tab. Idempotent; tabs from an older browser
    /// generation died with their process and only get dropped.
    pub async fn close_tab(&self, site: &mut SiteSession) {
        let mut inner = self.inner.lock().await;

        if let Some(tab) = site.tab.take() {
            if inner.alive && site.generation == inner.generation {
                let _ = tab.close(true);
                inner.tab_count = inner.tab_count.saturating_sub(1);
                debug!(source = %site.source, tab_count = inner.tab_count, "tab closed");
            }
        }
    }

    /// Hand out the site's tab, recreating it when the browser was
    /// relaunched since the tab was made.
    pub async fn ensure_tab(&self, site: &mut SiteSession) -> Result<Arc<Tab>> {
        self.ensure_alive().await?;

        let generation = { self.inner.lock().await.generation };
        if site.generation != generation && site.tab.is_some() {
            debug!(source = %site.source, "dropping tab from a previous browser generation");
            site.tab = None;
        }

        match &site.tab {
            Some(tab) => Ok(Arc::clone(tab)),
            None => self.create_tab(site).await,
        }
    }

    /// Start the site over with a fresh tab under the current (or a
    /// freshly launched) browser.
    pub async fn recreate_site_session(&self, site: &mut SiteSession) -> Result<Arc<Tab>> {
        self.close_tab(site).await;
        self.ensure_alive().await?;
        self.create_tab(site).await
    }

    /// Flag the session dead so the next `ensure_alive` relaunches.
    pub async fn mark_dead(&self) {
        let mut inner = self.inner.lock().await;
        if inner.alive {
            inner.alive = false;
            warn!("browser session marked dead");
        }
    }

    pub async fn is_alive(&self) -> bool {
        self.inner.lock().await.alive
    }

    pub async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    pub async fn tab_count(&self) -> usize {
        self.inner.lock().await.tab_count
    }

    /// Terminal shutdown. Dropping the handle kills the process.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.alive = false;
        inner.browser = None;
        inner.tab_count = 0;
        info!("browser session closed");
    }
}
