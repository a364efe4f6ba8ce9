use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::browser::{BrowserSession, SiteSession};
use crate::detector::{ChangeDetector, SourceState};
use crate::sites::SiteAdapter;
use crate::Result;

/// Everything one site carries between cycles: its adapter, its tab
/// and its detection state.
struct SiteRunner {
    adapter: Box<dyn SiteAdapter>,
    session: SiteSession,
    state: SourceState,
}

/// Drives the watch loop: one shared browser, sequential site visits,
/// a fixed cadence. A site failing never takes the cycle down with it.
pub struct Poller {
    browser: Arc<BrowserSession>,
    detector: ChangeDetector,
    sites: Vec<SiteRunner>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        browser: Arc<BrowserSession>,
        detector: ChangeDetector,
        adapters: Vec<Box<dyn SiteAdapter>>,
        interval: Duration,
    ) -> Self {
        let sites = adapters
            .into_iter()
            .map(|adapter| {
                let source = adapter.name().to_string();
                SiteRunner {
                    session: SiteSession::new(source.clone()),
                    state: SourceState::new(source),
                    adapter,
                }
            })
            .collect();

        Self {
            browser,
            detector,
            sites,
            interval,
        }
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Visit every site once. A dead browser skips the whole cycle;
    /// the next one retries the launch.
    pub async fn run_cycle(&mut self) {
        if let Err(e) = self.browser.ensure_alive().await {
            error!(error = %e, "browser unavailable, skipping cycle");
            return;
        }

        for runner in &mut self.sites {
            let span = info_span!("site", source = runner.adapter.name());
            if let Err(e) = Self::visit_site(&self.browser, &self.detector, runner)
                .instrument(span)
                .await
            {
                error!(source = runner.adapter.name(), error = %e, "site visit failed");
                if e.is_retryable() {
                    // A retryable failure usually means the tab died;
                    // set up a fresh one so the next cycle starts clean
                    if let Err(e) = self
                        .browser
                        .recreate_site_session(&mut runner.session)
                        .await
                    {
                        warn!(error = %e, "could not recreate site session");
                    }
                }
            }
        }
    }

    async fn visit_site(
        browser: &BrowserSession,
        detector: &ChangeDetector,
        runner: &mut SiteRunner,
    ) -> Result<()> {
        info!("start");
        let tab = browser.ensure_tab(&mut runner.session).await?;

        runner.adapter.login(&tab).await?;

        let extraction = runner.adapter.extract(&tab).await;
        if let Some(extraction_error) = &extraction.error {
            warn!(error = %extraction_error, "extraction failed");
        }

        detector.process(&mut runner.state, &extraction).await?;

        if extraction.error.is_some() {
            // A wedged page tends to stay wedged; drop the tab and let
            // the next cycle start the site over
            browser.close_tab(&mut runner.session).await;
        }
        Ok(())
    }

    /// Poll forever. Cycles that overrun the cadence delay the next
    /// tick instead of bunching up.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            debug!("poll cycle starting");
            self.run_cycle().await;
        }
    }
}
