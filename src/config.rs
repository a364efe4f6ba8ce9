use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub debug_mode: bool,
    pub log_dir: Option<String>,
    pub store: StoreConfig,
    pub browser: BrowserConfig,
    pub poller: PollerConfig,
    pub sites: SitesConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: "data/listings.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub action_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub launch_attempts: usize,
    pub launch_retry_delay_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            action_timeout_secs: 20,
            // Must comfortably outlast one poll interval or the
            // devtools connection drops between cycles
            idle_timeout_secs: 300,
            launch_attempts: 3,
            launch_retry_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    // Shared account name for the portals that require a login
    pub username: String,
    pub rebo: PortalSiteConfig,
    pub vesteda: PortalSiteConfig,
    pub bouwinvest: BouwinvestConfig,
    pub beumer: BeumerConfig,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            rebo: PortalSiteConfig {
                enabled: false,
                login_url: "https://rebowonenhuur.nl/login".to_string(),
                results_url: "https://rebowonenhuur.nl/zoekopdracht/".to_string(),
                password: String::new(),
            },
            vesteda: PortalSiteConfig {
                enabled: false,
                login_url: "https://hurenbij.vesteda.com/login".to_string(),
                results_url: "https://hurenbij.vesteda.com/zoekopdracht/".to_string(),
                password: String::new(),
            },
            bouwinvest: BouwinvestConfig::default(),
            beumer: BeumerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSiteConfig {
    pub enabled: bool,
    pub login_url: String,
    pub results_url: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BouwinvestConfig {
    pub enabled: bool,
    pub search_url: String,
    pub max_pages: u32,
}

impl Default for BouwinvestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: "https://www.wonenbijbouwinvest.nl/huuraanbod?query=Utrecht&range=10&seniorservice=false&order=recent&size=50".to_string(),
            max_pages: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeumerConfig {
    pub enabled: bool,
    pub search_url: String,
}

impl Default for BeumerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: "https://www.beumer.nl/huurwoningen/?search=Utrecht&status%5B0%5D=te-huur"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub smtp: SmtpConfig,
    pub sms: TwilioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: String::new(),
            from_name: "Huurwatch".to_string(),
            to_address: String::new(),
            use_tls: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub enabled: bool,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl AppConfig {
    pub fn load(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let dir = config_dir.unwrap_or("config");

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            // Add environment variables with prefix "HUURWATCH_"
            .add_source(Environment::with_prefix("HUURWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate poller configuration
        if self.poller.interval_secs == 0 {
            return Err(ConfigError::Message(
                "Poller interval_secs must be greater than 0".into(),
            ));
        }

        // Validate browser configuration
        if self.browser.action_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Browser action_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.browser.launch_attempts == 0 {
            return Err(ConfigError::Message(
                "Browser launch_attempts must be greater than 0".into(),
            ));
        }

        if self.browser.idle_timeout_secs <= self.poller.interval_secs {
            return Err(ConfigError::Message(
                "Browser idle_timeout_secs must exceed poller interval_secs".into(),
            ));
        }

        // Validate store configuration
        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_empty() {
            return Err(ConfigError::Message(
                "Store path must be set for the sqlite backend".into(),
            ));
        }

        // Validate site configuration
        if !self.sites.rebo.enabled
            && !self.sites.vesteda.enabled
            && !self.sites.bouwinvest.enabled
            && !self.sites.beumer.enabled
        {
            return Err(ConfigError::Message(
                "At least one site must be enabled".into(),
            ));
        }

        for (name, portal) in [("rebo", &self.sites.rebo), ("vesteda", &self.sites.vesteda)] {
            if !portal.enabled {
                continue;
            }
            if self.sites.username.is_empty() {
                return Err(ConfigError::Message(format!(
                    "Sites username must be set when {} is enabled",
                    name
                )));
            }
            if portal.password.is_empty() {
                return Err(ConfigError::Message(format!(
                    "Password must be set when {} is enabled",
                    name
                )));
            }
            if Url::parse(&portal.login_url).is_err() || Url::parse(&portal.results_url).is_err() {
                return Err(ConfigError::Message(format!("Invalid {} URL", name)));
            }
        }

        if self.sites.bouwinvest.enabled {
            if Url::parse(&self.sites.bouwinvest.search_url).is_err() {
                return Err(ConfigError::Message("Invalid bouwinvest URL".into()));
            }
            if self.sites.bouwinvest.max_pages == 0 {
                return Err(ConfigError::Message(
                    "Bouwinvest max_pages must be greater than 0".into(),
                ));
            }
        }

        if self.sites.beumer.enabled && Url::parse(&self.sites.beumer.search_url).is_err() {
            return Err(ConfigError::Message("Invalid beumer URL".into()));
        }

        // Validate SMTP configuration
        if self.alerts.smtp.enabled {
            if self.alerts.smtp.host.is_empty() {
                return Err(ConfigError::Message(
                    "SMTP host must be set when email alerts are enabled".into(),
                ));
            }
            if self.alerts.smtp.port == 0 {
                return Err(ConfigError::Message(
                    "SMTP port must be greater than 0".into(),
                ));
            }
            if !self.alerts.smtp.from_address.contains('@')
                || !self.alerts.smtp.to_address.contains('@')
            {
                return Err(ConfigError::Message(
                    "SMTP from_address and to_address must be valid addresses".into(),
                ));
            }
        }

        // Validate Twilio configuration
        if self.alerts.sms.enabled {
            if self.alerts.sms.account_sid.is_empty() || self.alerts.sms.auth_token.is_empty() {
                return Err(ConfigError::Message(
                    "Twilio account_sid and auth_token must be set when SMS alerts are enabled"
                        .into(),
                ));
            }
            if self.alerts.sms.from_number.is_empty() || self.alerts.sms.to_number.is_empty() {
                return Err(ConfigError::Message(
                    "Twilio from_number and to_number must be set when SMS alerts are enabled"
                        .into(),
                ));
            }
        }

        Ok(())
    }
}
