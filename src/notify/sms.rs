use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::TwilioConfig;
use crate::notify::AlertChannel;
use crate::{Result, WatchError};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// SMS alerts through the Twilio Messages API. Kept to single-listing
/// alerts; aggregated bodies do not fit the medium.
pub struct SmsChannel {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    to_number: String,
    api_base: String,
}

impl SmsChannel {
    pub fn new(config: &TwilioConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            to_number: config.to_number.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the channel at a different API host. Tests use this to
    /// talk to a local mock server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl AlertChannel for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    fn supports_burst(&self) -> bool {
        false
    }

    async fn send(&self, _subject: &str, body: &str) -> Result<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", &self.to_number);
        form_body.insert("From", &self.from_number);
        form_body.insert("Body", body);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(WatchError::Alert(format!(
                "twilio returned {}: {}",
                status, error_body
            )));
        }

        let message: Value = response.json().await?;
        debug!(
            sid = message.get("sid").and_then(|v| v.as_str()),
            "sms accepted"
        );
        Ok(())
    }
}
