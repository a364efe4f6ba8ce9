pub mod email;
pub mod sms;

pub use email::EmailChannel;
pub use sms::SmsChannel;

use async_trait::async_trait;
use tracing::{error, info};

use crate::Result;

/// One delivery mechanism for alerts. Channels must not panic on
/// delivery failure; the dispatcher logs and moves on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether aggregated multi-listing alerts should go out over
    /// this channel. Short-form channels opt out and only carry
    /// single-listing alerts.
    fn supports_burst(&self) -> bool;

    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Fans one detection out to every configured channel. A channel
/// failure never stops delivery to the remaining channels and never
/// propagates into the poll loop.
pub struct AlertDispatcher {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub async fn send_single(&self, source: &str, address: &str) {
        // The one-listing message doubles as its own subject line
        let message = format!("{}: New address found: {}", source, address);
        for channel in &self.channels {
            self.deliver(channel.as_ref(), &message, &message).await;
        }
    }

    pub async fn send_burst(&self, source: &str, addresses: &[String]) {
        let subject = format!("{}: Multiple new results found!", source);
        let body = format!("{}: New addresses found:\n{}", source, addresses.join("\n"));
        for channel in &self.channels {
            if !channel.supports_burst() {
                continue;
            }
            self.deliver(channel.as_ref(), &subject, &body).await;
        }
    }

    async fn deliver(&self, channel: &dyn AlertChannel, subject: &str, body: &str) {
        match channel.send(subject, body).await {
            Ok(()) => info!(channel = channel.name(), subject, "alert sent"),
            Err(e) => error!(
                channel = channel.name(),
                error = %e,
                "alert delivery failed"
            ),
        }
    }
}
