use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::notify::AlertChannel;
use crate::{Result, WatchError};

/// Plain-text email alerts over SMTP. The transport keeps a
/// connection pool internally, so building it once up front is
/// enough.
pub struct EmailChannel {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|e| WatchError::Alert(format!("invalid from address: {}", e)))?;
        let to: Mailbox = config
            .to_address
            .parse()
            .map_err(|e| WatchError::Alert(format!("invalid to address: {}", e)))?;

        let mut builder = if config.use_tls {
            SmtpTransport::relay(&config.host)
                .map_err(|e| WatchError::Alert(format!("smtp relay setup failed: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        }
        .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn supports_burst(&self) -> bool {
        true
    }

    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| WatchError::Alert(format!("failed to build email: {}", e)))?;

        self.transport
            .send(&email)
            .map_err(|e| WatchError::Alert(format!("smtp send failed: {}", e)))?;
        Ok(())
    }
}
