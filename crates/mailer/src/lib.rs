//! Outbound email for the ProMart backend.
//!
//! Every caller treats delivery as best-effort: the workflow catches and logs
//! send failures instead of propagating them. Three backends exist — SMTP for
//! production, a log backend for development, and an in-memory backend for
//! tests — selected through `MailConfig`.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use promart_config::MailConfig;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("message could not be built: {0}")]
    Message(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// A single outbound message, as handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Production backend delivering through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let smtp = config
            .smtp
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("mail.backend is 'smtp' but [mail.smtp] is missing"))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?.port(smtp.port);

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|_| anyhow::anyhow!("invalid mail.from_address {}", config.from_address))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(to.to_owned()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_owned())
            .map_err(|e| MailError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Development backend that only logs the message.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(%to, %subject, body_len = body.len(), "outbound email (log backend)");
        Ok(())
    }
}

/// Test backend that records every message.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent.lock().await.push(OutboundEmail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}

/// Build the configured mailer backend.
pub fn mailer_from_config(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.backend.as_str() {
        "smtp" => Ok(Arc::new(SmtpMailer::from_config(config)?)),
        "log" => Ok(Arc::new(LogMailer)),
        other => anyhow::bail!("unknown mail backend '{other}' (expected 'log' or 'smtp')"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_mailer_records_messages_in_order() {
        let mailer = MemoryMailer::new();

        mailer.send("a@example.com", "First", "one").await.unwrap();
        mailer.send("b@example.com", "Second", "two").await.unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[0].subject, "First");
        assert_eq!(sent[1].body, "two");
    }

    #[tokio::test]
    async fn log_mailer_accepts_any_recipient() {
        let mailer = LogMailer;
        mailer
            .send("anyone@example.com", "Subject", "Body")
            .await
            .unwrap();
    }

    #[test]
    fn mailer_from_config_rejects_unknown_backend() {
        let config = MailConfig {
            backend: "carrier-pigeon".to_string(),
            ..MailConfig::default()
        };
        assert!(mailer_from_config(&config).is_err());
    }

    #[test]
    fn smtp_backend_requires_smtp_section() {
        let config = MailConfig {
            backend: "smtp".to_string(),
            ..MailConfig::default()
        };
        assert!(mailer_from_config(&config).is_err());
    }
}
