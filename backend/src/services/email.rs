//! Outbound email delivery.
//!
//! [`HttpMailer`] posts to a transactional email API
//! (`POST {api_url}` with a bearer key and `{from, to, subject, html}`).
//! [`LocalMailer`] keeps messages in memory for tests and local runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::EmailSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email transport error: {0}")]
    Transport(String),

    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Email sender not configured: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for EmailError {
    fn from(err: reqwest::Error) -> Self {
        EmailError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message. Any error counts as a failed delivery.
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Serialize)]
struct SendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// reqwest-backed sender for the configured email API.
#[derive(Clone, Debug)]
pub struct HttpMailer {
    client: Client,
    settings: EmailSettings,
}

impl HttpMailer {
    pub fn new(settings: EmailSettings) -> Result<Self, EmailError> {
        if settings.api_url.trim().is_empty() {
            return Err(EmailError::Configuration("email.api_url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &EmailSettings {
        &self.settings
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.settings.api_key.is_empty() {
            return Err(EmailError::Configuration("email.api_key is empty".to_string()));
        }

        let payload = SendPayload {
            from: &self.settings.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

/// In-memory sender. Records delivered messages; addresses registered with
/// [`LocalMailer::fail_for`] are rejected.
#[derive(Default)]
pub struct LocalMailer {
    delivered: RwLock<Vec<EmailMessage>>,
    failing: RwLock<HashSet<String>>,
    attempts: RwLock<u64>,
}

impl LocalMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: impl Into<String>) {
        self.failing.write().insert(address.into());
    }

    /// Successfully delivered messages, in send order.
    pub fn delivered(&self) -> Vec<EmailMessage> {
        self.delivered.read().clone()
    }

    /// Number of send calls, including rejected ones.
    pub fn attempts(&self) -> u64 {
        *self.attempts.read()
    }
}

#[async_trait]
impl EmailSender for LocalMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        *self.attempts.write() += 1;
        if self.failing.read().contains(&message.to) {
            return Err(EmailError::Rejected {
                status: 422,
                body: format!("recipient {} rejected", message.to),
            });
        }
        self.delivered.write().push(message.clone());
        Ok(())
    }
}
