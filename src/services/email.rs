use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when handing a message to the email transport
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Email API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Outbound email as produced by the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Transport that delivers an email
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSink: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Email sink backed by a Resend-compatible HTTP API
///
/// Posts `{from, to, subject, text, html}` to `{api_url}/emails` with a bearer token.
pub struct HttpEmailSink {
    api_url: String,
    api_key: String,
    from: String,
    client: Client,
}

#[derive(Serialize)]
struct SendEmailPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

impl HttpEmailSink {
    /// Create a new email sink
    pub fn new(
        api_url: String,
        api_key: String,
        from_name: &str,
        from_email: &str,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_url,
            api_key,
            from: format!("{} <{}>", from_name, from_email),
            client,
        })
    }

    /// Formatted "From" header value
    pub fn from_header(&self) -> &str {
        &self.from
    }
}

#[async_trait]
impl EmailSink for HttpEmailSink {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if message.recipients.is_empty() {
            return Err(EmailError::InvalidMessage("no recipients".into()));
        }

        let url = format!("{}/emails", self.api_url.trim_end_matches('/'));
        let payload = SendEmailPayload {
            from: &self.from,
            to: &message.recipients,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(EmailError::Rejected { status, body });
        }

        tracing::debug!("Email sent successfully to {}", message.recipients.join(", "));
        Ok(())
    }
}
