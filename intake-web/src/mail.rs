//! Outbound application email via the Brevo transactional API.
//!
//! Reference: https://developers.brevo.com/reference/sendtransacemail
//!
//! ## Flow
//!
//! ```text
//! Application → compose() → NotificationPayload → Mailer::send() → Brevo
//! ```

use std::io;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header::ACCEPT, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::render;
use crate::staging::StagedFile;
use crate::submission::{Application, DocumentKind};
use crate::Config;

const MAX_DETAIL_CHARS: usize = 1000;

/// Errors raised while handing an email to the delivery API.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Transport-level failure: connect, TLS, timeout, body decode.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("delivery API rejected the email with status {status}")]
    Rejected { status: u16, body: String },
}

impl DeliveryError {
    /// Diagnostic detail for the operational log.
    ///
    /// For rejections this is the provider's JSON error body re-serialized
    /// compactly when it parses, otherwise the raw body text.
    pub fn detail(&self) -> String {
        match self {
            DeliveryError::Http(e) => e.to_string(),
            DeliveryError::Rejected { body, .. } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| body.clone());
                detail.chars().take(MAX_DETAIL_CHARS).collect()
            }
        }
    }
}

/// Sender identity shown in the recipient's mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sender {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub email: String,
}

/// A base64-encoded file attached to the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            content: STANDARD.encode(bytes),
        }
    }
}

/// JSON body of `POST /v3/smtp/email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub sender: Sender,
    pub to: Vec<Recipient>,
    pub subject: String,
    pub html_content: String,
    pub attachment: Vec<Attachment>,
}

/// Fixed addressing for every application email.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub sender: Sender,
    pub recipient: Recipient,
}

impl Envelope {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sender: Sender {
                name: config.sender_name.clone(),
                email: config.sender_email.clone(),
            },
            recipient: Recipient {
                email: config.receiver_email.clone(),
            },
        }
    }
}

/// Build the email for a validated application.
///
/// Reads both staged documents fully into memory and base64-encodes them.
pub async fn compose(
    envelope: &Envelope,
    application: &Application,
) -> io::Result<NotificationPayload> {
    let mut attachment = Vec::with_capacity(2);
    for (kind, file) in application.documents() {
        attachment.push(encode_attachment(kind, file).await?);
    }

    Ok(NotificationPayload {
        sender: envelope.sender.clone(),
        to: vec![envelope.recipient.clone()],
        subject: render::email_subject(&application.applicant),
        html_content: render::email_body(&application.applicant),
        attachment,
    })
}

async fn encode_attachment(kind: DocumentKind, file: &StagedFile) -> io::Result<Attachment> {
    let bytes = fs::read(&file.path).await?;
    let name = file
        .original_name
        .clone()
        .unwrap_or_else(|| kind.fallback_filename().to_string());
    Ok(Attachment::from_bytes(name, &bytes))
}

/// Outcome of an accepted email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Provider message id, when the response carried one
    pub message_id: Option<String>,
}

/// Something that can deliver an application email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver the email once. No retries.
    async fn send(&self, payload: &NotificationPayload) -> Result<Delivery, DeliveryError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    message_id: Option<String>,
}

/// [`Mailer`] backed by the Brevo HTTP API.
pub struct BrevoMailer {
    client: Client,
    api_url: Url,
    api_key: String,
}

impl std::fmt::Debug for BrevoMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoMailer")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl BrevoMailer {
    /// Create a mailer with its own HTTP client.
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(
            client,
            config.brevo_api_url.clone(),
            config.brevo_api_key.clone(),
        ))
    }

    /// Create a mailer around an existing client.
    pub fn with_client(client: Client, api_url: Url, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    #[instrument(skip_all, fields(provider = "brevo", attachments = payload.attachment.len()))]
    async fn send(&self, payload: &NotificationPayload) -> Result<Delivery, DeliveryError> {
        let started = Instant::now();

        let response = self
            .client
            .post(self.api_url.clone())
            .header("api-key", &self.api_key)
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id);

        info!(
            status_code = status.as_u16(),
            message_id = message_id.as_deref().unwrap_or(""),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "brevo_email_accepted"
        );

        Ok(Delivery { message_id })
    }
}
