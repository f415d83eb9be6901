use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::domain::NotificationMessage;

pub const FALLBACK_PROVIDER_MESSAGE: &str = "Failed to send notification email.";

/// Whether the service can send email at all.
///
/// Decided once at start-up: a missing API key or sender address leaves the
/// service running but unable to deliver.
pub enum EmailDelivery {
    Configured(EmailClient),
    Unconfigured,
}

pub struct EmailClient {
    http_client: Client,
    emails_url: Url,
    sender: String,
    api_key: Secret<String>,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryReceipt {
    pub id: Option<String>,
}

#[derive(Default, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
    error: Option<ProviderErrorDetail>,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
}

impl ProviderErrorBody {
    fn into_message(self) -> Option<String> {
        let non_empty = |m: &String| !m.trim().is_empty();

        self.message
            .filter(non_empty)
            .or_else(|| self.error.and_then(|e| e.message).filter(non_empty))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EmailClientError {
    #[error("{}", .message.as_deref().unwrap_or(FALLBACK_PROVIDER_MESSAGE))]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("Failed to send notification email.")]
    Transport(#[source] reqwest::Error),
}

impl EmailClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            EmailClientError::Rejected { status, .. } => Some(*status),
            EmailClientError::Transport(e) => e.status(),
        }
    }
}

impl EmailClient {
    pub fn new(
        base_url: &str,
        sender: String,
        api_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let mut base_url = Url::parse(base_url)?;
        // Without a trailing slash `join` would replace the last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let emails_url = base_url.join("emails")?;

        Ok(Self {
            http_client,
            emails_url,
            sender,
            api_key,
        })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    #[tracing::instrument(
        name = "Delivering email through the provider",
        skip(self, message),
        fields(recipient = %message.recipient)
    )]
    pub async fn send_email(
        &self,
        message: &NotificationMessage,
    ) -> Result<DeliveryReceipt, EmailClientError> {
        let body = SendEmailRequest {
            from: &self.sender,
            to: message.recipient.as_ref(),
            subject: &message.subject,
            html: &message.body_html,
        };

        let response = self
            .http_client
            .post(self.emails_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(EmailClientError::Transport)?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(EmailClientError::Transport)?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&payload).unwrap_or_default());
        }

        let message = serde_json::from_slice::<ProviderErrorBody>(&payload)
            .unwrap_or_default()
            .into_message();

        Err(EmailClientError::Rejected { status, message })
    }
}
