use std::fmt::Debug;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{NotificationMessage, SubscriberEmail};
use crate::email_client::{EmailClientError, EmailDelivery};
use crate::routes::error_chain_fmt;

/// Body of `POST /api/notify`.
///
/// Parsed leniently: anything that is not a JSON object with a usable
/// `email` value ends up as an empty address and fails validation.
#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
    #[serde(default)]
    email: Option<Value>,
}

impl NotifyRequest {
    /// Only `application/json` bodies are read; anything else has no email.
    pub fn from_request(headers: &HeaderMap, body: &[u8]) -> Self {
        if !is_json(headers) {
            return Self::default();
        }
        Self::from_body(body)
    }

    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Coerces the `email` value to text; falsy values become `""`.
    pub fn raw_email(&self) -> String {
        match &self.email {
            None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
            Some(value) => coerce_to_string(value),
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map_or(false, |mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        // Arrays join their elements with commas; nulls become empty.
        Value::Array(items) => items
            .iter()
            .map(coerce_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

#[tracing::instrument(
    name = "Notifying a new subscriber",
    skip(delivery, headers, body),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn notify(
    State(delivery): State<Arc<EmailDelivery>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, NotifyError> {
    let request = NotifyRequest::from_request(&headers, &body);
    let email =
        SubscriberEmail::parse(&request.raw_email()).map_err(NotifyError::InvalidEmail)?;
    tracing::Span::current().record("subscriber_email", &tracing::field::display(&email));

    let email_client = match delivery.as_ref() {
        EmailDelivery::Configured(email_client) => email_client,
        EmailDelivery::Unconfigured => return Err(NotifyError::ServiceUnavailable),
    };

    let message = NotificationMessage::subscribed(email, Local::now().date_naive())
        .map_err(NotifyError::TemplateError)?;
    let receipt = email_client.send_email(&message).await?;
    tracing::info!(provider_id = ?receipt.id, "Subscription notification sent");

    Ok(Json(json!({ "ok": true })))
}

pub async fn notify_wrong_method() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Use POST /api/notify" })),
    )
}

#[derive(thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid email address.")]
    InvalidEmail(String),
    #[error("Email service is not configured.")]
    ServiceUnavailable,
    #[error(transparent)]
    ProviderError(#[from] EmailClientError),
    #[error("Internal server error.")]
    TemplateError(#[source] tera::Error),
}

impl Debug for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let status = match &self {
            NotifyError::InvalidEmail(reason) => {
                tracing::info!(reason = %reason, "Rejected notification request");
                StatusCode::BAD_REQUEST
            }
            NotifyError::ServiceUnavailable => {
                tracing::error!("Email delivery requested but the provider is not configured");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            NotifyError::TemplateError(_) => {
                tracing::error!(
                    error.cause_chain = ?self,
                    "Failed to render notification email"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
            NotifyError::ProviderError(e) => {
                tracing::error!(
                    provider.status = ?e.status(),
                    error.cause_chain = ?self,
                    error.message = %self,
                    "Email send error"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
