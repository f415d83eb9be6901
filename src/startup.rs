use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{FromRef, MatchedPath},
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::configuration::Settings;
use crate::email_client::EmailDelivery;
use crate::origin_policy::{
    cors_layer, preflight_no_content, reject_disallowed_origins, OriginPolicy,
};
use crate::routes::{check_health, method_not_allowed, not_found, notify, notify_wrong_method};

/// Read-only configuration shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub delivery: Arc<EmailDelivery>,
    pub origin_policy: Arc<OriginPolicy>,
}

impl FromRef<AppState> for Arc<EmailDelivery> {
    fn from_ref(state: &AppState) -> Self {
        state.delivery.clone()
    }
}

pub fn get_app_state(configuration: &Settings) -> Result<AppState, anyhow::Error> {
    let delivery = configuration
        .email_client
        .delivery()
        .context("Failed to build the email client")?;
    match &delivery {
        EmailDelivery::Configured(email_client) => {
            tracing::info!(sender = %email_client.sender(), "Email delivery configured")
        }
        EmailDelivery::Unconfigured => tracing::warn!(
            "Email API key or sender address missing; notifications will be refused"
        ),
    }

    let origin_policy = configuration
        .cors
        .policy()
        .context("Failed to build the origin policy")?;

    Ok(AppState {
        delivery: Arc::new(delivery),
        origin_policy: Arc::new(origin_policy),
    })
}

pub async fn run(listener: TcpListener, app_state: AppState) -> Result<(), std::io::Error> {
    let app = router(app_state);

    axum::serve(listener, app).await
}

pub fn router(app_state: AppState) -> Router {
    let origin_policy = app_state.origin_policy.clone();

    Router::new()
        .route("/health", get(check_health).fallback(method_not_allowed))
        .route(
            "/api/notify",
            post(notify).get(notify_wrong_method).fallback(notify_wrong_method),
        )
        .fallback(not_found)
        .with_state(app_state)
        .layer(cors_layer(origin_policy.clone()))
        .layer(from_fn(preflight_no_content))
        .layer(from_fn_with_state(origin_policy, reject_disallowed_origins))
        .layer(
            // Refer to https://github.com/tokio-rs/axum/blob/main/examples/tracing-aka-logging/Cargo.toml
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);
                tracing::info_span!(
                    "Starting HTTP request",
                    method = ?request.method(),
                    path,
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
}
