use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const ORIGIN_REJECTED: &str = "CORS blocked for this origin.";

static LOOPBACK_ORIGIN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^http://(localhost|127\.0\.0\.1)(:\d+)?$")
        .case_insensitive(true)
        .build()
        .expect("valid loopback origin pattern")
});

/// Decides which browser origins may call the API.
///
/// Requests without an `Origin` header are not cross-origin and always pass.
pub struct OriginPolicy {
    production_origin: Regex,
}

impl OriginPolicy {
    pub fn new(production_domain: &str) -> Result<Self, regex::Error> {
        let production_origin = RegexBuilder::new(&format!(
            r"^https://([a-z0-9-]+\.)*{}$",
            regex::escape(production_domain)
        ))
        .case_insensitive(true)
        .build()?;

        Ok(Self { production_origin })
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => {
                self.production_origin.is_match(origin) || LOOPBACK_ORIGIN.is_match(origin)
            }
        }
    }

    fn is_allowed_header(&self, origin: Option<&HeaderValue>) -> bool {
        match origin {
            None => true,
            // Non-ASCII origins cannot match either pattern.
            Some(value) => value.to_str().map_or(false, |o| self.is_allowed(Some(o))),
        }
    }
}

pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _request| {
            policy.is_allowed_header(Some(origin))
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Answers successful preflights with 204 instead of the CORS layer's 200.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = next.run(request).await;
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Turns requests from disallowed origins into a 403 before routing.
pub async fn reject_disallowed_origins(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(header::ORIGIN);

    if policy.is_allowed_header(origin) {
        return next.run(request).await;
    }

    tracing::warn!(origin = ?origin, "Rejected request from disallowed origin");

    (StatusCode::FORBIDDEN, Json(json!({ "error": ORIGIN_REJECTED }))).into_response()
}
