use reqwest::{Method, StatusCode};
use wiremock::{matchers::any, Mock, ResponseTemplate};

use crate::helpers::App;

#[tokio::test]
async fn preflight_from_production_subdomain_is_answered() {
    let app = App::new().await;

    let response = app
        .build_request(Method::OPTIONS, "/api/notify")
        .header("Origin", "https://www.kaoglobal.in")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://www.kaoglobal.in"
    );
    let allowed_methods = response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap();
    assert!(allowed_methods.contains("POST"));
    assert!(response
        .headers()
        .get("access-control-allow-credentials")
        .is_none());
}

#[tokio::test]
async fn preflight_from_localhost_is_answered_on_any_path() {
    let app = App::new().await;

    let response = app
        .build_request(Method::OPTIONS, "/anything")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn preflight_from_unknown_origin_is_rejected_with_403() {
    let app = App::new().await;

    let response = app
        .build_request(Method::OPTIONS, "/api/notify")
        .header("Origin", "https://evil.example.com")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "error": "CORS blocked for this origin." })
    );
}

#[tokio::test]
async fn post_from_unknown_origin_never_reaches_the_provider() {
    let app = App::new().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app
        .build_request(Method::POST, "/api/notify")
        .header("Origin", "http://kaoglobal.in")
        .json(&serde_json::json!({ "email": "user@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_from_allowed_origin_carries_cors_headers() {
    let app = App::new().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .build_request(Method::POST, "/api/notify")
        .header("Origin", "https://kaoglobal.in")
        .json(&serde_json::json!({ "email": "user@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://kaoglobal.in"
    );
}

#[tokio::test]
async fn requests_without_origin_are_allowed() {
    let app = App::new().await;

    let response = app.get_health().await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
