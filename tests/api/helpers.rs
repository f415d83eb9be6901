use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use once_cell::sync::Lazy;
use reqwest::{Client, Method, Response};
use secrecy::Secret;
use tokio::net::TcpListener;
use wiremock::MockServer;

use kao_notify_api::{configuration, startup, telemetry};

pub const TEST_API_KEY: &str = "re_test_key";
pub const TEST_SENDER: &str = "KAO Global <updates@kaoglobal.in>";

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            telemetry::get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        telemetry::initialize_subscriber(subscriber);
    } else {
        let subscriber =
            telemetry::get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        telemetry::initialize_subscriber(subscriber);
    };
});

pub struct App {
    pub address: SocketAddr,
    pub client: Client,
    pub email_server: MockServer,
}

impl App {
    pub async fn new() -> Self {
        App::spawn(true).await
    }

    pub async fn unconfigured() -> Self {
        App::spawn(false).await
    }

    async fn spawn(with_credentials: bool) -> Self {
        Lazy::force(&TRACING);

        // configure listener
        let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to start an test application");
        let address = listener.local_addr().unwrap();

        // run email server
        let email_server = MockServer::start().await;

        // get configuration and point the provider at the mock server
        let mut configuration =
            configuration::get_configuration().expect("Failed to read configuration");
        configuration.email_client.base_url = email_server.uri();
        configuration.email_client.timeout_milliseconds = 2000;
        if with_credentials {
            configuration.email_client.api_key = Some(Secret::new(TEST_API_KEY.to_string()));
            configuration.email_client.sender_email = Some(TEST_SENDER.to_string());
        } else {
            configuration.email_client.api_key = None;
            configuration.email_client.sender_email = None;
        }
        configuration.cors.production_domain = "kaoglobal.in".to_string();

        // configure app state
        let app_state =
            startup::get_app_state(&configuration).expect("Failed to build application state");

        // start a server
        tokio::spawn(startup::run(listener, app_state));

        // provide a reqwest client
        let client = Client::new();

        App {
            address,
            client,
            email_server,
        }
    }
}

impl App {
    pub fn build_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("http://{}{}", self.address, path);

        self.client.request(method, url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.build_request(Method::GET, path)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_health(&self) -> Response {
        self.get("/health").await
    }

    pub async fn post_notify(&self, body: &serde_json::Value) -> Response {
        self.build_request(Method::POST, "/api/notify")
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_notify_raw(&self, body: &'static str) -> Response {
        self.build_request(Method::POST, "/api/notify")
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Body of the single request the provider mock received.
    pub async fn delivered_email(&self) -> serde_json::Value {
        let requests = self.email_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }
}
