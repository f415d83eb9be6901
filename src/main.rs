use anyhow::Context;
use tokio::net::TcpListener;

use kao_notify_api::configuration::get_configuration;
use kao_notify_api::startup::{get_app_state, run};
use kao_notify_api::telemetry::{get_subscriber, initialize_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("kao-notify-api".into(), "info".into(), std::io::stdout);
    initialize_subscriber(subscriber);

    let configuration = get_configuration().context("Failed to read configuration")?;
    let app_state = get_app_state(&configuration)?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server running at http://{}", listener.local_addr()?);

    run(listener, app_state).await?;

    Ok(())
}
