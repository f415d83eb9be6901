use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::email_client::{EmailClient, EmailDelivery};
use crate::origin_policy::OriginPolicy;

#[derive(Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
    pub cors: CorsSettings,
}

#[derive(Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub sender_email: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// Builds the delivery capability; blank credentials count as missing.
    pub fn delivery(&self) -> Result<EmailDelivery, anyhow::Error> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty());
        let sender = self
            .sender_email
            .as_deref()
            .map(str::trim)
            .filter(|sender| !sender.is_empty());

        match (api_key, sender) {
            (Some(api_key), Some(sender)) => {
                let email_client = EmailClient::new(
                    &self.base_url,
                    sender.to_string(),
                    api_key.clone(),
                    self.timeout(),
                )?;
                Ok(EmailDelivery::Configured(email_client))
            }
            _ => Ok(EmailDelivery::Unconfigured),
        }
    }
}

#[derive(Deserialize)]
pub struct CorsSettings {
    pub production_domain: String,
}

impl CorsSettings {
    pub fn policy(&self) -> Result<OriginPolicy, regex::Error> {
        OriginPolicy::new(&self.production_domain)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = Config::builder()
        .add_source(File::new("configuration.yaml", FileFormat::Yaml))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("application.port", std::env::var("PORT").ok())?
        .set_override_option("email_client.api_key", std::env::var("RESEND_API_KEY").ok())?
        .set_override_option("email_client.sender_email", std::env::var("FROM_EMAIL").ok())?
        .build()?;

    settings.try_deserialize::<Settings>()
}
