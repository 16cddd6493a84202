use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time;

use crate::domain::recipient_email::RecipientEmail;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub smtp: SmtpSettings,
    pub campaign: CampaignSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS, usually port 587.
    Starttls,
    /// Implicit TLS, usually port 465.
    Tls,
    None,
}

#[derive(serde::Deserialize, Clone)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub username: String,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub app_password: Secret<String>,
    pub sender_email: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub tls: SmtpTls,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_millis: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct CampaignSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub send_interval_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attachment_bytes: usize,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_smtp_sender(&self) -> Result<RecipientEmail, String> {
        self.smtp.get_sender_email()
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }

    pub fn set_send_interval(&mut self, interval: time::Duration) {
        self.campaign.send_interval_millis = interval.as_millis() as u64;
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl SmtpSettings {
    pub fn get_sender_email(&self) -> Result<RecipientEmail, String> {
        RecipientEmail::parse(self.sender_email.clone())
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_millis)
    }
}

impl CampaignSettings {
    pub fn get_send_interval(&self) -> time::Duration {
        time::Duration::from_millis(self.send_interval_millis)
    }

    /// Limit for JSON upload bodies: a base64 attachment grows by a third,
    /// plus room for the recipient list and templates.
    pub fn get_upload_limit(&self) -> usize {
        self.max_attachment_bytes / 3 * 4 + 1024 * 1024
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir()
        .map_err(|err| ConfigError::Message(format!("Failed to determine the current directory: {}", err)))?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_SMTP__APP_PASSWORD would set Settings.smtp.app_password
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    let mut settings: Settings = settings.try_deserialize()?;

    // Hosting platforms hand out the listening port through PORT
    if let Ok(port) = std::env::var("PORT") {
        let port = port
            .parse()
            .map_err(|_| ConfigError::Message(format!("PORT={} is not a valid port", port)))?;
        settings.set_app_port(port);
    }

    Ok(settings)
}
