use std::env;

use config::{Environment, File};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How the connector treats STARTTLS on a connection without implicit TLS.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartTlsPolicy {
    #[default]
    Disabled,
    Optional,
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImapCredentials {
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub tls: bool,
    #[serde(default)]
    pub allow_unauthorized_certs: bool,
    #[serde(default)]
    pub start_tls_policy: StartTlsPolicy,
}

fn default_imap_port() -> u16 {
    993
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub imap: ImapCredentials,
    #[serde(default)]
    pub log: LogConfig,
}

impl Settings {
    /// Loads settings from defaults, an optional file, then the environment.
    ///
    /// `RUSTYMAIL_IMAP__HOST` style variables (double underscore between
    /// section and key) override the file, and the bare
    /// `IMAP_*` variables override everything.
    pub fn new(config_path: Option<&str>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder()
            .set_default("imap.host", "localhost")?
            .set_default("imap.port", 993)?
            .set_default("imap.user", "")?
            .set_default("imap.password", "")?
            .set_default("imap.tls", true)?
            .set_default("imap.allow_unauthorized_certs", false)?
            .set_default("imap.start_tls_policy", "disabled")?
            .set_default("log.level", "info")?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("RUSTYMAIL")
                .prefix_separator("_")
                .separator("__")
                .ignore_empty(true),
        );

        let overrides = [
            ("IMAP_HOST", "imap.host"),
            ("IMAP_PORT", "imap.port"),
            ("IMAP_USER", "imap.user"),
            ("IMAP_PASS", "imap.password"),
            ("IMAP_TLS", "imap.tls"),
            ("IMAP_ALLOW_UNAUTHORIZED_CERTS", "imap.allow_unauthorized_certs"),
        ];
        for (var, key) in overrides {
            let Ok(value) = env::var(var) else { continue };
            match var {
                "IMAP_PORT" => match value.parse::<u16>() {
                    Ok(port) => builder = builder.set_override(key, port)?,
                    Err(_) => warn!("Invalid port value in {}: {}", var, value),
                },
                "IMAP_TLS" | "IMAP_ALLOW_UNAUTHORIZED_CERTS" => match value.parse::<bool>() {
                    Ok(flag) => builder = builder.set_override(key, flag)?,
                    Err(_) => warn!("Invalid boolean value in {}: {}", var, value),
                },
                _ => builder = builder.set_override(key, value)?,
            }
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.imap.host.trim().is_empty() {
            return Err(SettingsError::Invalid("imap.host must not be empty".to_string()));
        }
        if self.imap.port == 0 {
            return Err(SettingsError::Invalid("imap.port must not be 0".to_string()));
        }
        Ok(())
    }
}
