//! Configuration module for environment variable parsing.
//!
//! All settings are flat key/value pairs read once at start-up. The resulting
//! [`Config`] is handed to the web layer explicitly; handlers never touch the
//! process environment.

use std::env;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Default Brevo transactional email endpoint.
pub const DEFAULT_BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Default display name used as the email sender.
pub const DEFAULT_SENDER_NAME: &str = "Hanuman Finance";

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// The delivery endpoint is not an http(s) URL.
    #[error("invalid URL in {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Address the application emails are sent from
    pub sender_email: String,

    /// Display name shown as the sender
    pub sender_name: String,

    /// Address that receives the application emails
    pub receiver_email: String,

    /// Brevo API key, sent in the `api-key` header
    pub brevo_api_key: String,

    /// Brevo transactional email endpoint
    pub brevo_api_url: Url,

    /// Directory where uploads are staged for the duration of a request
    pub upload_dir: PathBuf,

    /// Directory served for unmatched paths (form, thank-you page, assets)
    pub public_dir: PathBuf,

    /// Upper bound on a submission's request body
    pub max_body_bytes: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .field("receiver_email", &self.receiver_email)
            .field("brevo_api_key", &"[REDACTED]")
            .field("brevo_api_url", &self.brevo_api_url.as_str())
            .field("upload_dir", &self.upload_dir)
            .field("public_dir", &self.public_dir)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = optional(&lookup, "BREVO_API_URL")
            .unwrap_or_else(|| DEFAULT_BREVO_API_URL.to_string());
        let brevo_api_url = parse_http_url("BREVO_API_URL", &raw_url)?;

        Ok(Config {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),

            sender_email: required(&lookup, "SENDER_EMAIL")?,

            sender_name: optional(&lookup, "SENDER_NAME")
                .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),

            receiver_email: required(&lookup, "RECEIVER_EMAIL")?,

            brevo_api_key: required(&lookup, "BREVO_API_KEY")?,

            brevo_api_url,

            upload_dir: optional(&lookup, "UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),

            public_dir: optional(&lookup, "PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),

            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
        })
    }
}

/// Read a variable, treating blank values as unset.
fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

/// Parse a numeric variable, falling back to the default on absence or garbage.
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    let Some(raw) = optional(lookup, name) else {
        return default;
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

fn parse_http_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: raw.to_string(),
        }),
    }
}
