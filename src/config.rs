use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::credential::{CredentialError, Email, Password, PasswordHasher};

pub const DEFAULT_DB_NAME: &str = "CivicResponses";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Invalid {
            var,
            reason: err.to_string(),
        }
    }
}

/// Where the administrator record store lives.
#[derive(Debug)]
pub struct StoreConfig {
    pub db_uri: SecretString,
    pub db_name: String,
}

impl StoreConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_uri = required(&lookup, "DB_URI")?;
        let db_name = optional(&lookup, "DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        Ok(Self {
            db_uri: SecretString::from(db_uri),
            db_name,
        })
    }
}

/// The administrator credential the bootstrap procedure provisions.
#[derive(Debug)]
pub struct AdminConfig {
    pub email: Email,
    pub password: Password,
    pub hasher: PasswordHasher,
}

impl AdminConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let email = Email::parse(&required(&lookup, "ADMIN_EMAIL")?)
            .map_err(|err| ConfigError::invalid("ADMIN_EMAIL", err))?;
        let password = Password::new(SecretString::from(required_raw(&lookup, "ADMIN_PASSWORD")?))
            .map_err(|err| ConfigError::invalid("ADMIN_PASSWORD", err))?;

        let hasher = match optional(&lookup, "BCRYPT_COST") {
            Some(raw) => {
                let cost: u32 = raw
                    .parse()
                    .map_err(|err| ConfigError::invalid("BCRYPT_COST", err))?;
                PasswordHasher::new(cost)
                    .map_err(|err: CredentialError| ConfigError::invalid("BCRYPT_COST", err))?
            }
            None => PasswordHasher::default(),
        };

        Ok(Self {
            email,
            password,
            hasher,
        })
    }
}

/// Backend the console reads from.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ConsoleConfig {
    /// `base_url` comes from `--api-url` / `API_BASE_URL` via clap.
    pub fn from_lookup<F>(base_url: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigError::Missing("API_BASE_URL"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "API_BASE_URL",
                "must start with http:// or https://",
            ));
        }

        let timeout_secs = match optional(&lookup, "API_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|err| ConfigError::invalid("API_TIMEOUT_SECS", err))?,
            None => DEFAULT_API_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "API_TIMEOUT_SECS",
                "must be at least 1 second",
            ));
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Reads from the real process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or(ConfigError::Missing(key))
}

/// Like [`required`] but without trimming; only an empty value is missing.
fn required_raw<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}
