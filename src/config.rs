//! Process-wide settings, loaded once from the environment at startup.
//!
//! Mirrors the environment-variable surface of the system this worker
//! replaces: DB connection parameters accept either a plaintext password or
//! a secret name to resolve, the object-store bucket and region are
//! required, and the progress callback can be disabled outright for local
//! runs.

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_DEADLINE_SECS: u64 = 14 * 60;
const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Database connection parameters. Accepts either `DB_PASSWORD` directly or
/// `DB_PASSWORD_SECRET_NAME` naming a secret to resolve through whatever
/// secrets backend the deployment uses; resolving the named secret is the
/// caller's responsibility, not this struct's.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub password_secret_name: Option<String>,
}

impl DbSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let database = env::var("DB_NAME").unwrap_or_else(|_| "LoanMaster".to_string());
        let user = env::var("DB_USER").unwrap_or_else(|_| "esizzle_api".to_string());
        let password = env::var("DB_PASSWORD").ok();
        let password_secret_name = env::var("DB_PASSWORD_SECRET_NAME").ok();
        let port = match env::var("DB_PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "DB_PORT",
                value: v,
            })?,
            Err(_) => DEFAULT_DB_PORT,
        };

        Ok(Self {
            host,
            port,
            database,
            user,
            password,
            password_secret_name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db: DbSettings,
    pub bucket_name: String,
    pub region: String,
    pub progress_callback_url: Option<String>,
    pub progress_callbacks_enabled: bool,
    pub callback_timeout: Duration,
    pub default_deadline: Duration,
}

impl Settings {
    /// Load and validate settings from the environment. Fails fast rather
    /// than deep inside a running pipeline on first use of a bad value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db = DbSettings::from_env()?;

        let bucket_name =
            env::var("S3_BUCKET").unwrap_or_else(|_| "esizzle-documents".to_string());
        let region = env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());

        let progress_callback_url = env::var("PROGRESS_CALLBACK_URL")
            .ok()
            .filter(|s| !s.is_empty());

        let progress_callbacks_enabled = match env::var("ENABLE_PROGRESS_CALLBACKS") {
            Ok(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid {
                name: "ENABLE_PROGRESS_CALLBACKS",
                value: v,
            })?,
            Err(_) => true,
        };

        let default_deadline = match env::var("PIPELINE_DEADLINE_SECS") {
            Ok(v) => Duration::from_secs(v.parse().map_err(|_| ConfigError::Invalid {
                name: "PIPELINE_DEADLINE_SECS",
                value: v,
            })?),
            Err(_) => Duration::from_secs(DEFAULT_DEADLINE_SECS),
        };

        if progress_callbacks_enabled && progress_callback_url.is_none() {
            tracing::warn!("ENABLE_PROGRESS_CALLBACKS is true but PROGRESS_CALLBACK_URL is unset; callbacks will be skipped");
        }

        Ok(Self {
            db,
            bucket_name,
            region,
            progress_callback_url,
            progress_callbacks_enabled,
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
            default_deadline,
        })
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
