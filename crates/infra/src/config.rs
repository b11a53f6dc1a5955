//! Configuration loading
//!
//! Loads application configuration from environment variables.
//!
//! ## Environment Variables
//! - `DAYBRIDGE_DB_PATH`: Database file path
//! - `DAYBRIDGE_DB_POOL_SIZE`: Connection pool size (default 4)
//! - `DAYBRIDGE_LIFELOG_API_KEY`: Lifelog provider API key
//! - `DAYBRIDGE_LIFELOG_BASE_URL`: Lifelog API base URL (default production)
//! - `DAYBRIDGE_GOOGLE_CLIENT_ID`: Google OAuth client id
//! - `DAYBRIDGE_GOOGLE_CLIENT_SECRET`: Google OAuth client secret
//! - `DAYBRIDGE_GOOGLE_REDIRECT_URI`: OAuth redirect URI
//! - `DAYBRIDGE_SYNC_BATCH_SIZE`: Lifelog page size (default 50)

use daybridge_domain::{DaybridgeError, Result};
use serde::Deserialize;

use crate::providers::{DEFAULT_GOOGLE_API_BASE, DEFAULT_GOOGLE_OAUTH_BASE, DEFAULT_LIFELOG_BASE};

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Lifelog provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LifelogConfig {
    pub api_key: String,
    pub base_url: String,
    pub batch_size: u32,
}

/// Google Calendar OAuth settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub api_base_url: String,
    pub oauth_base_url: String,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub lifelog: LifelogConfig,
    pub google: GoogleConfig,
}

/// Load configuration from environment variables.
///
/// # Errors
/// Returns [`DaybridgeError::InvalidInput`] if a required variable is
/// missing or a numeric value does not parse.
pub fn load_from_env() -> Result<Config> {
    let database = DatabaseConfig {
        path: env_var("DAYBRIDGE_DB_PATH")?,
        pool_size: env_parse("DAYBRIDGE_DB_POOL_SIZE", 4)?,
    };

    let lifelog = LifelogConfig {
        api_key: env_var("DAYBRIDGE_LIFELOG_API_KEY")?,
        base_url: env_or("DAYBRIDGE_LIFELOG_BASE_URL", DEFAULT_LIFELOG_BASE),
        batch_size: env_parse("DAYBRIDGE_SYNC_BATCH_SIZE", 50)?,
    };

    let google = GoogleConfig {
        client_id: env_var("DAYBRIDGE_GOOGLE_CLIENT_ID")?,
        client_secret: env_var("DAYBRIDGE_GOOGLE_CLIENT_SECRET")?,
        redirect_uri: env_var("DAYBRIDGE_GOOGLE_REDIRECT_URI")?,
        api_base_url: env_or("DAYBRIDGE_GOOGLE_API_BASE_URL", DEFAULT_GOOGLE_API_BASE),
        oauth_base_url: env_or("DAYBRIDGE_GOOGLE_OAUTH_BASE_URL", DEFAULT_GOOGLE_OAUTH_BASE),
    };

    tracing::info!("configuration loaded from environment variables");
    Ok(Config { database, lifelog, google })
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| DaybridgeError::InvalidInput(format!("missing environment variable {name}")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse(name: &str, default: u32) -> Result<u32> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u32>()
            .map_err(|e| DaybridgeError::InvalidInput(format!("invalid value for {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
