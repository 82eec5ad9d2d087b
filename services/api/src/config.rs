//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_CORRECTION_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_ENTRY_CHANNEL: &str = "entry_created";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Absent keys are reported per entry by the correction client, not at startup.
    pub gemini_api_key: Option<String>,
    pub llm_base_url: String,
    pub correction_model: String,
    /// Postgres NOTIFY channel announcing new entries.
    pub entry_channel: String,
    /// Shared secret required on the entry-created webhook, when set.
    pub trigger_token: Option<String>,
    pub allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load LLM Settings ---
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty());
        let llm_base_url = var_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL);
        let correction_model = var_or("CORRECTION_MODEL", DEFAULT_CORRECTION_MODEL);

        // --- Load Trigger and Web Settings ---
        let entry_channel = var_or("ENTRY_CHANNEL", DEFAULT_ENTRY_CHANNEL);
        if entry_channel.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ENTRY_CHANNEL".to_string(),
                "channel name must not be empty".to_string(),
            ));
        }
        let trigger_token = lookup("TRIGGER_TOKEN").filter(|token| !token.is_empty());
        let allowed_origin = var_or("ALLOWED_ORIGIN", "http://localhost:3000");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            gemini_api_key,
            llm_base_url,
            correction_model,
            entry_channel,
            trigger_token,
            allowed_origin,
        })
    }
}
