//! services/api/src/error.rs
//!
//! Errors that abort the service during startup.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting the pool failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Binding or serving the HTTP socket failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
