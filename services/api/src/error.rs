//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service.

use crate::config::ConfigError;

/// Errors that can stop the `api` service from starting.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure to apply the schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_on_config() -> Result<(), ApiError> {
        Err(ConfigError::MissingVar("BIND_ADDRESS".to_string()))?;
        Ok(())
    }

    #[test]
    fn startup_errors_keep_their_source_message() {
        let err = fails_on_config().unwrap_err();
        assert!(matches!(err, ApiError::Config(ConfigError::MissingVar(_))));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing the environment variable BIND_ADDRESS"
        );

        let err = ApiError::from(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "address in use",
        ));
        assert_eq!(err.to_string(), "IO error: address in use");
    }
}
