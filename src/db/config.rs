//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric variable
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingRequired("DATABASE_URL"))?;

        let config = Self {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5)?,
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", 600)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", 1800)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/brackets` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/brackets".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Check pool bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS",
                reason: format!(
                    "Must not exceed max connections ({})",
                    self.max_connections
                ),
            });
        }

        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var: key,
            reason: format!("'{value}' is not a valid number"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults_are_valid() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_inverted_pool_bounds() {
        let config = DatabaseConfig {
            min_connections: 30,
            ..DatabaseConfig::development()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS",
                ..
            }
        ));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired("DATABASE_URL");
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
