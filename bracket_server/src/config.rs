//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use archery_bracket::bracket::models::{
    DEFAULT_ARROWS_PER_END, DEFAULT_ENDS_PER_MATCH, MAX_ARROWS_PER_END, MAX_ENDS_PER_MATCH,
};
use archery_bracket::db::DatabaseConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Address the server listens on when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
    8080,
);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration, unused with `in_memory`
    pub database: DatabaseConfig,
    /// Keep brackets in process memory instead of PostgreSQL
    pub in_memory: bool,
    /// JSON file of qualification candidates loaded into the in-memory source
    pub candidates_file: Option<PathBuf>,
    /// Prometheus exporter address; no exporter when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Values applied when a create request leaves them out
    pub bracket_defaults: BracketDefaultsConfig,
    /// Buffered updates per event before slow spectators start lagging
    pub live_channel_capacity: usize,
}

/// Defaults for new brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketDefaultsConfig {
    /// Regulation ends per match
    pub ends_per_match: u32,
    /// Arrows shot per end
    pub arrows_per_end: u32,
}

impl Default for BracketDefaultsConfig {
    fn default() -> Self {
        Self {
            ends_per_match: DEFAULT_ENDS_PER_MATCH,
            arrows_per_end: DEFAULT_ARROWS_PER_END,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory` - Use the in-process store (from CLI args, or `IN_MEMORY=true`)
    /// * `metrics_override` - Optional metrics exporter address (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory: bool,
        metrics_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(addr) => addr,
            None => parse_addr_env("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let metrics_bind = match metrics_override {
            Some(addr) => Some(addr),
            None => parse_addr_env("METRICS_BIND")?,
        };

        let defaults = BracketDefaultsConfig::default();
        let bracket_defaults = BracketDefaultsConfig {
            ends_per_match: parse_env_or("BRACKET_ENDS_PER_MATCH", defaults.ends_per_match),
            arrows_per_end: parse_env_or("BRACKET_ARROWS_PER_END", defaults.arrows_per_end),
        };

        Ok(ServerConfig {
            bind,
            database,
            in_memory: in_memory || parse_env_or("IN_MEMORY", false),
            candidates_file: std::env::var("CANDIDATES_FILE").ok().map(PathBuf::from),
            metrics_bind,
            bracket_defaults,
            live_channel_capacity: parse_env_or("LIVE_CHANNEL_CAPACITY", 64),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ENDS_PER_MATCH).contains(&self.bracket_defaults.ends_per_match) {
            return Err(ConfigError::Invalid {
                var: "BRACKET_ENDS_PER_MATCH".to_string(),
                reason: format!("Must be between 1 and {MAX_ENDS_PER_MATCH}"),
            });
        }

        if !(1..=MAX_ARROWS_PER_END).contains(&self.bracket_defaults.arrows_per_end) {
            return Err(ConfigError::Invalid {
                var: "BRACKET_ARROWS_PER_END".to_string(),
                reason: format!("Must be between 1 and {MAX_ARROWS_PER_END}"),
            });
        }

        if self.live_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "LIVE_CHANNEL_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        if !self.in_memory {
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        } else if self.candidates_file.is_none() {
            log::warn!("In-memory mode without CANDIDATES_FILE: brackets cannot be generated");
        }

        if self.candidates_file.is_some() && !self.in_memory {
            return Err(ConfigError::Invalid {
                var: "CANDIDATES_FILE".to_string(),
                reason: "Only used with the in-memory store".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_addr_env(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{raw}' is not a socket address"),
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: DatabaseConfig::development(),
            in_memory: false,
            candidates_file: None,
            metrics_bind: None,
            bracket_defaults: BracketDefaultsConfig::default(),
            live_channel_capacity: 64,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "SERVER_BIND".to_string(),
            reason: "'nope' is not a socket address".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SERVER_BIND"));
        assert!(msg.contains("nope"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
        assert_eq!(config().bracket_defaults.ends_per_match, DEFAULT_ENDS_PER_MATCH);
    }

    #[test]
    fn test_config_validation_zero_ends() {
        let mut config = config();
        config.bracket_defaults.ends_per_match = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "BRACKET_ENDS_PER_MATCH"));
    }

    #[test]
    fn test_config_validation_zero_arrows() {
        let mut config = config();
        config.bracket_defaults.arrows_per_end = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_oversized_defaults() {
        let mut config = config();
        config.bracket_defaults.arrows_per_end = MAX_ARROWS_PER_END + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "BRACKET_ARROWS_PER_END"));

        config.bracket_defaults.arrows_per_end = MAX_ARROWS_PER_END;
        config.bracket_defaults.ends_per_match = MAX_ENDS_PER_MATCH + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "BRACKET_ENDS_PER_MATCH"));
    }

    #[test]
    fn test_config_validation_metrics_on_server_port() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "METRICS_BIND"));
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let mut config = config();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());

        // pool settings are irrelevant without a database
        config.in_memory = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_candidates_file_requires_in_memory() {
        let mut config = config();
        config.candidates_file = Some(PathBuf::from("rankings.json"));
        assert!(config.validate().is_err());

        config.in_memory = true;
        assert!(config.validate().is_ok());
    }
}
