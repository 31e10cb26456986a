//! Process configuration loaded from environment variables.
//!
//! Tier tables are read once at startup and shared read-only afterwards.

use std::env;
use std::path::PathBuf;

use crate::tiers::TierConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string for the activity log
    pub database_url: String,
    /// Bot token; role sync is unavailable without it
    pub discord_token: Option<String>,
    /// Optional JSON file overriding the built-in tier tables
    pub tier_config_path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DATABASE_MAX_CONNECTIONS",
                        reason: format!("expected a positive integer, got {value:?}"),
                    })
                }
            },
            Err(_) => 5,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            discord_token: env::var("DISCORD_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            tier_config_path: env::var("TIER_CONFIG_PATH").ok().map(PathBuf::from),
            max_connections,
        })
    }

    pub fn load_tiers(&self) -> Result<TierConfig, ConfigError> {
        match &self.tier_config_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading tier tables");
                TierConfig::from_json_file(path)
            }
            None => Ok(TierConfig::builtin()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Cannot read tier file: {0}")]
    TierFile(#[from] std::io::Error),

    #[error("Cannot parse tier file: {0}")]
    TierParse(#[from] serde_json::Error),

    #[error("Invalid tier tables: {0}")]
    InvalidTiers(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("DATABASE_URL", "postgres://localhost/practice");
        env::set_var("DISCORD_TOKEN", "  ");
        env::remove_var("TIER_CONFIG_PATH");
        env::remove_var("DATABASE_MAX_CONNECTIONS");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.database_url, "postgres://localhost/practice");
        assert_eq!(config.discord_token, None);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.load_tiers().unwrap(), TierConfig::builtin());
    }

    #[test]
    fn missing_tier_file_is_reported() {
        let config = Config {
            database_url: String::new(),
            discord_token: None,
            tier_config_path: Some(PathBuf::from("/nonexistent/tiers.json")),
            max_connections: 1,
        };
        assert!(matches!(config.load_tiers(), Err(ConfigError::TierFile(_))));
    }
}
