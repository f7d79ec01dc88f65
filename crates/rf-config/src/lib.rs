//! # rf-config
//!
//! Layered runtime settings: built-in defaults, then an optional
//! `config/rusty-forum.{toml,yaml,json}` file, then `RF_*` environment
//! variables (`__` separates nested keys, e.g. `RF_SERVER__PORT=9000`).

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_CONFIG_FILE: &str = "config/rusty-forum";
pub const ENV_PREFIX: &str = "RF";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

/// One API token and the identity it authenticates as.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub user_id: Uuid,
    pub username: String,
    pub token: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

impl Settings {
    /// Loads `.env` (if any) into the process environment, then the layers.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), ".env loaded");
        }
        Self::from_sources(DEFAULT_CONFIG_FILE, Environment::with_prefix(ENV_PREFIX))
    }

    /// Builds settings from an explicit file stem and environment source.
    pub fn from_sources(file: &str, env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:rusty_forum.db")?
            .set_default("database.max_connections", 5)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .add_source(File::with_name(file).required(false))
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if let Some(grant) = self.auth.tokens.iter().find(|g| g.username.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("token grant for {} has an empty username", grant.user_id)));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn test_defaults_apply_without_file_or_env() {
        let settings = Settings::from_sources("does/not/exist", env(&[])).unwrap();
        assert_eq!(settings.bind_addr(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(settings.database.url, "sqlite:rusty_forum.db");
        assert_eq!(settings.log.filter, "info");
        assert!(!settings.log.json);
        assert!(settings.auth.tokens.is_empty());
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        let settings = Settings::from_sources(
            "does/not/exist",
            env(&[("RF_SERVER__PORT", "9000"), ("RF_LOG__JSON", "true")]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert!(settings.log.json);
    }

    #[test]
    fn test_zero_connections_is_rejected() {
        let err = Settings::from_sources(
            "does/not/exist",
            env(&[("RF_DATABASE__MAX_CONNECTIONS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_token_secret_is_redacted_in_debug() {
        let grant = TokenGrant {
            user_id: Uuid::nil(),
            username: "alice".into(),
            token: SecretString::from("hunter2"),
        };
        assert!(!format!("{grant:?}").contains("hunter2"));
        assert_eq!(grant.token.expose_secret(), "hunter2");
    }

    #[test]
    fn test_token_grants_load_from_a_config_file() {
        let toml = r#"
            [[tokens]]
            user_id = "00000000-0000-0000-0000-000000000001"
            username = "alice"
            token = "s3cret"
        "#;
        let auth: AuthSettings = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(auth.tokens.len(), 1);
        assert_eq!(auth.tokens[0].username, "alice");
        assert_eq!(auth.tokens[0].token.expose_secret(), "s3cret");
    }
}
