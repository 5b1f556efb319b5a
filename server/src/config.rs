use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Outgoing mail settings. Only loaded and reported; nothing is sent.
#[derive(Clone)]
pub struct MailConfig {
    pub server: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub default_sender: Option<String>,
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        self.server.is_some()
    }
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub mail: MailConfig,
    pub log_file: String,
}

impl Config {
    /// Read settings from the process environment. Call `dotenvy::dotenv()`
    /// first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database: DatabaseConfig {
                uri: get("MONGO_URI", "mongodb://localhost:27017/"),
                name: get("MONGO_DB", "dounel_createur"),
            },
            server: ServerConfig {
                host: get("HOST", "0.0.0.0"),
                port: parse(&lookup, "PORT", 5000)?,
            },
            mail: MailConfig {
                server: lookup("MAIL_SERVER").filter(|s| !s.is_empty()),
                port: parse(&lookup, "MAIL_PORT", 587)?,
                username: lookup("MAIL_USERNAME"),
                password: lookup("MAIL_PASSWORD"),
                use_tls: get("MAIL_USE_TLS", "true").eq_ignore_ascii_case("true"),
                default_sender: lookup("MAIL_DEFAULT_SENDER"),
            },
            log_file: get("LOG_FILE", "app.log"),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.database.uri, "mongodb://localhost:27017/");
        assert_eq!(config.database.name, "dounel_createur");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.mail.port, 587);
        assert!(config.mail.use_tls);
        assert!(!config.mail.is_configured());
        assert_eq!(config.log_file, "app.log");
    }

    #[test]
    fn reads_overrides() {
        let config = from_map(&[
            ("MONGO_URI", "mongodb://db:27017/"),
            ("MONGO_DB", "academy"),
            ("PORT", "8080"),
            ("MAIL_SERVER", "smtp.example.com"),
            ("MAIL_USE_TLS", "False"),
        ])
        .unwrap();
        assert_eq!(config.database.uri, "mongodb://db:27017/");
        assert_eq!(config.database.name, "academy");
        assert_eq!(config.server.port, 8080);
        assert!(config.mail.is_configured());
        assert!(!config.mail.use_tls);
    }

    #[test]
    fn rejects_invalid_port() {
        let err = from_map(&[("PORT", "http")]).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }
}
