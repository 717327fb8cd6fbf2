use std::fmt;

use crate::error::{AppError, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://cms.db?mode=rwc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub environment: Environment,
    pub database_url: String,
    pub cookie_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so callers
    /// other than the process environment can supply values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let cookie_secret = lookup("COOKIE_SECRET").filter(|s| !s.is_empty());
        if let Some(secret) = &cookie_secret {
            if secret.len() < crate::csrf::MIN_KEY_LEN {
                return Err(AppError::Config(format!(
                    "COOKIE_SECRET must be at least {} bytes",
                    crate::csrf::MIN_KEY_LEN
                )));
            }
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            frontend_url: lookup("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            environment: lookup("NODE_ENV")
                .map(|raw| Environment::parse(&raw))
                .unwrap_or(Environment::Development),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            cookie_secret,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            environment: Environment::Development,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            cookie_secret: None,
        }
    }
}

// Hand-written so the cookie secret never reaches the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("frontend_url", &self.frontend_url)
            .field("environment", &self.environment)
            .field("database_url", &self.database_url)
            .field("cookie_secret", &self.cookie_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.frontend_url, "http://localhost:8080");
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.is_production());
        assert!(config.cookie_secret.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "4000"),
            ("FRONTEND_URL", "https://cms.example.com"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.frontend_url, "https://cms.example.com");
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_port() {
        let result = AppConfig::from_lookup(lookup_from(&[("PORT", "not-a-port")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_short_cookie_secret_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("COOKIE_SECRET", "short")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "COOKIE_SECRET",
            "0123456789abcdef0123456789abcdef",
        )]))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("PORT", "3100");
        std::env::set_var("NODE_ENV", "development");
        let config = AppConfig::from_env().unwrap();
        std::env::remove_var("PORT");
        std::env::remove_var("NODE_ENV");

        assert_eq!(config.port, 3100);
        assert!(!config.is_production());
    }
}
