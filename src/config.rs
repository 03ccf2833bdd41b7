use config::ConfigError;
use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_LOOKUP_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Session cookies
    pub secure_cookies: bool,

    // Identity provider (HS256 access tokens)
    pub auth_jwt_secret: Secret<String>,
    pub auth_jwt_audience: String,

    // Parent/student by-id lookups
    pub lookup_cache_ttl_secs: u64,
}

/// Reads an optional key. Only a missing key yields `None`; a value that
/// fails to parse is still an error.
fn optional<T: DeserializeOwned>(
    source: &config::Config,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match source.get(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let source = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_source(&source)
    }

    pub fn from_source(source: &config::Config) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: source.get("database_url")?,
            host: optional(source, "host")?.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: source.get("port")?,

            secure_cookies: optional(source, "secure_cookies")?.unwrap_or(true),

            auth_jwt_secret: Secret::new(source.get("auth_jwt_secret")?),
            auth_jwt_audience: optional(source, "auth_jwt_audience")?
                .unwrap_or_else(|| "authenticated".to_string()),

            lookup_cache_ttl_secs: optional(source, "lookup_cache_ttl_secs")?
                .unwrap_or(DEFAULT_LOOKUP_CACHE_TTL_SECS),
        })
    }

    pub fn lookup_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.lookup_cache_ttl_secs)
    }
}
