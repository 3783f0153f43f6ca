use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use productdb_common::{Error, Result};
use tracing::warn;

use crate::model::{
    DatabaseConfig, Driver, RetryPolicy, default_database, default_host, default_max_retries,
    default_password, default_port, default_retry_delay_ms, default_user,
};

pub const DB_DRIVER: &str = "DB_DRIVER";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_MAX_RETRIES: &str = "DB_MAX_RETRIES";
pub const DB_RETRY_DELAY_MS: &str = "DB_RETRY_DELAY_MS";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds a [`DatabaseConfig`] from key-value environment settings.
///
/// Every key is optional. Blank values count as unset, and values that fail
/// to parse fall back to their defaults with a warning instead of aborting.
pub struct EnvLoader {
    lookup: Lookup,
}

impl EnvLoader {
    /// Loader backed by the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Load `.env` from the working directory (or a parent) into the
    /// process environment. A missing file is not an error. Runs before
    /// logging is set up, so the caller reports the returned path.
    pub fn load_dotenv() -> Result<Option<PathBuf>> {
        match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(Error::Config(format!("failed to read .env file: {e}"))),
        }
    }

    pub fn load(&self) -> DatabaseConfig {
        let driver = match self.get(DB_DRIVER) {
            Some(raw) => Driver::parse(&raw).unwrap_or_else(|| {
                warn!("unknown {DB_DRIVER} value {raw:?}, using {}", Driver::Postgres);
                Driver::Postgres
            }),
            None => Driver::Postgres,
        };

        let retry = RetryPolicy::new(
            self.parsed(DB_MAX_RETRIES, default_max_retries()),
            Duration::from_millis(self.parsed(DB_RETRY_DELAY_MS, default_retry_delay_ms())),
        );

        DatabaseConfig {
            driver,
            host: self.get(DB_HOST).unwrap_or_else(default_host),
            port: self.parsed(DB_PORT, default_port()),
            database: self.get(DB_NAME).unwrap_or_else(default_database),
            user: self.get(DB_USER).unwrap_or_else(default_user),
            password: self.get(DB_PASSWORD).unwrap_or_else(default_password),
            retry,
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("invalid {key} value {raw:?} ({e}), using default {default}");
                default
            }
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn loader(pairs: &[(&str, &str)]) -> EnvLoader {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvLoader::with_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn load_returns_defaults_when_nothing_is_set() {
        let config = loader(&[]).load();

        assert_eq!(config, DatabaseConfig::default());
        assert_eq!(config.driver, Driver::Postgres);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "productdb");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password, "postgres");
        assert_eq!(config.retry.max_retries, 10);
        assert_eq!(config.retry.delay, Duration::from_millis(5000));
    }

    #[test]
    fn load_reads_every_key() {
        let config = loader(&[
            (DB_HOST, "db.internal"),
            (DB_PORT, "6543"),
            (DB_NAME, "catalog"),
            (DB_USER, "migrator"),
            (DB_PASSWORD, "s3cret"),
            (DB_MAX_RETRIES, "3"),
            (DB_RETRY_DELAY_MS, "250"),
        ])
        .load();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.database, "catalog");
        assert_eq!(config.user, "migrator");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.retry.attempts(), 3);
        assert_eq!(config.retry.delay, Duration::from_millis(250));
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let config = loader(&[
            (DB_PORT, "not-a-port"),
            (DB_MAX_RETRIES, "ten"),
            (DB_RETRY_DELAY_MS, "-5"),
        ])
        .load();

        assert_eq!(config.port, 5432);
        assert_eq!(config.retry.max_retries, 10);
        assert_eq!(config.retry.delay, Duration::from_millis(5000));
    }

    #[test]
    fn non_positive_retry_ceiling_is_kept_but_allows_one_attempt() {
        let config = loader(&[(DB_MAX_RETRIES, "0")]).load();
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.attempts(), 1);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = loader(&[(DB_HOST, "   "), (DB_NAME, "")]).load();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.database, "productdb");
    }

    #[test]
    fn sqlite_driver_uses_database_name_as_path() {
        let config = loader(&[(DB_DRIVER, "sqlite"), (DB_NAME, "/tmp/products.db")]).load();
        assert_eq!(config.driver, Driver::Sqlite);
        assert_eq!(config.sqlite_path(), PathBuf::from("/tmp/products.db"));
        assert_eq!(config.target(), "sqlite:///tmp/products.db");
    }

    #[test]
    fn unknown_driver_falls_back_to_postgres() {
        let config = loader(&[(DB_DRIVER, "oracle")]).load();
        assert_eq!(config.driver, Driver::Postgres);
    }
}
