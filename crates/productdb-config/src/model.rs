use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::loader::EnvLoader;

/// Which database backend the migration tooling talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    /// Single-file database; `DatabaseConfig::database` is the file path.
    Sqlite,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-delay retry budget for establishing the initial connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Configured ceiling. Values below one still allow a single attempt.
    pub max_retries: i64,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: i64, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Number of connection attempts this policy allows, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.clamp(1, u32::MAX as i64) as u32
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay: Duration::from_millis(default_retry_delay_ms()),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub retry: RetryPolicy,
}

impl DatabaseConfig {
    /// Connection target without credentials, safe for logs.
    pub fn target(&self) -> String {
        match self.driver {
            Driver::Postgres => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
            Driver::Sqlite => format!("sqlite://{}", self.database),
        }
    }

    /// Read every `DB_*` setting from the process environment.
    pub fn from_env() -> Self {
        EnvLoader::new().load()
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        EnvLoader::with_lookup(lookup).load()
    }

    pub fn sqlite_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Postgres,
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: default_password(),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

pub(crate) fn default_host() -> String {
    "localhost".to_string()
}

pub(crate) fn default_port() -> u16 {
    5432
}

pub(crate) fn default_database() -> String {
    "productdb".to_string()
}

pub(crate) fn default_user() -> String {
    "postgres".to_string()
}

pub(crate) fn default_password() -> String {
    "postgres".to_string()
}

pub(crate) fn default_max_retries() -> i64 {
    10
}

pub(crate) fn default_retry_delay_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_always_allows_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
        assert_eq!(RetryPolicy::new(-4, Duration::ZERO).attempts(), 1);
        assert_eq!(RetryPolicy::new(3, Duration::ZERO).attempts(), 3);
    }

    #[test]
    fn debug_output_hides_password() {
        let config = DatabaseConfig {
            password: "hunter2".to_string(),
            ..DatabaseConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn target_omits_credentials() {
        let config = DatabaseConfig::default();
        assert_eq!(config.target(), "postgres://postgres@localhost:5432/productdb");
    }

    #[test]
    fn from_lookup_reads_through_the_loader() {
        let config = DatabaseConfig::from_lookup(|key| match key {
            "DB_HOST" => Some("db.internal".to_string()),
            "DB_MAX_RETRIES" => Some("2".to_string()),
            _ => None,
        });
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.retry.attempts(), 2);
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn driver_parse_accepts_aliases() {
        assert_eq!(Driver::parse("PostgreSQL"), Some(Driver::Postgres));
        assert_eq!(Driver::parse(" sqlite3 "), Some(Driver::Sqlite));
        assert_eq!(Driver::parse("mysql"), None);
    }
}
