use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database unreachable after {attempts} attempt(s): {last_error}")]
    ConnectionExhausted { attempts: u32, last_error: String },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("migration {version} failed: {message}")]
    Migration { version: String, message: String },

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("database error: {0}")]
    Database(String),
}

impl Error {
    /// True for failures that happened while reaching the database, as
    /// opposed to failures reported by a live connection.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectionExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn exhausted_message_names_attempts_and_cause() {
        let err = Error::ConnectionExhausted {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "database unreachable after 3 attempt(s): connection refused"
        );
        assert!(err.is_connection());
    }

    #[test]
    fn migration_error_is_not_a_connection_error() {
        let err = Error::Migration {
            version: "002".to_string(),
            message: "relation \"products\" does not exist".to_string(),
        };
        assert!(err.to_string().starts_with("migration 002 failed"));
        assert!(!err.is_connection());
    }
}
