use std::fmt;
use thiserror::Error;

/// A user token that matched more than one canonical ingredient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousToken {
    pub input: String,
    pub candidates: Vec<String>,
}

impl fmt::Display for AmbiguousToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' matches {}", self.input, self.candidates.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ambiguous ingredients: {}", format_ambiguities(.0))]
    Ambiguity(Vec<AmbiguousToken>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_ambiguities(tokens: &[AmbiguousToken]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => Error::StoreUnavailable(err.to_string()),
            other => Error::QueryFailed(other.to_string()),
        }
    }
}

impl Error {
    /// Whether the process should stop rather than report and continue
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Input(_)
                | Error::StoreUnavailable(_)
                | Error::Migration(_)
                | Error::Io(_)
                | Error::Config(_)
        )
    }

    /// Process exit code for this error when it ends a CLI command
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            2
        } else {
            1
        }
    }

    /// Get a sanitized error message safe for logging
    /// Filters out potentially sensitive information
    pub fn log_safe(&self) -> String {
        match self {
            // Driver messages can carry file paths and connection strings
            Error::StoreUnavailable(_) => "Graph store unavailable".to_string(),
            Error::QueryFailed(_) => "Graph store query failed".to_string(),
            Error::Migration(_) => "Database migration failed".to_string(),
            Error::Io(_) => "File system operation failed".to_string(),

            Error::Input(msg) => format!("Input error: {msg}"),
            Error::Validation(msg) => format!("Validation error: {msg}"),
            Error::Ambiguity(tokens) => format!(
                "Ambiguous ingredients: {}",
                tokens
                    .iter()
                    .map(|t| t.input.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Error::Config(msg) => format!("Configuration error: {msg}"),
            Error::NotFound(msg) => format!("Not found: {msg}"),
        }
    }
}
