use thiserror::Error;

/// Every failure the desk can surface to its caller.
///
/// `Validation` carries exactly one operator-facing message; it is raised before any write is
/// attempted. `Database` is the fatal storage error and is never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Constraint violation, malformed statement or lost connection
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A form field failed a format or existence check
    #[error("{message}")]
    Validation {
        /// The single message shown inline on the active form
        message: String,
    },

    /// A record addressed by id does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. "Apartment"
        entity: &'static str,
        /// The identifier that was looked up
        id: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong while loading configuration
        message: String,
    },

    /// I/O failure on the console or configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for building a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// True when the error is a validation message rather than a fatal failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
