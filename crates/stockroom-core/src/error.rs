//! Error types for stockroom-core

use thiserror::Error;

/// Result type alias using stockroom-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stockroom-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A live record with the same name already exists
    #[error("{kind} already exists: {name}")]
    DuplicateEntity { kind: &'static str, name: String },

    /// Record not found in the local table
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Remote store could not be reached (transport failure, timeout)
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote store answered with an error status
    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// Remote store accepted the request but its reply could not be decoded
    #[error("Unreadable remote response ({status}): {message}")]
    UnreadableResponse { status: u16, message: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error came from the remote store.
    ///
    /// Remote failures are always recovered locally by leaving the record
    /// pending; they never undo a local write.
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_)
                | Self::RemoteRejected { .. }
                | Self::UnreadableResponse { .. }
        )
    }

    /// The remote store applied the request; only its reply was unusable
    pub const fn is_unreadable_response(&self) -> bool {
        matches!(self, Self::UnreadableResponse { .. })
    }

    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::RemoteRejected {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => Self::RemoteUnavailable(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_are_classified() {
        assert!(Error::RemoteUnavailable("timeout".to_string()).is_remote());
        assert!(Error::RemoteRejected {
            status: 422,
            message: "invalid".to_string()
        }
        .is_remote());
        assert!(!Error::not_found("product", "42").is_remote());
    }

    #[test]
    fn unreadable_reply_is_remote_but_accepted() {
        let error = Error::UnreadableResponse {
            status: 201,
            message: "missing field `id`".to_string(),
        };
        assert!(error.is_remote());
        assert!(error.is_unreadable_response());
        assert!(!Error::RemoteUnavailable("timeout".to_string()).is_unreadable_response());
    }

    #[test]
    fn duplicate_entity_message_names_kind() {
        let error = Error::DuplicateEntity {
            kind: "category",
            name: "Sugar".to_string(),
        };
        assert_eq!(error.to_string(), "category already exists: Sugar");
    }
}
