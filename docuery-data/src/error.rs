//! Failure taxonomy for the backend contract.
//!
//! Every variant carries the human-readable message shown to the user. The
//! variants only differ by which operation failed.

use thiserror::Error;

/// Failure of one of the four backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// `POST /documents/upload` failed or returned no metadata
    #[error("{0}")]
    Upload(String),
    /// `DELETE /documents` or `DELETE /documents/{id}` failed
    #[error("{0}")]
    Delete(String),
    /// `POST /chat` failed
    #[error("{0}")]
    Chat(String),
}

impl ApiError {
    /// The message carried by this failure, whatever the operation.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Upload(message) | ApiError::Delete(message) | ApiError::Chat(message) => {
                message
            }
        }
    }

    /// Short operation label used in log lines.
    pub fn operation(&self) -> &'static str {
        match self {
            ApiError::Upload(_) => "upload",
            ApiError::Delete(_) => "delete",
            ApiError::Chat(_) => "chat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_the_message() {
        let err = ApiError::Chat("Index is still warming up".to_string());
        assert_eq!(err.to_string(), "Index is still warming up");
        assert_eq!(err.message(), "Index is still warming up");
        assert_eq!(err.operation(), "chat");
    }
}
