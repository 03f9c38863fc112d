//! Domain errors shared by the settings store, the node registry and the
//! command handlers that consume them.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reading or changing bot configuration
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("This panel is no longer active")]
    SessionClosed,

    #[error("Slow down, try again in {:.1}s", .0.as_secs_f64())]
    Cooldown(Duration),
}

/// Result type for configuration operations
pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    /// Only backend I/O failures are worth retrying; everything else needs different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BotError::BackendUnavailable(_))
    }

    /// The text shown to the user in the reply to the triggering command.
    pub fn user_message(&self) -> String {
        match self {
            BotError::BackendUnavailable(_) => {
                "Something went wrong while talking to the backend, please try again later."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for BotError {
    fn from(err: rusqlite::Error) -> Self {
        BotError::BackendUnavailable(format!("settings database: {err}"))
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::BackendUnavailable(format!("malformed document: {err}"))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::BackendUnavailable(format!("audio node: {err}"))
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::BackendUnavailable(format!("filesystem: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_backend_errors_are_retryable() {
        assert!(BotError::BackendUnavailable("db".into()).is_retryable());
        assert!(!BotError::Validation("volume".into()).is_retryable());
        assert!(!BotError::Conflict("node".into()).is_retryable());
        assert!(!BotError::NotFound("node".into()).is_retryable());
        assert!(!BotError::SessionClosed.is_retryable());
        assert!(!BotError::Cooldown(Duration::from_secs(2)).is_retryable());
    }

    #[test]
    fn test_backend_failure_hides_details_from_users() {
        let err = BotError::BackendUnavailable("disk I/O error at /var/lib".into());
        assert!(!err.user_message().contains("/var/lib"));

        let err = BotError::NotFound("Node `main` was not found".into());
        assert_eq!(err.user_message(), "Not found: Node `main` was not found");
    }

    #[test]
    fn test_cooldown_message_shows_remaining_time() {
        let err = BotError::Cooldown(Duration::from_millis(2500));
        assert_eq!(err.user_message(), "Slow down, try again in 2.5s");
    }
}
