//! Sync error taxonomy.

use oneflow_core::error::NON_FIELD;
use oneflow_core::{DomainError, FieldErrors, RecordId};
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of a remote call or of the checks a synchronizer runs before one.
///
/// Every variant is recoverable: the synchronizer restores the cache and hands
/// the error back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// No response was received (connection refused, timeout, DNS).
    #[error("network error: {0}")]
    Transport(String),

    /// Non-success response that is not one of the cases below, or a body
    /// that could not be decoded.
    #[error("server error{}: {message}", status_suffix(.status))]
    Server { status: Option<u16>, message: String },

    /// Rejected input, either client-side or a 4xx with field detail.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// The target id is absent locally or remotely.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The backend refused a write against a stale version of the record.
    #[error("conflict: {0}")]
    Conflict(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl SyncError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Response body did not match the expected schema.
    pub fn malformed(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status: Some(status),
            message: format!("malformed response: {}", message.into()),
        }
    }

    /// Only transport failures and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Server { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

impl From<FieldErrors> for SyncError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<DomainError> for SyncError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(errors) => Self::Validation(errors),
            other => Self::Validation(FieldErrors::single(NON_FIELD, other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_5xx_are_retryable() {
        assert!(SyncError::Transport("refused".into()).is_retryable());
        assert!(SyncError::server(503, "unavailable").is_retryable());
        assert!(!SyncError::server(400, "bad").is_retryable());
        assert!(!SyncError::malformed(200, "expected object").is_retryable());
        assert!(!SyncError::Conflict("stale".into()).is_retryable());
        assert!(!SyncError::NotFound(RecordId::from("1")).is_retryable());
    }

    #[test]
    fn display_includes_status_when_known() {
        assert_eq!(SyncError::server(502, "bad gateway").to_string(), "server error (502): bad gateway");
        let unknown = SyncError::Server {
            status: None,
            message: "boom".into(),
        };
        assert_eq!(unknown.to_string(), "server error: boom");
    }

    #[test]
    fn domain_errors_become_validation() {
        let err: SyncError = DomainError::invalid_amount("abc").into();
        match err {
            SyncError::Validation(fields) => assert!(fields.get(NON_FIELD).is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
