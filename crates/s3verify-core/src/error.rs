//! Error types for the verification engine.
//!
//! Every operation in this crate returns [`HarnessResult`]. The variants map
//! onto the failure classes a scenario can hit: the storage service failed to
//! answer ([`HarnessError::Transport`]), it answered but never converged
//! ([`HarnessError::ConsistencyTimeout`]), the multipart protocol was driven
//! out of order ([`HarnessError::SessionState`], [`HarnessError::SessionClosed`]),
//! or it converged on the wrong value ([`HarnessError::Assertion`]).

use std::time::Duration;

use crate::multipart::SessionState;
use crate::waiter::ExpectedState;

/// Error type for the verification engine.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The storage capability failed to complete a request.
    #[error(
        "{operation} failed{}: {message}",
        .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    Transport {
        /// Name of the storage operation, e.g. `PutObject`.
        operation: &'static str,
        /// HTTP status of the response, when one was received.
        status: Option<u16>,
        /// Rendered error chain.
        message: String,
    },

    /// Polling never observed the expected state within its bound.
    #[error("{target} did not become {expected} after {attempts} attempts ({elapsed:?})")]
    ConsistencyTimeout {
        /// What was polled, e.g. `bucket/key`.
        target: String,
        /// The state the waiter was waiting for.
        expected: ExpectedState,
        /// Number of probes issued.
        attempts: u32,
        /// Wall time spent waiting.
        elapsed: Duration,
    },

    /// A multipart operation is not valid in the session's current state.
    #[error("cannot {operation} multipart upload while {state}: {reason}")]
    SessionState {
        /// The rejected operation.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
        /// Why the transition was refused.
        reason: String,
    },

    /// The multipart session was already completed or aborted.
    #[error("multipart session is closed ({state}); {operation} is not permitted")]
    SessionClosed {
        /// The rejected operation.
        operation: &'static str,
        /// The terminal state.
        state: SessionState,
    },

    /// An observed value did not match the scenario's expectation.
    #[error("{subject}: expected {expected}, observed {observed}")]
    Assertion {
        /// What was checked.
        subject: String,
        /// Expected value.
        expected: String,
        /// Observed value.
        observed: String,
    },

    /// A worker task panicked or was cancelled by the runtime.
    #[error("worker {index} did not finish: {message}")]
    WorkerPanicked {
        /// Index of the worker.
        index: usize,
        /// Join error message.
        message: String,
    },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Payload file I/O failure.
    #[error("payload I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Build an [`HarnessError::Assertion`] from anything printable.
    #[must_use]
    pub fn assertion(
        subject: impl Into<String>,
        expected: impl ToString,
        observed: impl ToString,
    ) -> Self {
        Self::Assertion {
            subject: subject.into(),
            expected: expected.to_string(),
            observed: observed.to_string(),
        }
    }

    /// Build an [`HarnessError::Transport`] that carried no HTTP response.
    #[must_use]
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status attached to a transport failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Convenience result type for the verification engine.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Fail with an assertion error unless `expected == observed`.
pub fn check_equal<T>(subject: &str, expected: T, observed: T) -> HarnessResult<()>
where
    T: PartialEq + std::fmt::Display,
{
    if expected == observed {
        Ok(())
    } else {
        Err(HarnessError::assertion(subject, expected, observed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_render_transport_status() {
        let err = HarnessError::Transport {
            operation: "PutObject",
            status: Some(503),
            message: "slow down".to_owned(),
        };
        assert_eq!(err.to_string(), "PutObject failed (HTTP 503): slow down");
        assert_eq!(err.status(), Some(503));

        let err = HarnessError::transport("GetObject", "connection reset");
        assert_eq!(err.to_string(), "GetObject failed: connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_should_check_equal() {
        assert!(check_equal("parts", 3, 3).is_ok());
        let err = check_equal("parts", 3, 2).unwrap_err();
        assert_eq!(err.to_string(), "parts: expected 3, observed 2");
    }
}
