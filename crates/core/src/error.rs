//! Domain error type shared by the engines and repositories.

use thiserror::Error;
use uuid::Uuid;

use crate::model::ExperimentStatus;

/// Errors surfaced by the assignment and stats engines.
///
/// Each variant is a tagged domain error kind carrying a message. Errors
/// are propagated to the boundary layer for status-code mapping and are
/// never recovered inside the engines themselves.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The experiment (or its variant set) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// First-time assignment was attempted on a non-active experiment.
    #[error("experiment {id} is {status}, assignments only allowed for active experiments")]
    InactiveExperiment { id: Uuid, status: ExperimentStatus },

    /// Malformed input: bad identifiers, traffic splits not summing to 100.
    #[error("{0}")]
    Validation(String),

    /// Persistence or connectivity failure, propagated to the caller.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl EngineError {
    /// Shorthand for a `NotFound` with a formatted message.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for a `Validation` with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_experiment_message_names_status() {
        let err = EngineError::InactiveExperiment {
            id: Uuid::nil(),
            status: ExperimentStatus::Paused,
        };
        let msg = err.to_string();
        assert!(msg.contains("paused"), "message was: {msg}");
    }

    #[test]
    fn test_store_error_keeps_message() {
        let err = EngineError::Store(anyhow::anyhow!("connection refused"));
        assert!(err.to_string().contains("connection refused"));
    }
}
