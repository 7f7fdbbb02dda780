//! Error types for port operations.
//!
//! None of these reach the host turn loop. The scheduler logs them and turns
//! them into a `ResolutionOutcome` explaining why the reaction did not fire.

/// The decision-maker could not give an answer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecisionError {
    /// Prompt was cancelled (UI closed, player disconnected).
    #[error("Prompt cancelled: {0}")]
    Cancelled(String),

    /// No decision-maker is attached to this actor.
    #[error("No decision-maker for actor {0}")]
    Unavailable(String),

    /// The answer did not fit the question (e.g. choice index out of range).
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),
}

impl DecisionError {
    pub fn cancelled(reason: impl ToString) -> Self {
        Self::Cancelled(reason.to_string())
    }

    pub fn unavailable(actor: impl ToString) -> Self {
        Self::Unavailable(actor.to_string())
    }

    pub fn invalid_answer(reason: impl ToString) -> Self {
        Self::InvalidAnswer(reason.to_string())
    }
}

/// Secondary check/action execution failed on the host side.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckError {
    /// Host refused or could not execute the check.
    #[error("Check failed in {operation}: {message}")]
    Execution {
        operation: &'static str,
        message: String,
    },

    /// An actor the check depends on is gone.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
}

impl CheckError {
    pub fn execution(operation: &'static str, message: impl ToString) -> Self {
        Self::Execution {
            operation,
            message: message.to_string(),
        }
    }

    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Timed-effect attachment failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EffectError {
    #[error("Effect target is gone: {0}")]
    TargetGone(String),

    #[error("Effect rejected: {0}")]
    Rejected(String),
}

/// Persistent per-encounter usage ledger failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UsageError {
    #[error("Usage ledger unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_keep_context_in_message() {
        let err = CheckError::execution("resolve_secondary", "host busy");
        assert_eq!(
            err.to_string(),
            "Check failed in resolve_secondary: host busy"
        );

        let err = CheckError::not_found("Actor", "42");
        assert_eq!(err.to_string(), "Actor not found: 42");

        let err = DecisionError::cancelled("window closed");
        assert!(matches!(err, DecisionError::Cancelled(_)));
    }
}
