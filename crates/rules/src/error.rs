use thiserror::Error;

/// Failures surfaced by context building and rule evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The event list cannot be evaluated (e.g. an event without a type).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A rule's condition or consequence failed. Evaluation stops at the first one.
    #[error("rule '{rule_id}' failed: {message}")]
    RuleEvaluation { rule_id: String, message: String },
}

impl EngineError {
    pub fn rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::RuleEvaluation {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
