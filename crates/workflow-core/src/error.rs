use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Actor {actor} is not authorized: {reason}")]
    Authorization { actor: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Concurrent mutation conflict: {0}")]
    Conflict(String),

    #[error("Composition failed: {0}")]
    Composition(String),
}

impl WorkflowError {
    pub fn not_your_turn(actor: &str) -> Self {
        WorkflowError::Authorization {
            actor: actor.to_string(),
            reason: "not the next actor for this document".to_string(),
        }
    }
}
