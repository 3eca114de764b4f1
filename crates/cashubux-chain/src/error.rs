use thiserror::Error;

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Errors reported by external collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Network blips, rate limits, upstream 5xx. Worth retrying.
    #[error("Transient collaborator failure: {0}")]
    Transient(String),

    /// The upstream answered and the answer is final.
    #[error("Collaborator rejected the request: {0}")]
    Rejected(String),

    #[error("Collaborator call gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    #[error("Collaborator misconfigured: {0}")]
    Config(String),
}

impl CollaboratorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CollaboratorError::Transient(_))
    }
}
