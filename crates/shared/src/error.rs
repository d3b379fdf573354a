use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("process id must not be empty")]
    EmptyProcessId,
    #[error("process id exceeds {max} characters")]
    ProcessIdTooLong { max: usize },
    #[error("process id contains unsupported character {found:?}")]
    InvalidProcessIdChar { found: char },
}
