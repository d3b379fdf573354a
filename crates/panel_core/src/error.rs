use pm2_integration::SupervisorError;
use thiserror::Error;

use crate::refresh::RefreshPhase;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed action identifier {0:?}")]
    MalformedToken(String),
    #[error("unknown action kind in {0:?}")]
    UnknownKind(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("target message no longer exists")]
    NotFound,
    #[error("transport request failed: {0}")]
    Request(String),
    #[error("interaction was already answered")]
    AlreadyAnswered,
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
#[error("refresh cycle failed while {phase}: {source}")]
pub struct RefreshCycleError {
    pub phase: RefreshPhase,
    #[source]
    pub source: PanelError,
}

impl RefreshCycleError {
    pub fn new(phase: RefreshPhase, source: impl Into<PanelError>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}
