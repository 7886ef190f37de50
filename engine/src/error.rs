use crate::UciError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine is not ready")]
    NotReady,
    #[error("Engine did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("Engine process failure: {0}")]
    ProcessFailure(String),
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<UciError> for EngineError {
    fn from(err: UciError) -> Self {
        Self::Protocol(err.to_string())
    }
}
