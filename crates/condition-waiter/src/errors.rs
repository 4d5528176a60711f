use fanout_core_types::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("timeout waiting for {0}")]
    Timeout(String),
    #[error("node vanished before its condition finished")]
    NodeLost,
    #[error("document closed while waiting")]
    Closed,
}

impl From<WaitError> for CoreError {
    fn from(err: WaitError) -> Self {
        CoreError::new(err.to_string())
    }
}
