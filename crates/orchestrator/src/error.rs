use fanout_core_types::{ContextId, CoreError};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    #[error("could not capture originating context for this submission")]
    OriginUnknown,
    #[error("worker context could not be created: {0}")]
    SpawnFailure(String),
    #[error("origin context {0} no longer accepts messages")]
    RelayTargetUnreachable(ContextId),
}

impl From<DispatchError> for CoreError {
    fn from(err: DispatchError) -> Self {
        CoreError::new(err.to_string())
    }
}
