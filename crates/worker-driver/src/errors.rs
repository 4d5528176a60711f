use condition_waiter::WaitError;
use fanout_core_types::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DriveError {
    #[error("InputNotFound: {0}")]
    InputNotFound(WaitError),
    #[error("ControlNotFound: {0}")]
    ControlNotFound(WaitError),
    #[error("ProfileNotFound: no option matching \"{0}\"")]
    ProfileNotFound(String),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error("page action failed: {0}")]
    Page(#[from] CoreError),
    #[error("operation cancelled")]
    Cancelled,
}
