pub mod error;
pub mod model;
pub mod orchestrator;
pub mod ports;

pub use error::DispatchError;
pub use model::{Job, JobState, OrchestratorConfig, Task};
pub use orchestrator::Orchestrator;
pub use ports::{ContextHost, SpawnedContext};
