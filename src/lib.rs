//! Fan-out task orchestration over isolated worker contexts.
//!
//! One user-submitted task is fanned out to several worker execution
//! contexts, each driving a scripted interaction sequence against its own
//! live document. Completion is detected by observing mutations of that
//! document rather than polling, and every worker's result (or failure) is
//! relayed back to the context that submitted the task.
//!
//! The member crates carry the logic; this crate wires them together over an
//! in-process [`LocalHost`] suitable for tests and early integration.

pub mod host;
pub mod runtime;

pub use condition_waiter::{
    wait_for_appearance, wait_for_stable_attribute, DocumentPort, Locator, MemoryDocument,
    NodeSpec, WaitError, WaitOpts,
};
pub use fanout_core_types::{
    ContextId, CoreError, Envelope, JobId, ProfileId, RunStep, StepOutcome, SubmitTask, TaskId,
    TaskOutcome,
};
pub use fanout_orchestrator::{DispatchError, JobState, Orchestrator, OrchestratorConfig};
pub use host::{LocalHost, PageBehavior};
pub use runtime::Fanout;
pub use worker_driver::{DriveError, DriveTempo, PageScript};
