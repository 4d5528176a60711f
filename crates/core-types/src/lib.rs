use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the fanout kernel crates.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("{message}")]
    Message { message: String },
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identity of one isolated execution context. Allocated by the spawning
/// facility, globally unique for the lifetime of the orchestrator process;
/// never generated inside the kernel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx:{}", self.0)
    }
}

/// Correlation key for one job. A job's id IS the id of the worker context
/// spawned for it, so an outcome arriving later can be routed back even when
/// the worker has outlived knowledge of which task spawned it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl From<ContextId> for JobId {
    fn from(ctx: ContextId) -> Self {
        JobId(ctx.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job:{}", self.0)
    }
}

/// Which target variant a job is driving.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

impl ProfileId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user submission: one payload fanned out to a set of target profiles.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubmitTask {
    pub payload: String,
    pub target_profiles: Vec<ProfileId>,
}

/// Delivered to a worker context once it signals readiness.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunStep {
    pub job: JobId,
    pub profile: ProfileId,
    pub payload: String,
}

/// Terminal report of one worker run. Produced exactly once per job,
/// consumed exactly once by the orchestrator.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub job: JobId,
    pub profile: ProfileId,
    pub ok: bool,
    pub result: Option<String>,
    pub message: Option<String>,
}

impl StepOutcome {
    pub fn success(job: JobId, profile: ProfileId, result: impl Into<String>) -> Self {
        Self {
            job,
            profile,
            ok: true,
            result: Some(result.into()),
            message: None,
        }
    }

    pub fn failure(job: JobId, profile: ProfileId, message: impl Into<String>) -> Self {
        Self {
            job,
            profile,
            ok: false,
            result: None,
            message: Some(message.into()),
        }
    }
}

/// Relay of a `StepOutcome` back to the originating context, with the job
/// correlation already resolved away.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub profile: ProfileId,
    pub ok: bool,
    pub result: Option<String>,
    pub message: Option<String>,
}

impl TaskOutcome {
    pub fn from_step(step: &StepOutcome) -> Self {
        Self {
            profile: step.profile.clone(),
            ok: step.ok,
            result: step.result.clone(),
            message: step.message.clone(),
        }
    }
}

/// Kind-tagged wire form of the message contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Envelope {
    SubmitTask(SubmitTask),
    WorkerReady { context: ContextId },
    RunStep(RunStep),
    StepOutcome(StepOutcome),
    TaskOutcome(TaskOutcome),
}
