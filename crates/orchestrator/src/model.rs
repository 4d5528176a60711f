use fanout_core_types::{ContextId, JobId, ProfileId, TaskId};

/// One user submission, immutable after creation. Destroyed once every job
/// spawned for it has completed or the originating context goes away; there
/// is no durable persistence.
#[derive(Clone, Debug)]
pub struct Task {
    pub task_id: TaskId,
    pub payload: String,
    pub target_profiles: Vec<ProfileId>,
    pub origin: ContextId,
}

/// Transitions strictly forward; a job never revisits an earlier state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JobState {
    Spawning,
    AwaitingReady,
    Running,
    Succeeded,
    Failed,
}

/// One (task, profile) pair, owned exclusively by the orchestrator. The job
/// id doubles as the correlation key routing a later outcome back to the
/// right origin.
#[derive(Clone, Debug)]
pub struct Job {
    pub job: JobId,
    pub task_id: TaskId,
    pub profile: ProfileId,
    pub origin: ContextId,
    pub state: JobState,
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Resource locator every worker context is spawned at.
    pub resource: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            resource: "https://lovable.dev/".to_string(),
        }
    }
}
