use std::collections::HashMap;
use std::sync::Arc;

use fanout_core_types::{
    ContextId, JobId, RunStep, StepOutcome, SubmitTask, TaskId, TaskOutcome,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::model::{Job, JobState, OrchestratorConfig, Task};
use crate::ports::ContextHost;

/// Process-wide coordinator. Owns the job arena exclusively; entries are
/// cleared one by one as terminal outcomes arrive or are discarded.
pub struct Orchestrator {
    host: Arc<dyn ContextHost>,
    config: OrchestratorConfig,
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    alive: CancellationToken,
}

impl Orchestrator {
    pub fn new(host: Arc<dyn ContextHost>, config: OrchestratorConfig) -> Self {
        Self {
            host,
            config,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            alive: CancellationToken::new(),
        }
    }

    /// Fan the task out: one worker context per target profile. A spawn
    /// failure aborts only that profile's job; siblings are unaffected.
    ///
    /// A submission whose originating context could not be captured is a
    /// fatal event for the whole task, not a silent drop: without the origin
    /// there is nowhere to relay outcomes to.
    pub async fn dispatch(
        &self,
        origin: Option<ContextId>,
        submit: SubmitTask,
    ) -> Result<Vec<JobId>, DispatchError> {
        let Some(origin) = origin else {
            error!(
                target: "orchestrator",
                "submission arrived without a capturable origin context; aborting task"
            );
            return Err(DispatchError::OriginUnknown);
        };

        let task = Task {
            task_id: TaskId::new(),
            payload: submit.payload,
            target_profiles: submit.target_profiles,
            origin,
        };
        info!(
            target: "orchestrator",
            task = %task.task_id,
            %origin,
            profiles = task.target_profiles.len(),
            "dispatching task"
        );

        let mut spawned = Vec::new();
        for profile in &task.target_profiles {
            let context = match self.host.spawn(&self.config.resource).await {
                Ok(context) => context,
                Err(err) => {
                    // Independent-failure policy: log and drop this profile
                    // only.
                    warn!(
                        target: "orchestrator",
                        task = %task.task_id,
                        %profile,
                        error = %DispatchError::SpawnFailure(err.to_string()),
                        "dropping job"
                    );
                    continue;
                }
            };

            let job_id = JobId::from(context.id);
            self.jobs.lock().insert(
                job_id,
                Job {
                    job: job_id,
                    task_id: task.task_id.clone(),
                    profile: profile.clone(),
                    origin,
                    state: JobState::Spawning,
                },
            );
            spawned.push(job_id);

            let step = RunStep {
                job: job_id,
                profile: profile.clone(),
                payload: task.payload.clone(),
            };
            let host = Arc::clone(&self.host);
            let jobs = Arc::clone(&self.jobs);
            let alive = self.alive.clone();
            let worker_ctx = context.id;
            let ready = context.ready;
            tokio::spawn(async move {
                set_state(&jobs, job_id, JobState::AwaitingReady);
                tokio::select! {
                    // Stale-context guard: once the orchestrator is torn
                    // down, detach without delivering anything.
                    _ = alive.cancelled() => {
                        debug!(
                            target: "orchestrator",
                            job = %job_id,
                            "orchestrator gone before context readiness; detaching observer"
                        );
                    }
                    readiness = ready => {
                        if readiness.is_err() {
                            warn!(
                                target: "orchestrator",
                                job = %job_id,
                                "context vanished before signalling ready"
                            );
                            return;
                        }
                        set_state(&jobs, job_id, JobState::Running);
                        if let Err(err) = host.deliver(worker_ctx, step).await {
                            warn!(
                                target: "orchestrator",
                                job = %job_id,
                                error = %err,
                                "task delivery failed"
                            );
                        }
                    }
                }
            });
        }
        Ok(spawned)
    }

    /// Route a worker's terminal outcome back to the task's origin. Removing
    /// the arena entry first is what gives the at-most-once relay law: a
    /// duplicate or unknown outcome finds no entry and is discarded.
    pub async fn on_outcome(&self, outcome: StepOutcome) {
        let job = self.jobs.lock().remove(&outcome.job);
        let Some(mut job) = job else {
            warn!(
                target: "orchestrator",
                job = %outcome.job,
                "outcome for unknown or already-settled job; discarding"
            );
            return;
        };
        job.state = if outcome.ok {
            JobState::Succeeded
        } else {
            JobState::Failed
        };
        info!(
            target: "orchestrator",
            job = %job.job,
            task = %job.task_id,
            profile = %job.profile,
            ok = outcome.ok,
            "relaying outcome"
        );
        let relayed = self
            .host
            .relay(job.origin, TaskOutcome::from_step(&outcome))
            .await;
        if relayed.is_err() {
            // The task's result is lost but the system stays consistent: no
            // retry, no crash.
            warn!(
                target: "orchestrator",
                job = %job.job,
                error = %DispatchError::RelayTargetUnreachable(job.origin),
                "discarding outcome"
            );
        }
    }

    /// Jobs still awaiting a terminal outcome.
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn job_state(&self, job: JobId) -> Option<JobState> {
        self.jobs.lock().get(&job).map(|entry| entry.state.clone())
    }

    /// Invalidate the orchestrator: every suspended readiness continuation
    /// checks this token before acting.
    pub fn shutdown(&self) {
        self.alive.cancel();
    }
}

fn set_state(jobs: &Mutex<HashMap<JobId, Job>>, job: JobId, state: JobState) {
    if let Some(entry) = jobs.lock().get_mut(&job) {
        entry.state = state;
    }
}
