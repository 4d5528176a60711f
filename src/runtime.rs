//! Wiring: a [`LocalHost`], an [`Orchestrator`], and the pump forwarding
//! worker outcomes into the orchestrator's relay path.

use std::sync::Arc;

use fanout_core_types::{ContextId, JobId, SubmitTask, TaskOutcome};
use fanout_orchestrator::{DispatchError, Orchestrator, OrchestratorConfig};
use tokio::sync::mpsc;
use worker_driver::{DriveTempo, PageScript};

use crate::host::{LocalHost, PageBehavior};

const OUTCOME_CAPACITY: usize = 32;

pub struct Fanout {
    host: Arc<LocalHost>,
    orchestrator: Arc<Orchestrator>,
}

impl Fanout {
    pub fn new(
        config: OrchestratorConfig,
        script: PageScript,
        tempo: DriveTempo,
        behavior: PageBehavior,
    ) -> Self {
        let (outcome_tx, mut outcome_rx) = mpsc::channel(OUTCOME_CAPACITY);
        let host = Arc::new(LocalHost::new(script, tempo, behavior, outcome_tx));
        let orchestrator = Arc::new(Orchestrator::new(host.clone(), config));

        let pump = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            while let Some(outcome) = outcome_rx.recv().await {
                pump.on_outcome(outcome).await;
            }
        });

        Self { host, orchestrator }
    }

    /// Register an originating context; relayed outcomes land on the
    /// returned receiver.
    pub fn register_origin(&self) -> (ContextId, mpsc::Receiver<TaskOutcome>) {
        self.host.register_origin(OUTCOME_CAPACITY)
    }

    pub async fn submit(
        &self,
        origin: Option<ContextId>,
        task: SubmitTask,
    ) -> Result<Vec<JobId>, DispatchError> {
        self.orchestrator.dispatch(origin, task).await
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn host(&self) -> &LocalHost {
        &self.host
    }

    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}
