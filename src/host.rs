//! In-process [`ContextHost`]: every spawned context is a fresh
//! [`MemoryDocument`] with a simulated page behavior running against it and
//! a worker task driving the interaction script. Originating contexts
//! register here to receive relayed outcomes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use condition_waiter::MemoryDocument;
use fanout_core_types::{ContextId, CoreError, RunStep, StepOutcome, TaskOutcome};
use fanout_orchestrator::{ContextHost, SpawnedContext};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use worker_driver::{DriveCtx, DriveTempo, MemoryPage, PageScript, RuntimeDeps};

/// Simulated target page: receives the context's document and drives it the
/// way the real site would (render controls, react to submission, settle the
/// result).
pub type PageBehavior = Arc<dyn Fn(ContextId, MemoryDocument) -> BoxFuture<'static, ()> + Send + Sync>;

struct WorkerContext {
    doc: MemoryDocument,
    cancel: CancellationToken,
}

pub struct LocalHost {
    next_id: AtomicU64,
    script: PageScript,
    tempo: DriveTempo,
    behavior: PageBehavior,
    outcome_tx: mpsc::Sender<StepOutcome>,
    workers: Mutex<HashMap<ContextId, WorkerContext>>,
    origins: Mutex<HashMap<ContextId, mpsc::Sender<TaskOutcome>>>,
}

impl LocalHost {
    pub fn new(
        script: PageScript,
        tempo: DriveTempo,
        behavior: PageBehavior,
        outcome_tx: mpsc::Sender<StepOutcome>,
    ) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            script,
            tempo,
            behavior,
            outcome_tx,
            workers: Mutex::new(HashMap::new()),
            origins: Mutex::new(HashMap::new()),
        }
    }

    /// Register an originating context and hand back the channel its relayed
    /// outcomes arrive on.
    pub fn register_origin(&self, capacity: usize) -> (ContextId, mpsc::Receiver<TaskOutcome>) {
        let id = ContextId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.origins.lock().insert(id, tx);
        (id, rx)
    }

    /// Tear one context down; pending waits inside it are voided through its
    /// cancel token and its document goes away with it.
    pub fn close_context(&self, ctx: ContextId) {
        if let Some(worker) = self.workers.lock().remove(&ctx) {
            worker.cancel.cancel();
        }
        self.origins.lock().remove(&ctx);
    }
}

#[async_trait]
impl ContextHost for LocalHost {
    async fn spawn(&self, resource: &str) -> Result<SpawnedContext, CoreError> {
        let id = ContextId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let doc = MemoryDocument::new();
        self.workers.lock().insert(
            id,
            WorkerContext {
                doc: doc.clone(),
                cancel: CancellationToken::new(),
            },
        );
        debug!(target: "host", context = %id, resource, "context spawned");

        tokio::spawn((self.behavior)(id, doc));

        // The behavior task plays the page's own load; once it is scheduled
        // the context counts as ready.
        let (ready_tx, ready_rx) = oneshot::channel();
        let _ = ready_tx.send(());
        Ok(SpawnedContext {
            id,
            ready: ready_rx,
        })
    }

    async fn deliver(&self, ctx: ContextId, step: RunStep) -> Result<(), CoreError> {
        let (doc, cancel) = {
            let workers = self.workers.lock();
            let worker = workers
                .get(&ctx)
                .ok_or_else(|| CoreError::new(format!("no such context: {ctx}")))?;
            (worker.doc.clone(), worker.cancel.clone())
        };
        let script = self.script.clone();
        let tempo = self.tempo.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let page = MemoryPage::new(doc.clone());
            let drive_ctx = DriveCtx::new(step.job, step.profile.clone(), cancel);
            let outcome = worker_driver::run(
                &drive_ctx,
                step,
                RuntimeDeps {
                    doc: &doc,
                    page: &page,
                    script: &script,
                    tempo: &tempo,
                },
            )
            .await;
            let _ = outcome_tx.send(outcome).await;
        });
        Ok(())
    }

    async fn relay(&self, origin: ContextId, outcome: TaskOutcome) -> Result<(), CoreError> {
        let tx = self
            .origins
            .lock()
            .get(&origin)
            .cloned()
            .ok_or_else(|| CoreError::new(format!("origin not registered: {origin}")))?;
        tx.send(outcome)
            .await
            .map_err(|_| CoreError::new(format!("origin stopped listening: {origin}")))
    }
}
