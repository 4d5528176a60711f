use async_trait::async_trait;
use fanout_core_types::{ContextId, CoreError, RunStep, TaskOutcome};
use tokio::sync::oneshot;

/// A freshly spawned worker context. `ready` fires once, when the context's
/// document has finished loading; it is never re-armed.
pub struct SpawnedContext {
    pub id: ContextId,
    pub ready: oneshot::Receiver<()>,
}

/// Context-spawning and messaging facility the orchestrator drives. Context
/// identities come from here and are unique for the life of the process.
#[async_trait]
pub trait ContextHost: Send + Sync {
    /// Create an isolated execution context at the given resource locator.
    /// Non-blocking; readiness is signalled through the returned receiver.
    async fn spawn(&self, resource: &str) -> Result<SpawnedContext, CoreError>;

    /// Deliver a task to a worker context.
    async fn deliver(&self, ctx: ContextId, step: RunStep) -> Result<(), CoreError>;

    /// Relay a terminal outcome to the originating context. Fails when the
    /// origin no longer accepts messages.
    async fn relay(&self, origin: ContextId, outcome: TaskOutcome) -> Result<(), CoreError>;
}
