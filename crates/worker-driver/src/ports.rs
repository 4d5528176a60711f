use async_trait::async_trait;
use condition_waiter::NodeHandle;
use fanout_core_types::CoreError;

/// One-shot page pokes the driver script performs between waits. These are
/// plain I/O wrappers; all the timing logic lives in `condition-waiter`.
#[async_trait]
pub trait PagePort: Send + Sync {
    /// Write text into a field AND dispatch synthetic input-changed and
    /// value-changed notifications, so pages relying on their own change
    /// detection observe the programmatic write.
    async fn set_value(&self, node: NodeHandle, text: &str) -> Result<(), CoreError>;

    /// Pointer-style activation of a control (chooser trigger, option item).
    async fn activate(&self, node: NodeHandle) -> Result<(), CoreError>;

    /// Submit. When the control belongs to a form, structural form
    /// submission is preferred over a synthetic click; framework-level click
    /// interception makes clicks the less reliable path.
    async fn submit(&self, node: NodeHandle) -> Result<(), CoreError>;

    /// Serialized (outer-HTML style) representation of a node's subtree.
    async fn outer_html(&self, node: NodeHandle) -> Result<String, CoreError>;
}
