//! In-memory [`PagePort`] adapter over [`MemoryDocument`], suitable for unit
//! tests and early integration. Synthetic events surface as mutation
//! notifications, which is what simulated page behaviors listen for.

use async_trait::async_trait;
use condition_waiter::{MemoryDocument, NodeHandle};
use fanout_core_types::CoreError;

use crate::ports::PagePort;

#[derive(Clone)]
pub struct MemoryPage {
    doc: MemoryDocument,
}

impl MemoryPage {
    pub fn new(doc: MemoryDocument) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.doc
    }
}

#[async_trait]
impl PagePort for MemoryPage {
    async fn set_value(&self, node: NodeHandle, text: &str) -> Result<(), CoreError> {
        if !condition_waiter::DocumentPort::is_attached(&self.doc, node).await {
            return Err(CoreError::new("cannot write value: node detached"));
        }
        self.doc.set_attribute(node, "value", text).await;
        self.doc.notify_synthetic(node, "input").await;
        self.doc.notify_synthetic(node, "change").await;
        Ok(())
    }

    async fn activate(&self, node: NodeHandle) -> Result<(), CoreError> {
        if !condition_waiter::DocumentPort::is_attached(&self.doc, node).await {
            return Err(CoreError::new("cannot activate: node detached"));
        }
        self.doc.notify_synthetic(node, "pointerdown").await;
        self.doc.notify_synthetic(node, "pointerup").await;
        self.doc.notify_synthetic(node, "click").await;
        Ok(())
    }

    async fn submit(&self, node: NodeHandle) -> Result<(), CoreError> {
        match self.doc.closest(node, "form") {
            Some(form) => self.doc.notify_synthetic(form, "submit").await,
            // Not inside a form; a synthetic click is the only remaining path.
            None => self.doc.notify_synthetic(node, "click").await,
        }
        Ok(())
    }

    async fn outer_html(&self, node: NodeHandle) -> Result<String, CoreError> {
        self.doc
            .serialize(node)
            .ok_or_else(|| CoreError::new("cannot serialize: node detached"))
    }
}
