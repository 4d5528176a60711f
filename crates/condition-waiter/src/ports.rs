use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Opaque handle to a located node. Stays valid as an identity even after
/// the node leaves the tree; `is_attached` tells the two states apart.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeHandle(pub u64);

/// How a node is found in the tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Locator {
    /// Node whose `id` attribute matches exactly.
    Id(String),
    /// First node carrying the given `role` attribute whose visible text
    /// contains the fragment.
    RoleText { role: String, contains: String },
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn role_text(role: impl Into<String>, contains: impl Into<String>) -> Self {
        Locator::RoleText {
            role: role.into(),
            contains: contains.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{id}"),
            Locator::RoleText { role, contains } => {
                write!(f, "[role={role}]~\"{contains}\"")
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MutationRecord {
    /// A node was added to or removed from the tree.
    ChildList,
    /// An attribute changed on a specific node.
    Attribute { node: NodeHandle, name: String },
}

/// One notification: every mutation applied since the previous batch.
#[derive(Clone, Debug, Default)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Scope {
    /// The whole document.
    Subtree,
    /// Only mutations touching this node.
    Node(NodeHandle),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MutationFilter {
    pub scope: Scope,
    pub attributes_only: bool,
}

impl MutationFilter {
    pub fn subtree() -> Self {
        Self {
            scope: Scope::Subtree,
            attributes_only: false,
        }
    }

    pub fn attributes_of(node: NodeHandle) -> Self {
        Self {
            scope: Scope::Node(node),
            attributes_only: true,
        }
    }

    pub fn accepts(&self, record: &MutationRecord) -> bool {
        match (&self.scope, record) {
            (Scope::Subtree, MutationRecord::ChildList) => !self.attributes_only,
            (Scope::Subtree, MutationRecord::Attribute { .. }) => true,
            (Scope::Node(_), MutationRecord::ChildList) => false,
            (Scope::Node(target), MutationRecord::Attribute { node, .. }) => node == target,
        }
    }
}

/// Read/observe surface over a live, mutating document tree. The in-process
/// adapter is [`crate::MemoryDocument`]; a real deployment binds this to the
/// page's own mutation notifications.
#[async_trait]
pub trait DocumentPort: Send + Sync {
    async fn query(&self, locator: &Locator) -> Option<NodeHandle>;
    async fn is_attached(&self, node: NodeHandle) -> bool;
    async fn attribute(&self, node: NodeHandle, name: &str) -> Option<String>;

    /// Subscribe to mutation batches matching the filter. The subscription
    /// lives exactly as long as the returned receiver; dropping it ends the
    /// observation.
    async fn subscribe(&self, filter: MutationFilter) -> mpsc::Receiver<MutationBatch>;
}
