//! In-memory mutable tree implementing [`DocumentPort`], suitable for unit
//! tests and early integration. Mutations fan out over a broadcast channel;
//! subscriptions are materialised as filtered mpsc receivers so waiters can
//! await batches without handling broadcast semantics directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::ports::{
    DocumentPort, Locator, MutationBatch, MutationFilter, MutationRecord, NodeHandle,
};

const NOTIFY_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct NodeSpec {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            text: String::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[derive(Clone, Debug)]
struct NodeData {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    parent: Option<u64>,
    children: Vec<u64>,
    attached: bool,
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<u64, NodeData>,
    roots: Vec<u64>,
    next_id: u64,
}

impl Tree {
    fn alloc(&mut self, spec: NodeSpec, parent: Option<u64>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeData {
                tag: spec.tag,
                attrs: spec.attrs.into_iter().collect(),
                text: spec.text,
                parent,
                children: Vec::new(),
                attached: true,
            },
        );
        id
    }

    fn detach(&mut self, id: u64) {
        let children = match self.nodes.get_mut(&id) {
            Some(node) => {
                node.attached = false;
                node.children.clone()
            }
            None => return,
        };
        for child in children {
            self.detach(child);
        }
    }

    /// Document-order walk over attached nodes.
    fn walk(&self) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack: Vec<u64> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                if !node.attached {
                    continue;
                }
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn matches(&self, id: u64, locator: &Locator) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        match locator {
            Locator::Id(wanted) => node.attrs.get("id").is_some_and(|v| v == wanted),
            Locator::RoleText { role, contains } => {
                node.attrs.get("role").is_some_and(|v| v == role)
                    && node.text.contains(contains.as_str())
            }
        }
    }
}

#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<Inner>,
}

struct Inner {
    tree: Mutex<Tree>,
    notify: broadcast::Sender<MutationBatch>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tree: Mutex::new(Tree::default()),
                notify,
            }),
        }
    }

    fn publish(&self, records: Vec<MutationRecord>) {
        // No subscribers is fine; the page mutates whether or not anyone is
        // watching.
        let _ = self.inner.notify.send(MutationBatch { records });
    }

    pub async fn insert_root(&self, spec: NodeSpec) -> NodeHandle {
        let id = {
            let mut tree = self.inner.tree.lock();
            let id = tree.alloc(spec, None);
            tree.roots.push(id);
            id
        };
        self.publish(vec![MutationRecord::ChildList]);
        NodeHandle(id)
    }

    pub async fn insert_child(&self, parent: NodeHandle, spec: NodeSpec) -> NodeHandle {
        let id = {
            let mut tree = self.inner.tree.lock();
            let id = tree.alloc(spec, Some(parent.0));
            if let Some(node) = tree.nodes.get_mut(&parent.0) {
                node.children.push(id);
            }
            id
        };
        self.publish(vec![MutationRecord::ChildList]);
        NodeHandle(id)
    }

    pub async fn set_attribute(&self, node: NodeHandle, name: &str, value: impl Into<String>) {
        let changed = {
            let mut tree = self.inner.tree.lock();
            match tree.nodes.get_mut(&node.0) {
                Some(data) => {
                    data.attrs.insert(name.to_string(), value.into());
                    true
                }
                None => false,
            }
        };
        if changed {
            self.publish(vec![MutationRecord::Attribute {
                node,
                name: name.to_string(),
            }]);
        }
    }

    pub async fn set_text(&self, node: NodeHandle, text: impl Into<String>) {
        let changed = {
            let mut tree = self.inner.tree.lock();
            match tree.nodes.get_mut(&node.0) {
                Some(data) => {
                    data.text = text.into();
                    true
                }
                None => false,
            }
        };
        if changed {
            self.publish(vec![MutationRecord::Attribute {
                node,
                name: "#text".to_string(),
            }]);
        }
    }

    pub async fn remove(&self, node: NodeHandle) {
        {
            let mut tree = self.inner.tree.lock();
            tree.detach(node.0);
            tree.roots.retain(|id| *id != node.0);
        }
        self.publish(vec![MutationRecord::ChildList]);
    }

    /// Analog of dispatching a synthetic DOM event (input, change, submit,
    /// click): a notification with no tree change, so listeners relying on
    /// their own change detection observe programmatic writes.
    pub async fn notify_synthetic(&self, node: NodeHandle, event: &str) {
        self.publish(vec![MutationRecord::Attribute {
            node,
            name: event.to_string(),
        }]);
    }

    pub fn tag(&self, node: NodeHandle) -> Option<String> {
        self.inner
            .tree
            .lock()
            .nodes
            .get(&node.0)
            .map(|data| data.tag.clone())
    }

    pub fn text(&self, node: NodeHandle) -> Option<String> {
        self.inner
            .tree
            .lock()
            .nodes
            .get(&node.0)
            .map(|data| data.text.clone())
    }

    /// Nearest ancestor (including self) with the given tag.
    pub fn closest(&self, node: NodeHandle, tag: &str) -> Option<NodeHandle> {
        let tree = self.inner.tree.lock();
        let mut cursor = Some(node.0);
        while let Some(id) = cursor {
            let data = tree.nodes.get(&id)?;
            if data.tag == tag {
                return Some(NodeHandle(id));
            }
            cursor = data.parent;
        }
        None
    }

    /// Serialized representation of a node and its subtree, outer-HTML style.
    pub fn serialize(&self, node: NodeHandle) -> Option<String> {
        let tree = self.inner.tree.lock();
        fn render(tree: &Tree, id: u64, out: &mut String) {
            let Some(data) = tree.nodes.get(&id) else {
                return;
            };
            out.push('<');
            out.push_str(&data.tag);
            let mut attrs: Vec<_> = data.attrs.iter().collect();
            attrs.sort();
            for (name, value) in attrs {
                out.push_str(&format!(" {name}=\"{value}\""));
            }
            out.push('>');
            out.push_str(&data.text);
            for child in &data.children {
                if tree.nodes.get(child).map(|c| c.attached) == Some(true) {
                    render(tree, *child, out);
                }
            }
            out.push_str(&format!("</{}>", data.tag));
        }
        if !tree.nodes.get(&node.0)?.attached {
            return None;
        }
        let mut out = String::new();
        render(&tree, node.0, &mut out);
        Some(out)
    }

    /// Live mutation subscriptions, counting the broadcast side. Forwarders
    /// for dropped receivers unwind on the next published batch.
    pub fn subscriber_count(&self) -> usize {
        self.inner.notify.receiver_count()
    }
}

#[async_trait]
impl DocumentPort for MemoryDocument {
    async fn query(&self, locator: &Locator) -> Option<NodeHandle> {
        let tree = self.inner.tree.lock();
        tree.walk()
            .into_iter()
            .find(|id| tree.matches(*id, locator))
            .map(NodeHandle)
    }

    async fn is_attached(&self, node: NodeHandle) -> bool {
        self.inner
            .tree
            .lock()
            .nodes
            .get(&node.0)
            .map(|data| data.attached)
            == Some(true)
    }

    async fn attribute(&self, node: NodeHandle, name: &str) -> Option<String> {
        let tree = self.inner.tree.lock();
        let data = tree.nodes.get(&node.0)?;
        if !data.attached {
            return None;
        }
        data.attrs.get(name).cloned()
    }

    async fn subscribe(&self, filter: MutationFilter) -> mpsc::Receiver<MutationBatch> {
        let mut rx = self.inner.notify.subscribe();
        let (tx, out_rx) = mpsc::channel(NOTIFY_CAPACITY);
        tokio::spawn(async move {
            loop {
                let batch = match rx.recv().await {
                    Ok(batch) => batch,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let records: Vec<_> = batch
                    .records
                    .into_iter()
                    .filter(|record| filter.accepts(record))
                    .collect();
                if records.is_empty() {
                    continue;
                }
                if tx.send(MutationBatch { records }).await.is_err() {
                    break;
                }
            }
        });
        out_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_by_id_and_role_text() {
        let doc = MemoryDocument::new();
        doc.insert_root(NodeSpec::new("textarea").with_attr("id", "chatinput"))
            .await;
        let menu = doc
            .insert_root(NodeSpec::new("div").with_attr("id", "menu"))
            .await;
        doc.insert_child(
            menu,
            NodeSpec::new("div")
                .with_attr("role", "menuitemradio")
                .with_text("Profile A"),
        )
        .await;

        assert!(doc.query(&Locator::id("chatinput")).await.is_some());
        assert!(doc
            .query(&Locator::role_text("menuitemradio", "Profile A"))
            .await
            .is_some());
        assert!(doc
            .query(&Locator::role_text("menuitemradio", "Profile Z"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn detached_subtree_is_invisible() {
        let doc = MemoryDocument::new();
        let root = doc
            .insert_root(NodeSpec::new("div").with_attr("id", "wrap"))
            .await;
        let child = doc
            .insert_child(root, NodeSpec::new("span").with_attr("id", "inner"))
            .await;
        doc.remove(root).await;
        assert!(!doc.is_attached(child).await);
        assert!(doc.query(&Locator::id("inner")).await.is_none());
        assert_eq!(doc.attribute(child, "id").await, None);
    }

    #[tokio::test]
    async fn attribute_filter_scopes_to_one_node() {
        let doc = MemoryDocument::new();
        let a = doc
            .insert_root(NodeSpec::new("iframe").with_attr("id", "a"))
            .await;
        let b = doc
            .insert_root(NodeSpec::new("iframe").with_attr("id", "b"))
            .await;
        let mut rx = doc.subscribe(MutationFilter::attributes_of(a)).await;
        doc.set_attribute(b, "src", "ignored").await;
        doc.set_attribute(a, "src", "seen").await;
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert!(matches!(
            &batch.records[0],
            MutationRecord::Attribute { node, name } if *node == a && name == "src"
        ));
    }

    #[tokio::test]
    async fn serialize_renders_subtree() {
        let doc = MemoryDocument::new();
        let panel = doc
            .insert_root(
                NodeSpec::new("iframe")
                    .with_attr("id", "panel")
                    .with_attr("src", "https://preview/1"),
            )
            .await;
        assert_eq!(
            doc.serialize(panel).unwrap(),
            "<iframe id=\"panel\" src=\"https://preview/1\"></iframe>"
        );
    }

    #[tokio::test]
    async fn closest_walks_ancestors() {
        let doc = MemoryDocument::new();
        let form = doc.insert_root(NodeSpec::new("form")).await;
        let div = doc.insert_child(form, NodeSpec::new("div")).await;
        let button = doc
            .insert_child(div, NodeSpec::new("button").with_attr("id", "send"))
            .await;
        assert_eq!(doc.closest(button, "form"), Some(form));
        assert_eq!(doc.closest(button, "table"), None);
    }
}
