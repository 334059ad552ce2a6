//! Activity Tree
//!
//! Owns every node in an arena keyed by `NodeId`. Ids are handed out from a
//! counter that never goes backwards (not even on `clear`), so an id held by
//! a renderer or the registry can go stale but never points at another node.
//! Row positions are recomputed from the parent's child list on demand.

use crate::activity::node::{NodeKind, RequestRecord, RequestStatus, Subtree};
use crate::activity::observer::{ChangeAspect, ModelChange, ModelObserver};
use crate::events::model::RequestId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityNode {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ActivityNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Visual emphasis of a row, independent of any toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Muted,
    Alert,
    SslWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyle {
    pub tone: Tone,
    pub strike_out: bool,
}

pub struct ActivityTree {
    nodes: HashMap<NodeId, ActivityNode>,
    root: NodeId,
    next_id: u64,
    observers: Vec<Box<dyn ModelObserver>>,
}

impl Default for ActivityTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
            observers: Vec::new(),
        };
        tree.root = tree.alloc(NodeKind::Root, None);
        tree
    }

    pub fn subscribe(&mut self, observer: impl ModelObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ==================== Queries ====================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&ActivityNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Children of `id`; empty for unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Request rows in arrival order
    pub fn requests(&self) -> &[NodeId] {
        self.children(self.root)
    }

    /// Number of retained request rows
    pub fn len(&self) -> usize {
        self.requests().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests().is_empty()
    }

    /// Total nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn record(&self, id: NodeId) -> Option<&RequestRecord> {
        self.nodes.get(&id).and_then(|n| n.kind.as_request())
    }

    pub(crate) fn record_mut(&mut self, id: NodeId) -> Option<&mut RequestRecord> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Request(record)) => Some(record),
            _ => None,
        }
    }

    /// Row of `id` within its parent.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes.get(&id)?.parent?;
        let siblings = self.children(parent);
        if parent == self.root {
            // request rows are appended in id order and only removed from the front
            siblings.binary_search(&id).ok()
        } else {
            siblings.iter().position(|&sibling| sibling == id)
        }
    }

    /// Distance from the root; request rows are at depth 1
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        depth
    }

    /// The request row `id` belongs to (itself for a request row)
    pub fn request_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.nodes.get(&current)?;
            match node.parent {
                Some(parent) if parent == self.root => return Some(current),
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    pub fn text(&self, id: NodeId) -> String {
        self.nodes.get(&id).map(|n| n.kind.text()).unwrap_or_default()
    }

    pub fn tooltip(&self, id: NodeId) -> String {
        self.nodes
            .get(&id)
            .map(|n| n.kind.tooltip())
            .unwrap_or_default()
    }

    pub fn style(&self, id: NodeId) -> RowStyle {
        let Some(node) = self.nodes.get(&id) else {
            return RowStyle {
                tone: Tone::Normal,
                strike_out: false,
            };
        };
        let status = node.kind.status();
        let in_ssl_group = match &node.kind {
            NodeKind::Request(record) => record.ssl_errors,
            NodeKind::SslErrors => true,
            _ => node
                .parent
                .and_then(|p| self.nodes.get(&p))
                .is_some_and(|p| matches!(p.kind, NodeKind::SslErrors)),
        };
        let tone = if in_ssl_group {
            Tone::SslWarning
        } else {
            match status {
                RequestStatus::Pending | RequestStatus::Canceled => Tone::Muted,
                RequestStatus::Error | RequestStatus::Timeout => Tone::Alert,
                RequestStatus::Complete => Tone::Normal,
            }
        };
        RowStyle {
            tone,
            strike_out: status == RequestStatus::Canceled,
        }
    }

    /// Number of direct children of `id` matching `pred`
    pub fn count_children(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.children(id)
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .filter(|c| pred(&c.kind))
            .count()
    }

    // ==================== Mutations ====================

    /// Append a request subtree as the newest root row and return its row.
    pub fn insert_request(&mut self, subtree: Subtree) -> (NodeId, usize) {
        assert!(
            matches!(subtree.kind, NodeKind::Request(_)),
            "only request rows can be attached to the root"
        );
        let root = self.root;
        let id = self.attach(root, subtree);
        let row = self.children(root).len() - 1;
        self.emit(ModelChange::RowsInserted {
            parent: root,
            first: row,
            last: row,
        });
        (id, row)
    }

    /// Attach `subtree` as the last child of `parent`, then mark `parent` changed.
    pub fn augment(&mut self, parent: NodeId, subtree: Subtree) -> NodeId {
        assert!(self.contains(parent), "augment on unknown node {:?}", parent);
        let id = self.attach(parent, subtree);
        let row = self.children(parent).len() - 1;
        self.emit(ModelChange::RowsInserted {
            parent,
            first: row,
            last: row,
        });
        self.emit(ModelChange::DataChanged {
            node: parent,
            aspect: ChangeAspect::All,
        });
        id
    }

    /// Drop the `n` oldest request rows and return the ids they carried.
    pub fn evict_oldest(&mut self, n: usize) -> Vec<RequestId> {
        let count = n.min(self.len());
        if count == 0 {
            return Vec::new();
        }
        let root = self.root;
        let removed: Vec<NodeId> = match self.nodes.get_mut(&root) {
            Some(node) => node.children.drain(..count).collect(),
            None => Vec::new(),
        };
        let mut evicted = Vec::with_capacity(count);
        for id in removed {
            if let Some(record) = self.record(id) {
                evicted.push(record.id.clone());
            }
            self.drop_subtree(id);
        }
        self.emit(ModelChange::RowsRemoved {
            parent: root,
            first: 0,
            last: count - 1,
        });
        evicted
    }

    /// Discard every request row at once.
    pub fn clear(&mut self) {
        let root = self.root;
        self.nodes.retain(|&id, _| id == root);
        if let Some(node) = self.nodes.get_mut(&root) {
            node.children.clear();
        }
        self.emit(ModelChange::Reset);
    }

    pub(crate) fn notify_data_changed(&mut self, node: NodeId, aspect: ChangeAspect) {
        self.emit(ModelChange::DataChanged { node, aspect });
    }

    pub(crate) fn emit(&mut self, change: ModelChange) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer.model_changed(self, &change);
        }
        self.observers = observers;
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            ActivityNode {
                kind,
                parent,
                children: Vec::new(),
            },
        );
        id
    }

    fn attach(&mut self, parent: NodeId, subtree: Subtree) -> NodeId {
        let Subtree { kind, children } = subtree;
        let id = self.alloc(kind, Some(parent));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        for child in children {
            self.attach(id, child);
        }
        id
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.children);
            }
        }
    }
}
