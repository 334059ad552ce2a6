use crate::activity::tree::NodeId;
use crate::events::model::RequestId;
use std::collections::HashMap;

/// Correlates follow-up events with the request row they belong to.
///
/// Holds node ids, not positions: rows shift after eviction, so callers ask
/// the tree for the current position when they need one.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    entries: HashMap<RequestId, NodeId>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false, leaving the existing entry alone, if `id` is taken.
    pub fn register(&mut self, id: RequestId, node: NodeId) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, node);
        true
    }

    pub fn lookup(&self, id: &RequestId) -> Option<NodeId> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn unregister(&mut self, id: &RequestId) -> Option<NodeId> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
