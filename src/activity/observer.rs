use crate::activity::tree::{ActivityTree, NodeId};
use std::cell::RefCell;
use std::rc::Rc;

/// Which part of a row changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAspect {
    /// Text, tooltip and style may all differ
    All,
    /// Only the tooltip/progress display changed; no full redraw needed
    Tooltip,
}

/// Change notifications, emitted synchronously right after the mutation.
///
/// Row ranges are inclusive, scoped to `parent`'s children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChange {
    RowsInserted {
        parent: NodeId,
        first: usize,
        last: usize,
    },
    RowsRemoved {
        parent: NodeId,
        first: usize,
        last: usize,
    },
    DataChanged {
        node: NodeId,
        aspect: ChangeAspect,
    },
    /// Filter parameters changed; the projection must be recomputed
    FilterChanged,
    /// Everything was discarded
    Reset,
}

impl ModelChange {
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ModelChange::RowsInserted { .. } | ModelChange::RowsRemoved { .. } | ModelChange::Reset
        )
    }
}

/// Receives change notifications from an `ActivityTree`
pub trait ModelObserver {
    fn model_changed(&mut self, tree: &ActivityTree, change: &ModelChange);
}

impl<F> ModelObserver for F
where
    F: FnMut(&ActivityTree, &ModelChange),
{
    fn model_changed(&mut self, tree: &ActivityTree, change: &ModelChange) {
        self(tree, change)
    }
}

/// Observer that keeps every notification, shared with the subscriber
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    changes: Rc<RefCell<Vec<ModelChange>>>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<ModelChange> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.borrow().is_empty()
    }
}

impl ModelObserver for ChangeLog {
    fn model_changed(&mut self, _tree: &ActivityTree, change: &ModelChange) {
        self.changes.borrow_mut().push(change.clone());
    }
}
