use crate::activity::node::{RequestRecord, RequestStatus};
use crate::activity::tree::{ActivityTree, NodeId};
use std::collections::HashSet;

/// Row-level filter over the activity tree.
///
/// Only request rows are tested; everything below a visible request row is
/// visible with it. Nothing here mutates the tree, and nothing is cached:
/// each query walks the current request rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFilter {
    needle: String,
    pub show_successful: bool,
    pub show_timeouts: bool,
}

impl Default for ActivityFilter {
    fn default() -> Self {
        Self {
            needle: String::new(),
            show_successful: true,
            show_timeouts: true,
        }
    }
}

/// One visible row with its nesting depth (request rows are depth 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRow {
    pub node: NodeId,
    pub depth: usize,
}

impl ActivityFilter {
    pub fn new(substring: &str, show_successful: bool, show_timeouts: bool) -> Self {
        let mut filter = Self {
            needle: String::new(),
            show_successful,
            show_timeouts,
        };
        filter.set_substring(substring);
        filter
    }

    /// Case-insensitive URL substring
    pub fn set_substring(&mut self, substring: &str) {
        self.needle = substring.to_lowercase();
    }

    pub fn substring(&self) -> &str {
        &self.needle
    }

    pub fn accepts(&self, record: &RequestRecord) -> bool {
        match record.status {
            RequestStatus::Complete | RequestStatus::Canceled if !self.show_successful => {
                return false
            }
            RequestStatus::Timeout if !self.show_timeouts => return false,
            _ => {}
        }
        self.needle.is_empty() || record.url.as_str().to_lowercase().contains(&self.needle)
    }

    /// Whether `node` shows up in the projection
    pub fn is_visible(&self, tree: &ActivityTree, node: NodeId) -> bool {
        if node == tree.root() {
            return true;
        }
        tree.request_of(node)
            .and_then(|request| tree.record(request))
            .is_some_and(|record| self.accepts(record))
    }

    /// Visible request rows in arrival order
    pub fn visible_rows(&self, tree: &ActivityTree) -> Vec<NodeId> {
        tree.requests()
            .iter()
            .copied()
            .filter(|&id| tree.record(id).is_some_and(|record| self.accepts(record)))
            .collect()
    }

    /// Visible rows in display order, descending only into `expanded` nodes.
    pub fn flatten(&self, tree: &ActivityTree, expanded: &HashSet<NodeId>) -> Vec<FlatRow> {
        let mut rows = Vec::new();
        for request in self.visible_rows(tree) {
            push_rows(tree, request, 0, expanded, &mut rows);
        }
        rows
    }

    /// Like `flatten` with every node expanded.
    pub fn flatten_all(&self, tree: &ActivityTree) -> Vec<FlatRow> {
        let mut rows = Vec::new();
        for request in self.visible_rows(tree) {
            push_all(tree, request, 0, &mut rows);
        }
        rows
    }
}

fn push_rows(
    tree: &ActivityTree,
    node: NodeId,
    depth: usize,
    expanded: &HashSet<NodeId>,
    rows: &mut Vec<FlatRow>,
) {
    rows.push(FlatRow { node, depth });
    if expanded.contains(&node) {
        for &child in tree.children(node) {
            push_rows(tree, child, depth + 1, expanded, rows);
        }
    }
}

fn push_all(tree: &ActivityTree, node: NodeId, depth: usize, rows: &mut Vec<FlatRow>) {
    rows.push(FlatRow { node, depth });
    for &child in tree.children(node) {
        push_all(tree, child, depth + 1, rows);
    }
}
