use std::collections::HashSet;

use crate::row::RowId;

/// Expanded tree rows. Everything is collapsed unless listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: HashSet<RowId>,
}

impl ExpandState {
    pub fn is_expanded(&self, id: &RowId) -> bool {
        self.expanded.contains(id)
    }

    pub fn toggle(&mut self, id: &RowId) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    pub fn set(&mut self, id: &RowId, expanded: bool) {
        if expanded {
            self.expanded.insert(id.clone());
        } else {
            self.expanded.remove(id);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}
