use std::collections::HashSet;

use crate::row::RowId;

/// Ids of the currently selected rows, independent of sort, filter and page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<RowId>,
}

impl Selection {
    pub fn contains(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    /// Returns whether the row is selected afterwards.
    pub fn toggle(&mut self, id: &RowId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    pub fn insert(&mut self, id: RowId) {
        self.ids.insert(id);
    }

    pub fn extend<'a>(&mut self, ids: impl IntoIterator<Item = &'a RowId>) {
        self.ids.extend(ids.into_iter().cloned());
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
