//! Session-scoped store of recently created rows
//!
//! Rows created during the session stay visible before the backend lists them.
//! The store is owned by whoever owns the session and passed explicitly to the
//! code that merges listings; it is cleared on logout or when the user leaves
//! the page.

use std::collections::HashSet;

use tracing::debug;

use crate::row::{Row, RowId};

#[derive(Debug)]
pub struct RecentStore<R> {
    rows: Vec<R>,
}

impl<R> Default for RecentStore<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: Row + Clone> RecentStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a freshly created row. A row with the same id is replaced.
    pub fn remember(&mut self, row: R) {
        self.rows.retain(|kept| kept.id() != row.id());
        self.rows.push(row);
    }

    pub fn forget(&mut self, id: &RowId) -> Option<R> {
        let position = self.rows.iter().position(|row| row.id() == id)?;
        Some(self.rows.remove(position))
    }

    /// Combine a listing with the rows it does not contain yet.
    ///
    /// Pending rows come first, newest first. Rows the listing already has are
    /// dropped from the store.
    pub fn merge(&mut self, fetched: Vec<R>) -> Vec<R> {
        let listed = fetched
            .iter()
            .map(|row| row.id().clone())
            .collect::<HashSet<_>>();
        let before = self.rows.len();
        self.rows.retain(|row| !listed.contains(row.id()));
        debug!(
            confirmed = before - self.rows.len(),
            pending = self.rows.len(),
            "merge recent rows"
        );
        self.rows.iter().rev().cloned().chain(fetched).collect()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
