//! Table engine
//!
//! Holds the loaded rows together with the interactive view state: column
//! filters, free-text search, sorting, pagination, selection and tree
//! expansion. Rows are never modified in place; a refresh replaces the whole
//! collection through [`TableEngine::replace_rows`].
//!
//! The view pipeline is filters, then search, then sort, then pagination.

use indexmap::IndexMap;
use tracing::trace;

use crate::{
    config::{Filter, SearchField},
    row::{Row, RowId, display_value},
    schema::TableSchema,
};

mod expand;
mod selection;
mod sort;

pub use expand::ExpandState;
pub use selection::Selection;
pub use sort::{Direction, Sort, compare_values};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("No filter is configured for field {0}")]
    UnknownFilter(String),
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    needle_lower.is_empty() || haystack.to_lowercase().contains(needle_lower)
}

pub struct TableEngine<R> {
    rows: Vec<R>,
    searchable: Vec<SearchField>,
    definitions: IndexMap<String, Filter>,
    page_size: usize,
    sort: Option<Sort>,
    filters: IndexMap<String, String>,
    search: String,
    page: usize,
    selection: Selection,
    expanded: ExpandState,
}

impl<R: Row> TableEngine<R> {
    pub fn new(schema: &TableSchema, rows: Vec<R>) -> Self {
        Self {
            rows,
            searchable: schema.search_fields().to_vec(),
            definitions: schema
                .filters()
                .map(|filter| (filter.key.clone(), filter.clone()))
                .collect(),
            page_size: schema.page_size().max(1),
            sort: None,
            filters: IndexMap::new(),
            search: String::new(),
            page: 0,
            selection: Selection::default(),
            expanded: ExpandState::default(),
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Swap in a freshly loaded collection. Selection and expansion are reset.
    pub fn replace_rows(&mut self, rows: Vec<R>) {
        trace!(count = rows.len(), "replace table rows");
        self.rows = rows;
        self.selection.clear();
        self.expanded.collapse_all();
        self.page = self.page.min(self.page_count() - 1);
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.sort = sort;
    }

    /// A new key sorts ascending; the current key flips direction.
    pub fn toggle_sort(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.sort = Some(match self.sort.take() {
            Some(sort) if sort.key == key => Sort {
                key,
                direction: sort.direction.flip(),
            },
            _ => Sort {
                key,
                direction: Direction::Ascending,
            },
        });
    }

    /// Search fields in configured order, with their labels.
    pub fn search_fields(&self) -> &[SearchField] {
        &self.searchable
    }

    /// Configured column filters and their options.
    pub fn filter_definitions(&self) -> impl Iterator<Item = &Filter> {
        self.definitions.values()
    }

    /// Only configured filter keys are accepted. An empty value removes the
    /// filter.
    pub fn set_filter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), Error> {
        let key = key.into();
        if !self.definitions.contains_key(&key) {
            return Err(Error::UnknownFilter(key));
        }
        let value = value.into();
        if value.is_empty() {
            self.filters.shift_remove(&key);
        } else {
            self.filters.insert(key, value);
        }
        self.page = 0;
        Ok(())
    }

    pub fn clear_filter(&mut self, key: &str) {
        self.filters.shift_remove(key);
        self.page = 0;
    }

    pub fn filters(&self) -> &IndexMap<String, String> {
        &self.filters
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.page = 0;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    fn passes_filters(&self, row: &R) -> bool {
        self.filters.iter().all(|(key, value)| {
            contains_ignore_case(&display_value(row.field(key)), &value.to_lowercase())
        })
    }

    fn matches_search(&self, row: &R, query: &str) -> bool {
        query.is_empty()
            || self
                .searchable
                .iter()
                .any(|field| contains_ignore_case(&display_value(row.field(&field.key)), query))
    }

    /// Rows passing every column filter and the search query, in loaded order.
    pub fn filtered(&self) -> Vec<&R> {
        let query = self.search.to_lowercase();
        self.rows
            .iter()
            .filter(|row| self.passes_filters(row) && self.matches_search(row, &query))
            .collect()
    }

    pub fn sorted(&self) -> Vec<&R> {
        let mut rows = self.filtered();
        if let Some(sort) = &self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.field(&sort.key), b.field(&sort.key));
                match sort.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        rows
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// At least one, even when nothing matches.
    pub fn page_count(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size).max(1)
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    pub fn page_rows(&self) -> Vec<&R> {
        self.sorted()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selection.contains(id)
    }

    pub fn toggle_row(&mut self, id: &RowId) -> bool {
        self.selection.toggle(id)
    }

    pub fn select_all_on_page(&mut self) {
        let ids = self
            .page_rows()
            .into_iter()
            .map(|row| row.id().clone())
            .collect::<Vec<_>>();
        self.selection.extend(&ids);
    }

    pub fn select_all_filtered(&mut self) {
        let ids = self
            .filtered()
            .into_iter()
            .map(|row| row.id().clone())
            .collect::<Vec<_>>();
        self.selection.extend(&ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected rows in loaded order.
    pub fn selected_rows(&self) -> Vec<&R> {
        self.rows
            .iter()
            .filter(|row| self.selection.contains(row.id()))
            .collect()
    }

    pub fn selected_ids(&self) -> Vec<RowId> {
        self.selected_rows()
            .into_iter()
            .map(|row| row.id().clone())
            .collect()
    }

    pub fn expanded(&self) -> &ExpandState {
        &self.expanded
    }

    pub fn toggle_expanded(&mut self, id: &RowId) -> bool {
        self.expanded.toggle(id)
    }

    pub fn set_expanded(&mut self, id: &RowId, expanded: bool) {
        self.expanded.set(id, expanded);
    }

    pub fn is_expanded(&self, id: &RowId) -> bool {
        self.expanded.is_expanded(id)
    }

    pub fn collapse_all(&mut self) {
        self.expanded.collapse_all();
    }
}
