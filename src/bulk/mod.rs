//! Bulk mutation coordinator
//!
//! Turns a selection plus local edits into exactly one backend call, then
//! refreshes the table. Every failure leaves the coordinator interactive: a
//! rejected or failed call keeps the edit surface and the selection as they
//! were so the user can retry or cancel.
//!
//! The host disables its triggers while the [`Pending`] handle from
//! [`BulkCoordinator::pending`] is set. The handle stays readable while a
//! submission holds the coordinator.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, error, warn};

use crate::{
    backend::{BatchBackend, BatchResponse},
    row::{Row, RowId},
    schema::TableSchema,
    table::TableEngine,
};

mod draft;

pub use draft::{BulkEditDraft, is_blank, prepare_bulk_edit, valid_drafts};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BulkError {
    #[error("Nothing to save: every row is missing a required field")]
    Validation,
    #[error("No rows selected")]
    EmptySelection,
    #[error("No draft for row {0}")]
    UnknownDraft(RowId),
    #[error("Field {0} cannot be edited")]
    ReadOnlyField(String),
    #[error("{}", .0.as_deref().unwrap_or("Operation failed"))]
    Rejected(Option<String>),
    #[error("Something went wrong, please try again")]
    Unexpected,
}

/// Result of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub message: Option<String>,
    pub submitted: usize,
    /// False when the reload after the mutation failed.
    pub refreshed: bool,
}

/// Shared view of whether a submission is in flight.
#[derive(Debug, Clone, Default)]
pub struct Pending(Arc<AtomicBool>);

impl Pending {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn begin(&self) -> PendingGuard {
        self.0.store(true, Ordering::Release);
        PendingGuard(self.0.clone())
    }
}

/// Clears the flag when the submission finishes or its future is dropped.
struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct BulkCoordinator {
    drafts: Vec<BulkEditDraft>,
    required: Vec<String>,
    open: bool,
    pending: Pending,
    error: Option<String>,
}

async fn refresh<B: BatchBackend>(engine: &mut TableEngine<B::Row>, backend: &B) -> bool {
    match backend.load().await {
        Ok(rows) => {
            engine.replace_rows(rows);
            true
        }
        Err(error) => {
            warn!(%error, "reload after mutation failed");
            engine.clear_selection();
            engine.collapse_all();
            false
        }
    }
}

impl BulkCoordinator {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_set()
    }

    /// Handle the host keeps to watch submissions in flight.
    pub fn pending(&self) -> Pending {
        self.pending.clone()
    }

    /// Message of the last failure, cleared on open and on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn drafts(&self) -> &[BulkEditDraft] {
        &self.drafts
    }

    /// Open the edit surface seeded from the engine's selection.
    pub fn open_bulk_edit<R: Row>(
        &mut self,
        engine: &TableEngine<R>,
        schema: &TableSchema,
    ) -> &[BulkEditDraft] {
        let drafts = prepare_bulk_edit(&engine.selected_rows(), &schema.editable_fields());
        self.open_drafts(drafts, schema.required_fields())
    }

    pub fn open_drafts(
        &mut self,
        drafts: Vec<BulkEditDraft>,
        required: Vec<String>,
    ) -> &[BulkEditDraft] {
        debug!(count = drafts.len(), "open bulk edit");
        self.drafts = drafts;
        self.required = required;
        self.open = true;
        self.error = None;
        &self.drafts
    }

    pub fn close(&mut self) {
        self.drafts.clear();
        self.open = false;
        self.error = None;
    }

    pub fn update_draft_field(
        &mut self,
        id: &RowId,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), BulkError> {
        let field = field.into();
        if field == "id" {
            return Err(BulkError::ReadOnlyField(field));
        }
        let draft = self
            .drafts
            .iter_mut()
            .find(|draft| &draft.id == id)
            .ok_or_else(|| BulkError::UnknownDraft(id.clone()))?;
        draft.fields.insert(field, value.into());
        Ok(())
    }

    fn fail(&mut self, error: BulkError) -> BulkError {
        self.error = Some(error.to_string());
        error
    }

    fn settle<E: std::fmt::Display>(
        &mut self,
        action: &'static str,
        result: Result<BatchResponse, E>,
    ) -> Result<BatchResponse, BulkError> {
        match result {
            Ok(response) if response.status => {
                self.error = None;
                Ok(response)
            }
            Ok(response) => {
                warn!(action, message = ?response.message, "batch rejected");
                Err(self.fail(BulkError::Rejected(response.message)))
            }
            Err(e) => {
                error!(action, error = %e, "batch call failed");
                Err(self.fail(BulkError::Unexpected))
            }
        }
    }

    /// Submit the open drafts as one batch update.
    ///
    /// Drafts with a blank required field are left out. If none remain nothing
    /// is sent.
    pub async fn submit_bulk_edit<B: BatchBackend>(
        &mut self,
        engine: &mut TableEngine<B::Row>,
        backend: &B,
    ) -> Result<BatchOutcome, BulkError> {
        let valid = valid_drafts(&self.drafts, &self.required);
        if valid.is_empty() {
            return Err(self.fail(BulkError::Validation));
        }
        debug!(
            submitted = valid.len(),
            skipped = self.drafts.len() - valid.len(),
            "submit bulk edit"
        );
        let _pending = self.pending.begin();
        let result = backend.batch_update(&valid).await;
        let response = self.settle("batch_update", result)?;
        let refreshed = refresh(engine, backend).await;
        self.close();
        Ok(BatchOutcome {
            message: response.message,
            submitted: valid.len(),
            refreshed,
        })
    }

    /// Delete every selected row with one batch call.
    pub async fn submit_bulk_delete<B: BatchBackend>(
        &mut self,
        engine: &mut TableEngine<B::Row>,
        backend: &B,
    ) -> Result<BatchOutcome, BulkError> {
        let ids = engine.selected_ids();
        if ids.is_empty() {
            return Err(self.fail(BulkError::EmptySelection));
        }
        debug!(count = ids.len(), "submit bulk delete");
        let _pending = self.pending.begin();
        let result = backend.batch_delete(&ids).await;
        let response = self.settle("batch_delete", result)?;
        let refreshed = refresh(engine, backend).await;
        Ok(BatchOutcome {
            message: response.message,
            submitted: ids.len(),
            refreshed,
        })
    }

    /// Save a single row edited outside the bulk surface.
    pub async fn submit_single_edit<B: BatchBackend>(
        &mut self,
        engine: &mut TableEngine<B::Row>,
        backend: &B,
        draft: BulkEditDraft,
        required: &[String],
    ) -> Result<BatchOutcome, BulkError> {
        if draft.has_blank(required) {
            return Err(self.fail(BulkError::Validation));
        }
        let _pending = self.pending.begin();
        let result = backend.update_one(&draft).await;
        let response = self.settle("update_one", result)?;
        let refreshed = refresh(engine, backend).await;
        Ok(BatchOutcome {
            message: response.message,
            submitted: 1,
            refreshed,
        })
    }

    pub async fn submit_single_delete<B: BatchBackend>(
        &mut self,
        engine: &mut TableEngine<B::Row>,
        backend: &B,
        id: &RowId,
    ) -> Result<BatchOutcome, BulkError> {
        let _pending = self.pending.begin();
        let result = backend.delete_one(id).await;
        let response = self.settle("delete_one", result)?;
        let refreshed = refresh(engine, backend).await;
        Ok(BatchOutcome {
            message: response.message,
            submitted: 1,
            refreshed,
        })
    }
}
