use tokio::sync::Mutex;
use tracing::info;

use crate::{
    bulk::BulkEditDraft,
    row::{Record, Row, RowId},
    schema::TableSchema,
};

use super::{BatchBackend, BatchResponse};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("memory backend failure: {0}")]
pub struct Error(pub String);

/// A call the backend received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load,
    BatchUpdate(Vec<BulkEditDraft>),
    BatchDelete(Vec<RowId>),
}

/// Scripted reply for the next mutation.
#[derive(Debug, Clone)]
pub enum Reply {
    Reject(Option<String>),
    Fail(String),
}

/// Backend holding its rows in memory. Applies mutations to its own copy and
/// records every call.
pub struct MemoryBackend {
    schema: TableSchema,
    rows: Mutex<Vec<Record>>,
    calls: Mutex<Vec<Call>>,
    next_reply: Mutex<Option<Reply>>,
    fail_load: Mutex<bool>,
}

impl MemoryBackend {
    pub fn new(schema: TableSchema, rows: Vec<Record>) -> Self {
        Self {
            schema,
            rows: Mutex::new(rows),
            calls: Mutex::default(),
            next_reply: Mutex::default(),
            fail_load: Mutex::default(),
        }
    }

    pub async fn rows(&self) -> Vec<Record> {
        self.rows.lock().await.clone()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Mutation calls only, without loads.
    pub async fn mutations(&self) -> Vec<Call> {
        self.calls()
            .await
            .into_iter()
            .filter(|call| !matches!(call, Call::Load))
            .collect()
    }

    pub async fn reply_next(&self, reply: Reply) {
        *self.next_reply.lock().await = Some(reply);
    }

    pub async fn fail_loads(&self, fail: bool) {
        *self.fail_load.lock().await = fail;
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    async fn scripted(&self) -> Option<Result<BatchResponse, Error>> {
        match self.next_reply.lock().await.take()? {
            Reply::Reject(message) => Some(Ok(BatchResponse {
                status: false,
                message,
            })),
            Reply::Fail(message) => Some(Err(Error(message))),
        }
    }
}

impl BatchBackend for MemoryBackend {
    type Row = Record;
    type Error = Error;

    async fn load(&self) -> Result<Vec<Record>, Error> {
        self.record(Call::Load).await;
        if *self.fail_load.lock().await {
            return Err(Error("load failed".into()));
        }
        Ok(self.rows().await)
    }

    async fn batch_update(&self, items: &[BulkEditDraft]) -> Result<BatchResponse, Error> {
        self.record(Call::BatchUpdate(items.to_vec())).await;
        if let Some(reply) = self.scripted().await {
            return reply;
        }
        let mut rows = self.rows.lock().await;
        // all or nothing
        let mut updated = rows.clone();
        let mut count = 0;
        for item in items {
            if let Some(row) = updated.iter_mut().find(|row| row.id() == &item.id) {
                row.apply(&self.schema, &item.fields)
                    .map_err(|e| Error(e.to_string()))?;
                count += 1;
            }
        }
        *rows = updated;
        info!(updated = count, "memory batch update");
        Ok(BatchResponse::ok(format!("{count} rows updated")))
    }

    async fn batch_delete(&self, ids: &[RowId]) -> Result<BatchResponse, Error> {
        self.record(Call::BatchDelete(ids.to_vec())).await;
        if let Some(reply) = self.scripted().await {
            return reply;
        }
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| !ids.contains(row.id()));
        let deleted = before - rows.len();
        info!(deleted, "memory batch delete");
        Ok(BatchResponse::ok(format!("{deleted} rows deleted")))
    }
}
