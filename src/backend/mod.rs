use serde::{Deserialize, Serialize};

pub mod http;
pub mod memory;

use crate::{
    bulk::BulkEditDraft,
    row::{Row, RowId},
};

/// Reply of a batch endpoint. Anything but `status == true` is a failure and
/// `message` is shown to the user as is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl BatchResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: Some(message.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: Some(message.into()),
        }
    }
}

/// The backend API a table talks to.
pub trait BatchBackend {
    type Row: Row;
    type Error: std::fmt::Display;

    /// Fetch the current row collection.
    fn load(&self) -> impl Future<Output = Result<Vec<Self::Row>, Self::Error>>;

    fn batch_update(
        &self,
        items: &[BulkEditDraft],
    ) -> impl Future<Output = Result<BatchResponse, Self::Error>>;

    fn batch_delete(
        &self,
        ids: &[RowId],
    ) -> impl Future<Output = Result<BatchResponse, Self::Error>>;

    fn update_one(
        &self,
        item: &BulkEditDraft,
    ) -> impl Future<Output = Result<BatchResponse, Self::Error>> {
        self.batch_update(std::slice::from_ref(item))
    }

    fn delete_one(&self, id: &RowId) -> impl Future<Output = Result<BatchResponse, Self::Error>> {
        self.batch_delete(std::slice::from_ref(id))
    }
}
