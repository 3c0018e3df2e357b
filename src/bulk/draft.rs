use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::row::{Row, RowId};

/// Editable copy of one selected row, sent to the backend as `{id, ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkEditDraft {
    pub id: RowId,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl BulkEditDraft {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether any of `required` is missing, null or whitespace only.
    pub fn has_blank(&self, required: &[String]) -> bool {
        required.iter().any(|key| is_blank(self.fields.get(key)))
    }
}

pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// One draft per selected row, seeded from the row's current values.
pub fn prepare_bulk_edit<R: Row>(selected: &[&R], editable: &[String]) -> Vec<BulkEditDraft> {
    selected
        .iter()
        .map(|row| BulkEditDraft {
            id: row.id().clone(),
            fields: editable
                .iter()
                .map(|key| (key.clone(), row.field(key).cloned().unwrap_or(Value::Null)))
                .collect(),
        })
        .collect()
}

/// Drafts whose required fields are all filled in, in their original order.
pub fn valid_drafts(drafts: &[BulkEditDraft], required: &[String]) -> Vec<BulkEditDraft> {
    drafts
        .iter()
        .filter(|draft| !draft.has_blank(required))
        .cloned()
        .collect()
}
