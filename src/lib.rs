pub mod accounts;
pub mod backend;
pub mod bulk;
pub mod config;
pub mod row;
pub mod schema;
pub mod store;
pub mod table;
pub mod tree;


pub use row::{Hierarchical, Record, Row, RowId};

#[derive(Debug, thiserror::Error)]
#[error("{context}: {detail}")]
pub struct Error {
    pub context: Box<ErrorContext>,
    pub detail: Box<ErrorDetail>,
}

/// Where in a row collection an error was raised.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub table: String,
    pub index: Option<usize>,
}

impl ErrorContext {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: None,
        }
    }

    pub(crate) fn at(&self, index: usize) -> Self {
        Self {
            table: self.table.clone(),
            index: Some(index),
        }
    }

    pub(crate) fn error(&self, detail: ErrorDetail) -> Error {
        Error {
            context: Box::new(self.clone()),
            detail: Box::new(detail),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorDetail {
    #[error("Failed to read document: {0}")]
    ReadDocument(std::io::Error),
    #[error("Failed to parse YAML document: {0}")]
    ParseYaml(serde_yaml::Error),
    #[error("Failed to serialize entity: {0}")]
    Serialize(serde_json::Error),
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: serde_json::Value,
    },
    #[error("Missing id field: {0}")]
    MissingId(String),
}
