use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{Error, ErrorContext, ErrorDetail};

fn default_page_size() -> usize {
    10
}

fn default_separator() -> String {
    "-".to_owned()
}

/// How a row's string id is derived from a backend entity.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IdConvention {
    Field {
        name: String,
    },
    Compound {
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

impl Default for IdConvention {
    fn default() -> Self {
        Self::Field {
            name: "id".to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Field {
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub editable: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchField {
    pub key: String,
    pub label: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Filter {
    pub key: String,
    pub label: Option<String>,
    #[serde(default)]
    pub options: Vec<FilterOption>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TableConfig {
    pub table: String,
    #[serde(default)]
    pub id: IdConvention,
    pub parent: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub fields: IndexMap<String, Field>,
    #[serde(default)]
    pub search: Vec<SearchField>,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl TableConfig {
    pub fn from_yaml(document: &str) -> Result<Self, Error> {
        serde_yaml::from_str(document)
            .map_err(|error| ErrorContext::new("config").error(ErrorDetail::ParseYaml(error)))
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let ctx = ErrorContext::new(path.as_ref().display().to_string());
        let document = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| ctx.error(ErrorDetail::ReadDocument(error)))?;
        serde_yaml::from_str(&document).map_err(|error| ctx.error(ErrorDetail::ParseYaml(error)))
    }
}
