use indexmap::IndexMap;
use itertools::Itertools;

use crate::config::{self, IdConvention};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Id field is undefined")]
    IdUndefined,
    #[error("Page size must be greater than zero")]
    ZeroPageSize,
    #[error("Unknown search field: {0}")]
    UnknownSearchField(String),
    #[error("Search field listed twice: {0}")]
    DuplicateSearchField(String),
    #[error("Unknown filter field: {0}")]
    UnknownFilterField(String),
    #[error("Parent field {0} is also the id field")]
    ParentIsId(String),
    #[error("Id field {0} cannot be editable")]
    EditableId(String),
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub label: String,
    pub required: bool,
    pub editable: bool,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub(crate) table: String,
    pub(crate) id: IdConvention,
    pub(crate) parent: Option<String>,
    pub(crate) page_size: usize,
    pub(crate) fields: IndexMap<String, FieldSchema>,
    pub(crate) searchable: Vec<config::SearchField>,
    pub(crate) filters: IndexMap<String, config::Filter>,
}

impl TableSchema {
    pub fn compile(config: &config::TableConfig) -> Result<Self, Error> {
        let id_fields: Vec<&str> = match &config.id {
            IdConvention::Field { name } => vec![name.as_str()],
            IdConvention::Compound { fields, .. } => fields.iter().map(String::as_str).collect(),
        };
        if id_fields.is_empty() || id_fields.iter().any(|name| name.is_empty()) {
            return Err(Error::IdUndefined);
        }
        if config.page_size == 0 {
            return Err(Error::ZeroPageSize);
        }
        if let Some(parent) = &config.parent {
            if id_fields.contains(&parent.as_str()) {
                return Err(Error::ParentIsId(parent.clone()));
            }
        }
        let is_id = |name: &str| name == "id" || id_fields.contains(&name);
        if let Some((name, _)) = config
            .fields
            .iter()
            .find(|(name, def)| def.editable && is_id(name.as_str()))
        {
            return Err(Error::EditableId(name.clone()));
        }
        let known = |key: &str| {
            config.fields.contains_key(key)
                || id_fields.contains(&key)
                || config.parent.as_deref() == Some(key)
        };
        if let Some(field) = config.search.iter().find(|field| !known(field.key.as_str())) {
            return Err(Error::UnknownSearchField(field.key.clone()));
        }
        if let Some(key) = config.search.iter().map(|field| &field.key).duplicates().next() {
            return Err(Error::DuplicateSearchField(key.clone()));
        }
        if let Some(filter) = config
            .filters
            .iter()
            .find(|filter| !known(filter.key.as_str()))
        {
            return Err(Error::UnknownFilterField(filter.key.clone()));
        }

        let fields = config
            .fields
            .iter()
            .map(|(name, def)| {
                (
                    name.clone(),
                    FieldSchema {
                        label: def.label.clone().unwrap_or_else(|| name.clone()),
                        required: def.required,
                        editable: def.editable,
                    },
                )
            })
            .collect();
        let filters = config
            .filters
            .iter()
            .map(|filter| (filter.key.clone(), filter.clone()))
            .collect();
        Ok(Self {
            table: config.table.clone(),
            id: config.id.clone(),
            parent: config.parent.clone(),
            page_size: config.page_size,
            fields,
            searchable: config.search.clone(),
            filters,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_convention(&self) -> &IdConvention {
        &self.id
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn search_fields(&self) -> &[config::SearchField] {
        &self.searchable
    }

    pub fn filters(&self) -> impl Iterator<Item = &config::Filter> {
        self.filters.values()
    }

    /// Editable field names in declaration order.
    pub fn editable_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, def)| def.editable)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn required_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, def)| def.required)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }
}
