//! Row model
//!
//! Backend entities arrive in whatever shape the endpoint returns. This module
//! turns them into [`Record`]s carrying a stable string id, which is the only
//! shape the table engine, tree builder and bulk coordinator rely on.

use std::borrow::Cow;

use serde::{Deserialize, Serialize, ser::SerializeMap};
use serde_json::{Map, Value};

use crate::{Error, ErrorContext, ErrorDetail, config::IdConvention, schema::TableSchema};

/// Stable identifier of a row, unique within one loaded collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for RowId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Minimal shape every displayable row provides.
pub trait Row {
    fn id(&self) -> &RowId;

    fn field(&self, key: &str) -> Option<&Value>;
}

/// A row that may reference a parent row by id.
pub trait Hierarchical: Row {
    fn parent_id(&self) -> Option<&RowId>;
}

/// The uniform row produced by [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RowId,
    parent_id: Option<RowId>,
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RowId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            fields,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<RowId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Merge edited fields into the record. The parent id follows the parent
    /// field; the id itself is never edited.
    pub fn apply<'a>(
        &mut self,
        schema: &TableSchema,
        changes: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> Result<(), Error> {
        for (key, value) in changes {
            self.fields.insert(key.clone(), value.clone());
        }
        if let Some(key) = schema.parent_key() {
            self.parent_id = derive_parent(key, &self.fields)
                .map_err(|detail| ErrorContext::new(schema.table()).error(detail))?;
        }
        Ok(())
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl Row for Record {
    fn id(&self) -> &RowId {
        &self.id
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Hierarchical for Record {
    fn parent_id(&self) -> Option<&RowId> {
        self.parent_id.as_ref()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let extra = self.fields.keys().filter(|key| *key != "id").count();
        let mut map = serializer.serialize_map(Some(extra + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in self.fields.iter().filter(|(key, _)| *key != "id") {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Text used when searching and filtering a field.
pub fn display_value(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s),
        Some(Value::Bool(b)) => Cow::Owned(b.to_string()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(value) => Cow::Owned(value.to_string()),
    }
}

fn id_part(name: &str, value: Option<&Value>) -> Result<String, ErrorDetail> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            Err(ErrorDetail::MissingId(name.to_owned()))
        }
        Some(other) => Err(ErrorDetail::TypeMismatch {
            expected: "string or number",
            got: other.clone(),
        }),
    }
}

fn derive_id(convention: &IdConvention, fields: &Map<String, Value>) -> Result<RowId, ErrorDetail> {
    match convention {
        IdConvention::Field { name } => id_part(name, fields.get(name)).map(RowId),
        IdConvention::Compound { fields: names, separator } => {
            let parts = names
                .iter()
                .map(|name| id_part(name, fields.get(name)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RowId(parts.join(separator)))
        }
    }
}

fn derive_parent(key: &str, fields: &Map<String, Value>) -> Result<Option<RowId>, ErrorDetail> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(RowId(s.clone()))),
        Some(Value::Number(n)) => Ok(Some(RowId(n.to_string()))),
        Some(other) => Err(ErrorDetail::TypeMismatch {
            expected: "string, number or null",
            got: other.clone(),
        }),
    }
}

/// Attach ids to backend entities.
///
/// One record per entity, in input order. Ids are not de-duplicated; callers
/// guarantee uniqueness.
pub fn normalize(
    schema: &TableSchema,
    entities: impl IntoIterator<Item = Value>,
) -> Result<Vec<Record>, Error> {
    let ctx = ErrorContext::new(schema.table());
    entities
        .into_iter()
        .enumerate()
        .map(|(index, entity)| {
            let ctx = ctx.at(index);
            let fields = match entity {
                Value::Object(fields) => fields,
                other => {
                    return Err(ctx.error(ErrorDetail::TypeMismatch {
                        expected: "object",
                        got: other,
                    }));
                }
            };
            let id = derive_id(schema.id_convention(), &fields)
                .map_err(|detail| ctx.error(detail))?;
            let parent_id = match schema.parent_key() {
                Some(key) => derive_parent(key, &fields).map_err(|detail| ctx.error(detail))?,
                None => None,
            };
            Ok(Record {
                id,
                parent_id,
                fields,
            })
        })
        .collect()
}

/// [`normalize`] for typed entities.
pub fn normalize_serialize<T: Serialize>(
    schema: &TableSchema,
    entities: &[T],
) -> Result<Vec<Record>, Error> {
    let ctx = ErrorContext::new(schema.table());
    let values = entities
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            serde_json::to_value(entity)
                .map_err(|error| ctx.at(index).error(ErrorDetail::Serialize(error)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    normalize(schema, values)
}
