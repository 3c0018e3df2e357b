//! Chart of accounts
//!
//! Accounts reference their parent account by id and are shown as a tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    row::{Hierarchical, Row, RowId},
    table::ExpandState,
    tree::{self, TreeNode, VisibleNode},
};

#[derive(Deserialize)]
#[serde(untagged)]
enum Key {
    Text(String),
    Number(serde_json::Number),
}

impl Key {
    fn into_id(self) -> Option<RowId> {
        match self {
            Key::Text(text) if text.is_empty() => None,
            Key::Text(text) => Some(RowId::new(text)),
            Key::Number(number) => Some(RowId::new(number.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct AccountFields {
    id: Key,
    code: String,
    name: String,
    #[serde(default)]
    parent_id: Option<Key>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: RowId,
    parent_id: Option<RowId>,
    pub code: String,
    pub name: String,
    pub kind: Option<String>,
    pub balance: f64,
    fields: Map<String, Value>,
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = AccountFields::deserialize(deserializer)?;
        let id = raw
            .id
            .into_id()
            .ok_or_else(|| serde::de::Error::custom("empty account id"))?;
        Ok(Self::new(
            id,
            raw.parent_id.and_then(Key::into_id),
            raw.code,
            raw.name,
            raw.kind,
            raw.balance,
        ))
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.fields.serialize(serializer)
    }
}

impl Account {
    pub fn new(
        id: RowId,
        parent_id: Option<RowId>,
        code: String,
        name: String,
        kind: Option<String>,
        balance: f64,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::String(id.to_string()));
        fields.insert(
            "parent_id".into(),
            parent_id
                .as_ref()
                .map_or(Value::Null, |parent| Value::String(parent.to_string())),
        );
        fields.insert("code".into(), Value::String(code.clone()));
        fields.insert("name".into(), Value::String(name.clone()));
        fields.insert(
            "kind".into(),
            kind.clone().map_or(Value::Null, Value::String),
        );
        fields.insert(
            "balance".into(),
            serde_json::Number::from_f64(balance).map_or(Value::Null, Value::Number),
        );
        Self {
            id,
            parent_id,
            code,
            name,
            kind,
            balance,
            fields,
        }
    }
}

impl Row for Account {
    fn id(&self) -> &RowId {
        &self.id
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Hierarchical for Account {
    fn parent_id(&self) -> Option<&RowId> {
        self.parent_id.as_ref()
    }
}

pub struct AccountTree {
    forest: Vec<TreeNode<Account>>,
}

impl AccountTree {
    pub fn build(accounts: Vec<Account>) -> Self {
        Self {
            forest: tree::build_forest(accounts),
        }
    }

    pub fn forest(&self) -> &[TreeNode<Account>] {
        &self.forest
    }

    fn node(&self, id: &RowId) -> Option<&TreeNode<Account>> {
        self.forest
            .iter()
            .flat_map(|root| root.iter())
            .find(|node| node.row.id() == id)
    }

    /// Balance of the account plus every account below it.
    pub fn rolled_up_balance(&self, id: &RowId) -> Option<f64> {
        self.node(id)
            .map(|node| node.iter().map(|node| node.row.balance).sum())
    }

    /// Account codes from the root down to `id`.
    pub fn path(&self, id: &RowId) -> Option<Vec<&str>> {
        let mut path = Vec::new();
        let mut stack = self
            .forest
            .iter()
            .rev()
            .map(|root| (root, 0))
            .collect::<Vec<_>>();
        while let Some((node, depth)) = stack.pop() {
            path.truncate(depth);
            path.push(node.row.code.as_str());
            if node.row.id() == id {
                return Some(path);
            }
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
        None
    }

    pub fn visible(&self, expanded: &ExpandState) -> Vec<VisibleNode<'_, Account>> {
        tree::flatten_visible(&self.forest, expanded)
    }
}
