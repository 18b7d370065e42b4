use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Position of an object inside the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// One node of the loaded configuration hierarchy
#[derive(Debug, Clone)]
pub struct ConfigObject {
    pub id: ObjectId,

    /// The type tag, e.g. "fvTenant", "fvBD"
    pub class: String,

    /// Globally unique hierarchical path, e.g. "uni/tn-Prod/BD-web"
    pub path: String,

    /// Flat attribute mapping, values kept as strings
    pub attributes: BTreeMap<String, String>,

    /// Owned children, in payload order
    pub children: Vec<ObjectId>,

    pub parent: Option<ObjectId>,
}

impl ConfigObject {
    /// Attribute value, treating empty strings as unset
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Attribute "name", the naming property of most classes
    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }
}

/// Canonical identity of an object: its primary-key tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(pub Vec<String>);

impl ObjectKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectKey(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A starting object for closure computation: a type plus its identifying key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seed {
    pub class: String,
    pub key: ObjectKey,
}

impl Seed {
    pub fn new<I, S>(class: impl Into<String>, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Seed {
            class: class.into(),
            key: ObjectKey::new(key),
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.class, self.key)
    }
}

/// Column header of a projected table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// Remap namespace of the values in this column, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// One table row; values are aligned with the table's columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: ObjectKey,
    pub values: Vec<String>,
}

/// A named, ordered table of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,

    /// Indexes into `columns` forming the primary key
    pub primary_key: Vec<usize>,

    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>, primary_key: Vec<usize>) -> Self {
        Table {
            name: name.into(),
            columns,
            primary_key,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value of `column` in row `row`
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.values.get(idx).map(String::as_str)
    }

    /// Primary-key tuple of a value vector laid out like this table
    pub fn key_of(&self, values: &[String]) -> ObjectKey {
        ObjectKey(
            self.primary_key
                .iter()
                .map(|&i| values.get(i).cloned().unwrap_or_default())
                .collect(),
        )
    }

    /// A row as an ordered JSON object (column order preserved)
    pub fn row_object(&self, row: &Row) -> Map<String, Value> {
        let mut data = Map::new();
        for (column, value) in self.columns.iter().zip(row.values.iter()) {
            data.insert(column.name.clone(), Value::String(value.clone()));
        }
        data
    }
}

/// Configuration for the extraction process
#[derive(Debug, Clone)]
pub struct SliceConfig {
    /// Maximum number of objects a closure may visit before giving up
    pub max_objects: usize,

    /// Maximum relation hops from a seed
    pub max_depth: usize,
}

impl Default for SliceConfig {
    fn default() -> Self {
        SliceConfig {
            max_objects: 100_000,
            max_depth: 64,
        }
    }
}
