use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::config::FeedSchema;

/// Column name carrying the action tag in exported views.
pub const ACTION_COLUMN: &str = "Action";

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Ordered column names with a name → position lookup.
///
/// Rows parsed from the same file share one `Columns` behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Columns {
    /// Build from header names. A repeated name keeps its first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns = Self::default();
        for name in names {
            columns.push(name.into());
        }
        columns
    }

    fn push(&mut self, name: String) -> usize {
        if let Some(&pos) = self.positions.get(&name) {
            return pos;
        }
        let pos = self.names.len();
        self.positions.insert(name.clone(), pos);
        self.names.push(name);
        pos
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Serialize for Columns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.names.len()))?;
        for name in &self.names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One tabular record: column name → string value, in header order.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<String>,
}

impl Row {
    /// Row over a shared column set. Short value lists are padded with
    /// empty strings, extra values are dropped.
    pub fn new(columns: Arc<Columns>, mut values: Vec<String>) -> Self {
        values.resize(columns.len(), String::new());
        Self { columns, values }
    }

    /// Row with its own column set. A repeated name keeps its first
    /// position and the last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut columns = Columns::default();
        let mut values: Vec<String> = Vec::new();
        for (name, value) in pairs {
            let pos = columns.push(name.into());
            if pos == values.len() {
                values.push(value.into());
            } else {
                values[pos] = value.into();
            }
        }
        Self {
            columns: Arc::new(columns),
            values,
        }
    }

    /// Value of `column`, `None` when the row has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .position(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Matching key: the value of `column` when present and non-empty.
    pub fn key(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .names()
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of option slots whose name field is non-empty.
    pub fn option_count(&self, schema: &FeedSchema) -> usize {
        schema
            .options
            .iter()
            .filter(|slot| self.get(&slot.name).is_some_and(|v| !v.is_empty()))
            .count()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Add,
    Remove,
    Update,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Remove => "Remove",
            Self::Update => "Update",
        }
    }

    /// Case-insensitive parse of an action tag read back from a file.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field that differs between a matched master and incoming row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub column: String,
    /// `None` when master has no such column.
    pub master: Option<String>,
    pub incoming: Option<String>,
}

/// A row plus the catalog mutation it calls for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub action: Action,
    pub row: Row,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

impl ChangeRecord {
    pub fn new(action: Action, row: Row) -> Self {
        Self {
            action,
            row,
            changes: Vec::new(),
        }
    }

    /// Column value as seen by the export stage: the `Action` column
    /// always reads as this record's tag.
    pub fn value(&self, column: &str) -> Option<&str> {
        if column == ACTION_COLUMN {
            Some(self.action.as_str())
        } else {
            self.row.get(column)
        }
    }

    pub fn variant_key<'a>(&'a self, schema: &FeedSchema) -> Option<&'a str> {
        self.row.get(&schema.variant_key)
    }

    pub fn parent_key<'a>(&'a self, schema: &FeedSchema) -> Option<&'a str> {
        self.row.get(&schema.parent_key)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub adds: usize,
    pub removes: usize,
    pub updates: usize,
    /// Distinct parent keys with at least one record.
    pub parents_touched: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub incoming_rows: usize,
    pub master_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub records: Vec<ChangeRecord>,
}
