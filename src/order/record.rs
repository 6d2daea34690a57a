//! Order records and indexed order relations.

use crate::table::Table;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Which evaluation task a record was extracted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Annotation-matched scoring against pairwise temporal judgments.
    Task1,
    /// Graph G recall scoring.
    Task2,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Task1 => write!(f, "task1"),
            Task::Task2 => write!(f, "task2"),
        }
    }
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task1" | "1" => Ok(Task::Task1),
            "task2" | "2" => Ok(Task::Task2),
            other => Err(Error::parse(format!("unknown task flag '{}'", other))),
        }
    }
}

/// Identity of an order edge: `(schema id, before, after)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderKey {
    /// Schema the edge belongs to
    pub schema_id: String,
    /// Before-event id
    pub before: String,
    /// After-event id
    pub after: String,
}

/// One directed precedence edge `before -> after`.
///
/// Self-loops (`before == after`) are representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Source file identifier
    pub file_id: String,
    /// Task flag
    pub task: Task,
    /// Schema `@id`
    pub schema_id: String,
    /// Schema's `super` (library) identifier, empty when absent
    pub schema_super: String,
    /// Order assertion `@id`, or the inferred marker
    pub order_id: String,
    /// Before-event id
    pub before: String,
    /// Provenance of the before-event, empty when unknown
    pub before_provenance: String,
    /// After-event id
    pub after: String,
    /// Provenance of the after-event, empty when unknown
    pub after_provenance: String,
    /// Attribution reference (`ta1ref`), or the inferred marker
    pub ta1ref: String,
    /// Confidence, when the assertion carried one
    pub confidence: Option<f64>,
    /// Free-text comment
    pub comment: String,
    /// Flags attached to the assertion
    pub flags: Vec<String>,
    /// Added by the transitive closure engine
    pub inferred: bool,
}

impl OrderRecord {
    /// The `(schema, before, after)` identity of this edge.
    pub fn key(&self) -> OrderKey {
        OrderKey {
            schema_id: self.schema_id.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }

    /// Whether the edge is a self-loop.
    pub fn is_self_loop(&self) -> bool {
        self.before == self.after
    }
}

/// Column names of a serialized order table, in order.
pub const ORDER_COLUMNS: [&str; 14] = [
    "file_id",
    "task",
    "schema_id",
    "schema_super",
    "order_id",
    "order_before",
    "order_before_provenance",
    "order_after",
    "order_after_provenance",
    "ta1ref",
    "confidence",
    "comment",
    "flags",
    "inferred",
];

/// Separator for the flattened `flags` column.
const FLAG_SEPARATOR: char = '|';

/// Render a record as the cells of [`ORDER_COLUMNS`].
pub fn order_cells(record: &OrderRecord) -> Vec<String> {
    vec![
        record.file_id.clone(),
        record.task.to_string(),
        record.schema_id.clone(),
        record.schema_super.clone(),
        record.order_id.clone(),
        record.before.clone(),
        record.before_provenance.clone(),
        record.after.clone(),
        record.after_provenance.clone(),
        record.ta1ref.clone(),
        record.confidence.map(|c| c.to_string()).unwrap_or_default(),
        record.comment.clone(),
        record.flags.join(&FLAG_SEPARATOR.to_string()),
        record.inferred.to_string(),
    ]
}

/// Parse an optional confidence cell. Empty means absent; anything
/// non-numeric is a data error.
pub fn parse_confidence(cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|c| c.is_finite())
        .map(Some)
        .ok_or_else(|| Error::parse(format!("non-numeric confidence '{}'", cell)))
}

fn parse_bool(cell: &str) -> Result<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(Error::parse(format!("expected boolean, got '{}'", other))),
    }
}

/// A set of order records for one file, unique by [`OrderKey`].
///
/// Insertion order is preserved. Membership is an O(1) hash lookup.
#[derive(Debug, Clone, Default)]
pub struct OrderRelation {
    records: Vec<OrderRecord>,
    keys: HashSet<OrderKey>,
}

impl OrderRelation {
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless an edge with the same key exists.
    /// Returns whether the record was added.
    pub fn insert(&mut self, record: OrderRecord) -> bool {
        if !self.keys.insert(record.key()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Whether an edge `(schema, before, after)` is present.
    pub fn contains(&self, schema_id: &str, before: &str, after: &str) -> bool {
        self.keys.contains(&OrderKey {
            schema_id: schema_id.to_string(),
            before: before.to_string(),
            after: after.to_string(),
        })
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the relation is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    /// Consume into records.
    pub fn into_records(self) -> Vec<OrderRecord> {
        self.records
    }

    /// Distinct schema ids in first-seen order.
    pub fn schema_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.schema_id.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Split into per-schema relations, in first-seen schema order.
    pub fn by_schema(&self) -> Vec<(String, Vec<&OrderRecord>)> {
        let mut groups: Vec<(String, Vec<&OrderRecord>)> = Vec::new();
        let mut slot: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            let idx = *slot.entry(record.schema_id.as_str()).or_insert_with(|| {
                groups.push((record.schema_id.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[idx].1.push(record);
        }
        groups
    }

    /// Serialize as an order table.
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(ORDER_COLUMNS);
        for record in &self.records {
            table.push_row(order_cells(record))?;
        }
        Ok(table)
    }

    /// Deserialize from an order table produced by [`OrderRelation::to_table`].
    ///
    /// Duplicate keys in the table are dropped with a warning.
    pub fn from_table(table: &Table) -> Result<Self> {
        let cols = table.columns(ORDER_COLUMNS)?;
        let mut relation = OrderRelation::new();
        let mut dropped = 0usize;
        for row in table.rows() {
            let cell = |i: usize| row[cols[i]].clone();
            let flags = cell(12);
            let record = OrderRecord {
                file_id: cell(0),
                task: cell(1).parse()?,
                schema_id: cell(2),
                schema_super: cell(3),
                order_id: cell(4),
                before: cell(5),
                before_provenance: cell(6),
                after: cell(7),
                after_provenance: cell(8),
                ta1ref: cell(9),
                confidence: parse_confidence(&row[cols[10]])?,
                comment: cell(11),
                flags: flags
                    .split(FLAG_SEPARATOR)
                    .filter(|f| !f.is_empty())
                    .map(|f| f.to_string())
                    .collect(),
                inferred: parse_bool(&row[cols[13]])?,
            };
            if !relation.insert(record) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::warn!("dropped {} duplicate order rows while loading table", dropped);
        }
        Ok(relation)
    }
}

impl FromIterator<OrderRecord> for OrderRelation {
    fn from_iter<T: IntoIterator<Item = OrderRecord>>(iter: T) -> Self {
        let mut relation = OrderRelation::new();
        for record in iter {
            relation.insert(record);
        }
        relation
    }
}

#[cfg(test)]
pub(crate) fn test_record(schema: &str, before: &str, after: &str) -> OrderRecord {
    OrderRecord {
        file_id: "file".to_string(),
        task: Task::Task1,
        schema_id: schema.to_string(),
        schema_super: String::new(),
        order_id: format!("{}-{}", before, after),
        before: before.to_string(),
        before_provenance: format!("p:{}", before),
        after: after.to_string(),
        after_provenance: format!("p:{}", after),
        ta1ref: "cmu:lib".to_string(),
        confidence: Some(0.5),
        comment: String::new(),
        flags: Vec::new(),
        inferred: false,
    }
}
