//! Order extraction from schema documents.
//!
//! A schema document is JSON(-LD) with a top-level `schemas` (or
//! `instances`) array, or a single schema object. Each schema carries an
//! optional `order` list:
//!
//! ```json
//! {
//!   "schemas": [{
//!     "@id": "cmu:Schema/1",
//!     "super": "cmu:Library/1",
//!     "order": [
//!       { "@id": "cmu:Order/1", "before": ["cmu:Ev/1", "cmu:Ev/2"], "after": "cmu:Ev/3",
//!         "ta1ref": "cmu:Lib/Order/9", "confidence": 0.8, "comment": "", "flags": "precondition" }
//!     ]
//!   }]
//! }
//! ```
//!
//! `before` and `after` may each be a single id or a list; one record is
//! emitted per element of their cross product.

use super::closure::{ClosureEngine, ClosureStats};
use super::record::{OrderRecord, OrderRelation, Task};
use crate::table::Table;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Provenance lookup for the events of one document, keyed by `(schema_id, ev_id)`.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    provenance: HashMap<(String, String), String>,
}

impl EventTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event's provenance. The first provenance seen for a key wins.
    pub fn insert(
        &mut self,
        schema_id: impl Into<String>,
        ev_id: impl Into<String>,
        provenance: impl Into<String>,
    ) {
        let key = (schema_id.into(), ev_id.into());
        let provenance = provenance.into();
        match self.provenance.get(&key) {
            Some(existing) if *existing != provenance => {
                log::warn!(
                    "event {} in schema {} has conflicting provenance '{}' and '{}', keeping the first",
                    key.1,
                    key.0,
                    existing,
                    provenance
                );
            }
            Some(_) => {}
            None => {
                self.provenance.insert(key, provenance);
            }
        }
    }

    /// Provenance of an event, or `""` when unknown.
    pub fn provenance(&self, schema_id: &str, ev_id: &str) -> &str {
        self.provenance
            .get(&(schema_id.to_string(), ev_id.to_string()))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.provenance.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.provenance.is_empty()
    }

    /// Build from a table with `schema_id`, `ev_id`, `ev_provenance` columns.
    pub fn from_table(table: &Table) -> Result<Self> {
        let [schema, ev, prov] = table.columns(["schema_id", "ev_id", "ev_provenance"])?;
        let mut events = EventTable::new();
        for row in table.rows() {
            events.insert(row[schema].as_str(), row[ev].as_str(), row[prov].as_str());
        }
        Ok(events)
    }

    /// Read an event table file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }
}

/// One order assertion as written in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAssertion {
    /// `@id`
    pub id: String,
    /// Before-event ids
    pub before: Vec<String>,
    /// After-event ids
    pub after: Vec<String>,
    /// `ta1ref`, empty when absent
    pub ta1ref: String,
    /// `confidence`
    pub confidence: Option<f64>,
    /// `comment`
    pub comment: String,
    /// `flags`
    pub flags: Vec<String>,
}

impl OrderAssertion {
    /// Every `(before, after)` pair of the cross product.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.before
            .iter()
            .flat_map(move |b| self.after.iter().map(move |a| (b.as_str(), a.as_str())))
    }
}

/// The order section of one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOrders {
    /// Schema `@id`
    pub schema_id: String,
    /// Schema `super`, empty when absent
    pub schema_super: String,
    /// Order assertions in document order
    pub orders: Vec<OrderAssertion>,
}

/// Parse the order sections of every schema in a document.
pub fn parse_schema_document(doc: &Value) -> Result<Vec<SchemaOrders>> {
    let schemas: Vec<&Value> = match doc.get("schemas").or_else(|| doc.get("instances")) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => {
            return Err(Error::parse(format!(
                "'schemas' must be an array, got {}",
                kind(other)
            )))
        }
        None if doc.get("@id").is_some() => vec![doc],
        None => return Err(Error::parse("document has no 'schemas' array")),
    };

    schemas.into_iter().map(parse_schema).collect()
}

fn parse_schema(schema: &Value) -> Result<SchemaOrders> {
    let schema_id = string_field(schema, "@id")?
        .ok_or_else(|| Error::parse("schema without '@id'"))?;
    let schema_super = string_field(schema, "super")?.unwrap_or_default();

    let orders = match schema.get("order") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|o| parse_order(o).transpose())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| match e {
                Error::Parse(msg) => Error::parse(format!("schema {}: {}", schema_id, msg)),
                other => other,
            })?,
        Some(other) => {
            return Err(Error::parse(format!(
                "schema {}: 'order' must be an array, got {}",
                schema_id,
                kind(other)
            )))
        }
    };

    Ok(SchemaOrders {
        schema_id,
        schema_super,
        orders,
    })
}

/// `None` for order objects without a `before`/`after` pair, such as
/// `container`/`contained` or `overlaps` assertions.
fn parse_order(order: &Value) -> Result<Option<OrderAssertion>> {
    let id = string_field(order, "@id")?.unwrap_or_default();
    if !has_field(order, "before") || !has_field(order, "after") {
        log::warn!("skipping order {:?}: no before/after pair", id);
        return Ok(None);
    }
    let before = string_list(order, "before")?;
    let after = string_list(order, "after")?;
    if before.is_empty() || after.is_empty() {
        log::warn!("order {} has an empty before or after list", id);
    }

    Ok(Some(OrderAssertion {
        before,
        after,
        ta1ref: string_field(order, "ta1ref")?.unwrap_or_default(),
        confidence: confidence_field(order)?,
        comment: string_list(order, "comment")?.join(" "),
        flags: string_list(order, "flags")?,
        id,
    }))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn string_field(obj: &Value, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::parse(format!(
            "'{}' must be a string, got {}",
            key,
            kind(other)
        ))),
    }
}

/// A string or a list of strings; absent gives an empty list.
fn string_list(obj: &Value, key: &str) -> Result<Vec<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(Error::parse(format!(
                    "'{}' entries must be strings, got {}",
                    key,
                    kind(other)
                ))),
            })
            .collect(),
        Some(other) => Err(Error::parse(format!(
            "'{}' must be a string or list of strings, got {}",
            key,
            kind(other)
        ))),
    }
}

fn has_field(obj: &Value, key: &str) -> bool {
    !matches!(obj.get(key), None | Some(Value::Null))
}

/// A JSON number, or a list whose first element is a number.
fn confidence_field(obj: &Value) -> Result<Option<f64>> {
    let value = match obj.get("confidence") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => match items.first() {
            None => return Ok(None),
            Some(first) => first,
        },
        Some(v) => v,
    };
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| Error::parse(format!("non-numeric confidence {}", value)))
}

/// Extract every order pair of a document, join provenance from `events`,
/// and close each schema transitively.
pub fn extract_orders(
    file_id: &str,
    task: Task,
    doc: &Value,
    events: &EventTable,
    engine: &ClosureEngine,
) -> Result<(OrderRelation, ClosureStats)> {
    let schemas = parse_schema_document(doc)?;
    let mut relation = OrderRelation::new();
    let mut duplicates = 0usize;

    for schema in &schemas {
        for order in &schema.orders {
            for (before, after) in order.pairs() {
                let record = OrderRecord {
                    file_id: file_id.to_string(),
                    task,
                    schema_id: schema.schema_id.clone(),
                    schema_super: schema.schema_super.clone(),
                    order_id: order.id.clone(),
                    before: before.to_string(),
                    before_provenance: events.provenance(&schema.schema_id, before).to_string(),
                    after: after.to_string(),
                    after_provenance: events.provenance(&schema.schema_id, after).to_string(),
                    ta1ref: order.ta1ref.clone(),
                    confidence: order.confidence,
                    comment: order.comment.clone(),
                    flags: order.flags.clone(),
                    inferred: false,
                };
                if record.is_self_loop() {
                    log::debug!("{}: self-loop order {} on {}", file_id, order.id, before);
                }
                if !relation.insert(record) {
                    duplicates += 1;
                }
            }
        }
    }

    if duplicates > 0 {
        log::warn!(
            "{}: {} order pairs repeat an earlier (schema, before, after) and were dropped",
            file_id,
            duplicates
        );
    }

    let (closed, stats) = engine.close(relation);
    log::info!(
        "{}: {} schemas, {} asserted order pairs, {} inferred",
        file_id,
        schemas.len(),
        stats.asserted,
        stats.inferred
    );
    Ok((closed, stats))
}

/// Extract order pairs from a Graph G document.
///
/// Same before/after resolution as [`extract_orders`], without provenance
/// join or closure. Provenance fields are left empty.
pub fn extract_graph_orders(file_id: &str, doc: &Value) -> Result<OrderRelation> {
    let mut relation = OrderRelation::new();
    for schema in parse_schema_document(doc)? {
        for order in &schema.orders {
            for (before, after) in order.pairs() {
                relation.insert(OrderRecord {
                    file_id: file_id.to_string(),
                    task: Task::Task2,
                    schema_id: schema.schema_id.clone(),
                    schema_super: schema.schema_super.clone(),
                    order_id: order.id.clone(),
                    before: before.to_string(),
                    before_provenance: String::new(),
                    after: after.to_string(),
                    after_provenance: String::new(),
                    ta1ref: order.ta1ref.clone(),
                    confidence: order.confidence,
                    comment: order.comment.clone(),
                    flags: order.flags.clone(),
                    inferred: false,
                });
            }
        }
    }
    Ok(relation)
}
