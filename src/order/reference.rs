//! Reference precedence relations.
//!
//! - Task 1: derived from per-event temporal judgments with [`precedes`].
//! - Task 2: the Graph G edge set, consumed as given ([`GoldGraph`]).

use super::record::OrderRelation;
use crate::table::Table;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Type tag of one temporal constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Occurs exactly at the value
    Exactly,
    /// Occurs before the value
    Before,
    /// Occurs after the value
    After,
    /// Annotator could not place the event
    Unknown,
    /// No constraint given (`EMPTY_NA`)
    EmptyNa,
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("empty_na") {
            return Ok(OrderType::EmptyNa);
        }
        match s.to_ascii_lowercase().as_str() {
            "exactly" => Ok(OrderType::Exactly),
            "before" => Ok(OrderType::Before),
            "after" => Ok(OrderType::After),
            "unknown" => Ok(OrderType::Unknown),
            _ => Err(Error::parse(format!("unknown order type '{}'", s))),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderType::Exactly => "exactly",
            OrderType::Before => "before",
            OrderType::After => "after",
            OrderType::Unknown => "unknown",
            OrderType::EmptyNa => "EMPTY_NA",
        };
        f.write_str(s)
    }
}

/// Value attached to a constraint.
///
/// Numeric cells compare numerically; anything else compares as text, so
/// ISO-8601 dates order correctly. Numbers and text are not comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderValue {
    /// Numeric value
    Number(f64),
    /// Non-numeric value
    Text(String),
    /// Empty cell
    Missing,
}

impl OrderValue {
    /// Interpret a table cell.
    pub fn parse(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("empty_na") {
            return OrderValue::Missing;
        }
        match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => OrderValue::Number(n),
            _ => OrderValue::Text(cell.to_string()),
        }
    }

    fn compare(&self, other: &OrderValue) -> Option<Ordering> {
        match (self, other) {
            (OrderValue::Number(a), OrderValue::Number(b)) => a.partial_cmp(b),
            (OrderValue::Text(a), OrderValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn lt(&self, other: &OrderValue) -> Option<bool> {
        self.compare(other).map(|o| o == Ordering::Less)
    }

    fn le(&self, other: &OrderValue) -> Option<bool> {
        self.compare(other).map(|o| o != Ordering::Greater)
    }
}

/// One `(type, value)` constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint type
    pub kind: OrderType,
    /// Constraint value
    pub value: OrderValue,
}

impl Constraint {
    /// Build a constraint.
    pub fn new(kind: OrderType, value: OrderValue) -> Self {
        Self { kind, value }
    }
}

/// Temporal judgment for one reference event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnnotation {
    /// Reference event id (`eventprimitive_id`)
    pub event_id: String,
    /// `order1_type` / `order1_value`
    pub primary: Constraint,
    /// `order2_type` / `order2_value`
    pub secondary: Constraint,
}

impl TemporalAnnotation {
    /// Read annotations from a table with `eventprimitive_id`,
    /// `order1_type`, `order1_value`, `order2_type`, `order2_value` columns.
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        let [id, t1, v1, t2, v2] = table.columns([
            "eventprimitive_id",
            "order1_type",
            "order1_value",
            "order2_type",
            "order2_value",
        ])?;
        table
            .rows()
            .map(|row| {
                Ok(TemporalAnnotation {
                    event_id: row[id].trim().to_string(),
                    primary: Constraint::new(row[t1].parse()?, OrderValue::parse(&row[v1])),
                    secondary: Constraint::new(row[t2].parse()?, OrderValue::parse(&row[v2])),
                })
            })
            .collect()
    }

    /// Read an annotation file.
    pub fn read(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        Self::from_table(&Table::read(path)?)
    }
}

/// Whether `i` is inferable as occurring strictly before `j`.
///
/// `None` marks a combination the decision table does not cover (an
/// `EMPTY_NA` or `unknown` primary type) or values that cannot be compared.
/// Callers must not read `None` as either answer.
///
/// | i \ j   | exactly              | before | after                |
/// |---------|----------------------|--------|----------------------|
/// | exactly | v(i) < v(j)          | false  | v(i) <= v(j)         |
/// | before  | v(i) <= v(j)         | false  | v(i) <= v(j)         |
/// | after   | sec(i) <= v(j) [1]   | false  | sec(i) <= v(j) [1]   |
///
/// [1] only when i's secondary constraint is `before`; otherwise false.
pub fn precedes(i: &TemporalAnnotation, j: &TemporalAnnotation) -> Option<bool> {
    use OrderType::*;

    let (vi, vj) = (&i.primary.value, &j.primary.value);
    match (i.primary.kind, j.primary.kind) {
        (Exactly, Exactly) => vi.lt(vj),
        (Exactly, Before) => Some(false),
        (Exactly, After) => vi.le(vj),
        (Before, Exactly) => vi.le(vj),
        (Before, Before) => Some(false),
        (Before, After) => vi.le(vj),
        (After, Before) => Some(false),
        (After, Exactly) | (After, After) => {
            if i.secondary.kind == Before {
                i.secondary.value.le(vj)
            } else {
                Some(false)
            }
        }
        _ => None,
    }
}

/// Reference precedence pairs for one complex event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceOrderRelation {
    pairs: Vec<(String, String)>,
    index: HashSet<(String, String)>,
}

impl ReferenceOrderRelation {
    /// Build from explicit pairs. Duplicates are ignored.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut relation = Self::default();
        for (before, after) in pairs {
            let pair = (before.into(), after.into());
            if relation.index.insert(pair.clone()) {
                relation.pairs.push(pair);
            }
        }
        relation
    }

    /// Derive the relation from temporal judgments.
    ///
    /// Rows with an `unknown` primary type are dropped first. Every ordered
    /// pair of remaining rows with distinct event ids is tested with
    /// [`precedes`]; undecidable pairs are counted and logged, not emitted.
    pub fn from_annotations(annotations: &[TemporalAnnotation]) -> Self {
        let rows: Vec<&TemporalAnnotation> = annotations
            .iter()
            .filter(|a| a.primary.kind != OrderType::Unknown)
            .collect();

        let mut pairs = Vec::new();
        let mut undecided = 0usize;
        for i in &rows {
            for j in &rows {
                if i.event_id == j.event_id {
                    continue;
                }
                match precedes(i, j) {
                    Some(true) => pairs.push((i.event_id.clone(), j.event_id.clone())),
                    Some(false) => {}
                    None => {
                        undecided += 1;
                        log::debug!(
                            "cannot decide {} ({}) vs {} ({})",
                            i.event_id,
                            i.primary.kind,
                            j.event_id,
                            j.primary.kind
                        );
                    }
                }
            }
        }
        if undecided > 0 {
            log::warn!(
                "{} annotation pairs fall outside the precedence decision table and were skipped",
                undecided
            );
        }
        Self::from_pairs(pairs)
    }

    /// Whether `(before, after)` is a reference pair.
    pub fn contains(&self, before: &str, after: &str) -> bool {
        self.index
            .contains(&(before.to_string(), after.to_string()))
    }

    /// Number of reference pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether there are no reference pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in derivation order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Gold Graph G edge set for one complex event.
///
/// Edges are unique; the matcher consumes each at most once per pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoldGraph {
    edges: Vec<(String, String)>,
    index: HashMap<(String, String), usize>,
}

impl GoldGraph {
    /// Build from edges. Repeated edges are dropped with a warning.
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut graph = Self::default();
        let mut repeated = 0usize;
        for (before, after) in edges {
            let edge = (before.into(), after.into());
            if graph.index.contains_key(&edge) {
                repeated += 1;
                continue;
            }
            graph.index.insert(edge.clone(), graph.edges.len());
            graph.edges.push(edge);
        }
        if repeated > 0 {
            log::warn!("gold graph lists {} edges more than once", repeated);
        }
        graph
    }

    /// Build from an extracted Graph G relation.
    pub fn from_relation(relation: &OrderRelation) -> Self {
        Self::from_edges(
            relation
                .records()
                .iter()
                .map(|r| (r.before.as_str(), r.after.as_str())),
        )
    }

    /// Read a table with `order_before`, `order_after` columns.
    pub fn from_table(table: &Table) -> Result<Self> {
        let [before, after] = table.columns(["order_before", "order_after"])?;
        Ok(Self::from_edges(
            table.rows().map(|r| (r[before].as_str(), r[after].as_str())),
        ))
    }

    /// Read a gold edge file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }

    /// Render as an `order_before` / `order_after` table.
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(["order_before", "order_after"]);
        for (before, after) in &self.edges {
            table.push_row([before.as_str(), after.as_str()])?;
        }
        Ok(table)
    }

    /// Position of an edge, if present.
    pub fn position(&self, before: &str, after: &str) -> Option<usize> {
        self.index
            .get(&(before.to_string(), after.to_string()))
            .copied()
    }

    /// Number of gold edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges in load order.
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }
}
