//! Task 1 order scoring against annotation-derived reference pairs.
//!
//! Each system edge's endpoints are mapped to reference event ids through
//! the [`EventMapping`] of its schema. Edges where either side does not land
//! on a participant reference id are not assessed. Assessed edges are true
//! when the mapped pair is in the [`ReferenceOrderRelation`].

use super::record::{order_cells, OrderRecord, OrderRelation, ORDER_COLUMNS};
use super::reference::ReferenceOrderRelation;
use super::stats::{StatsScope, Task1Stats};
use crate::config::ScorerConfig;
use crate::table::Table;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// `(schema_id, ev_id) -> ev_reference_id` lookup.
#[derive(Debug, Clone, Default)]
pub struct EventMapping {
    map: HashMap<(String, String), String>,
}

impl EventMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. Repeating an identical row is fine; mapping the same
    /// event to a different reference id is [`Error::AmbiguousMapping`].
    pub fn insert(
        &mut self,
        schema_id: impl Into<String>,
        ev_id: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Result<()> {
        let key = (schema_id.into(), ev_id.into());
        let reference_id = reference_id.into();
        if let Some(existing) = self.map.get(&key) {
            if *existing != reference_id {
                return Err(Error::AmbiguousMapping {
                    schema_id: key.0,
                    ev_id: key.1,
                    first: existing.clone(),
                    second: reference_id,
                });
            }
            return Ok(());
        }
        self.map.insert(key, reference_id);
        Ok(())
    }

    /// Reference id of a system event, if mapped.
    pub fn resolve(&self, schema_id: &str, ev_id: &str) -> Option<&str> {
        self.map
            .get(&(schema_id.to_string(), ev_id.to_string()))
            .map(String::as_str)
    }

    /// Number of mapped events.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Build from a table with `schema_id`, `ev_id`, `ev_reference_id` columns.
    pub fn from_table(table: &Table) -> Result<Self> {
        let [schema, ev, reference] = table.columns(["schema_id", "ev_id", "ev_reference_id"])?;
        let mut mapping = EventMapping::new();
        for row in table.rows() {
            mapping.insert(
                row[schema].trim(),
                row[ev].trim(),
                row[reference].trim(),
            )?;
        }
        Ok(mapping)
    }

    /// Read a mapping file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }
}

/// Outcome for one Task 1 edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task1Assessment {
    /// An endpoint did not resolve to a participant reference id.
    Unassessed {
        /// Resolved before id, if any
        before_ref: Option<String>,
        /// Resolved after id, if any
        after_ref: Option<String>,
    },
    /// Both endpoints resolved; `correct` is reference membership.
    Assessed {
        /// Resolved before id
        before_ref: String,
        /// Resolved after id
        after_ref: String,
        /// Whether `(before_ref, after_ref)` is a reference pair
        correct: bool,
    },
}

impl Task1Assessment {
    /// The verdict, if assessed.
    pub fn verdict(&self) -> Option<bool> {
        match self {
            Task1Assessment::Unassessed { .. } => None,
            Task1Assessment::Assessed { correct, .. } => Some(*correct),
        }
    }

    fn cells(&self) -> [String; 3] {
        match self {
            Task1Assessment::Unassessed {
                before_ref,
                after_ref,
            } => [
                before_ref.clone().unwrap_or_default(),
                after_ref.clone().unwrap_or_default(),
                "NA".to_string(),
            ],
            Task1Assessment::Assessed {
                before_ref,
                after_ref,
                correct,
            } => [before_ref.clone(), after_ref.clone(), correct.to_string()],
        }
    }
}

/// A scored Task 1 edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Task1Order {
    /// The system edge
    pub record: OrderRecord,
    /// Its assessment
    pub assessment: Task1Assessment,
}

/// Task 1 scores for one file.
#[derive(Debug, Clone)]
pub struct Task1Result {
    /// Every edge with its assessment, in relation order
    pub orders: Vec<Task1Order>,
    /// File-level stats
    pub file: Task1Stats,
    /// Per-schema stats, in first-seen schema order
    pub schemas: Vec<Task1Stats>,
}

impl Task1Result {
    /// Column names of [`Task1Result::order_table`].
    pub fn order_columns() -> Vec<&'static str> {
        let mut columns = ORDER_COLUMNS.to_vec();
        columns.extend(["order_before_ref_id", "order_after_ref_id", "assessment"]);
        columns
    }

    /// Assessed order table.
    pub fn order_table(&self) -> Result<Table> {
        let mut table = Table::new(Self::order_columns());
        for order in &self.orders {
            let mut cells = order_cells(&order.record);
            cells.extend(order.assessment.cells());
            table.push_row(cells)?;
        }
        Ok(table)
    }

    /// File row followed by schema rows.
    pub fn stats_rows(&self) -> Vec<Task1Stats> {
        std::iter::once(self.file.clone())
            .chain(self.schemas.iter().cloned())
            .collect()
    }
}

fn assess(
    record: &OrderRecord,
    mapping: &EventMapping,
    reference: &ReferenceOrderRelation,
    config: &ScorerConfig,
) -> Task1Assessment {
    let resolve = |ev: &str| {
        mapping
            .resolve(&record.schema_id, ev)
            .map(|r| r.to_string())
    };
    let (before_ref, after_ref) = (resolve(&record.before), resolve(&record.after));
    match (before_ref, after_ref) {
        (Some(b), Some(a)) if config.is_participant(&b) && config.is_participant(&a) => {
            let correct = reference.contains(&b, &a);
            Task1Assessment::Assessed {
                before_ref: b,
                after_ref: a,
                correct,
            }
        }
        (before_ref, after_ref) => Task1Assessment::Unassessed {
            before_ref,
            after_ref,
        },
    }
}

/// Counts over a set of scored edges.
fn count<'a>(
    scope: StatsScope,
    orders: impl Iterator<Item = &'a Task1Order>,
    reference_count: usize,
) -> Task1Stats {
    let mut total = 0;
    let mut assessed = 0;
    let mut true_count = 0;
    let mut distinct: HashSet<(&str, &str)> = HashSet::new();
    for order in orders {
        total += 1;
        if let Task1Assessment::Assessed {
            before_ref,
            after_ref,
            correct,
        } = &order.assessment
        {
            assessed += 1;
            if *correct {
                true_count += 1;
                distinct.insert((before_ref.as_str(), after_ref.as_str()));
            }
        }
    }
    Task1Stats::from_counts(
        scope,
        total,
        assessed,
        true_count,
        distinct.len(),
        reference_count,
    )
}

/// Score every edge of one file's closed relation.
pub fn score_task1_order(
    file_id: &str,
    relation: &OrderRelation,
    mapping: &EventMapping,
    reference: &ReferenceOrderRelation,
    config: &ScorerConfig,
) -> Task1Result {
    let orders: Vec<Task1Order> = relation
        .records()
        .iter()
        .map(|record| Task1Order {
            assessment: assess(record, mapping, reference, config),
            record: record.clone(),
        })
        .collect();

    let file = count(StatsScope::file(file_id), orders.iter(), reference.len());
    let schemas: Vec<Task1Stats> = relation
        .schema_ids()
        .into_iter()
        .map(|schema_id| {
            count(
                StatsScope::schema(file_id, schema_id),
                orders.iter().filter(|o| o.record.schema_id == schema_id),
                reference.len(),
            )
        })
        .collect();

    file.check_consistency();
    let schema_total: usize = schemas.iter().map(|s| s.total).sum();
    if schema_total != file.total {
        log::warn!(
            "{}: schema order totals sum to {} but the file has {}",
            file_id,
            schema_total,
            file.total
        );
    }
    log::info!(
        "{}: task1 order precision {:?} recall {:?} ({} of {} assessed)",
        file_id,
        file.precision,
        file.recall,
        file.assessed,
        file.total
    );

    Task1Result {
        orders,
        file,
        schemas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::record::test_record;

    fn mapping(rows: &[(&str, &str, &str)]) -> EventMapping {
        let mut mapping = EventMapping::new();
        for (s, e, r) in rows {
            mapping.insert(*s, *e, *r).unwrap();
        }
        mapping
    }

    #[test]
    fn test_single_true_pair() {
        let relation: OrderRelation = std::iter::once(test_record("S", "e1", "e2")).collect();
        let mapping = mapping(&[("S", "e1", "VP1"), ("S", "e2", "VP2")]);
        let reference = ReferenceOrderRelation::from_pairs([("VP1", "VP2")]);
        let result =
            score_task1_order("f", &relation, &mapping, &reference, &ScorerConfig::default());

        assert_eq!(result.orders[0].assessment.verdict(), Some(true));
        assert_eq!(result.file.precision, Some(1.0));
        assert_eq!(result.file.recall, Some(1.0));
        assert_eq!(result.file.f_measure, Some(1.0));
        assert_eq!(result.schemas.len(), 1);
    }

    #[test]
    fn test_non_participant_not_assessed() {
        let relation: OrderRelation = std::iter::once(test_record("S", "e1", "e2")).collect();
        let mapping = mapping(&[("S", "e1", "XX9"), ("S", "e2", "VP2")]);
        let reference = ReferenceOrderRelation::from_pairs([("XX9", "VP2")]);
        let result =
            score_task1_order("f", &relation, &mapping, &reference, &ScorerConfig::default());

        assert_eq!(result.file.total, 1);
        assert_eq!(result.file.assessed, 0);
        assert_eq!(result.file.precision, None);
        assert_eq!(result.file.f_measure, None);
    }

    #[test]
    fn test_distinct_true_dedupes_resolved_pairs() {
        // two system events map onto the same reference event
        let relation: OrderRelation =
            vec![test_record("S", "e1", "e3"), test_record("S", "e2", "e3")]
                .into_iter()
                .collect();
        let mapping = mapping(&[("S", "e1", "VP1"), ("S", "e2", "VP1"), ("S", "e3", "VP3")]);
        let reference = ReferenceOrderRelation::from_pairs([("VP1", "VP3"), ("VP2", "VP3")]);
        let result =
            score_task1_order("f", &relation, &mapping, &reference, &ScorerConfig::default());

        assert_eq!(result.file.true_count, 2);
        assert_eq!(result.file.distinct_true, 1);
        assert_eq!(result.file.recall, Some(0.5));
    }

    #[test]
    fn test_mapping_is_scoped_by_schema() {
        let relation: OrderRelation = std::iter::once(test_record("T", "e1", "e2")).collect();
        let mapping = mapping(&[("S", "e1", "VP1"), ("S", "e2", "VP2")]);
        let reference = ReferenceOrderRelation::from_pairs([("VP1", "VP2")]);
        let result =
            score_task1_order("f", &relation, &mapping, &reference, &ScorerConfig::default());
        assert_eq!(result.file.assessed, 0);
    }

    #[test]
    fn test_ambiguous_mapping_is_error() {
        let mut mapping = EventMapping::new();
        mapping.insert("S", "e1", "VP1").unwrap();
        mapping.insert("S", "e1", "VP1").unwrap();
        mapping.insert("T", "e1", "VP2").unwrap();
        let err = mapping.insert("S", "e1", "VP9").unwrap_err();
        assert!(matches!(err, Error::AmbiguousMapping { .. }));
    }

    #[test]
    fn test_order_table_columns() {
        let relation: OrderRelation = std::iter::once(test_record("S", "e1", "e2")).collect();
        let result = score_task1_order(
            "f",
            &relation,
            &EventMapping::new(),
            &ReferenceOrderRelation::default(),
            &ScorerConfig::default(),
        );
        let table = result.order_table().unwrap();
        let assessment = table.column("assessment").unwrap();
        assert_eq!(table.rows().next().unwrap()[assessment], "NA");
        assert_eq!(result.stats_rows().len(), 2);
    }
}
