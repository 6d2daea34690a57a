//! Task 2 order scoring against Graph G.
//!
//! ```text
//! NotYetChecked ──(bad ta1ref)──────────────────▶ Invalid
//!       │
//!       └─(good ta1ref)─┬─(unvisited gold edge)─▶ ValidMatched   gold edge: Unvisited ▶ Visited
//!                       └─(otherwise)───────────▶ ValidNoMatch
//! ```
//!
//! System edges are matched on their provenance endpoints. Each gold edge
//! satisfies at most one system edge per pass, so matches never exceed the
//! gold edge count.

use super::record::{order_cells, OrderRecord, OrderRelation, ORDER_COLUMNS};
use super::reference::GoldGraph;
use super::stats::{StatsScope, Task2Stats};
use crate::config::ScorerConfig;
use crate::table::Table;
use crate::Result;
use std::collections::HashMap;

/// Matching state of one system edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task2State {
    /// Not examined yet
    NotYetChecked,
    /// Attribution reference rejected; excluded from matching
    Invalid,
    /// Valid, but no unvisited gold edge has its endpoints
    ValidNoMatch,
    /// Valid and consumed a gold edge
    ValidMatched,
}

impl Task2State {
    /// `valid` column value.
    pub fn valid(&self) -> Option<bool> {
        match self {
            Task2State::NotYetChecked => None,
            Task2State::Invalid => Some(false),
            Task2State::ValidNoMatch | Task2State::ValidMatched => Some(true),
        }
    }

    /// `assessment` column value.
    pub fn matched(&self) -> Option<bool> {
        match self {
            Task2State::ValidNoMatch => Some(false),
            Task2State::ValidMatched => Some(true),
            Task2State::NotYetChecked | Task2State::Invalid => None,
        }
    }
}

/// Whether a `ta1ref` is acceptable: the inferred marker, or
/// `<team>:<anything>` with a known team code.
pub fn is_valid_attribution(ta1ref: &str, config: &ScorerConfig) -> bool {
    if ta1ref == config.inferred_marker {
        return true;
    }
    match ta1ref.split_once(':') {
        Some((team, _)) => config.is_team_code(team.trim()),
        None => false,
    }
}

/// Per-pass record of which gold edges have been consumed.
#[derive(Debug)]
pub struct GoldConsumption<'g> {
    gold: &'g GoldGraph,
    visited: Vec<bool>,
}

impl<'g> GoldConsumption<'g> {
    /// Start a pass with every edge unvisited.
    pub fn new(gold: &'g GoldGraph) -> Self {
        Self {
            gold,
            visited: vec![false; gold.len()],
        }
    }

    /// Consume the gold edge `(before, after)` if it exists and is unvisited.
    pub fn try_consume(&mut self, before: &str, after: &str) -> bool {
        match self.gold.position(before, after) {
            Some(i) if !self.visited[i] => {
                self.visited[i] = true;
                true
            }
            _ => false,
        }
    }

    /// Number of consumed gold edges.
    pub fn consumed(&self) -> usize {
        self.visited.iter().filter(|&&v| v).count()
    }
}

/// A scored Task 2 edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Task2Order {
    /// The system edge
    pub record: OrderRecord,
    /// Its terminal state
    pub state: Task2State,
}

/// Task 2 scores for one file.
#[derive(Debug, Clone)]
pub struct Task2Result {
    /// Every edge with its state, in relation order
    pub orders: Vec<Task2Order>,
    /// File-level stats
    pub file: Task2Stats,
    /// Per-schema stats, in first-seen schema order
    pub schemas: Vec<Task2Stats>,
}

fn bool_cell(value: Option<bool>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "NA".to_string())
}

impl Task2Result {
    /// Column names of [`Task2Result::order_table`].
    pub fn order_columns() -> Vec<&'static str> {
        let mut columns = ORDER_COLUMNS.to_vec();
        columns.extend(["valid", "assessment"]);
        columns
    }

    /// Assessed order table.
    pub fn order_table(&self) -> Result<Table> {
        let mut table = Table::new(Self::order_columns());
        for order in &self.orders {
            let mut cells = order_cells(&order.record);
            cells.push(bool_cell(order.state.valid()));
            cells.push(bool_cell(order.state.matched()));
            table.push_row(cells)?;
        }
        Ok(table)
    }

    /// File row followed by schema rows.
    pub fn stats_rows(&self) -> Vec<Task2Stats> {
        std::iter::once(self.file.clone())
            .chain(self.schemas.iter().cloned())
            .collect()
    }
}

#[derive(Default)]
struct Counts {
    all: usize,
    valid: usize,
    invalid: usize,
    matched: usize,
}

impl Counts {
    fn add(&mut self, state: Task2State) {
        self.all += 1;
        match state {
            Task2State::Invalid => self.invalid += 1,
            Task2State::ValidMatched => {
                self.valid += 1;
                self.matched += 1;
            }
            Task2State::ValidNoMatch => self.valid += 1,
            Task2State::NotYetChecked => {}
        }
    }

    fn into_stats(self, scope: StatsScope, gold_count: usize) -> Task2Stats {
        Task2Stats::from_counts(
            scope,
            self.all,
            self.valid,
            self.invalid,
            self.matched,
            gold_count,
        )
    }
}

/// Score every edge of one file against Graph G.
///
/// One consumption pass covers the whole file, so a gold edge matched by
/// one schema is not available to later schemas of the same file.
/// Per-schema recall is that schema's matches over the full gold count.
pub fn score_task2_order(
    file_id: &str,
    relation: &OrderRelation,
    gold: &GoldGraph,
    config: &ScorerConfig,
) -> Task2Result {
    let mut consumption = GoldConsumption::new(gold);
    let mut orders = Vec::with_capacity(relation.len());

    for record in relation.records() {
        let state = if !is_valid_attribution(&record.ta1ref, config) {
            Task2State::Invalid
        } else if !record.before_provenance.is_empty()
            && !record.after_provenance.is_empty()
            && consumption.try_consume(&record.before_provenance, &record.after_provenance)
        {
            Task2State::ValidMatched
        } else {
            Task2State::ValidNoMatch
        };
        orders.push(Task2Order {
            record: record.clone(),
            state,
        });
    }

    let mut file_counts = Counts::default();
    let mut schema_counts: HashMap<&str, Counts> = HashMap::new();
    for order in &orders {
        file_counts.add(order.state);
        schema_counts
            .entry(order.record.schema_id.as_str())
            .or_default()
            .add(order.state);
    }

    let file = file_counts.into_stats(StatsScope::file(file_id), gold.len());
    let schemas: Vec<Task2Stats> = relation
        .schema_ids()
        .into_iter()
        .map(|schema_id| {
            schema_counts
                .remove(schema_id)
                .unwrap_or_default()
                .into_stats(StatsScope::schema(file_id, schema_id), gold.len())
        })
        .collect();

    file.check_consistency();
    if file.matched != consumption.consumed() {
        log::warn!(
            "{}: {} matched edges but {} gold edges consumed",
            file_id,
            file.matched,
            consumption.consumed()
        );
    }
    log::info!(
        "{}: task2 order recall {:?} ({} of {} gold edges, {} invalid attributions)",
        file_id,
        file.recall,
        file.matched,
        file.gold_count,
        file.invalid
    );

    Task2Result {
        orders,
        file,
        schemas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::record::test_record;

    #[test]
    fn test_attribution_gate() {
        let config = ScorerConfig::default();
        assert!(is_valid_attribution("CMU:Lib/Order/1", &config));
        assert!(is_valid_attribution(&config.inferred_marker, &config));
        assert!(!is_valid_attribution("CMU-Lib-Order-1", &config));
        assert!(!is_valid_attribution("acme:Order/1", &config));
        assert!(!is_valid_attribution("", &config));
    }

    #[test]
    fn test_invalid_attribution_never_matches() {
        let mut record = test_record("S", "a", "b");
        record.ta1ref = "nobody".to_string();
        let relation: OrderRelation = std::iter::once(record).collect();
        let gold = GoldGraph::from_edges([("p:a", "p:b")]);
        let result = score_task2_order("f", &relation, &gold, &ScorerConfig::default());

        assert_eq!(result.orders[0].state, Task2State::Invalid);
        assert_eq!(result.file.all, 1);
        assert_eq!(result.file.invalid, 1);
        assert_eq!(result.file.matched, 0);
        assert_eq!(result.file.recall, Some(0.0));
    }

    #[test]
    fn test_unknown_team_prefix_never_matches() {
        let mut record = test_record("S", "a", "b");
        record.ta1ref = "acme:Order/1".to_string();
        let relation: OrderRelation = std::iter::once(record).collect();
        let gold = GoldGraph::from_edges([("p:a", "p:b")]);
        let result = score_task2_order("f", &relation, &gold, &ScorerConfig::default());

        assert_eq!(result.orders[0].state, Task2State::Invalid);
        assert_eq!(result.file.invalid, 1);
        assert_eq!(result.file.matched, 0);
        assert_eq!(result.file.recall, Some(0.0));
    }

    #[test]
    fn test_gold_edge_consumed_once() {
        let mut second = test_record("S", "a2", "b2");
        second.before_provenance = "p:a".to_string();
        second.after_provenance = "p:b".to_string();
        let relation: OrderRelation = vec![test_record("S", "a", "b"), second].into_iter().collect();
        let gold = GoldGraph::from_edges([("p:a", "p:b")]);
        let result = score_task2_order("f", &relation, &gold, &ScorerConfig::default());

        assert_eq!(result.orders[0].state, Task2State::ValidMatched);
        assert_eq!(result.orders[1].state, Task2State::ValidNoMatch);
        assert_eq!(result.file.matched, 1);
        assert_eq!(result.file.recall, Some(1.0));
    }

    #[test]
    fn test_empty_gold_recall_undefined() {
        let relation: OrderRelation = std::iter::once(test_record("S", "a", "b")).collect();
        let result =
            score_task2_order("f", &relation, &GoldGraph::default(), &ScorerConfig::default());
        assert_eq!(result.file.recall, None);
        assert_eq!(result.orders[0].state, Task2State::ValidNoMatch);
    }

    #[test]
    fn test_per_schema_rows_share_one_pass() {
        let relation: OrderRelation = vec![test_record("S", "a", "b"), test_record("T", "a", "b")]
            .into_iter()
            .collect();
        let gold = GoldGraph::from_edges([("p:a", "p:b")]);
        let result = score_task2_order("f", &relation, &gold, &ScorerConfig::default());

        assert_eq!(result.schemas.len(), 2);
        assert_eq!(result.schemas[0].matched, 1);
        assert_eq!(result.schemas[1].matched, 0);
        assert_eq!(result.file.matched, 1);
    }

    #[test]
    fn test_order_table_states() {
        let mut bad = test_record("S", "x", "y");
        bad.ta1ref = "bad".to_string();
        let relation: OrderRelation = vec![test_record("S", "a", "b"), bad].into_iter().collect();
        let gold = GoldGraph::from_edges([("p:a", "p:b")]);
        let table = score_task2_order("f", &relation, &gold, &ScorerConfig::default())
            .order_table()
            .unwrap();
        let [valid, assessment] = table.columns(["valid", "assessment"]).unwrap();
        let rows: Vec<_> = table
            .rows()
            .map(|r| (r[valid].clone(), r[assessment].clone()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("true".to_string(), "true".to_string()),
                ("false".to_string(), "NA".to_string())
            ]
        );
    }
}
