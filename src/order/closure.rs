//! Transitive closure of order relations.
//!
//! # Algorithm
//!
//! Semi-naive fixed point, run independently for every schema:
//!
//! ```text
//! known    = E0                      (indexed by before-id)
//! frontier = E0
//! loop:
//!     new = { (a, c) | (a, b) in frontier, (b, c) in known, (a, c) not in known }
//!     if new is empty: stop
//!     known    = known + new
//!     frontier = new
//! ```
//!
//! Each non-final round adds at least one previously unknown `(before, after)`
//! pair, and a schema over `N` event ids has at most `N * N` such pairs, so
//! the loop terminates on any input, cycles and self-loops included.
//!
//! Inferred edges carry the configured marker as order id and `ta1ref`,
//! confidence `1.0`, and take their before-provenance from the left edge and
//! their after-provenance from the right edge of the join.

use super::record::{OrderRecord, OrderRelation};
use crate::config::ScorerConfig;
use std::collections::{HashMap, HashSet};

/// Summary of one closure run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosureStats {
    /// Edges in the input
    pub asserted: usize,
    /// Edges added by the closure
    pub inferred: usize,
    /// Join rounds executed, summed over schemas (the final empty round included)
    pub rounds: usize,
}

/// Computes transitive closures, tagging the edges it adds.
#[derive(Debug, Clone)]
pub struct ClosureEngine {
    marker: String,
    comment: String,
}

impl ClosureEngine {
    /// Build an engine using the configured inferred-edge marker and comment.
    pub fn new(config: &ScorerConfig) -> Self {
        Self {
            marker: config.inferred_marker.clone(),
            comment: config.inferred_comment.clone(),
        }
    }

    /// Marker placed on inferred edges.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Close every schema of `relation`. Edges never cross schema boundaries.
    ///
    /// The returned relation holds the input records in their original order
    /// followed by the inferred records, grouped by schema.
    pub fn close(&self, relation: OrderRelation) -> (OrderRelation, ClosureStats) {
        let mut stats = ClosureStats {
            asserted: relation.len(),
            ..Default::default()
        };

        let mut inferred = Vec::new();
        for (schema_id, records) in relation.by_schema() {
            let (added, rounds) = self.close_schema(&records);
            log::debug!(
                "closure for schema {}: {} asserted, {} inferred, {} rounds",
                schema_id,
                records.len(),
                added.len(),
                rounds
            );
            stats.rounds += rounds;
            inferred.extend(added);
        }
        stats.inferred = inferred.len();

        let mut closed = relation;
        for record in inferred {
            closed.insert(record);
        }
        (closed, stats)
    }

    /// Inferred edges for one schema's records, plus the number of rounds.
    fn close_schema(&self, base: &[&OrderRecord]) -> (Vec<OrderRecord>, usize) {
        let mut inferred: Vec<OrderRecord> = Vec::new();
        let mut known: HashSet<(String, String)> = HashSet::new();
        // before-id -> edge indices; index i < base.len() is a base edge,
        // anything above is inferred[i - base.len()]
        let mut successors: HashMap<String, Vec<usize>> = HashMap::new();
        let mut frontier: Vec<usize> = Vec::with_capacity(base.len());
        for (i, record) in base.iter().enumerate() {
            if known.insert((record.before.clone(), record.after.clone())) {
                successors.entry(record.before.clone()).or_default().push(i);
                frontier.push(i);
            }
        }

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut discovered: Vec<OrderRecord> = Vec::new();
            for &f in &frontier {
                let left = edge_at(base, &inferred, f);
                let Some(next) = successors.get(&left.after) else {
                    continue;
                };
                for &r in next {
                    let right = edge_at(base, &inferred, r);
                    let pair = (left.before.clone(), right.after.clone());
                    if known.insert(pair) {
                        discovered.push(self.inferred_edge(left, right));
                    }
                }
            }

            log::debug!(
                "closure round {}: {} frontier edges, {} new",
                rounds,
                frontier.len(),
                discovered.len()
            );
            if discovered.is_empty() {
                break;
            }

            frontier.clear();
            for record in discovered {
                let idx = base.len() + inferred.len();
                successors
                    .entry(record.before.clone())
                    .or_default()
                    .push(idx);
                frontier.push(idx);
                inferred.push(record);
            }
        }

        (inferred, rounds)
    }

    fn inferred_edge(&self, left: &OrderRecord, right: &OrderRecord) -> OrderRecord {
        OrderRecord {
            file_id: left.file_id.clone(),
            task: left.task,
            schema_id: left.schema_id.clone(),
            schema_super: left.schema_super.clone(),
            order_id: self.marker.clone(),
            before: left.before.clone(),
            before_provenance: left.before_provenance.clone(),
            after: right.after.clone(),
            after_provenance: right.after_provenance.clone(),
            ta1ref: self.marker.clone(),
            confidence: Some(1.0),
            comment: self.comment.clone(),
            flags: Vec::new(),
            inferred: true,
        }
    }
}

fn edge_at<'a>(
    base: &[&'a OrderRecord],
    inferred: &'a [OrderRecord],
    i: usize,
) -> &'a OrderRecord {
    match base.get(i) {
        Some(record) => *record,
        None => &inferred[i - base.len()],
    }
}

impl Default for ClosureEngine {
    fn default() -> Self {
        Self::new(&ScorerConfig::default())
    }
}
