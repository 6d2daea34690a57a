//! File-level units of work and batch orchestration.
//!
//! Failures stay local to one unit: a missing input skips that unit, any
//! other error marks it failed, and the batch moves on either way.

use crate::config::ScorerConfig;
use crate::order::{
    extract_graph_orders, extract_orders, score_task1_order, score_task2_order, ClosureEngine,
    ClosureStats, EventMapping, EventTable, GoldGraph, OrderRelation, ReferenceOrderRelation,
    Task, Task1Result, Task2Result, TemporalAnnotation,
};
use crate::table::Table;
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// File id used in records and stats: the file name without extension.
pub fn file_id_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_json(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::missing_input(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Extract and close the order relation of one schema document.
///
/// A missing event table is [`Error::MissingInput`], so a batch skips the
/// document instead of scoring it without provenance.
pub fn extract_file(
    file_id: &str,
    task: Task,
    schema_path: &Path,
    events_path: &Path,
    config: &ScorerConfig,
) -> Result<(OrderRelation, ClosureStats)> {
    if !events_path.exists() {
        return Err(Error::missing_input(format!(
            "event table {} for {}",
            events_path.display(),
            file_id
        )));
    }
    let events = EventTable::read(events_path)?;
    let doc = read_json(schema_path)?;
    extract_orders(file_id, task, &doc, &events, &ClosureEngine::new(config))
}

/// Load the Graph G edge set from a Graph G document.
pub fn extract_graph_file(file_id: &str, graph_path: &Path) -> Result<GoldGraph> {
    let doc = read_json(graph_path)?;
    let relation = extract_graph_orders(file_id, &doc)?;
    Ok(GoldGraph::from_relation(&relation))
}

/// Build the Task 1 reference relation from an annotation file.
pub fn load_task1_reference(annotations_path: &Path) -> Result<ReferenceOrderRelation> {
    let annotations = TemporalAnnotation::read(annotations_path)?;
    let reference = ReferenceOrderRelation::from_annotations(&annotations);
    log::info!(
        "{}: {} annotated events, {} reference order pairs",
        annotations_path.display(),
        annotations.len(),
        reference.len()
    );
    Ok(reference)
}

/// Read a closed order table written by `extract`.
pub fn read_orders(orders_path: &Path) -> Result<OrderRelation> {
    OrderRelation::from_table(&Table::read(orders_path)?)
}

/// Score one file for Task 1.
pub fn score_task1_file(
    file_id: &str,
    orders_path: &Path,
    mapping_path: &Path,
    reference: &ReferenceOrderRelation,
    config: &ScorerConfig,
) -> Result<Task1Result> {
    let relation = read_orders(orders_path)?;
    let mapping = EventMapping::read(mapping_path)?;
    Ok(score_task1_order(
        file_id, &relation, &mapping, reference, config,
    ))
}

/// Score one file for Task 2.
pub fn score_task2_file(
    file_id: &str,
    orders_path: &Path,
    gold: &GoldGraph,
    config: &ScorerConfig,
) -> Result<Task2Result> {
    let relation = read_orders(orders_path)?;
    Ok(score_task2_order(file_id, &relation, gold, config))
}

/// Outcome of a batch.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Units that completed, with their output
    pub succeeded: Vec<(String, T)>,
    /// Units skipped for missing input, with the reason
    pub skipped: Vec<(String, String)>,
    /// Units that failed, with the error
    pub failed: Vec<(String, String)>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// Whether every unit succeeded.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Run independent units in order, isolating their failures.
pub fn run_batch<T, I, F>(units: I) -> BatchReport<T>
where
    I: IntoIterator<Item = (String, F)>,
    F: FnOnce() -> Result<T>,
{
    let mut report = BatchReport::default();
    for (name, unit) in units {
        match unit() {
            Ok(output) => report.succeeded.push((name, output)),
            Err(e) if e.is_skippable() => {
                log::warn!("skipping {}: {}", name, e);
                report.skipped.push((name, e.to_string()));
            }
            Err(e) => {
                log::error!("{} failed: {}", name, e);
                report.failed.push((name, e.to_string()));
            }
        }
    }
    log::info!(
        "batch finished: {} succeeded, {} skipped, {} failed",
        report.succeeded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    report
}
