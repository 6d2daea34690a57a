//! End-to-end order scoring: extraction, closure, Task 1 and Task 2.

use schema_scorer::order::{
    extract_orders, score_task1_order, score_task2_order, ClosureEngine, EventMapping,
    EventTable, GoldGraph, ReferenceOrderRelation, Task, Task2State,
};
use schema_scorer::pipeline::{
    extract_file, file_id_of, load_task1_reference, run_batch, score_task1_file,
    score_task2_file,
};
use schema_scorer::{Error, OrderRelation, ScorerConfig};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn two_step_schema() -> serde_json::Value {
    json!({
        "schemas": [{
            "@id": "cmu:Schema/S",
            "super": "kairos:Primitives/Events",
            "order": [
                { "@id": "o1", "before": "A", "after": "B", "ta1ref": "cmu:o/1", "confidence": 0.8 },
                { "@id": "o2", "before": "B", "after": "C", "ta1ref": "cmu:o/2", "confidence": [0.6] }
            ]
        }]
    })
}

fn events() -> EventTable {
    let mut events = EventTable::new();
    events.insert("cmu:Schema/S", "A", "prov:a");
    events.insert("cmu:Schema/S", "B", "prov:b");
    events.insert("cmu:Schema/S", "C", "prov:c");
    events
}

#[test]
fn closure_of_two_step_chain() {
    let (relation, stats) = extract_orders(
        "cmu_ce1001",
        Task::Task1,
        &two_step_schema(),
        &events(),
        &ClosureEngine::default(),
    )
    .unwrap();

    assert_eq!(stats.asserted, 2);
    assert_eq!(stats.inferred, 1);
    assert_eq!(relation.len(), 3);

    let inferred: Vec<_> = relation.records().iter().filter(|r| r.inferred).collect();
    assert_eq!(inferred.len(), 1);
    assert_eq!((inferred[0].before.as_str(), inferred[0].after.as_str()), ("A", "C"));
    assert_eq!(inferred[0].confidence, Some(1.0));
    assert_eq!(inferred[0].before_provenance, "prov:a");
    assert_eq!(inferred[0].after_provenance, "prov:c");
    assert_eq!(inferred[0].schema_super, "kairos:Primitives/Events");
}

#[test]
fn task1_perfect_match() {
    let (relation, _) = extract_orders(
        "f",
        Task::Task1,
        &json!({ "@id": "S", "order": [{ "before": "e1", "after": "e2", "ta1ref": "cmu:o" }] }),
        &EventTable::new(),
        &ClosureEngine::default(),
    )
    .unwrap();
    let mut mapping = EventMapping::new();
    mapping.insert("S", "e1", "VP1").unwrap();
    mapping.insert("S", "e2", "VP2").unwrap();
    let reference = ReferenceOrderRelation::from_pairs([("VP1", "VP2")]);

    let result = score_task1_order("f", &relation, &mapping, &reference, &ScorerConfig::default());
    assert_eq!(result.orders[0].assessment.verdict(), Some(true));
    assert_eq!(result.file.precision, Some(1.0));
    assert_eq!(result.file.recall, Some(1.0));
    assert_eq!(result.file.f_measure, Some(1.0));
}

#[test]
fn task1_non_participant_is_not_assessed() {
    let (relation, _) = extract_orders(
        "f",
        Task::Task1,
        &json!({ "@id": "S", "order": [
            { "before": "e1", "after": "e2", "ta1ref": "cmu:o/1" },
            { "before": "e3", "after": "e2", "ta1ref": "cmu:o/2" }
        ] }),
        &EventTable::new(),
        &ClosureEngine::default(),
    )
    .unwrap();
    let mut mapping = EventMapping::new();
    mapping.insert("S", "e1", "RL1").unwrap();
    mapping.insert("S", "e2", "VP2").unwrap();
    mapping.insert("S", "e3", "VP3").unwrap();
    let reference = ReferenceOrderRelation::from_pairs([("VP3", "VP2"), ("VP1", "VP2")]);

    let result = score_task1_order("f", &relation, &mapping, &reference, &ScorerConfig::default());
    assert_eq!(result.file.total, 2);
    assert_eq!(result.file.assessed, 1);
    assert_eq!(result.orders[0].assessment.verdict(), None);
    assert_eq!(result.file.precision, Some(1.0));
    assert_eq!(result.file.recall, Some(0.5));
}

#[test]
fn task2_duplicate_cannot_reuse_gold_edge() {
    let doc = json!({ "@id": "S", "order": [
        { "before": "x1", "after": "x2", "ta1ref": "ibm:o/1" },
        { "before": "x2", "after": "x3", "ta1ref": "ibm:o/2" },
        { "before": "y1", "after": "y2", "ta1ref": "ibm:o/3" }
    ] });
    let mut events = EventTable::new();
    events.insert("S", "x1", "p1");
    events.insert("S", "x2", "p2");
    events.insert("S", "x3", "p3");
    events.insert("S", "y1", "p1");
    events.insert("S", "y2", "p2");
    // closure would add (x1, x3); keep the three asserted edges only
    let relation: OrderRelation = extract_orders("f", Task::Task2, &doc, &events, &ClosureEngine::default())
        .unwrap()
        .0
        .into_records()
        .into_iter()
        .filter(|r| !r.inferred)
        .collect();
    let gold = GoldGraph::from_edges([("p1", "p2"), ("p2", "p3")]);

    let result = score_task2_order("f", &relation, &gold, &ScorerConfig::default());
    let states: Vec<_> = result.orders.iter().map(|o| o.state).collect();
    assert_eq!(
        states,
        vec![
            Task2State::ValidMatched,
            Task2State::ValidMatched,
            Task2State::ValidNoMatch
        ]
    );
    assert_eq!(result.file.matched, 2);
    assert_eq!(result.file.recall, Some(1.0));
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn pipeline_from_files() {
    let dir = TempDir::new().unwrap();
    let schema = write(dir.path(), "cmu_ce1001.json", &two_step_schema().to_string());
    let events = write(
        dir.path(),
        "cmu_ce1001.events.tsv",
        "schema_id\tev_id\tev_provenance\n\
         cmu:Schema/S\tA\tprov:a\n\
         cmu:Schema/S\tB\tprov:b\n\
         cmu:Schema/S\tC\tprov:c\n",
    );
    let config = ScorerConfig::default();
    let file_id = file_id_of(&schema);
    assert_eq!(file_id, "cmu_ce1001");

    let (relation, _) = extract_file(&file_id, Task::Task1, &schema, &events, &config).unwrap();
    let orders = dir.path().join("cmu_ce1001.tsv");
    relation.to_table().unwrap().write(&orders).unwrap();

    let mapping = write(
        dir.path(),
        "mapping.tsv",
        "schema_id\tev_id\tev_reference_id\n\
         cmu:Schema/S\tA\tVP1\n\
         cmu:Schema/S\tB\tVP2\n\
         cmu:Schema/S\tC\tVP3\n",
    );
    let annotations = write(
        dir.path(),
        "annotations.tsv",
        "eventprimitive_id\torder1_type\torder1_value\torder2_type\torder2_value\n\
         VP1\texactly\t2020-01-01\t\t\n\
         VP2\texactly\t2020-01-05\t\t\n\
         VP3\texactly\t2020-02-01\t\t\n",
    );
    let reference = load_task1_reference(&annotations).unwrap();
    assert_eq!(reference.len(), 3);

    let task1 = score_task1_file(&file_id, &orders, &mapping, &reference, &config).unwrap();
    assert_eq!(task1.file.total, 3);
    assert_eq!(task1.file.assessed, 3);
    assert_eq!(task1.file.precision, Some(1.0));
    assert_eq!(task1.file.recall, Some(1.0));

    let gold = GoldGraph::from_edges([("prov:a", "prov:c")]);
    let task2 = score_task2_file(&file_id, &orders, &gold, &config).unwrap();
    assert_eq!(task2.file.all, 3);
    assert_eq!(task2.file.matched, 1);
    assert_eq!(task2.file.recall, Some(1.0));
}

#[test]
fn ambiguous_mapping_fails_only_its_file() {
    let dir = TempDir::new().unwrap();
    let orders = dir.path().join("orders.tsv");
    let (relation, _) = extract_orders(
        "f",
        Task::Task1,
        &json!({ "@id": "S", "order": [{ "before": "e1", "after": "e2", "ta1ref": "cmu:o" }] }),
        &EventTable::new(),
        &ClosureEngine::default(),
    )
    .unwrap();
    relation.to_table().unwrap().write(&orders).unwrap();

    let good = write(
        dir.path(),
        "good.tsv",
        "schema_id\tev_id\tev_reference_id\nS\te1\tVP1\nS\te2\tVP2\n",
    );
    let bad = write(
        dir.path(),
        "bad.tsv",
        "schema_id\tev_id\tev_reference_id\nS\te1\tVP1\nS\te1\tVP9\n",
    );
    let missing = dir.path().join("missing.tsv");
    let reference = ReferenceOrderRelation::from_pairs([("VP1", "VP2")]);
    let config = ScorerConfig::default();

    let units = [("bad", bad), ("missing", missing), ("good", good)].map(|(name, mapping)| {
        let (orders, reference, config) = (&orders, &reference, &config);
        (name.to_string(), move || {
            score_task1_file(name, orders, &mapping, reference, config)
        })
    });
    let report = run_batch(units);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bad");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "missing");
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.succeeded[0].1.file.recall, Some(1.0));
}

#[test]
fn ambiguous_mapping_error_names_both_references() {
    let mut mapping = EventMapping::new();
    mapping.insert("S", "e1", "VP1").unwrap();
    mapping.insert("S", "e1", "VP1").unwrap();
    match mapping.insert("S", "e1", "VP2") {
        Err(Error::AmbiguousMapping { first, second, .. }) => {
            assert_eq!(first, "VP1");
            assert_eq!(second, "VP2");
        }
        other => panic!("expected ambiguous mapping, got {:?}", other),
    }
}
