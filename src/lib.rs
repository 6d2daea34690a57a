//! # schema-scorer
//!
//! Temporal-order scoring for submitted event schemas.
//!
//! - **Extraction**: order assertions from schema JSON, one edge per
//!   `before x after` pair, provenance joined from the event table
//! - **Closure**: per-schema transitive closure, inferred edges tagged
//! - **Task 1**: precision / recall / F against annotation-derived reference pairs
//! - **Task 2**: recall against the Graph G edge set, one gold edge per match
//!
//! ## Quick Start
//!
//! ```rust
//! use schema_scorer::order::{extract_orders, ClosureEngine, EventTable, Task};
//! use serde_json::json;
//!
//! let doc = json!({
//!     "schemas": [{
//!         "@id": "cmu:Schema/1",
//!         "order": [
//!             { "@id": "o1", "before": "e1", "after": "e2", "ta1ref": "cmu:o/1" },
//!             { "@id": "o2", "before": "e2", "after": "e3", "ta1ref": "cmu:o/2" }
//!         ]
//!     }]
//! });
//!
//! let (orders, stats) = extract_orders(
//!     "cmu_ce1001",
//!     Task::Task1,
//!     &doc,
//!     &EventTable::new(),
//!     &ClosureEngine::default(),
//! )
//! .unwrap();
//! assert_eq!(stats.inferred, 1);
//! assert!(orders.contains("cmu:Schema/1", "e1", "e3"));
//! ```
//!
//! ## Undefined Metrics
//!
//! Ratios with a zero denominator are `None` and render as `NA`. They are
//! never reported as `0`.

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod order;
pub mod pipeline;
pub mod table;

pub use config::ScorerConfig;
pub use error::{Error, Result};
pub use order::{OrderRecord, OrderRelation, Task};
