//! Order extraction, transitive closure and precedence scoring.
//!
//! # Flow
//!
//! ```text
//! schema JSON ─┐
//!              ├─▶ extract_orders ─▶ ClosureEngine ─▶ OrderRelation (closed)
//! event table ─┘                                          │
//!                                   ┌─────────────────────┴──────────────────────┐
//!                                   ▼                                            ▼
//!   annotations ─▶ ReferenceOrderRelation          Graph G ─▶ GoldGraph
//!   mapping     ─▶ score_task1_order               score_task2_order
//!                  (precision / recall / F)         (recall, one-to-one)
//! ```

pub mod closure;
pub mod extract;
pub mod record;
pub mod reference;
pub mod stats;
pub mod task1;
pub mod task2;

pub use closure::{ClosureEngine, ClosureStats};
pub use extract::{extract_graph_orders, extract_orders, parse_schema_document, EventTable};
pub use record::{OrderKey, OrderRecord, OrderRelation, Task};
pub use reference::{precedes, GoldGraph, ReferenceOrderRelation, TemporalAnnotation};
pub use stats::{StatsLevel, StatsScope, Task1Stats, Task2Stats};
pub use task1::{score_task1_order, EventMapping, Task1Assessment, Task1Result};
pub use task2::{is_valid_attribution, score_task2_order, Task2Result, Task2State};
