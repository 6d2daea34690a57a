//! Order scoring statistics at schema, file and team level.
//!
//! Ratios are `Option<f64>`: `None` means undefined (zero denominator) and
//! is rendered as `NA`, never as `0`.

use crate::table::Table;
use crate::Result;
use serde::{Deserialize, Serialize};

/// `num / den`, or `None` when `den` is zero.
pub fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Harmonic mean of precision and recall, when both are defined and their
/// sum is positive.
pub fn f_measure(precision: Option<f64>, recall: Option<f64>) -> Option<f64> {
    match (precision, recall) {
        (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
        _ => None,
    }
}

/// Render an optional metric for a table cell.
pub fn format_metric(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "NA".to_string())
}

/// Aggregation level of a stats row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsLevel {
    /// One schema within a file
    Schema,
    /// One submission file
    File,
    /// All files of one team
    Team,
}

impl StatsLevel {
    fn as_str(&self) -> &'static str {
        match self {
            StatsLevel::Schema => "schema",
            StatsLevel::File => "file",
            StatsLevel::Team => "team",
        }
    }
}

/// What a stats row describes. Fields that do not apply are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsScope {
    /// Aggregation level
    pub level: StatsLevel,
    /// Team name
    pub team: String,
    /// File id
    pub file_id: String,
    /// Schema id
    pub schema_id: String,
}

impl StatsScope {
    /// Scope of a whole file.
    pub fn file(file_id: impl Into<String>) -> Self {
        Self {
            level: StatsLevel::File,
            team: String::new(),
            file_id: file_id.into(),
            schema_id: String::new(),
        }
    }

    /// Scope of one schema within a file.
    pub fn schema(file_id: impl Into<String>, schema_id: impl Into<String>) -> Self {
        Self {
            level: StatsLevel::Schema,
            schema_id: schema_id.into(),
            ..Self::file(file_id)
        }
    }

    /// Scope of a team aggregate.
    pub fn team(team: impl Into<String>) -> Self {
        Self {
            level: StatsLevel::Team,
            team: team.into(),
            file_id: String::new(),
            schema_id: String::new(),
        }
    }

    /// Attach a team name.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    fn cells(&self) -> [String; 4] {
        [
            self.level.as_str().to_string(),
            self.team.clone(),
            self.file_id.clone(),
            self.schema_id.clone(),
        ]
    }
}

const SCOPE_COLUMNS: [&str; 4] = ["level", "team", "file_id", "schema_id"];

/// Task 1 order counts and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task1Stats {
    /// Row scope
    pub scope: StatsScope,
    /// All order pairs, asserted and inferred
    pub total: usize,
    /// Pairs whose endpoints both resolved to participant reference ids
    pub assessed: usize,
    /// Assessed pairs present in the reference relation
    pub true_count: usize,
    /// True pairs, deduplicated by resolved endpoints
    pub distinct_true: usize,
    /// Reference pairs for the complex event
    pub reference_count: usize,
    /// `true_count / assessed`
    pub precision: Option<f64>,
    /// `distinct_true / reference_count`
    pub recall: Option<f64>,
    /// Harmonic mean of precision and recall
    pub f_measure: Option<f64>,
}

impl Task1Stats {
    /// Column names of [`Task1Stats::to_table`].
    pub const COLUMNS: [&'static str; 12] = [
        SCOPE_COLUMNS[0],
        SCOPE_COLUMNS[1],
        SCOPE_COLUMNS[2],
        SCOPE_COLUMNS[3],
        "order_total",
        "order_assessed",
        "order_true",
        "order_distinct_true",
        "order_reference",
        "order_precision",
        "order_recall",
        "order_f_measure",
    ];

    /// Build from counts, computing the ratios.
    pub fn from_counts(
        scope: StatsScope,
        total: usize,
        assessed: usize,
        true_count: usize,
        distinct_true: usize,
        reference_count: usize,
    ) -> Self {
        let precision = ratio(true_count, assessed);
        let recall = ratio(distinct_true, reference_count);
        Self {
            scope,
            total,
            assessed,
            true_count,
            distinct_true,
            reference_count,
            precision,
            recall,
            f_measure: f_measure(precision, recall),
        }
    }

    /// Micro-average file rows into one team row.
    pub fn aggregate_team(team: &str, files: &[Task1Stats]) -> Self {
        let sum = |f: fn(&Task1Stats) -> usize| files.iter().map(f).sum::<usize>();
        Self::from_counts(
            StatsScope::team(team),
            sum(|s| s.total),
            sum(|s| s.assessed),
            sum(|s| s.true_count),
            sum(|s| s.distinct_true),
            sum(|s| s.reference_count),
        )
    }

    /// Warn about counts that cannot all be right.
    pub fn check_consistency(&self) -> bool {
        let ok = self.assessed <= self.total
            && self.true_count <= self.assessed
            && self.distinct_true <= self.true_count
            && self.distinct_true <= self.reference_count;
        if !ok {
            log::warn!("inconsistent task1 order counts: {:?}", self);
        }
        ok
    }

    /// Cells matching [`Task1Stats::COLUMNS`].
    pub fn cells(&self) -> Vec<String> {
        let mut cells: Vec<String> = self.scope.cells().into();
        cells.extend([
            self.total.to_string(),
            self.assessed.to_string(),
            self.true_count.to_string(),
            self.distinct_true.to_string(),
            self.reference_count.to_string(),
            format_metric(self.precision),
            format_metric(self.recall),
            format_metric(self.f_measure),
        ]);
        cells
    }

    /// Render rows as a stats table.
    pub fn to_table(rows: &[Task1Stats]) -> Result<Table> {
        let mut table = Table::new(Self::COLUMNS);
        for row in rows {
            table.push_row(row.cells())?;
        }
        Ok(table)
    }
}

/// Task 2 order counts and recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task2Stats {
    /// Row scope
    pub scope: StatsScope,
    /// All order pairs, asserted and inferred
    pub all: usize,
    /// Pairs with a valid attribution reference
    pub valid: usize,
    /// Pairs excluded for an invalid attribution reference
    pub invalid: usize,
    /// Valid pairs that consumed a gold edge
    pub matched: usize,
    /// Gold edges for the complex event
    pub gold_count: usize,
    /// `matched / gold_count`
    pub recall: Option<f64>,
}

impl Task2Stats {
    /// Column names of [`Task2Stats::to_table`].
    pub const COLUMNS: [&'static str; 10] = [
        SCOPE_COLUMNS[0],
        SCOPE_COLUMNS[1],
        SCOPE_COLUMNS[2],
        SCOPE_COLUMNS[3],
        "order_all",
        "order_valid",
        "order_invalid",
        "order_matched",
        "order_gold",
        "order_recall",
    ];

    /// Build from counts, computing recall.
    pub fn from_counts(
        scope: StatsScope,
        all: usize,
        valid: usize,
        invalid: usize,
        matched: usize,
        gold_count: usize,
    ) -> Self {
        Self {
            scope,
            all,
            valid,
            invalid,
            matched,
            gold_count,
            recall: ratio(matched, gold_count),
        }
    }

    /// Micro-average file rows into one team row.
    pub fn aggregate_team(team: &str, files: &[Task2Stats]) -> Self {
        let sum = |f: fn(&Task2Stats) -> usize| files.iter().map(f).sum::<usize>();
        Self::from_counts(
            StatsScope::team(team),
            sum(|s| s.all),
            sum(|s| s.valid),
            sum(|s| s.invalid),
            sum(|s| s.matched),
            sum(|s| s.gold_count),
        )
    }

    /// Warn about counts that cannot all be right.
    pub fn check_consistency(&self) -> bool {
        let ok = self.valid + self.invalid == self.all
            && self.matched <= self.valid
            && self.matched <= self.gold_count;
        if !ok {
            log::warn!("inconsistent task2 order counts: {:?}", self);
        }
        ok
    }

    /// Cells matching [`Task2Stats::COLUMNS`].
    pub fn cells(&self) -> Vec<String> {
        let mut cells: Vec<String> = self.scope.cells().into();
        cells.extend([
            self.all.to_string(),
            self.valid.to_string(),
            self.invalid.to_string(),
            self.matched.to_string(),
            self.gold_count.to_string(),
            format_metric(self.recall),
        ]);
        cells
    }

    /// Render rows as a stats table.
    pub fn to_table(rows: &[Task2Stats]) -> Result<Table> {
        let mut table = Table::new(Self::COLUMNS);
        for row in rows {
            table.push_row(row.cells())?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_ratios() {
        assert_eq!(ratio(0, 0), None);
        assert_eq!(ratio(1, 4), Some(0.25));
        assert_eq!(f_measure(Some(0.0), Some(0.0)), None);
        assert_eq!(f_measure(None, Some(1.0)), None);
        assert_eq!(format_metric(None), "NA");
        assert_eq!(format_metric(Some(0.5)), "0.5000");
    }

    #[test]
    fn test_f_measure_harmonic_mean() {
        let f = f_measure(Some(0.5), Some(1.0)).unwrap();
        assert!((f - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_task1_team_micro_average() {
        let a = Task1Stats::from_counts(StatsScope::file("a"), 4, 2, 2, 2, 4);
        let b = Task1Stats::from_counts(StatsScope::file("b"), 3, 2, 0, 0, 4);
        let team = Task1Stats::aggregate_team("t", &[a, b]);
        assert_eq!(team.scope.level, StatsLevel::Team);
        assert_eq!(team.assessed, 4);
        assert_eq!(team.precision, Some(0.5));
        assert_eq!(team.recall, Some(0.25));
        assert!(team.check_consistency());
    }

    #[test]
    fn test_task2_consistency_warning() {
        let bad = Task2Stats::from_counts(StatsScope::file("f"), 3, 1, 1, 1, 2);
        assert!(!bad.check_consistency());
        let good = Task2Stats::from_counts(StatsScope::file("f"), 3, 2, 1, 2, 2);
        assert!(good.check_consistency());
        assert_eq!(good.recall, Some(1.0));
    }

    #[test]
    fn test_stats_table_shape() {
        let row = Task1Stats::from_counts(StatsScope::schema("f", "S"), 0, 0, 0, 0, 0);
        let table = Task1Stats::to_table(&[row]).unwrap();
        assert_eq!(table.header().len(), Task1Stats::COLUMNS.len());
        let cells: Vec<_> = table.rows().next().unwrap().to_vec();
        assert_eq!(cells[0], "schema");
        assert_eq!(cells[9], "NA");
    }
}
