//! Dataset loading and cleaning.
//!
//! Each dataset cleaner turns a [`RawTable`](crate::parser::RawTable) into
//! typed records: canonical columns are resolved from alias lists, units are
//! standardized, unrecoverable rows are dropped (and counted per reason) and
//! missing numeric values are imputed with the configured method.

pub mod breakeven;
pub mod costs;
pub mod demand;
pub mod impute;
pub mod normalize;
pub mod projects;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Row accounting for one cleaned dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub dataset: String,
    pub source: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub imputed: usize,
    /// Dropped row counts keyed by reason.
    pub dropped: BTreeMap<String, usize>,
}

impl CleaningReport {
    pub fn new(dataset: &str, source: &std::path::Path, rows_read: usize) -> Self {
        Self {
            dataset: dataset.to_string(),
            source: source.display().to_string(),
            rows_read,
            ..Default::default()
        }
    }

    pub fn drop_row(&mut self, reason: &str) {
        *self.dropped.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    /// Emits the report as structured log events.
    pub fn log(&self) {
        info!(
            dataset = %self.dataset,
            source = %self.source,
            rows_read = self.rows_read,
            rows_kept = self.rows_kept,
            imputed = self.imputed,
            dropped = self.dropped_total(),
            "Dataset cleaned"
        );
        for (reason, count) in &self.dropped {
            warn!(dataset = %self.dataset, reason = %reason, count, "Rows dropped");
        }
    }
}

/// Cleaned records together with their report.
#[derive(Debug)]
pub struct Cleaned<T> {
    pub records: Vec<T>,
    pub report: CleaningReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_report_counts_drops_per_reason() {
        let mut report = CleaningReport::new("projects", Path::new("raw/projects.csv"), 10);
        report.drop_row("missing_id");
        report.drop_row("missing_id");
        report.drop_row("confidential");

        assert_eq!(report.dropped.get("missing_id"), Some(&2));
        assert_eq!(report.dropped_total(), 3);
        assert_eq!(report.source, "raw/projects.csv");
        report.log();
    }
}
