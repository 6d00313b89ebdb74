//! Record types shared by the cleaner, index calculator and forecaster.
//!
//! Every type here round-trips through CSV: the cleaner writes them, and the
//! `index`/`forecast` stages read them back from the output directory.

use crate::cleaning::impute::ImputationSource;
use crate::cleaning::normalize::join_key;
use serde::{Deserialize, Serialize};

/// Label used when a descriptive field (region, technology) is absent.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Sector label for tables that do not break values down by sector.
pub const ALL_SECTORS: &str = "All";

/// Decimal places kept for capacities (kt H2/y) in every written table.
pub const CAPACITY_DECIMALS: i32 = 4;

/// Development stage of a project, ordered from least to most mature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Unknown,
    Decommissioned,
    Announced,
    Fid,
    UnderConstruction,
    Operational,
}

impl ProjectStatus {
    /// Maps the free-text status labels found in project databases.
    ///
    /// | Label contains                               | Status              |
    /// |----------------------------------------------|---------------------|
    /// | decommission                                 | `Decommissioned`    |
    /// | operational, operating, online, demo         | `Operational`       |
    /// | fid (incl. "FID/Construction")               | `Fid`               |
    /// | construction                                 | `UnderConstruction` |
    /// | concept, feasibility, announced, planned     | `Announced`         |
    /// | anything else                                | `Unknown`           |
    pub fn from_label(raw: &str) -> Self {
        let label = join_key(raw);
        let has = |needle: &str| label.contains(needle);
        if has("decommission") {
            ProjectStatus::Decommissioned
        } else if has("operational") || has("operating") || has("online") || has("demo") {
            ProjectStatus::Operational
        } else if has("fid") || has("final investment") {
            ProjectStatus::Fid
        } else if has("construction") {
            ProjectStatus::UnderConstruction
        } else if has("concept") || has("feasibility") || has("announced") || has("planned") {
            ProjectStatus::Announced
        } else {
            ProjectStatus::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Unknown => "unknown",
            ProjectStatus::Decommissioned => "decommissioned",
            ProjectStatus::Announced => "announced",
            ProjectStatus::Fid => "fid",
            ProjectStatus::UnderConstruction => "under_construction",
            ProjectStatus::Operational => "operational",
        }
    }
}

/// A cleaned hydrogen production project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub country: String,
    pub region: String,
    pub technology: String,
    pub sector: Option<String>,
    /// kt H2 per year.
    pub announced_capacity: f64,
    pub capacity_imputation: ImputationSource,
    pub status: ProjectStatus,
    pub start_year: Option<i32>,
}

/// Hydrogen demand for one region, sector and year. (region, sector, year) is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub region: String,
    pub sector: String,
    pub year: i32,
    /// kt H2 per year.
    pub demand: f64,
    pub imputation: ImputationSource,
}

/// Production cost observation for a region (and sector where the source has one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub region: String,
    pub sector: String,
    /// EUR per kg H2. Never missing after cleaning.
    pub cost: f64,
    /// EUR per kg H2; midpoint of the sector's breakeven range when not given directly.
    pub breakeven_price: Option<f64>,
    pub imputation: ImputationSource,
}

/// Breakeven price range for a consuming sector, EUR per kg H2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakevenRecord {
    pub sector: String,
    pub min_price: f64,
    pub max_price: f64,
    pub midpoint: f64,
}

/// Per-project HMCI with its sub-scores, all on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub project_id: String,
    pub project_name: String,
    pub region: String,
    pub status: ProjectStatus,
    pub announced_capacity: f64,
    pub maturity_score: f64,
    pub demand_score: f64,
    pub cost_score: f64,
    pub regional_confidence: f64,
    pub hmci_score: f64,
    pub grade: String,
    /// The project's region had no demand data; the global average was used.
    pub demand_fallback: bool,
    /// The project's region had no cost data; the global mean cost was used.
    pub cost_fallback: bool,
}

/// Projected realized capacity of one project in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub project_id: String,
    pub year: i32,
    pub projected_capacity: f64,
    pub announced_capacity: f64,
    pub realization_probability: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_iea_labels() {
        assert_eq!(ProjectStatus::from_label("Operational"), ProjectStatus::Operational);
        assert_eq!(ProjectStatus::from_label("DEMO"), ProjectStatus::Operational);
        assert_eq!(ProjectStatus::from_label("FID/Construction"), ProjectStatus::Fid);
        assert_eq!(
            ProjectStatus::from_label("under construction"),
            ProjectStatus::UnderConstruction
        );
        assert_eq!(ProjectStatus::from_label("Feasibility study"), ProjectStatus::Announced);
        assert_eq!(ProjectStatus::from_label("Concept"), ProjectStatus::Announced);
        assert_eq!(
            ProjectStatus::from_label("Decommissioned"),
            ProjectStatus::Decommissioned
        );
        assert_eq!(ProjectStatus::from_label("Other/Unknown"), ProjectStatus::Unknown);
        assert_eq!(ProjectStatus::from_label(""), ProjectStatus::Unknown);
    }

    #[test]
    fn test_status_as_str_matches_serde() {
        for status in [
            ProjectStatus::Unknown,
            ProjectStatus::Decommissioned,
            ProjectStatus::Announced,
            ProjectStatus::Fid,
            ProjectStatus::UnderConstruction,
            ProjectStatus::Operational,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
