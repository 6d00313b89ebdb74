//! Pipeline configuration.
//!
//! Stored as a JSON object on disk. Every field is optional and falls back to
//! the defaults below, so an empty `{}` is a valid configuration:
//! ```json
//! {
//!   "imputation": "group_mean",
//!   "weights": { "maturity": 0.5, "demand_alignment": 0.25, "cost_competitiveness": 0.25 },
//!   "inputs": { "projects": { "file": "projects.csv", "skip_rows": 2 } },
//!   "region_aliases": { "Deutschland": "Germany" },
//!   "start_year_overrides": [ { "name_contains": "NortH2", "start_year": 2020 } ]
//! }
//! ```

use crate::cleaning::impute::ImputationMethod;
use crate::error::{PipelineError, Result};
use crate::records::ProjectStatus;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub inputs: InputFiles,
    pub imputation: ImputationMethod,
    pub weights: ScoreWeights,
    pub maturity: MaturityPoints,
    /// Sub-score used when a whole table is empty and no average exists.
    pub neutral_score: f64,
    /// Year whose demand drives the alignment sub-score. Latest year in the data when unset.
    pub demand_reference_year: Option<i32>,
    pub forecast: ForecastConfig,
    pub reports: ReportConfig,
    /// Maps a raw region or country label (case-insensitive) onto the label used for joins.
    pub region_aliases: BTreeMap<String, String>,
    pub start_year_overrides: Vec<StartYearOverride>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: InputFiles::default(),
            imputation: ImputationMethod::default(),
            weights: ScoreWeights::default(),
            maturity: MaturityPoints::default(),
            neutral_score: 50.0,
            demand_reference_year: None,
            forecast: ForecastConfig::default(),
            reports: ReportConfig::default(),
            region_aliases: BTreeMap::new(),
            start_year_overrides: Vec::new(),
        }
    }
}

/// Raw input file names, relative to the raw data directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputFiles {
    pub projects: DatasetSource,
    pub demand: DatasetSource,
    pub costs: DatasetSource,
    pub breakeven: DatasetSource,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            projects: DatasetSource::named("projects.csv"),
            demand: DatasetSource::named("demand.csv"),
            costs: DatasetSource::named("production_costs.csv"),
            breakeven: DatasetSource::named("breakeven_prices.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetSource {
    pub file: String,
    /// Preamble rows above the header line (titles, notes, blank lines).
    #[serde(default)]
    pub skip_rows: usize,
}

impl DatasetSource {
    fn named(file: &str) -> Self {
        Self {
            file: file.to_string(),
            skip_rows: 0,
        }
    }
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self::named("")
    }
}

/// Weights of the three HMCI sub-scores. Must sum to 1.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub maturity: f64,
    pub demand_alignment: f64,
    pub cost_competitiveness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            maturity: 0.5,
            demand_alignment: 0.25,
            cost_competitiveness: 0.25,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.maturity + self.demand_alignment + self.cost_competitiveness
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.maturity, self.demand_alignment, self.cost_competitiveness];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PipelineError::InvalidConfig(
                "sub-score weights must be finite and non-negative".into(),
            ));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PipelineError::InvalidWeights(sum));
        }
        Ok(())
    }
}

/// Maturity sub-score awarded for each project status, on the 0-100 scale.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct MaturityPoints {
    pub announced: f64,
    pub fid: f64,
    pub under_construction: f64,
    pub operational: f64,
    pub decommissioned: f64,
    pub unknown: f64,
}

impl Default for MaturityPoints {
    fn default() -> Self {
        Self {
            announced: 25.0,
            fid: 60.0,
            under_construction: 80.0,
            operational: 100.0,
            decommissioned: 0.0,
            unknown: 10.0,
        }
    }
}

impl MaturityPoints {
    pub fn points(&self, status: ProjectStatus) -> f64 {
        match status {
            ProjectStatus::Announced => self.announced,
            ProjectStatus::Fid => self.fid,
            ProjectStatus::UnderConstruction => self.under_construction,
            ProjectStatus::Operational => self.operational,
            ProjectStatus::Decommissioned => self.decommissioned,
            ProjectStatus::Unknown => self.unknown,
        }
    }

    fn all(&self) -> [f64; 6] {
        [
            self.announced,
            self.fid,
            self.under_construction,
            self.operational,
            self.decommissioned,
            self.unknown,
        ]
    }

    /// Highest value any status can reach.
    pub fn max(&self) -> f64 {
        self.all().into_iter().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub first_year: i32,
    pub horizon_year: i32,
    /// Years of linear ramp-up before a project's start year.
    pub ramp_years: u32,
    pub min_plausible_year: i32,
    pub max_plausible_year: i32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            first_year: 2020,
            horizon_year: 2030,
            ramp_years: 3,
            min_plausible_year: 1950,
            max_plausible_year: 2060,
        }
    }
}

/// Year window of the sector demand report.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub sector_first_year: i32,
    pub sector_last_year: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sector_first_year: 2020,
            sector_last_year: 2025,
        }
    }
}

/// Replaces the start year of every project whose name contains `name_contains`
/// (case-insensitive). Used for known gaps in the source database.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartYearOverride {
    pub name_contains: String,
    pub start_year: i32,
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path` and validates it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if self
            .maturity
            .all()
            .iter()
            .any(|p| !(0.0..=100.0).contains(p))
        {
            return Err(PipelineError::InvalidConfig(
                "maturity points must lie within 0..=100".into(),
            ));
        }
        if self.maturity.operational < self.maturity.max() {
            return Err(PipelineError::InvalidConfig(format!(
                "operational maturity {} is below the highest status points {}",
                self.maturity.operational,
                self.maturity.max()
            )));
        }
        if !(0.0..=100.0).contains(&self.neutral_score) {
            return Err(PipelineError::InvalidConfig(format!(
                "neutral_score {} is outside 0..=100",
                self.neutral_score
            )));
        }
        let f = &self.forecast;
        if f.horizon_year < f.first_year {
            return Err(PipelineError::InvalidConfig(format!(
                "forecast horizon {} precedes first year {}",
                f.horizon_year, f.first_year
            )));
        }
        if f.max_plausible_year < f.min_plausible_year {
            return Err(PipelineError::InvalidConfig(format!(
                "plausible start years {}..={} are empty",
                f.min_plausible_year, f.max_plausible_year
            )));
        }
        let r = &self.reports;
        if r.sector_last_year < r.sector_first_year {
            return Err(PipelineError::InvalidConfig(format!(
                "sector report years {}..={} are empty",
                r.sector_first_year, r.sector_last_year
            )));
        }
        Ok(())
    }

    /// Applies [`PipelineConfig::region_aliases`] to a region label.
    pub fn canonical_region(&self, region: &str) -> String {
        let key = crate::cleaning::normalize::join_key(region);
        self.region_aliases
            .iter()
            .find(|(alias, _)| crate::cleaning::normalize::join_key(alias) == key)
            .map(|(_, canonical)| canonical.clone())
            .unwrap_or_else(|| region.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert!((config.weights.sum() - 1.0).abs() < 1e-12);
        assert_eq!(config.inputs.projects.file, "projects.csv");
        assert_eq!(config.forecast.horizon_year, 2030);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.neutral_score, 50.0);
        assert_eq!(config.maturity.operational, 100.0);
        assert_eq!(config.imputation, ImputationMethod::GroupMean);
    }

    #[test]
    fn test_partial_json_overrides_fields() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "imputation": "forward_backward_fill",
                "inputs": { "projects": { "file": "iea.csv", "skip_rows": 2 } },
                "start_year_overrides": [ { "name_contains": "NortH2", "start_year": 2020 } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.imputation, ImputationMethod::ForwardBackwardFill);
        assert_eq!(config.inputs.projects.file, "iea.csv");
        assert_eq!(config.inputs.projects.skip_rows, 2);
        assert_eq!(config.inputs.demand.file, "demand.csv");
        assert_eq!(config.start_year_overrides[0].start_year, 2020);
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let mut config = PipelineConfig::default();
        config.weights.maturity = 0.9;
        match config.validate() {
            Err(PipelineError::InvalidWeights(sum)) => assert!((sum - 1.4).abs() < 1e-9),
            other => panic!("expected InvalidWeights, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = PipelineConfig::default();
        config.weights = ScoreWeights {
            maturity: 1.25,
            demand_alignment: -0.25,
            cost_competitiveness: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_horizon_before_first_year_rejected() {
        let mut config = PipelineConfig::default();
        config.forecast.horizon_year = 2010;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_operational_is_max_maturity() {
        let points = MaturityPoints::default();
        assert_eq!(points.points(ProjectStatus::Operational), points.max());
    }

    #[test]
    fn test_status_outranking_operational_rejected() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "maturity": { "operational": 50.0 } }"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        let mut tied = PipelineConfig::default();
        tied.maturity.under_construction = 100.0;
        tied.validate().unwrap();
    }

    #[test]
    fn test_empty_sector_report_window_rejected() {
        let mut config = PipelineConfig::default();
        config.reports.sector_last_year = 2019;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_canonical_region_is_case_insensitive() {
        let mut config = PipelineConfig::default();
        config
            .region_aliases
            .insert("Deutschland".into(), "Germany".into());
        assert_eq!(config.canonical_region(" deutschland "), "Germany");
        assert_eq!(config.canonical_region("France"), "France");
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hmci.json");
        std::fs::write(&path, r#"{ "neutral_score": 40.0 }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.neutral_score, 40.0);
    }
}
