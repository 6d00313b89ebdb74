//! Orchestration of the batch run: raw → cleaned → indexed/forecasted.
//!
//! Each stage reads its inputs, writes its outputs into the output directory
//! and returns what later stages need. The `index`, `forecast` and `report`
//! stages can also start from the cleaned tables of an earlier run.

use crate::cleaning::breakeven::clean_breakeven;
use crate::cleaning::costs::clean_costs;
use crate::cleaning::demand::clean_demand;
use crate::cleaning::projects::clean_projects;
use crate::cleaning::CleaningReport;
use crate::config::{DatasetSource, PipelineConfig};
use crate::forecast::{ForecastOutcome, forecast};
use crate::index::{IndexOutcome, compute_index};
use crate::output::{read_records, write_json, write_records, write_table};
use crate::parser::{RawTable, read_table};
use crate::records::{BreakevenRecord, ConfidenceScore, CostRecord, DemandRecord, ProjectRecord};
use crate::reports::{cost_vs_breakeven, demand_by_region, demand_by_sector};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output file names inside the output directory.
pub mod files {
    pub const PROJECTS: &str = "projects_cleaned.csv";
    pub const DEMAND: &str = "demand_cleaned.csv";
    pub const COSTS: &str = "costs_cleaned.csv";
    pub const BREAKEVEN: &str = "breakeven_cleaned.csv";
    pub const INDEX_SCORES: &str = "index_scores.csv";
    pub const INDEX_SUMMARY: &str = "index_summary.json";
    pub const FORECAST: &str = "forecast.csv";
    pub const FORECAST_SUMMARY: &str = "forecast_summary.csv";
    pub const DEMAND_BY_REGION: &str = "demand_by_region.csv";
    pub const DEMAND_BY_SECTOR: &str = "demand_by_sector.csv";
    pub const COST_VS_BREAKEVEN: &str = "cost_vs_breakeven.csv";
}

/// Input and output directories of a run.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl DataPaths {
    pub fn new(raw_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn raw(&self, source: &DatasetSource) -> PathBuf {
        self.raw_dir.join(&source.file)
    }

    pub fn out(&self, file: &str) -> PathBuf {
        self.out_dir.join(file)
    }
}

/// The four cleaned datasets.
#[derive(Debug, Default)]
pub struct CleanedTables {
    pub projects: Vec<ProjectRecord>,
    pub demand: Vec<DemandRecord>,
    pub costs: Vec<CostRecord>,
    pub breakeven: Vec<BreakevenRecord>,
}

/// Summary of a run, printed when it finishes. Never written into the output directory.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub raw_dir: String,
    pub out_dir: String,
    pub cleaning: Vec<CleaningReport>,
    pub projects_scored: usize,
    pub overall_hmci: Option<f64>,
    pub forecast_records: usize,
    pub forecast_excluded: BTreeMap<String, usize>,
    pub outputs: Vec<String>,
}

impl RunReport {
    pub fn start(paths: &DataPaths) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            raw_dir: paths.raw_dir.display().to_string(),
            out_dir: paths.out_dir.display().to_string(),
            cleaning: Vec::new(),
            projects_scored: 0,
            overall_hmci: None,
            forecast_records: 0,
            forecast_excluded: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    fn wrote(&mut self, file: &str) {
        self.outputs.push(file.to_string());
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

fn load_raw(paths: &DataPaths, source: &DatasetSource) -> Result<RawTable> {
    let path = paths.raw(source);
    let table = read_table(&path, source.skip_rows)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(table)
}

/// Reads, cleans and writes the four datasets.
#[tracing::instrument(skip_all, fields(raw_dir = %paths.raw_dir.display()))]
pub fn clean_all(
    config: &PipelineConfig,
    paths: &DataPaths,
    report: &mut RunReport,
) -> Result<CleanedTables> {
    let inputs = &config.inputs;

    let breakeven = clean_breakeven(&load_raw(paths, &inputs.breakeven)?)?;
    let projects = clean_projects(&load_raw(paths, &inputs.projects)?, config)?;
    let demand = clean_demand(&load_raw(paths, &inputs.demand)?, config)?;
    let costs = clean_costs(&load_raw(paths, &inputs.costs)?, &breakeven.records, config)?;

    for r in [&projects.report, &demand.report, &costs.report, &breakeven.report] {
        r.log();
        report.cleaning.push(r.clone());
    }

    write_records(&paths.out(files::PROJECTS), &projects.records)?;
    write_records(&paths.out(files::DEMAND), &demand.records)?;
    write_records(&paths.out(files::COSTS), &costs.records)?;
    write_records(&paths.out(files::BREAKEVEN), &breakeven.records)?;
    for file in [files::PROJECTS, files::DEMAND, files::COSTS, files::BREAKEVEN] {
        report.wrote(file);
    }

    Ok(CleanedTables {
        projects: projects.records,
        demand: demand.records,
        costs: costs.records,
        breakeven: breakeven.records,
    })
}

/// Reads the cleaned tables written by an earlier [`clean_all`].
pub fn load_cleaned(paths: &DataPaths) -> Result<CleanedTables> {
    if !has_cleaned_tables(&paths.out_dir) {
        bail!(
            "no cleaned tables in {}; run the `clean` stage first",
            paths.out_dir.display()
        );
    }
    Ok(CleanedTables {
        projects: read_records(&paths.out(files::PROJECTS))?,
        demand: read_records(&paths.out(files::DEMAND))?,
        costs: read_records(&paths.out(files::COSTS))?,
        breakeven: read_records(&paths.out(files::BREAKEVEN))?,
    })
}

/// Computes and writes the per-project scores and the index summary.
pub fn run_index(
    config: &PipelineConfig,
    paths: &DataPaths,
    tables: &CleanedTables,
    report: &mut RunReport,
) -> Result<IndexOutcome> {
    let outcome = compute_index(
        &tables.projects,
        &tables.demand,
        &tables.costs,
        &tables.breakeven,
        config,
    );

    write_records(&paths.out(files::INDEX_SCORES), &outcome.scores)?;
    write_json(&paths.out(files::INDEX_SUMMARY), &outcome.summary)?;
    report.wrote(files::INDEX_SCORES);
    report.wrote(files::INDEX_SUMMARY);
    report.projects_scored = outcome.scores.len();
    report.overall_hmci = Some(outcome.summary.overall.capacity_weighted_score);

    Ok(outcome)
}

/// Reads the scores written by an earlier [`run_index`].
pub fn load_scores(paths: &DataPaths) -> Result<Vec<ConfidenceScore>> {
    read_records(&paths.out(files::INDEX_SCORES))
}

/// Computes and writes the capacity forecast and its yearly summary.
pub fn run_forecast(
    config: &PipelineConfig,
    paths: &DataPaths,
    projects: &[ProjectRecord],
    scores: &[ConfidenceScore],
    report: &mut RunReport,
) -> Result<ForecastOutcome> {
    let outcome = forecast(projects, scores, &config.forecast);

    write_records(&paths.out(files::FORECAST), &outcome.records)?;
    write_records(&paths.out(files::FORECAST_SUMMARY), &outcome.summary)?;
    report.wrote(files::FORECAST);
    report.wrote(files::FORECAST_SUMMARY);
    report.forecast_records = outcome.records.len();
    report.forecast_excluded = outcome
        .excluded_counts()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    Ok(outcome)
}

/// Writes the regional demand share, sector demand and cost-versus-breakeven tables.
pub fn run_reports(
    config: &PipelineConfig,
    paths: &DataPaths,
    tables: &CleanedTables,
    report: &mut RunReport,
) -> Result<()> {
    let by_region = demand_by_region(&tables.demand);
    write_records(&paths.out(files::DEMAND_BY_REGION), &by_region)?;

    let window = &config.reports;
    let by_sector = demand_by_sector(
        &tables.demand,
        window.sector_first_year,
        window.sector_last_year,
    );
    write_table(
        &paths.out(files::DEMAND_BY_SECTOR),
        &by_sector.header(),
        &by_sector.records(),
    )?;

    let comparison = cost_vs_breakeven(&tables.costs, &tables.breakeven);
    write_records(&paths.out(files::COST_VS_BREAKEVEN), &comparison)?;

    report.wrote(files::DEMAND_BY_REGION);
    report.wrote(files::DEMAND_BY_SECTOR);
    report.wrote(files::COST_VS_BREAKEVEN);
    Ok(())
}

/// Runs every stage in order over the raw inputs.
#[tracing::instrument(
    skip_all,
    fields(raw_dir = %paths.raw_dir.display(), out_dir = %paths.out_dir.display())
)]
pub fn run_all(config: &PipelineConfig, paths: &DataPaths) -> Result<RunReport> {
    config.validate()?;
    let mut report = RunReport::start(paths);

    let tables = clean_all(config, paths, &mut report)?;
    let index = run_index(config, paths, &tables, &mut report)?;
    run_forecast(config, paths, &tables.projects, &index.scores, &mut report)?;
    run_reports(config, paths, &tables, &mut report)?;

    let report = report.finish();
    info!(
        outputs = report.outputs.len(),
        out_dir = %report.out_dir,
        "Pipeline run complete"
    );
    Ok(report)
}

/// `true` when `out_dir` holds all four cleaned tables from an earlier run.
pub fn has_cleaned_tables(out_dir: &Path) -> bool {
    [files::PROJECTS, files::DEMAND, files::COSTS, files::BREAKEVEN]
        .iter()
        .all(|f| out_dir.join(f).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ForecastRecord;
    use std::fs;
    use tempfile::TempDir;

    fn write_raw(dir: &Path) {
        fs::write(
            dir.join("projects.csv"),
            "id,name,country,technology,status,start_year,announced_capacity\n\
             p1,Alpha,Spain,PEM,operational,2021,10\n\
             p2,Beta,Chile,ALK,fid,2027,\n",
        )
        .unwrap();
        fs::write(
            dir.join("demand.csv"),
            "region,sector,year,demand\nSpain,All,2023,100\n",
        )
        .unwrap();
        fs::write(dir.join("production_costs.csv"), "region,cost\nSpain,5\n").unwrap();
        fs::write(dir.join("breakeven_prices.csv"), "sector,min,max\nRefining,4,6\n").unwrap();
    }

    #[test]
    fn test_run_all_writes_every_output() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw(raw.path());
        let paths = DataPaths::new(raw.path(), out.path());

        let report = run_all(&PipelineConfig::default(), &paths).unwrap();
        assert_eq!(report.outputs.len(), 11);
        for file in &report.outputs {
            assert!(out.path().join(file).exists(), "{} missing", file);
        }
        assert_eq!(report.projects_scored, 2);
        assert!(has_cleaned_tables(out.path()));
    }

    #[test]
    fn test_stages_resume_from_cleaned_tables() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw(raw.path());
        let paths = DataPaths::new(raw.path(), out.path());
        let config = PipelineConfig::default();
        let mut report = RunReport::start(&paths);

        let cleaned = clean_all(&config, &paths, &mut report).unwrap();
        let loaded = load_cleaned(&paths).unwrap();
        assert_eq!(loaded.projects, cleaned.projects);
        assert_eq!(loaded.costs, cleaned.costs);

        let index = run_index(&config, &paths, &loaded, &mut report).unwrap();
        let scores = load_scores(&paths).unwrap();
        assert_eq!(scores, index.scores);
    }

    #[test]
    fn test_forecast_stays_within_imputed_capacity() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_raw(raw.path());
        fs::write(
            raw.path().join("projects.csv"),
            "id,technology,status,country,start_year,capacity\n\
             a,PEM,Operational,Spain,2021,1\n\
             b,PEM,Operational,Spain,2021,1\n\
             c,PEM,Operational,Spain,2021,0\n\
             d,PEM,Operational,Spain,2021,\n",
        )
        .unwrap();
        let paths = DataPaths::new(raw.path(), out.path());

        run_all(&PipelineConfig::default(), &paths).unwrap();
        let forecast: Vec<ForecastRecord> = read_records(&paths.out(files::FORECAST)).unwrap();
        assert_eq!(forecast.len(), 44);
        assert!(
            forecast
                .iter()
                .all(|r| r.projected_capacity <= r.announced_capacity)
        );
        let d = forecast.iter().find(|r| r.project_id == "d").unwrap();
        assert_eq!(d.announced_capacity, 0.6667);
    }

    #[test]
    fn test_stage_without_cleaned_tables_fails_early() {
        let out = TempDir::new().unwrap();
        let paths = DataPaths::new("unused", out.path());
        let err = load_cleaned(&paths).unwrap_err();
        assert!(err.to_string().contains("run the `clean` stage first"));
    }

    #[test]
    fn test_missing_raw_file_is_fatal_and_named() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let paths = DataPaths::new(raw.path(), out.path());

        let err = run_all(&PipelineConfig::default(), &paths).unwrap_err();
        assert!(format!("{:#}", err).contains("breakeven_prices.csv"));
    }
}
