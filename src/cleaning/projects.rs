//! Project database cleaning (IEA Hydrogen Production Projects layout).

use crate::cleaning::impute::{GroupKeys, ImputationSource, impute};
use crate::cleaning::normalize::{clean_label, join_key, parse_number, parse_year};
use crate::cleaning::{Cleaned, CleaningReport};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::parser::RawTable;
use crate::records::{CAPACITY_DECIMALS, ProjectRecord, ProjectStatus, UNKNOWN_LABEL};
use crate::stats::round_to;
use std::collections::BTreeSet;
use tracing::debug;

const ID: &[&str] = &["id", "project_id", "ref", "project_ref"];
const NAME: &[&str] = &["project_name", "name"];
const COUNTRY: &[&str] = &["country"];
const REGION: &[&str] = &["region"];
const TECHNOLOGY: &[&str] = &["technology", "technology_type", "technology_details"];
const SECTOR: &[&str] = &["sector", "end_use"];
const CAPACITY: &[&str] = &[
    "announced_capacity",
    "capacity_kt_h2_y",
    "capacity_kt_h2_yr",
    "capacity_kt",
    "capacity",
];
const STATUS: &[&str] = &["status"];
const START_YEAR: &[&str] = &["expected_start_year", "start_year", "date_online"];

/// A kept row before capacity imputation.
struct Pending {
    record: ProjectRecord,
    capacity: Option<f64>,
}

/// Cleans the project table.
///
/// Rows are dropped when the name marks them confidential, the id is missing or
/// repeats an earlier row, or capacity cannot be imputed. Negative capacities
/// count as missing. Region falls back to country, then to `Unknown`.
pub fn clean_projects(table: &RawTable, config: &PipelineConfig) -> Result<Cleaned<ProjectRecord>> {
    let id_col = table.require("id", ID)?;
    let status_col = table.require("status", STATUS)?;
    let capacity_col = table.require("announced_capacity", CAPACITY)?;
    let name_col = table.column(NAME);
    let country_col = table.column(COUNTRY);
    let region_col = table.column(REGION);
    if country_col.is_none() && region_col.is_none() {
        table.require("region", REGION)?;
    }
    let technology_col = table.column(TECHNOLOGY);
    let sector_col = table.column(SECTOR);
    let start_col = table.column(START_YEAR);

    let mut report = CleaningReport::new("projects", &table.source, table.rows.len());
    let mut seen_ids = BTreeSet::new();
    let mut pending = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let name = row.get(name_col).map(clean_label).unwrap_or_default();
        if name.to_lowercase().contains("confidential") {
            report.drop_row("confidential");
            continue;
        }
        let Some(id) = row.get(Some(id_col)).map(clean_label) else {
            debug!(line = row.line, "Project without identifier dropped");
            report.drop_row("missing_id");
            continue;
        };
        if !seen_ids.insert(id.clone()) {
            debug!(line = row.line, id = %id, "Duplicate project identifier dropped");
            report.drop_row("duplicate_id");
            continue;
        }

        let country = row
            .get(country_col)
            .map(clean_label)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let region = row
            .get(region_col)
            .or_else(|| row.get(country_col))
            .map(|r| config.canonical_region(&clean_label(r)))
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let technology = row
            .get(technology_col)
            .map(clean_label)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let sector = row.get(sector_col).map(clean_label);
        let status = row
            .get(Some(status_col))
            .map(ProjectStatus::from_label)
            .unwrap_or(ProjectStatus::Unknown);
        let capacity = row
            .get(Some(capacity_col))
            .and_then(parse_number)
            .filter(|c| *c >= 0.0);
        let start_year = override_start_year(&name, config)
            .or_else(|| row.get(start_col).and_then(parse_year));

        pending.push(Pending {
            record: ProjectRecord {
                name: if name.is_empty() { id.clone() } else { name },
                id,
                country,
                region,
                technology,
                sector,
                announced_capacity: 0.0,
                capacity_imputation: ImputationSource::Observed,
                status,
                start_year,
            },
            capacity,
        });
    }

    let values: Vec<Option<f64>> = pending.iter().map(|p| p.capacity).collect();
    let groups: Vec<GroupKeys> = pending
        .iter()
        .map(|p| GroupKeys::new(join_key(&p.record.technology), p.record.status.as_str()))
        .collect();
    let filled = impute(&values, &groups, config.imputation);

    let mut records = Vec::with_capacity(pending.len());
    for (p, fill) in pending.into_iter().zip(filled) {
        let Some((capacity, source)) = fill else {
            report.drop_row("unimputable_capacity");
            continue;
        };
        if source.is_imputed() {
            report.imputed += 1;
        }
        records.push(ProjectRecord {
            announced_capacity: round_to(capacity, CAPACITY_DECIMALS),
            capacity_imputation: source,
            ..p.record
        });
    }

    report.rows_kept = records.len();
    Ok(Cleaned { records, report })
}

fn override_start_year(name: &str, config: &PipelineConfig) -> Option<i32> {
    let name = name.to_lowercase();
    config
        .start_year_overrides
        .iter()
        .find(|o| !o.name_contains.is_empty() && name.contains(&o.name_contains.to_lowercase()))
        .map(|o| o.start_year)
}
