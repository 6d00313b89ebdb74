//! Demand table cleaning. Quantities are standardized to kt H2/y.

use crate::cleaning::impute::{GroupKeys, impute};
use crate::cleaning::normalize::{
    clean_label, join_key, parse_number, parse_year, title_case, unit_factor,
};
use crate::cleaning::{Cleaned, CleaningReport};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::parser::RawTable;
use crate::records::{ALL_SECTORS, DemandRecord};
use std::collections::BTreeSet;

const REGION: &[&str] = &["region", "country"];
const SECTOR: &[&str] = &["sector", "end_use", "category"];
const YEAR: &[&str] = &["year"];

fn is_demand_column(name: &str) -> bool {
    name == "demand"
        || name.starts_with("demand_")
        || name == "value"
        || name.starts_with("value_")
        || name == "production"
        || name.starts_with("production_")
}

/// Cleans the demand table.
///
/// The first column named `demand*`, `value*` or `production*` holds the
/// quantity; its unit tokens decide the conversion to kt. Rows without region
/// or year are dropped, as are repeats of an earlier (region, sector, year).
/// Tables without a sector column are treated as all-sector totals.
pub fn clean_demand(table: &RawTable, config: &PipelineConfig) -> Result<Cleaned<DemandRecord>> {
    let region_col = table.require("region", REGION)?;
    let year_col = table.require("year", YEAR)?;
    let sector_col = table.column(SECTOR);
    let (demand_col, demand_name) =
        table
            .find_column(is_demand_column)
            .ok_or_else(|| PipelineError::MissingColumn {
                path: table.source.clone(),
                column: "demand",
            })?;
    let factor = unit_factor(demand_name);

    let mut report = CleaningReport::new("demand", &table.source, table.rows.len());
    let mut seen = BTreeSet::new();
    let mut pending = Vec::with_capacity(table.rows.len());
    let mut values = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let Some(region) = row.get(Some(region_col)) else {
            report.drop_row("missing_region");
            continue;
        };
        let Some(year) = row.get(Some(year_col)).and_then(parse_year) else {
            report.drop_row("missing_year");
            continue;
        };
        let region = config.canonical_region(&clean_label(region));
        let sector = row
            .get(sector_col)
            .map(title_case)
            .unwrap_or_else(|| ALL_SECTORS.to_string());

        if !seen.insert((join_key(&region), join_key(&sector), year)) {
            report.drop_row("duplicate_key");
            continue;
        }

        values.push(
            row.get(Some(demand_col))
                .and_then(parse_number)
                .filter(|v| *v >= 0.0)
                .map(|v| v * factor),
        );
        pending.push((region, sector, year));
    }

    let groups: Vec<GroupKeys> = pending
        .iter()
        .map(|(region, sector, _)| {
            GroupKeys::new(
                format!("{}|{}", join_key(region), join_key(sector)),
                join_key(sector),
            )
        })
        .collect();
    let filled = impute(&values, &groups, config.imputation);

    let mut records = Vec::with_capacity(pending.len());
    for ((region, sector, year), fill) in pending.into_iter().zip(filled) {
        let Some((demand, imputation)) = fill else {
            report.drop_row("unimputable_demand");
            continue;
        };
        if imputation.is_imputed() {
            report.imputed += 1;
        }
        records.push(DemandRecord {
            region,
            sector,
            year,
            demand,
            imputation,
        });
    }

    report.rows_kept = records.len();
    Ok(Cleaned { records, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::impute::ImputationSource;
    use crate::parser::parse_table;
    use std::path::Path;

    fn clean(text: &str) -> Cleaned<DemandRecord> {
        let table = parse_table(Path::new("demand.csv"), text.as_bytes(), 0).unwrap();
        clean_demand(&table, &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_demand_converts_mt_to_kt() {
        let cleaned = clean("region,sector,year,demand (Mtpa H_2)\nEurope,refining,2023,1.5\n");
        assert_eq!(cleaned.records[0].demand, 1500.0);
        assert_eq!(cleaned.records[0].sector, "Refining");
    }

    #[test]
    fn test_demand_unique_key_and_drops() {
        let cleaned = clean(
            "region,sector,year,demand\n\
             Europe,Refining,2023,100\n\
             europe,refining,2023,200\n\
             ,Refining,2023,50\n\
             Europe,Refining,,50\n\
             Europe,Ammonia,2023,80\n",
        );
        assert_eq!(cleaned.records.len(), 2);
        assert_eq!(cleaned.records[0].demand, 100.0);
        assert_eq!(cleaned.report.dropped.get("duplicate_key"), Some(&1));
        assert_eq!(cleaned.report.dropped.get("missing_region"), Some(&1));
        assert_eq!(cleaned.report.dropped.get("missing_year"), Some(&1));
    }

    #[test]
    fn test_demand_imputes_from_same_region_and_sector() {
        let cleaned = clean(
            "region,sector,year,demand\n\
             Europe,Refining,2021,100\n\
             Europe,Refining,2022,\n\
             Europe,Refining,2023,300\n\
             Asia,Refining,2023,1000\n",
        );
        let gap = &cleaned.records[1];
        assert_eq!(gap.demand, 200.0);
        assert_eq!(gap.imputation, ImputationSource::GroupMean);
        assert_eq!(cleaned.report.imputed, 1);
    }

    #[test]
    fn test_demand_without_sector_column_uses_all() {
        let cleaned = clean("country,year,value_ktpa_h_2\nGermany,2023,1800\n");
        assert_eq!(cleaned.records[0].sector, ALL_SECTORS);
        assert_eq!(cleaned.records[0].region, "Germany");
        assert_eq!(cleaned.records[0].demand, 1800.0);
    }

    #[test]
    fn test_demand_missing_quantity_column() {
        let raw = "region,year\nEU,2020\n";
        let table = parse_table(Path::new("demand.csv"), raw.as_bytes(), 0).unwrap();
        let err = clean_demand(&table, &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("demand"));
    }
}
