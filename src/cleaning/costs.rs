//! Production cost cleaning and breakeven attachment.

use crate::cleaning::impute::{GroupKeys, impute};
use crate::cleaning::normalize::{clean_label, join_key, parse_number, title_case};
use crate::cleaning::{Cleaned, CleaningReport};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::parser::RawTable;
use crate::records::{ALL_SECTORS, BreakevenRecord, CostRecord};
use std::collections::BTreeMap;

const REGION: &[&str] = &["region", "country"];
const SECTOR: &[&str] = &["sector", "category", "end_use"];
const BREAKEVEN: &[&str] = &["breakeven_price", "breakeven", "breakeven_eur_kg"];

fn is_cost_column(name: &str) -> bool {
    name == "cost"
        || name.starts_with("cost_")
        || name == "value"
        || name.starts_with("value_")
        || name.starts_with("lcoh")
        || name.starts_with("production_cost")
}

/// Cleans the production cost table.
///
/// Rows without a region are dropped. Missing costs are imputed (region, then
/// sector, then global); after cleaning every record carries a cost. Records
/// without their own breakeven price take the midpoint of their sector's range.
pub fn clean_costs(
    table: &RawTable,
    breakeven: &[BreakevenRecord],
    config: &PipelineConfig,
) -> Result<Cleaned<CostRecord>> {
    let region_col = table.require("region", REGION)?;
    let sector_col = table.column(SECTOR);
    let breakeven_col = table.column(BREAKEVEN);
    let (cost_col, _) = table
        .find_column(is_cost_column)
        .ok_or_else(|| PipelineError::MissingColumn {
            path: table.source.clone(),
            column: "cost",
        })?;

    let midpoints: BTreeMap<String, f64> = breakeven
        .iter()
        .map(|b| (join_key(&b.sector), b.midpoint))
        .collect();

    let mut report = CleaningReport::new("costs", &table.source, table.rows.len());
    let mut pending = Vec::with_capacity(table.rows.len());
    let mut values = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let Some(region) = row.get(Some(region_col)) else {
            report.drop_row("missing_region");
            continue;
        };
        let region = config.canonical_region(&clean_label(region));
        let sector = row
            .get(sector_col)
            .map(title_case)
            .unwrap_or_else(|| ALL_SECTORS.to_string());
        let own_breakeven = row
            .get(breakeven_col)
            .and_then(parse_number)
            .filter(|v| *v >= 0.0);
        let breakeven_price = own_breakeven.or_else(|| midpoints.get(&join_key(&sector)).copied());

        values.push(
            row.get(Some(cost_col))
                .and_then(parse_number)
                .filter(|v| *v >= 0.0),
        );
        pending.push((region, sector, breakeven_price));
    }

    let groups: Vec<GroupKeys> = pending
        .iter()
        .map(|(region, sector, _)| GroupKeys::new(join_key(region), join_key(sector)))
        .collect();
    let filled = impute(&values, &groups, config.imputation);

    let mut records = Vec::with_capacity(pending.len());
    for ((region, sector, breakeven_price), fill) in pending.into_iter().zip(filled) {
        let Some((cost, imputation)) = fill else {
            report.drop_row("unimputable_cost");
            continue;
        };
        if imputation.is_imputed() {
            report.imputed += 1;
        }
        records.push(CostRecord {
            region,
            sector,
            cost,
            breakeven_price,
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

    fn breakeven() -> Vec<BreakevenRecord> {
        vec![BreakevenRecord {
            sector: "Oil Refining".into(),
            min_price: 3.0,
            max_price: 5.0,
            midpoint: 4.0,
        }]
    }

    fn clean(text: &str) -> Cleaned<CostRecord> {
        let table = parse_table(Path::new("costs.csv"), text.as_bytes(), 0).unwrap();
        clean_costs(&table, &breakeven(), &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_costs_have_no_missing_values_after_imputation() {
        let cleaned = clean(
            "Country,Value (€/kg)\n\
             Germany,6\n\
             Germany,\n\
             France,4\n\
             Spain,NA\n",
        );
        assert_eq!(cleaned.records.len(), 4);
        assert!(cleaned.records.iter().all(|r| r.cost.is_finite()));
        assert_eq!(cleaned.records[1].cost, 6.0);
        assert_eq!(cleaned.records[1].imputation, ImputationSource::GroupMean);
        // Spain has no observations and the sector is "All" for every row
        assert_eq!(cleaned.records[3].cost, 5.0);
        assert_eq!(
            cleaned.records[3].imputation,
            ImputationSource::FallbackGroupMean
        );
        assert_eq!(cleaned.report.imputed, 2);
    }

    #[test]
    fn test_costs_attach_sector_breakeven() {
        let cleaned = clean(
            "region,sector,cost,breakeven_price\n\
             Germany,oil refining,5,\n\
             Germany,Mobility,7,9\n\
             Germany,Steel,6,\n",
        );
        assert_eq!(cleaned.records[0].breakeven_price, Some(4.0));
        assert_eq!(cleaned.records[1].breakeven_price, Some(9.0));
        assert_eq!(cleaned.records[2].breakeven_price, None);
    }

    #[test]
    fn test_costs_drop_rows_without_region() {
        let cleaned = clean("country,cost\n,4\nItaly,5\n");
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.report.dropped.get("missing_region"), Some(&1));
    }

    #[test]
    fn test_costs_all_missing_are_dropped() {
        let cleaned = clean("country,cost\nItaly,\nSpain,\n");
        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.report.dropped.get("unimputable_cost"), Some(&2));
    }
}
