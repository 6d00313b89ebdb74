//! Sector breakeven price ranges.

use crate::cleaning::normalize::{join_key, parse_number, parse_range, title_case};
use crate::cleaning::{Cleaned, CleaningReport};
use crate::error::{PipelineError, Result};
use crate::parser::RawTable;
use crate::records::BreakevenRecord;
use std::collections::BTreeSet;

const SECTOR: &[&str] = &["sector", "category", "end_use"];
const MIN: &[&str] = &["min", "min_price", "min_eur_kg"];
const MAX: &[&str] = &["max", "max_price", "max_eur_kg"];

/// Where the price bounds of a row come from.
enum PriceColumns {
    /// One `"min-max"` range column, e.g. `Min-max (Eur/kg)` holding `3,5-4,2`.
    Range(usize),
    Bounds(usize, usize),
    /// A single price per sector.
    Single(usize),
}

/// Cleans the breakeven table. Sector labels are title-cased; the first row
/// per sector wins.
pub fn clean_breakeven(table: &RawTable) -> Result<Cleaned<BreakevenRecord>> {
    let sector_col = table.require("sector", SECTOR)?;
    let range = table.find_column(|h| h.starts_with("min_max") || h.starts_with("range"));
    let single = table.find_column(|h| h.starts_with("breakeven") || h.starts_with("price"));
    let columns = if let Some((i, _)) = range {
        PriceColumns::Range(i)
    } else if let (Some(lo), Some(hi)) = (table.column(MIN), table.column(MAX)) {
        PriceColumns::Bounds(lo, hi)
    } else if let Some((i, _)) = single {
        PriceColumns::Single(i)
    } else {
        return Err(PipelineError::MissingColumn {
            path: table.source.clone(),
            column: "min_max",
        });
    };

    let mut report = CleaningReport::new("breakeven", &table.source, table.rows.len());
    let mut seen = BTreeSet::new();
    let mut records = Vec::new();

    for row in &table.rows {
        let Some(sector) = row.get(Some(sector_col)).map(title_case) else {
            report.drop_row("missing_sector");
            continue;
        };
        let bounds = match columns {
            PriceColumns::Range(i) => row.get(Some(i)).and_then(parse_range),
            PriceColumns::Bounds(lo, hi) => {
                match (
                    row.get(Some(lo)).and_then(parse_number),
                    row.get(Some(hi)).and_then(parse_number),
                ) {
                    (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
                    (Some(a), None) | (None, Some(a)) => Some((a, a)),
                    (None, None) => None,
                }
            }
            PriceColumns::Single(i) => row.get(Some(i)).and_then(parse_number).map(|v| (v, v)),
        };
        let Some((min_price, max_price)) = bounds.filter(|(lo, _)| *lo >= 0.0) else {
            report.drop_row("missing_price");
            continue;
        };
        if !seen.insert(join_key(&sector)) {
            report.drop_row("duplicate_sector");
            continue;
        }
        records.push(BreakevenRecord {
            sector,
            min_price,
            max_price,
            midpoint: (min_price + max_price) / 2.0,
        });
    }

    report.rows_kept = records.len();
    Ok(Cleaned { records, report })
}
