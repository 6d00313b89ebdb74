//! Market summary tables: regional demand shares, demand per sector over the
//! years, and production cost against sector breakeven ranges.

use crate::cleaning::normalize::join_key;
use crate::records::{BreakevenRecord, CostRecord, DemandRecord};
use crate::stats::{mean, pct, round_to};
use serde::Serialize;
use std::collections::BTreeMap;

const REPORT_DECIMALS: i32 = 3;

/// One row of `demand_by_region.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalDemandShare {
    pub region: String,
    pub year: i32,
    pub demand: f64,
    pub share_percent: f64,
}

/// Demand per region in the latest year, with each region's share of the
/// total. Sorted by share (largest first), ties by region name.
pub fn demand_by_region(demand: &[DemandRecord]) -> Vec<RegionalDemandShare> {
    let Some(year) = demand.iter().map(|d| d.year).max() else {
        return Vec::new();
    };

    // keyed by join key; first label seen is kept for display
    let mut totals: BTreeMap<String, (String, f64)> = BTreeMap::new();
    for d in demand.iter().filter(|d| d.year == year) {
        let entry = totals
            .entry(join_key(&d.region))
            .or_insert_with(|| (d.region.clone(), 0.0));
        entry.1 += d.demand;
    }
    let grand_total: f64 = totals.values().map(|(_, v)| v).sum();

    let mut rows: Vec<RegionalDemandShare> = totals
        .into_values()
        .map(|(region, total)| RegionalDemandShare {
            region,
            year,
            demand: round_to(total, REPORT_DECIMALS),
            share_percent: round_to(pct(total, grand_total), REPORT_DECIMALS),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.share_percent
            .total_cmp(&a.share_percent)
            .then_with(|| a.region.cmp(&b.region))
    });
    rows
}

/// `demand_by_sector.csv`: one row per year, one column per sector, and the
/// yearly total. Sectors are ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorDemandTable {
    pub sectors: Vec<String>,
    pub rows: Vec<SectorDemandRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorDemandRow {
    pub year: i32,
    /// Demand per sector, aligned with [`SectorDemandTable::sectors`]; 0 where none is reported.
    pub by_sector: Vec<f64>,
    pub total: f64,
}

impl SectorDemandTable {
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.sectors.len() + 2);
        header.push("year".to_string());
        header.extend(self.sectors.iter().cloned());
        header.push("total".to_string());
        header
    }

    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = vec![row.year.to_string()];
                record.extend(row.by_sector.iter().map(|v| format!("{:?}", v)));
                record.push(format!("{:?}", row.total));
                record
            })
            .collect()
    }
}

/// Demand summed over regions per sector and year, for the years in
/// `first_year..=last_year` that appear in the data.
pub fn demand_by_sector(
    demand: &[DemandRecord],
    first_year: i32,
    last_year: i32,
) -> SectorDemandTable {
    let window = first_year..=last_year;
    let mut labels: BTreeMap<String, String> = BTreeMap::new();
    let mut cells: BTreeMap<(i32, String), f64> = BTreeMap::new();

    for d in demand.iter().filter(|d| window.contains(&d.year)) {
        let key = join_key(&d.sector);
        labels.entry(key.clone()).or_insert_with(|| d.sector.clone());
        *cells.entry((d.year, key)).or_insert(0.0) += d.demand;
    }

    let mut years: Vec<i32> = cells.keys().map(|(year, _)| *year).collect();
    years.dedup();

    let rows = years
        .into_iter()
        .map(|year| {
            let by_sector: Vec<f64> = labels
                .keys()
                .map(|key| cells.get(&(year, key.clone())).copied().unwrap_or(0.0))
                .collect();
            let total: f64 = by_sector.iter().sum();
            SectorDemandRow {
                year,
                by_sector: by_sector
                    .into_iter()
                    .map(|v| round_to(v, REPORT_DECIMALS))
                    .collect(),
                total: round_to(total, REPORT_DECIMALS),
            }
        })
        .collect();

    SectorDemandTable {
        sectors: labels.into_values().collect(),
        rows,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePosition {
    BelowRange,
    WithinRange,
    AboveRange,
}

/// One row of `cost_vs_breakeven.csv`: a region's cost statistics compared with
/// one sector's breakeven range. Breakeven fields are empty when no ranges exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComparison {
    pub region: String,
    pub observations: usize,
    pub min_cost: f64,
    pub mean_cost: f64,
    pub max_cost: f64,
    pub sector: Option<String>,
    pub breakeven_min: Option<f64>,
    pub breakeven_max: Option<f64>,
    /// `mean_cost - breakeven midpoint`; negative means cheaper than breakeven.
    pub gap_to_midpoint: Option<f64>,
    pub position: Option<RangePosition>,
}

/// Compares every region's production cost with every sector's breakeven range.
/// Regions are listed alphabetically, sectors in table order.
pub fn cost_vs_breakeven(
    costs: &[CostRecord],
    breakeven: &[BreakevenRecord],
) -> Vec<CostComparison> {
    let mut by_region: BTreeMap<String, (String, Vec<f64>)> = BTreeMap::new();
    for c in costs {
        by_region
            .entry(join_key(&c.region))
            .or_insert_with(|| (c.region.clone(), Vec::new()))
            .1
            .push(c.cost);
    }

    let mut rows = Vec::new();
    for (region, values) in by_region.into_values() {
        let avg = mean(&values);
        let min_cost = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_cost = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let base = CostComparison {
            region,
            observations: values.len(),
            min_cost: round_to(min_cost, REPORT_DECIMALS),
            mean_cost: round_to(avg, REPORT_DECIMALS),
            max_cost: round_to(max_cost, REPORT_DECIMALS),
            sector: None,
            breakeven_min: None,
            breakeven_max: None,
            gap_to_midpoint: None,
            position: None,
        };

        if breakeven.is_empty() {
            rows.push(base);
            continue;
        }
        for b in breakeven {
            let position = if avg < b.min_price {
                RangePosition::BelowRange
            } else if avg > b.max_price {
                RangePosition::AboveRange
            } else {
                RangePosition::WithinRange
            };
            rows.push(CostComparison {
                sector: Some(b.sector.clone()),
                breakeven_min: Some(b.min_price),
                breakeven_max: Some(b.max_price),
                gap_to_midpoint: Some(round_to(avg - b.midpoint, REPORT_DECIMALS)),
                position: Some(position),
                ..base.clone()
            });
        }
    }
    rows
}
