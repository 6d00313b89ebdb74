//! Regional lookups joined onto projects: demand alignment and cost competitiveness.
//!
//! Both profiles key regions and sectors by [`join_key`], so labels differing
//! only in case or spacing match.

use crate::cleaning::normalize::join_key;
use crate::records::{BreakevenRecord, CostRecord, DemandRecord};
use crate::stats::mean;
use std::collections::BTreeMap;

/// Demand at the reference year, summed per region and per (region, sector).
#[derive(Debug, Default)]
pub struct DemandProfile {
    pub reference_year: Option<i32>,
    region_totals: BTreeMap<String, f64>,
    sector_totals: BTreeMap<(String, String), f64>,
    max_region_total: f64,
    max_sector_total: BTreeMap<String, f64>,
}

impl DemandProfile {
    /// Builds the profile for `reference_year`, or for the latest year present when `None`.
    pub fn build(demand: &[DemandRecord], reference_year: Option<i32>) -> Self {
        let Some(year) = reference_year.or_else(|| demand.iter().map(|d| d.year).max()) else {
            return Self::default();
        };

        let mut profile = DemandProfile {
            reference_year: Some(year),
            ..Default::default()
        };
        for d in demand.iter().filter(|d| d.year == year) {
            let region = join_key(&d.region);
            let sector = join_key(&d.sector);
            *profile.region_totals.entry(region.clone()).or_insert(0.0) += d.demand;
            *profile.sector_totals.entry((region, sector)).or_insert(0.0) += d.demand;
        }

        profile.max_region_total = profile.region_totals.values().copied().fold(0.0, f64::max);
        for ((_, sector), total) in &profile.sector_totals {
            let max = profile.max_sector_total.entry(sector.clone()).or_insert(0.0);
            *max = max.max(*total);
        }
        profile
    }

    pub fn is_empty(&self) -> bool {
        self.region_totals.is_empty()
    }

    pub fn region_count(&self) -> usize {
        self.region_totals.len()
    }

    /// Demand alignment on 0-100: the region's demand relative to the largest
    /// region's. Uses the project's sector when that region reports it.
    /// `None` when the region has no demand at the reference year.
    pub fn score(&self, region: &str, sector: Option<&str>) -> Option<f64> {
        let region = join_key(region);
        if let Some(sector) = sector.map(join_key) {
            if let Some(total) = self.sector_totals.get(&(region.clone(), sector.clone())) {
                let max = self.max_sector_total.get(&sector).copied().unwrap_or(0.0);
                return Some(relative(*total, max));
            }
        }
        self.region_totals
            .get(&region)
            .map(|total| relative(*total, self.max_region_total))
    }

    /// Mean regional score, used for projects whose region is not covered.
    pub fn global_average(&self) -> Option<f64> {
        if self.region_totals.is_empty() {
            return None;
        }
        let scores: Vec<f64> = self
            .region_totals
            .values()
            .map(|total| relative(*total, self.max_region_total))
            .collect();
        Some(mean(&scores))
    }
}

fn relative(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        0.0
    } else {
        (value / max * 100.0).clamp(0.0, 100.0)
    }
}

/// Cost of producing hydrogen in a region, as found by [`CostProfile::cost_for`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostLookup {
    pub cost: f64,
    /// The region had no cost records and the global mean was used.
    pub fallback: bool,
}

/// Mean production costs per region and (region, sector), plus breakeven references.
#[derive(Debug, Default)]
pub struct CostProfile {
    region_mean: BTreeMap<String, f64>,
    region_sector_mean: BTreeMap<(String, String), f64>,
    global_mean: Option<f64>,
    breakeven_by_sector: BTreeMap<String, f64>,
    mean_breakeven: Option<f64>,
    min_region_cost: f64,
    max_region_cost: f64,
}

impl CostProfile {
    pub fn build(costs: &[CostRecord], breakeven: &[BreakevenRecord]) -> Self {
        let mut by_region: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut by_region_sector: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
        let mut sector_breakeven: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for c in costs {
            let region = join_key(&c.region);
            let sector = join_key(&c.sector);
            by_region.entry(region.clone()).or_default().push(c.cost);
            by_region_sector.entry((region, sector.clone())).or_default().push(c.cost);
            if let Some(b) = c.breakeven_price {
                sector_breakeven.entry(sector).or_default().push(b);
            }
        }
        // the breakeven table is authoritative for the sectors it lists
        for b in breakeven {
            sector_breakeven.insert(join_key(&b.sector), vec![b.midpoint]);
        }

        let region_mean: BTreeMap<String, f64> =
            by_region.into_iter().map(|(k, v)| (k, mean(&v))).collect();
        let region_sector_mean = by_region_sector
            .into_iter()
            .map(|(k, v)| (k, mean(&v)))
            .collect();
        let breakeven_by_sector: BTreeMap<String, f64> = sector_breakeven
            .into_iter()
            .map(|(k, v)| (k, mean(&v)))
            .collect();

        let all_costs: Vec<f64> = costs.iter().map(|c| c.cost).collect();
        let midpoints: Vec<f64> = breakeven_by_sector.values().copied().collect();
        let region_costs: Vec<f64> = region_mean.values().copied().collect();

        CostProfile {
            global_mean: (!all_costs.is_empty()).then(|| mean(&all_costs)),
            mean_breakeven: (!midpoints.is_empty()).then(|| mean(&midpoints)),
            min_region_cost: region_costs.iter().copied().fold(f64::INFINITY, f64::min),
            max_region_cost: region_costs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            region_mean,
            region_sector_mean,
            breakeven_by_sector,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.global_mean.is_none()
    }

    /// Sector-specific regional cost, else the regional mean, else the global
    /// mean (flagged as fallback). `None` only when there is no cost data at all.
    pub fn cost_for(&self, region: &str, sector: Option<&str>) -> Option<CostLookup> {
        let region = join_key(region);
        let matched = sector
            .map(join_key)
            .and_then(|s| self.region_sector_mean.get(&(region.clone(), s)))
            .or_else(|| self.region_mean.get(&region));

        match matched {
            Some(cost) => Some(CostLookup {
                cost: *cost,
                fallback: false,
            }),
            None => self.global_mean.map(|cost| CostLookup {
                cost,
                fallback: true,
            }),
        }
    }

    /// Breakeven reference for a sector: its own midpoint, else the mean over sectors.
    pub fn breakeven_for(&self, sector: Option<&str>) -> Option<f64> {
        sector
            .map(join_key)
            .and_then(|s| self.breakeven_by_sector.get(&s).copied())
            .or(self.mean_breakeven)
    }

    /// Cost competitiveness on 0-100.
    ///
    /// With a breakeven reference: `min(1, breakeven / cost) * 100`, so any cost
    /// at or below breakeven scores 100. Without one: inverse min-max scaling
    /// over regional mean costs, cheapest region 100, dearest 0.
    pub fn competitiveness(&self, cost: f64, sector: Option<&str>) -> f64 {
        if let Some(breakeven) = self.breakeven_for(sector) {
            if cost <= 0.0 {
                return 100.0;
            }
            return ((breakeven / cost).min(1.0) * 100.0).clamp(0.0, 100.0);
        }
        let span = self.max_region_cost - self.min_region_cost;
        if !span.is_finite() || span <= f64::EPSILON {
            return 100.0;
        }
        ((self.max_region_cost - cost) / span * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::impute::ImputationSource;

    fn demand(region: &str, sector: &str, year: i32, value: f64) -> DemandRecord {
        DemandRecord {
            region: region.into(),
            sector: sector.into(),
            year,
            demand: value,
            imputation: ImputationSource::Observed,
        }
    }

    fn cost(region: &str, sector: &str, value: f64, breakeven: Option<f64>) -> CostRecord {
        CostRecord {
            region: region.into(),
            sector: sector.into(),
            cost: value,
            breakeven_price: breakeven,
            imputation: ImputationSource::Observed,
        }
    }

    #[test]
    fn test_demand_profile_uses_latest_year() {
        let profile = DemandProfile::build(
            &[
                demand("Germany", "Refining", 2022, 900.0),
                demand("Germany", "Refining", 2023, 400.0),
                demand("Germany", "Ammonia", 2023, 400.0),
                demand("France", "Refining", 2023, 200.0),
            ],
            None,
        );
        assert_eq!(profile.reference_year, Some(2023));
        assert_eq!(profile.score("germany", None), Some(100.0));
        assert_eq!(profile.score("France", None), Some(25.0));
        assert_eq!(profile.score("France", Some("refining")), Some(50.0));
        // sector not reported by the region: falls back to the region total
        assert_eq!(profile.score("France", Some("Ammonia")), Some(25.0));
        assert_eq!(profile.score("Spain", None), None);
        assert_eq!(profile.global_average(), Some(62.5));
    }

    #[test]
    fn test_demand_profile_explicit_reference_year() {
        let profile = DemandProfile::build(&[demand("Germany", "All", 2022, 900.0)], Some(2030));
        assert!(profile.is_empty());
        assert_eq!(profile.global_average(), None);
    }

    #[test]
    fn test_cost_lookup_and_fallback() {
        let profile = CostProfile::build(
            &[
                cost("Germany", "All", 6.0, None),
                cost("Germany", "Steel", 4.0, None),
                cost("France", "All", 2.0, None),
            ],
            &[],
        );
        assert_eq!(
            profile.cost_for("Germany", Some("steel")),
            Some(CostLookup { cost: 4.0, fallback: false })
        );
        assert_eq!(profile.cost_for("Germany", None).unwrap().cost, 5.0);
        let missing = profile.cost_for("Chile", None).unwrap();
        assert!(missing.fallback);
        assert_eq!(missing.cost, 4.0);
    }

    #[test]
    fn test_competitiveness_against_breakeven() {
        let breakeven = [BreakevenRecord {
            sector: "Oil Refining".into(),
            min_price: 3.0,
            max_price: 5.0,
            midpoint: 4.0,
        }];
        let profile = CostProfile::build(&[cost("Germany", "All", 8.0, None)], &breakeven);
        assert_eq!(profile.competitiveness(8.0, Some("oil refining")), 50.0);
        assert_eq!(profile.competitiveness(3.0, Some("Oil Refining")), 100.0);
        // unknown sector uses the mean breakeven
        assert_eq!(profile.competitiveness(8.0, Some("Shipping")), 50.0);
    }

    #[test]
    fn test_competitiveness_without_breakeven_is_min_max_scaled() {
        let profile = CostProfile::build(
            &[cost("Germany", "All", 6.0, None), cost("France", "All", 2.0, None)],
            &[],
        );
        assert_eq!(profile.competitiveness(2.0, None), 100.0);
        assert_eq!(profile.competitiveness(6.0, None), 0.0);
        assert_eq!(profile.competitiveness(4.0, None), 50.0);
    }

    #[test]
    fn test_empty_cost_profile() {
        let profile = CostProfile::build(&[], &[]);
        assert!(profile.is_empty());
        assert_eq!(profile.cost_for("Germany", None), None);
    }
}
