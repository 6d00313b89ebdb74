use crate::config::ScoreWeights;
use crate::index::grade::grade;
use crate::records::ConfidenceScore;
use crate::stats::{mean, round_to, stddev, weighted_mean};
use serde::Serialize;
use std::collections::BTreeMap;

const SUMMARY_DECIMALS: i32 = 3;

/// Market-level HMCI across all scored projects.
#[derive(Debug, Serialize)]
pub struct OverallIndex {
    /// Mean HMCI weighted by announced capacity; the plain mean when total capacity is zero.
    pub capacity_weighted_score: f64,
    pub mean_score: f64,
    pub stddev: f64,
    pub grade: String,
}

/// HMCI aggregated over the projects of one region.
#[derive(Debug, Serialize)]
pub struct RegionIndexEntry {
    pub region: String,
    pub project_count: usize,
    pub capacity: f64,
    pub mean_score: f64,
    pub capacity_weighted_score: f64,
    pub grade: String,
}

/// Written as `index_summary.json`.
#[derive(Debug, Serialize)]
pub struct IndexSummary {
    pub schema_version: u8,
    pub algorithm_version: u8,
    pub weights: ScoreWeights,
    pub demand_reference_year: Option<i32>,
    pub project_count: usize,
    pub total_capacity: f64,
    pub overall: OverallIndex,
    pub demand_fallbacks: usize,
    pub cost_fallbacks: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub regions: Vec<RegionIndexEntry>,
}

/// Aggregates per-project scores into the market summary. Regions are listed
/// alphabetically.
pub fn summarize(
    scores: &[ConfidenceScore],
    weights: ScoreWeights,
    demand_reference_year: Option<i32>,
) -> IndexSummary {
    let values: Vec<f64> = scores.iter().map(|s| s.hmci_score).collect();
    let pairs: Vec<(f64, f64)> = scores
        .iter()
        .map(|s| (s.hmci_score, s.announced_capacity))
        .collect();
    let avg = mean(&values);
    let weighted = round_to(weighted_mean(&pairs), SUMMARY_DECIMALS);
    let total_capacity: f64 = scores.iter().map(|s| s.announced_capacity).sum();

    let mut status_counts = BTreeMap::new();
    let mut by_region: BTreeMap<&str, Vec<&ConfidenceScore>> = BTreeMap::new();
    for s in scores {
        *status_counts.entry(s.status.as_str().to_string()).or_insert(0) += 1;
        by_region.entry(s.region.as_str()).or_default().push(s);
    }

    let regions = by_region
        .into_iter()
        .map(|(region, members)| {
            let values: Vec<f64> = members.iter().map(|s| s.hmci_score).collect();
            let pairs: Vec<(f64, f64)> = members
                .iter()
                .map(|s| (s.hmci_score, s.announced_capacity))
                .collect();
            let weighted = round_to(weighted_mean(&pairs), SUMMARY_DECIMALS);
            let capacity: f64 = members.iter().map(|s| s.announced_capacity).sum();
            RegionIndexEntry {
                region: region.to_string(),
                project_count: members.len(),
                capacity: round_to(capacity, SUMMARY_DECIMALS),
                mean_score: round_to(mean(&values), SUMMARY_DECIMALS),
                capacity_weighted_score: weighted,
                grade: grade(weighted),
            }
        })
        .collect();

    IndexSummary {
        schema_version: 1,
        algorithm_version: 1,
        weights,
        demand_reference_year,
        project_count: scores.len(),
        total_capacity: round_to(total_capacity, SUMMARY_DECIMALS),
        overall: OverallIndex {
            capacity_weighted_score: weighted,
            mean_score: round_to(avg, SUMMARY_DECIMALS),
            stddev: round_to(stddev(&values, avg), SUMMARY_DECIMALS),
            grade: grade(weighted),
        },
        demand_fallbacks: scores.iter().filter(|s| s.demand_fallback).count(),
        cost_fallbacks: scores.iter().filter(|s| s.cost_fallback).count(),
        status_counts,
        regions,
    }
}
