//! Hydrogen Market Confidence Index calculation.
//!
//! Every project gets three sub-scores on a 0-100 scale:
//!
//! - **maturity** from its status ([`MaturityPoints`](crate::config::MaturityPoints)),
//! - **demand alignment** from its region's demand ([`regional::DemandProfile`]),
//! - **cost competitiveness** from its region's production cost against sector
//!   breakeven prices ([`regional::CostProfile`]).
//!
//! The HMCI is their weighted sum. Regions missing from the demand or cost
//! tables get the global average instead of failing the run.

pub mod aggregate;
pub mod grade;
pub mod regional;

use crate::config::PipelineConfig;
use crate::index::aggregate::{IndexSummary, summarize};
use crate::index::grade::grade;
use crate::index::regional::{CostProfile, DemandProfile};
use crate::records::{BreakevenRecord, ConfidenceScore, CostRecord, DemandRecord, ProjectRecord};
use crate::stats::round_to;
use tracing::{debug, info, warn};

const SCORE_DECIMALS: i32 = 3;

/// Scores and summary produced by [`compute_index`].
#[derive(Debug)]
pub struct IndexOutcome {
    pub scores: Vec<ConfidenceScore>,
    pub summary: IndexSummary,
}

/// Computes the HMCI for every project, in project order.
///
/// Pure and deterministic: identical inputs give identical scores.
#[tracing::instrument(skip_all, fields(projects = projects.len()))]
pub fn compute_index(
    projects: &[ProjectRecord],
    demand: &[DemandRecord],
    costs: &[CostRecord],
    breakeven: &[BreakevenRecord],
    config: &PipelineConfig,
) -> IndexOutcome {
    let demand_profile = DemandProfile::build(demand, config.demand_reference_year);
    let cost_profile = CostProfile::build(costs, breakeven);

    if demand_profile.is_empty() {
        warn!(
            reference_year = ?config.demand_reference_year,
            "No demand data at the reference year, demand alignment uses the neutral score"
        );
    }
    if cost_profile.is_empty() {
        warn!("No cost data, cost competitiveness uses the neutral score");
    }
    info!(
        reference_year = ?demand_profile.reference_year,
        demand_regions = demand_profile.region_count(),
        "Regional profiles built"
    );

    let scores: Vec<ConfidenceScore> = projects
        .iter()
        .map(|p| score_project(p, &demand_profile, &cost_profile, config))
        .collect();

    let summary = summarize(&scores, config.weights, demand_profile.reference_year);
    info!(
        scored = scores.len(),
        overall = summary.overall.capacity_weighted_score,
        grade = %summary.overall.grade,
        demand_fallbacks = summary.demand_fallbacks,
        cost_fallbacks = summary.cost_fallbacks,
        "HMCI computed"
    );

    IndexOutcome { scores, summary }
}

fn score_project(
    project: &ProjectRecord,
    demand: &DemandProfile,
    costs: &CostProfile,
    config: &PipelineConfig,
) -> ConfidenceScore {
    let weights = config.weights;
    let sector = project.sector.as_deref();

    let maturity = config.maturity.points(project.status);

    let (demand_score, demand_fallback) = match demand.score(&project.region, sector) {
        Some(score) => (score, false),
        None => (
            demand.global_average().unwrap_or(config.neutral_score),
            true,
        ),
    };

    let (cost_score, cost_fallback) = match costs.cost_for(&project.region, sector) {
        Some(lookup) => (costs.competitiveness(lookup.cost, sector), lookup.fallback),
        None => (config.neutral_score, true),
    };

    if demand_fallback || cost_fallback {
        debug!(
            project = %project.id,
            region = %project.region,
            demand_fallback,
            cost_fallback,
            "Regional fallback applied"
        );
    }

    let regional_weight = weights.demand_alignment + weights.cost_competitiveness;
    let regional_confidence = if regional_weight > 0.0 {
        (weights.demand_alignment * demand_score + weights.cost_competitiveness * cost_score)
            / regional_weight
    } else {
        (demand_score + cost_score) / 2.0
    };

    let hmci = (weights.maturity * maturity
        + weights.demand_alignment * demand_score
        + weights.cost_competitiveness * cost_score)
        .clamp(0.0, 100.0);
    let hmci = round_to(hmci, SCORE_DECIMALS);

    ConfidenceScore {
        project_id: project.id.clone(),
        project_name: project.name.clone(),
        region: project.region.clone(),
        status: project.status,
        announced_capacity: project.announced_capacity,
        maturity_score: round_to(maturity, SCORE_DECIMALS),
        demand_score: round_to(demand_score, SCORE_DECIMALS),
        cost_score: round_to(cost_score, SCORE_DECIMALS),
        regional_confidence: round_to(regional_confidence, SCORE_DECIMALS),
        hmci_score: hmci,
        grade: grade(hmci),
        demand_fallback,
        cost_fallback,
    }
}
