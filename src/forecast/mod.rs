//! Probability-weighted capacity forecast up to the horizon year.
//!
//! Each project contributes `announced_capacity × probability × ramp(year)`,
//! where the probability comes from its status and HMCI
//! ([`curve::realization_probability`]) and the ramp rises linearly over the
//! years before its start year ([`curve::ramp`]). Projects without a plausible
//! start year are excluded and counted.

pub mod curve;

use crate::config::ForecastConfig;
use crate::records::{
    CAPACITY_DECIMALS, ConfidenceScore, ForecastRecord, ProjectRecord, ProjectStatus,
};
use crate::stats::round_to;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingStartYear,
    ImplausibleStartYear,
    MissingScore,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::MissingStartYear => "missing_start_year",
            ExclusionReason::ImplausibleStartYear => "implausible_start_year",
            ExclusionReason::MissingScore => "missing_score",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedProject {
    pub project_id: String,
    pub reason: ExclusionReason,
}

/// Totals for one forecast year, written as `forecast_summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    /// Announced capacity of non-decommissioned projects whose start year has been reached.
    pub announced_online: f64,
    pub projected_capacity: f64,
    pub contributing_projects: usize,
}

#[derive(Debug)]
pub struct ForecastOutcome {
    pub records: Vec<ForecastRecord>,
    pub summary: Vec<YearSummary>,
    pub excluded: Vec<ExcludedProject>,
}

impl ForecastOutcome {
    pub fn excluded_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.excluded {
            *counts.entry(e.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Builds the year-by-year projection for every forecastable project, in
/// project order, for `config.first_year..=config.horizon_year`.
#[tracing::instrument(skip_all, fields(projects = projects.len(), horizon = config.horizon_year))]
pub fn forecast(
    projects: &[ProjectRecord],
    scores: &[ConfidenceScore],
    config: &ForecastConfig,
) -> ForecastOutcome {
    let by_id: BTreeMap<&str, &ConfidenceScore> =
        scores.iter().map(|s| (s.project_id.as_str(), s)).collect();
    let plausible = config.min_plausible_year..=config.max_plausible_year;
    let years = config.first_year..=config.horizon_year;

    let mut records = Vec::new();
    let mut excluded = Vec::new();
    let mut totals: BTreeMap<i32, YearSummary> = years
        .clone()
        .map(|year| {
            (
                year,
                YearSummary {
                    year,
                    announced_online: 0.0,
                    projected_capacity: 0.0,
                    contributing_projects: 0,
                },
            )
        })
        .collect();

    for project in projects {
        let lookup = match (project.start_year, by_id.get(project.id.as_str())) {
            (None, _) => Err(ExclusionReason::MissingStartYear),
            (Some(y), _) if !plausible.contains(&y) => Err(ExclusionReason::ImplausibleStartYear),
            (Some(_), None) => Err(ExclusionReason::MissingScore),
            (Some(y), Some(score)) => Ok((y, *score)),
        };
        let (start_year, score) = match lookup {
            Ok(found) => found,
            Err(reason) => {
                debug!(
                    project = %project.id,
                    reason = reason.as_str(),
                    "Project excluded from forecast"
                );
                excluded.push(ExcludedProject {
                    project_id: project.id.clone(),
                    reason,
                });
                continue;
            }
        };

        let probability = curve::realization_probability(project.status, score.hmci_score);
        for year in years.clone() {
            let share = curve::ramp(year, start_year, config.ramp_years);
            let projected = project.announced_capacity * probability * share;
            // rounding must not lift the value above what was announced
            let projected =
                round_to(projected, CAPACITY_DECIMALS).min(project.announced_capacity);

            if let Some(total) = totals.get_mut(&year) {
                if year >= start_year && project.status != ProjectStatus::Decommissioned {
                    total.announced_online += project.announced_capacity;
                }
                if projected > 0.0 {
                    total.projected_capacity += projected;
                    total.contributing_projects += 1;
                }
            }

            records.push(ForecastRecord {
                project_id: project.id.clone(),
                year,
                projected_capacity: projected,
                announced_capacity: project.announced_capacity,
                realization_probability: round_to(probability, CAPACITY_DECIMALS),
            });
        }
    }

    let summary: Vec<YearSummary> = totals
        .into_values()
        .map(|s| YearSummary {
            announced_online: round_to(s.announced_online, CAPACITY_DECIMALS),
            projected_capacity: round_to(s.projected_capacity, CAPACITY_DECIMALS),
            ..s
        })
        .collect();

    let outcome = ForecastOutcome {
        records,
        summary,
        excluded,
    };
    info!(
        records = outcome.records.len(),
        excluded = outcome.excluded.len(),
        horizon_projected = outcome
            .summary
            .last()
            .map(|s| s.projected_capacity)
            .unwrap_or(0.0),
        "Capacity forecast built"
    );
    outcome
}
