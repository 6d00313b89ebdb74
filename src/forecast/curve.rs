//! Realization curve of a single project.

use crate::records::ProjectStatus;

/// Share of capacity online in `year`: 0 up to `start_year - ramp_years`,
/// rising linearly to 1 at `start_year`, flat afterwards.
pub fn ramp(year: i32, start_year: i32, ramp_years: u32) -> f64 {
    if year >= start_year {
        return 1.0;
    }
    if ramp_years == 0 {
        return 0.0;
    }
    let ramp_start = start_year as i64 - ramp_years as i64;
    let elapsed = year as i64 - ramp_start;
    if elapsed <= 0 {
        0.0
    } else {
        elapsed as f64 / ramp_years as f64
    }
}

/// Probability that announced capacity is realized: certain for operating
/// plants, zero for decommissioned ones, the HMCI share otherwise.
pub fn realization_probability(status: ProjectStatus, hmci_score: f64) -> f64 {
    match status {
        ProjectStatus::Operational => 1.0,
        ProjectStatus::Decommissioned => 0.0,
        _ => (hmci_score / 100.0).clamp(0.0, 1.0),
    }
}
