//! Imputation of missing numeric values.
//!
//! Two deterministic methods are available:
//!
//! - [`ImputationMethod::GroupMean`] (default): a missing value takes the mean
//!   of the observed values sharing its primary group; failing that, its
//!   fallback group; failing that, the whole column.
//! - [`ImputationMethod::ForwardBackwardFill`]: a missing value takes the
//!   nearest observed value above it in file order, or below it for leading gaps.
//!
//! Means are accumulated in file order, so results do not depend on map iteration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationMethod {
    #[default]
    GroupMean,
    ForwardBackwardFill,
}

/// Where a cleaned value came from. Written next to every imputable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationSource {
    Observed,
    GroupMean,
    FallbackGroupMean,
    GlobalMean,
    ForwardFill,
    BackwardFill,
}

impl ImputationSource {
    pub fn is_imputed(self) -> bool {
        self != ImputationSource::Observed
    }
}

/// Grouping keys for one row.
#[derive(Debug, Clone)]
pub struct GroupKeys {
    pub primary: String,
    pub fallback: String,
}

impl GroupKeys {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }
}

#[derive(Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Fills the gaps in `values`. `groups` must be the same length as `values`
/// (it is ignored by the fill method). Entries stay `None` only when the
/// column has no observed value at all.
pub fn impute(
    values: &[Option<f64>],
    groups: &[GroupKeys],
    method: ImputationMethod,
) -> Vec<Option<(f64, ImputationSource)>> {
    debug_assert_eq!(values.len(), groups.len());
    match method {
        ImputationMethod::GroupMean => group_mean(values, groups),
        ImputationMethod::ForwardBackwardFill => forward_backward_fill(values),
    }
}

fn group_mean(
    values: &[Option<f64>],
    groups: &[GroupKeys],
) -> Vec<Option<(f64, ImputationSource)>> {
    let mut primary: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut fallback: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut global = Accumulator::default();

    for (value, keys) in values.iter().zip(groups) {
        if let Some(v) = value {
            primary.entry(keys.primary.as_str()).or_default().push(*v);
            fallback.entry(keys.fallback.as_str()).or_default().push(*v);
            global.push(*v);
        }
    }

    values
        .iter()
        .zip(groups)
        .map(|(value, keys)| {
            if let Some(v) = value {
                return Some((*v, ImputationSource::Observed));
            }
            primary
                .get(keys.primary.as_str())
                .and_then(Accumulator::mean)
                .map(|m| (m, ImputationSource::GroupMean))
                .or_else(|| {
                    fallback
                        .get(keys.fallback.as_str())
                        .and_then(Accumulator::mean)
                        .map(|m| (m, ImputationSource::FallbackGroupMean))
                })
                .or_else(|| global.mean().map(|m| (m, ImputationSource::GlobalMean)))
        })
        .collect()
}

fn forward_backward_fill(values: &[Option<f64>]) -> Vec<Option<(f64, ImputationSource)>> {
    let mut out: Vec<Option<(f64, ImputationSource)>> = Vec::with_capacity(values.len());
    let mut last: Option<f64> = None;
    for value in values {
        match value {
            Some(v) => {
                last = Some(*v);
                out.push(Some((*v, ImputationSource::Observed)));
            }
            None => out.push(last.map(|v| (v, ImputationSource::ForwardFill))),
        }
    }

    // only a leading run can still be empty
    if let Some(first) = values.iter().flatten().next() {
        for slot in out.iter_mut().take_while(|slot| slot.is_none()) {
            *slot = Some((*first, ImputationSource::BackwardFill));
        }
    }
    out
}
