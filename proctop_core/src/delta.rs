//! Reduction deltas between consecutive passes.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Pid, RawMetrics, Sample};

/// What the previous pass left behind. Replaced wholesale after every pass.
#[derive(Debug, Clone, Default)]
pub struct PreviousSample {
    pub total_reductions: Option<u64>,
    pub by_pid: HashMap<Pid, RawMetrics>,
}

impl PreviousSample {
    pub fn from_pass(total_reductions: u64, raw: &[RawMetrics]) -> Self {
        Self {
            total_reductions: Some(total_reductions),
            by_pid: raw.iter().map(|m| (m.pid, m.clone())).collect(),
        }
    }

    /// Runtime-wide delta; the full total when there is no usable baseline.
    pub fn total_delta(&self, current_total: u64) -> u64 {
        match self.total_reductions {
            Some(prev) if current_total >= prev => current_total - prev,
            _ => current_total,
        }
    }

    pub fn len(&self) -> usize {
        self.by_pid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pid.is_empty()
    }
}

#[derive(Debug, Error, PartialEq)]
enum DeltaError {
    #[error("duplicate pid {0} in one pass")]
    DuplicatePid(Pid),
    #[error("non-finite percent for {0}")]
    NonFinitePercent(Pid),
}

/// Attach `reduction_delta` and `percent` to every raw entry.
///
/// A counter that went backwards is treated as a reused pid: the delta is the
/// absolute count. Entries that cannot be enriched are logged and dropped.
pub fn enrich(
    raw: Vec<RawMetrics>,
    previous: &HashMap<Pid, RawMetrics>,
    total_delta: u64,
) -> Vec<Sample> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .map(|m| enrich_one(m, previous, total_delta, &mut seen))
        .filter_map(|r| match r {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "dropping entry from delta pass");
                None
            }
        })
        .collect()
}

fn enrich_one(
    m: RawMetrics,
    previous: &HashMap<Pid, RawMetrics>,
    total_delta: u64,
    seen: &mut HashSet<Pid>,
) -> Result<Sample, DeltaError> {
    if !seen.insert(m.pid) {
        return Err(DeltaError::DuplicatePid(m.pid));
    }
    let reduction_delta = match previous.get(&m.pid) {
        Some(prev) => m.reductions.checked_sub(prev.reductions).unwrap_or_else(|| {
            debug!(pid = %m.pid, prev = prev.reductions, now = m.reductions, "reductions went backwards");
            m.reductions
        }),
        None => m.reductions,
    };
    let percent = percent(reduction_delta, total_delta);
    if !percent.is_finite() {
        return Err(DeltaError::NonFinitePercent(m.pid));
    }
    Ok(Sample {
        percent,
        reduction_delta,
        metrics: m,
    })
}

/// `delta / total * 100`, rounded to 2 decimals; 0 when `total` is 0.
pub fn percent(delta: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = delta as f64 / total as f64 * 100.0;
    (p * 100.0).round() / 100.0
}
