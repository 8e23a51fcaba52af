//! One collection pass: enumerate, fetch, drop what vanished.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::warn;

use crate::error::ProviderError;
use crate::provider::{MetricsProvider, RuntimeCounters};
use crate::types::RawMetrics;

/// Raw output of a pass, before deltas are applied.
#[derive(Debug, Clone)]
pub struct Collection {
    pub timestamp: DateTime<Local>,
    pub counters: RuntimeCounters,
    pub processes: Vec<RawMetrics>,
    /// Processes that disappeared between enumeration and fetch.
    pub dropped: usize,
}

#[derive(Clone)]
pub struct Sampler {
    provider: Arc<dyn MetricsProvider>,
}

impl Sampler {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self { provider }
    }

    pub fn collect(&self) -> Collection {
        let pids = self.provider.processes();
        let results: Vec<Result<RawMetrics, ProviderError>> =
            pids.into_iter().map(|pid| self.provider.metrics(pid)).collect();

        let mut processes = Vec::with_capacity(results.len());
        let mut dropped = 0;
        for r in results {
            match r {
                Ok(m) => processes.push(m),
                Err(e) => {
                    warn!(error = %e, "dropping process from sample");
                    dropped += 1;
                }
            }
        }

        let counters = self.provider.counters();
        Collection {
            timestamp: Local::now(),
            counters,
            processes,
            dropped,
        }
    }
}
