//! The metrics capability the monitor samples from.
//!
//! Everything host specific (process registries, dictionaries, scheduler
//! statistics) lives behind [`MetricsProvider`]; the engine only sees the
//! fixed [`RawMetrics`] schema.

use crate::error::ProviderError;
use crate::types::{MemoryBreakdown, Pid, RawMetrics};

/// Runtime-wide aggregate counters captured once per pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuntimeCounters {
    pub node: String,
    pub cpu_load: Option<f64>,
    pub process_count: u64,
    pub run_queue: u64,
    /// Cumulative reductions across the whole runtime.
    pub total_reductions: u64,
    pub memory: MemoryBreakdown,
}

pub trait MetricsProvider: Send + Sync {
    /// Live process identifiers. Called first in every pass, so providers
    /// that cache host state may refresh it here.
    fn processes(&self) -> Vec<Pid>;

    /// Metrics for one process; fails if the process vanished meanwhile.
    fn metrics(&self, pid: Pid) -> Result<RawMetrics, ProviderError>;

    fn counters(&self) -> RuntimeCounters;
}
