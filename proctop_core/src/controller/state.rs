//! Controller state: lifecycle, config, cache and counters. Owned by the actor task.

use serde::Serialize;

use crate::config::Config;
use crate::delta::PreviousSample;
use crate::persist::ReportLog;
use crate::types::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Outcome of a lifecycle command. The `Already*` variants are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Started,
    Paused,
    Stopped,
    AlreadyActive,
    AlreadyHalted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counters {
    pub ticks: u64,
    /// Ticks that arrived while a pass was still running.
    pub skipped_ticks: u64,
    pub passes: u64,
    pub dropped_processes: u64,
    pub write_failures: u64,
    pub cached_processes: usize,
    pub in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub state: Lifecycle,
    pub config: Config,
    pub last_report: Option<Report>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedStatus {
    #[serde(flatten)]
    pub status: Status,
    pub counters: Counters,
}

#[derive(Debug, Default)]
pub(crate) struct ControllerState {
    pub lifecycle: Lifecycle,
    pub config: Config,
    pub previous: PreviousSample,
    pub last_report: Option<Report>,
    // structured log written to at least once
    pub active_log: Option<ReportLog>,
    pub in_flight: bool,
    // bumped by stop(); passes from an older epoch leave the cache alone
    pub epoch: u64,

    pub ticks: u64,
    pub skipped_ticks: u64,
    pub passes: u64,
    pub dropped_processes: u64,
    pub write_failures: u64,
}

impl ControllerState {
    pub fn status(&self) -> Status {
        Status {
            state: self.lifecycle,
            config: self.config.clone(),
            last_report: self.last_report.clone(),
        }
    }

    pub fn counters(&self) -> Counters {
        Counters {
            ticks: self.ticks,
            skipped_ticks: self.skipped_ticks,
            passes: self.passes,
            dropped_processes: self.dropped_processes,
            write_failures: self.write_failures,
            cached_processes: self.previous.len(),
            in_flight: self.in_flight,
        }
    }
}
