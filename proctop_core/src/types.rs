//! Report data model. Serialized as-is into the report log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Opaque process identifier, rendered and serialized as `<node.id.serial>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pid {
    pub node: u32,
    pub id: u32,
    pub serial: u32,
}

impl Pid {
    pub const fn new(node: u32, id: u32, serial: u32) -> Self {
        Self { node, id, serial }
    }

    /// A pid on the local node (`<0.id.0>`).
    pub const fn local(id: u32) -> Self {
        Self::new(0, id, 0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}.{}.{}>", self.node, self.id, self.serial)
    }
}

impl FromStr for Pid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix('<')
            .and_then(|r| r.strip_suffix('>'))
            .ok_or_else(|| format!("malformed pid {s:?}"))?;
        let mut parts = inner.split('.').map(str::parse::<u32>);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(node)), Some(Ok(id)), Some(Ok(serial)), None) => Ok(Pid::new(node, id, serial)),
            _ => Err(format!("malformed pid {s:?}")),
        }
    }
}

impl TryFrom<String> for Pid {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pid> for String {
    fn from(p: Pid) -> Self {
        p.to_string()
    }
}

/// A function reference: `module:function/arity`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mfa {
    pub module: String,
    pub function: String,
    pub arity: u8,
}

impl Mfa {
    pub fn new(module: impl Into<String>, function: impl Into<String>, arity: u8) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            arity,
        }
    }
}

impl fmt::Display for Mfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.module, self.function, self.arity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Runnable,
    Waiting,
    Suspended,
    GarbageCollecting,
    Exiting,
    #[default]
    Unknown,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Runnable => "runnable",
            ProcessStatus::Waiting => "waiting",
            ProcessStatus::Suspended => "suspended",
            ProcessStatus::GarbageCollecting => "garbage_collecting",
            ProcessStatus::Exiting => "exiting",
            ProcessStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-process record as fetched in one collection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub pid: Pid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_name: Option<String>,
    // fallback used when the process dictionary carries no initial call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_call: Option<Mfa>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_initial_call: Option<Mfa>,
    pub reductions: u64,
    pub memory: u64,
    pub message_queue_len: u64,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_function: Option<Mfa>,
}

impl RawMetrics {
    /// Bare record with zeroed counters; handy for providers that fill fields incrementally.
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            registered_name: None,
            initial_call: None,
            dictionary_initial_call: None,
            reductions: 0,
            memory: 0,
            message_queue_len: 0,
            status: ProcessStatus::Unknown,
            current_function: None,
        }
    }

    /// Registered name if present, otherwise the best known initial call.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.registered_name {
            return name.clone();
        }
        self.dictionary_initial_call
            .as_ref()
            .or(self.initial_call.as_ref())
            .map(|mfa| mfa.to_string())
            .unwrap_or_else(|| "-".into())
    }
}

/// RawMetrics enriched with the per-pass delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(flatten)]
    pub metrics: RawMetrics,
    pub reduction_delta: u64,
    // already rounded to 2 decimals
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryBreakdown {
    pub total: u64,
    pub processes: u64,
    pub processes_used: u64,
    pub system: u64,
    pub atom: u64,
    pub atom_used: u64,
    pub binary: u64,
    pub code: u64,
    pub ets: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub node: String,
    pub timestamp: DateTime<Local>,
    // None when the runtime cannot report scheduler utilization
    pub cpu_load: Option<f64>,
    pub process_count: u64,
    pub run_queue: u64,
    /// Runtime-wide reductions since the previous pass.
    pub reductions_delta: u64,
    pub memory: MemoryBreakdown,
}

/// One collection tick: system summary plus samples in collection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub system: SystemSnapshot,
    pub samples: Vec<Sample>,
}
