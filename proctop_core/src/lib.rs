//! proctop_core: sampling, delta, ranking, rendering and persistence for a
//! lightweight-process monitor, plus the controller that drives them.

pub mod config;
pub mod controller;
pub mod delta;
pub mod error;
pub mod output;
pub mod persist;
pub mod provider;
pub mod rank;
pub mod render;
pub mod report;
pub mod sampler;
pub mod types;

pub use config::{Config, OptionsUpdate, OutputFormat};
pub use controller::{Controller, Counters, DetailedStatus, Lifecycle, Status, Transition};
pub use error::{Error, ProviderError, Result};
pub use output::{print, OutputTarget};
pub use provider::{MetricsProvider, RuntimeCounters};
pub use rank::{rank, SortField};
pub use render::{render, RenderOptions};
pub use report::top;
pub use types::{MemoryBreakdown, Mfa, Pid, ProcessStatus, RawMetrics, Report, Sample, SystemSnapshot};
