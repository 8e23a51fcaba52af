//! Error taxonomy shared by the engine and the controller.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Pid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid sort field: {0:?}")]
    InvalidSortField(String),

    #[error("invalid report log {}: {reason}", path.display())]
    InvalidFile { path: PathBuf, reason: String },

    #[error("unknown option: {0:?}")]
    UnknownOption(String),

    #[error("invalid value {value:?} for option {key}")]
    InvalidOption { key: &'static str, value: String },

    #[error("write to {target} failed: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("controller task has shut down")]
    ControllerGone,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure to fetch metrics for a single process. Always absorbed by the sampler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("process {0} is gone")]
    ProcessGone(Pid),

    #[error("metrics unavailable for {pid}: {reason}")]
    Unavailable { pid: Pid, reason: String },
}
