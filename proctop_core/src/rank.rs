//! Ordering of samples for display.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortField {
    Memory,
    MsgQ,
    Reds,
    #[default]
    RedsDiff,
    Status,
    Fun,
    Name,
    Percent,
    Pid,
}

impl SortField {
    pub const ALL: [SortField; 9] = [
        SortField::Memory,
        SortField::MsgQ,
        SortField::Reds,
        SortField::RedsDiff,
        SortField::Status,
        SortField::Fun,
        SortField::Name,
        SortField::Percent,
        SortField::Pid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Memory => "memory",
            SortField::MsgQ => "msgq",
            SortField::Reds => "reds",
            SortField::RedsDiff => "reds_diff",
            SortField::Status => "status",
            SortField::Fun => "fun",
            SortField::Name => "name",
            SortField::Percent => "percent",
            SortField::Pid => "pid",
        }
    }

    fn compare(&self, a: &Sample, b: &Sample) -> Ordering {
        let (x, y) = (&a.metrics, &b.metrics);
        match self {
            SortField::Memory => x.memory.cmp(&y.memory),
            SortField::MsgQ => x.message_queue_len.cmp(&y.message_queue_len),
            SortField::Reds => x.reductions.cmp(&y.reductions),
            SortField::RedsDiff => a.reduction_delta.cmp(&b.reduction_delta),
            SortField::Status => x.status.as_str().cmp(y.status.as_str()),
            SortField::Fun => fun_key(a).cmp(&fun_key(b)),
            SortField::Name => x.display_name().cmp(&y.display_name()),
            SortField::Percent => a.percent.total_cmp(&b.percent),
            SortField::Pid => x.pid.cmp(&y.pid),
        }
    }
}

fn fun_key(s: &Sample) -> String {
    s.metrics
        .current_function
        .as_ref()
        .map(|f| f.to_string())
        .unwrap_or_default()
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| Error::InvalidSortField(s.to_string()))
    }
}

impl TryFrom<String> for SortField {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SortField> for String {
    fn from(f: SortField) -> Self {
        f.as_str().to_string()
    }
}

/// Stable descending sort by `field`, ties broken by `reduction_delta`.
/// `None` keeps collection order.
pub fn rank(samples: &[Sample], field: Option<SortField>) -> Vec<Sample> {
    let mut out = samples.to_vec();
    if let Some(field) = field {
        out.sort_by(|a, b| {
            field
                .compare(b, a)
                .then_with(|| b.reduction_delta.cmp(&a.reduction_delta))
        });
    }
    out
}

/// Like [`rank`] but takes the public field name; unknown names fail up front.
pub fn rank_by_name(samples: &[Sample], field: Option<&str>) -> Result<Vec<Sample>> {
    let field = field.map(str::parse::<SortField>).transpose()?;
    Ok(rank(samples, field))
}
