//! Monitor configuration and validated partial updates.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::output::OutputTarget;
use crate::rank::SortField;
use crate::render::RenderOptions;

pub const DEFAULT_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Structured,
}

impl OutputFormat {
    /// `.jsonl` / `.ndjson` files hold the structured log, anything else text.
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                OutputFormat::Structured
            }
            _ => OutputFormat::Text,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "structured" => Ok(OutputFormat::Structured),
            _ => Err(Error::InvalidOption {
                key: "format",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub interval_ms: u64,
    // first tick delay; falls back to interval_ms
    pub first_interval_ms: Option<u64>,
    pub sort: Option<SortField>,
    pub human: bool,
    pub file: Option<PathBuf>,
    pub format: OutputFormat,
    pub debug: bool,
    pub length: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            first_interval_ms: None,
            sort: Some(SortField::RedsDiff),
            human: false,
            file: None,
            format: OutputFormat::Text,
            debug: false,
            length: None,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn first_interval(&self) -> Duration {
        Duration::from_millis(self.first_interval_ms.unwrap_or(self.interval_ms))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            sort: self.sort,
            human: self.human,
            length: self.length,
        }
    }

    pub fn target(&self) -> OutputTarget {
        match &self.file {
            Some(p) => OutputTarget::File(p.clone()),
            None => OutputTarget::Stdout,
        }
    }

    /// Validated copy of `self` with `update` applied; `self` is never touched.
    pub fn apply(&self, update: &OptionsUpdate) -> Result<Config> {
        let mut next = self.clone();
        if let Some(ms) = update.interval_ms {
            next.interval_ms = ms;
        }
        if let Some(ms) = update.first_interval_ms {
            next.first_interval_ms = Some(ms);
        }
        if let Some(sort) = update.sort {
            next.sort = Some(sort);
        }
        if let Some(h) = update.human {
            next.human = h;
        }
        if let Some(d) = update.debug {
            next.debug = d;
        }
        if let Some(n) = update.length {
            next.length = Some(n);
        }
        if let Some(file) = &update.file {
            next.format = file.as_deref().map(OutputFormat::infer).unwrap_or_default();
            next.file = file.clone();
        }
        if let Some(format) = update.format {
            next.format = format;
        }
        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> Result<()> {
        positive("interval", self.interval_ms)?;
        if let Some(ms) = self.first_interval_ms {
            positive("first_interval", ms)?;
        }
        if let Some(n) = self.length {
            positive("length", n as u64)?;
        }
        if self.format == OutputFormat::Structured && self.file.is_none() {
            return Err(Error::InvalidOption {
                key: "format",
                value: "structured (requires file)".into(),
            });
        }
        Ok(())
    }
}

fn positive(key: &'static str, v: u64) -> Result<u64> {
    if v == 0 {
        return Err(Error::InvalidOption {
            key,
            value: v.to_string(),
        });
    }
    Ok(v)
}

/// A partial configuration change. Unset fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsUpdate {
    pub sort: Option<SortField>,
    /// `Some(None)` switches output back to stdout.
    pub file: Option<Option<PathBuf>>,
    pub format: Option<OutputFormat>,
    pub interval_ms: Option<u64>,
    pub first_interval_ms: Option<u64>,
    pub human: Option<bool>,
    pub debug: Option<bool>,
    pub length: Option<usize>,
}

impl OptionsUpdate {
    /// Build an update from `key`/`value` strings; fails on the first bad pair.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut u = OptionsUpdate::default();
        for (k, v) in pairs {
            u.set(k.as_ref(), v.as_ref())?;
        }
        Ok(u)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "sort" => self.sort = Some(value.parse()?),
            "file" => {
                self.file = Some(match value.trim() {
                    "" | "-" => None,
                    p => Some(PathBuf::from(p)),
                })
            }
            "format" => self.format = Some(value.parse()?),
            "interval" => self.interval_ms = Some(parse_num("interval", value)?),
            "first_interval" => self.first_interval_ms = Some(parse_num("first_interval", value)?),
            "human" => self.human = Some(parse_bool("human", value)?),
            "debug" => self.debug = Some(parse_bool("debug", value)?),
            "length" => self.length = Some(parse_num("length", value)?),
            other => return Err(Error::UnknownOption(other.to_string())),
        }
        Ok(())
    }
}

fn parse_num<T: FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::InvalidOption {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(Error::InvalidOption {
            key,
            value: value.to_string(),
        }),
    }
}
