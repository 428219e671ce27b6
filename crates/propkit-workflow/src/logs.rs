//! Run logs
//!
//! Sample logs recorded with a run, keyed by log name. Each log carries its
//! units and the recorded samples; the workflow uses the sample mean.
//!
//! JSON form:
//!
//! ```json
//! { "SpeedRequest1": { "units": "Hz", "values": [60.0, 60.0] } }
//! ```

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// One recorded log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unit label, matched exactly against the accepted units
    #[serde(default)]
    pub units: String,
    /// Samples in recorded order
    #[serde(default)]
    pub values: Vec<f64>,
}

impl LogEntry {
    #[must_use]
    pub fn new(units: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            units: units.into(),
            values,
        }
    }

    /// Arithmetic mean of the samples, zero when there are none
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }
}

/// Logs of one run, in recorded order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLogs {
    logs: IndexMap<String, LogEntry>,
}

impl RunLogs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a log
    #[must_use]
    pub fn with_log(mut self, name: impl Into<String>, entry: LogEntry) -> Self {
        self.logs.insert(name.into(), entry);
        self
    }

    /// Parse a JSON object of logs
    ///
    /// # Errors
    /// `Json` for malformed input
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON log file
    ///
    /// # Errors
    /// `Io` when unreadable, otherwise as [`from_json_str`](Self::from_json_str)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| WorkflowError::io_error(path, e))?;
        Self::from_json_str(&text)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LogEntry> {
        self.logs.get(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// Instrument setting read from the logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogQuantity {
    /// Chopper frequency, in Hz
    Frequency,
    /// Centre wavelength, in Angstrom
    Wavelength,
}

impl LogQuantity {
    /// Units a log must carry to be trusted for this quantity
    #[must_use]
    pub const fn valid_units(self) -> &'static [&'static str] {
        match self {
            Self::Frequency => &["Hz"],
            Self::Wavelength => &["Angstrom", "A"],
        }
    }

    /// Mean of the first candidate log that exists, has known units and a
    /// non-zero mean
    ///
    /// Returns 0 when no candidate qualifies.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn find(self, logs: &RunLogs, candidates: &[String]) -> f64 {
        for name in candidates {
            let Some(entry) = logs.get(name) else {
                continue;
            };
            if !self.valid_units().contains(&entry.units.as_str()) {
                tracing::warn!(
                    "When looking at {} log encountered unknown units for {}: {}",
                    name,
                    self,
                    entry.units
                );
                continue;
            }
            let value = entry.mean();
            if value == 0.0 {
                tracing::info!("'{}' has a mean value of zero {}", name, entry.units);
                continue;
            }
            tracing::info!(
                "Found {} in log '{}' with mean value {} {}",
                self,
                name,
                value,
                entry.units
            );
            return value;
        }
        tracing::warn!("Failed to determine {}", self);
        0.0
    }
}

impl Display for LogQuantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Frequency => "frequency",
            Self::Wavelength => "wavelength",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(LogEntry::new("Hz", vec![59.0, 61.0]).mean(), 60.0);
        assert_eq!(LogEntry::new("Hz", Vec::new()).mean(), 0.0);
    }

    #[test]
    fn first_usable_candidate_wins() {
        let logs = RunLogs::new()
            .with_log("SpeedRequest1", LogEntry::new("Hz", vec![0.0]))
            .with_log("Speed1", LogEntry::new("rpm", vec![3600.0]))
            .with_log("frequency", LogEntry::new("Hz", vec![60.0]));
        let candidates = names(&["SpeedRequest1", "Speed1", "frequency"]);
        assert_eq!(LogQuantity::Frequency.find(&logs, &candidates), 60.0);
    }

    #[test]
    fn wavelength_accepts_short_units() {
        let logs = RunLogs::new().with_log("lambda", LogEntry::new("A", vec![1.5]));
        assert_eq!(
            LogQuantity::Wavelength.find(&logs, &names(&["LambdaRequest", "lambda"])),
            1.5
        );
    }

    #[test]
    fn nothing_usable_yields_zero() {
        let logs = RunLogs::new().with_log("frequency", LogEntry::new("", vec![60.0]));
        assert_eq!(LogQuantity::Frequency.find(&logs, &names(&["frequency"])), 0.0);
        assert_eq!(LogQuantity::Frequency.find(&RunLogs::new(), &[]), 0.0);
    }

    #[test]
    fn parses_json_logs() {
        let logs = RunLogs::from_json_str(
            r#"{"LambdaRequest": {"units": "Angstrom", "values": [0.533]}}"#,
        )
        .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs.get("LambdaRequest").unwrap().units, "Angstrom");
    }
}
