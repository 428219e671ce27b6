//! Characterization table
//!
//! Each row describes one instrument setting (chopper frequency and centre
//! wavelength) and the runs and limits to reduce it with. A table is read
//! from a JSON array of row objects; every column is required, extra columns
//! are ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// Relative tolerance used when matching a measured setting to a row
pub const MATCH_TOLERANCE: f64 = 0.05;

/// Check whether two measurements agree
///
/// Equal values always agree; otherwise the difference relative to the mean
/// of the pair must be under [`MATCH_TOLERANCE`].
#[must_use]
#[allow(clippy::float_cmp)]
pub fn close_enough(left: f64, right: f64) -> bool {
    let diff = (left - right).abs();
    if diff == 0.0 {
        return true;
    }
    diff * 2.0 / (left + right) < MATCH_TOLERANCE
}

/// One instrument setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterizationRow {
    /// Chopper frequency in Hz
    pub frequency: f64,
    /// Centre wavelength in Angstrom
    pub wavelength: f64,
    /// Detector bank to focus
    pub bank: i32,
    /// Empty container run
    pub container: i32,
    /// Normalization run
    pub vanadium: i32,
    /// Normalization background run
    pub empty: i32,
    /// Comma-separated lower d-spacing limits
    pub d_min: String,
    /// Comma-separated upper d-spacing limits
    pub d_max: String,
    /// Lower time-of-flight limit in microseconds
    pub tof_min: f64,
    /// Upper time-of-flight limit in microseconds
    pub tof_max: f64,
}

/// Ordered rows; the first match wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterizationTable {
    rows: Vec<CharacterizationRow>,
}

impl CharacterizationTable {
    /// Create table from rows
    #[must_use]
    pub fn new(rows: Vec<CharacterizationRow>) -> Self {
        Self { rows }
    }

    /// Parse a JSON array of rows
    ///
    /// # Errors
    /// `Json` for malformed input or a missing column
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON table file
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
    pub fn rows(&self) -> &[CharacterizationRow] {
        &self.rows
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row whose frequency and wavelength both agree with the
    /// measurement, with its index
    #[must_use]
    pub fn find_row(&self, frequency: f64, wavelength: f64) -> Option<(usize, &CharacterizationRow)> {
        self.rows.iter().enumerate().find(|(_, row)| {
            close_enough(frequency, row.frequency) && close_enough(wavelength, row.wavelength)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(frequency: f64, wavelength: f64, bank: i32) -> CharacterizationRow {
        CharacterizationRow {
            frequency,
            wavelength,
            bank,
            container: 0,
            vanadium: 0,
            empty: 0,
            d_min: String::new(),
            d_max: String::new(),
            tof_min: 0.0,
            tof_max: 0.0,
        }
    }

    #[test]
    fn close_enough_tolerance() {
        assert!(close_enough(60.0, 60.0));
        assert!(close_enough(0.0, 0.0));
        assert!(close_enough(60.0, 61.0));
        assert!(close_enough(1.5, 1.533));
        assert!(!close_enough(60.0, 30.0));
        assert!(!close_enough(0.0, 1.0));
    }

    #[test]
    fn first_matching_row_wins() {
        let table = CharacterizationTable::new(vec![
            row(30.0, 1.5, 1),
            row(60.0, 0.533, 2),
            row(60.0, 0.54, 3),
        ]);
        let (index, found) = table.find_row(59.5, 0.535).unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.bank, 2);
        assert!(table.find_row(10.0, 0.5).is_none());
    }

    #[test]
    fn parses_json_rows() {
        let table = CharacterizationTable::from_json_str(
            r#"[{"frequency": 60.0, "wavelength": 0.533, "bank": 1,
                 "container": 17702, "vanadium": 17712, "empty": 0,
                 "d_min": "0.05,0.1", "d_max": "2.2,3.0",
                 "tof_min": 0.0, "tof_max": 16666.67, "comment": "extra"}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].container, 17702);
        assert_eq!(table.rows()[0].d_max, "2.2,3.0");
    }

    #[test]
    fn missing_column_is_rejected() {
        let err = CharacterizationTable::from_json_str(r#"[{"frequency": 60.0}]"#).unwrap_err();
        assert!(matches!(err, WorkflowError::Json(_)));
    }

    #[test]
    fn d_spacing_columns_are_required() {
        let row = r#"{"frequency": 60.0, "wavelength": 0.533, "bank": 1,
            "container": 0, "vanadium": 0, "empty": 0,
            "d_max": "2.2", "tof_min": 2000.0, "tof_max": 16666.67}"#;
        let err = CharacterizationTable::from_json_str(&format!("[{row}]")).unwrap_err();
        assert!(matches!(err, WorkflowError::Json(_)));
        assert!(err.to_string().contains("d_min"));

        let complete = row.replace(r#""d_max""#, r#""d_min": "0.1", "d_max""#);
        let table = CharacterizationTable::from_json_str(&format!("[{complete}]")).unwrap();
        assert_eq!(table.len(), 1);
    }
}
