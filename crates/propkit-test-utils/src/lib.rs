//! Testing utilities for the propkit workspace
//!
//! Shared fixtures: a populated reduction manager, a characterization table
//! and matching run logs (as JSON, the form the workflow and binary read),
//! and a registry config written to a temporary file.

#![allow(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use propkit_core::{BoundedValidator, ListValidator, PropertyManager, PropertyWithValue};
use propkit_service::{share, PropertyManagerDataService, SharedPropertyManager};
use tempfile::NamedTempFile;

pub const REDUCTION_MANAGER: &str = "__pd_reduction_properties";

/// Two POWGEN-like settings: 60 Hz at 0.533 A and 30 Hz at 1.066 A
pub const CHARACTERIZATION_TABLE_JSON: &str = r#"[
  {"frequency": 60.0, "wavelength": 0.533, "bank": 1,
   "container": 17702, "vanadium": 17712, "empty": 17711,
   "d_min": "0.05,0.1", "d_max": "2.2,3.0",
   "tof_min": 2000.0, "tof_max": 16666.67},
  {"frequency": 30.0, "wavelength": 1.066, "bank": 2,
   "container": 17703, "vanadium": 17713, "empty": 0,
   "d_min": "0.2", "d_max": "4.1",
   "tof_min": 4000.0, "tof_max": 33333.33}
]"#;

/// Logs of a 60 Hz run at 0.533 A
pub const RUN_LOGS_60HZ_JSON: &str = r#"{
  "SpeedRequest1": {"units": "Hz", "values": [60.0, 60.0]},
  "LambdaRequest": {"units": "Angstrom", "values": [0.533]}
}"#;

pub const REGISTRY_TOML: &str = r#"
[[managers]]
name = "__pd_reduction_properties"

[[managers.properties]]
name = "frequency"
kind = "double"
default = "0"
lower = 0.0
upper = 120.0

[[managers.properties]]
name = "bank"
kind = "int"
default = "1"
allowed = ["1", "2", "3"]

[[managers]]
name = "calibration"

[[managers.properties]]
name = "Instrument"
kind = "string"
default = "POWGEN"
mandatory = true
"#;

/// Manager with a bounded frequency, a listed bank and a free string
pub fn reduction_manager() -> PropertyManager {
    let mut manager = PropertyManager::new();
    manager
        .declare_property(
            PropertyWithValue::new("frequency", 60.0)
                .with_validator(Arc::new(BoundedValidator::between(0.0, 120.0))),
        )
        .unwrap();
    manager.declare_value("wavelength", 1.5, "").unwrap();
    manager
        .declare_property(
            PropertyWithValue::new("bank", 1).with_validator(Arc::new(ListValidator::new([1, 2, 3]))),
        )
        .unwrap();
    manager
        .declare_value("Instrument", "POWGEN".to_string(), "")
        .unwrap();
    manager
}

/// Fresh service with [`reduction_manager`] registered under
/// [`REDUCTION_MANAGER`]
pub fn service_with_reduction_manager() -> (PropertyManagerDataService, SharedPropertyManager) {
    let service = PropertyManagerDataService::new();
    let shared = share(reduction_manager());
    service.add(REDUCTION_MANAGER, Arc::clone(&shared)).unwrap();
    (service, shared)
}

/// Write `contents` to a temporary file that lives as long as the handle
pub fn temp_file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
