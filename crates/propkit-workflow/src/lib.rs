//! propkit workflow
//!
//! Characterization workflow for powder diffraction reductions. It shares
//! its results with later reduction steps through a named property manager
//! in the data service.
//!
//! # Core Concepts
//!
//! - [`DetermineCharacterizations`]: declares its inputs and fills the
//!   shared reduction manager
//! - [`CharacterizationTable`]: instrument settings and the runs to use
//! - [`RunLogs`]: logged frequency and wavelength of the sample run
//!
//! # Example
//!
//! ```rust
//! use propkit_service::PropertyManagerDataService;
//! use propkit_workflow::{DetermineCharacterizations, DEFAULT_MANAGER_NAME};
//!
//! let service = PropertyManagerDataService::new();
//! let mut workflow = DetermineCharacterizations::new();
//! workflow.inputs_mut().set_property_value("BackRun", "-1").unwrap();
//!
//! let shared = workflow.execute(&service, None, None).unwrap();
//! assert_eq!(shared.read().get_value::<i32>("container").unwrap(), 0);
//! assert!(service.does_exist(DEFAULT_MANAGER_NAME));
//! ```

#![warn(unreachable_pub)]

pub mod determine;
pub mod error;
pub mod logs;
pub mod table;

// Re-exports
pub use determine::{
    declare_defaults, override_run_number, DetermineCharacterizations, DEFAULT_MANAGER_NAME,
    FREQUENCY_LOG_NAMES, REDUCTION_KEYS, REDUCTION_PROPERTIES, RUN_OVERRIDES,
    WAVELENGTH_LOG_NAMES,
};
pub use error::{Result, WorkflowError};
pub use logs::{LogEntry, LogQuantity, RunLogs};
pub use table::{close_enough, CharacterizationRow, CharacterizationTable, MATCH_TOLERANCE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
