//! Determine the characterizations of a run
//!
//! Fills a shared reduction manager with the instrument setting and the
//! runs to reduce it with. The manager is looked up by name in the data
//! service, created when absent, and left registered so later steps of the
//! reduction read the same values.
//!
//! Order of work:
//! 1. ensure every reduction property exists (missing ones get defaults)
//! 2. when a non-empty table is given, read frequency and wavelength from the
//!    run logs and copy the first agreeing row
//! 3. apply the run-number overrides from the inputs

use std::sync::Arc;

use propkit_core::{
    ArrayProperty, MandatoryValidator, Property, PropertyManager, PropertyWithValue,
};
use propkit_service::{PropertyManagerDataService, SharedPropertyManager};

use crate::error::{Result, WorkflowError};
use crate::logs::{LogQuantity, RunLogs};
use crate::table::{CharacterizationRow, CharacterizationTable};

/// Input naming the shared reduction manager
pub const REDUCTION_PROPERTIES: &str = "ReductionProperties";
/// Default registry name of the reduction manager
pub const DEFAULT_MANAGER_NAME: &str = "__pd_reduction_properties";
/// Input listing candidate frequency logs
pub const FREQUENCY_LOG_NAMES: &str = "FrequencyLogNames";
/// Input listing candidate wavelength logs
pub const WAVELENGTH_LOG_NAMES: &str = "WaveLengthLogNames";

/// Run-number inputs and the reduction property each overrides
pub const RUN_OVERRIDES: [(&str, &str); 3] = [
    ("BackRun", "container"),
    ("NormRun", "vanadium"),
    ("NormBackRun", "empty"),
];

/// Reduction properties, in the order they are reported
pub const REDUCTION_KEYS: [&str; 10] = [
    "frequency",
    "wavelength",
    "bank",
    "container",
    "vanadium",
    "empty",
    "d_min",
    "d_max",
    "tof_min",
    "tof_max",
];

const RUN_DOC: &str = " run to use. 0 to use value in table, -1 to not use.";

/// Map a run-number input to the value to store
///
/// Zero keeps whatever is already stored; negative numbers clear the run.
#[inline]
#[must_use]
pub fn override_run_number(input: i32) -> Option<i32> {
    (input != 0).then(|| input.max(0))
}

/// Characterization workflow with its own declared inputs
#[derive(Debug, Clone)]
pub struct DetermineCharacterizations {
    inputs: PropertyManager,
}

impl Default for DetermineCharacterizations {
    fn default() -> Self {
        Self::new()
    }
}

impl DetermineCharacterizations {
    /// Workflow name for identification
    pub const NAME: &'static str = "PDDetermineCharacterizations";
    /// Workflow version
    pub const VERSION: u32 = 2;

    /// Create the workflow with every input at its default
    #[must_use]
    pub fn new() -> Self {
        Self {
            inputs: Self::declare_inputs(),
        }
    }

    fn declare_inputs() -> PropertyManager {
        let declared: [Box<dyn Property>; 6] = [
            Box::new(
                PropertyWithValue::new(REDUCTION_PROPERTIES, DEFAULT_MANAGER_NAME.to_string())
                    .with_validator(Arc::new(MandatoryValidator))
                    .with_documentation("Property manager name for the reduction"),
            ),
            Box::new(
                PropertyWithValue::new("BackRun", 0)
                    .with_documentation(format!("Empty container{RUN_DOC}")),
            ),
            Box::new(
                PropertyWithValue::new("NormRun", 0)
                    .with_documentation(format!("Normalization{RUN_DOC}")),
            ),
            Box::new(
                PropertyWithValue::new("NormBackRun", 0)
                    .with_documentation(format!("Normalization background{RUN_DOC}")),
            ),
            Box::new(
                ArrayProperty::new(
                    FREQUENCY_LOG_NAMES,
                    vec![
                        "SpeedRequest1".to_string(),
                        "Speed1".to_string(),
                        "frequency".to_string(),
                    ],
                )
                .with_documentation("Candidate log names for frequency"),
            ),
            Box::new(
                ArrayProperty::new(
                    WAVELENGTH_LOG_NAMES,
                    vec!["LambdaRequest".to_string(), "lambda".to_string()],
                )
                .with_documentation("Candidate log names for wave length"),
            ),
        ];
        let mut inputs = PropertyManager::new();
        for property in declared {
            // Names above are distinct and non-empty
            if let Err(e) = inputs.declare_boxed(property) {
                tracing::error!("Failed to declare workflow input: {}", e);
            }
        }
        inputs
    }

    /// Declared inputs
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &PropertyManager {
        &self.inputs
    }

    /// Declared inputs, for assignment
    #[inline]
    pub fn inputs_mut(&mut self) -> &mut PropertyManager {
        &mut self.inputs
    }

    /// Run the workflow
    ///
    /// Returns the shared reduction manager, which stays registered in
    /// `service`. On error the manager is restored to its prior contents,
    /// and one created by this run is unregistered again.
    ///
    /// # Errors
    /// `InvalidInput` when an input fails its validator, `MissingRunLogs` for a
    /// non-empty table without logs, and property errors when an existing
    /// reduction property has an incompatible kind or a matched row holds a
    /// value it refuses
    pub fn execute(
        &self,
        service: &PropertyManagerDataService,
        table: Option<&CharacterizationTable>,
        logs: Option<&RunLogs>,
    ) -> Result<SharedPropertyManager> {
        if let Some((name, message)) = self.inputs.validation_errors().into_iter().next() {
            return Err(WorkflowError::InvalidInput { name, message });
        }
        let table = table.filter(|t| !t.is_empty());
        if table.is_some() && logs.is_none() {
            return Err(WorkflowError::MissingRunLogs);
        }

        let manager_name = self.inputs.get_property_value(REDUCTION_PROPERTIES)?;
        let mut created = false;
        let shared = service.retrieve_or_insert_with(&manager_name, || {
            created = true;
            PropertyManager::new()
        })?;

        let outcome = {
            let mut manager = shared.write();
            let snapshot = manager.clone();
            let outcome = self.fill(&mut manager, table, logs);
            if outcome.is_err() {
                *manager = snapshot;
            }
            outcome
        };
        if let Err(err) = outcome {
            if created {
                service.remove_if_same(&manager_name, &shared);
            }
            return Err(err);
        }
        Ok(shared)
    }

    fn fill(
        &self,
        manager: &mut PropertyManager,
        table: Option<&CharacterizationTable>,
        logs: Option<&RunLogs>,
    ) -> Result<()> {
        declare_defaults(manager)?;

        if let (Some(table), Some(logs)) = (table, logs) {
            let frequency = LogQuantity::Frequency
                .find(logs, &self.inputs.get_value::<Vec<String>>(FREQUENCY_LOG_NAMES)?);
            let wavelength = LogQuantity::Wavelength
                .find(logs, &self.inputs.get_value::<Vec<String>>(WAVELENGTH_LOG_NAMES)?);
            match table.find_row(frequency, wavelength) {
                Some((index, row)) => {
                    tracing::info!(
                        "Using information from row {} with frequency = {} and wavelength = {}",
                        index,
                        row.frequency,
                        row.wavelength
                    );
                    apply_row(manager, frequency, wavelength, row)?;
                }
                None => {
                    tracing::warn!("Failed to find compatible row in characterizations table");
                }
            }
        }

        for (input, target) in RUN_OVERRIDES {
            if let Some(run) = override_run_number(self.inputs.get_value::<i32>(input)?) {
                tracing::debug!("Overriding {} with {} = {}", target, input, run);
                manager.set_property(target, run)?;
            }
        }

        for key in REDUCTION_KEYS {
            match manager.get_property_value(key) {
                Ok(value) => tracing::debug!("{}: {}", key, value),
                Err(_) => tracing::warn!("{} does not exist", key),
            }
        }
        Ok(())
    }
}

/// Declare any reduction property the manager does not have yet
///
/// Existing properties keep their values and kinds.
///
/// # Errors
/// Only on a declaration failure, which an absent name cannot cause
pub fn declare_defaults(manager: &mut PropertyManager) -> Result<()> {
    let defaults: [Box<dyn Property>; 10] = [
        Box::new(PropertyWithValue::new("frequency", 0.0)),
        Box::new(PropertyWithValue::new("wavelength", 0.0)),
        Box::new(PropertyWithValue::new("bank", 1)),
        Box::new(PropertyWithValue::new("vanadium", 0)),
        Box::new(PropertyWithValue::new("container", 0)),
        Box::new(PropertyWithValue::new("empty", 0)),
        Box::new(ArrayProperty::<f64>::new("d_min", Vec::new())),
        Box::new(ArrayProperty::<f64>::new("d_max", Vec::new())),
        Box::new(PropertyWithValue::new("tof_min", 0.0)),
        Box::new(PropertyWithValue::new("tof_max", 0.0)),
    ];
    for property in defaults {
        if !manager.exists_property(property.name()) {
            manager.declare_boxed(property)?;
        }
    }
    Ok(())
}

/// Copy a matched row; frequency and wavelength come from the measurement
fn apply_row(
    manager: &mut PropertyManager,
    frequency: f64,
    wavelength: f64,
    row: &CharacterizationRow,
) -> Result<()> {
    manager.set_property("frequency", frequency)?;
    manager.set_property("wavelength", wavelength)?;
    manager.set_property("bank", row.bank)?;
    manager.set_property("vanadium", row.vanadium)?;
    manager.set_property("container", row.container)?;
    manager.set_property("empty", row.empty)?;
    manager.set_property_value("d_min", &row.d_min)?;
    manager.set_property_value("d_max", &row.d_max)?;
    manager.set_property("tof_min", row.tof_min)?;
    manager.set_property("tof_max", row.tof_max)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_number_policy() {
        assert_eq!(override_run_number(0), None);
        assert_eq!(override_run_number(-1), Some(0));
        assert_eq!(override_run_number(-5), Some(0));
        assert_eq!(override_run_number(17702), Some(17702));
    }

    #[test]
    fn inputs_have_defaults() {
        let workflow = DetermineCharacterizations::new();
        let inputs = workflow.inputs();
        assert_eq!(
            inputs.get_property_value(REDUCTION_PROPERTIES).unwrap(),
            DEFAULT_MANAGER_NAME
        );
        assert_eq!(
            inputs.get_property_value(FREQUENCY_LOG_NAMES).unwrap(),
            "SpeedRequest1,Speed1,frequency"
        );
        assert_eq!(
            inputs.get_property_value(WAVELENGTH_LOG_NAMES).unwrap(),
            "LambdaRequest,lambda"
        );
        for (input, _) in RUN_OVERRIDES {
            assert_eq!(inputs.get_value::<i32>(input).unwrap(), 0);
        }
    }

    #[test]
    fn defaults_fill_only_missing() {
        let mut manager = PropertyManager::new();
        manager.declare_value("bank", 4, "").unwrap();
        declare_defaults(&mut manager).unwrap();
        assert_eq!(manager.property_count(), REDUCTION_KEYS.len());
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 4);
        assert_eq!(manager.get_value::<f64>("tof_max").unwrap(), 0.0);
        assert!(manager.get_value::<Vec<f64>>("d_min").unwrap().is_empty());
    }

    #[test]
    fn blank_manager_name_is_rejected() {
        let mut workflow = DetermineCharacterizations::new();
        let err = workflow
            .inputs_mut()
            .set_property(REDUCTION_PROPERTIES, String::new())
            .unwrap_err();
        assert!(matches!(err, propkit_core::PropertyError::Validation { .. }));
        // Rejected on assignment, so the default name is still in place
        let service = PropertyManagerDataService::new();
        workflow.execute(&service, None, None).unwrap();
        assert!(service.does_exist(DEFAULT_MANAGER_NAME));
    }

    #[test]
    fn table_without_logs_is_rejected() {
        let table = CharacterizationTable::new(vec![CharacterizationRow {
            frequency: 60.0,
            wavelength: 0.533,
            bank: 1,
            container: 0,
            vanadium: 0,
            empty: 0,
            d_min: String::new(),
            d_max: String::new(),
            tof_min: 0.0,
            tof_max: 0.0,
        }]);
        let service = PropertyManagerDataService::new();
        let err = DetermineCharacterizations::new()
            .execute(&service, Some(&table), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingRunLogs));
        assert_eq!(service.size(), 0);
    }
}
