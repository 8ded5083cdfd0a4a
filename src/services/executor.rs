use std::collections::HashMap;

use thiserror::Error;

use crate::models::config_item::{ConfigItem, ItemKind, OutputDevice, Source, StatusCategory};
use crate::models::device::is_unbound;
use crate::models::value::{Value, WriteValue};
use crate::services::backend::{BackendError, Backends};
use crate::services::modifier::{apply_modifiers, parse_value};
use crate::services::precondition::{self, PreconditionContext, PreconditionError};
use crate::state::results::ResultMap;

/// Status text for preconditions that did not hold.
pub const NOT_SATISFIED: &str = "not satisfied";

/// Status text for a failed device write.
pub const EXECUTION_ERROR: &str = "ExecutionError";

/// Status text for a dangling config reference.
pub const REFERENCE_NOT_FOUND: &str = "Config reference not found";

/// Errors raised by the execution layer.
///
/// `ReferenceNotFound` is an item failure; the others stop the loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Config reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Unknown config file index {0}")]
    UnknownConfigFile(usize),

    #[error("Unknown config item {0}")]
    UnknownConfigItem(String),
}

impl From<PreconditionError> for ExecutionError {
    fn from(err: PreconditionError) -> Self {
        match err {
            PreconditionError::ReferenceNotFound(reference) => ExecutionError::ReferenceNotFound(reference),
        }
    }
}

/// Current values of all items, keyed by GUID.
pub type ValueLookup = HashMap<String, String>;

/// Lookup capability handed to the precondition evaluator.
pub struct ItemContext<'a> {
    pub values: &'a ValueLookup,
    pub backends: &'a Backends,
}

impl PreconditionContext for ItemContext<'_> {
    fn config_value(&self, guid: &str) -> Option<String> {
        self.values.get(guid).cloned()
    }

    fn variable(&self, name: &str) -> Value {
        self.backends.variables.get(name)
    }

    fn pin_state(&self, serial: &str, pin: &str) -> Option<bool> {
        self.backends.devices.pin_state(serial, pin)
    }
}

/// Runs one output item for one tick.
#[derive(Clone)]
pub struct ItemExecutor {
    backends: Backends,
}

impl ItemExecutor {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Evaluate `item` and publish a clone of it into `results`.
    ///
    /// Per item problems end up in the item's status map. Only a dangling config
    /// reference in a precondition is returned as an error, after the item was published.
    pub fn execute(
        &self,
        item: &mut ConfigItem,
        values: &ValueLookup,
        results: &ResultMap,
    ) -> Result<(), ExecutionError> {
        if !item.active {
            return Ok(());
        }

        let ItemKind::Output(output) = &item.kind else {
            return Ok(());
        };
        let source = output.source.clone();
        let device = output.device.clone();

        if let Some(source) = &source {
            if !self.backends.is_connected(source.kind) {
                item.set_status(StatusCategory::Source, source.kind.not_available_status());
                results.insert(item.clone());
                return Ok(());
            }
            item.clear_status(StatusCategory::Source);
        }

        let context = ItemContext {
            values,
            backends: &self.backends,
        };
        let satisfied = match precondition::evaluate(&item.preconditions, &context) {
            Ok(satisfied) => satisfied,
            Err(err) => {
                item.set_status(StatusCategory::Precondition, REFERENCE_NOT_FOUND);
                results.insert(item.clone());
                return Err(err.into());
            }
        };

        if satisfied || item.preconditions.execute_on_false {
            item.clear_status(StatusCategory::Precondition);
        }

        let value = if satisfied {
            let raw = match &source {
                Some(source) => match self.read(source) {
                    Ok(raw) => raw,
                    Err(err) => {
                        item.set_status(StatusCategory::Source, err.to_string());
                        results.insert(item.clone());
                        return Ok(());
                    }
                },
                None => Value::default(),
            };
            item.raw_value = raw.to_string();

            match apply_modifiers(&item.modifiers, raw) {
                Ok(value) => value,
                Err(err) => {
                    item.set_status(StatusCategory::Modifier, err.to_string());
                    results.insert(item.clone());
                    return Ok(());
                }
            }
        } else if item.preconditions.execute_on_false {
            text_to_value(&item.preconditions.false_case_value)
        } else {
            item.set_status(StatusCategory::Precondition, NOT_SATISFIED);
            results.insert(item.clone());
            return Ok(());
        };

        item.value = value.to_string();

        if let Err(err) = self.write(&item.device_ref, &device, &value) {
            tracing::error!("Error executing \"{}\": {}", item.name, err);
            item.set_status(StatusCategory::Device, EXECUTION_ERROR);
            results.insert(item.clone());
            return Ok(());
        }

        item.status.clear();
        results.insert(item.clone());
        Ok(())
    }

    fn read(&self, source: &Source) -> Result<Value, BackendError> {
        let backend = self
            .backends
            .simulator(source.kind)
            .ok_or(BackendError::Unregistered(source.kind))?;
        backend.read_value(source)
    }

    fn write(&self, device_ref: &str, device: &OutputDevice, value: &Value) -> Result<(), BackendError> {
        if matches!(device, OutputDevice::None) || is_unbound(device_ref) {
            return Ok(());
        }
        let value = to_write_value(device, value);
        self.backends.devices.write(device_ref, device, &value)
    }

    /// Drive the item's device with its test pattern.
    pub fn execute_test_on(&self, item: &ConfigItem) -> Result<(), BackendError> {
        let ItemKind::Output(output) = &item.kind else {
            return Ok(());
        };
        let value = match &output.device {
            OutputDevice::None => return Ok(()),
            OutputDevice::Output { .. } => WriteValue::Integer(255),
            OutputDevice::Servo { test_value, .. } | OutputDevice::Stepper { test_value, .. } => {
                WriteValue::Integer(*test_value)
            }
            OutputDevice::LedDisplay { digits, .. } => WriteValue::Text("8".repeat(*digits as usize)),
            OutputDevice::Custom { test_value, .. } => WriteValue::Text(test_value.clone()),
        };
        self.write_test(item, &output.device, value)
    }

    /// Return the item's device to its idle state.
    pub fn execute_test_off(&self, item: &ConfigItem) -> Result<(), BackendError> {
        let ItemKind::Output(output) = &item.kind else {
            return Ok(());
        };
        let value = match &output.device {
            OutputDevice::None => return Ok(()),
            OutputDevice::Output { .. } | OutputDevice::Servo { .. } | OutputDevice::Stepper { .. } => {
                WriteValue::Integer(0)
            }
            OutputDevice::LedDisplay { .. } | OutputDevice::Custom { .. } => WriteValue::Text(String::new()),
        };
        self.write_test(item, &output.device, value)
    }

    fn write_test(&self, item: &ConfigItem, device: &OutputDevice, value: WriteValue) -> Result<(), BackendError> {
        if is_unbound(&item.device_ref) {
            return Ok(());
        }
        tracing::debug!("Test value {} for \"{}\"", value, item.name);
        self.backends.devices.write(&item.device_ref, device, &value)
    }
}

/// Value a device receives for `value`.
pub fn to_write_value(device: &OutputDevice, value: &Value) -> WriteValue {
    if device.is_numeric() {
        WriteValue::Integer(parse_value(&value.to_string()))
    } else {
        WriteValue::Text(value.to_string())
    }
}

fn text_to_value(text: &str) -> Value {
    match text.trim().parse::<f64>() {
        Ok(number) => Value::Number(number),
        Err(_) => Value::Text(text.to_string()),
    }
}
