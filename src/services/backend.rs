//! Capability traits for the simulator and hardware collaborators.
//!
//! The engine never speaks a simulator protocol itself. Each backend exposes connection
//! state plus read/write, the hardware side exposes a write and pin states, and the device
//! inventory lists what is attached. [`Backends`] bundles them for the execution layer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::models::config_item::{OutputDevice, Source, SourceKind};
use crate::models::device::Controller;
use crate::models::value::{Value, WriteValue};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("{0:?} is not connected")]
    NotConnected(SourceKind),

    #[error("No backend registered for {0:?}")]
    Unregistered(SourceKind),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),
}

/// A simulator data source / sink (FSUIPC, SimConnect, X-Plane, ...).
pub trait SimulatorBackend: Send + Sync {
    fn is_connected(&self) -> bool;

    fn read_value(&self, source: &Source) -> Result<Value, BackendError>;

    fn write_value(&self, command: &str, value: &Value) -> Result<(), BackendError>;
}

/// Hardware outputs and input pin states.
pub trait DeviceBackend: Send + Sync {
    fn write(&self, device_ref: &str, device: &OutputDevice, value: &WriteValue) -> Result<(), BackendError>;

    /// Current state of an input pin, `None` if the module or pin is unknown.
    fn pin_state(&self, serial: &str, pin: &str) -> Option<bool>;
}

/// Attached controllers, grouped by family.
pub trait DeviceInventory: Send + Sync {
    fn modules(&self) -> Vec<Controller>;

    fn joysticks(&self) -> Vec<Controller>;

    fn midi_boards(&self) -> Vec<Controller>;
}

/// Live reference strings for everything in the inventory.
pub fn connected_references(inventory: &dyn DeviceInventory) -> Vec<String> {
    let modules = inventory.modules().into_iter().map(|m| m.module_reference());
    let joysticks = inventory.joysticks().into_iter().map(|j| j.peripheral_reference());
    let midi = inventory.midi_boards().into_iter().map(|m| m.peripheral_reference());
    modules.chain(joysticks).chain(midi).collect()
}

/// All attached controllers.
pub fn connected_controllers(inventory: &dyn DeviceInventory) -> Vec<Controller> {
    let mut controllers = inventory.modules();
    controllers.extend(inventory.joysticks());
    controllers.extend(inventory.midi_boards());
    controllers
}

/// Named variables shared by items. Always connected; unknown names read as 0.
#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<HashMap<String, Value>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Value {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(name).cloned())
            .unwrap_or(Value::Number(0.0))
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.values.write() {
            Ok(mut values) => {
                values.insert(name, value);
            }
            Err(poisoned) => {
                tracing::error!("Variable store lock poisoned, recovering");
                poisoned.into_inner().insert(name, value);
            }
        }
    }
}

impl SimulatorBackend for VariableStore {
    fn is_connected(&self) -> bool {
        true
    }

    fn read_value(&self, source: &Source) -> Result<Value, BackendError> {
        Ok(self.get(&source.path))
    }

    fn write_value(&self, command: &str, value: &Value) -> Result<(), BackendError> {
        let name = command.trim();
        if name.is_empty() {
            return Err(BackendError::Write("empty variable name".to_string()));
        }
        self.set(name, value.clone());
        Ok(())
    }
}

/// Inventory with nothing attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyInventory;

impl DeviceInventory for EmptyInventory {
    fn modules(&self) -> Vec<Controller> {
        Vec::new()
    }

    fn joysticks(&self) -> Vec<Controller> {
        Vec::new()
    }

    fn midi_boards(&self) -> Vec<Controller> {
        Vec::new()
    }
}

/// Device backend that only logs writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDevices;

impl DeviceBackend for TracingDevices {
    fn write(&self, device_ref: &str, device: &OutputDevice, value: &WriteValue) -> Result<(), BackendError> {
        tracing::trace!("{} <- {} ({:?})", device_ref, value, device);
        Ok(())
    }

    fn pin_state(&self, _serial: &str, _pin: &str) -> Option<bool> {
        None
    }
}

/// The set of collaborators the execution layer talks to.
#[derive(Clone)]
pub struct Backends {
    simulators: HashMap<SourceKind, Arc<dyn SimulatorBackend>>,
    pub devices: Arc<dyn DeviceBackend>,
    pub inventory: Arc<dyn DeviceInventory>,
    pub variables: Arc<VariableStore>,
}

impl Backends {
    /// Backends with the variable store registered under [`SourceKind::Variable`].
    pub fn new(devices: Arc<dyn DeviceBackend>, inventory: Arc<dyn DeviceInventory>) -> Self {
        let variables = Arc::new(VariableStore::new());
        let mut simulators: HashMap<SourceKind, Arc<dyn SimulatorBackend>> = HashMap::new();
        simulators.insert(SourceKind::Variable, variables.clone());
        Self {
            simulators,
            devices,
            inventory,
            variables,
        }
    }

    pub fn with_simulator(mut self, kind: SourceKind, backend: Arc<dyn SimulatorBackend>) -> Self {
        self.simulators.insert(kind, backend);
        self
    }

    pub fn simulator(&self, kind: SourceKind) -> Option<&Arc<dyn SimulatorBackend>> {
        self.simulators.get(&kind)
    }

    /// True if a backend is registered for `kind` and reports connected.
    pub fn is_connected(&self, kind: SourceKind) -> bool {
        self.simulator(kind).is_some_and(|backend| backend.is_connected())
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new(Arc::new(TracingDevices), Arc::new(EmptyInventory))
    }
}
