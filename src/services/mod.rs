//! Services module - engine logic with no transport or UI dependencies.
//!
//! # Components
//!
//! - [`ControllerBinder`]: classifies saved device references against attached devices
//! - [`ControllerBindingService`]: runs the binder over every config file of a project
//! - [`precondition`]: sequential evaluation of guard conditions
//! - [`modifier`]: value transformations and [`parse_value`]
//! - [`ItemExecutor`]: one output item, one tick
//! - [`InputDispatcher`]: routes hardware input events to input items
//! - [`backend`]: capability traits for simulators, devices and the device inventory
//!
//! Everything here is synchronous and takes its collaborators explicitly, so it can be
//! driven from the tokio loop in [`crate::execution`] or directly from tests.

pub mod backend;
pub mod binder;
pub mod binding;
pub mod executor;
pub mod input;
pub mod modifier;
pub mod precondition;

pub use backend::{
    BackendError, Backends, DeviceBackend, DeviceInventory, EmptyInventory, SimulatorBackend,
    TracingDevices, VariableStore,
};
pub use binder::{ControllerBinder, apply_auto_binding, apply_binding_update};
pub use binding::ControllerBindingService;
pub use executor::{ExecutionError, ItemExecutor, ValueLookup};
pub use input::{InputDispatcher, InputEvent, InputEventKind};
pub use modifier::{ModifierError, parse_value};
pub use precondition::{PreconditionContext, PreconditionError};
