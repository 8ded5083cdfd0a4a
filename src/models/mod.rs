//! Data models for SimLink.
//!
//! - [`ConfigItem`]: one mapping between a simulator data point and a hardware control
//! - [`Project`] / [`ConfigFile`]: ownership containers for items and the binding snapshot
//! - [`ControllerBinding`]: result of resolving a saved device reference against live hardware
//! - [`PreconditionList`]: guard conditions gating an item
//! - [`Modifier`]: value transformations applied before a write
//! - [`Settings`]: runtime settings loaded by [`ConfigManager`](crate::config::ConfigManager)
//!
//! Items are plain data. Device sub-configuration is a tagged enum so only the
//! selected variant ever carries data.

pub mod binding;
pub mod config_item;
pub mod device;
pub mod modifier;
pub mod precondition;
pub mod project;
pub mod settings;
pub mod value;

pub use binding::{ControllerBinding, ControllerBindingStatus};
pub use config_item::{
    ConfigItem, ConfigRef, InputAction, InputConfig, InputDevice, ItemKind, OutputConfig,
    OutputDevice, Source, SourceKind, StatusCategory,
};
pub use device::Controller;
pub use modifier::Modifier;
pub use precondition::{Logic, Operand, Precondition, PreconditionList, PreconditionType};
pub use project::{ConfigFile, Project};
pub use settings::{ExecutionSettings, LoggingSettings, Settings};
pub use value::{Value, WriteValue};
