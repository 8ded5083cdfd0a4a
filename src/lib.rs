// SimLink - reconciliation engine between flight simulators and home cockpit hardware
//
// This is the library crate containing the engine: device identity resolution, item
// execution, input dispatch and the reconciliation loop. The binary crate (main.rs)
// wires it to settings, logging and the process lifetime.

pub mod config;
pub mod execution;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use execution::ExecutionManager;
pub use messages::{Command, Message, MessageBus};
pub use metrics::Metrics;
pub use models::{ConfigFile, ConfigItem, ControllerBinding, ControllerBindingStatus, Project, Settings};
pub use services::{Backends, ControllerBinder, ExecutionError, InputEvent};
pub use state::{ExecutionState, ResultMap, StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
