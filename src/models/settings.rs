use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings loaded from `simlink.yaml` and `SIMLINK__*` environment variables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub execution: ExecutionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Reconciliation tick period
    pub tick_interval_ms: u64,
    /// Period of the result drain that feeds the frontend
    pub frontend_interval_ms: u64,
    /// Run auto binding right after a project is loaded
    pub auto_bind_on_load: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            frontend_interval_ms: 100,
            auto_bind_on_load: true,
        }
    }
}

impl ExecutionSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn frontend_interval(&self) -> Duration {
        Duration::from_millis(self.frontend_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
    /// Write the log file as JSON lines
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            prefix: "simlink".to_string(),
            debug: false,
            console: true,
            json: false,
        }
    }
}
