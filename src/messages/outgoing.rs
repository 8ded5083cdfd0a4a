use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::config_item::ConfigItem;
use crate::models::device::Controller;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    ControllerAutoBindSuccessful,
    ControllerManualBindRequired,
    TestModeException,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    pub event: NotificationEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub context: IndexMap<String, String>,
}

impl Notification {
    pub fn new(event: NotificationEvent) -> Self {
        Self {
            event,
            guid: None,
            context: IndexMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// A message published to the frontend. On the wire: `{"key": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "payload")]
pub enum Message {
    /// Items executed since the last drain
    #[serde(rename_all = "PascalCase")]
    ConfigValuePartialUpdate { config_items: Vec<ConfigItem> },

    #[serde(rename_all = "PascalCase")]
    ExecutionState {
        is_running: bool,
        is_testing: bool,
        run_available: bool,
        test_available: bool,
    },

    Notification(Notification),

    #[serde(rename_all = "PascalCase")]
    ConnectedControllers { controllers: Vec<Controller> },

    /// The loop itself failed, as opposed to a single item
    #[serde(rename_all = "PascalCase")]
    LoopFault { message: String },

    #[serde(rename_all = "PascalCase")]
    ProjectStatus { has_changed: bool },
}

impl Message {
    /// The `key` this message is published under.
    pub fn key(&self) -> &'static str {
        match self {
            Message::ConfigValuePartialUpdate { .. } => "ConfigValuePartialUpdate",
            Message::ExecutionState { .. } => "ExecutionState",
            Message::Notification(_) => "Notification",
            Message::ConnectedControllers { .. } => "ConnectedControllers",
            Message::LoopFault { .. } => "LoopFault",
            Message::ProjectStatus { .. } => "ProjectStatus",
        }
    }
}
