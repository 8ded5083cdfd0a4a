use serde::{Deserialize, Serialize};

use crate::models::binding::ControllerBinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Delete,
    Toggle,
    Activate,
    Deactivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Remove,
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionAction {
    Start,
    Stop,
    TestStart,
    TestStop,
}

/// A command sent by the frontend. On the wire: `{"key": "Command...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "payload")]
pub enum Command {
    #[serde(rename = "CommandConfigBulkAction", rename_all = "camelCase")]
    ConfigBulkAction { action: BulkAction, items: Vec<String> },

    /// Move items to `new_index` of the target file, in the given order
    #[serde(rename = "CommandResortConfigItem", rename_all = "camelCase")]
    ResortConfigItem {
        items: Vec<String>,
        source_file_index: usize,
        target_file_index: usize,
        new_index: usize,
    },

    #[serde(rename = "CommandActiveConfigFile", rename_all = "camelCase")]
    ActiveConfigFile { index: usize },

    #[serde(rename = "CommandFileContextMenu", rename_all = "camelCase")]
    FileContextMenu {
        action: FileAction,
        index: usize,
        #[serde(default)]
        label: Option<String>,
    },

    #[serde(rename = "CommandControllerBindingsUpdate", rename_all = "camelCase")]
    ControllerBindingsUpdate { bindings: Vec<ControllerBinding> },

    #[serde(rename = "CommandExecutionControl", rename_all = "camelCase")]
    ExecutionControl {
        action: ExecutionAction,
        /// Item to drive in test mode
        #[serde(default)]
        item: Option<String>,
    },
}
