use serde::{Deserialize, Serialize};

use crate::models::binding::ControllerBinding;
use crate::models::config_item::ConfigItem;

/// An ordered collection of config items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigFile {
    pub label: String,
    #[serde(rename = "ConfigItems", default)]
    pub items: Vec<ConfigItem>,
}

impl ConfigFile {
    pub fn new(label: impl Into<String>, items: Vec<ConfigItem>) -> Self {
        Self {
            label: label.into(),
            items,
        }
    }

    pub fn find(&self, guid: &str) -> Option<&ConfigItem> {
        self.items.iter().find(|item| item.guid == guid)
    }

    pub fn find_mut(&mut self, guid: &str) -> Option<&mut ConfigItem> {
        self.items.iter_mut().find(|item| item.guid == guid)
    }
}

/// The loaded project: config files plus the last binding snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config_files: Vec<ConfigFile>,
    #[serde(default)]
    pub controller_bindings: Vec<ControllerBinding>,
}

impl Project {
    pub fn new(name: impl Into<String>, config_files: Vec<ConfigFile>) -> Self {
        Self {
            name: name.into(),
            config_files,
            controller_bindings: Vec::new(),
        }
    }

    /// Every item of every file, in file order.
    pub fn items(&self) -> impl Iterator<Item = &ConfigItem> {
        self.config_files.iter().flat_map(|file| file.items.iter())
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut ConfigItem> {
        self.config_files
            .iter_mut()
            .flat_map(|file| file.items.iter_mut())
    }

    pub fn find(&self, guid: &str) -> Option<&ConfigItem> {
        self.items().find(|item| item.guid == guid)
    }

    pub fn find_mut(&mut self, guid: &str) -> Option<&mut ConfigItem> {
        self.items_mut().find(|item| item.guid == guid)
    }
}
