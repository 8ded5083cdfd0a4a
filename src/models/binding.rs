use serde::{Deserialize, Serialize};

/// Outcome of resolving one configured device reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerBindingStatus {
    /// The configured reference is attached verbatim
    Match,
    /// A single unambiguous replacement device was found
    AutoBind,
    /// Nothing attached resembles the configured device
    Missing,
    /// Several candidates exist, the user has to pick one
    RequiresManualBind,
}

/// Association between a reference saved in the project and a live device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControllerBinding {
    pub original_controller: String,
    pub bound_controller: Option<String>,
    pub status: ControllerBindingStatus,
}

impl ControllerBinding {
    pub fn new(
        original: impl Into<String>,
        bound: Option<String>,
        status: ControllerBindingStatus,
    ) -> Self {
        Self {
            original_controller: original.into(),
            bound_controller: bound,
            status,
        }
    }

    pub fn matched(reference: &str) -> Self {
        Self::new(reference, Some(reference.to_string()), ControllerBindingStatus::Match)
    }

    pub fn auto_bound(original: &str, bound: &str) -> Self {
        Self::new(original, Some(bound.to_string()), ControllerBindingStatus::AutoBind)
    }

    pub fn missing(original: &str) -> Self {
        Self::new(original, None, ControllerBindingStatus::Missing)
    }

    pub fn manual(original: &str) -> Self {
        Self::new(original, None, ControllerBindingStatus::RequiresManualBind)
    }
}
