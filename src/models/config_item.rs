use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::device::NOT_SET;
use crate::models::modifier::Modifier;
use crate::models::precondition::PreconditionList;

/// Category a status entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCategory {
    Source,
    Device,
    Modifier,
    Precondition,
}

/// Backend a source reads from or an input action writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Fsuipc,
    SimConnect,
    XPlane,
    ProSim,
    Variable,
}

impl SourceKind {
    /// Status text recorded while the backend is not connected.
    pub fn not_available_status(self) -> &'static str {
        match self {
            SourceKind::Fsuipc => "FSUIPC_NOT_AVAILABLE",
            SourceKind::SimConnect => "SIMCONNECT_NOT_AVAILABLE",
            SourceKind::XPlane => "XPLANE_NOT_AVAILABLE",
            SourceKind::ProSim => "PROSIM_NOT_AVAILABLE",
            SourceKind::Variable => "VARIABLE_NOT_AVAILABLE",
        }
    }
}

/// Simulator data point an output item reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    pub kind: SourceKind,
    /// Offset, dataref, variable name, ... depending on the backend
    pub path: String,
}

impl Source {
    pub fn new(kind: SourceKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Hardware target of an output item. Only the selected variant carries data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum OutputDevice {
    #[default]
    None,
    #[serde(rename_all = "PascalCase")]
    Output { pin: String },
    #[serde(rename_all = "PascalCase")]
    LedDisplay { address: String, digits: u8 },
    #[serde(rename_all = "PascalCase")]
    Servo {
        address: String,
        min: i32,
        max: i32,
        test_value: i32,
    },
    #[serde(rename_all = "PascalCase")]
    Stepper { address: String, test_value: i32 },
    #[serde(rename_all = "PascalCase")]
    Custom { name: String, test_value: String },
}

impl OutputDevice {
    /// Devices driven with an integer rather than text.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            OutputDevice::Output { .. } | OutputDevice::Servo { .. } | OutputDevice::Stepper { .. }
        )
    }
}

/// A simulator command fired by an input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputAction {
    pub target: SourceKind,
    /// `@` is replaced by the raw event value
    pub command: String,
}

impl InputAction {
    pub fn new(target: SourceKind, command: impl Into<String>) -> Self {
        Self {
            target,
            command: command.into(),
        }
    }
}

/// Hardware input an input item listens to. Only the selected variant carries data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum InputDevice {
    #[serde(rename_all = "PascalCase")]
    Button {
        on_press: Option<InputAction>,
        on_release: Option<InputAction>,
    },
    #[serde(rename_all = "PascalCase")]
    Encoder {
        on_left: Option<InputAction>,
        on_left_fast: Option<InputAction>,
        on_right: Option<InputAction>,
        on_right_fast: Option<InputAction>,
    },
    #[serde(rename_all = "PascalCase")]
    Analog { on_change: Option<InputAction> },
    #[serde(rename_all = "PascalCase")]
    InputShiftRegister {
        ext_pin: u8,
        on_press: Option<InputAction>,
        on_release: Option<InputAction>,
    },
    #[serde(rename_all = "PascalCase")]
    InputMultiplexer {
        data_pin: u8,
        on_press: Option<InputAction>,
        on_release: Option<InputAction>,
    },
}

impl InputDevice {
    /// Every configured action of the selected variant.
    pub fn actions(&self) -> impl Iterator<Item = &InputAction> {
        let actions: [Option<&InputAction>; 4] = match self {
            InputDevice::Button { on_press, on_release }
            | InputDevice::InputShiftRegister { on_press, on_release, .. }
            | InputDevice::InputMultiplexer { on_press, on_release, .. } => {
                [on_press.as_ref(), on_release.as_ref(), None, None]
            }
            InputDevice::Encoder {
                on_left,
                on_left_fast,
                on_right,
                on_right_fast,
            } => [
                on_left.as_ref(),
                on_left_fast.as_ref(),
                on_right.as_ref(),
                on_right_fast.as_ref(),
            ],
            InputDevice::Analog { on_change } => [on_change.as_ref(), None, None, None],
        };
        actions.into_iter().flatten()
    }
}

/// Placeholder inside an input command that is replaced by another item's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigRef {
    #[serde(default = "default_true")]
    pub active: bool,
    /// GUID of the referenced item
    #[serde(rename = "Ref")]
    pub reference: String,
    pub placeholder: String,
    #[serde(default)]
    pub test_value: String,
}

impl ConfigRef {
    pub fn new(reference: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            active: true,
            reference: reference.into(),
            placeholder: placeholder.into(),
            test_value: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputConfig {
    pub source: Option<Source>,
    #[serde(default)]
    pub device: OutputDevice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputConfig {
    /// Device id as reported by input events (e.g. `"Button1"`)
    pub device_name: String,
    pub device: InputDevice,
    #[serde(default)]
    pub config_refs: Vec<ConfigRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind")]
pub enum ItemKind {
    Output(OutputConfig),
    Input(InputConfig),
}

/// One configured mapping between a simulator data point and a hardware control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigItem {
    #[serde(rename = "GUID")]
    pub guid: String,
    pub name: String,
    pub active: bool,
    /// `"<DeviceName> / <Serial>"` or `"-"` when unbound
    #[serde(rename = "ModuleSerial")]
    pub device_ref: String,
    #[serde(default)]
    pub status: IndexMap<StatusCategory, String>,
    #[serde(default)]
    pub preconditions: PreconditionList,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub raw_value: String,
    #[serde(flatten)]
    pub kind: ItemKind,
}

fn default_true() -> bool {
    true
}

impl ConfigItem {
    fn with_kind(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            name: name.into(),
            active: true,
            device_ref: NOT_SET.to_string(),
            status: IndexMap::new(),
            preconditions: PreconditionList::default(),
            modifiers: Vec::new(),
            value: String::new(),
            raw_value: String::new(),
            kind,
        }
    }

    /// New unbound output item with a fresh GUID.
    pub fn output(name: impl Into<String>, source: Option<Source>, device: OutputDevice) -> Self {
        Self::with_kind(name, ItemKind::Output(OutputConfig { source, device }))
    }

    /// New unbound input item with a fresh GUID.
    pub fn input(name: impl Into<String>, device_name: impl Into<String>, device: InputDevice) -> Self {
        Self::with_kind(
            name,
            ItemKind::Input(InputConfig {
                device_name: device_name.into(),
                device,
                config_refs: Vec::new(),
            }),
        )
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = guid.into();
        self
    }

    pub fn with_device_ref(mut self, device_ref: impl Into<String>) -> Self {
        self.device_ref = device_ref.into();
        self
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, ItemKind::Input(_))
    }

    pub fn set_status(&mut self, category: StatusCategory, text: impl Into<String>) {
        self.status.insert(category, text.into());
    }

    pub fn clear_status(&mut self, category: StatusCategory) {
        self.status.shift_remove(&category);
    }

    pub fn status_of(&self, category: StatusCategory) -> Option<&str> {
        self.status.get(&category).map(String::as_str)
    }
}
