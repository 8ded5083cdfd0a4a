//! Dispatch of hardware input events to input items.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::config_item::{ConfigItem, ConfigRef, InputAction, InputDevice, ItemKind, StatusCategory};
use crate::models::device::extract_serial;
use crate::models::value::Value;
use crate::services::backend::Backends;
use crate::services::executor::{EXECUTION_ERROR, ItemContext, REFERENCE_NOT_FOUND, ValueLookup};
use crate::services::precondition;

/// A button press, encoder step or analog change reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputEvent {
    pub serial: String,
    /// Name of the input on the device, e.g. `"Button1"`
    pub device_id: String,
    /// Pin on a shift register or multiplexer
    #[serde(default)]
    pub ext_pin: Option<u8>,
    pub value: i32,
}

impl InputEvent {
    pub fn new(serial: impl Into<String>, device_id: impl Into<String>, value: i32) -> Self {
        Self {
            serial: serial.into(),
            device_id: device_id.into(),
            ext_pin: None,
            value,
        }
    }

    pub fn with_ext_pin(mut self, pin: u8) -> Self {
        self.ext_pin = Some(pin);
        self
    }
}

/// What an event means for the item it hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    Press,
    Release,
    Left,
    LeftFast,
    Right,
    RightFast,
    Change,
}

impl fmt::Display for InputEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InputEventKind::Press => "PRESS",
            InputEventKind::Release => "RELEASE",
            InputEventKind::Left => "LEFT",
            InputEventKind::LeftFast => "LEFT_FAST",
            InputEventKind::Right => "RIGHT",
            InputEventKind::RightFast => "RIGHT_FAST",
            InputEventKind::Change => "CHANGE",
        };
        f.write_str(text)
    }
}

/// Event meaning and the action configured for it. `None` for values the device type
/// does not define.
fn resolve_action(device: &InputDevice, value: i32) -> Option<(InputEventKind, Option<&InputAction>)> {
    use InputEventKind::*;

    match device {
        InputDevice::Button { on_press, on_release }
        | InputDevice::InputShiftRegister { on_press, on_release, .. }
        | InputDevice::InputMultiplexer { on_press, on_release, .. } => match value {
            0 => Some((Press, on_press.as_ref())),
            1 => Some((Release, on_release.as_ref())),
            _ => None,
        },
        InputDevice::Encoder {
            on_left,
            on_left_fast,
            on_right,
            on_right_fast,
        } => match value {
            0 => Some((Left, on_left.as_ref())),
            1 => Some((LeftFast, on_left_fast.as_ref())),
            2 => Some((Right, on_right.as_ref())),
            3 => Some((RightFast, on_right_fast.as_ref())),
            _ => None,
        },
        InputDevice::Analog { on_change } => Some((Change, on_change.as_ref())),
    }
}

/// Shift registers and multiplexers only react to their own pin.
fn pin_matches(device: &InputDevice, event: &InputEvent) -> bool {
    match device {
        InputDevice::InputShiftRegister { ext_pin, .. } => event.ext_pin == Some(*ext_pin),
        InputDevice::InputMultiplexer { data_pin, .. } => event.ext_pin == Some(*data_pin),
        _ => true,
    }
}

/// Replace every active placeholder with the referenced item's value.
fn substitute_refs(command: &str, refs: &[ConfigRef], values: &ValueLookup) -> Result<String, String> {
    let mut command = command.to_string();
    for config_ref in refs.iter().filter(|r| r.active && !r.placeholder.is_empty()) {
        let value = values
            .get(&config_ref.reference)
            .ok_or_else(|| config_ref.reference.clone())?;
        command = command.replace(&config_ref.placeholder, value);
    }
    Ok(command)
}

#[derive(Clone)]
pub struct InputDispatcher {
    backends: Backends,
}

impl InputDispatcher {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Fire the actions of every input item matching `event`.
    ///
    /// Returns the dispatched items keyed by GUID. Nothing happens unless `is_started`.
    pub fn dispatch<'a, I>(
        &self,
        event: &InputEvent,
        items: I,
        values: &ValueLookup,
        is_started: bool,
    ) -> HashMap<String, ConfigItem>
    where
        I: IntoIterator<Item = &'a mut ConfigItem>,
    {
        let mut dispatched = HashMap::new();

        if !is_started {
            tracing::warn!("skipping, not running.");
            return dispatched;
        }

        for item in items {
            let ItemKind::Input(input) = &item.kind else {
                continue;
            };
            if extract_serial(&item.device_ref) != event.serial || input.device_name != event.device_id {
                continue;
            }

            if !item.active {
                tracing::warn!("Skipping inactive config \"{}\"", item.name);
                continue;
            }

            if !pin_matches(&input.device, event) {
                continue;
            }

            let context = ItemContext {
                values,
                backends: &self.backends,
            };
            match precondition::evaluate(&item.preconditions, &context) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("Preconditions not satisfied for \"{}\".", item.name);
                    continue;
                }
                Err(err) => {
                    tracing::warn!("{} in \"{}\"", err, item.name);
                    item.set_status(StatusCategory::Precondition, REFERENCE_NOT_FOUND);
                    dispatched.insert(item.guid.clone(), item.clone());
                    continue;
                }
            }

            let Some((kind, action)) = resolve_action(&input.device, event.value) else {
                tracing::debug!("Unhandled value {} for \"{}\"", event.value, item.name);
                continue;
            };
            let action = action.cloned();
            let refs = input.config_refs.clone();

            tracing::info!("Executing \"{}\". ({})", item.name, kind);

            if let Some(action) = action {
                self.fire(item, &action, &refs, event, values);
            } else {
                item.status.clear();
            }
            item.value = event.value.to_string();
            dispatched.insert(item.guid.clone(), item.clone());
        }

        dispatched
    }

    fn fire(
        &self,
        item: &mut ConfigItem,
        action: &InputAction,
        refs: &[ConfigRef],
        event: &InputEvent,
        values: &ValueLookup,
    ) {
        let Some(backend) = self.backends.simulator(action.target) else {
            item.set_status(StatusCategory::Source, action.target.not_available_status());
            return;
        };
        if !backend.is_connected() {
            item.set_status(StatusCategory::Source, action.target.not_available_status());
            return;
        }

        let command = match substitute_refs(&action.command, refs, values) {
            Ok(command) => command,
            Err(reference) => {
                tracing::warn!("Config reference {} not found in \"{}\"", reference, item.name);
                item.set_status(StatusCategory::Source, REFERENCE_NOT_FOUND);
                return;
            }
        };
        let command = command.replace('@', &event.value.to_string());

        match backend.write_value(&command, &Value::Number(f64::from(event.value))) {
            Ok(()) => item.status.clear(),
            Err(err) => {
                tracing::error!("Error executing \"{}\": {}", item.name, err);
                item.set_status(StatusCategory::Device, EXECUTION_ERROR);
            }
        }
    }
}
