use serde::{Deserialize, Serialize};

/// Separator between the device name and the serial in a device reference.
///
/// A device reference looks like `"MyBoard # / SN-1234567890"`: everything before the
/// first `/` is the device name, everything after it is the serial.
pub const SERIAL_SEPARATOR: &str = "/ ";

/// Placeholder stored on items that were never bound to a device.
pub const NOT_SET: &str = "-";

/// A hardware controller as reported by a device inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Controller {
    pub name: String,
    pub vendor: String,
    pub serial: String,
    pub connected: bool,
}

impl Controller {
    pub fn new(name: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: String::new(),
            serial: serial.into(),
            connected: true,
        }
    }

    /// Reference string for a firmware module (`"{name}/ {serial}"`).
    pub fn module_reference(&self) -> String {
        format!("{}{}{}", self.name, SERIAL_SEPARATOR, self.serial)
    }

    /// Reference string for a joystick or MIDI board (`"{name} / {serial}"`).
    pub fn peripheral_reference(&self) -> String {
        format!("{} {}{}", self.name, SERIAL_SEPARATOR, self.serial)
    }
}

/// True for the reserved "unbound" values (`""` and `"-"`).
pub fn is_unbound(reference: &str) -> bool {
    reference.is_empty() || reference == NOT_SET
}

/// The bare serial of a device reference, empty if the reference has none.
pub fn extract_serial(reference: &str) -> &str {
    reference
        .split_once('/')
        .map(|(_, serial)| serial.trim())
        .unwrap_or("")
}

/// The device name part of a device reference.
pub fn extract_device_name(reference: &str) -> &str {
    reference
        .split_once('/')
        .map(|(name, _)| name)
        .unwrap_or(reference)
        .trim()
}

/// The serial prefix identifying the device family (`SN-`, `JS-`, `MI-`).
pub fn extract_prefix(reference: &str) -> &str {
    let serial = extract_serial(reference);
    serial
        .find('-')
        .map(|idx| &serial[..=idx])
        .unwrap_or("")
}

/// `(serial prefix, device name)` used for type+name matching.
pub fn device_identifier(reference: &str) -> (&str, &str) {
    (extract_prefix(reference), extract_device_name(reference))
}

/// The type and name part of a reference, split on the full separator.
pub fn type_and_name(reference: &str) -> &str {
    reference
        .split_once(SERIAL_SEPARATOR)
        .map(|(head, _)| head)
        .unwrap_or(reference)
        .trim()
}
