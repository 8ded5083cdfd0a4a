//! Controller identity resolution.
//!
//! Saved projects reference devices as `"<name> / <serial>"`. Serials change when a board
//! is reflashed or a joystick is re-enumerated, so at load time every configured reference
//! is classified against the devices that are actually attached:
//!
//! 1. An auto binding carried over from an earlier config file is reused when its device is live
//! 2. A verbatim match is a [`Match`](ControllerBindingStatus::Match)
//! 3. Otherwise candidates sharing `(serial prefix, device name)` or the bare serial are
//!    collected; a single unambiguous candidate is an
//!    [`AutoBind`](ControllerBindingStatus::AutoBind), several are a
//!    [`RequiresManualBind`](ControllerBindingStatus::RequiresManualBind), none is
//!    [`Missing`](ControllerBindingStatus::Missing)
//!
//! Claimed devices leave the pool, so two references never bind the same device.

use std::collections::HashSet;

use crate::models::binding::{ControllerBinding, ControllerBindingStatus};
use crate::models::config_item::ConfigItem;
use crate::models::device::{device_identifier, extract_serial, is_unbound};

/// Matcher over a fixed set of connected device references.
#[derive(Debug, Clone, Default)]
pub struct ControllerBinder {
    connected: Vec<String>,
}

impl ControllerBinder {
    /// Create a binder for the given live references. Duplicates are dropped.
    pub fn new<I, S>(connected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let connected = connected
            .into_iter()
            .map(Into::into)
            .filter(|reference: &String| seen.insert(reference.clone()))
            .collect();
        Self { connected }
    }

    pub fn connected(&self) -> &[String] {
        &self.connected
    }

    /// Classify every distinct bound reference of `items`. Never mutates the items.
    pub fn analyze_bindings(
        &self,
        items: &[ConfigItem],
        carried: &[ControllerBinding],
    ) -> Vec<ControllerBinding> {
        self.analyze_references(items.iter().map(|item| item.device_ref.as_str()), carried)
    }

    /// Classify every distinct bound reference in `references`.
    ///
    /// Each call starts from the full connected set. `carried` holds auto bindings applied
    /// earlier in the same run; a carried device is claimed only when its original
    /// reference appears in `references`, otherwise it stays available to everything else.
    pub fn analyze_references<'a, I>(
        &self,
        references: I,
        carried: &[ControllerBinding],
    ) -> Vec<ControllerBinding>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut pool: Vec<&str> = self.connected.iter().map(String::as_str).collect();
        let distinct = self.ordered_references(references, &pool, carried);
        let mut results = Vec::with_capacity(distinct.len());

        for reference in &distinct {
            let previous = carried
                .iter()
                .find(|binding| binding.original_controller == *reference)
                .and_then(|binding| binding.bound_controller.as_deref());

            if let Some(bound) = previous
                && let Some(index) = pool.iter().position(|device| *device == bound)
            {
                pool.remove(index);
                let binding = if bound == *reference {
                    ControllerBinding::matched(reference)
                } else {
                    ControllerBinding::auto_bound(reference, bound)
                };
                results.push(binding);
                continue;
            }

            let binding = resolve_single(reference, &distinct, &pool);
            if let Some(bound) = binding.bound_controller.as_deref() {
                pool.retain(|device| *device != bound);
            }
            results.push(binding);
        }

        results
    }

    /// Distinct bound references with verbatim or carried ones first, order otherwise kept.
    fn ordered_references<'a, I>(
        &self,
        references: I,
        pool: &[&str],
        carried: &[ControllerBinding],
    ) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = references
            .into_iter()
            .filter(|reference| !is_unbound(reference))
            .filter(|reference| seen.insert(*reference))
            .collect();

        let (mut known, unknown): (Vec<&str>, Vec<&str>) =
            distinct.into_iter().partition(|reference| {
                pool.contains(reference)
                    || carried
                        .iter()
                        .any(|binding| binding.original_controller == *reference)
            });
        known.extend(unknown);
        known
    }
}

fn resolve_single(reference: &str, distinct: &[&str], pool: &[&str]) -> ControllerBinding {
    if pool.contains(&reference) {
        return ControllerBinding::matched(reference);
    }

    let identifier = device_identifier(reference);
    let type_name_matches: Vec<&str> = pool
        .iter()
        .copied()
        .filter(|device| device_identifier(device) == identifier)
        .collect();

    let serial = extract_serial(reference);
    let serial_matches: Vec<&str> = pool
        .iter()
        .copied()
        .filter(|device| !serial.is_empty() && extract_serial(device) == serial)
        .collect();

    if type_name_matches.is_empty() && serial_matches.is_empty() {
        return ControllerBinding::missing(reference);
    }

    if type_name_matches.len() > 1 {
        return ControllerBinding::manual(reference);
    }

    let configured_same_type = distinct
        .iter()
        .filter(|other| device_identifier(other) == identifier)
        .count();
    if configured_same_type > 1 {
        return ControllerBinding::manual(reference);
    }

    match (type_name_matches.as_slice(), serial_matches.as_slice()) {
        ([device], _) | ([], [device]) => ControllerBinding::auto_bound(reference, device),
        _ => ControllerBinding::missing(reference),
    }
}

/// Rewrite items whose reference was auto bound. Returns the applied bindings.
///
/// Only [`AutoBind`](ControllerBindingStatus::AutoBind) entries are applied, so running it
/// twice is the same as running it once.
pub fn apply_auto_binding(
    items: &mut [ConfigItem],
    bindings: &[ControllerBinding],
) -> Vec<ControllerBinding> {
    let mappings: Vec<ControllerBinding> = bindings
        .iter()
        .filter(|binding| binding.status == ControllerBindingStatus::AutoBind)
        .cloned()
        .collect();

    if !mappings.is_empty() {
        apply_binding_update(items, &mappings);
    }

    mappings
}

/// Rewrite items for every binding that names a bound controller, whatever its status.
pub fn apply_binding_update(items: &mut [ConfigItem], bindings: &[ControllerBinding]) {
    for item in items.iter_mut() {
        if is_unbound(&item.device_ref) {
            continue;
        }

        let bound = bindings
            .iter()
            .find(|binding| binding.original_controller == item.device_ref)
            .and_then(|binding| binding.bound_controller.clone());

        if let Some(bound) = bound {
            tracing::debug!("Rebinding \"{}\" from {} to {}", item.name, item.device_ref, bound);
            item.device_ref = bound;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config_item::OutputDevice;

    fn item(reference: &str) -> ConfigItem {
        ConfigItem::output("item", None, OutputDevice::None).with_device_ref(reference)
    }

    fn status_of(bindings: &[ControllerBinding], reference: &str) -> Option<ControllerBindingStatus> {
        bindings
            .iter()
            .find(|b| b.original_controller == reference)
            .map(|b| b.status)
    }

    #[test]
    fn test_exact_match() {
        let binder = ControllerBinder::new(["MyBoard # / SN-1234567890"]);
        let items = vec![item("MyBoard # / SN-1234567890")];

        let bindings = binder.analyze_bindings(&items, &[]);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].status, ControllerBindingStatus::Match);
        assert_eq!(bindings[0].bound_controller.as_deref(), Some("MyBoard # / SN-1234567890"));
    }

    #[test]
    fn test_serial_differs_auto_binds() {
        let binder = ControllerBinder::new(["X1-Pro # / SN-NEW456"]);
        let mut items = vec![item("X1-Pro # / SN-OLD123")];

        let bindings = binder.analyze_bindings(&items, &[]);
        assert_eq!(bindings[0].status, ControllerBindingStatus::AutoBind);

        apply_auto_binding(&mut items, &bindings);
        assert_eq!(items[0].device_ref, "X1-Pro # / SN-NEW456");
    }

    #[test]
    fn test_name_differs_serial_matches_auto_binds() {
        let binder = ControllerBinder::new(["Renamed Board/ SN-1234567890"]);
        let bindings = binder.analyze_references(["MyBoard # / SN-1234567890"], &[]);

        assert_eq!(bindings[0].status, ControllerBindingStatus::AutoBind);
        assert_eq!(bindings[0].bound_controller.as_deref(), Some("Renamed Board/ SN-1234567890"));
    }

    #[test]
    fn test_missing_device() {
        let binder = ControllerBinder::new(["Other # / SN-999"]);
        let mut items = vec![item("MyBoard # / SN-1")];

        let bindings = binder.analyze_bindings(&items, &[]);
        assert_eq!(bindings[0].status, ControllerBindingStatus::Missing);
        assert!(bindings[0].bound_controller.is_none());

        apply_auto_binding(&mut items, &bindings);
        assert_eq!(items[0].device_ref, "MyBoard # / SN-1");
    }

    #[test]
    fn test_multiple_hardware_candidates_require_manual_bind() {
        let binder = ControllerBinder::new(["X1 # / SN-A", "X1 # / SN-B"]);
        let bindings = binder.analyze_references(["X1 # / SN-C"], &[]);
        assert_eq!(bindings[0].status, ControllerBindingStatus::RequiresManualBind);
    }

    #[test]
    fn test_multiple_configured_same_type_require_manual_bind() {
        let binder = ControllerBinder::new(["Joystick X # / JS-111111"]);
        let mut items = vec![item("Joystick X # / JS-222222"), item("Joystick X # / JS-333333")];

        let bindings = binder.analyze_bindings(&items, &[]);
        assert_eq!(bindings.len(), 2);
        assert!(bindings
            .iter()
            .all(|b| b.status == ControllerBindingStatus::RequiresManualBind));

        apply_auto_binding(&mut items, &bindings);
        assert_eq!(items[0].device_ref, "Joystick X # / JS-222222");
        assert_eq!(items[1].device_ref, "Joystick X # / JS-333333");
    }

    #[test]
    fn test_unbound_references_are_skipped() {
        let binder = ControllerBinder::new(["MyBoard # / SN-1"]);
        let bindings = binder.analyze_references(["", "-"], &[]);
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_duplicates_collapse_but_all_items_update() {
        let binder = ControllerBinder::new(["X1 # / SN-NEW"]);
        let mut items = vec![item("X1 # / SN-OLD"), item("X1 # / SN-OLD")];

        let bindings = binder.analyze_bindings(&items, &[]);
        assert_eq!(bindings.len(), 1);

        apply_auto_binding(&mut items, &bindings);
        assert!(items.iter().all(|i| i.device_ref == "X1 # / SN-NEW"));
    }

    #[test]
    fn test_exact_matches_claim_devices_first() {
        // The fuzzy reference comes first in the list but must not steal the exact device
        let binder = ControllerBinder::new(["X1 # / SN-A"]);
        let bindings = binder.analyze_references(["X1 # / SN-OLD", "X1 # / SN-A"], &[]);

        assert_eq!(bindings[0].original_controller, "X1 # / SN-A");
        assert_eq!(status_of(&bindings, "X1 # / SN-A"), Some(ControllerBindingStatus::Match));
        assert_ne!(status_of(&bindings, "X1 # / SN-OLD"), Some(ControllerBindingStatus::AutoBind));
    }

    #[test]
    fn test_carried_binding_is_reused() {
        let binder = ControllerBinder::new(["X1 # / SN-NEW"]);
        let carried = vec![ControllerBinding::auto_bound("X1 # / SN-OLD", "X1 # / SN-NEW")];

        let bindings = binder.analyze_references(["X1 # / SN-OLD"], &carried);
        assert_eq!(bindings[0].status, ControllerBindingStatus::AutoBind);
        assert_eq!(bindings[0].bound_controller.as_deref(), Some("X1 # / SN-NEW"));
    }

    #[test]
    fn test_carried_binding_claims_before_other_references() {
        let binder = ControllerBinder::new(["Board1 # / SN-111"]);
        let mut items = vec![item("Board1 # / SN-222"), item("Board1 # / SN-333")];
        let carried = vec![ControllerBinding::auto_bound("Board1 # / SN-333", "Board1 # / SN-111")];

        let bindings = binder.analyze_bindings(&items, &carried);
        let applied = apply_auto_binding(&mut items, &bindings);

        assert_eq!(status_of(&bindings, "Board1 # / SN-222"), Some(ControllerBindingStatus::Missing));
        assert_eq!(status_of(&bindings, "Board1 # / SN-333"), Some(ControllerBindingStatus::AutoBind));
        assert_eq!(applied.len(), 1);
        assert_eq!(items[0].device_ref, "Board1 # / SN-222");
        assert_eq!(items[1].device_ref, "Board1 # / SN-111");
    }

    #[test]
    fn test_carried_device_is_free_when_its_reference_is_absent() {
        let binder = ControllerBinder::new(["Board1 # / SN-111"]);
        let mut items = vec![item("Board1 # / SN-222"), item("Board2 # / SN-333")];
        let carried = vec![ControllerBinding::auto_bound("Board1 # / SN-444", "Board1 # / SN-111")];

        let bindings = binder.analyze_bindings(&items, &carried);
        let applied = apply_auto_binding(&mut items, &bindings);

        assert_eq!(status_of(&bindings, "Board1 # / SN-222"), Some(ControllerBindingStatus::AutoBind));
        assert_eq!(status_of(&bindings, "Board2 # / SN-333"), Some(ControllerBindingStatus::Missing));
        assert_eq!(applied.len(), 1);
        assert_eq!(items[0].device_ref, "Board1 # / SN-111");
        assert_eq!(items[1].device_ref, "Board2 # / SN-333");
    }

    #[test]
    fn test_carried_binding_with_unplugged_device_falls_through() {
        let binder = ControllerBinder::new(["X1 # / SN-THIRD"]);
        let carried = vec![ControllerBinding::auto_bound("X1 # / SN-OLD", "X1 # / SN-NEW")];

        let bindings = binder.analyze_references(["X1 # / SN-OLD"], &carried);
        assert_eq!(bindings[0].status, ControllerBindingStatus::AutoBind);
        assert_eq!(bindings[0].bound_controller.as_deref(), Some("X1 # / SN-THIRD"));
    }

    #[test]
    fn test_binding_update_applies_any_bound_status() {
        let mut items = vec![item("Joystick X # / JS-222222"), item("-"), item("Other # / SN-1")];
        let bindings = vec![
            ControllerBinding::new(
                "Joystick X # / JS-222222",
                Some("Joystick X # / JS-111111".to_string()),
                ControllerBindingStatus::RequiresManualBind,
            ),
            ControllerBinding::missing("Other # / SN-1"),
            ControllerBinding::new("-", Some("Board # / SN-9".to_string()), ControllerBindingStatus::AutoBind),
        ];

        apply_binding_update(&mut items, &bindings);

        assert_eq!(items[0].device_ref, "Joystick X # / JS-111111");
        assert_eq!(items[1].device_ref, "-");
        assert_eq!(items[2].device_ref, "Other # / SN-1");
    }

    #[test]
    fn test_analyze_does_not_mutate_items() {
        let binder = ControllerBinder::new(["X1 # / SN-NEW"]);
        let items = vec![item("X1 # / SN-OLD")];
        let before = items.clone();

        let first = binder.analyze_bindings(&items, &[]);
        let second = binder.analyze_bindings(&items, &[]);

        assert_eq!(items, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_connected_duplicates_are_dropped() {
        let binder = ControllerBinder::new(["A / SN-1", "A / SN-1", "B / SN-2"]);
        assert_eq!(binder.connected().len(), 2);
    }
}
