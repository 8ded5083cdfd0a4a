//! Property tests for controller identity resolution
//!
//! These tests verify, over generated device pools and configurations:
//! - References present verbatim always match and are never rewritten
//! - Analysis is pure and application is idempotent
//! - No live device is bound to two references
//! - References without any candidate are reported missing

use proptest::prelude::*;
use simlink::models::OutputDevice;
use simlink::services::{ControllerBinder, apply_auto_binding};
use simlink::{ConfigItem, ControllerBindingStatus};
use std::collections::HashSet;

const NAMES: &[&str] = &["Board #", "X1-Pro #", "Joystick X #", "Throttle #"];
const PREFIXES: &[&str] = &["SN-", "JS-"];

fn reference(name: usize, prefix: usize, serial: u32) -> String {
    format!("{}/ {}{}", NAMES[name], PREFIXES[prefix], serial)
}

fn live_reference() -> impl Strategy<Value = String> {
    (0..NAMES.len(), 0..PREFIXES.len(), 0u32..500).prop_map(|(n, p, s)| reference(n, p, s))
}

fn pool() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(live_reference(), 1..8)
}

fn items(references: &[String]) -> Vec<ConfigItem> {
    references
        .iter()
        .map(|r| ConfigItem::output("item", None, OutputDevice::None).with_device_ref(r.as_str()))
        .collect()
}

fn device_refs(items: &[ConfigItem]) -> Vec<String> {
    items.iter().map(|item| item.device_ref.clone()).collect()
}

proptest! {
    #[test]
    fn present_references_match_and_stay(
        pool in pool(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..6),
    ) {
        let configured: Vec<String> = picks.iter().map(|i| i.get(&pool).clone()).collect();
        let binder = ControllerBinder::new(pool.iter().cloned());
        let mut items = items(&configured);

        let bindings = binder.analyze_bindings(&items, &[]);
        apply_auto_binding(&mut items, &bindings);

        for binding in &bindings {
            prop_assert_eq!(binding.status, ControllerBindingStatus::Match);
        }
        prop_assert_eq!(device_refs(&items), configured);
    }

    #[test]
    fn analysis_is_pure(
        pool in pool(),
        configured in prop::collection::vec(live_reference(), 0..8),
    ) {
        let binder = ControllerBinder::new(pool);
        let items = items(&configured);
        let before = items.clone();

        let first = binder.analyze_bindings(&items, &[]);
        let second = binder.analyze_bindings(&items, &[]);

        prop_assert_eq!(first, second);
        prop_assert_eq!(items, before);
    }

    #[test]
    fn auto_binding_is_idempotent(
        pool in pool(),
        configured in prop::collection::vec(live_reference(), 0..8),
    ) {
        let binder = ControllerBinder::new(pool);
        let mut once = items(&configured);
        let bindings = binder.analyze_bindings(&once, &[]);

        apply_auto_binding(&mut once, &bindings);
        let mut twice = once.clone();
        apply_auto_binding(&mut twice, &bindings);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn devices_are_claimed_once(
        pool in pool(),
        configured in prop::collection::vec(live_reference(), 0..8),
    ) {
        let binder = ControllerBinder::new(pool);
        let bindings = binder.analyze_bindings(&items(&configured), &[]);

        let mut claimed = HashSet::new();
        for bound in bindings.iter().filter_map(|b| b.bound_controller.as_deref()) {
            prop_assert!(claimed.insert(bound.to_string()), "{} bound twice", bound);
        }

        let distinct: HashSet<&String> = configured.iter().collect();
        prop_assert_eq!(bindings.len(), distinct.len());
    }

    #[test]
    fn references_without_candidates_are_missing(
        pool in pool(),
        serials in prop::collection::vec(1000u32..2000, 1..5),
    ) {
        let configured: Vec<String> = serials.iter().map(|s| format!("Ghost #/ MI-{}", s)).collect();
        let binder = ControllerBinder::new(pool);
        let mut items = items(&configured);

        let bindings = binder.analyze_bindings(&items, &[]);
        let applied = apply_auto_binding(&mut items, &bindings);

        for binding in &bindings {
            prop_assert_eq!(binding.status, ControllerBindingStatus::Missing);
        }
        prop_assert!(applied.is_empty());
        prop_assert_eq!(device_refs(&items), configured);
    }
}

#[test]
fn scenario_exact_match() {
    let binder = ControllerBinder::new(["MyBoard # / SN-1234567890"]);
    let mut items = items(&["MyBoard # / SN-1234567890".to_string()]);

    let bindings = binder.analyze_bindings(&items, &[]);
    apply_auto_binding(&mut items, &bindings);

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].status, ControllerBindingStatus::Match);
    assert_eq!(items[0].device_ref, "MyBoard # / SN-1234567890");
}

#[test]
fn scenario_new_serial_auto_binds() {
    let binder = ControllerBinder::new(["X1-Pro # / SN-NEW456"]);
    let mut items = items(&["X1-Pro # / SN-OLD123".to_string()]);

    let bindings = binder.analyze_bindings(&items, &[]);
    apply_auto_binding(&mut items, &bindings);

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].status, ControllerBindingStatus::AutoBind);
    assert_eq!(items[0].device_ref, "X1-Pro # / SN-NEW456");
}

#[test]
fn scenario_two_configured_one_live_requires_manual_bind() {
    let binder = ControllerBinder::new(["Joystick X # / JS-111111"]);
    let configured = vec![
        "Joystick X # / JS-222222".to_string(),
        "Joystick X # / JS-333333".to_string(),
    ];
    let mut items = items(&configured);

    let bindings = binder.analyze_bindings(&items, &[]);
    apply_auto_binding(&mut items, &bindings);

    assert_eq!(bindings.len(), 2);
    assert!(
        bindings
            .iter()
            .all(|b| b.status == ControllerBindingStatus::RequiresManualBind)
    );
    assert_eq!(device_refs(&items), configured);
}

#[test]
fn scenario_two_live_candidates_require_manual_bind_even_with_same_serial() {
    let binder = ControllerBinder::new(["Board # / SN-1", "Board # / SN-2"]);
    let items = items(&["Board #/ SN-2".to_string()]);

    let bindings = binder.analyze_bindings(&items, &[]);

    assert_eq!(bindings[0].status, ControllerBindingStatus::RequiresManualBind);
}
