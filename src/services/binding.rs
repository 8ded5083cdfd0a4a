use std::sync::Arc;

use crate::models::binding::{ControllerBinding, ControllerBindingStatus};
use crate::models::project::Project;
use crate::services::backend::{DeviceInventory, connected_references};
use crate::services::binder::{ControllerBinder, apply_auto_binding, apply_binding_update};

/// Runs the identity resolver across every config file of a project.
///
/// Files are processed in order, each against the full connected set. Auto bindings
/// applied in one file are threaded into the next, so a reference rebound in file N keeps
/// its device in file N+1. The project-wide list keeps the first result per original
/// reference.
#[derive(Clone)]
pub struct ControllerBindingService {
    inventory: Arc<dyn DeviceInventory>,
}

impl ControllerBindingService {
    pub fn new(inventory: Arc<dyn DeviceInventory>) -> Self {
        Self { inventory }
    }

    fn binder(&self) -> ControllerBinder {
        ControllerBinder::new(connected_references(self.inventory.as_ref()))
    }

    /// Project-wide bindings without touching any item.
    pub fn analyze_project_bindings(&self, project: &Project) -> Vec<ControllerBinding> {
        let binder = self.binder();
        let mut all = Vec::new();
        let mut carried = Vec::new();

        for file in &project.config_files {
            let results = binder.analyze_bindings(&file.items, &carried);
            let mappings: Vec<ControllerBinding> = results
                .iter()
                .filter(|binding| binding.status == ControllerBindingStatus::AutoBind)
                .cloned()
                .collect();
            carry_forward(&mut carried, mappings);
            merge_first_wins(&mut all, results);
        }

        all
    }

    /// Resolve and apply auto bindings to every file. The result becomes the project's
    /// binding snapshot.
    pub fn perform_auto_binding(&self, project: &mut Project) -> Vec<ControllerBinding> {
        let binder = self.binder();
        let mut all = Vec::new();
        let mut carried = Vec::new();

        for file in project.config_files.iter_mut() {
            let results = binder.analyze_bindings(&file.items, &carried);
            let applied = apply_auto_binding(&mut file.items, &results);
            if !applied.is_empty() {
                tracing::info!("Auto bound {} controller(s) in \"{}\"", applied.len(), file.label);
            }
            carry_forward(&mut carried, applied);
            merge_first_wins(&mut all, results);
        }

        project.controller_bindings = all.clone();
        all
    }

    /// Apply user confirmed bindings verbatim to every file.
    pub fn update_controller_bindings(&self, project: &mut Project, bindings: Vec<ControllerBinding>) {
        for file in project.config_files.iter_mut() {
            apply_binding_update(&mut file.items, &bindings);
        }
        project.controller_bindings = bindings;
    }
}

/// Keep applied auto bindings for the next file, one per device.
fn carry_forward(carried: &mut Vec<ControllerBinding>, mappings: Vec<ControllerBinding>) {
    for binding in mappings {
        let Some(bound) = binding.bound_controller.as_deref() else {
            continue;
        };
        if carried
            .iter()
            .any(|existing| existing.bound_controller.as_deref() == Some(bound))
        {
            continue;
        }
        carried.push(binding);
    }
}

fn merge_first_wins(all: &mut Vec<ControllerBinding>, results: Vec<ControllerBinding>) {
    for binding in results {
        if all
            .iter()
            .any(|existing| existing.original_controller == binding.original_controller)
        {
            continue;
        }
        all.push(binding);
    }
}
