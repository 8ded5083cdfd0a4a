// Reconciliation loop
//
// The ExecutionManager owns the loaded project and ties the services together: a
// periodic tick executes every active output item, a slower frontend tick drains the
// result map, input events are dispatched from any thread, and frontend commands mutate
// the project. Everything observable leaves through the MessageBus.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use indexmap::IndexSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::messages::{
    BulkAction, Command, ExecutionAction, FileAction, Message, MessageBus, Notification,
    NotificationEvent,
};
use crate::metrics::Metrics;
use crate::models::binding::{ControllerBinding, ControllerBindingStatus};
use crate::models::config_item::{ConfigItem, ItemKind, SourceKind};
use crate::models::device::extract_device_name;
use crate::models::project::Project;
use crate::models::settings::ExecutionSettings;
use crate::services::backend::{Backends, connected_controllers};
use crate::services::binding::ControllerBindingService;
use crate::services::executor::{ExecutionError, ItemExecutor, ValueLookup};
use crate::services::input::{InputDispatcher, InputEvent};
use crate::state::{ResultMap, StateManager};

/// Drives a project against the simulator and hardware backends.
///
/// Cheap to clone; clones share the project, the result map, the state and the bus.
#[derive(Clone)]
pub struct ExecutionManager {
    project: Arc<RwLock<Project>>,
    results: Arc<ResultMap>,
    executor: ItemExecutor,
    dispatcher: InputDispatcher,
    binding_service: ControllerBindingService,
    state: StateManager,
    bus: MessageBus,
    metrics: Arc<Metrics>,
    settings: ExecutionSettings,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl ExecutionManager {
    pub fn new(backends: Backends, bus: MessageBus, settings: ExecutionSettings) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            project: Arc::new(RwLock::new(Project::default())),
            results: Arc::new(ResultMap::new()),
            binding_service: ControllerBindingService::new(backends.inventory.clone()),
            executor: ItemExecutor::new(backends.clone()),
            dispatcher: InputDispatcher::new(backends),
            state: StateManager::new(),
            bus,
            metrics: Arc::new(Metrics::new()),
            settings,
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn results(&self) -> &ResultMap {
        &self.results
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn backends(&self) -> &Backends {
        self.executor.backends()
    }

    fn read_project(&self) -> Result<RwLockReadGuard<'_, Project>, ExecutionError> {
        self.project
            .read()
            .map_err(|_| ExecutionError::LockPoisoned("project"))
    }

    fn write_project(&self) -> Result<RwLockWriteGuard<'_, Project>, ExecutionError> {
        self.project
            .write()
            .map_err(|_| ExecutionError::LockPoisoned("project"))
    }

    /// Clone of the loaded project.
    pub fn project_snapshot(&self) -> Project {
        self.project
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the loaded project. Pending results of the old project are discarded.
    pub fn load_project(&self, project: Project) -> Result<(), ExecutionError> {
        tracing::info!(
            "Loading project \"{}\" ({} config file(s))",
            project.name,
            project.config_files.len()
        );
        *self.write_project()? = project;
        self.results.clear();
        self.state.update(|state| {
            state.active_file_index = 0;
            state.has_changed = false;
        });

        if self.settings.auto_bind_on_load {
            self.perform_auto_binding()?;
        }
        self.publish_connected_controllers();
        Ok(())
    }

    // Loop

    /// One reconciliation tick. Does nothing unless the loop is started.
    ///
    /// Items run in file order on a snapshot; each item sees the values its predecessors
    /// produced in this tick. The resulting value and status are written back by GUID.
    /// Returns the number of executed items.
    pub fn execute_config(&self) -> Result<usize, ExecutionError> {
        if !self.state.is_running() {
            return Ok(0);
        }

        let started = Instant::now();
        let (mut items, mut values) = {
            let project = self.read_project()?;
            let items: Vec<ConfigItem> = project
                .items()
                .filter(|item| item.active && !item.is_input())
                .cloned()
                .collect();
            (items, value_lookup(&project))
        };

        // Device writes run without the project lock so input dispatch is not held up
        for item in items.iter_mut() {
            if let Err(err) = self.executor.execute(item, &values, &self.results) {
                tracing::warn!("{} in \"{}\"", err, item.name);
                self.metrics.record_item_error();
            }
            values.insert(item.guid.clone(), item.value.clone());
        }
        let executed = items.len();

        let mut project = self.write_project()?;
        for item in items {
            // Items removed by a command during the tick are gone for good
            if let Some(current) = project.find_mut(&item.guid) {
                current.status = item.status;
                current.value = item.value;
                current.raw_value = item.raw_value;
            }
        }
        drop(project);

        self.metrics.record_tick(executed, started.elapsed());
        Ok(executed)
    }

    /// Publish everything executed since the last drain.
    pub fn frontend_update(&self) -> usize {
        let drained = self.results.drain();
        let count = drained.len();
        self.metrics.record_drain(count);

        if count > 0 {
            let mut config_items: Vec<ConfigItem> = drained.into_values().collect();
            config_items.sort_by(|a, b| a.guid.cmp(&b.guid));
            self.bus.publish(Message::ConfigValuePartialUpdate { config_items });
        }
        count
    }

    /// Entry point for hardware input. Safe to call from any thread.
    pub fn on_input_event(&self, event: &InputEvent) -> Result<usize, ExecutionError> {
        self.metrics.record_input_event();
        let is_started = self.state.is_running();

        let mut project = self.write_project()?;
        let values = value_lookup(&project);
        let dispatched = self
            .dispatcher
            .dispatch(event, project.items_mut(), &values, is_started);
        drop(project);

        let count = dispatched.len();
        self.results.extend(dispatched);
        Ok(count)
    }

    /// Run the tick and the frontend drain on their own intervals until [`shutdown`](Self::shutdown).
    ///
    /// A loop level error stops execution and is published as [`Message::LoopFault`];
    /// the task itself keeps running so execution can be started again.
    pub fn spawn(&self) -> JoinHandle<()> {
        let manager = self.clone();
        let mut cancel_rx = self.cancel_tx.subscribe();

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(manager.settings.tick_interval());
            let mut frontend = tokio::time::interval(manager.settings.frontend_interval());
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            frontend.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                "Execution loop running: tick={:?}, frontend={:?}",
                manager.settings.tick_interval(),
                manager.settings.frontend_interval()
            );

            while !*cancel_rx.borrow() {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tick.tick() => {
                        if let Err(err) = manager.execute_config() {
                            manager.loop_fault(err);
                        }
                    }
                    _ = frontend.tick() => {
                        manager.frontend_update();
                    }
                }
            }

            // Whatever the last ticks produced still reaches the frontend
            manager.frontend_update();
            tracing::info!("Execution loop stopped");
        })
    }

    /// Stop execution and end the spawned loop task.
    pub fn shutdown(&self) {
        tracing::info!("Shutdown requested");
        self.stop();
        self.stop_test_mode();
        self.cancel_tx.send_replace(true);
    }

    fn loop_fault(&self, err: ExecutionError) {
        tracing::error!("Execution loop fault: {}", err);
        self.metrics.record_loop_fault();
        self.bus.publish(Message::LoopFault {
            message: err.to_string(),
        });
        self.stop();
    }

    // Run and test state

    /// Start ticking. Leaves test mode first. Idempotent.
    pub fn start(&self) {
        if self.state.is_testing() {
            self.stop_test_mode();
        }
        if self.state.start_execution().is_empty() {
            return;
        }
        tracing::info!("Execution started");
        self.publish_execution_state();
    }

    /// Stop ticking. Results already produced stay in the map for the next drain.
    pub fn stop(&self) {
        if self.state.stop_execution().is_empty() {
            return;
        }
        tracing::info!("Execution stopped");
        self.publish_execution_state();
    }

    /// Enter test mode, driving `guid`'s device with its test value if given.
    pub fn start_test_mode(&self, guid: Option<String>) -> Result<(), ExecutionError> {
        let item = match &guid {
            Some(guid) => Some(
                self.read_project()?
                    .find(guid)
                    .cloned()
                    .ok_or_else(|| ExecutionError::UnknownConfigItem(guid.clone()))?,
            ),
            None => None,
        };

        let previous = self.state.read(|state| state.test_item.clone());
        self.state.start_test_mode(guid.clone())?;

        if let Some(previous) = previous
            && Some(&previous) != guid.as_ref()
        {
            self.test_item_off(&previous);
        }

        if let Some(item) = &item {
            tracing::info!("Testing \"{}\"", item.name);
            if let Err(err) = self.executor.execute_test_on(item) {
                tracing::error!("Test mode failed for \"{}\": {}", item.name, err);
                let mut notification = Notification::new(NotificationEvent::TestModeException)
                    .with_context("Name", item.name.clone())
                    .with_context("Message", err.to_string());
                notification.guid = Some(item.guid.clone());
                self.bus.publish(Message::Notification(notification));
            }
        }

        self.publish_execution_state();
        Ok(())
    }

    /// Leave test mode and return the tested device to idle. Idempotent.
    pub fn stop_test_mode(&self) {
        if let Some(guid) = self.state.read(|state| state.test_item.clone()) {
            self.test_item_off(&guid);
        }
        if !self.state.stop_test_mode().is_empty() {
            self.publish_execution_state();
        }
    }

    fn test_item_off(&self, guid: &str) {
        let item = match self.read_project() {
            Ok(project) => project.find(guid).cloned(),
            Err(err) => {
                tracing::error!("{}", err);
                return;
            }
        };
        if let Some(item) = item
            && let Err(err) = self.executor.execute_test_off(&item)
        {
            tracing::warn!("Could not reset \"{}\": {}", item.name, err);
        }
    }

    fn publish_execution_state(&self) {
        let state = self.state.snapshot();
        self.bus.publish(Message::ExecutionState {
            is_running: state.is_running,
            is_testing: state.is_testing,
            run_available: !state.is_running,
            test_available: !state.is_running,
        });
    }

    /// Names of the variables the active config file reads or writes, first use first.
    ///
    /// Output items with a variable source and input actions that target a variable
    /// both count. Follows [`Command::ActiveConfigFile`].
    pub fn available_variables(&self) -> Result<Vec<String>, ExecutionError> {
        let index = self.state.read(|state| state.active_file_index);
        let project = self.read_project()?;
        let Some(file) = project.config_files.get(index) else {
            return Ok(Vec::new());
        };

        let mut names = IndexSet::new();
        for item in &file.items {
            match &item.kind {
                ItemKind::Output(output) => {
                    if let Some(source) = &output.source
                        && source.kind == SourceKind::Variable
                    {
                        names.insert(source.path.clone());
                    }
                }
                ItemKind::Input(input) => {
                    names.extend(
                        input
                            .device
                            .actions()
                            .filter(|action| action.target == SourceKind::Variable)
                            .map(|action| action.command.trim().to_string()),
                    );
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    // Bindings

    /// Project-wide binding analysis, nothing is modified.
    pub fn analyze_bindings(&self) -> Result<Vec<ControllerBinding>, ExecutionError> {
        let project = self.read_project()?;
        Ok(self.binding_service.analyze_project_bindings(&project))
    }

    /// Auto bind every file and notify the frontend about the outcome.
    pub fn perform_auto_binding(&self) -> Result<Vec<ControllerBinding>, ExecutionError> {
        let bindings = {
            let mut project = self.write_project()?;
            self.binding_service.perform_auto_binding(&mut project)
        };

        for notification in binding_notifications(&bindings) {
            self.bus.publish(Message::Notification(notification));
        }
        if bindings
            .iter()
            .any(|binding| binding.status == ControllerBindingStatus::AutoBind)
        {
            self.project_changed();
        }
        Ok(bindings)
    }

    /// Apply bindings confirmed by the user.
    pub fn update_controller_bindings(
        &self,
        bindings: Vec<ControllerBinding>,
    ) -> Result<(), ExecutionError> {
        tracing::info!("Applying {} controller binding(s)", bindings.len());
        {
            let mut project = self.write_project()?;
            self.binding_service
                .update_controller_bindings(&mut project, bindings);
        }
        self.project_changed();
        Ok(())
    }

    pub fn publish_connected_controllers(&self) {
        let controllers = connected_controllers(self.backends().inventory.as_ref());
        tracing::debug!("{} controller(s) connected", controllers.len());
        self.bus.publish(Message::ConnectedControllers { controllers });
    }

    // Commands

    /// Apply a frontend command. Invalid commands leave the project unchanged.
    pub fn handle_command(&self, command: Command) -> Result<(), ExecutionError> {
        tracing::debug!("Handling command {:?}", command);

        match command {
            Command::ConfigBulkAction { action, items } => self.bulk_action(action, &items),
            Command::ResortConfigItem {
                items,
                source_file_index,
                target_file_index,
                new_index,
            } => self.resort_items(&items, source_file_index, target_file_index, new_index),
            Command::ActiveConfigFile { index } => self.set_active_file(index),
            Command::FileContextMenu {
                action,
                index,
                label,
            } => self.file_action(action, index, label),
            Command::ControllerBindingsUpdate { bindings } => {
                self.update_controller_bindings(bindings)
            }
            Command::ExecutionControl { action, item } => match action {
                ExecutionAction::Start => {
                    self.start();
                    Ok(())
                }
                ExecutionAction::Stop => {
                    self.stop();
                    Ok(())
                }
                ExecutionAction::TestStart => self.start_test_mode(item),
                ExecutionAction::TestStop => {
                    self.stop_test_mode();
                    Ok(())
                }
            },
        }
    }

    fn bulk_action(&self, action: BulkAction, guids: &[String]) -> Result<(), ExecutionError> {
        {
            let mut project = self.write_project()?;
            match action {
                BulkAction::Delete => {
                    for file in project.config_files.iter_mut() {
                        file.items.retain(|item| !guids.contains(&item.guid));
                    }
                }
                BulkAction::Toggle => {
                    let any_active = project
                        .items()
                        .any(|item| item.active && guids.contains(&item.guid));
                    set_active(&mut project, guids, !any_active);
                }
                BulkAction::Activate => set_active(&mut project, guids, true),
                BulkAction::Deactivate => set_active(&mut project, guids, false),
            }
        }

        tracing::info!("Bulk action {:?} on {} item(s)", action, guids.len());
        self.project_changed();
        Ok(())
    }

    fn resort_items(
        &self,
        guids: &[String],
        source: usize,
        target: usize,
        new_index: usize,
    ) -> Result<(), ExecutionError> {
        {
            let mut project = self.write_project()?;
            let file_count = project.config_files.len();
            for index in [source, target] {
                if index >= file_count {
                    return Err(ExecutionError::UnknownConfigFile(index));
                }
            }

            let source_file = &project.config_files[source];
            if let Some(missing) = guids.iter().find(|guid| source_file.find(guid).is_none()) {
                return Err(ExecutionError::UnknownConfigItem(missing.clone()));
            }

            let mut moved = Vec::with_capacity(guids.len());
            for guid in guids {
                let items = &mut project.config_files[source].items;
                if let Some(position) = items.iter().position(|item| &item.guid == guid) {
                    moved.push(items.remove(position));
                }
            }

            let items = &mut project.config_files[target].items;
            let index = new_index.min(items.len());
            items.splice(index..index, moved);
        }

        tracing::debug!(
            "Moved {} item(s) from file {} to file {} at {}",
            guids.len(),
            source,
            target,
            new_index
        );
        self.project_changed();
        Ok(())
    }

    fn set_active_file(&self, index: usize) -> Result<(), ExecutionError> {
        if index >= self.read_project()?.config_files.len() {
            return Err(ExecutionError::UnknownConfigFile(index));
        }
        self.state.set_active_file(index);
        Ok(())
    }

    fn file_action(
        &self,
        action: FileAction,
        index: usize,
        label: Option<String>,
    ) -> Result<(), ExecutionError> {
        {
            let mut project = self.write_project()?;
            if index >= project.config_files.len() {
                return Err(ExecutionError::UnknownConfigFile(index));
            }

            match action {
                FileAction::Remove => {
                    let removed = project.config_files.remove(index);
                    tracing::info!("Removed config file \"{}\"", removed.label);
                    let remaining = project.config_files.len();
                    self.state.update(|state| {
                        if state.active_file_index >= remaining {
                            state.active_file_index = remaining.saturating_sub(1);
                        }
                    });
                }
                FileAction::Rename => {
                    let Some(label) = label else {
                        tracing::warn!("Rename of config file {} without a label", index);
                        return Ok(());
                    };
                    project.config_files[index].label = label;
                }
            }
        }

        self.project_changed();
        Ok(())
    }

    fn project_changed(&self) {
        self.state.mark_changed();
        self.bus.publish(Message::ProjectStatus { has_changed: true });
    }
}

fn set_active(project: &mut Project, guids: &[String], active: bool) {
    for item in project
        .items_mut()
        .filter(|item| guids.contains(&item.guid))
    {
        item.active = active;
    }
}

/// Current value of every item in the project.
fn value_lookup(project: &Project) -> ValueLookup {
    project
        .items()
        .map(|item| (item.guid.clone(), item.value.clone()))
        .collect::<HashMap<_, _>>()
}

/// Notifications describing the outcome of an auto binding run.
pub fn binding_notifications(bindings: &[ControllerBinding]) -> Vec<Notification> {
    let mut notifications = Vec::new();

    let auto_bound: Vec<&ControllerBinding> = bindings
        .iter()
        .filter(|binding| binding.status == ControllerBindingStatus::AutoBind)
        .collect();
    if !auto_bound.is_empty() {
        let names: Vec<&str> = auto_bound
            .iter()
            .filter_map(|binding| binding.bound_controller.as_deref())
            .map(extract_device_name)
            .collect();
        notifications.push(
            Notification::new(NotificationEvent::ControllerAutoBindSuccessful)
                .with_context("Count", auto_bound.len().to_string())
                .with_context("Controllers", names.join(", ")),
        );
    }

    let manual: Vec<&ControllerBinding> = bindings
        .iter()
        .filter(|binding| binding.status == ControllerBindingStatus::RequiresManualBind)
        .collect();
    if !manual.is_empty() {
        let mut names: Vec<&str> = Vec::new();
        for binding in &manual {
            let name = extract_device_name(&binding.original_controller);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        notifications.push(
            Notification::new(NotificationEvent::ControllerManualBindRequired)
                .with_context("Count", manual.len().to_string())
                .with_context("Controllers", names.join(", ")),
        );
    }

    notifications
}
