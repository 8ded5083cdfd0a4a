// State management module
//
// This module provides the StateManager which wraps ExecutionState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the frontend and the loop task.

pub mod results;

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::services::executor::ExecutionError;

pub use results::ResultMap;

/// Run state of the reconciliation engine.
///
/// `is_running` and `is_testing` are never both true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    pub is_running: bool,
    pub is_testing: bool,
    /// GUID of the item under test, if any
    pub test_item: Option<String>,
    pub active_file_index: usize,
    /// Project modified since load
    pub has_changed: bool,
}

/// Change events emitted when state is modified
///
/// These events let the frontend bridge and the loop task react to state changes
/// without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The reconciliation loop started ticking
    ExecutionStarted,

    /// The reconciliation loop stopped
    ExecutionStopped,

    /// Test mode entered for an item
    TestModeStarted { item: Option<String> },

    /// Test mode left
    TestModeStopped,

    /// The selected config file changed
    ActiveFileChanged { index: usize },

    /// The project's modified flag changed
    ProjectChanged { has_changed: bool },
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`ExecutionState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Validates run/test transitions
/// - Supports subscribing to state changes via tokio broadcast channels
pub struct StateManager {
    /// The execution state protected by RwLock for thread-safe access
    state: Arc<RwLock<ExecutionState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(ExecutionState::default())),
            state_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> ExecutionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let running = state_manager.read(|state| state.is_running);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ExecutionState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn is_running(&self) -> bool {
        self.read(|state| state.is_running)
    }

    pub fn is_testing(&self) -> bool {
        self.read(|state| state.is_testing)
    }

    /// Update the state and emit change events
    ///
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// Returns the events that were emitted.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut ExecutionState),
    {
        match self.try_update(|state| {
            update_fn(state);
            Ok::<(), std::convert::Infallible>(())
        }) {
            Ok(changes) => changes,
            Err(never) => match never {},
        }
    }

    /// Like [`update`](Self::update), but the update may refuse the transition.
    ///
    /// The check and the mutation run under the same write guard. On `Err` the state is
    /// left as it was and nothing is emitted.
    pub fn try_update<F, E>(&self, update_fn: F) -> Result<Vec<StateChange>, E>
    where
        F: FnOnce(&mut ExecutionState) -> Result<(), E>,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        if let Err(e) = update_fn(&mut state) {
            *state = old_state;
            return Err(e);
        }

        let changes = self.detect_changes(&old_state, &state);

        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        Ok(changes)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(&self, old: &ExecutionState, new: &ExecutionState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        // Test mode is reported first so a run start reads as "test stopped, run started"
        if old.is_testing != new.is_testing || (new.is_testing && old.test_item != new.test_item) {
            if new.is_testing {
                changes.push(StateChange::TestModeStarted {
                    item: new.test_item.clone(),
                });
            } else {
                changes.push(StateChange::TestModeStopped);
            }
        }

        if old.is_running != new.is_running {
            if new.is_running {
                changes.push(StateChange::ExecutionStarted);
            } else {
                changes.push(StateChange::ExecutionStopped);
            }
        }

        if old.active_file_index != new.active_file_index {
            changes.push(StateChange::ActiveFileChanged {
                index: new.active_file_index,
            });
        }

        if old.has_changed != new.has_changed {
            changes.push(StateChange::ProjectChanged {
                has_changed: new.has_changed,
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Enter the running state, leaving test mode if it was active. Idempotent.
    pub fn start_execution(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_testing = false;
            state.test_item = None;
            state.is_running = true;
        })
    }

    /// Leave the running state. Idempotent.
    pub fn stop_execution(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_running = false;
        })
    }

    /// Enter test mode. Rejected while the loop is running.
    pub fn start_test_mode(&self, item: Option<String>) -> Result<Vec<StateChange>, ExecutionError> {
        self.try_update(|state| {
            if state.is_running {
                return Err(ExecutionError::InvalidTransition(
                    "test mode is not available while running".to_string(),
                ));
            }
            state.is_testing = true;
            state.test_item = item;
            Ok(())
        })
    }

    pub fn stop_test_mode(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_testing = false;
            state.test_item = None;
        })
    }

    pub fn set_active_file(&self, index: usize) -> Vec<StateChange> {
        self.update(|state| state.active_file_index = index)
    }

    pub fn mark_changed(&self) -> Vec<StateChange> {
        self.update(|state| state.has_changed = true)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across tasks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(!state.is_running);
        assert!(!state.is_testing);
        assert_eq!(state.active_file_index, 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let manager = StateManager::new();

        let first = manager.start_execution();
        let second = manager.start_execution();

        assert_eq!(first, vec![StateChange::ExecutionStarted]);
        assert!(second.is_empty());
        assert!(manager.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let manager = StateManager::new();
        manager.start_execution();

        assert_eq!(manager.stop_execution(), vec![StateChange::ExecutionStopped]);
        assert!(manager.stop_execution().is_empty());
    }

    #[test]
    fn test_start_leaves_test_mode() {
        let manager = StateManager::new();
        manager.start_test_mode(Some("guid".into())).unwrap();

        let changes = manager.start_execution();

        assert_eq!(changes, vec![StateChange::TestModeStopped, StateChange::ExecutionStarted]);
        let state = manager.snapshot();
        assert!(state.is_running && !state.is_testing);
    }

    #[test]
    fn test_test_mode_rejected_while_running() {
        let manager = StateManager::new();
        manager.start_execution();

        let result = manager.start_test_mode(None);

        assert!(matches!(result, Err(ExecutionError::InvalidTransition(_))));
        assert!(!manager.is_testing());
    }

    #[test]
    fn test_rejected_update_keeps_state_and_emits_nothing() {
        let manager = StateManager::new();
        manager.start_execution();
        let mut rx = manager.subscribe();

        let result = manager.try_update(|state| {
            state.is_testing = true;
            Err::<(), _>("refused")
        });

        assert_eq!(result, Err("refused"));
        assert!(!manager.is_testing());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_active_file_and_project_changes() {
        let manager = StateManager::new();

        assert_eq!(manager.set_active_file(2), vec![StateChange::ActiveFileChanged { index: 2 }]);
        assert_eq!(manager.mark_changed(), vec![StateChange::ProjectChanged { has_changed: true }]);
        assert!(manager.mark_changed().is_empty());
    }

    #[test]
    fn test_subscribe_to_changes() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        manager.start_execution();

        assert_eq!(rx.try_recv().unwrap(), StateChange::ExecutionStarted);
    }

    #[test]
    fn test_multiple_subscribers() {
        let manager = StateManager::new();
        let mut rx1 = manager.subscribe();
        let mut rx2 = manager.subscribe();

        manager.start_test_mode(None).unwrap();

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_clone_state_manager() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.set_active_file(1);

        assert_eq!(manager2.snapshot().active_file_index, 1);
    }
}
