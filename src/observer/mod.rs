//! Transition observers.
//!
//! An observer is notified after each transition has been applied, while
//! the dispatch lock is still held, so notifications arrive in the same
//! order the transitions happened. Observers must not call back into the
//! machine that notifies them.

use crate::core::{Event, StateHistory, StateName, StateTransition};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A transition that completed without error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTransition {
    /// Name of the machine that applied it.
    pub machine: String,
    /// Resting state before the event.
    pub from: StateName,
    /// Resting state after the event, after default-child descent.
    pub to: StateName,
    /// The event that fired.
    pub trigger: Event,
    /// The state whose transition handled the event. This is `from` or
    /// one of its ancestors.
    pub source: StateName,
    /// Declared target; `None` for internal transitions.
    pub target: Option<StateName>,
}

impl AppliedTransition {
    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }

    /// The history record for this transition, stamped now.
    pub fn to_record(&self) -> StateTransition {
        StateTransition {
            from: self.from.clone(),
            to: self.to.clone(),
            trigger: self.trigger.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives every applied transition of a machine.
pub trait TransitionObserver<P>: Send + Sync {
    fn on_transition(&self, transition: &AppliedTransition, param: &P);
}

impl<P, F> TransitionObserver<P> for F
where
    F: Fn(&AppliedTransition, &P) + Send + Sync,
{
    fn on_transition(&self, transition: &AppliedTransition, param: &P) {
        self(transition, param)
    }
}

/// Ignores every transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl<P> TransitionObserver<P> for NoopObserver {
    fn on_transition(&self, _transition: &AppliedTransition, _param: &P) {}
}

/// Emits one `info` record per applied transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl<P> TransitionObserver<P> for LogObserver {
    fn on_transition(&self, transition: &AppliedTransition, _param: &P) {
        info!(
            machine = %transition.machine,
            from = %transition.from,
            to = %transition.to,
            event = %transition.trigger,
            internal = transition.is_internal(),
            "transition applied"
        );
    }
}

/// Records every applied transition into a [`StateHistory`].
///
/// # Example
///
/// ```rust
/// use hierarch::{HistoryObserver, StateMachine, Transition};
/// use std::sync::Arc;
///
/// let history = Arc::new(HistoryObserver::new());
/// let mut machine = StateMachine::<()>::builder("door")
///     .shared_observer(history.clone())
///     .build();
/// let door = machine.new_state("Door").unwrap();
/// let closed = machine.new_state("Closed").unwrap();
/// let open = machine.new_state("Open").unwrap();
/// machine.add_children(door, [closed, open]).unwrap();
/// machine
///     .add_transitions(closed, [Transition::external("Push", "Open")])
///     .unwrap();
/// machine.finalize().unwrap();
///
/// machine.on().unwrap();
/// machine.inject("Push", &()).unwrap();
///
/// let snapshot = history.snapshot();
/// assert_eq!(snapshot.get_path(), ["TopState", "Closed", "Open"]);
/// ```
#[derive(Debug, Default)]
pub struct HistoryObserver {
    history: Mutex<StateHistory>,
}

impl HistoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the history recorded so far.
    pub fn snapshot(&self) -> StateHistory {
        self.history.lock().clone()
    }

    pub fn clear(&self) {
        self.history.lock().clear();
    }
}

impl<P> TransitionObserver<P> for HistoryObserver {
    fn on_transition(&self, transition: &AppliedTransition, _param: &P) {
        self.history.lock().push(transition.to_record());
    }
}
