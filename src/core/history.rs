//! State transition history tracking.
//!
//! A [`StateHistory`] is an ordered record of applied transitions. It is
//! filled by [`HistoryObserver`](crate::observer::HistoryObserver) and is
//! serialisable so hosts can export an audit trail.

use super::names::{Event, StateName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single applied transition.
///
/// `from` and `to` are the resting states before and after the dispatch.
/// For internal transitions they are equal.
///
/// # Example
///
/// ```rust
/// use hierarch::{StateTransition, StateName, Event};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: StateName::from("Operand1"),
///     to: StateName::from("OpEntered"),
///     trigger: Event::from("Operator"),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.trigger, "Operator");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being transitioned from
    pub from: StateName,
    /// The resolved leaf state being transitioned to
    pub to: StateName,
    /// The event that fired the transition
    pub trigger: Event,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of applied transitions.
///
/// # Example
///
/// ```rust
/// use hierarch::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = StateHistory::new();
/// let history = history.record(StateTransition {
///     from: "TopState".into(),
///     to: "Off".into(),
///     trigger: "InitialTransition".into(),
///     timestamp: Utc::now(),
/// });
/// let history = history.record(StateTransition {
///     from: "Off".into(),
///     to: "Operand1".into(),
///     trigger: "OnButton".into(),
///     timestamp: Utc::now(),
/// });
///
/// let path = history.get_path();
/// assert_eq!(path.len(), 3); // TopState -> Off -> Operand1
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Append a transition in place.
    pub fn push(&mut self, transition: StateTransition) {
        self.transitions.push(transition);
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the first transition followed by the
    /// `to` state of every transition.
    pub fn get_path(&self) -> Vec<&StateName> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and the last recorded transition.
    ///
    /// Returns `None` if nothing was recorded.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// All recorded transitions in order.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}
