//! Transition records.

use crate::core::{Action, Event, Guard, StateName};
use std::fmt;

/// A transition fired by an event on the state that declares it.
///
/// An external transition names a target state; an internal transition has
/// no target and only runs its action, leaving the active state (and every
/// entry/exit action) untouched.
///
/// # Example
///
/// ```rust
/// use hierarch::Transition;
///
/// let to_result: Transition<u8> = Transition::external("Equal", "Result")
///     .action(|_| Ok(()));
/// assert_eq!(to_result.target().map(|t| t.as_str()), Some("Result"));
///
/// let toggle: Transition<u8> = Transition::internal("Toggle")
///     .when(|flag: &u8| *flag == 1)
///     .action(|_| Ok(()));
/// assert!(toggle.is_internal());
/// assert!(toggle.has_guard());
/// ```
pub struct Transition<P> {
    trigger: Event,
    target: Option<StateName>,
    action: Option<Action<P>>,
    guard: Option<Guard<P>>,
}

impl<P> Transition<P> {
    /// A transition from the declaring state to `target`.
    pub fn external(trigger: impl Into<Event>, target: impl Into<StateName>) -> Self {
        Self {
            trigger: trigger.into(),
            target: Some(target.into()),
            action: None,
            guard: None,
        }
    }

    /// A transition that runs its action without changing state.
    pub fn internal(trigger: impl Into<Event>) -> Self {
        Self {
            trigger: trigger.into(),
            target: None,
            action: None,
            guard: None,
        }
    }

    /// Set the transition action, replacing any previous one.
    pub fn action<F>(mut self, callback: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action = Some(Action::new(callback));
        self
    }

    /// Set a pre-built (possibly labelled) action.
    pub fn with_action(mut self, action: Action<P>) -> Self {
        self.action = Some(action);
        self
    }

    /// Guard the transition with a fallible predicate.
    pub fn guard<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Guard the transition with a predicate that cannot fail.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::when(predicate));
        self
    }

    pub fn trigger(&self) -> &Event {
        &self.trigger
    }

    pub fn target(&self) -> Option<&StateName> {
        self.target.as_ref()
    }

    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }

    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    pub(crate) fn action_ref(&self) -> Option<&Action<P>> {
        self.action.as_ref()
    }

    pub(crate) fn guard_ref(&self) -> Option<&Guard<P>> {
        self.guard.as_ref()
    }
}

impl<P> fmt::Debug for Transition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("trigger", &self.trigger)
            .field("target", &self.target)
            .field("action", &self.action)
            .field("guard", &self.guard)
            .finish()
    }
}
