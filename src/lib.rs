//! Hierarch: a hierarchical state machine engine
//!
//! States form a UML-style composite tree. An event is handled by the
//! nearest state, walking up from the current one, that defines a
//! transition for it; the engine then runs exit actions up to the least
//! common ancestor of source and target, the transition action, and entry
//! actions down to the target and through its default children.
//!
//! The tree is planned purely and executed imperatively: dispatch first
//! computes the full action sequence from the immutable tree, then runs it,
//! and only moves the state pointer once every action has succeeded.
//!
//! # Core Concepts
//!
//! - **States and events**: string names, see [`StateName`] and [`Event`]
//! - **Transitions**: external, internal and guarded, see [`Transition`]
//! - **Actions and guards**: fallible host callbacks, see [`Action`], [`Guard`]
//! - **Run levels**: configure, finalize, then switch on and off, see [`RunLevel`]
//! - **Observers**: notified of every applied transition, see [`TransitionObserver`]
//!
//! # Example
//!
//! ```rust
//! use hierarch::{name_enum, Action, StateMachine, Transition};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! name_enum! {
//!     enum Door {
//!         Door,
//!         Closed,
//!         Open,
//!     }
//! }
//!
//! let openings = Arc::new(AtomicUsize::new(0));
//! let counter = openings.clone();
//!
//! let mut door = StateMachine::<()>::configure("door");
//! let root = door.new_state(Door::Door).unwrap();
//! let closed = door.new_state(Door::Closed).unwrap();
//! let open = door.new_state(Door::Open).unwrap();
//! door.add_children(root, [closed, open]).unwrap();
//! door.add_transitions(closed, [Transition::external("Push", Door::Open)]).unwrap();
//! door.add_transitions(open, [Transition::external("Pull", Door::Closed)]).unwrap();
//! door.add_entry_actions(open, [Action::new(move |_: &()| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! })]).unwrap();
//! door.finalize().unwrap();
//!
//! door.on().unwrap();
//! door.inject("Push", &()).unwrap();
//! door.inject("Pull", &()).unwrap();
//! door.inject("Push", &()).unwrap();
//!
//! assert_eq!(door.current_state(), "Open");
//! assert_eq!(openings.load(Ordering::SeqCst), 2);
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod observer;

// Re-export commonly used types
pub use crate::builder::{ConfigError, StateId, Transition, TreeViolation};
pub use crate::core::{Action, Event, Guard, RunLevel, StateHistory, StateName, StateTransition};
pub use crate::engine::{ActionPhase, DispatchError, MachineBuilder, RunLevelError, StateMachine};
pub use crate::observer::{
    AppliedTransition, HistoryObserver, LogObserver, NoopObserver, TransitionObserver,
};
