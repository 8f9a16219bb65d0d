//! Core value types of the engine.
//!
//! - State and event names, including the reserved pseudo names
//! - Action and guard callbacks supplied by the host
//! - The machine run level
//! - Transition history records

mod guard;
mod history;
mod names;
mod run_level;

pub use guard::{Action, Guard};
pub use history::{StateHistory, StateTransition};
pub use names::{Event, StateName};
pub use run_level::RunLevel;
