//! Runtime: lifecycle, event dispatch and the public machine handle.

mod dispatch;
pub mod error;
mod machine;

pub use error::{ActionPhase, DispatchError, RunLevelError};
pub use machine::{MachineBuilder, StateMachine};
