//! Configuration-time building blocks.
//!
//! This module provides the transition record, the composite state tree
//! with its finalizer, configuration errors, and the [`name_enum!`] macro.
//! The configuration API itself is exposed on
//! [`StateMachine`](crate::StateMachine).

pub mod error;
pub mod macros;
pub mod transition;
pub(crate) mod tree;

pub use error::{ConfigError, TreeViolation};
pub use transition::Transition;
pub use tree::StateId;
