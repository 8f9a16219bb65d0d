//! Configuration errors for the state tree builder and finalizer.

use crate::core::{Event, RunLevel, StateName};
use thiserror::Error;

/// Errors raised while declaring or finalizing a state tree.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("state machine '{machine}' is {run_level}; states can only be configured while initializing")]
    Sealed { machine: String, run_level: RunLevel },

    #[error("state '{name}' is already defined in '{machine}'")]
    DuplicateState { machine: String, name: StateName },

    #[error("'{name}' is reserved for the top pseudo-state")]
    Reserved { name: String },

    #[error("state handle does not belong to the current configuration of '{machine}'")]
    UnknownState { machine: String },

    #[error("state '{child}' already has parent '{parent}'; re-parenting is not supported")]
    AlreadyParented { child: StateName, parent: StateName },

    #[error("attaching '{name}' there would make it its own ancestor")]
    Cycle { name: StateName },

    #[error("invalid state tree in '{machine}': {}", list(.violations))]
    InvalidTree {
        machine: String,
        violations: Vec<TreeViolation>,
    },
}

impl ConfigError {
    /// Structural violations reported by `finalize`, empty for other errors.
    pub fn violations(&self) -> &[TreeViolation] {
        match self {
            Self::InvalidTree { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// A structural problem found by `finalize`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TreeViolation {
    #[error("no top state found")]
    NoTopState,

    #[error("multiple top states: {}", names_list(.names))]
    MultipleTopStates { names: Vec<StateName> },

    #[error("transition on '{event}' in '{state}' targets unknown state '{target}'")]
    UnknownTarget {
        state: StateName,
        event: Event,
        target: StateName,
    },
}

fn list(violations: &[TreeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn names_list(names: &[StateName]) -> String {
    names
        .iter()
        .map(StateName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
