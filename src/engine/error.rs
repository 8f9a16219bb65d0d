//! Runtime errors: lifecycle sequencing and event dispatch.

use crate::core::{Event, RunLevel, StateName};
use std::fmt;
use thiserror::Error;

/// `on`/`off`/`reconfigure` called out of sequence, or a lifecycle
/// transition that failed part way.
#[derive(Debug, Error)]
pub enum RunLevelError {
    #[error("cannot start '{machine}'; it is not finalized")]
    NotFinalized { machine: String },

    #[error("'{machine}' is already on")]
    AlreadyOn { machine: String },

    #[error("cannot stop '{machine}'; it is {run_level}")]
    NotOn { machine: String, run_level: RunLevel },

    #[error("cannot inject events into '{machine}'; it is {run_level}, not started")]
    NotStarted { machine: String, run_level: RunLevel },

    #[error("'{machine}' cannot change run level from inside one of its own callbacks")]
    Reentrant { machine: String },

    #[error("{level} transition of '{machine}' failed")]
    Transition {
        machine: String,
        level: RunLevel,
        #[source]
        source: Box<DispatchError>,
    },
}

/// Which part of a transition an action belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionPhase {
    Exit,
    Transition,
    Entry,
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Exit => "exit",
            Self::Transition => "transition",
            Self::Entry => "entry",
        };
        f.write_str(phase)
    }
}

/// Failure to process an injected event.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    RunLevel(#[from] RunLevelError),

    #[error("state '{name}' not found in '{machine}'")]
    StateNotFound { machine: String, name: StateName },

    #[error("'{source_state}' and '{target}' share no ancestor in '{machine}'")]
    NoCommonAncestor {
        machine: String,
        source_state: StateName,
        target: StateName,
    },

    #[error("unhandled event in '{machine}', current state: {state}, event: {event}")]
    Unhandled {
        machine: String,
        state: StateName,
        event: Event,
    },

    #[error("guard for '{event}' in '{state}' failed")]
    Guard {
        state: StateName,
        event: Event,
        #[source]
        source: anyhow::Error,
    },

    #[error("{phase} action '{action}' of '{state}' failed on '{event}'")]
    Action {
        phase: ActionPhase,
        state: StateName,
        event: Event,
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("'{event}' is driven by on/off and cannot be injected")]
    ReservedEvent { event: Event },

    #[error("'{machine}' is already dispatching; events raised by callbacks must be injected after the current dispatch returns")]
    Reentrant { machine: String },
}

impl DispatchError {
    /// No state in the active chain handles the event. Interactive hosts
    /// usually ignore this.
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Self::Unhandled { .. })
    }

    /// The machine was not running.
    pub fn is_run_level(&self) -> bool {
        matches!(self, Self::RunLevel(_))
    }

    /// The error a host callback returned, if this failure came from one.
    pub fn callback_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Guard { source, .. } | Self::Action { source, .. } => Some(source),
            _ => None,
        }
    }
}
