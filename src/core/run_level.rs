//! Machine run level.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration-then-run lifecycle of a machine.
///
/// ```text
/// Initializing ──finalize──► Finalized ──on──► On ──off──► Exiting ──► Off
///                                              ▲                        │
///                                              └───────────on───────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunLevel {
    /// States and transitions may be declared.
    Initializing,
    /// The tree is validated and sealed; the machine has never run.
    Finalized,
    /// Events are dispatched.
    On,
    /// The exit chain is running; default-child descent is suppressed.
    Exiting,
    /// Stopped; `on` re-enters the default chain.
    Off,
}

impl RunLevel {
    /// Whether events may be injected.
    pub fn accepts_events(self) -> bool {
        matches!(self, Self::On | Self::Exiting)
    }

    /// Whether `on` may start the machine from this level.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Finalized | Self::Off)
    }
}

impl fmt::Display for RunLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Finalized => "finalized",
            Self::On => "on",
            Self::Exiting => "exiting",
            Self::Off => "off",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_on_and_exiting_accept_events() {
        assert!(RunLevel::On.accepts_events());
        assert!(RunLevel::Exiting.accepts_events());
        assert!(!RunLevel::Initializing.accepts_events());
        assert!(!RunLevel::Finalized.accepts_events());
        assert!(!RunLevel::Off.accepts_events());
    }

    #[test]
    fn start_is_allowed_from_finalized_and_off() {
        assert!(RunLevel::Finalized.can_start());
        assert!(RunLevel::Off.can_start());
        assert!(!RunLevel::On.can_start());
        assert!(!RunLevel::Initializing.can_start());
    }
}
