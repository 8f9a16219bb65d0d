//! State and event names.
//!
//! States and events are identified by opaque, comparable names. Both are
//! thin wrappers over `Cow<'static, str>` so that names written as string
//! literals never allocate, while names built at runtime still work.

use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::fmt;

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            /// Create a name from a string literal without allocating.
            pub const fn from_static(name: &'static str) -> Self {
                Self(Cow::Borrowed(name))
            }

            /// View the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:?}", self.as_str())
            }
        }

        impl From<&'static str> for $name {
            fn from(name: &'static str) -> Self {
                Self::from_static(name)
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(Cow::Owned(name))
            }
        }

        impl From<&$name> for $name {
            fn from(name: &$name) -> Self {
                name.clone()
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }
    };
}

name_type! {
    /// Unique name of a state within one machine.
    StateName
}

name_type! {
    /// A stimulus injected into the machine.
    Event
}

impl StateName {
    /// The synthetic pseudo-state created by `finalize` to wrap the
    /// user's top-level state.
    pub const TOP: StateName = StateName::from_static("TopState");

    /// Whether this name is reserved for the top pseudo-state machinery.
    pub fn is_reserved(&self) -> bool {
        *self == Self::TOP
    }
}

impl Event {
    /// Drives the default entry chain when the machine is turned on.
    pub const INITIAL: Event = Event::from_static("InitialTransition");

    /// Drives the exit chain back to the top pseudo-state when the machine
    /// is turned off.
    pub const EXIT: Event = Event::from_static("ExitTransition");

    /// Whether this event is one of the internal pseudo events.
    pub fn is_reserved(&self) -> bool {
        *self == Self::INITIAL || *self == Self::EXIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn static_and_owned_names_compare_equal() {
        let borrowed = StateName::from_static("Operand1");
        let owned = StateName::from(String::from("Operand1"));
        assert_eq!(borrowed, owned);
        assert_eq!(borrowed, "Operand1");
    }

    #[test]
    fn names_can_be_looked_up_by_str() {
        let mut table = HashMap::new();
        table.insert(Event::from("Digit"), 1);
        assert_eq!(table.get("Digit"), Some(&1));
        assert_eq!(table.get("Equal"), None);
    }

    #[test]
    fn reserved_names_are_detected() {
        assert!(StateName::TOP.is_reserved());
        assert!(!StateName::from("On").is_reserved());
        assert!(Event::INITIAL.is_reserved());
        assert!(Event::EXIT.is_reserved());
        assert!(!Event::from("Clear").is_reserved());
    }

    #[test]
    fn names_serialize_as_plain_strings() {
        let json = serde_json::to_string(&StateName::from("Result")).unwrap();
        assert_eq!(json, "\"Result\"");
        let back: StateName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, "Result");
    }

    #[test]
    fn display_and_debug_render_the_name() {
        let event = Event::from("Operator");
        assert_eq!(event.to_string(), "Operator");
        assert_eq!(format!("{event:?}"), "\"Operator\"");
    }
}
