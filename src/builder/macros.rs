//! Macros for declaring state and event names.

/// Declare a fieldless enum whose variants name states or events.
///
/// The generated enum is `Copy`, exposes `as_str`, and converts into both
/// [`StateName`](crate::StateName) and [`Event`](crate::Event) without
/// allocating, so it can be passed anywhere a name is expected.
///
/// # Example
///
/// ```
/// use hierarch::{name_enum, StateName, Event};
///
/// name_enum! {
///     pub enum CalcState {
///         On,
///         Off,
///         Operand1,
///     }
/// }
///
/// name_enum! {
///     enum CalcEvent {
///         Digit,
///         #[name = "="]
///         Equal,
///     }
/// }
///
/// assert_eq!(StateName::from(CalcState::Operand1), "Operand1");
/// assert_eq!(Event::from(CalcEvent::Equal), "=");
/// assert_eq!(CalcEvent::Digit.as_str(), "Digit");
/// ```
#[macro_export]
macro_rules! name_enum {
    (@text $variant:ident $text:literal) => { $text };
    (@text $variant:ident) => { stringify!($variant) };

    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[name = $text:literal])?
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $($variant),*
        }

        impl $name {
            /// The name this variant stands for.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $crate::name_enum!(@text $variant $($text)?)),*
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::convert::From<$name> for $crate::StateName {
            fn from(value: $name) -> Self {
                $crate::StateName::from_static(value.as_str())
            }
        }

        impl ::core::convert::From<$name> for $crate::Event {
            fn from(value: $name) -> Self {
                $crate::Event::from_static(value.as_str())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Event, StateName};

    name_enum! {
        enum TestState {
            Initial,
            Processing,
            #[name = "done"]
            Complete,
        }
    }

    #[test]
    fn variants_convert_to_state_names() {
        assert_eq!(StateName::from(TestState::Initial), "Initial");
        assert_eq!(StateName::from(TestState::Processing), "Processing");
        assert_eq!(StateName::from(TestState::Complete), "done");
    }

    #[test]
    fn variants_convert_to_events() {
        assert_eq!(Event::from(TestState::Complete), Event::from("done"));
    }

    #[test]
    fn display_uses_the_name() {
        assert_eq!(TestState::Processing.to_string(), "Processing");
    }

    #[test]
    fn name_enum_supports_visibility() {
        name_enum! {
            pub enum PublicState {
                A,
                B,
            }
        }

        assert_eq!(PublicState::B.as_str(), "B");
    }
}
