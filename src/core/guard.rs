//! Host-supplied callbacks: actions and guards.
//!
//! Any closure or function with the right signature is accepted. Each
//! callback receives the single parameter that accompanies an injected
//! event and may fail; failures are surfaced to the caller of `inject`
//! verbatim.

use std::any::type_name;
use std::fmt;

type ActionFn<P> = Box<dyn Fn(&P) -> anyhow::Result<()> + Send + Sync>;
type GuardFn<P> = Box<dyn Fn(&P) -> anyhow::Result<bool> + Send + Sync>;

/// A side-effecting callback run on entry, on exit, or during a transition.
///
/// # Example
///
/// ```rust
/// use hierarch::Action;
///
/// let clear = Action::named("clear", |_: &u8| Ok(()));
/// assert_eq!(clear.label(), "clear");
/// assert!(clear.run(&0).is_ok());
/// ```
pub struct Action<P> {
    label: &'static str,
    callback: ActionFn<P>,
}

impl<P> Action<P> {
    /// Wrap a callback, labelling it with its type name for logging.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            label: type_name::<F>(),
            callback: Box::new(callback),
        }
    }

    /// Wrap a callback with an explicit label.
    pub fn named<F>(label: &'static str, callback: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            label,
            callback: Box::new(callback),
        }
    }

    /// Label used in log records.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run the callback with the dispatch parameter.
    pub fn run(&self, param: &P) -> anyhow::Result<()> {
        (self.callback)(param)
    }
}

impl<P> fmt::Debug for Action<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.label).finish()
    }
}

/// Predicate deciding whether a transition may fire.
///
/// A guard returning `Ok(false)` blocks the transition without any
/// observable effect; a guard returning `Err` aborts the dispatch and the
/// error reaches the caller.
///
/// # Example
///
/// ```rust
/// use hierarch::Guard;
///
/// let non_zero = Guard::when(|digit: &u8| *digit != b'0');
/// assert!(non_zero.check(&b'7').unwrap());
/// assert!(!non_zero.check(&b'0').unwrap());
/// ```
pub struct Guard<P> {
    label: &'static str,
    predicate: GuardFn<P>,
}

impl<P> Guard<P> {
    /// Create a guard from a fallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Guard {
            label: type_name::<F>(),
            predicate: Box::new(predicate),
        }
    }

    /// Create a guard from a predicate that cannot fail.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        Guard {
            label: type_name::<F>(),
            predicate: Box::new(move |param: &P| Ok::<_, anyhow::Error>(predicate(param))),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Evaluate the guard for the dispatch parameter.
    pub fn check(&self, param: &P) -> anyhow::Result<bool> {
        (self.predicate)(param)
    }
}

impl<P> fmt::Debug for Guard<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.label).finish()
    }
}
