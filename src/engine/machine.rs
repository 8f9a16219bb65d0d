//! The public state machine handle.
//!
//! Configuration methods take `&mut self` and are only accepted while the
//! machine is initializing. Once finalized, the handle can be shared
//! (typically behind an `Arc`) and driven from any thread: `on`, `off` and
//! `inject` serialize on one re-entrant lock, so every event runs to
//! completion before the next one starts.

use crate::builder::error::ConfigError;
use crate::builder::transition::Transition;
use crate::builder::tree::StateId;
use crate::core::{Action, Event, RunLevel, StateName};
use crate::engine::dispatch::Machine;
use crate::engine::error::{DispatchError, RunLevelError};
use crate::observer::{NoopObserver, TransitionObserver};
use parking_lot::ReentrantMutex;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

struct Shared<P> {
    dispatching: Cell<bool>,
    machine: RefCell<Machine<P>>,
}

/// Marks the machine busy for the lifetime of the value.
struct Dispatching<'a>(&'a Cell<bool>);

impl<'a> Dispatching<'a> {
    /// `None` if a dispatch is already running on this thread.
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for Dispatching<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A hierarchical state machine whose callbacks receive a `&P`.
///
/// # Example
///
/// ```rust
/// use hierarch::{Action, StateMachine, Transition};
///
/// let mut lamp = StateMachine::<u8>::configure("lamp");
/// let root = lamp.new_state("Lamp").unwrap();
/// let off = lamp.new_state("Dark").unwrap();
/// let on = lamp.new_state("Lit").unwrap();
/// lamp.add_children(root, [off, on]).unwrap();
/// lamp.add_transitions(off, [Transition::external("Switch", "Lit")]).unwrap();
/// lamp.add_transitions(on, [Transition::external("Switch", "Dark")]).unwrap();
/// lamp.add_entry_actions(on, [Action::named("glow", |level: &u8| {
///     assert!(*level > 0);
///     Ok(())
/// })]).unwrap();
/// lamp.finalize().unwrap();
///
/// lamp.on().unwrap();
/// assert_eq!(lamp.current_state(), "Dark");
/// lamp.inject("Switch", &3).unwrap();
/// assert_eq!(lamp.current_state(), "Lit");
/// assert!(lamp.is_in("Lamp"));
/// lamp.off().unwrap();
/// ```
pub struct StateMachine<P> {
    inner: ReentrantMutex<Shared<P>>,
    observer: Arc<dyn TransitionObserver<P>>,
}

/// Builder for a [`StateMachine`] with non-default collaborators.
pub struct MachineBuilder<P> {
    name: String,
    observer: Option<Arc<dyn TransitionObserver<P>>>,
}

impl<P> MachineBuilder<P> {
    /// Notify `observer` after every applied transition.
    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: TransitionObserver<P> + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Like [`Self::observer`] for an observer the host keeps a handle to.
    pub fn shared_observer(mut self, observer: Arc<dyn TransitionObserver<P>>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> StateMachine<P> {
        let observer: Arc<dyn TransitionObserver<P>> = match self.observer {
            Some(observer) => observer,
            None => Arc::new(NoopObserver),
        };
        let machine = Machine::new(self.name);
        debug!(machine = %machine.name(), machine_id = %machine.id, "configuring state machine");
        StateMachine {
            inner: ReentrantMutex::new(Shared {
                dispatching: Cell::new(false),
                machine: RefCell::new(machine),
            }),
            observer,
        }
    }
}

impl<P> StateMachine<P> {
    /// Start configuring a machine with no observer.
    pub fn configure(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> MachineBuilder<P> {
        MachineBuilder {
            name: name.into(),
            observer: None,
        }
    }

    fn configuring(&mut self) -> Result<&mut Machine<P>, ConfigError> {
        let machine = self.inner.get_mut().machine.get_mut();
        if machine.run_level != RunLevel::Initializing {
            return Err(ConfigError::Sealed {
                machine: machine.name().to_string(),
                run_level: machine.run_level,
            });
        }
        Ok(machine)
    }

    /// Discard every state and return to initializing under a new name.
    ///
    /// Handles issued before the call stop resolving. Not allowed while the
    /// machine is running.
    pub fn reconfigure(&mut self, name: impl Into<String>) -> Result<(), RunLevelError> {
        let machine = self.inner.get_mut().machine.get_mut();
        if matches!(machine.run_level, RunLevel::On | RunLevel::Exiting) {
            return Err(RunLevelError::AlreadyOn {
                machine: machine.name().to_string(),
            });
        }
        let name = name.into();
        debug!(machine = %name, previous = %machine.name(), machine_id = %machine.id, "reconfiguring state machine");
        machine.tree.reset(name);
        machine.current = StateName::TOP;
        machine.run_level = RunLevel::Initializing;
        Ok(())
    }

    /// Declare a state. The name must be unique within the machine.
    pub fn new_state(&mut self, name: impl Into<StateName>) -> Result<StateId, ConfigError> {
        let machine = self.configuring()?;
        let name = name.into();
        let first = machine.tree.is_empty();
        let id = machine.tree.insert(name.clone())?;
        if first {
            machine.current = name;
        }
        Ok(id)
    }

    /// Register outgoing transitions on `state`, keyed by trigger.
    pub fn add_transitions<I>(&mut self, state: StateId, transitions: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Transition<P>>,
    {
        self.configuring()?.tree.add_transitions(state, transitions)
    }

    /// Attach `children` to `state`. The first child ever attached is the
    /// default child entered when `state` is targeted.
    pub fn add_children<I>(&mut self, state: StateId, children: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = StateId>,
    {
        self.configuring()?.tree.add_children(state, children)
    }

    pub fn add_entry_actions<I>(&mut self, state: StateId, actions: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Action<P>>,
    {
        self.configuring()?.tree.add_entry_actions(state, actions)
    }

    pub fn add_exit_actions<I>(&mut self, state: StateId, actions: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Action<P>>,
    {
        self.configuring()?.tree.add_exit_actions(state, actions)
    }

    /// Validate the tree and seal the configuration.
    ///
    /// On failure every violation is reported and the machine stays
    /// initializing, so the tree can be fixed and finalized again.
    pub fn finalize(&mut self) -> Result<(), ConfigError> {
        let machine = self.configuring()?;
        machine.tree.finalize()?;
        machine.current = StateName::TOP;
        machine.run_level = RunLevel::Finalized;
        info!(
            machine = %machine.name(),
            machine_id = %machine.id,
            states = machine.tree.len(),
            "state machine finalized"
        );
        Ok(())
    }

    /// Start the machine, entering the top-level state and its default
    /// descendants with `param`.
    ///
    /// If an entry action fails the machine returns to its previous run
    /// level, resting at the top pseudo-state.
    pub fn on_with(&self, param: &P) -> Result<(), RunLevelError> {
        let shared = self.inner.lock();
        let Some(_dispatching) = Dispatching::enter(&shared.dispatching) else {
            return Err(RunLevelError::Reentrant {
                machine: shared.machine.borrow().name().to_string(),
            });
        };

        let previous = {
            let mut machine = shared.machine.borrow_mut();
            let level = machine.run_level;
            if level == RunLevel::Initializing {
                return Err(RunLevelError::NotFinalized {
                    machine: machine.name().to_string(),
                });
            }
            if !level.can_start() || machine.current != StateName::TOP {
                return Err(RunLevelError::AlreadyOn {
                    machine: machine.name().to_string(),
                });
            }
            machine.run_level = RunLevel::On;
            level
        };

        if let Err(source) = self.dispatch(&shared, &Event::INITIAL, param) {
            let mut machine = shared.machine.borrow_mut();
            machine.run_level = previous;
            error!(
                machine = %machine.name(),
                machine_id = %machine.id,
                error = %source,
                "initial transition failed"
            );
            return Err(RunLevelError::Transition {
                machine: machine.name().to_string(),
                level: RunLevel::On,
                source: Box::new(source),
            });
        }

        let machine = shared.machine.borrow();
        info!(
            machine = %machine.name(),
            machine_id = %machine.id,
            state = %machine.current,
            "state machine on"
        );
        Ok(())
    }

    /// Stop the machine, exiting from the current state up to and
    /// including the top-level state with `param`.
    ///
    /// If an exit action fails the machine stays on, in the state it was
    /// in.
    pub fn off_with(&self, param: &P) -> Result<(), RunLevelError> {
        let shared = self.inner.lock();
        let Some(_dispatching) = Dispatching::enter(&shared.dispatching) else {
            return Err(RunLevelError::Reentrant {
                machine: shared.machine.borrow().name().to_string(),
            });
        };

        {
            let mut machine = shared.machine.borrow_mut();
            if machine.run_level != RunLevel::On || machine.current == StateName::TOP {
                return Err(RunLevelError::NotOn {
                    machine: machine.name().to_string(),
                    run_level: machine.run_level,
                });
            }
            machine.run_level = RunLevel::Exiting;
        }

        if let Err(source) = self.dispatch(&shared, &Event::EXIT, param) {
            let mut machine = shared.machine.borrow_mut();
            machine.run_level = RunLevel::On;
            error!(
                machine = %machine.name(),
                machine_id = %machine.id,
                state = %machine.current,
                error = %source,
                "exit transition failed"
            );
            return Err(RunLevelError::Transition {
                machine: machine.name().to_string(),
                level: RunLevel::Off,
                source: Box::new(source),
            });
        }

        let mut machine = shared.machine.borrow_mut();
        machine.run_level = RunLevel::Off;
        info!(machine = %machine.name(), machine_id = %machine.id, "state machine off");
        Ok(())
    }

    /// Dispatch `event` with `param` and run it to completion.
    ///
    /// Calls from other threads block until the running dispatch returns.
    /// Calls from inside this machine's own callbacks fail with
    /// [`DispatchError::Reentrant`].
    pub fn inject(&self, event: impl Into<Event>, param: &P) -> Result<(), DispatchError> {
        let event = event.into();
        let shared = self.inner.lock();
        let Some(_dispatching) = Dispatching::enter(&shared.dispatching) else {
            return Err(DispatchError::Reentrant {
                machine: shared.machine.borrow().name().to_string(),
            });
        };
        shared.machine.borrow().ensure_running()?;
        if event.is_reserved() {
            return Err(DispatchError::ReservedEvent { event });
        }
        self.dispatch(&shared, &event, param)
    }

    fn dispatch(&self, shared: &Shared<P>, event: &Event, param: &P) -> Result<(), DispatchError> {
        let applied = {
            let machine = shared.machine.borrow();
            match machine.process(event, param)? {
                Some(applied) => applied,
                None => return Ok(()),
            }
        };

        {
            let mut machine = shared.machine.borrow_mut();
            if applied.is_internal() {
                debug!(
                    machine = %applied.machine,
                    machine_id = %machine.id,
                    state = %applied.from,
                    event = %event,
                    "internal transition"
                );
            } else {
                debug!(
                    machine = %applied.machine,
                    machine_id = %machine.id,
                    from = %applied.from,
                    to = %applied.to,
                    event = %event,
                    "set state"
                );
            }
            machine.current = applied.to.clone();
        }

        self.observer.on_transition(&applied, param);
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&Machine<P>) -> R) -> R {
        let shared = self.inner.lock();
        let machine = shared.machine.borrow();
        f(&machine)
    }

    pub fn name(&self) -> String {
        self.read(|machine| machine.name().to_string())
    }

    /// Identifier of this instance, stable across reconfiguration.
    pub fn id(&self) -> Uuid {
        self.read(|machine| machine.id)
    }

    /// The resting state.
    ///
    /// This is the first declared state while initializing and the top
    /// pseudo-state while finalized or off.
    pub fn current_state(&self) -> StateName {
        self.read(|machine| machine.current.clone())
    }

    pub fn run_level(&self) -> RunLevel {
        self.read(|machine| machine.run_level)
    }

    /// Whether `state` is the current state or one of its ancestors.
    pub fn is_in(&self, state: impl AsRef<str>) -> bool {
        self.read(|machine| {
            let tree = &machine.tree;
            match (tree.lookup(state.as_ref()), tree.lookup(machine.current.as_str())) {
                (Some(state), Some(current)) => tree.is_ancestor_or_self(state, current),
                _ => false,
            }
        })
    }

    /// Parent of `state`. After finalize the top-level state reports the
    /// top pseudo-state as its parent.
    pub fn parent_of(&self, state: impl AsRef<str>) -> Option<StateName> {
        self.read(|machine| {
            let tree = &machine.tree;
            let id = tree.lookup(state.as_ref())?;
            let parent = tree.get(id)?.parent?;
            tree.get(parent).map(|node| node.name.clone())
        })
    }

    /// Number of declared states, including the top pseudo-state once
    /// finalized.
    pub fn state_count(&self) -> usize {
        self.read(|machine| machine.tree.len())
    }
}

impl<P: Default> StateMachine<P> {
    /// [`Self::on_with`] using `P::default()`.
    pub fn on(&self) -> Result<(), RunLevelError> {
        self.on_with(&P::default())
    }

    /// [`Self::off_with`] using `P::default()`.
    pub fn off(&self) -> Result<(), RunLevelError> {
        self.off_with(&P::default())
    }
}

impl<P> fmt::Debug for StateMachine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|machine| {
            f.debug_struct("StateMachine")
                .field("name", &machine.name())
                .field("id", &machine.id)
                .field("run_level", &machine.run_level)
                .field("current", &machine.current)
                .field("states", &machine.tree.len())
                .finish()
        })
    }
}
