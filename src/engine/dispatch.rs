//! Event resolution, least-common-ancestor planning and action execution.
//!
//! Dispatch is split the same way throughout: a pure planning step walks
//! the tree and collects the exact action sequence, then an execution step
//! runs it. The state pointer is only moved by the caller once every action
//! has succeeded.

use crate::builder::transition::Transition;
use crate::builder::tree::{StateId, StateNode, StateTree};
use crate::core::{Action, Event, RunLevel, StateName};
use crate::engine::error::{ActionPhase, DispatchError, RunLevelError};
use crate::observer::AppliedTransition;
use tracing::{debug, trace};
use uuid::Uuid;

/// Machine state guarded by the run-to-completion lock.
pub(crate) struct Machine<P> {
    pub(crate) id: Uuid,
    pub(crate) tree: StateTree<P>,
    pub(crate) current: StateName,
    pub(crate) run_level: RunLevel,
}

/// One action in a planned sequence, with the state it belongs to.
struct Step<'a, P> {
    phase: ActionPhase,
    state: &'a StateName,
    action: &'a Action<P>,
}

/// The node handling an event and the exits collected on the way up to it.
struct EventSource<'a, P> {
    node: StateId,
    transition: &'a Transition<P>,
    exits: Vec<Step<'a, P>>,
}

/// Fully resolved action sequence for one transition.
struct Plan<'a, P> {
    event: &'a Event,
    source: &'a StateName,
    transition: &'a Transition<P>,
    exits: Vec<Step<'a, P>>,
    entries: Vec<Step<'a, P>>,
    resolved: Option<&'a StateName>,
}

fn exit_steps<P>(node: &StateNode<P>) -> impl Iterator<Item = Step<'_, P>> {
    phase_steps(ActionPhase::Exit, &node.exit_actions, &node.name)
}

fn entry_steps<P>(node: &StateNode<P>) -> impl Iterator<Item = Step<'_, P>> {
    phase_steps(ActionPhase::Entry, &node.entry_actions, &node.name)
}

fn phase_steps<'a, P>(
    phase: ActionPhase,
    actions: &'a [Action<P>],
    state: &'a StateName,
) -> impl Iterator<Item = Step<'a, P>> {
    actions.iter().map(move |action| Step {
        phase,
        state,
        action,
    })
}

impl<P> Machine<P> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tree: StateTree::new(name),
            current: StateName::TOP,
            run_level: RunLevel::Initializing,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.tree.machine()
    }

    pub(crate) fn ensure_running(&self) -> Result<(), RunLevelError> {
        if self.run_level.accepts_events() {
            Ok(())
        } else {
            Err(RunLevelError::NotStarted {
                machine: self.name().to_string(),
                run_level: self.run_level,
            })
        }
    }

    fn not_found(&self, name: &StateName) -> DispatchError {
        DispatchError::StateNotFound {
            machine: self.name().to_string(),
            name: name.clone(),
        }
    }

    /// Resolve, guard, plan and execute `event` against the current state.
    ///
    /// Returns `None` when a guard blocked the transition. The caller is
    /// responsible for moving the state pointer to the returned resting
    /// state.
    pub(crate) fn process(
        &self,
        event: &Event,
        param: &P,
    ) -> Result<Option<AppliedTransition>, DispatchError> {
        self.ensure_running()?;
        let found = self.event_source(event)?;
        let source = &self.tree[found.node].name;

        if let Some(guard) = found.transition.guard_ref() {
            match guard.check(param) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        machine = %self.name(),
                        machine_id = %self.id,
                        state = %self.current,
                        event = %event,
                        guard = guard.label(),
                        "transition guarded"
                    );
                    return Ok(None);
                }
                Err(error) => {
                    debug!(
                        machine = %self.name(),
                        machine_id = %self.id,
                        state = %source,
                        event = %event,
                        guard = guard.label(),
                        "guard function failed"
                    );
                    return Err(DispatchError::Guard {
                        state: source.clone(),
                        event: event.clone(),
                        source: error,
                    });
                }
            }
        }

        let plan = self.plan(event, found)?;
        plan.execute(self, param)?;

        Ok(Some(AppliedTransition {
            machine: self.name().to_string(),
            from: self.current.clone(),
            to: plan.resolved.unwrap_or(&self.current).clone(),
            trigger: event.clone(),
            source: plan.source.clone(),
            target: plan.transition.target().cloned(),
        }))
    }

    /// Find the nearest state, starting at the current one and walking up,
    /// that defines a transition for `event`.
    ///
    /// The returned exits belong to the states strictly below the handling
    /// state; the handling state's own exits are decided by [`Self::plan`].
    fn event_source<'a>(&'a self, event: &Event) -> Result<EventSource<'a, P>, DispatchError> {
        let current = self
            .tree
            .lookup(self.current.as_str())
            .ok_or_else(|| self.not_found(&self.current))?;

        let mut exits = Vec::new();
        for id in self.tree.ancestors(current) {
            let node = &self.tree[id];
            if let Some(transition) = node.transition(event) {
                return Ok(EventSource {
                    node: id,
                    transition,
                    exits,
                });
            }
            exits.extend(exit_steps(node));
        }

        debug!(
            machine = %self.name(),
            machine_id = %self.id,
            state = %self.current,
            event = %event,
            "unhandled event"
        );
        Err(DispatchError::Unhandled {
            machine: self.name().to_string(),
            state: self.current.clone(),
            event: event.clone(),
        })
    }

    /// Build the exit/transition/entry sequence for the handling transition.
    fn plan<'a>(
        &'a self,
        event: &'a Event,
        found: EventSource<'a, P>,
    ) -> Result<Plan<'a, P>, DispatchError> {
        let EventSource {
            node: source,
            transition,
            mut exits,
        } = found;
        let source_name = &self.tree[source].name;

        let Some(target_name) = transition.target() else {
            return Ok(Plan {
                event,
                source: source_name,
                transition,
                exits: Vec::new(),
                entries: Vec::new(),
                resolved: None,
            });
        };
        let target = self
            .tree
            .lookup(target_name.as_str())
            .ok_or_else(|| self.not_found(target_name))?;

        let mut entries = Vec::new();
        if source == target {
            exits.extend(exit_steps(&self.tree[source]));
            entries.extend(entry_steps(&self.tree[target]));
        } else {
            let mut cursor = source;
            let lca = loop {
                if self.tree.is_ancestor_or_self(cursor, target) {
                    break cursor;
                }
                exits.extend(exit_steps(&self.tree[cursor]));
                cursor = self.tree[cursor].parent.ok_or_else(|| {
                    DispatchError::NoCommonAncestor {
                        machine: self.name().to_string(),
                        source_state: source_name.clone(),
                        target: target_name.clone(),
                    }
                })?;
            };

            let mut path: Vec<StateId> = self
                .tree
                .ancestors(target)
                .take_while(|&id| id != lca)
                .collect();
            path.reverse();
            for id in path {
                entries.extend(entry_steps(&self.tree[id]));
            }
        }

        let mut resolved = target;
        if self.run_level != RunLevel::Exiting {
            while let Some(child) = self.tree[resolved].default_child {
                entries.extend(entry_steps(&self.tree[child]));
                resolved = child;
            }
        }

        Ok(Plan {
            event,
            source: source_name,
            transition,
            exits,
            entries,
            resolved: Some(&self.tree[resolved].name),
        })
    }
}

impl<P> Plan<'_, P> {
    /// Run exits, then the transition action, then entries. The first
    /// failure stops the sequence; actions that already ran are not undone.
    fn execute(&self, machine: &Machine<P>, param: &P) -> Result<(), DispatchError> {
        for step in &self.exits {
            self.run(machine, step, param)?;
        }
        if let Some(action) = self.transition.action_ref() {
            let step = Step {
                phase: ActionPhase::Transition,
                state: self.source,
                action,
            };
            self.run(machine, &step, param)?;
        }
        for step in &self.entries {
            self.run(machine, step, param)?;
        }
        Ok(())
    }

    fn run(&self, machine: &Machine<P>, step: &Step<'_, P>, param: &P) -> Result<(), DispatchError> {
        trace!(
            machine = %machine.name(),
            machine_id = %machine.id,
            from = %machine.current,
            to = ?self.transition.target(),
            event = %self.event,
            phase = %step.phase,
            state = %step.state,
            action = step.action.label(),
            "run action"
        );
        step.action
            .run(param)
            .map_err(|source| DispatchError::Action {
                phase: step.phase,
                state: step.state.clone(),
                event: self.event.clone(),
                action: step.action.label(),
                source,
            })
    }
}
