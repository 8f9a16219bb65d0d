//! The composite state tree.
//!
//! Nodes live in a slotmap arena owned by the machine. Parent and
//! default-child links are [`StateId`] handles into that arena, so the tree
//! never holds owning back-references.

use crate::builder::error::{ConfigError, TreeViolation};
use crate::builder::transition::Transition;
use crate::core::{Action, Event, StateName};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::iter;
use std::ops::Index;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{error, warn};

new_key_type! {
    /// Handle to a state declared with `new_state`.
    ///
    /// Handles are invalidated when the machine is reconfigured.
    pub struct StateId;
}

pub(crate) type Actions<P> = SmallVec<[Action<P>; 2]>;

/// A node of the composite state tree.
pub(crate) struct StateNode<P> {
    pub(crate) name: StateName,
    pub(crate) parent: Option<StateId>,
    pub(crate) default_child: Option<StateId>,
    pub(crate) transitions: FxHashMap<Event, Transition<P>>,
    pub(crate) entry_actions: Actions<P>,
    pub(crate) exit_actions: Actions<P>,
}

impl<P> StateNode<P> {
    fn new(name: StateName) -> Self {
        Self {
            name,
            parent: None,
            default_child: None,
            transitions: FxHashMap::default(),
            entry_actions: SmallVec::new(),
            exit_actions: SmallVec::new(),
        }
    }

    pub(crate) fn transition(&self, event: &Event) -> Option<&Transition<P>> {
        self.transitions.get(event)
    }
}

/// Arena of state nodes plus the name index used for every lookup.
pub(crate) struct StateTree<P> {
    machine: String,
    nodes: SlotMap<StateId, StateNode<P>>,
    index: FxHashMap<StateName, StateId>,
}

impl<P> StateTree<P> {
    pub(crate) fn new(machine: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            nodes: SlotMap::with_key(),
            index: FxHashMap::default(),
        }
    }

    /// Drop every node. Removing (rather than replacing the arena) bumps
    /// slot versions, so handles from the previous configuration go stale.
    pub(crate) fn reset(&mut self, machine: impl Into<String>) {
        self.machine = machine.into();
        self.nodes.clear();
        self.index.clear();
    }

    pub(crate) fn machine(&self) -> &str {
        &self.machine
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    pub(crate) fn get(&self, id: StateId) -> Option<&StateNode<P>> {
        self.nodes.get(id)
    }

    /// `id` followed by each of its ancestors up to the root.
    pub(crate) fn ancestors(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        iter::successors(Some(id), move |&current| {
            self.nodes.get(current).and_then(|node| node.parent)
        })
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: StateId, id: StateId) -> bool {
        self.ancestors(id).any(|candidate| candidate == ancestor)
    }

    pub(crate) fn insert(&mut self, name: StateName) -> Result<StateId, ConfigError> {
        if name.is_reserved() {
            return Err(ConfigError::Reserved {
                name: name.to_string(),
            });
        }
        if self.index.contains_key(&name) {
            return Err(ConfigError::DuplicateState {
                machine: self.machine.clone(),
                name,
            });
        }
        let id = self.nodes.insert(StateNode::new(name.clone()));
        self.index.insert(name, id);
        Ok(id)
    }

    fn node(&self, id: StateId) -> Result<&StateNode<P>, ConfigError> {
        self.nodes.get(id).ok_or_else(|| ConfigError::UnknownState {
            machine: self.machine.clone(),
        })
    }

    fn node_mut(&mut self, id: StateId) -> Result<&mut StateNode<P>, ConfigError> {
        let machine = &self.machine;
        self.nodes
            .get_mut(id)
            .ok_or_else(|| ConfigError::UnknownState {
                machine: machine.clone(),
            })
    }

    /// Register transitions keyed by trigger. A later registration for the
    /// same trigger replaces the earlier one.
    pub(crate) fn add_transitions<I>(&mut self, id: StateId, transitions: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Transition<P>>,
    {
        let transitions: Vec<Transition<P>> = transitions.into_iter().collect();
        if let Some(reserved) = transitions.iter().find(|t| t.trigger().is_reserved()) {
            return Err(ConfigError::Reserved {
                name: reserved.trigger().to_string(),
            });
        }
        let machine = self.machine.clone();
        let node = self.node_mut(id)?;
        for transition in transitions {
            let trigger = transition.trigger().clone();
            if node.transitions.insert(trigger.clone(), transition).is_some() {
                warn!(
                    machine = %machine,
                    state = %node.name,
                    event = %trigger,
                    "transition registered twice; keeping the last one"
                );
            }
        }
        Ok(())
    }

    /// Attach children to `parent`. The first child ever attached becomes
    /// the default child. Nothing is attached if any child is invalid.
    pub(crate) fn add_children<I>(&mut self, parent: StateId, children: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = StateId>,
    {
        let children: Vec<StateId> = children.into_iter().collect();
        self.node(parent)?;
        for (position, &child) in children.iter().enumerate() {
            let node = self.node(child)?;
            if self.is_ancestor_or_self(child, parent) {
                return Err(ConfigError::Cycle {
                    name: node.name.clone(),
                });
            }
            let existing = match node.parent {
                Some(existing) => Some(existing),
                // Listing the same child twice in one call would re-parent it.
                None if children[..position].contains(&child) => Some(parent),
                None => None,
            };
            if let Some(existing) = existing {
                return Err(ConfigError::AlreadyParented {
                    child: node.name.clone(),
                    parent: self.nodes[existing].name.clone(),
                });
            }
        }

        let first = children.first().copied();
        for child in children {
            self.nodes[child].parent = Some(parent);
        }
        let node = &mut self.nodes[parent];
        if node.default_child.is_none() {
            node.default_child = first;
        }
        Ok(())
    }

    pub(crate) fn add_entry_actions<I>(&mut self, id: StateId, actions: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Action<P>>,
    {
        self.node_mut(id)?.entry_actions.extend(actions);
        Ok(())
    }

    pub(crate) fn add_exit_actions<I>(&mut self, id: StateId, actions: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = Action<P>>,
    {
        self.node_mut(id)?.exit_actions.extend(actions);
        Ok(())
    }

    /// Validate the tree shape and wrap the single top-level state under
    /// the synthetic top pseudo-state. Returns the pseudo-state's handle.
    ///
    /// Every violation is collected before failing; on failure the tree is
    /// left exactly as it was.
    pub(crate) fn finalize(&mut self) -> Result<StateId, ConfigError> {
        let roots: Vec<StateId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
            .collect();

        let mut checks: Vec<Validation<(), NonEmptyVec<TreeViolation>>> = Vec::new();
        checks.push(self.check_roots(&roots));
        checks.extend(self.check_targets());

        if let Validation::Failure(errors) = Validation::all_vec(checks) {
            let violations: Vec<TreeViolation> = errors.iter().cloned().collect();
            let err = ConfigError::InvalidTree {
                machine: self.machine.clone(),
                violations,
            };
            error!(machine = %self.machine, "{err}");
            return Err(err);
        }

        let root = roots[0];
        let mut top = StateNode::new(StateName::TOP);
        let root_name = self.nodes[root].name.clone();
        top.transitions.insert(
            Event::INITIAL,
            Transition::external(Event::INITIAL, root_name),
        );
        top.default_child = Some(root);
        let top_id = self.nodes.insert(top);
        self.index.insert(StateName::TOP, top_id);

        let root_node = &mut self.nodes[root];
        root_node.parent = Some(top_id);
        root_node.transitions.insert(
            Event::EXIT,
            Transition::external(Event::EXIT, StateName::TOP),
        );
        Ok(top_id)
    }

    fn check_roots(&self, roots: &[StateId]) -> Validation<(), NonEmptyVec<TreeViolation>> {
        let all_parentless = roots.len() == self.nodes.len() && self.nodes.len() > 1;
        if roots.is_empty() || all_parentless {
            Validation::fail(TreeViolation::NoTopState)
        } else if roots.len() > 1 {
            Validation::fail(TreeViolation::MultipleTopStates {
                names: self.sorted_names(roots),
            })
        } else {
            Validation::success(())
        }
    }

    fn check_targets(&self) -> Vec<Validation<(), NonEmptyVec<TreeViolation>>> {
        let mut checks = Vec::new();
        for node in self.nodes.values() {
            for transition in node.transitions.values() {
                let Some(target) = transition.target() else {
                    continue;
                };
                if !self.index.contains_key(target) {
                    checks.push(Validation::fail(TreeViolation::UnknownTarget {
                        state: node.name.clone(),
                        event: transition.trigger().clone(),
                        target: target.clone(),
                    }));
                }
            }
        }
        checks
    }

    fn sorted_names(&self, ids: &[StateId]) -> Vec<StateName> {
        let mut names: Vec<StateName> = ids.iter().map(|&id| self.nodes[id].name.clone()).collect();
        names.sort();
        names
    }
}

impl<P> Index<StateId> for StateTree<P> {
    type Output = StateNode<P>;

    fn index(&self, id: StateId) -> &StateNode<P> {
        &self.nodes[id]
    }
}
