//! Property-based tests over randomly shaped state trees.
//!
//! Every generated tree has a single root `n0`; node `i > 0` hangs under
//! some node `< i`. Transitions are registered between random nodes and
//! random events are injected, checking that each dispatch exits the old
//! active chain up to the least common ancestor of the handling state and
//! the target, then enters the new chain from just below it.

use chrono::Utc;
use hierarch::{
    Action, Event, Guard, RunLevel, StateHistory, StateMachine, StateName, StateTransition,
    Transition,
};
use parking_lot::Mutex;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use std::sync::Arc;

type Log = Arc<Mutex<Vec<(char, usize)>>>;

#[derive(Clone, Debug)]
struct Shape {
    parents: Vec<Option<usize>>,
    transitions: Vec<(usize, usize)>,
}

impl Shape {
    fn len(&self) -> usize {
        self.parents.len()
    }

    /// `node` followed by its ancestors.
    fn chain(&self, mut node: usize) -> Vec<usize> {
        let mut chain = vec![node];
        while let Some(parent) = self.parents[node] {
            chain.push(parent);
            node = parent;
        }
        chain
    }

    fn first_child(&self, node: usize) -> Option<usize> {
        (0..self.len()).find(|&child| self.parents[child] == Some(node))
    }

    fn default_leaf(&self, mut node: usize) -> usize {
        while let Some(child) = self.first_child(node) {
            node = child;
        }
        node
    }

    fn handles(&self, node: usize, event: usize) -> bool {
        self.transitions[event].0 == node
    }

    /// The state neither exited nor entered when `handler` fires towards
    /// `target`. `None` stands for the top pseudo-state.
    fn lca(&self, handler: usize, target: usize) -> Option<usize> {
        if handler == target {
            return self.parents[handler];
        }
        let targets = self.chain(target);
        self.chain(handler)
            .into_iter()
            .find(|node| targets.contains(node))
    }
}

/// Leading nodes of `chain` strictly below `stop`.
fn below(chain: Vec<usize>, stop: Option<usize>) -> Vec<usize> {
    chain
        .into_iter()
        .take_while(|&node| Some(node) != stop)
        .collect()
}

prop_compose! {
    fn shape()(
        parents in vec(any::<Index>(), 0..10),
        links in vec((any::<Index>(), any::<Index>()), 0..12),
    ) -> Shape {
        let mut tree = vec![None];
        for (i, parent) in parents.iter().enumerate() {
            tree.push(Some(parent.index(i + 1)));
        }
        let len = tree.len();
        let transitions = links
            .iter()
            .map(|(source, target)| (source.index(len), target.index(len)))
            .collect();
        Shape {
            parents: tree,
            transitions,
        }
    }
}

fn name(node: usize) -> String {
    format!("n{node}")
}

fn index_of(state: &StateName) -> usize {
    state.as_str()[1..].parse().unwrap()
}

fn build(shape: &Shape, log: &Log) -> StateMachine<()> {
    let mut machine = StateMachine::configure("random");
    let ids: Vec<_> = (0..shape.len())
        .map(|node| {
            let id = machine.new_state(name(node)).unwrap();
            let (entry, exit) = (Arc::clone(log), Arc::clone(log));
            machine
                .add_entry_actions(
                    id,
                    [Action::new(move |_: &()| {
                        entry.lock().push(('+', node));
                        Ok(())
                    })],
                )
                .unwrap();
            machine
                .add_exit_actions(
                    id,
                    [Action::new(move |_: &()| {
                        exit.lock().push(('-', node));
                        Ok(())
                    })],
                )
                .unwrap();
            id
        })
        .collect();

    for (event, &(source, target)) in shape.transitions.iter().enumerate() {
        machine
            .add_transitions(
                ids[source],
                [Transition::external(format!("e{event}"), name(target))],
            )
            .unwrap();
    }
    for parent in 0..shape.len() {
        let children: Vec<_> = (0..shape.len())
            .filter(|&child| shape.parents[child] == Some(parent))
            .map(|child| ids[child])
            .collect();
        if !children.is_empty() {
            machine.add_children(ids[parent], children).unwrap();
        }
    }
    machine.finalize().unwrap();
    machine
}

fn drain(log: &Log) -> Vec<(char, usize)> {
    std::mem::take(&mut *log.lock())
}

fn nodes(log: &[(char, usize)], kind: char) -> Vec<usize> {
    log.iter()
        .filter(|(k, _)| *k == kind)
        .map(|&(_, node)| node)
        .collect()
}

proptest! {
    #[test]
    fn finalize_wraps_the_single_root(shape in shape()) {
        let log = Log::default();
        let machine = build(&shape, &log);

        prop_assert_eq!(machine.run_level(), RunLevel::Finalized);
        prop_assert_eq!(machine.state_count(), shape.len() + 1);
        prop_assert_eq!(machine.parent_of("n0"), Some(StateName::TOP));
        prop_assert_eq!(machine.current_state(), StateName::TOP);
    }

    #[test]
    fn on_enters_the_default_chain_top_down(shape in shape()) {
        let log = Log::default();
        let machine = build(&shape, &log);

        machine.on().unwrap();

        let leaf = shape.default_leaf(0);
        let mut expected = shape.chain(leaf);
        expected.reverse();
        let log = drain(&log);
        prop_assert!(nodes(&log, '-').is_empty());
        prop_assert_eq!(nodes(&log, '+'), expected);
        prop_assert_eq!(index_of(&machine.current_state()), leaf);
    }

    #[test]
    fn dispatch_keeps_the_active_chain_consistent(
        shape in shape(),
        events in vec(any::<Index>(), 1..24),
    ) {
        prop_assume!(!shape.transitions.is_empty());
        let log = Log::default();
        let machine = build(&shape, &log);
        machine.on().unwrap();
        drain(&log);

        for pick in events {
            let event = pick.index(shape.transitions.len());
            let current = index_of(&machine.current_state());
            let before = shape.chain(current);
            let handler = before.iter().copied().find(|&node| shape.handles(node, event));

            let outcome = machine.inject(format!("e{event}"), &());
            let log = drain(&log);

            let Some(handler) = handler else {
                prop_assert!(outcome.unwrap_err().is_unhandled());
                prop_assert!(log.is_empty());
                prop_assert_eq!(index_of(&machine.current_state()), current);
                continue;
            };
            prop_assert!(outcome.is_ok());

            let target = shape.transitions[event].1;
            let lca = shape.lca(handler, target);
            let leaf = shape.default_leaf(target);

            // Exits strictly precede entries.
            let first_entry = log.iter().position(|(k, _)| *k == '+').unwrap_or(log.len());
            prop_assert!(log[first_entry..].iter().all(|(k, _)| *k == '+'));

            // Leaf-up to the common ancestor, then back down to the new leaf.
            prop_assert_eq!(nodes(&log, '-'), below(before, lca));
            let mut expected = below(shape.chain(leaf), lca);
            expected.reverse();
            prop_assert_eq!(nodes(&log, '+'), expected);
            prop_assert_eq!(index_of(&machine.current_state()), leaf);
        }
    }

    #[test]
    fn off_exits_exactly_the_active_chain(
        shape in shape(),
        events in vec(any::<Index>(), 0..8),
    ) {
        let log = Log::default();
        let machine = build(&shape, &log);
        machine.on().unwrap();
        if !shape.transitions.is_empty() {
            for pick in events {
                let event = pick.index(shape.transitions.len());
                let _ = machine.inject(format!("e{event}"), &());
            }
        }
        let before = shape.chain(index_of(&machine.current_state()));
        drain(&log);

        machine.off().unwrap();

        let log = drain(&log);
        prop_assert!(nodes(&log, '+').is_empty());
        prop_assert_eq!(nodes(&log, '-'), before);
        prop_assert_eq!(machine.current_state(), StateName::TOP);

        machine.on().unwrap();
        prop_assert_eq!(index_of(&machine.current_state()), shape.default_leaf(0));
    }

    #[test]
    fn guard_is_deterministic(param in any::<u8>(), threshold in any::<u8>()) {
        let guard = Guard::when(move |value: &u8| *value >= threshold);
        let first = guard.check(&param).unwrap();
        let second = guard.check(&param).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(first, param >= threshold);
    }

    #[test]
    fn history_preserves_order(steps in vec("[a-z]{1,6}", 1..12)) {
        let mut history = StateHistory::new();
        let mut from = StateName::TOP;
        for step in &steps {
            let to = StateName::from(step.clone());
            history.push(StateTransition {
                from: from.clone(),
                to: to.clone(),
                trigger: Event::from(format!("to_{step}")),
                timestamp: Utc::now(),
            });
            from = to;
        }

        let path = history.get_path();
        prop_assert_eq!(path.len(), steps.len() + 1);
        prop_assert_eq!(path[0], &StateName::TOP);
        for (node, step) in path[1..].iter().zip(&steps) {
            prop_assert_eq!(node.as_str(), step.as_str());
        }
    }

    #[test]
    fn history_survives_json(steps in vec("[a-z]{1,6}", 0..8)) {
        let mut history = StateHistory::new();
        for step in &steps {
            history.push(StateTransition {
                from: StateName::from(step.clone()),
                to: StateName::from(format!("{step}!")),
                trigger: Event::from(step.clone()),
                timestamp: Utc::now(),
            });
        }

        let json = serde_json::to_string(&history).unwrap();
        let restored: StateHistory = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored.transitions(), history.transitions());
    }
}
