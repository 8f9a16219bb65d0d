//! Run-level transitions: finalize, on, off, and recovery from failing
//! lifecycle actions.

use anyhow::anyhow;
use hierarch::{
    Action, ActionPhase, ConfigError, DispatchError, Event, RunLevel, RunLevelError, StateId,
    StateMachine, StateName, Transition, TreeViolation,
};
use parking_lot::Mutex;
use std::error::Error as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn recorder(log: &Arc<Mutex<Vec<String>>>, entry: String) -> Action<u32> {
    let log = Arc::clone(log);
    Action::new(move |param: &u32| {
        log.lock().push(format!("{entry}({param})"));
        Ok(())
    })
}

/// root ⊃ { a ⊃ { a1 ⊃ { a11 } }, b }
fn deep(log: &Arc<Mutex<Vec<String>>>) -> StateMachine<u32> {
    let mut machine = StateMachine::configure("deep");
    let mut ids = Vec::new();
    for name in ["root", "a", "a1", "a11", "b"] {
        let id = machine.new_state(name).unwrap();
        machine
            .add_entry_actions(id, [recorder(log, format!("{name}e"))])
            .unwrap();
        machine
            .add_exit_actions(id, [recorder(log, format!("{name}x"))])
            .unwrap();
        ids.push(id);
    }
    let [root, a, a1, a11, b]: [StateId; 5] = ids.try_into().unwrap();
    machine.add_children(root, [a, b]).unwrap();
    machine.add_children(a, [a1]).unwrap();
    machine.add_children(a1, [a11]).unwrap();
    machine
        .add_transitions(a11, [Transition::external("jump", "b")])
        .unwrap();
    machine
        .add_transitions(b, [Transition::external("back", "a1")])
        .unwrap();
    machine.finalize().unwrap();
    machine
}

#[test]
fn on_and_off_pass_their_parameter_to_every_action() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let machine = deep(&log);

    machine.on_with(&7).unwrap();
    assert_eq!(machine.current_state(), "a11");
    machine.off_with(&9).unwrap();

    assert_eq!(
        *log.lock(),
        [
            "roote(7)", "ae(7)", "a1e(7)", "a11e(7)", "a11x(9)", "a1x(9)", "ax(9)", "rootx(9)",
        ]
    );
}

#[test]
fn off_from_a_sibling_branch_exits_only_the_active_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let machine = deep(&log);
    machine.on().unwrap();
    machine.inject("jump", &1).unwrap();
    assert_eq!(machine.current_state(), "b");
    log.lock().clear();

    machine.off().unwrap();

    assert_eq!(*log.lock(), ["bx(0)", "rootx(0)"]);
    assert_eq!(machine.current_state(), StateName::TOP);
}

#[test]
fn transition_to_a_composite_target_descends_from_it() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let machine = deep(&log);
    machine.on().unwrap();
    machine.inject("jump", &1).unwrap();
    log.lock().clear();

    machine.inject("back", &2).unwrap();

    assert_eq!(machine.current_state(), "a11");
    assert_eq!(*log.lock(), ["bx(2)", "ae(2)", "a1e(2)", "a11e(2)"]);
}

#[test]
fn repeated_on_off_cycles_are_symmetric() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let machine = deep(&log);

    for _ in 0..3 {
        machine.on().unwrap();
        machine.off().unwrap();
    }

    let log = log.lock();
    let entries = log.iter().filter(|l| l.contains("e(")).count();
    let exits = log.iter().filter(|l| l.contains("x(")).count();
    assert_eq!(entries, 12);
    assert_eq!(exits, 12);
    assert_eq!(machine.run_level(), RunLevel::Off);
}

#[test]
fn failing_entry_action_rolls_on_back() {
    let fail = Arc::new(AtomicBool::new(true));
    let mut machine: StateMachine<()> = StateMachine::configure("flaky");
    let root = machine.new_state("root").unwrap();
    let leaf = machine.new_state("leaf").unwrap();
    machine.add_children(root, [leaf]).unwrap();
    let flag = Arc::clone(&fail);
    machine
        .add_entry_actions(
            leaf,
            [Action::named("power_up", move |_: &()| {
                if flag.load(Ordering::SeqCst) {
                    Err(anyhow!("no power"))
                } else {
                    Ok(())
                }
            })],
        )
        .unwrap();
    machine.finalize().unwrap();

    let err = machine.on().unwrap_err();

    let RunLevelError::Transition {
        level: RunLevel::On,
        source: cause,
        ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert!(err.source().is_some());
    assert!(matches!(
        **cause,
        DispatchError::Action {
            phase: ActionPhase::Entry,
            action: "power_up",
            ..
        }
    ));
    assert_eq!(machine.run_level(), RunLevel::Finalized);
    assert_eq!(machine.current_state(), StateName::TOP);

    fail.store(false, Ordering::SeqCst);
    machine.on().unwrap();
    assert_eq!(machine.current_state(), "leaf");
}

#[test]
fn failing_exit_action_keeps_the_machine_on() {
    let mut machine: StateMachine<()> = StateMachine::configure("sticky");
    let root = machine.new_state("root").unwrap();
    let leaf = machine.new_state("leaf").unwrap();
    machine.add_children(root, [leaf]).unwrap();
    machine
        .add_exit_actions(leaf, [Action::new(|_: &()| Err(anyhow!("stuck")))])
        .unwrap();
    machine.finalize().unwrap();
    machine.on().unwrap();

    let err = machine.off().unwrap_err();

    assert!(matches!(
        err,
        RunLevelError::Transition {
            level: RunLevel::Off,
            ..
        }
    ));
    assert_eq!(machine.run_level(), RunLevel::On);
    assert_eq!(machine.current_state(), "leaf");
}

#[test]
fn finalize_reports_every_violation_at_once() {
    let mut machine: StateMachine<()> = StateMachine::configure("broken");
    let on = machine.new_state("On").unwrap();
    machine.new_state("Off").unwrap();
    let operand = machine.new_state("Operand").unwrap();
    machine.new_state("Idle").unwrap();
    machine.add_children(on, [operand]).unwrap();
    machine
        .add_transitions(operand, [Transition::external("Digit", "Operand2")])
        .unwrap();

    let err = machine.finalize().unwrap_err();

    assert!(matches!(err, ConfigError::InvalidTree { .. }));
    assert_eq!(
        err.violations(),
        [
            TreeViolation::MultipleTopStates {
                names: vec!["Idle".into(), "Off".into(), "On".into()],
            },
            TreeViolation::UnknownTarget {
                state: "Operand".into(),
                event: "Digit".into(),
                target: "Operand2".into(),
            },
        ]
    );
    assert_eq!(machine.run_level(), RunLevel::Initializing);
}

#[test]
fn configuration_is_rejected_once_sealed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut machine = deep(&log);

    let err = machine.new_state("late").unwrap_err();
    assert_eq!(
        err,
        ConfigError::Sealed {
            machine: "deep".to_string(),
            run_level: RunLevel::Finalized,
        }
    );
    assert_eq!(
        err.to_string(),
        "state machine 'deep' is finalized; states can only be configured while initializing"
    );
}

#[test]
fn reserved_names_are_rejected_during_configuration() {
    let mut machine: StateMachine<()> = StateMachine::configure("reserved");
    assert!(matches!(
        machine.new_state(StateName::TOP),
        Err(ConfigError::Reserved { .. })
    ));
    let root = machine.new_state("root").unwrap();
    assert!(matches!(
        machine.add_transitions(root, [Transition::external(Event::INITIAL, "root")]),
        Err(ConfigError::Reserved { .. })
    ));
}

#[test]
fn reconfigure_after_off_starts_from_scratch() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut machine = deep(&log);
    machine.on().unwrap();
    machine.off().unwrap();

    machine.reconfigure("fresh").unwrap();
    let only = machine.new_state("only").unwrap();
    machine
        .add_entry_actions(only, [recorder(&log, "onlye".to_string())])
        .unwrap();
    machine.finalize().unwrap();
    log.lock().clear();
    machine.on().unwrap();

    assert_eq!(machine.name(), "fresh");
    assert_eq!(machine.current_state(), "only");
    assert_eq!(*log.lock(), ["onlye(0)"]);
    assert_eq!(machine.state_count(), 2);
}
