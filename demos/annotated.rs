//! Annotated Hierarchical State Machine
//!
//! This example walks the classic annotated UML state machine:
//!
//! ```text
//! s0
//! ├── s1
//! │   └── s11
//! └── s2
//!     └── s21
//!         └── s211
//! ```
//!
//! Key concepts:
//! - Self transitions (`a` on s1)
//! - Transitions into another branch, resolved through the common ancestor
//!   (`e` on s0, `c` on s2)
//! - Guarded transitions whose guard reads the injected parameter (`h`)
//! - Internal transitions that run an action without leaving the state
//! - Switching the machine off and on again
//!
//! Run with: cargo run --example annotated
//! Set `RUST_LOG=hierarch=trace` to see every action as it runs.

use anyhow::Result;
use hierarch::{name_enum, Action, LogObserver, StateId, StateMachine, Transition};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

name_enum! {
    enum S {
        #[name = "s0"]
        S0,
        #[name = "s1"]
        S1,
        #[name = "s11"]
        S11,
        #[name = "s2"]
        S2,
        #[name = "s21"]
        S21,
        #[name = "s211"]
        S211,
    }
}

fn traced(machine: &mut StateMachine<bool>, state: S) -> Result<StateId> {
    let id = machine.new_state(state)?;
    machine.add_entry_actions(
        id,
        [Action::named("print_entry", move |_: &bool| {
            println!("\t  {state} entry");
            Ok(())
        })],
    )?;
    machine.add_exit_actions(
        id,
        [Action::named("print_exit", move |_: &bool| {
            println!("\t  {state} exit");
            Ok(())
        })],
    )?;
    Ok(id)
}

fn build(foo: &Arc<AtomicBool>) -> Result<StateMachine<bool>> {
    let mut machine = StateMachine::<bool>::builder("annotated")
        .observer(LogObserver)
        .build();

    let toggle = |foo: &Arc<AtomicBool>| {
        let foo = Arc::clone(foo);
        Action::named("toggle_foo", move |_: &bool| {
            foo.fetch_xor(true, Ordering::SeqCst);
            Ok(())
        })
    };

    let s0 = traced(&mut machine, S::S0)?;
    machine.add_transitions(s0, [Transition::external("e", S::S211)])?;

    let s1 = traced(&mut machine, S::S1)?;
    machine.add_transitions(s1, [Transition::external("a", S::S1)])?;

    let s11 = traced(&mut machine, S::S11)?;
    machine.add_transitions(
        s11,
        [Transition::internal("h")
            .with_action(toggle(foo))
            .when(|flag: &bool| *flag)],
    )?;

    let s2 = traced(&mut machine, S::S2)?;
    machine.add_transitions(s2, [Transition::external("c", S::S1)])?;

    let s21 = traced(&mut machine, S::S21)?;
    machine.add_transitions(
        s21,
        [Transition::external("h", S::S21)
            .with_action(toggle(foo))
            .when(|flag: &bool| *flag)],
    )?;

    let s211 = traced(&mut machine, S::S211)?;

    machine.add_children(s0, [s1, s2])?;
    machine.add_children(s1, [s11])?;
    machine.add_children(s2, [s21])?;
    machine.add_children(s21, [s211])?;
    machine.finalize()?;
    Ok(machine)
}

fn step(machine: &StateMachine<bool>, title: &str, event: &'static str, param: bool) {
    println!("{title}");
    println!("\tCurrent State: {}", machine.current_state());
    println!("\t->{event}");
    if let Err(err) = machine.inject(event, &param) {
        println!("\t  {err}");
    }
    println!("\t  Final State: {}", machine.current_state());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let foo = Arc::new(AtomicBool::new(false));
    let machine = build(&foo)?;
    let foo_now = || foo.load(Ordering::SeqCst);

    println!("1. Initial transition");
    machine.on()?;
    println!("\t  Final State: {}", machine.current_state());

    step(&machine, "2. Self transition", "a", false);
    step(&machine, "3. Transition into another branch", "e", false);
    step(&machine, "4. Transition to a child of the handling state", "e", false);
    step(&machine, "5. Unhandled event", "a", false);
    step(&machine, "6. Guarded transition, guard passes", "h", !foo_now());
    step(&machine, "7. Guarded transition, guard blocks", "h", !foo_now());
    step(&machine, "8. Transition to a target with a default child", "c", false);
    step(&machine, "9. Internal transition", "h", foo_now());
    println!("\t  foo: {}", foo_now());

    println!("10. Exit transition (off)");
    machine.off()?;
    println!("\t  Final State: {}", machine.current_state());

    println!("11. Initial transition, back on");
    machine.on()?;
    println!("\t  Final State: {}", machine.current_state());
    Ok(())
}
