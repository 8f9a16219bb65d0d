//! Calculator
//!
//! This example drives a four-function integer calculator with a
//! hierarchical state machine.
//!
//! Key concepts:
//! - Composite states (`On` owns the operand and operator states)
//! - A self transition on `On` that clears through its entry action
//! - Fallible actions: overflow and division by zero are rejected and the
//!   calculator stays where it was
//! - A transition observer that renders the display
//!
//! Input is read line by line from stdin; every character is a key:
//! digits, `+ - * /`, `=`, `o` (on), `f` (off), `c` (clear), `q` (quit).
//! Unknown keys and keys the current state ignores are dropped, just like
//! a pocket calculator.
//!
//! Run with: cargo run --example calculator
//! Set `RUST_LOG=hierarch=debug` to watch every transition.

use anyhow::{anyhow, bail, Result};
use hierarch::{name_enum, Action, AppliedTransition, StateMachine, Transition};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

name_enum! {
    enum CalcState {
        Calculator,
        Off,
        On,
        Operand1,
        OpEntered,
        Operand2,
        Result,
    }
}

name_enum! {
    enum CalcEvent {
        OnButton,
        OffButton,
        Clear,
        Digit,
        Operator,
        Equal,
    }
}

#[derive(Debug, Default)]
struct Registers {
    operand1: i64,
    operand2: i64,
    operator: Option<char>,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Some(operator) => write!(f, "{:6} {} {:6}", self.operand1, operator, self.operand2),
            None => write!(f, "{:6}", self.operand1),
        }
    }
}

fn digit(key: u8) -> Result<i64> {
    if key.is_ascii_digit() {
        Ok(i64::from(key - b'0'))
    } else {
        bail!("'{}' is not a digit", char::from(key))
    }
}

fn append(operand: i64, key: u8) -> Result<i64> {
    let digit = digit(key)?;
    operand
        .checked_mul(10)
        .and_then(|shifted| shifted.checked_add(digit))
        .ok_or_else(|| anyhow!("operand overflow"))
}

fn clear(registers: &mut Registers, _key: u8) -> Result<()> {
    *registers = Registers::default();
    Ok(())
}

fn turn_on(_registers: &mut Registers, _key: u8) -> Result<()> {
    println!("Calculator ON");
    Ok(())
}

fn turn_off(_registers: &mut Registers, _key: u8) -> Result<()> {
    println!("Calculator OFF");
    Ok(())
}

fn set_operand1(registers: &mut Registers, key: u8) -> Result<()> {
    registers.operand1 = digit(key)?;
    Ok(())
}

fn append_operand1(registers: &mut Registers, key: u8) -> Result<()> {
    registers.operand1 = append(registers.operand1, key)?;
    Ok(())
}

fn append_operand2(registers: &mut Registers, key: u8) -> Result<()> {
    registers.operand2 = append(registers.operand2, key)?;
    Ok(())
}

fn set_operator(registers: &mut Registers, key: u8) -> Result<()> {
    registers.operator = Some(char::from(key));
    Ok(())
}

fn compute(registers: &mut Registers, _key: u8) -> Result<()> {
    let (lhs, rhs) = (registers.operand1, registers.operand2);
    let value = match registers.operator {
        Some('+') => lhs.checked_add(rhs),
        Some('-') => lhs.checked_sub(rhs),
        Some('*') => lhs.checked_mul(rhs),
        Some('/') if rhs == 0 => bail!("division by zero"),
        Some('/') => lhs.checked_div(rhs),
        other => bail!("no operator to apply: {other:?}"),
    };
    registers.operand1 = value.ok_or_else(|| anyhow!("result overflow"))?;
    registers.operand2 = 0;
    registers.operator = None;
    Ok(())
}

type Key = fn(&mut Registers, u8) -> Result<()>;

fn action(registers: &Arc<Mutex<Registers>>, label: &'static str, key: Key) -> Action<u8> {
    let registers = Arc::clone(registers);
    Action::named(label, move |pressed: &u8| key(&mut registers.lock(), *pressed))
}

fn build(registers: &Arc<Mutex<Registers>>) -> Result<StateMachine<u8>> {
    let display = Arc::clone(registers);
    let mut calc = StateMachine::<u8>::builder("CALC")
        .observer(move |applied: &AppliedTransition, _key: &u8| {
            if applied.to != CalcState::Off.as_str() {
                println!("{}", display.lock());
            }
        })
        .build();

    let calculator = calc.new_state(CalcState::Calculator)?;

    let off = calc.new_state(CalcState::Off)?;
    calc.add_transitions(
        off,
        [Transition::external(CalcEvent::OnButton, CalcState::On)
            .with_action(action(registers, "turn_on", turn_on))],
    )?;

    let on = calc.new_state(CalcState::On)?;
    calc.add_transitions(
        on,
        [
            Transition::external(CalcEvent::OffButton, CalcState::Off)
                .with_action(action(registers, "turn_off", turn_off)),
            Transition::external(CalcEvent::Clear, CalcState::On),
            Transition::external(CalcEvent::Digit, CalcState::Operand1)
                .with_action(action(registers, "append_operand1", append_operand1)),
        ],
    )?;
    calc.add_entry_actions(on, [action(registers, "clear", clear)])?;

    let operand1 = calc.new_state(CalcState::Operand1)?;
    calc.add_transitions(
        operand1,
        [
            Transition::external(CalcEvent::Digit, CalcState::Operand1)
                .with_action(action(registers, "append_operand1", append_operand1)),
            Transition::external(CalcEvent::Operator, CalcState::OpEntered)
                .with_action(action(registers, "set_operator", set_operator)),
        ],
    )?;

    let op_entered = calc.new_state(CalcState::OpEntered)?;
    calc.add_transitions(
        op_entered,
        [Transition::external(CalcEvent::Digit, CalcState::Operand2)
            .with_action(action(registers, "append_operand2", append_operand2))],
    )?;

    let operand2 = calc.new_state(CalcState::Operand2)?;
    calc.add_transitions(
        operand2,
        [
            Transition::external(CalcEvent::Digit, CalcState::Operand2)
                .with_action(action(registers, "append_operand2", append_operand2)),
            Transition::external(CalcEvent::Equal, CalcState::Result)
                .with_action(action(registers, "compute", compute)),
        ],
    )?;

    let result = calc.new_state(CalcState::Result)?;
    calc.add_transitions(
        result,
        [
            Transition::external(CalcEvent::Digit, CalcState::Operand1)
                .with_action(action(registers, "set_operand1", set_operand1)),
            Transition::external(CalcEvent::Operator, CalcState::OpEntered)
                .with_action(action(registers, "set_operator", set_operator)),
        ],
    )?;

    calc.add_children(calculator, [off, on])?;
    calc.add_children(on, [operand1, operand2, op_entered, result])?;
    calc.finalize()?;
    Ok(calc)
}

fn event_for(key: u8) -> Option<CalcEvent> {
    match key {
        b'0'..=b'9' => Some(CalcEvent::Digit),
        b'+' | b'-' | b'*' | b'/' => Some(CalcEvent::Operator),
        b'=' => Some(CalcEvent::Equal),
        b'o' => Some(CalcEvent::OnButton),
        b'f' => Some(CalcEvent::OffButton),
        b'c' => Some(CalcEvent::Clear),
        _ => None,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registers = Arc::new(Mutex::new(Registers::default()));
    let calc = build(&registers)?;
    calc.on()?;

    println!("Welcome to the HSM Calculator!");
    println!("Perform integer arithmetic with +, -, *, /, =, o=on, f=off, c=clear, q=quit");
    println!("Calculator OFF");

    'input: for line in io::stdin().lock().lines() {
        for key in line?.bytes() {
            if key == b'q' {
                break 'input;
            }
            let Some(event) = event_for(key) else {
                continue;
            };
            match calc.inject(event, &key) {
                Ok(()) => {}
                Err(err) if err.is_unhandled() => {}
                Err(err) => warn!(key = %char::from(key), error = %err, "key rejected"),
            }
        }
    }

    calc.off()?;
    println!("Exit");
    Ok(())
}
