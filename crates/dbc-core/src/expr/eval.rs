//! Expression evaluation against locals and caller-owned state
//!
//! Identifiers resolve to locals first (call arguments or a condition's bag),
//! then to state fields. Evaluation is pure except for assignments in a
//! [`Program`], which write state fields.

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, Program, Statement, TypeTest, UnaryOp};
use crate::value::{Bag, State, Value};
use crate::{Error, Result};

impl Expr {
    /// Evaluate against `locals`, falling back to `state`
    pub fn evaluate(&self, locals: &Bag, state: &State) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => locals
                .get(name)
                .or_else(|| state.get(name))
                .cloned()
                .ok_or_else(|| Error::ExecutionError(format!("Unknown identifier '{}'", name))),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(locals, state)?;
                unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    let left = expect_bool(lhs.evaluate(locals, state)?)?;
                    // short-circuit
                    if (*op == BinaryOp::And && !left) || (*op == BinaryOp::Or && left) {
                        return Ok(Value::Boolean(left));
                    }
                    Ok(Value::Boolean(expect_bool(rhs.evaluate(locals, state)?)?))
                }
                _ => {
                    let left = lhs.evaluate(locals, state)?;
                    let right = rhs.evaluate(locals, state)?;
                    binary(*op, &left, &right)
                }
            },
            Expr::Test {
                operand,
                test,
                negated,
            } => {
                let value = operand.evaluate(locals, state)?;
                let passed = match test {
                    TypeTest::Empty => value.is_empty(),
                    TypeTest::Boolean => matches!(value, Value::Boolean(_)),
                    TypeTest::Number => matches!(value, Value::Integer(_) | Value::Float(_)),
                };
                Ok(Value::Boolean(passed != *negated))
            }
        }
    }
}

impl Program {
    /// Run every statement in order; the last statement's value is returned
    pub fn run(&self, locals: &Bag, state: &mut State) -> Result<Value> {
        let mut last = Value::Null;
        for statement in &self.statements {
            last = match statement {
                Statement::Assign { name, value } => {
                    let value = value.evaluate(locals, state)?;
                    state.set(name.clone(), value.clone());
                    value
                }
                Statement::Expr(expr) => expr.evaluate(locals, state)?,
            };
        }
        Ok(last)
    }
}

fn expect_bool(value: Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => Err(type_error("Boolean", &other)),
    }
}

fn type_error(expected: &str, found: &Value) -> Error {
    Error::ExecutionError(format!(
        "Type mismatch: expected {}, found {}",
        expected,
        found.type_name()
    ))
}

fn unary(op: UnaryOp, value: Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Boolean(!expect_bool(value)?)),
        (UnaryOp::Neg, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(type_error("number", &other)),
    }
}

fn overflow() -> Error {
    Error::ExecutionError("Integer overflow".into())
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(equals(left, right))),
        BinaryOp::NotEq => Ok(Value::Boolean(!equals(left, right))),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            let ordering = compare(left, right)?;
            Ok(Value::Boolean(match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEq => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, left, right),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in evaluate"),
    }
}

/// Integers and floats compare numerically; everything else structurally
fn equals(left: &Value, right: &Value) -> bool {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        return a == b;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => return Ok(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => return Ok(a.cmp(b)),
        _ => {}
    }
    let a = left.as_f64().ok_or_else(|| type_error("number", left))?;
    let b = right.as_f64().ok_or_else(|| type_error("number", right))?;
    a.partial_cmp(&b)
        .ok_or_else(|| Error::ExecutionError("Cannot compare NaN".into()))
}

/// Integer arithmetic stays integral (division only when exact); anything
/// involving a float is computed in f64. Division by zero is an error.
fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
            _ => {
                if b == 0 {
                    return Err(Error::ExecutionError("Division by zero".into()));
                }
                match a.checked_rem(b) {
                    Some(0) => a.checked_div(b).map(Value::Integer).ok_or_else(overflow),
                    Some(_) => Ok(Value::Float(a as f64 / b as f64)),
                    None => Err(overflow()),
                }
            }
        };
    }

    let a = left.as_f64().ok_or_else(|| type_error("number", left))?;
    let b = right.as_f64().ok_or_else(|| type_error("number", right))?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => {
            if b == 0.0 {
                return Err(Error::ExecutionError("Division by zero".into()));
            }
            a / b
        }
    };
    Ok(Value::Float(result))
}
