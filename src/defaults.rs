//! Default bindings bootstrap and built-in overload defaults: installed
//! into every [Engine] constructed via [Engine::new], including the
//! process-wide singleton.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::operator::OpTag;
use crate::value::{ClassId, Value};

pub fn install(engine: &mut Engine) {
    engine.bind("true", Value::Bool(true));
    engine.bind("false", Value::Bool(false));
    engine.bind("Math", Value::Object(Rc::new(MathObject)));

    engine.register_overload(ClassId::List, OpTag::Add, Rc::new(sequence_add));
    engine.register_overload(ClassId::List, OpTag::Index, Rc::new(sequence_index));
    engine.register_overload(ClassId::List, OpTag::Slice, Rc::new(sequence_slice));
    engine.register_overload(ClassId::Str, OpTag::Mul, Rc::new(text_repeat));
    engine.register_overload(ClassId::Set, OpTag::Add, Rc::new(set_union));
    engine.register_overload(ClassId::Set, OpTag::Sub, Rc::new(set_difference));
}

fn as_f64(v: &Value) -> Result<f64, EvalError> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        Value::BigInt(n) => Ok(n.to_string().parse().unwrap_or(f64::NAN)),
        _ => Err(EvalError::UnsupportedOperation {
            op: "Math",
            operand: format!("{:?}", v.class_id()),
        }),
    }
}

/// Bound as `Math`; exposes the numeric constants and functions the engine's
/// default configuration hook installs.
#[derive(Debug)]
struct MathObject;

impl crate::value::ClassObject for MathObject {
    fn class_id(&self) -> ClassId {
        ClassId::Custom("Math".into())
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "PI" => Some(Value::Float(std::f64::consts::PI)),
            "E" => Some(Value::Float(std::f64::consts::E)),
            "max" => Some(Value::Function(Rc::new(math_max))),
            "min" => Some(Value::Function(Rc::new(math_min))),
            "abs" => Some(Value::Function(Rc::new(math_abs))),
            "floor" => Some(Value::Function(Rc::new(math_floor))),
            "ceil" => Some(Value::Function(Rc::new(math_ceil))),
            "round" => Some(Value::Function(Rc::new(math_round))),
            "sqrt" => Some(Value::Function(Rc::new(math_sqrt))),
            "pow" => Some(Value::Function(Rc::new(math_pow))),
            _ => None,
        }
    }
}

fn math_max(args: &[Value]) -> Result<Value, EvalError> {
    let mut best = args.first().cloned().ok_or(EvalError::NotCallable)?;
    let mut best_f = as_f64(&best)?;
    for arg in &args[1..] {
        let f = as_f64(arg)?;
        if f > best_f {
            best_f = f;
            best = arg.clone();
        }
    }
    Ok(best)
}

fn math_min(args: &[Value]) -> Result<Value, EvalError> {
    let mut best = args.first().cloned().ok_or(EvalError::NotCallable)?;
    let mut best_f = as_f64(&best)?;
    for arg in &args[1..] {
        let f = as_f64(arg)?;
        if f < best_f {
            best_f = f;
            best = arg.clone();
        }
    }
    Ok(best)
}

fn math_abs(args: &[Value]) -> Result<Value, EvalError> {
    match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(n.abs())),
        Some(Value::Float(n)) => Ok(Value::Float(n.abs())),
        Some(Value::BigInt(n)) => {
            let v = n.as_ref().clone();
            let abs = if v < BigInt::from(0) { -v } else { v };
            Ok(Value::BigInt(Rc::new(abs)))
        }
        Some(other) => Err(EvalError::UnsupportedOperation {
            op: "Math.abs",
            operand: format!("{:?}", other.class_id()),
        }),
        None => Err(EvalError::NotCallable),
    }
}

fn math_floor(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(as_f64(args.first().ok_or(EvalError::NotCallable)?)?.floor()))
}

fn math_ceil(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(as_f64(args.first().ok_or(EvalError::NotCallable)?)?.ceil()))
}

fn math_round(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(as_f64(args.first().ok_or(EvalError::NotCallable)?)?.round()))
}

fn math_sqrt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(as_f64(args.first().ok_or(EvalError::NotCallable)?)?.sqrt()))
}

fn math_pow(args: &[Value]) -> Result<Value, EvalError> {
    let base = as_f64(args.first().ok_or(EvalError::NotCallable)?)?;
    let exp = as_f64(args.get(1).ok_or(EvalError::NotCallable)?)?;
    Ok(Value::Float(base.powf(exp)))
}

/// `sequence + sequence` concatenation.
fn sequence_add(this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Value::List(left) = this else {
        return Err(EvalError::UnsupportedOperation { op: "+", operand: "non-sequence".into() });
    };
    let Some(Value::List(right)) = args.first() else {
        return Err(EvalError::UnsupportedOperation { op: "+", operand: "non-sequence".into() });
    };
    let mut out = left.borrow().clone();
    out.extend(right.borrow().iter().cloned());
    Ok(Value::List(Rc::new(RefCell::new(out))))
}

/// `sequence[i]` with negative-wrap.
fn sequence_index(this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Value::List(items) = this else {
        return Err(EvalError::UnsupportedOperation { op: "[i]", operand: "non-sequence".into() });
    };
    let Some(Value::Int(i)) = args.first() else {
        return Err(EvalError::UnsupportedOperation { op: "[i]", operand: "non-integer index".into() });
    };
    let items = items.borrow();
    let idx = if *i < 0 { i + items.len() as i64 } else { *i };
    items
        .get(idx as usize)
        .cloned()
        .ok_or(EvalError::IndexOutOfRange { index: *i, len: items.len() })
}

fn dimension_part(v: &Value) -> Result<Option<i64>, EvalError> {
    match v {
        Value::Unit => Ok(None),
        Value::Int(n) => Ok(Some(*n)),
        _ => Err(EvalError::UnsupportedSlicing),
    }
}

/// Python-style single-dimension `sequence[:]`. Each dimension arrives
/// packed as a 3-element list of (start, end, step), each slot
/// `Value::Unit` when absent, matching the packing done in `eval::eval`'s
/// Slicing arm.
fn sequence_slice(this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Value::List(items) = this else {
        return Err(EvalError::UnsupportedSlicing);
    };
    if args.len() != 1 {
        // Multi-dimensional slices are rejected by the default sequence overload.
        return Err(EvalError::UnsupportedSlicing);
    }
    let Value::List(dim) = &args[0] else {
        return Err(EvalError::UnsupportedSlicing);
    };
    let dim = dim.borrow();
    let (start, end, step) = (dimension_part(&dim[0])?, dimension_part(&dim[1])?, dimension_part(&dim[2])?);

    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::StepIsZero);
    }

    let items = items.borrow();
    let len = items.len() as i64;
    let wrap = |i: i64| if i < 0 { i + len } else { i };

    let mut out = Vec::new();
    if step > 0 {
        let mut i = start.map(wrap).unwrap_or(0);
        let end = end.map(wrap).unwrap_or(len);
        while i < end {
            if i >= 0 && i < len {
                out.push(items[i as usize].clone());
            }
            i += step;
        }
    } else {
        let mut i = start.map(wrap).unwrap_or(len - 1);
        let end = end.map(wrap).unwrap_or(-1);
        while i > end {
            if i >= 0 && i < len {
                out.push(items[i as usize].clone());
            }
            i += step;
        }
    }
    Ok(Value::List(Rc::new(RefCell::new(out))))
}

/// `text * n` repetition.
fn text_repeat(this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Value::Str(s) = this else {
        return Err(EvalError::UnsupportedOperation { op: "*", operand: "non-text".into() });
    };
    let Some(Value::Int(n)) = args.first() else {
        return Err(EvalError::UnsupportedOperation { op: "*", operand: "non-integer count".into() });
    };
    let count = (*n).max(0) as usize;
    Ok(Value::Str(s.repeat(count).into()))
}

fn set_union(this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Value::Set(left) = this else {
        return Err(EvalError::UnsupportedOperation { op: "+", operand: "non-set".into() });
    };
    let Some(Value::Set(right)) = args.first() else {
        return Err(EvalError::UnsupportedOperation { op: "+", operand: "non-set".into() });
    };
    let mut out: HashSet<Value> = left.borrow().clone();
    out.extend(right.borrow().iter().cloned());
    Ok(Value::Set(Rc::new(RefCell::new(out))))
}

fn set_difference(this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Value::Set(left) = this else {
        return Err(EvalError::UnsupportedOperation { op: "-", operand: "non-set".into() });
    };
    let Some(Value::Set(right)) = args.first() else {
        return Err(EvalError::UnsupportedOperation { op: "-", operand: "non-set".into() });
    };
    let right = right.borrow();
    let out: HashSet<Value> = left.borrow().iter().filter(|v| !right.contains(*v)).cloned().collect();
    Ok(Value::Set(Rc::new(RefCell::new(out))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    #[test]
    fn sequence_add_concatenates() {
        let left = list(vec![Value::Int(1), Value::Int(2)]);
        let right = list(vec![Value::Int(3)]);
        let result = sequence_add(&left, &[right]).unwrap();
        assert_eq!(result, list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn sequence_index_wraps_negative() {
        let arr = list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let result = sequence_index(&arr, &[Value::Int(-1)]).unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn sequence_slice_reverses_with_negative_step() {
        let arr = list((1..=8).map(Value::Int).collect());
        let dim = list(vec![Value::Unit, Value::Unit, Value::Int(-1)]);
        let result = sequence_slice(&arr, &[dim]).unwrap();
        assert_eq!(result, list((1..=8).rev().map(Value::Int).collect()));
    }

    #[test]
    fn sequence_slice_step_zero_fails() {
        let arr = list(vec![Value::Int(1)]);
        let dim = list(vec![Value::Unit, Value::Unit, Value::Int(0)]);
        assert!(matches!(sequence_slice(&arr, &[dim]), Err(EvalError::StepIsZero)));
    }

    #[test]
    fn text_repeat_multiplies() {
        let result = text_repeat(&Value::Str("ha".into()), &[Value::Int(3)]).unwrap();
        assert_eq!(result, Value::Str("hahaha".into()));
    }

    #[test]
    fn math_max_returns_the_larger_argument() {
        let result = math_max(&[Value::Int(3), Value::Int(4)]).unwrap();
        assert_eq!(result, Value::Int(4));
    }
}
