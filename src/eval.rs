//! Evaluator: walks an [Expr] tree against an [Engine], dispatching each
//! operator through the overload registry before falling back to native
//! semantics on primitive operands.

use num_bigint::BigInt;

use crate::ast::{Dimension, Expr, ValueSource};
use crate::engine::Engine;
use crate::error::EvalError;
use crate::operator::OpTag;
use crate::value::Value;

pub fn eval(expr: &Expr, engine: &Engine) -> Result<Value, EvalError> {
    match expr {
        Expr::Value(ValueSource::Embedded(v)) => Ok(v.clone()),
        Expr::Value(ValueSource::Constant(c)) => Ok(c.clone().into_value()),

        Expr::Identifier(name) => engine
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),

        Expr::Unary { op, operand } => {
            let value = eval(operand, engine)?;
            match engine.lookup_overload(&value, *op) {
                Some(f) => f(&value, &[]),
                None => native_unary(*op, &value),
            }
        }

        Expr::Binary { left, op, right } => {
            let left = eval(left, engine)?;
            let right = eval(right, engine)?;
            if let Some(f) = engine.lookup_overload(&left, *op) {
                return f(&left, &[right]);
            }
            if let Some(f) = engine.lookup_overload(&right, *op) {
                return f(&right, &[left]);
            }
            native_binary(*op, &left, &right)
        }

        Expr::AccessProperty { object, property } => {
            let object = eval(object, engine)?;
            object
                .get_property(property)
                .ok_or_else(|| EvalError::NoSuchProperty(property.clone()))
        }

        Expr::Invoke { callee, args } => {
            let callee = eval(callee, engine)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, engine)?);
            }
            callee.call(&values)
        }

        Expr::Indexing { target, index } => {
            let target = eval(target, engine)?;
            let index = eval(index, engine)?;
            eval_index(engine, &target, index)
        }

        Expr::Slicing { target, dimensions } => {
            let target = eval(target, engine)?;
            let mut evaluated = Vec::with_capacity(dimensions.len());
            for dim in dimensions {
                evaluated.push(eval_dimension(dim, engine)?);
            }
            if let Some(f) = engine.lookup_overload(&target, OpTag::Slice) {
                let args: Vec<Value> = evaluated
                    .into_iter()
                    .map(|(s, e, st)| Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![
                        s.unwrap_or(Value::Unit),
                        e.unwrap_or(Value::Unit),
                        st.unwrap_or(Value::Unit),
                    ]))))
                    .collect();
                return f(&target, &args);
            }
            // No overload: only a single all-start dimension degenerates to
            // an index access.
            if let [(Some(start), None, None)] = evaluated.as_slice() {
                return eval_index(engine, &target, start.clone());
            }
            Err(EvalError::UnsupportedSlicing)
        }
    }
}

type EvaluatedDimension = (Option<Value>, Option<Value>, Option<Value>);

fn eval_dimension(dim: &Dimension, engine: &Engine) -> Result<EvaluatedDimension, EvalError> {
    let start = dim.start.as_ref().map(|e| eval(e, engine)).transpose()?;
    let end = dim.end.as_ref().map(|e| eval(e, engine)).transpose()?;
    let step = dim.step.as_ref().map(|e| eval(e, engine)).transpose()?;
    Ok((start, end, step))
}

fn eval_index(engine: &Engine, target: &Value, index: Value) -> Result<Value, EvalError> {
    if let Some(f) = engine.lookup_overload(target, OpTag::Index) {
        return f(target, &[index]);
    }
    native_index(target, &index)
}

fn native_unary(op: OpTag, value: &Value) -> Result<Value, EvalError> {
    match op {
        OpTag::Not => Ok(Value::Bool(!value.is_truthy())),
        OpTag::BitNot => match value {
            Value::Int(n) => Ok(Value::Int(!n)),
            Value::Bool(b) => Ok(Value::Int(!(*b as i64))),
            _ => unsupported("~", value),
        },
        OpTag::Neg => match value {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            Value::BigInt(n) => Ok(Value::BigInt(std::rc::Rc::new(-n.as_ref().clone()))),
            _ => unsupported("-x", value),
        },
        OpTag::Pos => match value {
            Value::Int(_) | Value::Float(_) | Value::BigInt(_) => Ok(value.clone()),
            _ => unsupported("+x", value),
        },
        _ => unreachable!("not a unary operation: {:?}", op),
    }
}

fn unsupported(op: &'static str, operand: &Value) -> Result<Value, EvalError> {
    Err(EvalError::UnsupportedOperation {
        op,
        operand: format!("{:?}", operand.class_id()),
    })
}

fn native_binary(op: OpTag, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use OpTag::*;
    match op {
        And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        Eq => Ok(Value::Bool(left == right)),
        Ne => Ok(Value::Bool(left != right)),
        StrictEq => Ok(Value::Bool(strict_eq(left, right))),
        StrictNe => Ok(Value::Bool(!strict_eq(left, right))),
        Add | Sub | Mul | Div | Mod | Pow => arithmetic(op, left, right),
        Shl | Shr | UShr | BitAnd | BitOr | BitXor => bitwise(op, left, right),
        Lt | Gt | Le | Ge => compare(op, left, right),
        _ => unreachable!("not a binary operation: {:?}", op),
    }
}

fn strict_eq(left: &Value, right: &Value) -> bool {
    use Value::*;
    match (left, right) {
        (Int(_), Float(_)) | (Float(_), Int(_)) => false,
        _ => left == right,
    }
}

enum Num {
    Int(i64),
    Float(f64),
    BigInt(BigInt),
}

fn numeric(value: &Value) -> Option<Num> {
    match value {
        Value::Int(n) => Some(Num::Int(*n)),
        Value::Float(n) => Some(Num::Float(*n)),
        Value::BigInt(n) => Some(Num::BigInt(n.as_ref().clone())),
        Value::Bool(b) => Some(Num::Int(*b as i64)),
        _ => None,
    }
}

fn arithmetic(op: OpTag, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (l, r) = match (numeric(left), numeric(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return unsupported(op.declared_name(), left),
    };
    match (l, r) {
        (Num::BigInt(l), r) => big_arithmetic(op, l, to_bigint(r)),
        (l, Num::BigInt(r)) => big_arithmetic(op, to_bigint(l), r),
        (Num::Float(l), r) => float_arithmetic(op, l, to_f64(r)),
        (l, Num::Float(r)) => float_arithmetic(op, to_f64(l), r),
        (Num::Int(l), Num::Int(r)) => int_arithmetic(op, l, r),
    }
}

fn to_bigint(n: Num) -> BigInt {
    match n {
        Num::Int(n) => BigInt::from(n),
        Num::Float(n) => BigInt::from(n as i64),
        Num::BigInt(n) => n,
    }
}

fn to_f64(n: Num) -> f64 {
    match n {
        Num::Int(n) => n as f64,
        Num::Float(n) => n,
        Num::BigInt(n) => n.to_string().parse().unwrap_or(f64::NAN),
    }
}

fn int_arithmetic(op: OpTag, l: i64, r: i64) -> Result<Value, EvalError> {
    Ok(match op {
        OpTag::Add => Value::Int(l.wrapping_add(r)),
        OpTag::Sub => Value::Int(l.wrapping_sub(r)),
        OpTag::Mul => Value::Int(l.wrapping_mul(r)),
        OpTag::Div => {
            if r == 0 {
                Value::Float(l as f64 / r as f64)
            } else {
                Value::Int(l.wrapping_div(r))
            }
        }
        OpTag::Mod => {
            if r == 0 {
                Value::Float(f64::NAN)
            } else {
                Value::Int(l.wrapping_rem(r))
            }
        }
        OpTag::Pow => {
            if r >= 0 && r <= u32::MAX as i64 {
                Value::Int(l.wrapping_pow(r as u32))
            } else {
                Value::Float((l as f64).powf(r as f64))
            }
        }
        _ => unreachable!(),
    })
}

fn float_arithmetic(op: OpTag, l: f64, r: f64) -> Result<Value, EvalError> {
    Ok(Value::Float(match op {
        OpTag::Add => l + r,
        OpTag::Sub => l - r,
        OpTag::Mul => l * r,
        OpTag::Div => l / r,
        OpTag::Mod => l % r,
        OpTag::Pow => l.powf(r),
        _ => unreachable!(),
    }))
}

fn big_arithmetic(op: OpTag, l: BigInt, r: BigInt) -> Result<Value, EvalError> {
    let result = match op {
        OpTag::Add => l + r,
        OpTag::Sub => l - r,
        OpTag::Mul => l * r,
        OpTag::Div => {
            if r == BigInt::from(0) {
                return Ok(Value::Float(f64::NAN));
            }
            l / r
        }
        OpTag::Mod => {
            if r == BigInt::from(0) {
                return Ok(Value::Float(f64::NAN));
            }
            l % r
        }
        OpTag::Pow => {
            let exp: u64 = r.try_into().unwrap_or(0);
            big_pow(l, exp)
        }
        _ => unreachable!(),
    };
    Ok(Value::BigInt(std::rc::Rc::new(result)))
}

fn big_pow(base: BigInt, mut exp: u64) -> BigInt {
    let mut result = BigInt::from(1);
    let mut base = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result *= &base;
        }
        base = &base * &base;
        exp >>= 1;
    }
    result
}

fn bitwise(op: OpTag, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let l = match left {
        Value::Int(n) => *n,
        Value::Bool(b) => *b as i64,
        _ => return unsupported(op.declared_name(), left),
    };
    let r = match right {
        Value::Int(n) => *n,
        Value::Bool(b) => *b as i64,
        _ => return unsupported(op.declared_name(), right),
    };
    Ok(Value::Int(match op {
        OpTag::Shl => l.wrapping_shl(r as u32),
        OpTag::Shr => l.wrapping_shr(r as u32),
        OpTag::UShr => ((l as u64).wrapping_shr(r as u32)) as i64,
        OpTag::BitAnd => l & r,
        OpTag::BitOr => l | r,
        OpTag::BitXor => l ^ r,
        _ => unreachable!(),
    }))
}

fn compare(op: OpTag, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = match (numeric(left), numeric(right)) {
        (Some(l), Some(r)) => match (l, r) {
            (Num::BigInt(l), r) => l.cmp(&to_bigint(r)),
            (l, Num::BigInt(r)) => to_bigint(l).cmp(&r),
            (l, r) => to_f64(l)
                .partial_cmp(&to_f64(r))
                .ok_or(EvalError::UnsupportedOperation {
                    op: op.declared_name(),
                    operand: "NaN".to_string(),
                })?,
        },
        _ => match (left, right) {
            (Value::Str(l), Value::Str(r)) => l.cmp(r),
            _ => return unsupported(op.declared_name(), left),
        },
    };
    Ok(Value::Bool(match op {
        OpTag::Lt => ordering.is_lt(),
        OpTag::Gt => ordering.is_gt(),
        OpTag::Le => ordering.is_le(),
        OpTag::Ge => ordering.is_ge(),
        _ => unreachable!(),
    }))
}

fn native_index(target: &Value, index: &Value) -> Result<Value, EvalError> {
    let i = match index {
        Value::Int(n) => *n,
        _ => return unsupported("[i]", target),
    };
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let idx = if i < 0 { i + items.len() as i64 } else { i };
            items
                .get(idx as usize)
                .cloned()
                .ok_or(EvalError::IndexOutOfRange { index: i, len: items.len() })
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = if i < 0 { i + chars.len() as i64 } else { i };
            chars
                .get(idx as usize)
                .map(|c| Value::Str(c.to_string().into()))
                .ok_or(EvalError::IndexOutOfRange { index: i, len: chars.len() })
        }
        _ => unsupported("[i]", target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueSource;
    use crate::token::Constant;

    fn engine() -> Engine {
        Engine::new()
    }

    fn lit_int(n: i64) -> Expr {
        Expr::Value(ValueSource::Constant(Constant::Int(n)))
    }

    #[test]
    fn constants_evaluate_to_their_decoded_value() {
        let e = engine();
        assert_eq!(eval(&lit_int(42), &e).unwrap(), Value::Int(42));
    }

    #[test]
    fn arithmetic_precedence_is_already_baked_into_the_tree() {
        let e = engine();
        let expr = Expr::Binary {
            left: Box::new(lit_int(2)),
            op: OpTag::Add,
            right: Box::new(Expr::Binary {
                left: Box::new(lit_int(3)),
                op: OpTag::Mul,
                right: Box::new(lit_int(4)),
            }),
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Int(14));
    }

    #[test]
    fn right_assoc_power_tree_evaluates_512() {
        let e = engine();
        let expr = Expr::Binary {
            left: Box::new(lit_int(2)),
            op: OpTag::Pow,
            right: Box::new(Expr::Binary {
                left: Box::new(lit_int(3)),
                op: OpTag::Pow,
                right: Box::new(lit_int(2)),
            }),
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Int(512));
    }

    #[test]
    fn unknown_identifier_fails() {
        let e = engine();
        let err = eval(&Expr::Identifier("nope".into()), &e).unwrap_err();
        assert!(matches!(err, EvalError::UnknownIdentifier(_)));
    }

    #[test]
    fn indexing_a_list_wraps_negative_indices() {
        let e = engine();
        let list = Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ])));
        let expr = Expr::Indexing {
            target: Box::new(Expr::Value(ValueSource::Embedded(list))),
            index: Box::new(lit_int(-1)),
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Int(3));
    }

    #[test]
    fn degenerate_single_start_slice_falls_back_to_indexing() {
        // A bare engine has no registered `[:]` overload for lists, so the
        // single-start-only dimension must degenerate to `[i]` rather than
        // being handled as a real slice.
        let e = Engine::bare();
        let list = Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![
            Value::Int(10),
            Value::Int(20),
        ])));
        let expr = Expr::Slicing {
            target: Box::new(Expr::Value(ValueSource::Embedded(list))),
            dimensions: vec![Dimension {
                start: Some(Box::new(lit_int(1))),
                end: None,
                step: None,
            }],
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Int(20));
    }

    #[test]
    fn string_repeat_overload_dispatches_from_the_right_operand() {
        let e = engine();
        let expr = Expr::Binary {
            left: Box::new(lit_int(3)),
            op: OpTag::Mul,
            right: Box::new(Expr::Value(ValueSource::Constant(Constant::Str("hey".into())))),
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Str("heyheyhey".into()));
    }

    #[test]
    fn strict_equality_rejects_int_float_crossover() {
        let e = engine();
        let expr = Expr::Binary {
            left: Box::new(lit_int(1)),
            op: OpTag::StrictEq,
            right: Box::new(Expr::Value(ValueSource::Constant(Constant::Float(1.0)))),
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Bool(false));
    }

    #[test]
    fn loose_equality_accepts_int_float_crossover() {
        let e = engine();
        let expr = Expr::Binary {
            left: Box::new(lit_int(1)),
            op: OpTag::Eq,
            right: Box::new(Expr::Value(ValueSource::Constant(Constant::Float(1.0)))),
        };
        assert_eq!(eval(&expr, &e).unwrap(), Value::Bool(true));
    }
}
