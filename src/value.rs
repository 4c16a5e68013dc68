use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use num_bigint::BigInt;

use crate::error::EvalError;

/// A function bound into the engine: a built-in, a user closure, or an
/// overload implementation. Always synchronous, per the engine's
/// single-threaded evaluation model.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

/// A receiver-bound overload: invoked as `self.op(args...)`.
pub type OverloadFn = Rc<dyn Fn(&Value, &[Value]) -> Result<Value, EvalError>>;

/// A host value flowing through the pipeline. Embedded template slots and
/// constant literals both decode into this type; operators dispatch on the
/// runtime [ClassId] of their operands.
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    BigInt(Rc<BigInt>),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Set(Rc<RefCell<HashSet<Value>>>),
    Function(NativeFn),
    Object(Rc<dyn ClassObject>),
}

/// A unique, stable identity for the runtime class of a [Value]. This is the
/// key the Overload Registry uses to look up operator implementations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassId {
    Unit,
    Bool,
    Int,
    Float,
    BigInt,
    Str,
    List,
    Set,
    Function,
    Custom(Rc<str>),
}

/// A capability a host-defined object opts into so the engine can treat it
/// uniformly: property access, invocation, and class identity for overload
/// dispatch. The engine itself never inspects the data behind this trait;
/// it only calls through it.
pub trait ClassObject: Debug {
    fn class_id(&self) -> ClassId;

    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }

    fn call(&self, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::NotCallable)
    }
}

/// Engine-registered metadata for a [ClassId::Custom] class: an optional
/// parent (modeling a prototype chain) and operations the class declares
/// directly on itself.
#[derive(Default)]
pub struct ClassDef {
    pub parent: Option<ClassId>,
    pub declared_ops: std::collections::HashMap<crate::operator::OpTag, OverloadFn>,
}

impl Value {
    pub fn class_id(&self) -> ClassId {
        match self {
            Value::Unit => ClassId::Unit,
            Value::Bool(_) => ClassId::Bool,
            Value::Int(_) => ClassId::Int,
            Value::Float(_) => ClassId::Float,
            Value::BigInt(_) => ClassId::BigInt,
            Value::Str(_) => ClassId::Str,
            Value::List(_) => ClassId::List,
            Value::Set(_) => ClassId::Set,
            Value::Function(_) => ClassId::Function,
            Value::Object(obj) => obj.class_id(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::BigInt(n) => n.as_ref() != &BigInt::from(0),
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Set(s) => !s.borrow().is_empty(),
            Value::Function(_) => true,
            Value::Object(_) => true,
        }
    }

    pub fn get_property(&self, name: &str) -> Option<Value> {
        match self {
            Value::Str(s) => match name {
                "length" => Some(Value::Int(s.chars().count() as i64)),
                _ => None,
            },
            Value::List(items) => match name {
                "length" => Some(Value::Int(items.borrow().len() as i64)),
                _ => None,
            },
            Value::Object(obj) => obj.get_property(name),
            _ => None,
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        match self {
            Value::Function(f) => f(args),
            Value::Object(obj) => obj.call(args),
            _ => Err(EvalError::NotCallable),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => *a.borrow() == *b.borrow(),
            (Value::Set(a), Value::Set(b)) => *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Unit => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(n) => n.to_bits().hash(state),
            Value::BigInt(n) => n.hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) => items.borrow().hash(state),
            Value::Set(_) => {}
            Value::Function(f) => (Rc::as_ptr(f) as *const ()).hash(state),
            Value::Object(obj) => (Rc::as_ptr(obj) as *const ()).hash(state),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "unit"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Set(items) => write!(f, "set({})", items.borrow().len()),
            Value::Function(_) => write!(f, "<function>"),
            Value::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}
