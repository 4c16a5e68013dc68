//! A small expression engine that parses and evaluates arithmetic / logical
//! / indexing / slicing / property / invocation expressions supplied as
//! tagged template fragments.
//!
//! The pipeline is strict: a [Tokenizer](tokenizer::Tokenizer) scans
//! fragments and embedded values into tokens, a [Parser](parser::parse)
//! turns those into an [Expr](ast::Expr) tree by precedence climbing, and
//! [eval::eval] walks the tree against an [Engine], consulting its Binding
//! Table and Overload Registry to dispatch operators.
//!
//! ```
//! use tagged_expr::{with_singleton, Value};
//!
//! let result = with_singleton(|engine| engine.eval_str("2 + 3 * 4")).unwrap();
//! assert_eq!(result, Value::Int(14));
//! ```

mod ast;
mod defaults;
mod engine;
mod error;
mod eval;
mod operator;
mod overload;
mod parser;
mod token;
mod tokenizer;
pub mod util;
mod value;

pub use engine::{reset_singleton, with_singleton, Engine};
pub use error::{EngineError, EvalError, ParseError, TokenizingError};
pub use operator::OpTag;
pub use value::{ClassDef, ClassId, ClassObject, NativeFn, OverloadFn, Value};

/// Evaluate a tagged-template expression against the process-wide singleton
/// engine.
pub fn eval_template(fragments: &[&str], values: Vec<Value>) -> Result<Value, EngineError> {
    with_singleton(|engine| engine.eval_template(fragments, values))
}

/// Evaluate a plain-string expression against the process-wide singleton
/// engine; equivalent to the tagged-template form with no embedded values.
pub fn eval_str(source: &str) -> Result<Value, EngineError> {
    with_singleton(|engine| engine.eval_str(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_sequence_concatenation() {
        reset_singleton();
        let left = Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![
            Value::Int(1),
            Value::Int(2),
        ])));
        let right = Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![
            Value::Int(3),
            Value::Int(4),
        ])));
        let result = eval_template(&["", " + ", ""], vec![left, right]).unwrap();
        assert_eq!(
            result,
            Value::List(std::rc::Rc::new(std::cell::RefCell::new(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Int(4),
            ])))
        );
    }

    #[test]
    fn end_to_end_reverse_slice() {
        reset_singleton();
        let arr = Value::List(std::rc::Rc::new(std::cell::RefCell::new(
            (1..=8).map(Value::Int).collect(),
        )));
        let mut engine = Engine::new();
        engine.bind("arr", arr);
        let result = engine.eval_str("arr[::-1]").unwrap();
        assert_eq!(
            result,
            Value::List(std::rc::Rc::new(std::cell::RefCell::new(
                (1..=8).rev().map(Value::Int).collect()
            )))
        );
    }

    #[test]
    fn end_to_end_math_max() {
        reset_singleton();
        assert_eq!(eval_str("Math.max(3, 4)").unwrap(), Value::Int(4));
    }
}
