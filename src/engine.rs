//! Engine instance: owns a binding table and an overload table, exposes
//! the tagged-template/string façade, and backs the process-wide
//! singleton.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::defaults;
use crate::error::EngineError;
use crate::operator::OpTag;
use crate::overload::{self, OverloadTable};
use crate::parser;
use crate::tokenizer::Tokenizer;
use crate::value::{ClassDef, ClassId, OverloadFn, Value};

/// A collection of bindings, overloads, and the pipeline methods that
/// consume them (GLOSSARY).
pub struct Engine {
    bindings: HashMap<String, Value>,
    overloads: OverloadTable,
    classes: HashMap<ClassId, ClassDef>,
}

impl Engine {
    /// A bare engine with no bindings or overloads installed.
    pub fn bare() -> Self {
        Self {
            bindings: HashMap::new(),
            overloads: OverloadTable::default(),
            classes: HashMap::new(),
        }
    }

    /// An engine with the built-in overload defaults and default bindings
    /// installed.
    pub fn new() -> Self {
        let mut engine = Self::bare();
        defaults::install(&mut engine);
        engine
    }

    // -- Binding API ----------------------------------------------------

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn bind_all<I, S>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        for (name, value) in pairs {
            self.bind(name, value);
        }
    }

    pub fn unbind_all(&mut self, names: &[&str]) {
        for name in names {
            self.bindings.remove(*name);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    // -- Overload API -----------------------------------------------------

    pub fn register_overload(&mut self, class: ClassId, op: OpTag, f: OverloadFn) {
        self.overloads.register(class, op, f);
    }

    pub fn register_overloads(&mut self, class: ClassId, fns: Vec<(OpTag, OverloadFn)>) {
        self.overloads.register_many(class, fns);
    }

    pub fn register_class(&mut self, class: ClassId, def: ClassDef) {
        self.classes.insert(class, def);
    }

    pub fn lookup_overload(&self, value: &Value, tag: OpTag) -> Option<OverloadFn> {
        overload::resolve(&self.overloads, &self.classes, value, tag)
    }

    pub fn lookup_overload_for_class(&self, class: &ClassId, tag: OpTag) -> Option<OverloadFn> {
        self.overloads.lookup(class, tag).or_else(|| {
            let def = self.classes.get(class)?;
            def.declared_ops.get(&tag).cloned()
        })
    }

    // -- Primary entry point ------------------------------------------------

    /// Tagged-template form: fragments interleaved with already-embedded
    /// values.
    pub fn eval_template(&self, fragments: &[&str], values: Vec<Value>) -> Result<Value, EngineError> {
        let tokens = Tokenizer::new().tokenize_template(fragments, values)?;
        let expr = parser::parse(&tokens, fragments)?;
        Ok(crate::eval::eval(&expr, self)?)
    }

    /// Plain-string form; equivalent to a single fragment with no embedded
    /// values.
    pub fn eval_str(&self, source: &str) -> Result<Value, EngineError> {
        self.eval_template(&[source], vec![])
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static SINGLETON: RefCell<Engine> = RefCell::new(Engine::new());
}

/// Access the process-wide singleton: lazily constructed on first use,
/// thread-local because [Value] is `Rc`-based and not `Send`.
pub fn with_singleton<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
    SINGLETON.with(|cell| f(&mut cell.borrow_mut()))
}

/// Discard all bindings and overloads added to the singleton; never affects
/// user-created engines.
pub fn reset_singleton() {
    SINGLETON.with(|cell| *cell.borrow_mut() = Engine::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_engine_has_no_default_bindings() {
        let engine = Engine::bare();
        assert!(engine.lookup("true").is_none());
    }

    #[test]
    fn new_engine_installs_default_bindings() {
        let engine = Engine::new();
        assert_eq!(engine.lookup("true"), Some(Value::Bool(true)));
    }

    #[test]
    fn eval_str_runs_the_full_pipeline() {
        let engine = Engine::new();
        assert_eq!(engine.eval_str("2 + 3 * 4").unwrap(), Value::Int(14));
    }

    #[test]
    fn singleton_reset_discards_added_bindings() {
        with_singleton(|e| e.bind("scratch", Value::Int(1)));
        assert!(with_singleton(|e| e.lookup("scratch")).is_some());
        reset_singleton();
        assert!(with_singleton(|e| e.lookup("scratch")).is_none());
    }
}
