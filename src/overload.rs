//! Overload registry: a two-level map from (class identity, operation tag)
//! to an implementation, plus the prototype-chain walk that lets a class
//! declare an operator on itself without touching any engine instance.

use std::collections::HashMap;

use crate::operator::OpTag;
use crate::value::{ClassDef, ClassId, OverloadFn};
use crate::value::Value;

/// Engine-local overload registrations: (class, operation tag) -> function.
#[derive(Default)]
pub struct OverloadTable {
    entries: HashMap<(ClassId, OpTag), OverloadFn>,
}

impl OverloadTable {
    pub fn register(&mut self, class: ClassId, tag: OpTag, f: OverloadFn) {
        self.entries.insert((class, tag), f);
    }

    pub fn register_many(&mut self, class: ClassId, fns: Vec<(OpTag, OverloadFn)>) {
        for (tag, f) in fns {
            self.register(class.clone(), tag, f);
        }
    }

    pub fn lookup(&self, class: &ClassId, tag: OpTag) -> Option<OverloadFn> {
        self.entries.get(&(class.clone(), tag)).cloned()
    }
}

/// Walk the prototype chain from `value`'s class upward, returning the
/// first overload found for `tag`:
///
/// 1. an engine-local registration for `(class, tag)`,
/// 2. otherwise a method the class declares on itself under
///    [OpTag::declared_name],
/// 3. otherwise move to the class's parent.
///
/// The chain terminates once a built-in class (no parent concept) or a
/// [ClassId::Custom] with no registered parent is reached.
pub fn resolve(
    overloads: &OverloadTable,
    classes: &HashMap<ClassId, ClassDef>,
    value: &Value,
    tag: OpTag,
) -> Option<OverloadFn> {
    let mut class = value.class_id();
    loop {
        if let Some(f) = overloads.lookup(&class, tag) {
            return Some(f);
        }
        match &class {
            ClassId::Custom(_) => {
                let def = classes.get(&class)?;
                if let Some(f) = def.declared_ops.get(&tag) {
                    return Some(f.clone());
                }
                match &def.parent {
                    Some(parent) => class = parent.clone(),
                    None => return None,
                }
            }
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use std::rc::Rc;

    fn always_one() -> OverloadFn {
        Rc::new(|_self: &Value, _args: &[Value]| -> Result<Value, EvalError> {
            Ok(Value::Int(1))
        })
    }

    #[test]
    fn engine_registration_is_found_directly() {
        let mut overloads = OverloadTable::default();
        overloads.register(ClassId::Int, OpTag::Add, always_one());
        let classes = HashMap::new();
        let found = resolve(&overloads, &classes, &Value::Int(5), OpTag::Add);
        assert!(found.is_some());
    }

    #[test]
    fn class_declared_operator_is_found_without_engine_registration() {
        let overloads = OverloadTable::default();
        let mut classes = HashMap::new();
        let mut def = ClassDef::default();
        def.declared_ops.insert(OpTag::Add, always_one());
        let point = ClassId::Custom("Point".into());
        classes.insert(point.clone(), def);

        #[derive(Debug)]
        struct Point;
        impl crate::value::ClassObject for Point {
            fn class_id(&self) -> ClassId {
                ClassId::Custom("Point".into())
            }
        }
        let value = Value::Object(Rc::new(Point));
        assert!(resolve(&overloads, &classes, &value, OpTag::Add).is_some());
    }

    #[test]
    fn lookup_walks_up_to_a_parent_class() {
        let overloads = OverloadTable::default();
        let mut classes = HashMap::new();
        let mut base = ClassDef::default();
        base.declared_ops.insert(OpTag::Add, always_one());
        classes.insert(ClassId::Custom("Base".into()), base);
        classes.insert(
            ClassId::Custom("Derived".into()),
            ClassDef {
                parent: Some(ClassId::Custom("Base".into())),
                declared_ops: Default::default(),
            },
        );

        #[derive(Debug)]
        struct Derived;
        impl crate::value::ClassObject for Derived {
            fn class_id(&self) -> ClassId {
                ClassId::Custom("Derived".into())
            }
        }
        let value = Value::Object(Rc::new(Derived));
        assert!(resolve(&overloads, &classes, &value, OpTag::Add).is_some());
    }

    #[test]
    fn no_overload_returns_none() {
        let overloads = OverloadTable::default();
        let classes = HashMap::new();
        assert!(resolve(&overloads, &classes, &Value::Int(5), OpTag::Add).is_none());
    }
}
