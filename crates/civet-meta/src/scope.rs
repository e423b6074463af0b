// scope.rs
//
// Variable environment for one block context. Entries keep insertion
// order so reports come out in source order; deletion leaves a
// tombstone instead of shifting indices.

use crate::types::TypeSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarInfo {
    pub typ: TypeSet,
    /// Why the variable exists ("assign", "foreach_value", "@var", ...).
    pub reason: String,
    /// Defined on every control path that reaches this point.
    pub always_defined: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    entries: Vec<Option<(String, VarInfo)>>,
    index: FxHashMap<String, usize>,
    in_closure: bool,
    in_instance_method: bool,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Union `typ` into the entry for `name`, creating it if absent.
    /// `always_defined` is OR'd into an existing entry.
    pub fn add_var(&mut self, name: &str, typ: TypeSet, reason: &str, always_defined: bool) {
        match self.index.get(name) {
            Some(&idx) => {
                let entry = self.entries[idx]
                    .as_mut()
                    .expect("index points at live entry");
                entry.1.typ = entry.1.typ.append(&typ);
                entry.1.always_defined = entry.1.always_defined || always_defined;
            }
            None => {
                let idx = self.entries.len();
                self.entries.push(Some((
                    name.to_string(),
                    VarInfo {
                        typ,
                        reason: reason.to_string(),
                        always_defined,
                    },
                )));
                self.index.insert(name.to_string(), idx);
            }
        }
    }

    /// Unconditional overwrite (explicit assignment).
    pub fn replace_var(&mut self, name: &str, typ: TypeSet, reason: &str, always_defined: bool) {
        match self.index.get(name) {
            Some(&idx) => {
                let entry = self.entries[idx]
                    .as_mut()
                    .expect("index points at live entry");
                entry.1 = VarInfo {
                    typ,
                    reason: reason.to_string(),
                    always_defined,
                };
            }
            None => self.add_var(name, typ, reason, always_defined),
        }
    }

    /// Register a type assertion coming from a `@var` docblock.
    pub fn add_var_from_doc(&mut self, name: &str, typ: TypeSet, reason: &str) {
        self.replace_var(name, typ, reason, true);
    }

    /// Remove the variable (e.g. `unset`).
    pub fn del_var(&mut self, name: &str) {
        if let Some(idx) = self.index.remove(name) {
            self.entries[idx] = None;
        }
    }

    /// Defined on every path.
    pub fn have_var(&self, name: &str) -> bool {
        self.get(name).is_some_and(|info| info.always_defined)
    }

    /// Known at all, even if only on some paths.
    pub fn maybe_have_var(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&VarInfo> {
        let idx = *self.index.get(name)?;
        self.entries[idx].as_ref().map(|(_, info)| info)
    }

    pub fn var_type(&self, name: &str) -> Option<&TypeSet> {
        self.get(name).map(|info| &info.typ)
    }

    /// Visit live entries in insertion order.
    pub fn iterate(&self, mut f: impl FnMut(&str, &TypeSet, bool)) {
        for entry in self.entries.iter().flatten() {
            f(&entry.0, &entry.1.typ, entry.1.always_defined);
        }
    }

    pub fn set_in_closure(&mut self, value: bool) {
        self.in_closure = value;
    }

    pub fn is_in_closure(&self) -> bool {
        self.in_closure
    }

    pub fn set_in_instance_method(&mut self, value: bool) {
        self.in_instance_method = value;
    }

    pub fn is_in_instance_method(&self) -> bool {
        self.in_instance_method
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn add_var_unions_types_and_ors_definedness() {
        let mut scope = Scope::new();
        scope.add_var("x", TypeSet::of(Type::Int), "assign", false);
        scope.add_var("x", TypeSet::of(Type::String), "assign", true);
        let info = scope.get("x").unwrap();
        assert_eq!(info.typ.len(), 2);
        assert!(info.always_defined);
    }

    #[test]
    fn replace_var_overwrites() {
        let mut scope = Scope::new();
        scope.add_var("x", TypeSet::of(Type::Int), "assign", true);
        scope.replace_var("x", TypeSet::of(Type::String), "assign", true);
        assert!(scope.get("x").unwrap().typ.is(&Type::String));
    }

    #[test]
    fn have_var_requires_always_defined() {
        let mut scope = Scope::new();
        scope.add_var("x", TypeSet::of(Type::Int), "if body", false);
        assert!(!scope.have_var("x"));
        assert!(scope.maybe_have_var("x"));
    }

    #[test]
    fn del_var_keeps_iteration_order() {
        let mut scope = Scope::new();
        scope.add_var("a", TypeSet::mixed(), "assign", true);
        scope.add_var("b", TypeSet::mixed(), "assign", true);
        scope.add_var("c", TypeSet::mixed(), "assign", true);
        scope.del_var("b");
        let mut names = Vec::new();
        scope.iterate(|name, _, _| names.push(name.to_string()));
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(scope.len(), 2);
    }
}
