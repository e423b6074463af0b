// store.rs
//
// Process-wide symbol registry. Written under a lock during pass 1
// (indexing), frozen before pass 2 (analysis). The only sanctioned
// post-freeze write path is the property-union side table, which
// keeps its own lock.

use crate::entities::*;
use crate::scope::Scope;
use crate::types::TypeSet;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

/// Names one file contributed, so re-indexing a file can retract its
/// previous contribution first.
#[derive(Debug, Default, Clone)]
struct FileSymbols {
    classes: Vec<String>,
    traits: Vec<String>,
    functions: Vec<String>,
    constants: Vec<String>,
    overrides: Vec<String>,
}

#[derive(Debug, Default)]
struct Registry {
    classes: FxHashMap<String, ClassInfo>,
    traits: FxHashMap<String, ClassInfo>,
    functions: FxHashMap<String, FuncInfo>,
    constants: FxHashMap<String, ConstantInfo>,
    function_overrides: FxHashMap<String, FuncOverride>,
    global_scope: Scope,
    per_file: FxHashMap<String, FileSymbols>,
    /// FQNs that were defined by more than one file (last writer wins).
    duplicates: usize,
}

#[derive(Debug, Default)]
pub struct MetadataStore {
    inner: RwLock<Registry>,
    indexing_complete: AtomicBool,
    property_unions: Mutex<FxHashMap<(String, String), TypeSet>>,
}

/// Indexing statistics, for logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub classes: usize,
    pub functions: usize,
    pub constants: usize,
    pub files: usize,
    pub duplicates: usize,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_indexing_complete(&self) -> bool {
        self.indexing_complete.load(Ordering::Acquire)
    }

    /// Flip the indexing barrier. Setting it to true flattens traits
    /// into the classes that use them; queries made before that see
    /// a possibly-incomplete registry and must be gated on
    /// `is_indexing_complete`.
    pub fn set_indexing_complete(&self, complete: bool) {
        if complete {
            let mut reg = self.inner.write().expect("metadata lock poisoned");
            flatten_traits(&mut reg);
        }
        self.indexing_complete.store(complete, Ordering::Release);
    }

    /// Replace the given file's contribution with `meta`.
    ///
    /// Panics when called after indexing completed: that is an
    /// internal scheduling bug, not a user-input condition.
    pub fn update_file_meta(&self, filename: &str, meta: &FileMeta) {
        assert!(
            !self.is_indexing_complete(),
            "metadata store is frozen; update_file_meta is a pass-1 operation"
        );
        let mut reg = self.inner.write().expect("metadata lock poisoned");
        retract_file(&mut reg, filename);

        let mut symbols = FileSymbols::default();
        for (name, info) in &meta.classes {
            if reg.classes.insert(name.clone(), info.clone()).is_some() {
                reg.duplicates += 1;
            }
            symbols.classes.push(name.clone());
        }
        for (name, info) in &meta.traits {
            if reg.traits.insert(name.clone(), info.clone()).is_some() {
                reg.duplicates += 1;
            }
            symbols.traits.push(name.clone());
        }
        for (name, info) in &meta.functions {
            if reg.functions.insert(name.clone(), info.clone()).is_some() {
                reg.duplicates += 1;
            }
            symbols.functions.push(name.clone());
        }
        for (name, info) in &meta.constants {
            if reg.constants.insert(name.clone(), info.clone()).is_some() {
                reg.duplicates += 1;
            }
            symbols.constants.push(name.clone());
        }
        for (name, ov) in &meta.function_overrides {
            reg.function_overrides.insert(name.clone(), *ov);
            symbols.overrides.push(name.clone());
        }
        if let Some(scope) = &meta.scope {
            let global = &mut reg.global_scope;
            scope.iterate(|name, typ, always| {
                global.add_var(name, typ.clone(), "global scope", always);
            });
        }
        reg.per_file.insert(filename.to_string(), symbols);
    }

    pub fn get_class(&self, fqn: &str) -> Option<ClassInfo> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.classes.get(fqn).cloned()
    }

    pub fn get_trait(&self, fqn: &str) -> Option<ClassInfo> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.traits.get(fqn).cloned()
    }

    /// Class or trait lookup: trait bodies are walked like classes.
    pub fn get_class_or_trait(&self, fqn: &str) -> Option<ClassInfo> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.classes
            .get(fqn)
            .or_else(|| reg.traits.get(fqn))
            .cloned()
    }

    pub fn has_class(&self, fqn: &str) -> bool {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.classes.contains_key(fqn)
    }

    pub fn get_function(&self, fqn: &str) -> Option<FuncInfo> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.functions.get(fqn).cloned()
    }

    pub fn get_constant(&self, fqn: &str) -> Option<ConstantInfo> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.constants.get(fqn).cloned()
    }

    pub fn get_function_override(&self, fqn: &str) -> Option<FuncOverride> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.function_overrides.get(fqn).copied()
    }

    pub fn global_var_type(&self, name: &str) -> Option<TypeSet> {
        let reg = self.inner.read().expect("metadata lock poisoned");
        reg.global_scope.var_type(name).cloned()
    }

    /// Union `typ` into the recorded type of `class::prop`. This is
    /// the post-freeze write path used by `$this->prop = ...`
    /// assignments during analysis.
    pub fn add_property_union(&self, class: &str, prop: &str, typ: &TypeSet) {
        let mut unions = self.property_unions.lock().expect("property lock poisoned");
        let entry = unions
            .entry((class.to_string(), prop.to_string()))
            .or_default();
        *entry = entry.append(typ);
    }

    pub fn property_union(&self, class: &str, prop: &str) -> Option<TypeSet> {
        let unions = self.property_unions.lock().expect("property lock poisoned");
        unions.get(&(class.to_string(), prop.to_string())).cloned()
    }

    pub fn stats(&self) -> StoreStats {
        let reg = self.inner.read().expect("metadata lock poisoned");
        StoreStats {
            classes: reg.classes.len(),
            functions: reg.functions.len(),
            constants: reg.constants.len(),
            files: reg.per_file.len(),
            duplicates: reg.duplicates,
        }
    }
}

fn retract_file(reg: &mut Registry, filename: &str) {
    let Some(symbols) = reg.per_file.remove(filename) else {
        return;
    };
    for name in &symbols.classes {
        reg.classes.remove(name);
    }
    for name in &symbols.traits {
        reg.traits.remove(name);
    }
    for name in &symbols.functions {
        reg.functions.remove(name);
    }
    for name in &symbols.constants {
        reg.constants.remove(name);
    }
    for name in &symbols.overrides {
        reg.function_overrides.remove(name);
    }
}

/// Merge trait members into every class that uses them. Own members
/// win; nested trait uses are followed with a visited set so cyclic
/// `use` chains terminate.
fn flatten_traits(reg: &mut Registry) {
    let class_names: Vec<String> = reg.classes.keys().cloned().collect();
    for class_name in class_names {
        let mut pending: Vec<String> = reg
            .classes
            .get(&class_name)
            .map(|c| c.traits.clone())
            .unwrap_or_default();
        let mut visited: Vec<String> = Vec::new();

        while let Some(trait_name) = pending.pop() {
            if visited.contains(&trait_name) {
                continue;
            }
            visited.push(trait_name.clone());
            let Some(trait_info) = reg.traits.get(&trait_name).cloned() else {
                continue;
            };
            pending.extend(trait_info.traits.iter().cloned());
            let class = reg
                .classes
                .get_mut(&class_name)
                .expect("class names snapshot is stable");
            for (name, method) in trait_info.methods {
                class.methods.entry(name).or_insert(method);
            }
            for (name, prop) in trait_info.properties {
                class.properties.entry(name).or_insert(prop);
            }
            for (name, constant) in trait_info.constants {
                class.constants.entry(name).or_insert(constant);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn class_with_method(method: &str) -> ClassInfo {
        let mut info = ClassInfo::default();
        info.methods.insert(method.to_string(), FuncInfo::default());
        info
    }

    #[test]
    fn update_is_idempotent_per_file() {
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        meta.classes.insert("\\A".into(), class_with_method("m"));
        store.update_file_meta("a.php", &meta);
        store.update_file_meta("a.php", &meta);
        assert_eq!(store.stats().classes, 1);
        assert_eq!(store.stats().duplicates, 0);
    }

    #[test]
    fn duplicate_definitions_last_writer_wins() {
        let store = MetadataStore::new();
        let mut meta_a = FileMeta::default();
        meta_a.classes.insert("\\A".into(), class_with_method("from_a"));
        let mut meta_b = FileMeta::default();
        meta_b.classes.insert("\\A".into(), class_with_method("from_b"));
        store.update_file_meta("a.php", &meta_a);
        store.update_file_meta("b.php", &meta_b);
        assert_eq!(store.stats().duplicates, 1);
        let class = store.get_class("\\A").unwrap();
        assert!(class.methods.contains_key("from_b"));
    }

    #[test]
    fn trait_flattening_on_freeze() {
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        let mut class = ClassInfo {
            traits: vec!["\\T".into()],
            ..Default::default()
        };
        class.methods.insert("own".into(), FuncInfo::default());
        meta.classes.insert("\\C".into(), class);
        meta.traits.insert("\\T".into(), class_with_method("helper"));
        store.update_file_meta("a.php", &meta);
        store.set_indexing_complete(true);
        let class = store.get_class("\\C").unwrap();
        assert!(class.methods.contains_key("own"));
        assert!(class.methods.contains_key("helper"));
    }

    #[test]
    fn cyclic_trait_uses_terminate() {
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        let class = ClassInfo {
            traits: vec!["\\T1".into()],
            ..Default::default()
        };
        meta.classes.insert("\\C".into(), class);
        let mut t1 = class_with_method("a");
        t1.traits = vec!["\\T2".into()];
        let mut t2 = class_with_method("b");
        t2.traits = vec!["\\T1".into()];
        meta.traits.insert("\\T1".into(), t1);
        meta.traits.insert("\\T2".into(), t2);
        store.update_file_meta("a.php", &meta);
        store.set_indexing_complete(true);
        let class = store.get_class("\\C").unwrap();
        assert!(class.methods.contains_key("a"));
        assert!(class.methods.contains_key("b"));
    }

    #[test]
    fn property_unions_are_separate_from_registry() {
        let store = MetadataStore::new();
        store.set_indexing_complete(true);
        store.add_property_union("\\C", "items", &TypeSet::of(Type::Int));
        store.add_property_union("\\C", "items", &TypeSet::of(Type::String));
        let union = store.property_union("\\C", "items").unwrap();
        assert_eq!(union.len(), 2);
    }
}
