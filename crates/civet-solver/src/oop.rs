// oop.rs
//
// Member lookup over inheritance chains. Parent pointers are names,
// not references, and broken code can make them cyclic; every walk
// carries a visited set and fails on a repeat.

use crate::state::ClassParseState;
use civet_meta::{AccessLevel, ConstInfo, FuncInfo, MetadataStore, PropertyInfo};
use rustc_hash::FxHashSet;

/// Walk `class` and its parents, applying `f` to each ClassInfo until
/// it yields. Terminates on unknown classes and inheritance cycles.
fn walk_parents<T>(
    store: &MetadataStore,
    class: &str,
    mut f: impl FnMut(&str, &civet_meta::ClassInfo) -> Option<T>,
) -> Option<T> {
    let mut visited = FxHashSet::default();
    let mut current = class.to_string();
    loop {
        if !visited.insert(current.clone()) {
            return None;
        }
        let info = store.get_class_or_trait(&current)?;
        if let Some(found) = f(&current, &info) {
            return Some(found);
        }
        current = info.parent.clone()?;
    }
}

/// Find a method starting at `class`, following the parent chain.
/// Returns the implementing class FQN alongside the method info.
pub fn find_method(store: &MetadataStore, class: &str, name: &str) -> Option<(String, FuncInfo)> {
    walk_parents(store, class, |fqn, info| {
        info.methods
            .get(name)
            .map(|m| (fqn.to_string(), m.clone()))
    })
}

/// Find a property; static properties are looked up with their `$`
/// prefix. Post-index property-type unions are merged into the
/// returned info.
pub fn find_property(
    store: &MetadataStore,
    class: &str,
    name: &str,
) -> Option<(String, PropertyInfo)> {
    let found = walk_parents(store, class, |fqn, info| {
        info.properties
            .get(name)
            .map(|p| (fqn.to_string(), p.clone()))
    });
    found.map(|(fqn, mut prop)| {
        if let Some(union) = store.property_union(&fqn, name) {
            prop.typ = prop.typ.append(&union);
        }
        (fqn, prop)
    })
}

/// Find a class constant following the parent chain.
pub fn find_constant(store: &MetadataStore, class: &str, name: &str) -> Option<(String, ConstInfo)> {
    walk_parents(store, class, |fqn, info| {
        info.constants
            .get(name)
            .map(|c| (fqn.to_string(), c.clone()))
    })
}

/// Magic methods make "undefined member" reports too noisy to emit,
/// but they do not bypass access checks.
pub fn has_magic_method(store: &MetadataStore, class: &str, name: &str) -> bool {
    find_method(store, class, name).is_some()
}

/// Whether `class` (or an ancestor) declares that it implements
/// `interface`.
pub fn implements(store: &MetadataStore, class: &str, interface: &str) -> bool {
    let mut visited = FxHashSet::default();
    let mut pending = vec![class.to_string()];
    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(info) = store.get_class_or_trait(&current) else {
            continue;
        };
        if info.interfaces.iter().any(|i| i == interface) {
            return true;
        }
        pending.extend(info.interfaces.iter().cloned());
        if let Some(parent) = info.parent {
            pending.push(parent);
        }
    }
    false
}

/// Can code in the context described by `state` access a member of
/// `impl_class` with the given access level?
pub fn can_access(
    store: &MetadataStore,
    state: &ClassParseState,
    impl_class: &str,
    level: AccessLevel,
) -> bool {
    match level {
        AccessLevel::Public => true,
        AccessLevel::Private => state.current_class == impl_class,
        AccessLevel::Protected => {
            if state.current_class == impl_class {
                return true;
            }
            // Accessing a protected member of an ancestor class.
            let mut visited = FxHashSet::default();
            let mut parent = state.current_parent_class.clone();
            while !parent.is_empty() {
                if !visited.insert(parent.clone()) {
                    return false;
                }
                if parent == impl_class {
                    return true;
                }
                match store.get_class(&parent) {
                    Some(info) => parent = info.parent.unwrap_or_default(),
                    None => return false,
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_meta::{ClassInfo, FileMeta};

    fn store_with(classes: Vec<(&str, ClassInfo)>) -> MetadataStore {
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        for (name, info) in classes {
            meta.classes.insert(name.to_string(), info);
        }
        store.update_file_meta("t.php", &meta);
        store.set_indexing_complete(true);
        store
    }

    fn class(parent: Option<&str>, methods: &[&str]) -> ClassInfo {
        let mut info = ClassInfo {
            parent: parent.map(str::to_string),
            ..Default::default()
        };
        for m in methods {
            info.methods.insert(m.to_string(), FuncInfo::default());
        }
        info
    }

    #[test]
    fn method_found_through_parent_chain() {
        let store = store_with(vec![
            ("\\A", class(None, &["m"])),
            ("\\B", class(Some("\\A"), &[])),
            ("\\C", class(Some("\\B"), &[])),
        ]);
        let (impl_class, _) = find_method(&store, "\\C", "m").unwrap();
        assert_eq!(impl_class, "\\A");
    }

    #[test]
    fn cyclic_parent_chain_terminates_not_found() {
        let store = store_with(vec![
            ("\\A", class(Some("\\B"), &[])),
            ("\\B", class(Some("\\A"), &[])),
        ]);
        assert!(find_method(&store, "\\A", "missing").is_none());
        assert!(find_property(&store, "\\A", "missing").is_none());
        assert!(find_constant(&store, "\\A", "MISSING").is_none());
    }

    #[test]
    fn private_only_from_defining_class() {
        let store = store_with(vec![("\\A", class(None, &[]))]);
        let inside = ClassParseState {
            current_class: "\\A".into(),
            ..Default::default()
        };
        let outside = ClassParseState {
            current_class: "\\B".into(),
            ..Default::default()
        };
        assert!(can_access(&store, &inside, "\\A", AccessLevel::Private));
        assert!(!can_access(&store, &outside, "\\A", AccessLevel::Private));
    }

    #[test]
    fn protected_from_descendants_only() {
        let store = store_with(vec![
            ("\\Base", class(None, &[])),
            ("\\Mid", class(Some("\\Base"), &[])),
            ("\\Leaf", class(Some("\\Mid"), &[])),
        ]);
        let descendant = ClassParseState {
            current_class: "\\Leaf".into(),
            current_parent_class: "\\Mid".into(),
            ..Default::default()
        };
        let stranger = ClassParseState {
            current_class: "\\Other".into(),
            ..Default::default()
        };
        assert!(can_access(&store, &descendant, "\\Base", AccessLevel::Protected));
        assert!(!can_access(&store, &stranger, "\\Base", AccessLevel::Protected));
    }

    #[test]
    fn protected_check_tolerates_parent_cycles() {
        let store = store_with(vec![
            ("\\A", class(Some("\\B"), &[])),
            ("\\B", class(Some("\\A"), &[])),
        ]);
        let state = ClassParseState {
            current_class: "\\C".into(),
            current_parent_class: "\\A".into(),
            ..Default::default()
        };
        assert!(!can_access(&store, &state, "\\Unrelated", AccessLevel::Protected));
    }

    #[test]
    fn implements_transitively() {
        let mut base = class(None, &[]);
        base.interfaces.push("\\ArrayAccess".into());
        let store = store_with(vec![
            ("\\Base", base),
            ("\\Leaf", class(Some("\\Base"), &[])),
        ]);
        assert!(implements(&store, "\\Leaf", "\\ArrayAccess"));
        assert!(!implements(&store, "\\Leaf", "\\Countable"));
    }
}
