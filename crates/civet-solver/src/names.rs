// names.rs
//
// Expansion of source-level names to FQNs. Resolution priority:
// fully-qualified names verbatim; `use` aliases on the first part;
// otherwise qualify by the current namespace, with a root-namespace
// retry for function and constant lookups.

use crate::state::ClassParseState;
use civet_frontend::Name;
use civet_meta::{ConstantInfo, FuncInfo, MetadataStore};

fn expand_alias(alias_target: &str, name: &Name) -> String {
    if name.parts.len() == 1 {
        alias_target.to_string()
    } else {
        // `use NS\Foo; Foo\Bar::baz()` expands to `\NS\Foo\Bar`.
        format!("{}\\{}", alias_target, name.parts[1..].join("\\"))
    }
}

/// Resolve a function name to its FQN and look it up. The FQN is
/// returned even when the function is unknown so reports can name it.
pub fn resolve_function(
    store: &MetadataStore,
    state: &ClassParseState,
    name: &Name,
) -> (String, Option<FuncInfo>) {
    if name.fully_qualified {
        let fqn = format!("\\{}", name.join());
        let info = store.get_function(&fqn);
        return (fqn, info);
    }
    if let Some(target) = state.function_uses.get(name.first()) {
        let fqn = expand_alias(target, name);
        let info = store.get_function(&fqn);
        return (fqn, info);
    }
    let fqn = format!("{}\\{}", state.namespace, name.join());
    if let Some(info) = store.get_function(&fqn) {
        return (fqn, Some(info));
    }
    if !state.namespace.is_empty() {
        let root_fqn = format!("\\{}", name.join());
        if let Some(info) = store.get_function(&root_fqn) {
            return (root_fqn, Some(info));
        }
    }
    (fqn, None)
}

/// Resolve a class name appearing in source to an FQN.
///
/// Returns None when the name cannot be resolved in this context:
/// `self`/`static` outside a class (or inside a trait, where the
/// actual class is unknowable), `parent` without a parent.
pub fn resolve_class_name(state: &ClassParseState, name: &Name) -> Option<String> {
    if name.fully_qualified {
        return Some(format!("\\{}", name.join()));
    }
    if name.is_simple() {
        match name.first() {
            "self" | "static" | "this" => {
                if state.is_trait || state.current_class.is_empty() {
                    return None;
                }
                return Some(state.current_class.clone());
            }
            "parent" => {
                if state.current_parent_class.is_empty() {
                    return None;
                }
                return Some(state.current_parent_class.clone());
            }
            _ => {}
        }
    }
    if let Some(target) = state.uses.get(name.first()) {
        return Some(expand_alias(target, name));
    }
    Some(format!("{}\\{}", state.namespace, name.join()))
}

/// Resolve a constant fetch; namespace-qualified first, then the
/// root namespace.
pub fn resolve_constant(
    store: &MetadataStore,
    state: &ClassParseState,
    name: &Name,
) -> Option<(String, ConstantInfo)> {
    if name.fully_qualified {
        let fqn = format!("\\{}", name.join());
        return store.get_constant(&fqn).map(|info| (fqn, info));
    }
    let fqn = format!("{}\\{}", state.namespace, name.join());
    if let Some(info) = store.get_constant(&fqn) {
        return Some((fqn, info));
    }
    if !state.namespace.is_empty() {
        let root_fqn = format!("\\{}", name.join());
        if let Some(info) = store.get_constant(&root_fqn) {
            return Some((root_fqn, info));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_meta::FileMeta;

    fn name(text: &str) -> Name {
        let fully_qualified = text.starts_with('\\');
        Name {
            parts: text
                .trim_start_matches('\\')
                .split('\\')
                .map(str::to_string)
                .collect(),
            fully_qualified,
        }
    }

    fn store_with_functions(fqns: &[&str]) -> MetadataStore {
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        for fqn in fqns {
            meta.functions.insert(fqn.to_string(), Default::default());
        }
        store.update_file_meta("f.php", &meta);
        store
    }

    #[test]
    fn fully_qualified_wins() {
        let store = store_with_functions(&["\\f"]);
        let state = ClassParseState {
            namespace: "\\NS".into(),
            ..Default::default()
        };
        let (fqn, info) = resolve_function(&store, &state, &name("\\f"));
        assert_eq!(fqn, "\\f");
        assert!(info.is_some());
    }

    #[test]
    fn namespace_then_root_fallback() {
        let store = store_with_functions(&["\\strlen"]);
        let state = ClassParseState {
            namespace: "\\NS".into(),
            ..Default::default()
        };
        let (fqn, info) = resolve_function(&store, &state, &name("strlen"));
        assert_eq!(fqn, "\\strlen");
        assert!(info.is_some());
    }

    #[test]
    fn alias_expansion_with_tail() {
        let state = ClassParseState {
            uses: [("Foo".to_string(), "\\NS\\Foo".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        assert_eq!(
            resolve_class_name(&state, &name("Foo\\Bar")).unwrap(),
            "\\NS\\Foo\\Bar"
        );
    }

    #[test]
    fn self_and_parent_pseudo_names() {
        let state = ClassParseState {
            current_class: "\\A".into(),
            current_parent_class: "\\B".into(),
            ..Default::default()
        };
        assert_eq!(resolve_class_name(&state, &name("self")).unwrap(), "\\A");
        assert_eq!(resolve_class_name(&state, &name("static")).unwrap(), "\\A");
        assert_eq!(resolve_class_name(&state, &name("parent")).unwrap(), "\\B");
    }

    #[test]
    fn self_unresolved_inside_trait() {
        let state = ClassParseState {
            current_class: "\\T".into(),
            is_trait: true,
            ..Default::default()
        };
        assert!(resolve_class_name(&state, &name("self")).is_none());
        assert!(resolve_class_name(&state, &name("static")).is_none());
    }

    #[test]
    fn plain_name_qualified_by_namespace() {
        let state = ClassParseState {
            namespace: "\\NS".into(),
            ..Default::default()
        };
        assert_eq!(
            resolve_class_name(&state, &name("Foo")).unwrap(),
            "\\NS\\Foo"
        );
        let root = ClassParseState::default();
        assert_eq!(resolve_class_name(&root, &name("Foo")).unwrap(), "\\Foo");
    }
}
