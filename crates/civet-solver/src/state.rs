// state.rs

use rustc_hash::FxHashMap;

/// Per-file parse state the resolver needs: where we are (namespace,
/// class) and which aliases are in effect.
///
/// Conventions: `namespace` is either empty or starts with `\`
/// (`\Foo\Bar`); alias values are full FQNs with the leading `\`.
#[derive(Debug, Clone, Default)]
pub struct ClassParseState {
    pub namespace: String,
    /// Class-name aliases from `use` statements, keyed by alias.
    pub uses: FxHashMap<String, String>,
    /// Function aliases from `use function` statements.
    pub function_uses: FxHashMap<String, String>,
    /// FQN of the class/trait/interface we are inside, or empty.
    pub current_class: String,
    /// FQN of its parent class, or empty.
    pub current_parent_class: String,
    pub is_trait: bool,
}

impl ClassParseState {
    pub fn in_class(&self) -> bool {
        !self.current_class.is_empty()
    }
}
