// context.rs

use civet_meta::{ExitFlags, Scope};
use civet_solver::CustomType;

/// Enclosing looping construct, for `break`/`continue` handling.
/// `switch` counts as a looping construct in the analyzed language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopKind {
    #[default]
    None,
    For,
    Switch,
}

/// Per-block walking state. Branch analysis clones the context, walks
/// the branch in the clone, and merges results back into the parent.
#[derive(Debug, Clone, Default)]
pub struct BlockContext {
    pub scope: Scope,
    /// This path has definitely exited via these ways.
    pub exit_flags: ExitFlags,
    /// Some sub-path contains these exits. Invariant: a superset of
    /// `exit_flags`.
    pub contains_exit_flags: ExitFlags,
    /// One dead-code report per context is enough.
    pub dead_code_reported: bool,
    pub inside_loop: bool,
    pub innermost_loop: LoopKind,
    /// Flow-narrowing type overrides for non-variable expressions.
    pub custom_types: Vec<CustomType>,
}

impl BlockContext {
    pub fn with_scope(scope: Scope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }
}
