// entities.rs
//
// Symbol metadata collected during indexing (pass 1). Everything here
// is serializable so per-file results can be cached.

use crate::types::TypeSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessLevel {
    #[default]
    Public,
    Protected,
    Private,
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::Public => write!(f, "public"),
            AccessLevel::Protected => write!(f, "protected"),
            AccessLevel::Private => write!(f, "private"),
        }
    }
}

/// Which ways control has (or may have) left a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExitFlags(u8);

impl ExitFlags {
    pub const RETURN: ExitFlags = ExitFlags(1);
    pub const BREAK: ExitFlags = ExitFlags(1 << 1);
    pub const CONTINUE: ExitFlags = ExitFlags(1 << 2);
    pub const THROW: ExitFlags = ExitFlags(1 << 3);
    pub const DIE: ExitFlags = ExitFlags(1 << 4);

    pub fn empty() -> Self {
        ExitFlags(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: ExitFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// All bits of `self` with those of `mask` cleared.
    pub fn without(self, mask: ExitFlags) -> Self {
        ExitFlags(self.0 & !mask.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for ExitFlags {
    type Output = ExitFlags;
    fn bitor(self, rhs: ExitFlags) -> ExitFlags {
        ExitFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ExitFlags {
    fn bitor_assign(&mut self, rhs: ExitFlags) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub typ: TypeSet,
    pub by_ref: bool,
    pub variadic: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuncDoc {
    pub deprecated: bool,
    pub deprecation_note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuncInfo {
    pub params: Vec<ParamInfo>,
    /// Number of parameters without defaults; calls with fewer
    /// arguments are reported.
    pub min_params: usize,
    /// Return type.
    pub typ: TypeSet,
    pub access: AccessLevel,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Exit flags every call site inherits (a function that always
    /// throws or dies propagates that to its callers).
    pub exit_flags: ExitFlags,
    pub doc: FuncDoc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub typ: TypeSet,
    pub access: AccessLevel,
}

/// A class constant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstInfo {
    pub typ: TypeSet,
    pub access: AccessLevel,
}

/// A free (non-class) constant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstantInfo {
    pub typ: TypeSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Parent class FQN. Stored by name, not by reference: the class
    /// graph may be incomplete or even cyclic in broken code.
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    /// Static properties are keyed with a `$` prefix, instance
    /// properties without, mirroring how they are accessed.
    pub properties: FxHashMap<String, PropertyInfo>,
    pub constants: FxHashMap<String, ConstInfo>,
    pub methods: FxHashMap<String, FuncInfo>,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_trait: bool,
}

/// Builtin functions whose return type is derived from an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideKind {
    /// Return type equals the argument's type.
    ArgType,
    /// Return type is the element type of the (array) argument.
    ElemType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FuncOverride {
    pub kind: OverrideKind,
    pub arg_num: usize,
}

/// Everything a single file contributes to the metadata store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileMeta {
    /// Global scope contribution (top-level assignments), if any.
    pub scope: Option<Scope>,
    pub classes: FxHashMap<String, ClassInfo>,
    pub traits: FxHashMap<String, ClassInfo>,
    pub functions: FxHashMap<String, FuncInfo>,
    pub constants: FxHashMap<String, ConstantInfo>,
    pub function_overrides: FxHashMap<String, FuncOverride>,
}

impl FileMeta {
    pub fn is_empty(&self) -> bool {
        self.scope.is_none()
            && self.classes.is_empty()
            && self.traits.is_empty()
            && self.functions.is_empty()
            && self.constants.is_empty()
            && self.function_overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_flags_bit_ops() {
        let mut flags = ExitFlags::empty();
        assert!(flags.is_empty());
        flags |= ExitFlags::RETURN;
        flags |= ExitFlags::BREAK;
        assert!(flags.contains(ExitFlags::RETURN));
        assert!(!flags.contains(ExitFlags::THROW));
        let cleaned = flags.without(ExitFlags::BREAK | ExitFlags::CONTINUE);
        assert!(cleaned.contains(ExitFlags::RETURN));
        assert!(!cleaned.contains(ExitFlags::BREAK));
    }

    #[test]
    fn exit_flags_bit_layout() {
        assert_eq!(ExitFlags::RETURN.bits(), 1);
        assert_eq!(ExitFlags::BREAK.bits(), 2);
        assert_eq!(ExitFlags::CONTINUE.bits(), 4);
        assert_eq!(ExitFlags::THROW.bits(), 8);
        assert_eq!(ExitFlags::DIE.bits(), 16);
    }
}
