// types.rs
//
// The type lattice is a flat union of tokens; there is no subtyping.
// Lazy "wrapped" tokens stand for computations that can only be done
// once the metadata store is fully populated, and are resolved by the
// solver at read time.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One type token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Null,
    Void,
    Mixed,
    /// Fully qualified class name, leading `\` included.
    Class(String),
    /// `T[]`
    ArrayOf(Box<Type>),
    /// Element of `T` (lazy): resolves to `U` when `T = U[]`.
    ElemOf(Box<Type>),
    /// Type of the global variable `$name` (lazy).
    Global(String),
    /// Type of property `class::name` (lazy).
    Property(String, String),
    /// Return type of function `fqn` (lazy).
    ReturnOf(String),
    /// Type of the free constant `fqn` (lazy).
    ConstantOf(String),
    /// Opaque marker token ("undefined", "isset_$x", ...). Never
    /// resolves to anything; compares by text.
    Opaque(String),
}

impl Type {
    /// Parse a primitive type keyword; anything unknown becomes a
    /// class reference relative to nothing (caller qualifies).
    pub fn from_keyword(word: &str) -> Option<Type> {
        Some(match word {
            "int" | "integer" => Type::Int,
            "float" | "double" => Type::Float,
            "string" => Type::String,
            "bool" | "boolean" => Type::Bool,
            "null" => Type::Null,
            "void" => Type::Void,
            "mixed" => Type::Mixed,
            _ => return None,
        })
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class(_))
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "void"),
            Type::Mixed => write!(f, "mixed"),
            Type::Class(name) => write!(f, "{name}"),
            Type::ArrayOf(inner) => write!(f, "{inner}[]"),
            Type::ElemOf(inner) => write!(f, "elem({inner})"),
            Type::Global(name) => write!(f, "global(${name})"),
            Type::Property(class, name) => write!(f, "property({class}::{name})"),
            Type::ReturnOf(fqn) => write!(f, "return({fqn})"),
            Type::ConstantOf(fqn) => write!(f, "constant({fqn})"),
            Type::Opaque(text) => write!(f, "{text}"),
        }
    }
}

/// An unordered union of type tokens. Immutable: all "mutators"
/// return a new set. Duplicates coalesce, order is kept normalized so
/// equality is order-independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSet {
    types: SmallVec<[Type; 4]>,
}

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(typ: Type) -> Self {
        let mut types = SmallVec::new();
        types.push(typ);
        Self { types }
    }

    pub fn mixed() -> Self {
        Self::of(Type::Mixed)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Union with a single token.
    pub fn append_type(&self, typ: Type) -> Self {
        let mut out = self.clone();
        out.insert(typ);
        out
    }

    /// Union with another set.
    pub fn append(&self, other: &TypeSet) -> Self {
        let mut out = self.clone();
        for typ in &other.types {
            out.insert(typ.clone());
        }
        out
    }

    fn insert(&mut self, typ: Type) {
        match self.types.binary_search(&typ) {
            Ok(_) => {}
            Err(pos) => self.types.insert(pos, typ),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.types.iter()
    }

    /// Short-circuiting search over raw tokens.
    pub fn find(&self, mut pred: impl FnMut(&Type) -> bool) -> bool {
        self.types.iter().any(|t| pred(t))
    }

    /// True iff the set is exactly `{typ}` — the definite-type case.
    pub fn is(&self, typ: &Type) -> bool {
        self.types.len() == 1 && self.types[0] == *typ
    }

    pub fn contains(&self, typ: &Type) -> bool {
        self.types.binary_search(typ).is_ok()
    }
}

impl FromIterator<Type> for TypeSet {
    fn from_iter<I: IntoIterator<Item = Type>>(iter: I) -> Self {
        let mut out = TypeSet::new();
        for typ in iter {
            out.insert(typ);
        }
        out
    }
}

impl std::fmt::Display for TypeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for typ in &self.types {
            if !first {
                write!(f, "|")?;
            }
            first = false;
            write!(f, "{typ}")?;
        }
        Ok(())
    }
}

/// Parse one type string as written in docblocks and type hints:
/// `int`, `?Foo`, `Foo[]`, `A|B`. Class names stay as written; the
/// caller namespace-qualifies them.
pub fn parse_type_string(text: &str) -> TypeSet {
    let mut out = TypeSet::new();
    for part in text.split('|') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        // `?T` is shorthand for `T|null`.
        let (part, nullable) = match part.strip_prefix('?') {
            Some(rest) => (rest, true),
            None => (part, false),
        };
        if nullable {
            out = out.append_type(Type::Null);
        }
        out = out.append_type(parse_single(part));
    }
    out
}

fn parse_single(part: &str) -> Type {
    if let Some(elem) = part.strip_suffix("[]") {
        return Type::ArrayOf(Box::new(parse_single(elem)));
    }
    if part == "array" {
        return Type::ArrayOf(Box::new(Type::Mixed));
    }
    if part == "callable" || part == "object" {
        return Type::Mixed;
    }
    match Type::from_keyword(part) {
        Some(typ) => typ,
        None => Type::Class(part.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_coalesces_duplicates() {
        let a = TypeSet::of(Type::Int).append_type(Type::Int);
        assert_eq!(a.len(), 1);
        let b = a.append(&TypeSet::of(Type::String));
        assert_eq!(b.len(), 2);
        // the original is untouched
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn equality_is_order_independent() {
        let a = TypeSet::of(Type::Int).append_type(Type::String);
        let b = TypeSet::of(Type::String).append_type(Type::Int);
        assert_eq!(a, b);
    }

    #[test]
    fn is_checks_definite_type() {
        assert!(TypeSet::of(Type::Bool).is(&Type::Bool));
        assert!(!TypeSet::of(Type::Bool).append_type(Type::Int).is(&Type::Bool));
    }

    #[test]
    fn parse_union_and_nullable() {
        let set = parse_type_string("int|string");
        assert!(set.contains(&Type::Int));
        assert!(set.contains(&Type::String));
        let set = parse_type_string("?Foo");
        assert!(set.contains(&Type::Null));
        assert!(set.contains(&Type::Class("Foo".into())));
    }

    #[test]
    fn parse_array_forms() {
        let set = parse_type_string("int[]");
        assert!(set.contains(&Type::ArrayOf(Box::new(Type::Int))));
        let set = parse_type_string("array");
        assert!(set.contains(&Type::ArrayOf(Box::new(Type::Mixed))));
    }
}
