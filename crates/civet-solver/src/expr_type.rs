// expr_type.rs
//
// Best-effort expression typing. The result is a union of observed
// possibilities; unknown stays empty rather than guessing. Lazy
// wrapped tokens are produced for lookups that need the fully
// populated store and resolved on demand by `resolve_type_set`.

use crate::names::{resolve_class_name, resolve_constant, resolve_function};
use crate::oop::{find_constant, find_method, find_property};
use crate::state::ClassParseState;
use civet_frontend::{
    Arg, AssignOp, BinaryOp, CastKind, ClassRef, Expr, ExprKind, Span, UnaryOp,
};
use civet_meta::{MetadataStore, OverrideKind, Scope, Type, TypeSet};

/// A flow-narrowing override for a non-variable expression, keyed by
/// its source span (`$x->f() instanceof C` inside an `if`).
#[derive(Debug, Clone)]
pub struct CustomType {
    pub span: Span,
    pub typ: TypeSet,
}

const MAX_RESOLVE_DEPTH: u32 = 5;

/// Resolve all lazy tokens in `set` against the store. Depth-bounded:
/// pathological self-referential metadata degrades to dropping the
/// token instead of recursing forever.
pub fn resolve_type_set(store: &MetadataStore, set: &TypeSet) -> TypeSet {
    resolve_depth(store, set, 0)
}

fn resolve_depth(store: &MetadataStore, set: &TypeSet, depth: u32) -> TypeSet {
    if depth > MAX_RESOLVE_DEPTH {
        return TypeSet::new();
    }
    let mut out = TypeSet::new();
    for typ in set.iter() {
        out = out.append(&resolve_one(store, typ, depth));
    }
    out
}

fn resolve_one(store: &MetadataStore, typ: &Type, depth: u32) -> TypeSet {
    match typ {
        Type::ElemOf(inner) => {
            let inner = resolve_one(store, inner, depth + 1);
            let mut out = TypeSet::new();
            for token in inner.iter() {
                if let Type::ArrayOf(elem) = token {
                    out = out.append_type((**elem).clone());
                }
            }
            out
        }
        Type::Global(name) => match store.global_var_type(name) {
            Some(set) => resolve_depth(store, &set, depth + 1),
            None => TypeSet::new(),
        },
        Type::Property(class, name) => match find_property(store, class, name) {
            Some((_, prop)) => resolve_depth(store, &prop.typ, depth + 1),
            None => TypeSet::new(),
        },
        Type::ReturnOf(fqn) => match store.get_function(fqn) {
            Some(func) => resolve_depth(store, &func.typ, depth + 1),
            None => TypeSet::new(),
        },
        Type::ConstantOf(fqn) => match store.get_constant(fqn) {
            Some(constant) => resolve_depth(store, &constant.typ, depth + 1),
            None => TypeSet::new(),
        },
        other => TypeSet::of(other.clone()),
    }
}

/// Class-name tokens of a resolved type, for member lookups.
pub fn class_tokens(store: &MetadataStore, set: &TypeSet) -> Vec<String> {
    resolve_type_set(store, set)
        .iter()
        .filter_map(|t| match t {
            Type::Class(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

pub fn expr_type(
    scope: &Scope,
    state: &ClassParseState,
    store: &MetadataStore,
    expr: &Expr,
) -> TypeSet {
    expr_type_custom(scope, state, store, expr, &[])
}

pub fn expr_type_custom(
    scope: &Scope,
    state: &ClassParseState,
    store: &MetadataStore,
    expr: &Expr,
    custom: &[CustomType],
) -> TypeSet {
    if let Some(override_type) = custom.iter().find(|c| c.span == expr.span) {
        return override_type.typ.clone();
    }
    let recur = |e: &Expr| expr_type_custom(scope, state, store, e, custom);

    match &expr.kind {
        ExprKind::Int(_) => TypeSet::of(Type::Int),
        ExprKind::Float(_) => TypeSet::of(Type::Float),
        ExprKind::Str(_) => TypeSet::of(Type::String),
        ExprKind::Var(name) => scope.var_type(name).cloned().unwrap_or_default(),
        ExprKind::VarVar(_) => TypeSet::new(),
        ExprKind::ConstFetch(name) => {
            if name.is_simple() {
                match name.first().to_ascii_lowercase().as_str() {
                    "true" | "false" => return TypeSet::of(Type::Bool),
                    "null" => return TypeSet::of(Type::Null),
                    _ => {}
                }
            }
            match resolve_constant(store, state, name) {
                Some((fqn, _)) => TypeSet::of(Type::ConstantOf(fqn)),
                None => TypeSet::new(),
            }
        }
        ExprKind::Array { items, .. } => {
            let mut elem = TypeSet::new();
            for item in items {
                if let Some(value) = &item.value {
                    elem = elem.append(&recur(value));
                }
            }
            array_of(store, elem)
        }
        ExprKind::List { .. } => TypeSet::new(),
        ExprKind::Index { base, .. } => {
            let base_type = resolve_type_set(store, &recur(base));
            let mut out = TypeSet::new();
            for token in base_type.iter() {
                out = out.append_type(Type::ElemOf(Box::new(token.clone())));
            }
            out
        }
        ExprKind::Prop { base, name, .. } => {
            let Some(name) = name else {
                return TypeSet::new();
            };
            let mut out = TypeSet::new();
            for class in class_tokens(store, &recur(base)) {
                out = out.append_type(Type::Property(class, name.clone()));
            }
            out
        }
        ExprKind::StaticProp { class, name, .. } => {
            let (Some(name), Some(class)) = (name, class_ref_fqn(state, class)) else {
                return TypeSet::new();
            };
            TypeSet::of(Type::Property(class, format!("${name}")))
        }
        ExprKind::ClassConst { class, name, .. } => {
            let Some(class) = class_ref_fqn(state, class) else {
                return TypeSet::new();
            };
            match find_constant(store, &class, name) {
                Some((_, info)) => info.typ,
                None => TypeSet::new(),
            }
        }
        ExprKind::FuncCall { name, .. } => {
            let Some(name) = name else {
                return TypeSet::new();
            };
            let (fqn, info) = resolve_function(store, state, name);
            if let Some(override_info) = store.get_function_override(&fqn) {
                if let ExprKind::FuncCall { args, .. } = &expr.kind {
                    return override_call_type(store, override_info, args, &recur);
                }
            }
            match info {
                Some(_) => TypeSet::of(Type::ReturnOf(fqn)),
                None => TypeSet::new(),
            }
        }
        ExprKind::MethodCall { base, name, .. } => {
            let Some(name) = name else {
                return TypeSet::new();
            };
            let mut out = TypeSet::new();
            for class in class_tokens(store, &recur(base)) {
                if let Some((_, method)) = find_method(store, &class, name) {
                    out = out.append(&resolve_type_set(store, &method.typ));
                }
            }
            out
        }
        ExprKind::StaticCall { class, name, .. } => {
            let Some(class) = class_ref_fqn(state, class) else {
                return TypeSet::new();
            };
            match find_method(store, &class, name) {
                Some((_, method)) => resolve_type_set(store, &method.typ),
                None => TypeSet::new(),
            }
        }
        ExprKind::New { class, .. } => match class_ref_fqn(state, class) {
            Some(fqn) => TypeSet::of(Type::Class(fqn)),
            None => TypeSet::new(),
        },
        ExprKind::Clone(inner) => recur(inner),
        ExprKind::InstanceOf { .. } | ExprKind::Isset(_) | ExprKind::Empty(_) => {
            TypeSet::of(Type::Bool)
        }
        ExprKind::Exit(_) => TypeSet::new(),
        ExprKind::Cast { kind, .. } => match kind {
            CastKind::Int => TypeSet::of(Type::Int),
            CastKind::Float => TypeSet::of(Type::Float),
            CastKind::Bool => TypeSet::of(Type::Bool),
            CastKind::String => TypeSet::of(Type::String),
            CastKind::Array => TypeSet::of(Type::ArrayOf(Box::new(Type::Mixed))),
        },
        ExprKind::Unary { op, expr } => match op {
            UnaryOp::Not => TypeSet::of(Type::Bool),
            UnaryOp::BitNot => TypeSet::of(Type::Int),
            UnaryOp::Neg | UnaryOp::Plus => numeric_type(&resolve_type_set(store, &recur(expr))),
        },
        ExprKind::Binary { op, left, right } => binary_type(store, *op, left, right, &recur),
        ExprKind::Assign { op, value, .. } => match op {
            AssignOp::Plain | AssignOp::Reference => recur(value),
            AssignOp::Compound(bin) => {
                // Close enough: the result type of the operator.
                binary_type(store, *bin, value, value, &recur)
            }
        },
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            let then_type = match then {
                Some(t) => recur(t),
                None => recur(cond),
            };
            then_type.append(&recur(otherwise))
        }
        ExprKind::Closure(_) => TypeSet::of(Type::Class("\\Closure".to_string())),
    }
}

fn class_ref_fqn(state: &ClassParseState, class: &ClassRef) -> Option<String> {
    match class {
        ClassRef::Name(name) => resolve_class_name(state, name),
        ClassRef::Dynamic(_) => None,
    }
}

fn array_of(store: &MetadataStore, elem: TypeSet) -> TypeSet {
    let resolved = resolve_type_set(store, &elem);
    if resolved.len() == 1 {
        let token = resolved.iter().next().cloned().expect("len checked");
        TypeSet::of(Type::ArrayOf(Box::new(token)))
    } else {
        TypeSet::of(Type::ArrayOf(Box::new(Type::Mixed)))
    }
}

fn numeric_type(operand: &TypeSet) -> TypeSet {
    if operand.is(&Type::Int) {
        TypeSet::of(Type::Int)
    } else if operand.is(&Type::Float) {
        TypeSet::of(Type::Float)
    } else {
        TypeSet::of(Type::Int).append_type(Type::Float)
    }
}

fn binary_type(
    store: &MetadataStore,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    recur: &impl Fn(&Expr) -> TypeSet,
) -> TypeSet {
    use BinaryOp::*;
    match op {
        BoolAnd | BoolOr | Eq | Identical | NotEq | NotIdentical | Lt | Gt | Le | Ge => {
            TypeSet::of(Type::Bool)
        }
        Concat => TypeSet::of(Type::String),
        Mod | BitAnd | BitOr | BitXor | Shl | Shr => TypeSet::of(Type::Int),
        Add | Sub | Mul | Div => {
            let lhs = resolve_type_set(store, &recur(left));
            let rhs = resolve_type_set(store, &recur(right));
            if lhs.is(&Type::Int) && rhs.is(&Type::Int) && op != Div {
                TypeSet::of(Type::Int)
            } else if lhs.is(&Type::Float) || rhs.is(&Type::Float) {
                TypeSet::of(Type::Float)
            } else {
                TypeSet::of(Type::Int).append_type(Type::Float)
            }
        }
    }
}

fn override_call_type(
    store: &MetadataStore,
    override_info: civet_meta::FuncOverride,
    args: &[Arg],
    recur: &impl Fn(&Expr) -> TypeSet,
) -> TypeSet {
    let Some(arg) = args.get(override_info.arg_num) else {
        return TypeSet::new();
    };
    let arg_type = resolve_type_set(store, &recur(&arg.expr));
    match override_info.kind {
        OverrideKind::ArgType => arg_type,
        OverrideKind::ElemType => {
            let mut out = TypeSet::new();
            for token in arg_type.iter() {
                if let Type::ArrayOf(elem) = token {
                    out = out.append_type((**elem).clone());
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civet_frontend::Parser;
    use civet_meta::{FileMeta, FuncInfo};

    fn typed(src: &str, scope: &Scope, store: &MetadataStore) -> TypeSet {
        let expr = Parser::new(src).parse_single_expr().expect("expression");
        let state = ClassParseState::default();
        expr_type(scope, &state, store, &expr)
    }

    #[test]
    fn literal_types() {
        let store = MetadataStore::new();
        let scope = Scope::new();
        assert!(typed("1", &scope, &store).is(&Type::Int));
        assert!(typed("1.5", &scope, &store).is(&Type::Float));
        assert!(typed("'a'", &scope, &store).is(&Type::String));
        assert!(typed("true", &scope, &store).is(&Type::Bool));
        assert!(typed("null", &scope, &store).is(&Type::Null));
    }

    #[test]
    fn variable_type_from_scope() {
        let store = MetadataStore::new();
        let mut scope = Scope::new();
        scope.add_var("x", TypeSet::of(Type::Int), "assign", true);
        assert!(typed("$x", &scope, &store).is(&Type::Int));
    }

    #[test]
    fn concat_is_string_and_comparison_is_bool() {
        let store = MetadataStore::new();
        let scope = Scope::new();
        assert!(typed("'a' . 'b'", &scope, &store).is(&Type::String));
        assert!(typed("1 < 2", &scope, &store).is(&Type::Bool));
    }

    #[test]
    fn function_return_resolves_lazily() {
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        meta.functions.insert(
            "\\f".into(),
            FuncInfo {
                typ: TypeSet::of(Type::Int),
                ..Default::default()
            },
        );
        store.update_file_meta("f.php", &meta);
        store.set_indexing_complete(true);

        let scope = Scope::new();
        let lazy = typed("f()", &scope, &store);
        assert!(lazy.contains(&Type::ReturnOf("\\f".into())));
        assert!(resolve_type_set(&store, &lazy).is(&Type::Int));
    }

    #[test]
    fn index_of_typed_array_resolves_to_element() {
        let store = MetadataStore::new();
        let mut scope = Scope::new();
        scope.add_var(
            "xs",
            TypeSet::of(Type::ArrayOf(Box::new(Type::String))),
            "assign",
            true,
        );
        let lazy = typed("$xs[0]", &scope, &store);
        assert!(resolve_type_set(&store, &lazy).is(&Type::String));
    }

    #[test]
    fn new_produces_class_type() {
        let store = MetadataStore::new();
        let scope = Scope::new();
        assert!(typed("new Foo()", &scope, &store).is(&Type::Class("\\Foo".into())));
    }

    #[test]
    fn resolution_depth_is_bounded() {
        // A function whose return type refers to itself.
        let store = MetadataStore::new();
        let mut meta = FileMeta::default();
        meta.functions.insert(
            "\\loopy".into(),
            FuncInfo {
                typ: TypeSet::of(Type::ReturnOf("\\loopy".into())),
                ..Default::default()
            },
        );
        store.update_file_meta("f.php", &meta);
        store.set_indexing_complete(true);
        let resolved = resolve_type_set(&store, &TypeSet::of(Type::ReturnOf("\\loopy".into())));
        assert!(resolved.is_empty());
    }
}
