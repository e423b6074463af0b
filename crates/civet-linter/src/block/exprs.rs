// block/exprs.rs
//
// Expression-level handlers: variable reads, member access, calls,
// array literals, casts and assignment forms.

use civet_frontend::{
    Arg, AssignOp, BinaryOp, CastKind, ClassRef, Expr, ExprKind, Span,
};
use civet_meta::{AccessLevel, FuncInfo, Type, TypeSet};
use civet_solver as solver;
use rustc_hash::FxHashSet;

use crate::report::Severity;

use super::BlockWalker;

impl BlockWalker<'_, '_> {
    /// Per-kind expression dispatch; returns whether to descend into
    /// children generically.
    pub(crate) fn enter_expr(&mut self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Var(name) => {
                let name = name.clone();
                self.handle_variable(&name, expr.span);
                false
            }
            ExprKind::VarVar(_) => true,
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Str(_) => true,
            ExprKind::ConstFetch(_) => {
                self.handle_const_fetch(expr);
                true
            }
            ExprKind::Array { items, short } => {
                if !short {
                    self.root.report(
                        expr.span,
                        Severity::DoNotReject,
                        "arraySyntax",
                        "Use of old array syntax (use short form instead)",
                    );
                }
                self.handle_array_items(expr, items);
                false
            }
            ExprKind::List { .. } => true,
            ExprKind::Index { .. } => {
                self.handle_array_dim_fetch(expr);
                true
            }
            ExprKind::Prop { .. } => self.handle_property_fetch(expr),
            ExprKind::StaticProp { .. } => self.handle_static_property_fetch(expr),
            ExprKind::ClassConst { .. } => self.handle_class_const_fetch(expr),
            ExprKind::FuncCall { .. } => self.handle_function_call(expr),
            ExprKind::MethodCall { .. } => self.handle_method_call(expr),
            ExprKind::StaticCall { .. } => self.handle_static_call(expr),
            ExprKind::New { .. } => self.handle_new(expr),
            ExprKind::Clone(_) => {
                self.root.check_keyword_case(expr.span, "clone");
                true
            }
            ExprKind::InstanceOf { .. } => true,
            ExprKind::Isset(vars) => {
                for var in vars {
                    match &var.kind {
                        ExprKind::Var(name) => {
                            self.unused_vars.remove(name.as_str());
                        }
                        ExprKind::Index { .. } => self.handle_isset_dim_fetch(var),
                        _ => self.walk_expr(var),
                    }
                }
                false
            }
            ExprKind::Empty(inner) => {
                match &inner.kind {
                    ExprKind::Var(name) => {
                        self.unused_vars.remove(name.as_str());
                    }
                    ExprKind::Index { .. } => self.handle_isset_dim_fetch(inner),
                    _ => self.walk_expr(inner),
                }
                false
            }
            ExprKind::Exit(_) => true,
            ExprKind::Cast { kind, expr: inner } => {
                match kind {
                    CastKind::Int => self.check_redundant_cast(inner, Type::Int),
                    CastKind::Float => self.check_redundant_cast(inner, Type::Float),
                    CastKind::Bool => self.check_redundant_cast(inner, Type::Bool),
                    CastKind::String => self.check_redundant_cast(inner, Type::String),
                    CastKind::Array => self.check_redundant_cast_array(inner),
                }
                true
            }
            ExprKind::Unary { .. } => true,
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::BoolOr => {
                    // The RHS runs conditionally; its effects on the
                    // exit flags are discarded.
                    self.walk_expr(left);
                    let exit_flags = self.ctx.exit_flags;
                    self.walk_expr(right);
                    self.ctx.exit_flags = exit_flags;
                    false
                }
                BinaryOp::BitAnd => {
                    if self.is_bool(left) && self.is_bool(right) {
                        self.report_bitwise_op(expr, "&", "&&");
                    }
                    true
                }
                BinaryOp::BitOr => {
                    if self.is_bool(left) && self.is_bool(right) {
                        self.report_bitwise_op(expr, "|", "||");
                    }
                    true
                }
                _ => true,
            },
            ExprKind::Assign { op, .. } => match op {
                AssignOp::Plain => self.handle_assign(expr),
                AssignOp::Reference => self.handle_assign_reference(expr),
                // Compound assignment reads and writes the target;
                // generic traversal covers the read side.
                AssignOp::Compound(_) => true,
            },
            ExprKind::Ternary { .. } => true,
            ExprKind::Closure(_) => self.enter_closure(expr),
        }
    }

    fn report_bitwise_op(&mut self, expr: &Expr, op: &str, right_op: &str) {
        self.root.report(
            expr.span,
            Severity::Warning,
            "bitwiseOps",
            &format!("Used {op} bitwise op over bool operands, perhaps {right_op} is intended?"),
        );
    }

    // ---- casts ----

    fn check_redundant_cast(&mut self, inner: &Expr, dst: Type) {
        if !self.root.store().is_indexing_complete() {
            return;
        }
        let typ = self.resolved_expr_type(inner);
        if typ.is(&dst) {
            self.root.report(
                inner.span,
                Severity::DoNotReject,
                "redundantCast",
                &format!("expression already has {dst} type"),
            );
        }
    }

    fn check_redundant_cast_array(&mut self, inner: &Expr) {
        if !self.root.store().is_indexing_complete() {
            return;
        }
        let typ = self.resolved_expr_type(inner);
        if typ.is(&Type::ArrayOf(Box::new(Type::Mixed))) {
            self.root.report(
                inner.span,
                Severity::DoNotReject,
                "redundantCast",
                "expression already has array type",
            );
        }
    }

    // ---- arrays ----

    fn handle_array_items(&mut self, array: &Expr, items: &[civet_frontend::ArrayItem]) {
        let mut have_keys = false;
        let mut have_implicit_keys = false;
        let mut keys: FxHashSet<String> = FxHashSet::default();

        for item in items {
            let Some(value) = &item.value else {
                continue;
            };
            self.walk_expr(value);

            let Some(key) = &item.key else {
                have_implicit_keys = true;
                continue;
            };
            self.walk_expr(key);
            have_keys = true;

            let const_key = match &key.kind {
                ExprKind::Str(text) => Some(text.clone()),
                ExprKind::Int(value) => Some(value.to_string()),
                _ => None,
            };
            let Some(const_key) = const_key else {
                continue;
            };
            if !keys.insert(const_key.clone()) {
                self.root.report(
                    key.span,
                    Severity::Warning,
                    "dupArrayKeys",
                    &format!("Duplicate array key '{const_key}'"),
                );
            }
        }

        if have_implicit_keys && have_keys {
            self.root.report(
                array.span,
                Severity::Warning,
                "mixedArrayKeys",
                "Mixing implicit and explicit array keys",
            );
        }
    }

    /// Indexing a class type that does not implement `\ArrayAccess`.
    pub(crate) fn handle_array_dim_fetch(&mut self, expr: &Expr) {
        if !self.root.store().is_indexing_complete() {
            return;
        }
        let ExprKind::Index { base, .. } = &expr.kind else {
            return;
        };
        let typ = self.resolved_expr_type(base);

        let mut maybe_have_classes = false;
        let mut have_array_access = false;
        typ.find(|token| {
            if let Type::Class(name) = token {
                maybe_have_classes = true;
                if !have_array_access && solver::implements(self.root.store(), name, "\\ArrayAccess")
                {
                    have_array_access = true;
                }
            }
            false
        });

        if maybe_have_classes && !have_array_access {
            self.root.report(
                base.span,
                Severity::DoNotReject,
                "arrayAccess",
                &format!("Array access to non-array type {typ}"),
            );
        }
    }

    /// Expressions inside isset()/unset()/empty() still need analysis,
    /// but a variable read here is not an undefined-variable use.
    pub(crate) fn handle_isset_dim_fetch(&mut self, expr: &Expr) {
        self.handle_array_dim_fetch(expr);
        let ExprKind::Index { base, index } = &expr.kind else {
            return;
        };
        match &base.kind {
            ExprKind::Var(name) => {
                self.unused_vars.remove(name.as_str());
            }
            ExprKind::Index { .. } => self.handle_isset_dim_fetch(base),
            _ => self.walk_expr(base),
        }
        if let Some(index) = index {
            self.walk_expr(index);
        }
    }

    // ---- constants ----

    fn handle_const_fetch(&mut self, expr: &Expr) {
        if !self.root.store().is_indexing_complete() {
            return;
        }
        let ExprKind::ConstFetch(name) = &expr.kind else {
            return;
        };
        // Builtin literal constants are keyword-like: any case works,
        // but only the lower-case spelling is accepted style.
        if name.is_simple() {
            let lower = name.first().to_ascii_lowercase();
            if matches!(lower.as_str(), "null" | "true" | "false") {
                if name.first() != lower {
                    self.root.report(
                        expr.span,
                        Severity::Error,
                        "undefined",
                        &format!("Use {} instead of {}", lower, name.first()),
                    );
                }
                return;
            }
        }
        if solver::resolve_constant(self.root.store(), self.root.state(), name).is_none() {
            self.root.report(
                expr.span,
                Severity::Error,
                "undefined",
                &format!("Undefined constant {name}"),
            );
        }
    }

    fn handle_class_const_fetch(&mut self, expr: &Expr) -> bool {
        if !self.root.store().is_indexing_complete() {
            return true;
        }
        let ExprKind::ClassConst {
            class,
            name,
            name_span,
        } = &expr.kind
        else {
            return true;
        };
        if name == "class" || name == "CLASS" {
            return false;
        }
        let Some(class_name) = self.root.resolve_class_ref(class) else {
            return false;
        };

        match solver::find_constant(self.root.store(), &class_name, name) {
            Some((impl_class, info)) => {
                if !solver::can_access(self.root.store(), self.root.state(), &impl_class, info.access)
                {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "accessLevel",
                        &format!(
                            "Cannot access {} constant {}::{}",
                            info.access, impl_class, name
                        ),
                    );
                }
            }
            None => {
                if !self.root.state().is_trait {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "undefined",
                        &format!("Class constant {class_name}::{name} does not exist"),
                    );
                }
            }
        }
        false
    }

    // ---- member access ----

    fn handle_property_fetch(&mut self, expr: &Expr) -> bool {
        let ExprKind::Prop {
            base,
            name,
            name_span,
        } = &expr.kind
        else {
            return true;
        };
        self.walk_expr(base);

        if !self.root.store().is_indexing_complete() {
            return false;
        }
        let Some(name) = name else {
            return false;
        };

        let typ = self.expr_type(base);
        let mut found: Option<(String, AccessLevel)> = None;
        let mut magic = false;
        for class in solver::class_tokens(self.root.store(), &typ) {
            if let Some((impl_class, info)) = solver::find_property(self.root.store(), &class, name)
            {
                found = Some((impl_class, info.access));
                break;
            }
            if solver::has_magic_method(self.root.store(), &class, "__get") {
                magic = true;
                break;
            }
        }

        match found {
            None => {
                if !magic && !self.root.state().is_trait && !self.is_this_inside_closure(base) {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "undefined",
                        &format!("Property {{{typ}}}->{name} does not exist"),
                    );
                }
            }
            Some((impl_class, access)) => {
                if !solver::can_access(self.root.store(), self.root.state(), &impl_class, access) {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "accessLevel",
                        &format!("Cannot access {access} property {impl_class}->{name}"),
                    );
                }
            }
        }
        false
    }

    fn handle_static_property_fetch(&mut self, expr: &Expr) -> bool {
        let ExprKind::StaticProp {
            class,
            name,
            name_span,
        } = &expr.kind
        else {
            return true;
        };
        if !self.root.store().is_indexing_complete() {
            return false;
        }
        let Some(name) = name else {
            return false;
        };
        let Some(class_name) = self.root.resolve_class_ref(class) else {
            return false;
        };

        match solver::find_property(self.root.store(), &class_name, &format!("${name}")) {
            None => {
                if !self.root.state().is_trait {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "undefined",
                        &format!("Property {class_name}::${name} does not exist"),
                    );
                }
            }
            Some((impl_class, info)) => {
                if !solver::can_access(self.root.store(), self.root.state(), &impl_class, info.access)
                {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "accessLevel",
                        &format!("Cannot access {} property {}::${}", info.access, impl_class, name),
                    );
                }
            }
        }
        false
    }

    // ---- calls ----

    fn enough_args(&self, args: &[Arg], info: &FuncInfo) -> bool {
        if args.len() < info.min_params {
            // A trailing ...$spread may supply the missing values.
            return args.last().is_some_and(|arg| arg.unpack);
        }
        true
    }

    fn handle_args_count(&mut self, span: Span, callee_name: &str, args: &[Arg], info: &FuncInfo) {
        // Builtins with an exact arity set, where "enough" is wrong.
        if callee_name.trim_start_matches('\\') == "mt_rand" {
            if !args.is_empty() && args.len() != 2 {
                self.root.report(
                    span,
                    Severity::Warning,
                    "argCount",
                    "mt_rand expects 0 or 2 args",
                );
            }
            return;
        }
        if !self.enough_args(args, info) {
            self.root.report(
                span,
                Severity::Warning,
                "argCount",
                &format!("Too few arguments for {callee_name}"),
            );
        }
    }

    fn handle_call_args(&mut self, span: Span, callee_name: &str, args: &[Arg], info: &FuncInfo) {
        self.handle_args_count(span, callee_name, args, info);

        for (i, arg) in args.iter().enumerate() {
            let Some(param) = info.params.get(i) else {
                self.walk_expr(&arg.expr);
                continue;
            };
            if !param.by_ref {
                self.walk_expr(&arg.expr);
                continue;
            }
            // A by-ref argument is both read and written.
            match &arg.expr.kind {
                ExprKind::Var(name) => {
                    let name = name.clone();
                    self.add_non_local_var(&name);
                    self.add_var(&name, arg.expr.span, param.typ.clone(), "call_with_ref", true);
                }
                ExprKind::Index { .. } => {
                    self.handle_dim_fetch_lvalue(&arg.expr, "call_with_ref", TypeSet::mixed());
                }
                _ => self.walk_expr(&arg.expr),
            }
        }
    }

    fn report_deprecated(&mut self, span: Span, what: &str, info: &FuncInfo) {
        if !info.doc.deprecated {
            return;
        }
        let message = if info.doc.deprecation_note.is_empty() {
            format!("Call to deprecated {what}")
        } else {
            format!("Call to deprecated {what} ({})", info.doc.deprecation_note)
        };
        self.root
            .report(span, Severity::DoNotReject, "deprecated", &message);
    }

    fn handle_function_call(&mut self, expr: &Expr) -> bool {
        let ExprKind::FuncCall { name, args, .. } = &expr.kind else {
            return true;
        };
        if !self.root.store().is_indexing_complete() {
            return true;
        }
        let Some(name) = name else {
            // Dynamic callee: nothing to resolve, just walk.
            return true;
        };

        let (fqn, info) = solver::resolve_function(self.root.store(), self.root.state(), name);
        let info = match info {
            Some(info) => info,
            None => {
                self.root.report(
                    expr.span,
                    Severity::Error,
                    "undefined",
                    &format!("Call to undefined function {name}"),
                );
                FuncInfo::default()
            }
        };
        self.report_deprecated(expr.span, &format!("function {name}"), &info);

        if fqn == "\\compact" {
            self.handle_compact_call_args(args);
        } else {
            self.handle_call_args(expr.span, &name.to_string(), args, &info);
        }
        self.ctx.exit_flags |= info.exit_flags;
        false
    }

    /// compact() treats strings anywhere in its argument tree as
    /// uses of the variables named by those strings.
    fn handle_compact_call_args(&mut self, args: &[Arg]) {
        let mut pending: Vec<&Expr> = args.iter().map(|arg| &arg.expr).collect();
        let mut strings: Vec<(String, Span)> = Vec::new();
        while let Some(expr) = pending.pop() {
            match &expr.kind {
                ExprKind::Str(value) => strings.push((value.clone(), expr.span)),
                ExprKind::Array { items, .. } => {
                    for item in items {
                        if let Some(value) = &item.value {
                            pending.push(value);
                        }
                    }
                }
                _ => {}
            }
        }
        for (name, span) in strings {
            self.handle_variable(&name, span);
        }
    }

    fn handle_method_call(&mut self, expr: &Expr) -> bool {
        let ExprKind::MethodCall {
            base,
            name,
            name_span,
            args,
        } = &expr.kind
        else {
            return true;
        };
        if !self.root.store().is_indexing_complete() {
            return true;
        }
        let Some(method_name) = name else {
            return true;
        };

        let typ = self.expr_type(base);
        let mut found: Option<(String, FuncInfo)> = None;
        let mut magic = false;
        for class in solver::class_tokens(self.root.store(), &typ) {
            if let Some(hit) = solver::find_method(self.root.store(), &class, method_name) {
                found = Some(hit);
                break;
            }
            if solver::has_magic_method(self.root.store(), &class, "__call") {
                magic = true;
                break;
            }
        }

        self.walk_expr(base);

        let info = match &found {
            None => {
                if !magic && !self.root.state().is_trait && !self.is_this_inside_closure(base) {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "undefined",
                        &format!("Call to undefined method {{{typ}}}->{method_name}()"),
                    );
                }
                FuncInfo::default()
            }
            Some((impl_class, info)) => {
                if info.is_static && !magic {
                    self.root.report(
                        *name_span,
                        Severity::Warning,
                        "callStatic",
                        "Calling static method as instance method",
                    );
                }
                self.report_deprecated(
                    *name_span,
                    &format!("method {{{typ}}}->{method_name}()"),
                    info,
                );
                if !solver::can_access(self.root.store(), self.root.state(), impl_class, info.access)
                {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "accessLevel",
                        &format!(
                            "Cannot access {} method {}->{}()",
                            info.access, impl_class, method_name
                        ),
                    );
                }
                info.clone()
            }
        };

        self.handle_call_args(*name_span, method_name, args, &info);
        self.ctx.exit_flags |= info.exit_flags;
        false
    }

    fn handle_static_call(&mut self, expr: &Expr) -> bool {
        let ExprKind::StaticCall {
            class,
            name,
            name_span,
            args,
        } = &expr.kind
        else {
            return true;
        };
        if !self.root.store().is_indexing_complete() {
            return true;
        }
        let Some(class_name) = self.root.resolve_class_ref(class) else {
            return true;
        };

        let found = solver::find_method(self.root.store(), &class_name, name);
        let magic = solver::has_magic_method(self.root.store(), &class_name, "__callStatic");

        let info = match &found {
            None => {
                if !magic && !self.root.state().is_trait {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "undefined",
                        &format!("Call to undefined method {class_name}::{name}()"),
                    );
                }
                FuncInfo::default()
            }
            Some((impl_class, info)) => {
                // parent::f() from an instance method is permitted.
                let parent_call = matches!(
                    class,
                    ClassRef::Name(class_name) if class_name.is_simple() && class_name.first() == "parent"
                );
                if !parent_call && !info.is_static && !magic {
                    self.root.report(
                        *name_span,
                        Severity::Warning,
                        "callStatic",
                        "Calling instance method as static method",
                    );
                }
                self.report_deprecated(*name_span, &format!("method {class_name}::{name}()"), info);
                if !solver::can_access(self.root.store(), self.root.state(), impl_class, info.access)
                {
                    self.root.report(
                        *name_span,
                        Severity::Error,
                        "accessLevel",
                        &format!("Cannot access {} method {}::{}()", info.access, impl_class, name),
                    );
                }
                info.clone()
            }
        };

        self.handle_call_args(*name_span, name, args, &info);
        self.ctx.exit_flags |= info.exit_flags;
        false
    }

    fn handle_new(&mut self, expr: &Expr) -> bool {
        let ExprKind::New { class, args } = &expr.kind else {
            return true;
        };
        self.root.check_keyword_case(expr.span, "new");

        if !self.root.store().is_indexing_complete() {
            return true;
        }
        if self.root.state().is_trait {
            if let ClassRef::Name(name) = class {
                // `new self`/`new static` are unresolvable in traits.
                if name.is_simple() && matches!(name.first(), "self" | "static") {
                    return true;
                }
            }
        }
        let Some(class_name) = self.root.resolve_class_ref(class) else {
            // Something like `new $class`; cannot check.
            return true;
        };

        if !self.root.store().has_class(&class_name) {
            self.root.report(
                expr.span,
                Severity::Error,
                "undefined",
                &format!("Class not found {class_name}"),
            );
        }

        // Implicitly invoked constructor arity.
        if let Some((_, ctor)) = solver::find_method(self.root.store(), &class_name, "__construct")
        {
            if !self.enough_args(args, &ctor) {
                self.root.report(
                    expr.span,
                    Severity::Error,
                    "argCount",
                    &format!("Too few arguments for {class_name} constructor"),
                );
            }
        }
        true
    }

    // ---- assignment ----

    /// `$a[...] = value`: union an array-wrapped value type into the
    /// base variable, creating it when it was undefined.
    pub(crate) fn handle_dim_fetch_lvalue(&mut self, expr: &Expr, reason: &str, typ: TypeSet) {
        self.handle_array_dim_fetch(expr);
        let ExprKind::Index { base, index } = &expr.kind else {
            return;
        };
        match &base.kind {
            ExprKind::Var(name) => {
                let mut arr_typ = TypeSet::new();
                for token in typ.iter() {
                    arr_typ = arr_typ.append_type(Type::ArrayOf(Box::new(token.clone())));
                }
                let name = name.clone();
                self.add_var(&name, base.span, arr_typ, reason, true);
            }
            ExprKind::Index { .. } => {
                self.handle_dim_fetch_lvalue(base, reason, TypeSet::mixed());
            }
            _ => self.walk_expr(base),
        }
        if let Some(index) = index {
            self.walk_expr(index);
        }
    }

    fn handle_assign_list(&mut self, items: &[civet_frontend::ArrayItem]) {
        for item in items {
            if let Some(value) = &item.value {
                self.handle_variable_node(
                    value,
                    TypeSet::of(Type::Opaque("unknown_from_list".into())),
                    "assign",
                );
            }
        }
    }

    fn handle_assign(&mut self, expr: &Expr) -> bool {
        let ExprKind::Assign { target, value, .. } = &expr.kind else {
            return true;
        };
        self.walk_expr(value);

        match &target.kind {
            ExprKind::Index { .. } => {
                let typ = self.expr_type(value);
                self.handle_dim_fetch_lvalue(target, "assign_array", typ);
            }
            ExprKind::Var(name) => {
                let typ = self.expr_type(value);
                let name = name.clone();
                self.replace_var(&name, target.span, typ, "assign", true);
            }
            ExprKind::List { items } | ExprKind::Array { items, .. } => {
                self.handle_assign_list(items);
            }
            ExprKind::Prop { base, name, .. } => {
                let Some(base_name) = base.simple_var() else {
                    self.walk_expr(base);
                    return false;
                };
                self.unused_vars.remove(base_name);
                if base_name != "this" {
                    return false;
                }
                if !self.root.state().in_class() {
                    return false;
                }
                let Some(prop_name) = name else {
                    return false;
                };
                // Imprecise cross-call type flow: remember what got
                // assigned into the property.
                let typ = self.expr_type(value);
                let class = self.root.state().current_class.clone();
                self.root.store().add_property_union(&class, prop_name, &typ);
            }
            ExprKind::StaticProp { class, name, .. } => {
                let Some(prop_name) = name else {
                    return false;
                };
                if !self.root.state().in_class() {
                    return false;
                }
                let Some(class_name) = self.root.resolve_class_ref(class) else {
                    return false;
                };
                if class_name != self.root.state().current_class {
                    return false;
                }
                let typ = self.expr_type(value);
                self.root
                    .store()
                    .add_property_union(&class_name, &format!("${prop_name}"), &typ);
            }
            _ => self.walk_expr(target),
        }
        false
    }

    fn handle_assign_reference(&mut self, expr: &Expr) -> bool {
        let ExprKind::Assign { target, value, .. } = &expr.kind else {
            return true;
        };
        match &target.kind {
            ExprKind::Index { .. } => {
                self.handle_dim_fetch_lvalue(target, "assign_array", TypeSet::mixed());
                self.walk_expr(value);
                return false;
            }
            ExprKind::Var(name) => {
                let typ = self.expr_type(value);
                let name = name.clone();
                self.add_var(&name, target.span, typ, "assign", true);
                self.add_non_local_var(&name);
            }
            ExprKind::List { items } => {
                self.handle_assign_list(items);
            }
            _ => self.walk_expr(target),
        }
        self.walk_expr(value);
        false
    }
}
