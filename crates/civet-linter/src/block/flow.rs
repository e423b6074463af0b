// block/flow.rs
//
// Control-flow constructs: branch contexts, scope merging and the
// linksCount accounting that decides which variables stay
// always-defined after a construct.

use civet_frontend::{Case, Expr, ExprKind, Stmt, StmtKind, UnaryOp};
use civet_meta::{ExitFlags, Scope, Type, TypeSet};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::context::LoopKind;
use crate::report::Severity;
use crate::root::FuncParam;

use super::BlockWalker;

static FALLTHROUGH_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:/\*|//|#)\s?(?:fallthrough|fall through|falls through|no break)")
        .expect("fallthrough marker regex")
});

fn case_has_fallthrough_comment(case: &Case) -> bool {
    case.leading
        .iter()
        .any(|c| FALLTHROUGH_MARKER.is_match(&c.text))
}

impl BlockWalker<'_, '_> {
    /// Walk an `if` condition, installing isset/!empty/instanceof
    /// narrowings. `&&` chains extend the narrowing left to right;
    /// anything else is walked normally. Narrowed names that did not
    /// exist before are collected for removal after the `if`.
    fn walk_if_cond(&mut self, cond: &Expr, vars_to_delete: &mut Vec<String>) {
        match &cond.kind {
            ExprKind::Binary {
                op: civet_frontend::BinaryOp::BoolAnd,
                left,
                right,
            } => {
                self.walk_if_cond(left, vars_to_delete);
                self.walk_if_cond(right, vars_to_delete);
            }
            ExprKind::Isset(vars) => {
                for var in vars {
                    if let ExprKind::Var(name) = &var.kind {
                        if !self.ctx.scope.have_var(name) {
                            let name = name.clone();
                            self.add_var(
                                &name,
                                var.span,
                                TypeSet::of(Type::Opaque(format!("isset_${name}"))),
                                "isset",
                                true,
                            );
                            vars_to_delete.push(name);
                        }
                    }
                }
                self.walk_expr(cond);
            }
            ExprKind::InstanceOf { expr, class } => {
                if let Some(class_name) = self.root.resolve_class_ref(class) {
                    match &expr.kind {
                        ExprKind::Var(name) => {
                            let existed = self.ctx.scope.maybe_have_var(name);
                            self.ctx.scope.add_var(
                                name,
                                TypeSet::of(Type::Class(class_name)),
                                "instanceof",
                                false,
                            );
                            if !existed {
                                vars_to_delete.push(name.clone());
                            }
                        }
                        _ => {
                            self.ctx.custom_types.push(civet_solver::CustomType {
                                span: expr.span,
                                typ: TypeSet::of(Type::Class(class_name)),
                            });
                        }
                    }
                }
                self.walk_expr(cond);
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr,
            } => {
                // !empty($x) implies isset($x).
                if let ExprKind::Empty(inner) = &expr.kind {
                    if let ExprKind::Var(name) = &inner.kind {
                        if !self.ctx.scope.have_var(name) {
                            let name = name.clone();
                            self.add_var(
                                &name,
                                inner.span,
                                TypeSet::of(Type::Opaque(format!("isset_${name}"))),
                                "!empty",
                                true,
                            );
                            vars_to_delete.push(name);
                        }
                    }
                }
                self.walk_expr(cond);
            }
            _ => self.walk_expr(cond),
        }
    }

    pub(crate) fn handle_if(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::If(if_stmt) = &stmt.kind else {
            return true;
        };
        let mut vars_to_delete = Vec::new();

        // The first condition is always executed, so it runs in the
        // base context.
        self.walk_if_cond(&if_stmt.cond, &mut vars_to_delete);

        let mut contexts = Vec::new();
        let mut links_count = 0usize;

        let then_ctx = self.with_new_context(|w| {
            w.walk_block(&if_stmt.then);
        });
        if then_ctx.exit_flags.is_empty() {
            links_count += 1;
        }
        contexts.push(then_ctx);

        for elseif in &if_stmt.elseifs {
            self.root.check_keyword_case(elseif.span, "elseif");
            let mut branch_deletes = Vec::new();
            let ctx = self.with_new_context(|w| {
                w.walk_if_cond(&elseif.cond, &mut branch_deletes);
                w.walk_block(&elseif.body);
            });
            // Branch-condition narrowings can resurface through the
            // scope merge below; schedule them for removal too.
            vars_to_delete.append(&mut branch_deletes);
            if ctx.exit_flags.is_empty() {
                links_count += 1;
            }
            contexts.push(ctx);
        }

        match &if_stmt.otherwise {
            Some(body) => {
                let ctx = self.with_new_context(|w| {
                    w.walk_block(body);
                });
                if ctx.exit_flags.is_empty() {
                    links_count += 1;
                }
                contexts.push(ctx);
            }
            // No else branch: control can always fall through.
            None => links_count += 1,
        }

        self.propagate_flags_from_branches(&contexts, links_count);

        let mut var_types: FxHashMap<String, TypeSet> = FxHashMap::default();
        let mut def_counts: FxHashMap<String, usize> = FxHashMap::default();
        for ctx in &contexts {
            if !ctx.exit_flags.is_empty() {
                continue;
            }
            ctx.scope.iterate(|name, typ, always_defined| {
                let entry = var_types.entry(name.to_string()).or_default();
                *entry = entry.append(typ);
                if always_defined {
                    *def_counts.entry(name.to_string()).or_default() += 1;
                }
            });
        }
        for (name, types) in var_types {
            let always = def_counts.get(&name).copied().unwrap_or(0) == links_count;
            self.ctx.scope.add_var(&name, types, "all branches", always);
        }

        // Narrowings introduced by the condition live only inside
        // the construct.
        for name in vars_to_delete {
            self.ctx.scope.del_var(&name);
        }

        false
    }

    pub(crate) fn handle_while(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::While { cond, body } = &stmt.kind else {
            return true;
        };
        self.root.check_keyword_case(stmt.span, "while");
        self.walk_expr(cond);

        // The body can run zero times, so it gets its own context.
        let ctx = self.with_new_context(|w| {
            w.ctx.innermost_loop = LoopKind::For;
            w.ctx.inside_loop = true;
            w.walk_block(body);
        });
        self.maybe_add_all_vars(&ctx.scope, "while body");
        self.propagate_flags(&ctx);
        false
    }

    pub(crate) fn handle_do_while(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::DoWhile { body, cond } = &stmt.kind else {
            return true;
        };
        self.root.check_keyword_case(stmt.span, "do");

        // A do-while body runs at least once, so it is walked in the
        // parent context.
        let old_innermost = self.ctx.innermost_loop;
        let old_inside = self.ctx.inside_loop;
        self.ctx.innermost_loop = LoopKind::For;
        self.ctx.inside_loop = true;
        self.walk_block(body);
        self.ctx.innermost_loop = old_innermost;
        self.ctx.inside_loop = old_inside;

        self.walk_expr(cond);
        false
    }

    pub(crate) fn handle_for(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::For {
            init,
            cond,
            step,
            body,
        } = &stmt.kind
        else {
            return true;
        };
        self.root.check_keyword_case(stmt.span, "for");
        for expr in init {
            self.walk_expr(expr);
        }
        for expr in cond {
            self.walk_expr(expr);
        }
        for expr in step {
            self.walk_expr(expr);
        }

        let ctx = self.with_new_context(|w| {
            w.ctx.innermost_loop = LoopKind::For;
            w.ctx.inside_loop = true;
            w.walk_block(body);
        });
        self.maybe_add_all_vars(&ctx.scope, "for body");
        self.propagate_flags(&ctx);
        false
    }

    pub(crate) fn handle_foreach(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::Foreach(foreach) = &stmt.kind else {
            return true;
        };
        self.root.check_keyword_case(stmt.span, "foreach");

        // The iterated expression always executes, in the base context.
        self.walk_expr(&foreach.expr);

        let iterated = self.expr_type(&foreach.expr);
        let ctx = self.with_new_context(|w| {
            for token in iterated.iter() {
                w.handle_variable_node(
                    &foreach.value,
                    TypeSet::of(Type::ElemOf(Box::new(token.clone()))),
                    "foreach_value",
                );
            }
            if let Some(key) = &foreach.key {
                w.handle_variable_node(key, TypeSet::new(), "foreach_key");
            }
            if let ExprKind::List { items } = &foreach.value.kind {
                for item in items {
                    if let Some(value) = &item.value {
                        w.handle_variable_node(value, TypeSet::new(), "foreach_value");
                    }
                }
            } else {
                w.handle_variable_node(&foreach.value, TypeSet::new(), "foreach_value");
            }

            w.ctx.innermost_loop = LoopKind::For;
            w.ctx.inside_loop = true;
            w.walk_block(&foreach.body);
        });

        self.maybe_add_all_vars(&ctx.scope, "foreach body");
        self.propagate_flags(&ctx);
        false
    }

    /// Variables from a loop body become possibly-defined in the
    /// parent: the body may have run zero times.
    pub(crate) fn maybe_add_all_vars(&mut self, scope: &Scope, reason: &str) {
        let mut collected: Vec<(String, TypeSet)> = Vec::new();
        scope.iterate(|name, typ, _| {
            collected.push((name.to_string(), typ.clone()));
        });
        for (name, typ) in collected {
            self.ctx.scope.add_var(&name, typ, reason, false);
        }
    }

    pub(crate) fn handle_switch(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::Switch { cond, cases } = &stmt.kind else {
            return true;
        };
        self.walk_expr(cond);

        let mut contexts = Vec::new();
        let mut links_count = 0usize;
        let mut have_default = false;
        let break_flags = ExitFlags::BREAK | ExitFlags::CONTINUE;

        for (idx, case) in cases.iter().enumerate() {
            match &case.cond {
                Some(case_cond) => {
                    self.root.check_keyword_case(case.span, "case");
                    self.walk_expr(case_cond);
                }
                None => {
                    have_default = true;
                    self.root.check_keyword_case(case.span, "default");
                }
            }

            // An empty case body defines nothing and needs no break.
            if case.body.is_empty() {
                continue;
            }

            let ctx = self.with_new_context(|w| {
                w.ctx.innermost_loop = LoopKind::Switch;
                w.walk_block(&case.body);

                // A non-final case must end with break (or carry a
                // fallthrough comment on the next case).
                if idx != cases.len() - 1 && w.ctx.exit_flags.is_empty() {
                    let next_case = &cases[idx + 1];
                    if !case_has_fallthrough_comment(next_case) {
                        w.root.report(
                            case.span,
                            Severity::Information,
                            "caseBreak",
                            "Add break or '// fallthrough' to the end of the case",
                        );
                    }
                }

                if w.ctx.exit_flags.without(break_flags).is_empty() {
                    links_count += 1;
                    if w.ctx.exit_flags.is_empty() {
                        // Model fall-through: subsequent cases also
                        // contribute to this branch's scope.
                        w.iterate_next_cases(cases, idx + 1);
                    }
                }
            });
            contexts.push(ctx);
        }

        // A switch without default has an implicit non-exiting branch.
        if !have_default {
            links_count += 1;
        }

        let mut all_exit = false;
        let mut premature = ExitFlags::empty();
        if !contexts.is_empty() && have_default {
            all_exit = true;
            for ctx in &contexts {
                let clean = ctx.exit_flags.without(break_flags);
                if clean.is_empty() {
                    all_exit = false;
                } else {
                    premature |= clean;
                }
            }
        }
        if all_exit {
            self.ctx.exit_flags |= premature;
        }

        let mut var_types: FxHashMap<String, TypeSet> = FxHashMap::default();
        let mut def_counts: FxHashMap<String, usize> = FxHashMap::default();
        for ctx in &contexts {
            self.ctx.contains_exit_flags |= ctx.contains_exit_flags;
            if !ctx.exit_flags.without(break_flags).is_empty() {
                continue;
            }
            ctx.scope.iterate(|name, typ, always_defined| {
                let entry = var_types.entry(name.to_string()).or_default();
                *entry = entry.append(typ);
                if always_defined {
                    *def_counts.entry(name.to_string()).or_default() += 1;
                }
            });
        }
        for (name, types) in var_types {
            let always = def_counts.get(&name).copied().unwrap_or(0) == links_count;
            self.ctx.scope.add_var(&name, types, "all cases", always);
        }

        false
    }

    fn iterate_next_cases(&mut self, cases: &[Case], start_idx: usize) {
        for case in &cases[start_idx..] {
            if let Some(cond) = &case.cond {
                self.walk_expr(cond);
            }
            for stmt in &case.body {
                self.walk_stmt(stmt);
                if !self.ctx.exit_flags.is_empty() {
                    return;
                }
            }
        }
    }

    pub(crate) fn handle_try(&mut self, stmt: &Stmt) -> bool {
        let StmtKind::Try(try_stmt) = &stmt.kind else {
            return true;
        };
        if try_stmt.catches.is_empty() && try_stmt.finally.is_none() {
            self.root.report(
                stmt.span,
                Severity::Error,
                "bareTry",
                "At least one catch or finally block must be present",
            );
        }
        self.root.check_keyword_case(stmt.span, "try");

        // Assume nothing in the try block executed: exceptions can be
        // thrown from anywhere. Catches and finally are analyzed first.
        let mut contexts = Vec::new();
        for catch in &try_stmt.catches {
            self.root.check_keyword_case(catch.span, "catch");
            let ctx = self.with_new_context(|w| {
                let mut caught = TypeSet::new();
                for typ in &catch.types {
                    if let Some(class_name) = civet_solver::resolve_class_name(w.root.state(), typ)
                    {
                        caught = caught.append_type(Type::Class(class_name));
                    }
                }
                // Catch variables are exempt from unused tracking:
                // ignoring the caught exception is idiomatic.
                w.ctx.scope.add_var(&catch.var, caught, "catch", true);
                w.walk_block(&catch.body);
            });
            contexts.push(ctx);
        }
        if let Some(finally) = &try_stmt.finally {
            let ctx = self.with_new_context(|w| {
                w.walk_block(finally);
            });
            contexts.push(ctx);
        }

        // Whether all catches and finally exit ("return", "throw", ...).
        let mut others_exit = true;
        let mut premature = ExitFlags::empty();
        for ctx in &contexts {
            if ctx.exit_flags.is_empty() {
                others_exit = false;
            } else {
                premature |= ctx.exit_flags;
            }
            self.ctx.contains_exit_flags |= ctx.contains_exit_flags;
        }

        let try_ctx = self.with_new_context(|w| {
            w.walk_block(&try_stmt.body);
        });

        let mut try_vars: Vec<(String, TypeSet, bool)> = Vec::new();
        try_ctx.scope.iterate(|name, typ, always_defined| {
            try_vars.push((name.to_string(), typ.clone(), always_defined));
        });
        for (name, typ, always_defined) in try_vars {
            self.ctx
                .scope
                .add_var(&name, typ, "try var", always_defined && others_exit);
        }

        if others_exit && !try_ctx.exit_flags.is_empty() {
            self.ctx.exit_flags |= premature;
            self.ctx.exit_flags |= try_ctx.exit_flags;
        }
        self.ctx.contains_exit_flags |= try_ctx.contains_exit_flags;

        false
    }

    /// A closure gets a fresh scope: `$this` flows in from an
    /// enclosing instance method, captures come via `use`.
    pub(crate) fn enter_closure(&mut self, expr: &Expr) -> bool {
        let ExprKind::Closure(closure) = &expr.kind else {
            return true;
        };

        let is_instance = self.ctx.scope.is_in_instance_method();
        let mut scope = Scope::new();
        scope.set_in_closure(true);

        if is_instance {
            let this_type = self
                .ctx
                .scope
                .var_type("this")
                .cloned()
                .unwrap_or_default();
            scope.add_var("this", this_type, "closure inside instance method", true);
        } else {
            scope.add_var(
                "this",
                TypeSet::of(Type::Opaque("possibly_late_bound".into())),
                "possibly late bound $this",
                true,
            );
        }

        let mut non_locals = Vec::new();
        for use_clause in &closure.uses {
            let name = &use_clause.name;
            if !self.ctx.scope.have_var(name) && !use_clause.by_ref {
                self.root.report(
                    use_clause.span,
                    Severity::Warning,
                    "undefined",
                    &format!("Undefined variable {name}"),
                );
            }
            if let Some(typ) = self.ctx.scope.var_type(name) {
                scope.add_var(name, typ.clone(), "use", true);
            }
            if use_clause.by_ref {
                non_locals.push(name.clone());
            }
            self.unused_vars.remove(name);
        }

        let params: Vec<FuncParam> = closure
            .params
            .iter()
            .map(|p| self.root.func_param(p))
            .collect();
        self.root
            .handle_func_stmts(&params, &non_locals, &closure.body, scope);
        false
    }
}
