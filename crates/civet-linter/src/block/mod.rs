// block/mod.rs
//
// The block walker processes the body of exactly one function,
// method, closure or file top-level. It owns the control-flow
// accounting (exit flags, branch merging), variable usage tracking
// and most check emission.
//
// Enter protocol, in order: custom before-hooks; dead-code check when
// the context already exited; `@var` docblock assertions from leading
// comments; the per-kind handler (its bool return decides whether the
// generic child traversal runs); custom after-hooks; pattern-rule
// matching. Leave protocol: exit-flag updates and custom hooks.

mod exprs;
mod flow;

use civet_frontend::{
    docblock, Comment, Expr, ExprKind, Span, Stmt, StmtKind,
};
use civet_meta::{ExitFlags, Type, TypeSet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::{BlockContext, LoopKind};
use crate::custom::{BlockCheck, NodeRef};
use crate::report::{is_discard_var, is_super_global, Severity};
use crate::root::RootWalker;

pub struct BlockWalker<'r, 'a> {
    pub(crate) root: &'r mut RootWalker<'a>,
    pub(crate) ctx: BlockContext,

    pub(crate) ignore_function_bodies: bool,
    /// Analyzing root-level code.
    pub(crate) root_level: bool,

    /// Inferred return types of the function being walked.
    pub(crate) return_types: TypeSet,
    /// Saw `return;` without an expression.
    pub(crate) bare_return: bool,
    /// Saw `return expr;`.
    pub(crate) returns_value: bool,

    /// Variable name -> spans of writes that were never read back.
    pub(crate) unused_vars: FxHashMap<String, Vec<Span>>,
    /// Vars with non-local flow: `global`, `static`, by-ref params.
    pub(crate) non_local_vars: FxHashSet<String>,

    custom: Vec<Box<dyn BlockCheck>>,
}

impl<'r, 'a> BlockWalker<'r, 'a> {
    pub fn new(root: &'r mut RootWalker<'a>, ctx: BlockContext) -> Self {
        let custom = root.make_block_checks();
        Self {
            root,
            ctx,
            ignore_function_bodies: false,
            root_level: false,
            return_types: TypeSet::new(),
            bare_return: false,
            returns_value: false,
            unused_vars: FxHashMap::default(),
            non_local_vars: FxHashSet::default(),
            custom,
        }
    }

    // ---- context plumbing ----

    /// Run `action` inside a copy of the current context and return
    /// that copy for merging, restoring the original afterwards.
    pub(crate) fn with_new_context(&mut self, action: impl FnOnce(&mut Self)) -> BlockContext {
        let branch = self.ctx.clone();
        let saved = std::mem::replace(&mut self.ctx, branch);
        action(self);
        std::mem::replace(&mut self.ctx, saved)
    }

    /// Merge for a simple single sub-block: only the "contains" bits
    /// travel upward.
    pub(crate) fn propagate_flags(&mut self, other: &BlockContext) {
        self.ctx.contains_exit_flags |= other.contains_exit_flags;
    }

    /// Propagate premature exit flags from visited branches.
    /// `links_count` is the number of branches (implicit ones
    /// included) through which control can reach the code after the
    /// construct.
    pub(crate) fn propagate_flags_from_branches(
        &mut self,
        contexts: &[BlockContext],
        links_count: usize,
    ) {
        for ctx in contexts {
            self.ctx.contains_exit_flags |= ctx.contains_exit_flags;
        }

        if contexts.is_empty() || links_count != 0 {
            return;
        }
        let mut all_exit = true;
        let mut premature = ExitFlags::empty();
        for ctx in contexts {
            if ctx.exit_flags.is_empty() {
                all_exit = false;
            } else {
                premature |= ctx.exit_flags;
            }
        }
        if all_exit {
            self.ctx.exit_flags |= premature;
        }
    }

    // ---- variable bookkeeping ----

    /// Record a write for unused-variable tracking. Writes to
    /// non-local variables count as usages; writes inside loops are
    /// not tracked at all since the next iteration may read them.
    /// Writes on an already-exited path are dead code, not unused
    /// variables.
    pub(crate) fn track_var_write(&mut self, name: &str, span: Span) {
        if !self.ctx.exit_flags.is_empty() {
            return;
        }
        if self.non_local_vars.contains(name) {
            self.unused_vars.remove(name);
            return;
        }
        if !self.ctx.inside_loop {
            self.unused_vars
                .entry(name.to_string())
                .or_default()
                .push(span);
        }
    }

    pub(crate) fn add_var(
        &mut self,
        name: &str,
        span: Span,
        typ: TypeSet,
        reason: &str,
        always_defined: bool,
    ) {
        self.ctx.scope.add_var(name, typ, reason, always_defined);
        self.track_var_write(name, span);
    }

    pub(crate) fn replace_var(
        &mut self,
        name: &str,
        span: Span,
        typ: TypeSet,
        reason: &str,
        always_defined: bool,
    ) {
        self.ctx.scope.replace_var(name, typ, reason, always_defined);
        self.track_var_write(name, span);
    }

    pub(crate) fn add_non_local_var(&mut self, name: &str) {
        self.non_local_vars.insert(name.to_string());
    }

    /// A variable is read. Reports undefined/possibly-undefined uses
    /// and registers the name so the report fires only once.
    pub(crate) fn handle_variable(&mut self, name: &str, span: Span) {
        self.unused_vars.remove(name);

        if is_super_global(name) {
            if !self.ctx.scope.maybe_have_var(name) {
                self.ctx
                    .scope
                    .add_var(name, TypeSet::mixed(), "superglobal", true);
            }
            return;
        }

        if !self.ctx.scope.have_var(name) {
            if self.ctx.scope.maybe_have_var(name) {
                self.root.report(
                    span,
                    Severity::Warning,
                    "undefined",
                    &format!("Variable might have not been defined: {name}"),
                );
            } else {
                self.root.report(
                    span,
                    Severity::Error,
                    "undefined",
                    &format!("Undefined variable: {name}"),
                );
            }
            self.ctx.scope.add_var(
                name,
                TypeSet::of(Type::Opaque("undefined".into())),
                "undefined",
                true,
            );
        }
    }

    /// Add a variable-ish target node (`$v`, `&$v`) with a type.
    pub(crate) fn handle_variable_node(&mut self, node: &Expr, typ: TypeSet, reason: &str) {
        match &node.kind {
            ExprKind::Var(name) => {
                let name = name.clone();
                self.add_var(&name, node.span, typ, reason, true);
            }
            ExprKind::VarVar(_) => {}
            _ => {}
        }
    }

    /// Emit one `unused` report per surviving write at function end.
    pub(crate) fn flush_unused(&mut self) {
        if !self.root.store().is_indexing_complete() {
            return;
        }
        let mut pending: Vec<(Span, String)> = Vec::new();
        for (name, spans) in &self.unused_vars {
            if is_discard_var(name) || is_super_global(name) {
                continue;
            }
            let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
            for span in spans {
                if seen.insert((span.start, span.end)) {
                    pending.push((*span, name.clone()));
                }
            }
        }
        pending.sort_by_key(|(span, _)| span.start);
        for (span, name) in pending {
            self.root.report(
                span,
                Severity::Unused,
                "unused",
                &format!("Unused variable {name} (use $_ to ignore this inspection)"),
            );
        }
    }

    // ---- comments ----

    /// `@var` assertions from a free-floating docblock. The tag is
    /// accepted in both `@var Type $name` and `@var $name Type`
    /// order; the two are swapped when only the second word carries
    /// the `$` sigil.
    pub(crate) fn parse_comment(&mut self, comment: &Comment) {
        if !comment.is_doc {
            return;
        }
        for tag in docblock::parse(&comment.text) {
            if tag.name != "var" {
                continue;
            }
            if tag.params.len() < 2 {
                self.root.report(
                    comment.span,
                    Severity::Warning,
                    "phpdocLint",
                    "@var requires a type and a variable name",
                );
                continue;
            }
            let (mut var_name, mut typ) = (tag.params[0].clone(), tag.params[1].clone());
            if !var_name.starts_with('$') && typ.starts_with('$') {
                std::mem::swap(&mut var_name, &mut typ);
            }
            let Some(var_name) = var_name.strip_prefix('$') else {
                self.root.report(
                    comment.span,
                    Severity::Warning,
                    "phpdocLint",
                    &format!("@var has no variable name in '{}'", tag.rest),
                );
                continue;
            };
            let types = self.root.qualified_type_string(&typ);
            self.ctx.scope.add_var_from_doc(var_name, types, "@var");
        }
    }

    // ---- walking ----

    pub(crate) fn walk_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    pub fn walk_stmt(&mut self, stmt: &Stmt) {
        for check in &mut self.custom {
            check.before_enter(NodeRef::Stmt(stmt));
        }

        if !self.ctx.exit_flags.is_empty() {
            self.report_dead_code(stmt);
        }

        for comment in &stmt.leading {
            self.parse_comment(comment);
        }

        let descend = self.enter_stmt(stmt);
        if descend {
            self.walk_stmt_children(stmt);
        }

        for check in &mut self.custom {
            check.after_enter(NodeRef::Stmt(stmt));
        }

        self.root.run_rules_stmt(stmt, self.root_level);

        self.leave_stmt(stmt);
    }

    pub(crate) fn walk_expr(&mut self, expr: &Expr) {
        for check in &mut self.custom {
            check.before_enter(NodeRef::Expr(expr));
        }

        let descend = self.enter_expr(expr);
        if descend {
            self.walk_expr_children(expr);
        }

        for check in &mut self.custom {
            check.after_enter(NodeRef::Expr(expr));
        }

        self.root.run_rules(expr, self.root_level);

        self.leave_expr(expr);
    }

    fn report_dead_code(&mut self, stmt: &Stmt) {
        if self.ctx.dead_code_reported {
            return;
        }
        match &stmt.kind {
            // Breaking the flow more than once is an accepted idiom:
            //     callSomeFuncThatExits(); exit;
            StmtKind::Break { .. }
            | StmtKind::Continue { .. }
            | StmtKind::Return { .. }
            | StmtKind::Throw { .. } => return,
            StmtKind::Expr(expr) if matches!(expr.kind, ExprKind::Exit(_)) => return,
            // At root level declarations are live even after exit.
            StmtKind::Function(_) | StmtKind::Class(_) | StmtKind::ConstList(_) => {
                if self.ignore_function_bodies {
                    return;
                }
            }
            _ => {}
        }
        self.ctx.dead_code_reported = true;
        self.root.report(
            stmt.span,
            Severity::Information,
            "deadCode",
            "Unreachable code",
        );
    }

    fn leave_stmt(&mut self, stmt: &Stmt) {
        for check in &mut self.custom {
            check.before_leave(NodeRef::Stmt(stmt));
        }

        if self.ctx.exit_flags.is_empty() {
            let flag = match &stmt.kind {
                StmtKind::Return { .. } => Some(ExitFlags::RETURN),
                StmtKind::Throw { .. } => Some(ExitFlags::THROW),
                StmtKind::Continue { .. } => Some(ExitFlags::CONTINUE),
                StmtKind::Break { .. } => Some(ExitFlags::BREAK),
                _ => None,
            };
            if let Some(flag) = flag {
                self.ctx.exit_flags |= flag;
                self.ctx.contains_exit_flags |= flag;
            }
        }

        for check in &mut self.custom {
            check.after_leave(NodeRef::Stmt(stmt));
        }
    }

    fn leave_expr(&mut self, expr: &Expr) {
        for check in &mut self.custom {
            check.before_leave(NodeRef::Expr(expr));
        }

        if self.ctx.exit_flags.is_empty() && matches!(expr.kind, ExprKind::Exit(_)) {
            self.ctx.exit_flags |= ExitFlags::DIE;
            self.ctx.contains_exit_flags |= ExitFlags::DIE;
        }

        for check in &mut self.custom {
            check.after_leave(NodeRef::Expr(expr));
        }
    }

    /// Per-kind statement dispatch; returns whether to descend into
    /// children generically (handlers that walk children themselves
    /// return false).
    fn enter_stmt(&mut self, stmt: &Stmt) -> bool {
        match &stmt.kind {
            StmtKind::Nop | StmtKind::Namespace { .. } | StmtKind::Use { .. } => false,
            StmtKind::Block(_) => true,
            StmtKind::Function(decl) => {
                if self.ignore_function_bodies {
                    return false;
                }
                self.root.enter_function(decl);
                false
            }
            StmtKind::Class(_) => false,
            StmtKind::ConstList(_) => {
                self.root.check_keyword_case(stmt.span, "const");
                true
            }
            StmtKind::If(_) => self.handle_if(stmt),
            StmtKind::While { .. } => self.handle_while(stmt),
            StmtKind::DoWhile { .. } => self.handle_do_while(stmt),
            StmtKind::For { .. } => self.handle_for(stmt),
            StmtKind::Foreach(_) => self.handle_foreach(stmt),
            StmtKind::Switch { .. } => self.handle_switch(stmt),
            StmtKind::Try(_) => self.handle_try(stmt),
            StmtKind::Break { .. } => {
                self.root.check_keyword_case(stmt.span, "break");
                true
            }
            StmtKind::Continue { level } => {
                self.root.check_keyword_case(stmt.span, "continue");
                if level.is_none() && self.ctx.innermost_loop == LoopKind::Switch {
                    self.root.report(
                        stmt.span,
                        Severity::Error,
                        "caseContinue",
                        "'continue' inside switch is 'break'",
                    );
                }
                true
            }
            StmtKind::Return { expr } => {
                self.root.check_keyword_case(stmt.span, "return");
                match expr {
                    None => self.bare_return = true,
                    Some(expr) => {
                        self.returns_value = true;
                        let typ = self.expr_type(expr);
                        self.return_types = self.return_types.append(&typ);
                    }
                }
                true
            }
            StmtKind::Throw { .. } => {
                self.root.check_keyword_case(stmt.span, "throw");
                true
            }
            StmtKind::Global { vars } => {
                self.root.check_keyword_case(stmt.span, "global");
                for var in vars {
                    if let ExprKind::Var(name) = &var.kind {
                        let name = name.clone();
                        self.add_var(
                            &name,
                            var.span,
                            TypeSet::of(Type::Global(name.clone())),
                            "global",
                            true,
                        );
                        self.add_non_local_var(&name);
                    }
                }
                false
            }
            StmtKind::StaticVars { vars } => {
                for var in vars {
                    let typ = match &var.default {
                        Some(expr) => self.expr_type(expr),
                        None => TypeSet::new(),
                    };
                    let name = var.name.clone();
                    self.add_var(&name, var.span, typ, "static", true);
                    self.add_non_local_var(&name);
                    if let Some(expr) = &var.default {
                        self.walk_expr(expr);
                    }
                }
                false
            }
            StmtKind::Echo { .. } => true,
            StmtKind::Unset { vars } => {
                for var in vars {
                    match &var.kind {
                        ExprKind::Var(name) => {
                            let name = name.clone();
                            self.unused_vars.remove(&name);
                            self.ctx.scope.del_var(&name);
                        }
                        ExprKind::Index { .. } => {
                            // unset($a["key"]) does not unset $a itself.
                            self.handle_isset_dim_fetch(var);
                        }
                        _ => self.walk_expr(var),
                    }
                }
                false
            }
            StmtKind::Expr(expr) => {
                self.walk_expr(expr);
                false
            }
        }
    }

    fn walk_stmt_children(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.walk_block(stmts),
            StmtKind::ConstList(consts) => {
                for def in consts {
                    self.walk_expr(&def.value);
                }
            }
            StmtKind::Return { expr: Some(expr) } => self.walk_expr(expr),
            StmtKind::Throw { expr } => self.walk_expr(expr),
            StmtKind::Echo { exprs } => {
                for expr in exprs {
                    self.walk_expr(expr);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn walk_expr_children(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::VarVar(inner) => self.walk_expr(inner),
            ExprKind::List { items } => {
                for item in items {
                    if let Some(value) = &item.value {
                        self.walk_expr(value);
                    }
                }
            }
            ExprKind::Index { base, index } => {
                self.walk_expr(base);
                if let Some(index) = index {
                    self.walk_expr(index);
                }
            }
            ExprKind::FuncCall { callee, args, .. } => {
                if let Some(callee) = callee {
                    self.walk_expr(callee);
                }
                for arg in args {
                    self.walk_expr(&arg.expr);
                }
            }
            ExprKind::MethodCall { base, args, .. } => {
                self.walk_expr(base);
                for arg in args {
                    self.walk_expr(&arg.expr);
                }
            }
            ExprKind::StaticCall { class, args, .. } => {
                if let civet_frontend::ClassRef::Dynamic(class_expr) = class {
                    self.walk_expr(class_expr);
                }
                for arg in args {
                    self.walk_expr(&arg.expr);
                }
            }
            ExprKind::New { class, args } => {
                if let civet_frontend::ClassRef::Dynamic(class_expr) = class {
                    self.walk_expr(class_expr);
                }
                for arg in args {
                    self.walk_expr(&arg.expr);
                }
            }
            ExprKind::Clone(inner)
            | ExprKind::Empty(inner)
            | ExprKind::Cast { expr: inner, .. }
            | ExprKind::Unary { expr: inner, .. } => self.walk_expr(inner),
            ExprKind::InstanceOf { expr: inner, class } => {
                self.walk_expr(inner);
                if let civet_frontend::ClassRef::Dynamic(class_expr) = class {
                    self.walk_expr(class_expr);
                }
            }
            ExprKind::Exit(code) => {
                if let Some(code) = code {
                    self.walk_expr(code);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.walk_expr(target);
                self.walk_expr(value);
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.walk_expr(cond);
                if let Some(then) = then {
                    self.walk_expr(then);
                }
                self.walk_expr(otherwise);
            }
            ExprKind::Isset(vars) => {
                for var in vars {
                    self.walk_expr(var);
                }
            }
            _ => {}
        }
    }

    // ---- shared helpers ----

    pub(crate) fn expr_type(&self, expr: &Expr) -> TypeSet {
        civet_solver::expr_type_custom(
            &self.ctx.scope,
            self.root.state(),
            self.root.store(),
            expr,
            &self.ctx.custom_types,
        )
    }

    pub(crate) fn resolved_expr_type(&self, expr: &Expr) -> TypeSet {
        let typ = self.expr_type(expr);
        civet_solver::resolve_type_set(self.root.store(), &typ)
    }

    pub(crate) fn is_bool(&self, expr: &Expr) -> bool {
        self.resolved_expr_type(expr).is(&Type::Bool)
    }

    pub(crate) fn is_this_inside_closure(&self, expr: &Expr) -> bool {
        self.ctx.scope.is_in_closure() && expr.simple_var() == Some("this")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root::RootWalker;
    use crate::LinterConfig;
    use civet_frontend::Parser;
    use civet_meta::MetadataStore;

    /// Walk a statement list in a fresh context and return the final
    /// context for inspection.
    fn walk_ctx(src: &str) -> BlockContext {
        let out = Parser::new(src).parse_program();
        assert!(out.errors.is_empty(), "parse errors: {:?}", out.errors);
        let store = MetadataStore::new();
        store.set_indexing_complete(true);
        let config = LinterConfig::default();
        let mut root = RootWalker::new("t.php", src, &store, &config);
        let mut walker = BlockWalker::new(&mut root, BlockContext::default());
        walker.walk_block(&out.program.stmts);
        std::mem::take(&mut walker.ctx)
    }

    #[test]
    fn contains_flags_are_a_superset_of_exit_flags() {
        let snippets = [
            "return 1;",
            "throw $e;",
            "$a = 1;",
            "if ($x) { return 1; }",
            "if ($x) { return 1; } else { throw $e; }",
            "while ($x) { break; }",
            "foreach ($xs as $v) { continue; }",
            "try { return 1; } catch (E $e) { }",
            "switch ($x) { case 1: return 1; default: return 2; }",
            "do { break; } while ($x);",
        ];
        for src in snippets {
            let ctx = walk_ctx(src);
            assert!(
                ctx.contains_exit_flags.contains(ctx.exit_flags),
                "contains < exit after walking {src:?}"
            );
        }
    }

    #[test]
    fn all_branches_exiting_marks_parent_exited() {
        let ctx = walk_ctx("$x = 1; if ($x) { return 1; } else { throw $e; }");
        assert!(ctx.exit_flags.contains(ExitFlags::RETURN));
        assert!(ctx.exit_flags.contains(ExitFlags::THROW));
    }

    #[test]
    fn exiting_branch_does_not_disturb_definedness() {
        // Merging with an all-exiting branch is a no-op for variable
        // definedness but still records the exit in `contains`.
        let ctx = walk_ctx("$a = 1; if ($x) { return 1; }");
        assert!(ctx.scope.have_var("a"));
        assert!(ctx.exit_flags.is_empty());
        assert!(ctx.contains_exit_flags.contains(ExitFlags::RETURN));
    }

    #[test]
    fn merge_of_identical_branches_keeps_always_defined() {
        let ctx = walk_ctx("$a = 1; if ($a) { $b = $a; } else { $b = $a; }");
        assert!(ctx.scope.have_var("a"));
        assert!(ctx.scope.have_var("b"));
    }

    #[test]
    fn loop_body_vars_become_possibly_defined() {
        let ctx = walk_ctx("while ($x) { $inner = 1; }");
        assert!(!ctx.scope.have_var("inner"));
        assert!(ctx.scope.maybe_have_var("inner"));
    }

    #[test]
    fn break_inside_loop_does_not_exit_the_parent() {
        let ctx = walk_ctx("while ($x) { break; } $after = 1;");
        assert!(ctx.exit_flags.is_empty());
        assert!(ctx.scope.have_var("after"));
    }
}
