// root.rs
//
// The root walker makes two passes over a file. Pass 1 (indexing)
// collects declarations into a FileMeta for the metadata store.
// Pass 2 (analysis) dispatches every function/method body to a block
// walker, then walks the file top-level with a root-level block
// walker, and buffers reports.

use civet_frontend::{
    docblock, ClassDecl, ClassKind, ClassRef, Expr, ExprKind, FuncDecl, Name, Param, Program,
    Span, Stmt, StmtKind, Visibility,
};
use civet_meta::{
    parse_type_string, AccessLevel, ClassInfo, ConstInfo, ConstantInfo, ExitFlags, FileMeta,
    FuncDoc, FuncInfo, MetadataStore, ParamInfo, PropertyInfo, Scope, Type, TypeSet,
};
use civet_solver::{resolve_class_name, ClassParseState};
use rustc_hash::FxHashMap;

use crate::block::BlockWalker;
use crate::context::BlockContext;
use crate::custom::{BlockCheck, RootCheck};
use crate::report::{locate, Report, Severity, IGNORE_LINTER_MESSAGE};
use crate::rules::{categorize_expr, categorize_stmt, RuleSet};
use crate::LinterConfig;

/// A function parameter as seen by the block walker.
#[derive(Debug, Clone)]
pub struct FuncParam {
    pub name: String,
    pub typ: TypeSet,
    pub by_ref: bool,
}

/// What a body walk learned about the enclosing function.
#[derive(Debug, Default)]
pub struct FuncWalkResult {
    pub return_types: TypeSet,
    pub bare_return: bool,
    pub returns_value: bool,
    pub exit_flags: ExitFlags,
}

/// Parsed function docblock contents.
#[derive(Debug, Default)]
struct DocInfo {
    param_types: FxHashMap<String, TypeSet>,
    return_type: TypeSet,
    deprecated: bool,
    deprecation_note: String,
    lint_errors: Vec<String>,
    /// (found, suggested) pairs for phpdocType.
    type_suggestions: Vec<(String, String)>,
}

pub struct RootWalker<'a> {
    filename: String,
    source: &'a str,
    store: &'a MetadataStore,
    config: &'a LinterConfig,
    state: ClassParseState,
    meta: FileMeta,
    reports: Vec<Report>,
    // Matchers carry mutable state, so every file works on clones.
    rules_any: RuleSet,
    rules_local: RuleSet,
    custom_root: Vec<Box<dyn RootCheck>>,
    disabled: bool,
}

impl<'a> RootWalker<'a> {
    pub fn new(
        filename: &str,
        source: &'a str,
        store: &'a MetadataStore,
        config: &'a LinterConfig,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            source,
            store,
            config,
            state: ClassParseState::default(),
            meta: FileMeta::default(),
            reports: Vec::new(),
            rules_any: config.rules_any.clone_for_file(filename),
            rules_local: config.rules_local.clone_for_file(filename),
            custom_root: config.root_check_factories.iter().map(|f| f()).collect(),
            disabled: false,
        }
    }

    pub fn store(&self) -> &'a MetadataStore {
        self.store
    }

    pub fn state(&self) -> &ClassParseState {
        &self.state
    }

    pub fn into_meta(self) -> FileMeta {
        self.meta
    }

    pub fn into_reports(mut self) -> Vec<Report> {
        if self.disabled {
            for report in &mut self.reports {
                report.is_disabled = true;
            }
        }
        self.reports
    }

    /// Mark the file disabled when its leading docblock carries the
    /// disable marker.
    pub fn scan_disable_comment(&mut self, comments: &[civet_frontend::Comment]) {
        if let Some(first_doc) = comments.iter().find(|c| c.is_doc) {
            if first_doc.text.contains(IGNORE_LINTER_MESSAGE) {
                self.disabled = true;
            }
        }
    }

    pub(crate) fn make_block_checks(&self) -> Vec<Box<dyn BlockCheck>> {
        self.config.block_check_factories.iter().map(|f| f()).collect()
    }

    // ---- reporting ----

    pub fn report(&mut self, span: Span, level: Severity, check_name: &str, message: &str) {
        let (line, start_char, end_char, context_line) = locate(self.source, span);
        self.reports.push(Report {
            check_name: check_name.to_string(),
            level,
            filename: self.filename.clone(),
            line,
            start_char,
            end_char,
            context_line,
            message: message.to_string(),
            is_disabled: false,
        });
    }

    /// Keywords are case-insensitive in the analyzed language, but
    /// anything except lower case is reported.
    pub fn check_keyword_case(&mut self, span: Span, keyword: &str) {
        let Some(slice) = self.source.get(span.start..span.start + keyword.len()) else {
            return;
        };
        if slice != keyword && slice.eq_ignore_ascii_case(keyword) {
            let keyword_span = Span::new(span.start, span.start + keyword.len(), span.line, span.column);
            self.report(
                keyword_span,
                Severity::Warning,
                "keywordCase",
                &format!("Use {keyword} instead of {slice}"),
            );
        }
    }

    // ---- rules ----

    pub(crate) fn run_rules(&mut self, expr: &Expr, root_level: bool) {
        if !self.store.is_indexing_complete() {
            return;
        }
        let category = categorize_expr(expr);
        if category == crate::rules::NodeCategory::None {
            return;
        }
        let mut any = std::mem::take(&mut self.rules_any);
        self.run_rule_list(&mut any, category, expr);
        self.rules_any = any;
        if !root_level {
            let mut local = std::mem::take(&mut self.rules_local);
            self.run_rule_list(&mut local, category, expr);
            self.rules_local = local;
        }
    }

    pub(crate) fn run_rules_stmt(&mut self, stmt: &Stmt, root_level: bool) {
        if !self.store.is_indexing_complete() {
            return;
        }
        let category = categorize_stmt(stmt);
        if category == crate::rules::NodeCategory::None {
            return;
        }
        let mut any = std::mem::take(&mut self.rules_any);
        self.run_stmt_rule_list(&mut any, category, stmt);
        self.rules_any = any;
        if !root_level {
            let mut local = std::mem::take(&mut self.rules_local);
            self.run_stmt_rule_list(&mut local, category, stmt);
            self.rules_local = local;
        }
    }

    fn run_rule_list(&mut self, set: &mut RuleSet, category: crate::rules::NodeCategory, expr: &Expr) {
        for rule in set.rules_for_mut(category) {
            let Some(binds) = rule.matcher.match_node(expr, self.source) else {
                continue;
            };
            let binds = binds.clone();
            let message = rule.render_message(&binds, self.source);
            let level = rule.level;
            let name = rule.name.clone();
            self.report(expr.span, level, &name, &message);
        }
    }

    fn run_stmt_rule_list(
        &mut self,
        set: &mut RuleSet,
        category: crate::rules::NodeCategory,
        stmt: &Stmt,
    ) {
        for rule in set.rules_for_mut(category) {
            let Some(binds) = rule.matcher.match_stmt(stmt, self.source) else {
                continue;
            };
            let binds = binds.clone();
            let message = rule.render_message(&binds, self.source);
            let level = rule.level;
            let name = rule.name.clone();
            self.report(stmt.span, level, &name, &message);
        }
    }

    // ---- shared name/type helpers ----

    pub(crate) fn resolve_class_ref(&self, class: &ClassRef) -> Option<String> {
        match class {
            ClassRef::Name(name) => resolve_class_name(&self.state, name),
            ClassRef::Dynamic(_) => None,
        }
    }

    fn fqn(&self, name: &str) -> String {
        format!("{}\\{}", self.state.namespace, name)
    }

    /// Parse a docblock/type-hint type string and qualify its class
    /// tokens against the current namespace and aliases.
    pub(crate) fn qualified_type_string(&self, text: &str) -> TypeSet {
        self.qualify_type_set(parse_type_string(text))
    }

    fn qualify_type_set(&self, set: TypeSet) -> TypeSet {
        set.iter().cloned().map(|t| self.qualify_type(t)).collect()
    }

    fn qualify_type(&self, typ: Type) -> Type {
        match typ {
            Type::Class(name) if !name.starts_with('\\') => {
                let parsed = Name {
                    parts: name.split('\\').map(str::to_string).collect(),
                    fully_qualified: false,
                };
                match resolve_class_name(&self.state, &parsed) {
                    Some(fqn) => Type::Class(fqn),
                    None => Type::Class(name),
                }
            }
            Type::ArrayOf(inner) => Type::ArrayOf(Box::new(self.qualify_type(*inner))),
            other => other,
        }
    }

    fn hint_type_set(&self, hint: Option<&Name>) -> TypeSet {
        match hint {
            None => TypeSet::new(),
            Some(name) => {
                let text = if name.fully_qualified {
                    format!("\\{}", name.join())
                } else {
                    name.join()
                };
                self.qualified_type_string(&text)
            }
        }
    }

    // ---- pass 1: indexing ----

    pub fn index(&mut self, program: &Program) {
        for stmt in &program.stmts {
            self.index_stmt(stmt);
        }
    }

    fn index_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Namespace { name } => {
                self.state.namespace = match name {
                    Some(name) => format!("\\{}", name.join()),
                    None => String::new(),
                };
            }
            StmtKind::Use {
                path,
                alias,
                is_function,
            } => {
                let target = format!("\\{}", path.join());
                let key = alias
                    .clone()
                    .or_else(|| path.parts.last().cloned())
                    .unwrap_or_default();
                if *is_function {
                    self.state.function_uses.insert(key, target);
                } else {
                    self.state.uses.insert(key, target);
                }
            }
            StmtKind::Function(decl) => {
                let fqn = self.fqn(&decl.name);
                let info = self.func_info(decl, false);
                self.meta.functions.insert(fqn, info);
            }
            StmtKind::Class(decl) => self.index_class(decl),
            StmtKind::ConstList(consts) => {
                for def in consts {
                    let fqn = self.fqn(&def.name);
                    let typ = self.const_expr_type(&def.value);
                    self.meta.constants.insert(fqn, ConstantInfo { typ });
                }
            }
            // Top-level assignments contribute to the global scope.
            StmtKind::Expr(expr) => {
                if let ExprKind::Assign { op: _, target, value } = &expr.kind {
                    if let ExprKind::Var(name) = &target.kind {
                        let typ = self.const_expr_type(value);
                        let scope = self.meta.scope.get_or_insert_with(Scope::new);
                        scope.add_var(name, typ, "global", true);
                    }
                }
            }
            // Declarations may hide under conditions and blocks.
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.index_stmt(stmt);
                }
            }
            StmtKind::If(if_stmt) => {
                for stmt in &if_stmt.then {
                    self.index_stmt(stmt);
                }
                for elseif in &if_stmt.elseifs {
                    for stmt in &elseif.body {
                        self.index_stmt(stmt);
                    }
                }
                if let Some(body) = &if_stmt.otherwise {
                    for stmt in body {
                        self.index_stmt(stmt);
                    }
                }
            }
            StmtKind::Try(try_stmt) => {
                for stmt in &try_stmt.body {
                    self.index_stmt(stmt);
                }
            }
            _ => {}
        }
    }

    fn index_class(&mut self, decl: &ClassDecl) {
        let fqn = self.fqn(&decl.name);

        let saved_class = std::mem::replace(&mut self.state.current_class, fqn.clone());
        let saved_trait = self.state.is_trait;
        self.state.is_trait = decl.kind == ClassKind::Trait;

        let parent = decl
            .extends
            .as_ref()
            .and_then(|name| resolve_class_name(&self.state, name));
        self.state.current_parent_class = parent.clone().unwrap_or_default();

        let mut info = ClassInfo {
            parent,
            interfaces: decl
                .implements
                .iter()
                .filter_map(|name| resolve_class_name(&self.state, name))
                .collect(),
            traits: decl
                .trait_uses
                .iter()
                .filter_map(|name| resolve_class_name(&self.state, name))
                .collect(),
            is_abstract: decl.is_abstract,
            is_interface: decl.kind == ClassKind::Interface,
            is_trait: decl.kind == ClassKind::Trait,
            ..Default::default()
        };

        for constant in &decl.consts {
            info.constants.insert(
                constant.name.clone(),
                ConstInfo {
                    typ: self.const_expr_type(&constant.value),
                    access: access_level(constant.visibility),
                },
            );
        }

        for property in &decl.properties {
            let key = if property.is_static {
                format!("${}", property.name)
            } else {
                property.name.clone()
            };
            let typ = property
                .doc
                .as_ref()
                .and_then(|doc| {
                    docblock::parse(&doc.text)
                        .into_iter()
                        .find(|tag| tag.name == "var")
                        .and_then(|tag| tag.params.first().cloned())
                })
                .map(|text| self.qualified_type_string(&text))
                .unwrap_or_default();
            info.properties.insert(
                key,
                PropertyInfo {
                    typ,
                    access: access_level(property.visibility),
                },
            );
        }

        for method in &decl.methods {
            info.methods
                .insert(method.name.clone(), self.func_info(method, true));
        }

        self.state.current_class = saved_class;
        self.state.current_parent_class = String::new();
        self.state.is_trait = saved_trait;

        if decl.kind == ClassKind::Trait {
            self.meta.traits.insert(fqn, info);
        } else {
            self.meta.classes.insert(fqn, info);
        }
    }

    /// Build a FuncInfo for indexing. The body is walked (reports
    /// discarded with the rest of pass 1) to infer the return type
    /// and the always-exits flags.
    fn func_info(&mut self, decl: &FuncDecl, is_method: bool) -> FuncInfo {
        let doc = self.parse_func_doc(decl);

        let func_params = self.func_params(decl, &doc);
        let params: Vec<ParamInfo> = decl
            .params
            .iter()
            .zip(&func_params)
            .map(|(p, fp)| ParamInfo {
                name: p.name.clone(),
                typ: fp.typ.clone(),
                by_ref: p.by_ref,
                variadic: p.variadic,
            })
            .collect();
        let min_params = decl
            .params
            .iter()
            .filter(|p| p.default.is_none() && !p.variadic)
            .count();

        let mut typ = doc.return_type.clone();
        let mut exit_flags = ExitFlags::empty();
        if let Some(body) = &decl.body {
            let mut scope = Scope::new();
            if is_method && !decl.is_static {
                scope.set_in_instance_method(true);
                scope.add_var(
                    "this",
                    TypeSet::of(Type::Class(self.state.current_class.clone())),
                    "instance method",
                    true,
                );
            }
            let walk = self.handle_func_stmts(&func_params, &[], body, scope);
            if typ.is_empty() {
                typ = walk.return_types;
                if typ.is_empty() && walk.returns_value {
                    // A value comes back but we could not pin it down.
                    typ = TypeSet::mixed();
                }
            }
            if walk.bare_return && walk.returns_value {
                typ = typ.append_type(Type::Null);
            }
            // Only the flags that escape the function matter to
            // callers; returning normally is not an "exit".
            exit_flags = walk
                .exit_flags
                .without(ExitFlags::RETURN | ExitFlags::BREAK | ExitFlags::CONTINUE);
        }

        FuncInfo {
            params,
            min_params,
            typ,
            access: access_level(decl.visibility),
            is_static: decl.is_static,
            is_abstract: decl.is_abstract,
            exit_flags,
            doc: FuncDoc {
                deprecated: doc.deprecated,
                deprecation_note: doc.deprecation_note.clone(),
            },
        }
    }

    /// Constant-expression typing for defaults and const values; no
    /// scope is in effect.
    fn const_expr_type(&self, expr: &Expr) -> TypeSet {
        let scope = Scope::new();
        civet_solver::expr_type(&scope, &self.state, self.store, expr)
    }

    // ---- docblocks ----

    fn parse_func_doc(&mut self, decl: &FuncDecl) -> DocInfo {
        let mut info = DocInfo::default();
        let Some(doc) = &decl.doc else {
            return info;
        };
        for tag in docblock::parse(&doc.text) {
            match tag.name.as_str() {
                "param" => {
                    if tag.params.len() < 2 {
                        info.lint_errors
                            .push(format!("malformed @param in '{}'", tag.rest));
                        continue;
                    }
                    let (mut typ, mut name) = (tag.params[0].clone(), tag.params[1].clone());
                    // Accept the swapped `@param $name Type` order.
                    if typ.starts_with('$') && !name.starts_with('$') {
                        std::mem::swap(&mut typ, &mut name);
                    }
                    let Some(name) = name.strip_prefix('$') else {
                        info.lint_errors
                            .push(format!("malformed @param in '{}'", tag.rest));
                        continue;
                    };
                    self.collect_type_suggestions(&typ, &mut info);
                    info.param_types
                        .insert(name.to_string(), self.qualified_type_string(&typ));
                }
                "return" => {
                    let Some(typ) = tag.params.first() else {
                        info.lint_errors.push("malformed @return".to_string());
                        continue;
                    };
                    self.collect_type_suggestions(typ, &mut info);
                    info.return_type = self.qualified_type_string(typ);
                }
                "deprecated" => {
                    info.deprecated = true;
                    info.deprecation_note = tag.rest.clone();
                }
                _ => {}
            }
        }
        info
    }

    fn collect_type_suggestions(&self, text: &str, info: &mut DocInfo) {
        for part in text.split('|') {
            let word = part.trim().trim_end_matches("[]");
            let suggested = match word.to_ascii_lowercase().as_str() {
                "integer" => "int",
                "boolean" => "bool",
                "double" | "real" => "float",
                _ => continue,
            };
            info.type_suggestions
                .push((word.to_string(), suggested.to_string()));
        }
    }

    fn report_doc_errors(&mut self, span: Span, doc: &DocInfo) {
        for error in &doc.lint_errors {
            self.report(span, Severity::Warning, "phpdocLint", error);
        }
        for (found, suggested) in &doc.type_suggestions {
            self.report(
                span,
                Severity::DoNotReject,
                "phpdocType",
                &format!("Use {suggested} type instead of {found}"),
            );
        }
    }

    // ---- pass 2: analysis ----

    pub fn analyze(&mut self, program: &Program) {
        let filename = self.filename.clone();
        for check in &mut self.custom_root {
            check.before_file(&filename);
        }

        for stmt in &program.stmts {
            self.analyze_stmt(stmt);
        }
        self.analyze_root_level(program);

        for check in &mut self.custom_root {
            check.after_leave_file(&filename);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Namespace { name } => {
                self.state.namespace = match name {
                    Some(name) => format!("\\{}", name.join()),
                    None => String::new(),
                };
            }
            StmtKind::Use {
                path,
                alias,
                is_function,
            } => {
                let target = format!("\\{}", path.join());
                let key = alias
                    .clone()
                    .or_else(|| path.parts.last().cloned())
                    .unwrap_or_default();
                if *is_function {
                    self.state.function_uses.insert(key, target);
                } else {
                    self.state.uses.insert(key, target);
                }
            }
            StmtKind::Function(decl) => self.enter_function(decl),
            StmtKind::Class(decl) => self.analyze_class(decl),
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.analyze_stmt(stmt);
                }
            }
            StmtKind::If(if_stmt) => {
                for stmt in &if_stmt.then {
                    self.analyze_stmt(stmt);
                }
                for elseif in &if_stmt.elseifs {
                    for stmt in &elseif.body {
                        self.analyze_stmt(stmt);
                    }
                }
                if let Some(body) = &if_stmt.otherwise {
                    for stmt in body {
                        self.analyze_stmt(stmt);
                    }
                }
            }
            StmtKind::Try(try_stmt) => {
                for stmt in &try_stmt.body {
                    self.analyze_stmt(stmt);
                }
            }
            _ => {}
        }
    }

    fn analyze_class(&mut self, decl: &ClassDecl) {
        let fqn = self.fqn(&decl.name);
        let saved_class = std::mem::replace(&mut self.state.current_class, fqn);
        let saved_parent = std::mem::take(&mut self.state.current_parent_class);
        let saved_trait = self.state.is_trait;

        self.state.is_trait = decl.kind == ClassKind::Trait;
        self.state.current_parent_class = decl
            .extends
            .as_ref()
            .and_then(|name| resolve_class_name(&self.state, name))
            .unwrap_or_default();

        for method in &decl.methods {
            if method.body.is_some() {
                self.enter_method(method);
            }
        }

        self.state.current_class = saved_class;
        self.state.current_parent_class = saved_parent;
        self.state.is_trait = saved_trait;
    }

    /// Analyze one free function body.
    pub(crate) fn enter_function(&mut self, decl: &FuncDecl) {
        let doc = self.parse_func_doc(decl);
        self.report_doc_errors(decl.span, &doc);
        let params = self.func_params(decl, &doc);
        let Some(body) = &decl.body else {
            return;
        };
        self.handle_func_stmts(&params, &[], body, Scope::new());
    }

    fn enter_method(&mut self, decl: &FuncDecl) {
        let doc = self.parse_func_doc(decl);
        self.report_doc_errors(decl.span, &doc);
        let params = self.func_params(decl, &doc);
        let Some(body) = &decl.body else {
            return;
        };

        let mut scope = Scope::new();
        if !decl.is_static {
            scope.set_in_instance_method(true);
            scope.add_var(
                "this",
                TypeSet::of(Type::Class(self.state.current_class.clone())),
                "instance method",
                true,
            );
        }
        self.handle_func_stmts(&params, &[], body, scope);
    }

    fn func_params(&self, decl: &FuncDecl, doc: &DocInfo) -> Vec<FuncParam> {
        decl.params
            .iter()
            .map(|p| {
                let mut param = self.func_param(p);
                if let Some(doc_typ) = doc.param_types.get(&p.name) {
                    param.typ = param.typ.append(doc_typ);
                }
                param
            })
            .collect()
    }

    pub(crate) fn func_param(&self, p: &Param) -> FuncParam {
        FuncParam {
            name: p.name.clone(),
            typ: self.hint_type_set(p.hint.as_ref()),
            by_ref: p.by_ref,
        }
    }

    /// Walk a function-ish body: seed the scope with parameters, run
    /// a block walker over the statements, flush unused variables.
    /// The returned summary feeds return-type inference in pass 1.
    pub(crate) fn handle_func_stmts(
        &mut self,
        params: &[FuncParam],
        extra_non_locals: &[String],
        stmts: &[Stmt],
        mut scope: Scope,
    ) -> FuncWalkResult {
        for param in params {
            scope.add_var(&param.name, param.typ.clone(), "param", true);
        }
        let ctx = BlockContext::with_scope(scope);
        let mut walker = BlockWalker::new(self, ctx);
        for param in params {
            if param.by_ref {
                walker.add_non_local_var(&param.name);
            }
        }
        for name in extra_non_locals {
            walker.add_non_local_var(name);
        }
        walker.walk_block(stmts);
        walker.flush_unused();
        FuncWalkResult {
            return_types: std::mem::take(&mut walker.return_types),
            bare_return: walker.bare_return,
            returns_value: walker.returns_value,
            exit_flags: walker.ctx.exit_flags,
        }
    }

    /// Root-level analysis: walk top-level statements with function
    /// bodies ignored (they were dispatched above).
    fn analyze_root_level(&mut self, program: &Program) {
        let mut scope = Scope::new();
        scope.add_var("argv", parse_type_string("string[]"), "predefined", true);
        scope.add_var("argc", TypeSet::of(Type::Int), "predefined", true);

        let ctx = BlockContext::with_scope(scope);
        let mut walker = BlockWalker::new(self, ctx);
        walker.ignore_function_bodies = true;
        walker.root_level = true;
        walker.walk_block(&program.stmts);
    }
}

fn access_level(visibility: Visibility) -> AccessLevel {
    match visibility {
        Visibility::Public => AccessLevel::Public,
        Visibility::Protected => AccessLevel::Protected,
        Visibility::Private => AccessLevel::Private,
    }
}
