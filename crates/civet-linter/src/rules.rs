// rules.rs
//
// Externally supplied pattern rules. A pattern is written in the
// analyzed language and may be an expression (`sleep($n)`) or a
// single statement (`echo ${"s:str"};`). Variables act as
// meta-variables: `$x` binds any expression (repeats must match
// equal text) and `${"name:class"}` constrains the match to a node
// class. In statement patterns an empty `{}` body is a wildcard
// matching any body. Matchers carry per-match state and are cloned
// per file.

use civet_frontend::{
    Arg, ArrayItem, ClassRef, Expr, ExprKind, Name, Parser, Span, Stmt, StmtKind,
};
use rustc_hash::FxHashMap;

use crate::report::Severity;

/// Coarse node classification used to index rules; a rule is only
/// tried against nodes of its root pattern's category. Expression
/// and statement nodes get disjoint categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    None,
    // Expressions.
    Var,
    Literal,
    ConstFetch,
    Array,
    Index,
    Member,
    Call,
    New,
    Isset,
    Cast,
    Unary,
    Binary,
    Assign,
    Ternary,
    // Statements.
    If,
    Loop,
    Switch,
    Try,
    Return,
    Throw,
    Echo,
    Global,
    Unset,
    Jump,
}

pub fn categorize_expr(expr: &Expr) -> NodeCategory {
    match &expr.kind {
        ExprKind::Var(_) | ExprKind::VarVar(_) => NodeCategory::Var,
        ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Str(_) => NodeCategory::Literal,
        ExprKind::ConstFetch(_) | ExprKind::ClassConst { .. } => NodeCategory::ConstFetch,
        ExprKind::Array { .. } | ExprKind::List { .. } => NodeCategory::Array,
        ExprKind::Index { .. } => NodeCategory::Index,
        ExprKind::Prop { .. } | ExprKind::StaticProp { .. } => NodeCategory::Member,
        ExprKind::FuncCall { .. } | ExprKind::MethodCall { .. } | ExprKind::StaticCall { .. } => {
            NodeCategory::Call
        }
        ExprKind::New { .. } | ExprKind::Clone(_) => NodeCategory::New,
        ExprKind::Isset(_) | ExprKind::Empty(_) => NodeCategory::Isset,
        ExprKind::Cast { .. } => NodeCategory::Cast,
        ExprKind::Unary { .. } => NodeCategory::Unary,
        ExprKind::Binary { .. } | ExprKind::InstanceOf { .. } => NodeCategory::Binary,
        ExprKind::Assign { .. } => NodeCategory::Assign,
        ExprKind::Ternary { .. } => NodeCategory::Ternary,
        ExprKind::Exit(_) | ExprKind::Closure(_) => NodeCategory::None,
    }
}

/// Expression statements categorize as None here: their inner
/// expression is already visited (and rule-matched) on its own.
pub fn categorize_stmt(stmt: &Stmt) -> NodeCategory {
    match &stmt.kind {
        StmtKind::If(_) => NodeCategory::If,
        StmtKind::While { .. }
        | StmtKind::DoWhile { .. }
        | StmtKind::For { .. }
        | StmtKind::Foreach(_) => NodeCategory::Loop,
        StmtKind::Switch { .. } => NodeCategory::Switch,
        StmtKind::Try(_) => NodeCategory::Try,
        StmtKind::Return { .. } => NodeCategory::Return,
        StmtKind::Throw { .. } => NodeCategory::Throw,
        StmtKind::Echo { .. } => NodeCategory::Echo,
        StmtKind::Global { .. } => NodeCategory::Global,
        StmtKind::Unset { .. } => NodeCategory::Unset,
        StmtKind::Break { .. } | StmtKind::Continue { .. } => NodeCategory::Jump,
        _ => NodeCategory::None,
    }
}

/// Node classes available to `${"name:class"}` meta-variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaClass {
    Var,
    Int,
    Float,
    Str,
    Num,
    Expr,
    Const,
    Func,
}

impl MetaClass {
    fn parse(text: &str) -> Option<MetaClass> {
        Some(match text {
            "var" => MetaClass::Var,
            "int" => MetaClass::Int,
            "float" => MetaClass::Float,
            "str" => MetaClass::Str,
            "num" => MetaClass::Num,
            "expr" => MetaClass::Expr,
            "const" => MetaClass::Const,
            "func" => MetaClass::Func,
            _ => return None,
        })
    }

    fn admits(self, node: &Expr) -> bool {
        match self {
            MetaClass::Var => matches!(node.kind, ExprKind::Var(_) | ExprKind::VarVar(_)),
            MetaClass::Int => matches!(node.kind, ExprKind::Int(_)),
            MetaClass::Float => matches!(node.kind, ExprKind::Float(_)),
            MetaClass::Str => matches!(node.kind, ExprKind::Str(_)),
            MetaClass::Num => matches!(node.kind, ExprKind::Int(_) | ExprKind::Float(_)),
            MetaClass::Expr => true,
            MetaClass::Const => matches!(
                node.kind,
                ExprKind::ConstFetch(_) | ExprKind::ClassConst { .. }
            ),
            MetaClass::Func => matches!(
                node.kind,
                ExprKind::FuncCall { .. }
                    | ExprKind::MethodCall { .. }
                    | ExprKind::StaticCall { .. }
            ),
        }
    }
}

#[derive(Debug)]
pub enum RuleError {
    BadPattern(String),
    BadSeverity(String),
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::BadPattern(text) => write!(f, "bad rule pattern: {text}"),
            RuleError::BadSeverity(text) => write!(f, "bad rule severity: {text}"),
        }
    }
}

impl std::error::Error for RuleError {}

/// Root of a compiled pattern: what kind of node it can match.
#[derive(Debug, Clone)]
enum PatternRoot {
    Expr(Expr),
    Stmt(Box<Stmt>),
}

/// A compiled pattern. `binds` is scratch state reused between match
/// attempts, which is why matchers are cloned per worker.
#[derive(Debug, Clone)]
pub struct Matcher {
    root: PatternRoot,
    binds: FxHashMap<String, Span>,
}

impl Matcher {
    /// Compile a pattern. Expression form is tried first; anything
    /// that only parses as a statement (`echo $x;`, `if (...) {}`)
    /// becomes a statement pattern.
    pub fn compile(pattern: &str) -> Result<Matcher, RuleError> {
        if let Ok(expr) = Parser::new(pattern).parse_single_expr() {
            return Ok(Matcher {
                root: PatternRoot::Expr(expr),
                binds: FxHashMap::default(),
            });
        }
        let out = Parser::new(pattern).parse_program();
        if out.errors.is_empty() && out.program.stmts.len() == 1 {
            let stmt = out.program.stmts.into_iter().next().expect("len checked");
            return Ok(Matcher {
                root: PatternRoot::Stmt(Box::new(stmt)),
                binds: FxHashMap::default(),
            });
        }
        Err(RuleError::BadPattern(pattern.to_string()))
    }

    pub fn category(&self) -> NodeCategory {
        match &self.root {
            PatternRoot::Expr(expr) => categorize_expr(expr),
            PatternRoot::Stmt(stmt) => categorize_stmt(stmt),
        }
    }

    /// Try to match an expression node; on success returns the
    /// meta-variable bindings (name -> matched source span).
    /// Statement patterns never match here.
    pub fn match_node(&mut self, node: &Expr, source: &str) -> Option<&FxHashMap<String, Span>> {
        let PatternRoot::Expr(pat) = &self.root else {
            return None;
        };
        self.binds.clear();
        if match_expr(pat, node, source, &mut self.binds) {
            Some(&self.binds)
        } else {
            None
        }
    }

    /// Try to match a statement node. Expression patterns never
    /// match here.
    pub fn match_stmt(&mut self, node: &Stmt, source: &str) -> Option<&FxHashMap<String, Span>> {
        let PatternRoot::Stmt(pat) = &self.root else {
            return None;
        };
        self.binds.clear();
        if match_stmt(pat, node, source, &mut self.binds) {
            Some(&self.binds)
        } else {
            None
        }
    }
}

fn snippet<'s>(source: &'s str, span: Span) -> &'s str {
    source.get(span.start..span.end).unwrap_or("")
}

fn bind(
    name: &str,
    node: &Expr,
    source: &str,
    binds: &mut FxHashMap<String, Span>,
) -> bool {
    if name == "_" {
        return true;
    }
    if let Some(&prev) = binds.get(name) {
        // A repeated meta-variable must match the same text.
        return snippet(source, prev) == snippet(source, node.span);
    }
    binds.insert(name.to_string(), node.span);
    true
}

fn match_expr(
    pat: &Expr,
    node: &Expr,
    source: &str,
    binds: &mut FxHashMap<String, Span>,
) -> bool {
    // Meta-variables first.
    match &pat.kind {
        ExprKind::Var(name) => return bind(name, node, source, binds),
        ExprKind::VarVar(inner) => {
            if let ExprKind::Str(spec) = &inner.kind {
                let (name, class) = match spec.split_once(':') {
                    Some((name, class)) => (name, class),
                    None => ("_", spec.as_str()),
                };
                if let Some(class) = MetaClass::parse(class) {
                    return class.admits(node) && bind(name, node, source, binds);
                }
            }
        }
        _ => {}
    }

    match (&pat.kind, &node.kind) {
        (ExprKind::Int(a), ExprKind::Int(b)) => a == b,
        (ExprKind::Float(a), ExprKind::Float(b)) => a == b,
        (ExprKind::Str(a), ExprKind::Str(b)) => a == b,
        (ExprKind::ConstFetch(a), ExprKind::ConstFetch(b)) => name_eq(a, b),
        (
            ExprKind::Array {
                items: pat_items, ..
            },
            ExprKind::Array { items, .. },
        ) => match_items(pat_items, items, source, binds),
        (
            ExprKind::Index {
                base: pat_base,
                index: pat_index,
            },
            ExprKind::Index { base, index },
        ) => {
            match_expr(pat_base, base, source, binds)
                && match (pat_index, index) {
                    (Some(p), Some(n)) => match_expr(p, n, source, binds),
                    (None, None) => true,
                    _ => false,
                }
        }
        (
            ExprKind::Prop {
                base: pat_base,
                name: pat_name,
                ..
            },
            ExprKind::Prop { base, name, .. },
        ) => pat_name == name && match_expr(pat_base, base, source, binds),
        (
            ExprKind::FuncCall {
                name: Some(pat_name),
                args: pat_args,
                ..
            },
            ExprKind::FuncCall {
                name: Some(name),
                args,
                ..
            },
        ) => name_eq(pat_name, name) && match_args(pat_args, args, source, binds),
        (
            ExprKind::MethodCall {
                base: pat_base,
                name: pat_name,
                args: pat_args,
                ..
            },
            ExprKind::MethodCall {
                base, name, args, ..
            },
        ) => {
            pat_name == name
                && match_expr(pat_base, base, source, binds)
                && match_args(pat_args, args, source, binds)
        }
        (
            ExprKind::StaticCall {
                class: pat_class,
                name: pat_name,
                args: pat_args,
                ..
            },
            ExprKind::StaticCall {
                class, name, args, ..
            },
        ) => {
            pat_name == name
                && class_ref_eq(pat_class, class)
                && match_args(pat_args, args, source, binds)
        }
        (
            ExprKind::New {
                class: pat_class,
                args: pat_args,
            },
            ExprKind::New { class, args },
        ) => class_ref_eq(pat_class, class) && match_args(pat_args, args, source, binds),
        (
            ExprKind::Cast {
                kind: pat_kind,
                expr: pat_expr,
            },
            ExprKind::Cast { kind, expr },
        ) => pat_kind == kind && match_expr(pat_expr, expr, source, binds),
        (
            ExprKind::Unary {
                op: pat_op,
                expr: pat_expr,
            },
            ExprKind::Unary { op, expr },
        ) => pat_op == op && match_expr(pat_expr, expr, source, binds),
        (
            ExprKind::Binary {
                op: pat_op,
                left: pat_left,
                right: pat_right,
            },
            ExprKind::Binary { op, left, right },
        ) => {
            pat_op == op
                && match_expr(pat_left, left, source, binds)
                && match_expr(pat_right, right, source, binds)
        }
        (
            ExprKind::Assign {
                op: pat_op,
                target: pat_target,
                value: pat_value,
            },
            ExprKind::Assign { op, target, value },
        ) => {
            pat_op == op
                && match_expr(pat_target, target, source, binds)
                && match_expr(pat_value, value, source, binds)
        }
        (ExprKind::Isset(pat_vars), ExprKind::Isset(vars)) => {
            pat_vars.len() == vars.len()
                && pat_vars
                    .iter()
                    .zip(vars)
                    .all(|(p, n)| match_expr(p, n, source, binds))
        }
        (ExprKind::Empty(pat_inner), ExprKind::Empty(inner)) => {
            match_expr(pat_inner, inner, source, binds)
        }
        _ => false,
    }
}

fn name_eq(a: &Name, b: &Name) -> bool {
    a.fully_qualified == b.fully_qualified && a.parts == b.parts
}

fn class_ref_eq(a: &ClassRef, b: &ClassRef) -> bool {
    match (a, b) {
        (ClassRef::Name(a), ClassRef::Name(b)) => name_eq(a, b),
        _ => false,
    }
}

fn match_args(
    pat: &[Arg],
    args: &[Arg],
    source: &str,
    binds: &mut FxHashMap<String, Span>,
) -> bool {
    pat.len() == args.len()
        && pat
            .iter()
            .zip(args)
            .all(|(p, a)| p.unpack == a.unpack && match_expr(&p.expr, &a.expr, source, binds))
}

fn match_items(
    pat: &[ArrayItem],
    items: &[ArrayItem],
    source: &str,
    binds: &mut FxHashMap<String, Span>,
) -> bool {
    if pat.len() != items.len() {
        return false;
    }
    pat.iter().zip(items).all(|(p, n)| {
        let keys = match (&p.key, &n.key) {
            (Some(pk), Some(nk)) => match_expr(pk, nk, source, binds),
            (None, None) => true,
            _ => false,
        };
        let values = match (&p.value, &n.value) {
            (Some(pv), Some(nv)) => match_expr(pv, nv, source, binds),
            (None, None) => true,
            _ => false,
        };
        keys && values
    })
}

fn match_stmt(
    pat: &Stmt,
    node: &Stmt,
    source: &str,
    binds: &mut FxHashMap<String, Span>,
) -> bool {
    match (&pat.kind, &node.kind) {
        (StmtKind::Expr(p), StmtKind::Expr(n)) => match_expr(p, n, source, binds),
        (StmtKind::Return { expr: p }, StmtKind::Return { expr: n }) => match (p, n) {
            (Some(p), Some(n)) => match_expr(p, n, source, binds),
            (None, None) => true,
            _ => false,
        },
        (StmtKind::Throw { expr: p }, StmtKind::Throw { expr: n }) => {
            match_expr(p, n, source, binds)
        }
        (StmtKind::Echo { exprs: p }, StmtKind::Echo { exprs: n })
        | (StmtKind::Global { vars: p }, StmtKind::Global { vars: n })
        | (StmtKind::Unset { vars: p }, StmtKind::Unset { vars: n }) => {
            p.len() == n.len()
                && p.iter()
                    .zip(n)
                    .all(|(p, n)| match_expr(p, n, source, binds))
        }
        (StmtKind::Break { level: p }, StmtKind::Break { level: n })
        | (StmtKind::Continue { level: p }, StmtKind::Continue { level: n }) => p == n,
        (StmtKind::If(p), StmtKind::If(n)) => {
            if !match_expr(&p.cond, &n.cond, source, binds) {
                return false;
            }
            if !match_block(&p.then, &n.then, source, binds) {
                return false;
            }
            if p.elseifs.len() != n.elseifs.len() {
                return false;
            }
            for (pe, ne) in p.elseifs.iter().zip(&n.elseifs) {
                if !match_expr(&pe.cond, &ne.cond, source, binds)
                    || !match_block(&pe.body, &ne.body, source, binds)
                {
                    return false;
                }
            }
            match (&p.otherwise, &n.otherwise) {
                (Some(p), Some(n)) => match_block(p, n, source, binds),
                (None, None) => true,
                _ => false,
            }
        }
        (
            StmtKind::While {
                cond: pc,
                body: pb,
            },
            StmtKind::While {
                cond: nc,
                body: nb,
            },
        )
        | (
            StmtKind::DoWhile {
                cond: pc,
                body: pb,
            },
            StmtKind::DoWhile {
                cond: nc,
                body: nb,
            },
        ) => match_expr(pc, nc, source, binds) && match_block(pb, nb, source, binds),
        (
            StmtKind::For {
                init: pi,
                cond: pc,
                step: ps,
                body: pb,
            },
            StmtKind::For {
                init: ni,
                cond: nc,
                step: ns,
                body: nb,
            },
        ) => {
            let lists = [(pi, ni), (pc, nc), (ps, ns)];
            lists.iter().all(|(p, n)| {
                p.len() == n.len()
                    && p.iter()
                        .zip(n.iter())
                        .all(|(p, n)| match_expr(p, n, source, binds))
            }) && match_block(pb, nb, source, binds)
        }
        (StmtKind::Foreach(p), StmtKind::Foreach(n)) => {
            if p.by_ref != n.by_ref {
                return false;
            }
            let keys = match (&p.key, &n.key) {
                (Some(p), Some(n)) => match_expr(p, n, source, binds),
                (None, None) => true,
                _ => false,
            };
            keys && match_expr(&p.expr, &n.expr, source, binds)
                && match_expr(&p.value, &n.value, source, binds)
                && match_block(&p.body, &n.body, source, binds)
        }
        (
            StmtKind::Switch {
                cond: pc,
                cases: pcases,
            },
            StmtKind::Switch {
                cond: nc,
                cases: ncases,
            },
        ) => {
            if !match_expr(pc, nc, source, binds) || pcases.len() != ncases.len() {
                return false;
            }
            pcases.iter().zip(ncases).all(|(p, n)| {
                let conds = match (&p.cond, &n.cond) {
                    (Some(p), Some(n)) => match_expr(p, n, source, binds),
                    (None, None) => true,
                    _ => false,
                };
                conds && match_block(&p.body, &n.body, source, binds)
            })
        }
        (StmtKind::Try(p), StmtKind::Try(n)) => {
            if !match_block(&p.body, &n.body, source, binds) || p.catches.len() != n.catches.len() {
                return false;
            }
            let catches = p.catches.iter().zip(&n.catches).all(|(p, n)| {
                p.types.len() == n.types.len()
                    && p.types.iter().zip(&n.types).all(|(p, n)| name_eq(p, n))
                    && match_block(&p.body, &n.body, source, binds)
            });
            let finally = match (&p.finally, &n.finally) {
                (Some(p), Some(n)) => match_block(p, n, source, binds),
                (None, None) => true,
                _ => false,
            };
            catches && finally
        }
        (StmtKind::Block(p), StmtKind::Block(n)) => match_block(p, n, source, binds),
        _ => false,
    }
}

/// An empty body in a statement pattern is a wildcard: it matches
/// any statement list. Non-empty bodies match element-wise.
fn match_block(
    pat: &[Stmt],
    nodes: &[Stmt],
    source: &str,
    binds: &mut FxHashMap<String, Span>,
) -> bool {
    if pat.is_empty() {
        return true;
    }
    pat.len() == nodes.len()
        && pat
            .iter()
            .zip(nodes)
            .all(|(p, n)| match_stmt(p, n, source, binds))
}

/// One externally supplied rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub level: Severity,
    pub message: String,
    /// Only applied to files whose path contains this substring
    /// (empty = all files).
    pub path_substr: String,
    pub matcher: Matcher,
}

impl Rule {
    pub fn new(
        name: &str,
        level: Severity,
        message: &str,
        pattern: &str,
    ) -> Result<Rule, RuleError> {
        Ok(Rule {
            name: name.to_string(),
            level,
            message: message.to_string(),
            path_substr: String::new(),
            matcher: Matcher::compile(pattern)?,
        })
    }

    /// Interpolate `%name%` placeholders from match bindings.
    pub fn render_message(&self, binds: &FxHashMap<String, Span>, source: &str) -> String {
        let mut message = self.message.clone();
        for (name, span) in binds {
            message = message.replace(&format!("%{name}%"), snippet(source, *span));
        }
        message
    }
}

/// Rules indexed by the category of their root pattern.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    by_category: FxHashMap<NodeCategory, Vec<Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn add(&mut self, rule: Rule) {
        self.by_category
            .entry(rule.matcher.category())
            .or_default()
            .push(rule);
    }

    pub fn rules_for_mut(&mut self, category: NodeCategory) -> &mut [Rule] {
        self.by_category
            .get_mut(&category)
            .map(|rules| rules.as_mut_slice())
            .unwrap_or(&mut [])
    }

    /// Clone for one worker/file, dropping rules whose path filter
    /// does not match. Matchers hold mutable state and must not be
    /// shared across workers.
    pub fn clone_for_file(&self, filename: &str) -> RuleSet {
        let mut out = RuleSet::new();
        for rules in self.by_category.values() {
            for rule in rules {
                if rule.path_substr.is_empty() || filename.contains(&rule.path_substr) {
                    out.add(rule.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expr {
        Parser::new(src).parse_single_expr().expect("expression")
    }

    fn stmt(src: &str) -> Stmt {
        let out = Parser::new(src).parse_program();
        assert!(out.errors.is_empty(), "parse errors: {:?}", out.errors);
        out.program.stmts.into_iter().next().expect("one statement")
    }

    #[test]
    fn literal_pattern_matches_exactly() {
        let mut matcher = Matcher::compile("in_array($needle, $haystack)").unwrap();
        let src = "in_array($x, $xs)";
        assert!(matcher.match_node(&expr(src), src).is_some());
        let other = "in_array($x, $xs, true)";
        assert!(matcher.match_node(&expr(other), other).is_none());
    }

    #[test]
    fn repeated_meta_var_requires_equal_text() {
        let mut matcher = Matcher::compile("$x == $x").unwrap();
        let same = "$a == $a";
        assert!(matcher.match_node(&expr(same), same).is_some());
        let diff = "$a == $b";
        assert!(matcher.match_node(&expr(diff), diff).is_none());
    }

    #[test]
    fn class_constrained_meta_var() {
        let mut matcher = Matcher::compile("sleep(${\"n:int\"})").unwrap();
        let lit = "sleep(5)";
        assert!(matcher.match_node(&expr(lit), lit).is_some());
        let var = "sleep($n)";
        assert!(matcher.match_node(&expr(var), var).is_none());
    }

    #[test]
    fn bindings_render_into_message() {
        let rule = Rule::new(
            "sleepLiteral",
            Severity::Warning,
            "sleeping for %n% seconds",
            "sleep(${\"n:int\"})",
        )
        .unwrap();
        let mut matcher = rule.matcher.clone();
        let src = "sleep(42)";
        let binds = matcher.match_node(&expr(src), src).unwrap().clone();
        assert_eq!(rule.render_message(&binds, src), "sleeping for 42 seconds");
    }

    #[test]
    fn statement_pattern_matches_echo() {
        let mut matcher = Matcher::compile("echo ${\"s:str\"};").unwrap();
        assert_eq!(matcher.category(), NodeCategory::Echo);
        let src = "echo 'hi';";
        assert!(matcher.match_stmt(&stmt(src), src).is_some());
        let other = "echo $x;";
        assert!(matcher.match_stmt(&stmt(other), other).is_none());
    }

    #[test]
    fn expression_patterns_never_match_statements() {
        let mut matcher = Matcher::compile("sleep($n)").unwrap();
        let src = "echo 'hi';";
        assert!(matcher.match_stmt(&stmt(src), src).is_none());
    }

    #[test]
    fn if_pattern_with_wildcard_body() {
        let mut matcher = Matcher::compile("if (${\"c:expr\"}) {}").unwrap();
        assert_eq!(matcher.category(), NodeCategory::If);
        let src = "if ($a > 1) { echo 1; echo 2; }";
        let binds = matcher.match_stmt(&stmt(src), src).unwrap();
        assert!(binds.contains_key("c"));
        // An else branch is not covered by the pattern.
        let with_else = "if ($a) { } else { }";
        assert!(matcher.match_stmt(&stmt(with_else), with_else).is_none());
    }

    #[test]
    fn non_empty_pattern_body_matches_element_wise() {
        let mut matcher = Matcher::compile("while ($x) { break; }").unwrap();
        assert_eq!(matcher.category(), NodeCategory::Loop);
        let src = "while ($go) { break; }";
        assert!(matcher.match_stmt(&stmt(src), src).is_some());
        let other = "while ($go) { continue; }";
        assert!(matcher.match_stmt(&stmt(other), other).is_none());
    }

    #[test]
    fn rules_are_indexed_by_category() {
        let mut set = RuleSet::new();
        set.add(Rule::new("a", Severity::Warning, "m", "f($x)").unwrap());
        assert_eq!(set.rules_for_mut(NodeCategory::Call).len(), 1);
        assert!(set.rules_for_mut(NodeCategory::Binary).is_empty());
    }

    #[test]
    fn clone_for_file_applies_path_filter() {
        let mut rule = Rule::new("a", Severity::Warning, "m", "f($x)").unwrap();
        rule.path_substr = "legacy/".into();
        let mut set = RuleSet::new();
        set.add(rule);
        assert!(set.clone_for_file("src/new.php").is_empty());
        assert!(!set.clone_for_file("src/legacy/old.php").is_empty());
    }
}
