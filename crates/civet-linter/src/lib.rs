// lib.rs
//! The analyzer core: a root walker that indexes files (pass 1) and
//! dispatches block walkers over function bodies (pass 2), plus the
//! report types, pattern rules and custom-check hooks.

pub mod block;
pub mod context;
pub mod custom;
pub mod report;
pub mod root;
pub mod rules;

pub use block::BlockWalker;
pub use context::{BlockContext, LoopKind};
pub use custom::{BlockCheck, BlockCheckFactory, NodeRef, RootCheck, RootCheckFactory};
pub use report::{all_checks, CheckInfo, Report, Severity};
pub use root::RootWalker;
pub use rules::{Matcher, NodeCategory, Rule, RuleError, RuleSet};

use civet_frontend::Parser;
use civet_meta::{FileMeta, FuncOverride, MetadataStore, OverrideKind};

/// Linter-wide configuration shared by all workers. Rule matchers are
/// cloned per file; custom checks are created per file from the
/// registered factories.
#[derive(Default)]
pub struct LinterConfig {
    pub rules_any: RuleSet,
    /// Rules that do not apply to root-level code.
    pub rules_local: RuleSet,
    pub block_check_factories: Vec<BlockCheckFactory>,
    pub root_check_factories: Vec<RootCheckFactory>,
}

/// Pass 1: parse and collect one file's contribution to the metadata
/// store. Parse errors are tolerated; whatever was recognized is
/// still indexed.
pub fn index_file(
    store: &MetadataStore,
    config: &LinterConfig,
    filename: &str,
    contents: &str,
) -> FileMeta {
    let out = Parser::new(contents).parse_program();
    let mut walker = RootWalker::new(filename, contents, store, config);
    walker.index(&out.program);
    let meta = walker.into_meta();
    tracing::trace!(
        file = filename,
        classes = meta.classes.len(),
        functions = meta.functions.len(),
        "indexed"
    );
    meta
}

/// Pass 2: parse and analyze one file, returning its reports in
/// traversal order. Parser errors surface as `syntax` reports but do
/// not abort the walk.
pub fn lint_file(
    store: &MetadataStore,
    config: &LinterConfig,
    filename: &str,
    contents: &str,
) -> Vec<Report> {
    let out = Parser::new(contents).parse_program();
    let mut walker = RootWalker::new(filename, contents, store, config);
    walker.scan_disable_comment(&out.comments);
    walker.analyze(&out.program);
    for error in &out.errors {
        let offset = error.offset().min(contents.len());
        let line = contents[..offset].bytes().filter(|&b| b == b'\n').count() as u32 + 1;
        let span = civet_frontend::Span::new(offset, offset + 1, line, 1);
        walker.report(
            span,
            Severity::Error,
            "syntax",
            &format!("Syntax error: {error}"),
        );
    }
    let reports = walker.into_reports();
    tracing::trace!(file = filename, reports = reports.len(), "analyzed");
    reports
}

/// Return-type overrides for builtins whose result type depends on an
/// argument. Registered by the driver as a synthetic file so the
/// solver can consult them next to regular stub metadata.
pub fn builtin_function_overrides() -> FileMeta {
    let mut meta = FileMeta::default();
    let elem = |n| FuncOverride {
        kind: OverrideKind::ElemType,
        arg_num: n,
    };
    let arg = |n| FuncOverride {
        kind: OverrideKind::ArgType,
        arg_num: n,
    };
    for name in ["array_pop", "array_shift", "current", "end", "reset"] {
        meta.function_overrides.insert(format!("\\{name}"), elem(0));
    }
    for name in ["array_slice", "array_filter", "array_reverse", "array_unique"] {
        meta.function_overrides.insert(format!("\\{name}"), arg(0));
    }
    meta
}
