// custom.rs
//
// Extension hooks. Third-party checks register factories on the
// linter configuration; a fresh checker instance is created for each
// file so checkers may keep per-file state without synchronization.

use civet_frontend::{Expr, Stmt};

/// A statement or expression, for hooks that observe both.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Hooks around the block walker's enter/leave protocol.
#[allow(unused_variables)]
pub trait BlockCheck {
    fn before_enter(&mut self, node: NodeRef<'_>) {}
    fn after_enter(&mut self, node: NodeRef<'_>) {}
    fn before_leave(&mut self, node: NodeRef<'_>) {}
    fn after_leave(&mut self, node: NodeRef<'_>) {}
}

/// Hooks at the file level.
#[allow(unused_variables)]
pub trait RootCheck {
    fn before_file(&mut self, filename: &str) {}
    fn after_leave_file(&mut self, filename: &str) {}
}

pub type BlockCheckFactory = Box<dyn Fn() -> Box<dyn BlockCheck> + Send + Sync>;
pub type RootCheckFactory = Box<dyn Fn() -> Box<dyn RootCheck> + Send + Sync>;
