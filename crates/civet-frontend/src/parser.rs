// parser.rs
//
// Recursive-descent parser with a Pratt expression core. Recovery is
// per-statement: a failed statement is recorded and the parser skips
// to the next statement boundary, so one syntax error does not hide
// the rest of the file from analysis.

use crate::ast::*;
use crate::errors::ParseError;
use crate::lexer::{Comment, LexOutput, Lexer};
use crate::span::Span;
use crate::token::{Token, TokenKind};

pub struct ParseOutput {
    pub program: Program,
    pub comments: Vec<Comment>,
    pub errors: Vec<ParseError>,
}

pub struct Parser {
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    comment_cursor: usize,
    pos: usize,
    errors: Vec<ParseError>,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(src: &str) -> Self {
        let LexOutput { tokens, comments } = Lexer::new(src).tokenize();
        Self {
            tokens,
            comments,
            comment_cursor: 0,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> ParseOutput {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            let before = self.pos;
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize(before);
                }
            }
        }
        ParseOutput {
            program: Program { stmts },
            comments: self.comments,
            errors: self.errors,
        }
    }

    /// Parse a single expression (used by the rule-pattern compiler).
    pub fn parse_single_expr(mut self) -> PResult<Expr> {
        let expr = self.parse_expr()?;
        Ok(expr)
    }

    // ---- token helpers ----

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn cur_span(&self) -> Span {
        self.peek().span
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.err_expected(what))
        }
    }

    fn err_expected(&self, what: &str) -> ParseError {
        let tok = self.peek();
        if matches!(tok.kind, TokenKind::Eof) {
            ParseError::UnexpectedEof {
                expected: what.to_string(),
                span: tok.span.into(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: format!("{:?}", tok.kind),
                span: tok.span.into(),
            }
        }
    }

    /// Skip tokens until a plausible statement boundary.
    fn synchronize(&mut self, before: usize) {
        if self.pos == before && !self.at_eof() {
            self.advance();
        }
        while !self.at_eof() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace
                | TokenKind::Fn
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Trait
                | TokenKind::If
                | TokenKind::Foreach
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::Try => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Comments that start before the current token and were not yet
    /// claimed by an earlier statement.
    fn take_leading_comments(&mut self) -> Vec<Comment> {
        let limit = self.cur_span().start;
        let mut out = Vec::new();
        while self.comment_cursor < self.comments.len()
            && self.comments[self.comment_cursor].span.start < limit
        {
            out.push(self.comments[self.comment_cursor].clone());
            self.comment_cursor += 1;
        }
        out
    }

    /// A contextual keyword that the lexer sees as an identifier (`as`).
    fn eat_contextual(&mut self, word: &str) -> bool {
        if let TokenKind::Ident(text) = self.peek_kind() {
            if text.eq_ignore_ascii_case(word) {
                self.advance();
                return true;
            }
        }
        false
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let leading = self.take_leading_comments();
        let start = self.cur_span();
        let mut kind = self.parse_stmt_kind()?;
        // Attach the nearest preceding docblock to declarations.
        let doc = leading.iter().rev().find(|c| c.is_doc).cloned();
        match &mut kind {
            StmtKind::Function(decl) => decl.doc = doc,
            StmtKind::Class(decl) => decl.doc = doc,
            _ => {}
        }
        Ok(Stmt {
            kind,
            span: start.merge(self.prev_span()),
            leading,
        })
    }

    fn parse_stmt_kind(&mut self) -> PResult<StmtKind> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(StmtKind::Nop)
            }
            TokenKind::LBrace => Ok(StmtKind::Block(self.parse_braced_block()?)),
            TokenKind::Namespace => self.parse_namespace(),
            TokenKind::Use => self.parse_use(),
            TokenKind::Const => self.parse_const_list(),
            TokenKind::Fn => {
                // `function name(...)` is a declaration; a nameless
                // `function (...)` is a closure expression statement.
                if matches!(self.peek_kind_at(1), TokenKind::Ident(_)) {
                    Ok(StmtKind::Function(self.parse_function()?))
                } else {
                    self.parse_expr_stmt()
                }
            }
            TokenKind::Abstract | TokenKind::Final | TokenKind::Class => {
                self.parse_class(ClassKind::Class)
            }
            TokenKind::Interface => self.parse_class(ClassKind::Interface),
            TokenKind::Trait => self.parse_class(ClassKind::Trait),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Break => {
                self.advance();
                let level = self.parse_opt_level();
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Break { level })
            }
            TokenKind::Continue => {
                self.advance();
                let level = self.parse_opt_level();
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Continue { level })
            }
            TokenKind::Return => {
                self.advance();
                let expr = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Return { expr })
            }
            TokenKind::Throw => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Throw { expr })
            }
            TokenKind::Try => self.parse_try(),
            TokenKind::Global => {
                self.advance();
                let mut vars = Vec::new();
                loop {
                    vars.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Global { vars })
            }
            TokenKind::Static if matches!(self.peek_kind_at(1), TokenKind::Variable(_)) => {
                self.parse_static_vars()
            }
            TokenKind::Echo => {
                self.advance();
                let mut exprs = Vec::new();
                loop {
                    exprs.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Echo { exprs })
            }
            TokenKind::Unset => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let mut vars = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        vars.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "')'")?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Unset { vars })
            }
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_expr_stmt(&mut self) -> PResult<StmtKind> {
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::Expr(expr))
    }

    fn parse_opt_level(&mut self) -> Option<i64> {
        if let TokenKind::Int(n) = *self.peek_kind() {
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn parse_namespace(&mut self) -> PResult<StmtKind> {
        self.advance();
        let name = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_name()?)
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::Namespace { name })
    }

    fn parse_use(&mut self) -> PResult<StmtKind> {
        self.advance();
        let is_function = self.eat(&TokenKind::Fn);
        let path = self.parse_name()?;
        let alias = if self.eat_contextual("as") {
            let tok = self.advance();
            match tok.kind {
                TokenKind::Ident(name) => Some(name),
                _ => return Err(self.err_expected("alias name")),
            }
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::Use {
            path,
            alias,
            is_function,
        })
    }

    fn parse_const_list(&mut self) -> PResult<StmtKind> {
        self.advance();
        let mut consts = Vec::new();
        loop {
            let start = self.cur_span();
            let name = self.expect_ident("constant name")?;
            self.expect(&TokenKind::Assign, "'='")?;
            let value = self.parse_expr()?;
            consts.push(ConstDef {
                name,
                value,
                span: start.merge(self.prev_span()),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::ConstList(consts))
    }

    fn expect_ident(&mut self, what: &str) -> PResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.err_expected(what)),
        }
    }

    fn parse_static_vars(&mut self) -> PResult<StmtKind> {
        self.advance(); // static
        let mut vars = Vec::new();
        loop {
            let start = self.cur_span();
            let name = match self.peek_kind().clone() {
                TokenKind::Variable(name) => {
                    self.advance();
                    name
                }
                _ => return Err(self.err_expected("variable")),
            };
            let default = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            vars.push(StaticVar {
                name,
                default,
                span: start.merge(self.prev_span()),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::StaticVars { vars })
    }

    /// A `{ ... }` block, or a single statement normalized to a
    /// one-element block (brace-less `if`/loop bodies).
    fn parse_body(&mut self) -> PResult<Block> {
        if self.check(&TokenKind::LBrace) {
            self.parse_braced_block()
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_braced_block(&mut self) -> PResult<Block> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let before = self.pos;
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize(before);
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')'")?;
        let then = self.parse_body()?;

        let mut elseifs = Vec::new();
        let mut otherwise = None;
        loop {
            if self.check(&TokenKind::Elseif) {
                let start = self.cur_span();
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let cond = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let body = self.parse_body()?;
                elseifs.push(ElseIf {
                    cond,
                    body,
                    span: start.merge(self.prev_span()),
                });
            } else if self.check(&TokenKind::Else) {
                // `else if` arrives as two tokens.
                if matches!(self.peek_kind_at(1), TokenKind::If) {
                    let start = self.cur_span();
                    self.advance();
                    self.advance();
                    self.expect(&TokenKind::LParen, "'('")?;
                    let cond = self.parse_expr()?;
                    self.expect(&TokenKind::RParen, "')'")?;
                    let body = self.parse_body()?;
                    elseifs.push(ElseIf {
                        cond,
                        body,
                        span: start.merge(self.prev_span()),
                    });
                } else {
                    self.advance();
                    otherwise = Some(self.parse_body()?);
                    break;
                }
            } else {
                break;
            }
        }

        Ok(StmtKind::If(IfStmt {
            cond,
            then,
            elseifs,
            otherwise,
        }))
    }

    fn parse_while(&mut self) -> PResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')'")?;
        let body = self.parse_body()?;
        Ok(StmtKind::While { cond, body })
    }

    fn parse_do_while(&mut self) -> PResult<StmtKind> {
        self.advance();
        let body = self.parse_body()?;
        self.expect(&TokenKind::While, "'while'")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')'")?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::DoWhile { body, cond })
    }

    fn parse_expr_list_until(&mut self, terminator: &TokenKind) -> PResult<Vec<Expr>> {
        let mut exprs = Vec::new();
        if !self.check(terminator) {
            loop {
                exprs.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(exprs)
    }

    fn parse_for(&mut self) -> PResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let init = self.parse_expr_list_until(&TokenKind::Semicolon)?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        let cond = self.parse_expr_list_until(&TokenKind::Semicolon)?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        let step = self.parse_expr_list_until(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen, "')'")?;
        let body = self.parse_body()?;
        Ok(StmtKind::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_foreach(&mut self) -> PResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let expr = self.parse_expr()?;
        if !self.eat_contextual("as") {
            return Err(self.err_expected("'as'"));
        }
        let mut by_ref = self.eat(&TokenKind::Amp);
        let first = self.parse_expr()?;
        let (key, value) = if self.eat(&TokenKind::DoubleArrow) {
            by_ref = self.eat(&TokenKind::Amp);
            let value = self.parse_expr()?;
            (Some(first), value)
        } else {
            (None, first)
        };
        self.expect(&TokenKind::RParen, "')'")?;
        let body = self.parse_body()?;
        Ok(StmtKind::Foreach(ForeachStmt {
            expr,
            key,
            by_ref,
            value,
            body,
        }))
    }

    fn parse_switch(&mut self) -> PResult<StmtKind> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')'")?;
        self.expect(&TokenKind::LBrace, "'{'")?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let leading = self.take_leading_comments();
            let start = self.cur_span();
            let cond = if self.eat(&TokenKind::Case) {
                let c = self.parse_expr()?;
                Some(c)
            } else if self.eat(&TokenKind::Default) {
                None
            } else {
                return Err(self.err_expected("'case' or 'default'"));
            };
            if !self.eat(&TokenKind::Colon) {
                self.expect(&TokenKind::Semicolon, "':' or ';'")?;
            }
            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                let before = self.pos;
                match self.parse_stmt() {
                    Ok(stmt) => body.push(stmt),
                    Err(err) => {
                        self.errors.push(err);
                        self.synchronize(before);
                    }
                }
            }
            cases.push(Case {
                cond,
                body,
                leading,
                span: start.merge(self.prev_span()),
            });
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(StmtKind::Switch { cond, cases })
    }

    fn parse_try(&mut self) -> PResult<StmtKind> {
        self.advance();
        let body = self.parse_braced_block()?;
        let mut catches = Vec::new();
        while self.check(&TokenKind::Catch) {
            let start = self.cur_span();
            self.advance();
            self.expect(&TokenKind::LParen, "'('")?;
            let mut types = vec![self.parse_name()?];
            while self.eat(&TokenKind::Pipe) {
                types.push(self.parse_name()?);
            }
            let var = match self.peek_kind().clone() {
                TokenKind::Variable(name) => {
                    self.advance();
                    name
                }
                _ => return Err(self.err_expected("catch variable")),
            };
            self.expect(&TokenKind::RParen, "')'")?;
            let body = self.parse_braced_block()?;
            catches.push(Catch {
                types,
                var,
                body,
                span: start.merge(self.prev_span()),
            });
        }
        let finally = if self.eat(&TokenKind::Finally) {
            Some(self.parse_braced_block()?)
        } else {
            None
        };
        Ok(StmtKind::Try(TryStmt {
            body,
            catches,
            finally,
        }))
    }

    // ---- declarations ----

    fn parse_function(&mut self) -> PResult<FuncDecl> {
        let start = self.cur_span();
        self.expect(&TokenKind::Fn, "'function'")?;
        self.eat(&TokenKind::Amp); // by-ref return, not tracked
        let name = self.expect_ident("function name")?;
        let params = self.parse_params()?;
        let body = Some(self.parse_braced_block()?);
        Ok(FuncDecl {
            name,
            params,
            body,
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            doc: None,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let start = self.cur_span();
        let hint = if matches!(self.peek_kind(), TokenKind::Ident(_) | TokenKind::Backslash) {
            Some(self.parse_name()?)
        } else if self.check(&TokenKind::Array) {
            self.advance();
            Some(Name::simple("array"))
        } else {
            None
        };
        let by_ref = self.eat(&TokenKind::Amp);
        let variadic = self.eat(&TokenKind::Ellipsis);
        let name = match self.peek_kind().clone() {
            TokenKind::Variable(name) => {
                self.advance();
                name
            }
            _ => return Err(self.err_expected("parameter")),
        };
        let default = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Param {
            name,
            hint,
            by_ref,
            variadic,
            default,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_class(&mut self, kind: ClassKind) -> PResult<StmtKind> {
        let start = self.cur_span();
        let mut is_abstract = false;
        loop {
            match self.peek_kind() {
                TokenKind::Abstract => {
                    is_abstract = true;
                    self.advance();
                }
                TokenKind::Final => {
                    self.advance();
                }
                _ => break,
            }
        }
        // class/interface/trait keyword
        self.advance();
        let name = self.expect_ident("type name")?;

        let extends = if self.eat(&TokenKind::Extends) {
            Some(self.parse_name()?)
        } else {
            None
        };
        let mut implements = Vec::new();
        if self.eat(&TokenKind::Implements) {
            loop {
                implements.push(self.parse_name()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut decl = ClassDecl {
            name,
            kind,
            is_abstract,
            extends,
            implements,
            trait_uses: Vec::new(),
            consts: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            doc: None,
            span: start,
        };
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let before = self.pos;
            if let Err(err) = self.parse_member(&mut decl) {
                self.errors.push(err);
                self.synchronize(before);
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        decl.span = start.merge(self.prev_span());
        Ok(StmtKind::Class(decl))
    }

    fn parse_member(&mut self, decl: &mut ClassDecl) -> PResult<()> {
        let leading = self.take_leading_comments();
        let doc = leading.into_iter().rev().find(|c| c.is_doc);
        let member_start = self.cur_span();

        if self.eat(&TokenKind::Use) {
            loop {
                decl.trait_uses.push(self.parse_name()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::Semicolon, "';'")?;
            return Ok(());
        }

        let mut visibility = Visibility::Public;
        let mut is_static = false;
        let mut is_abstract = false;
        loop {
            match self.peek_kind() {
                TokenKind::Public => {
                    visibility = Visibility::Public;
                    self.advance();
                }
                TokenKind::Protected => {
                    visibility = Visibility::Protected;
                    self.advance();
                }
                TokenKind::Private => {
                    visibility = Visibility::Private;
                    self.advance();
                }
                TokenKind::Static => {
                    is_static = true;
                    self.advance();
                }
                TokenKind::Abstract => {
                    is_abstract = true;
                    self.advance();
                }
                TokenKind::Final => {
                    self.advance();
                }
                _ => break,
            }
        }

        match self.peek_kind().clone() {
            TokenKind::Const => {
                self.advance();
                loop {
                    let start = self.cur_span();
                    let name = self.expect_ident("constant name")?;
                    self.expect(&TokenKind::Assign, "'='")?;
                    let value = self.parse_expr()?;
                    decl.consts.push(ClassConstDecl {
                        name,
                        value,
                        visibility,
                        span: start.merge(self.prev_span()),
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::Semicolon, "';'")?;
            }
            TokenKind::Fn => {
                self.advance();
                self.eat(&TokenKind::Amp);
                let name = self.expect_ident("method name")?;
                let params = self.parse_params()?;
                let body = if self.check(&TokenKind::LBrace) {
                    Some(self.parse_braced_block()?)
                } else {
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    None
                };
                decl.methods.push(FuncDecl {
                    name,
                    params,
                    body,
                    visibility,
                    is_static,
                    is_abstract: is_abstract || decl.kind == ClassKind::Interface,
                    doc,
                    span: member_start.merge(self.prev_span()),
                });
            }
            TokenKind::Variable(_) => loop {
                let start = self.cur_span();
                let name = match self.peek_kind().clone() {
                    TokenKind::Variable(name) => {
                        self.advance();
                        name
                    }
                    _ => return Err(self.err_expected("property")),
                };
                let default = if self.eat(&TokenKind::Assign) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                decl.properties.push(PropertyDecl {
                    name,
                    default,
                    visibility,
                    is_static,
                    doc: doc.clone(),
                    span: start.merge(self.prev_span()),
                });
                if !self.eat(&TokenKind::Comma) {
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    break;
                }
            },
            _ => return Err(self.err_expected("class member")),
        }
        Ok(())
    }

    fn parse_name(&mut self) -> PResult<Name> {
        let fully_qualified = self.eat(&TokenKind::Backslash);
        let mut parts = vec![self.parse_name_part()?];
        while self.check(&TokenKind::Backslash) {
            self.advance();
            parts.push(self.parse_name_part()?);
        }
        Ok(Name {
            parts,
            fully_qualified,
        })
    }

    fn parse_name_part(&mut self) -> PResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(text) => {
                self.advance();
                Ok(text)
            }
            // `static` appears in name position (`new static`, `static::`).
            TokenKind::Static => {
                self.advance();
                Ok("static".to_string())
            }
            _ => Err(self.err_expected("name")),
        }
    }

    // ---- expressions ----

    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // Assignment: right-associative, low precedence.
            if self.check(&TokenKind::Assign) && min_bp <= 6 {
                self.advance();
                let op = if self.eat(&TokenKind::Amp) {
                    AssignOp::Reference
                } else {
                    AssignOp::Plain
                };
                let value = self.parse_expr_bp(5)?;
                let span = lhs.span.merge(value.span);
                lhs = Expr {
                    kind: ExprKind::Assign {
                        op,
                        target: Box::new(lhs),
                        value: Box::new(value),
                    },
                    span,
                };
                continue;
            }
            if let Some(bin) = compound_assign_op(self.peek_kind()) {
                if min_bp <= 6 {
                    self.advance();
                    let value = self.parse_expr_bp(5)?;
                    let span = lhs.span.merge(value.span);
                    lhs = Expr {
                        kind: ExprKind::Assign {
                            op: AssignOp::Compound(bin),
                            target: Box::new(lhs),
                            value: Box::new(value),
                        },
                        span,
                    };
                    continue;
                }
            }

            // Ternary.
            if self.check(&TokenKind::Question) && min_bp <= 8 {
                self.advance();
                let then = if self.check(&TokenKind::Colon) {
                    None
                } else {
                    Some(Box::new(self.parse_expr_bp(0)?))
                };
                self.expect(&TokenKind::Colon, "':'")?;
                let otherwise = Box::new(self.parse_expr_bp(7)?);
                let span = lhs.span.merge(otherwise.span);
                lhs = Expr {
                    kind: ExprKind::Ternary {
                        cond: Box::new(lhs),
                        then,
                        otherwise,
                    },
                    span,
                };
                continue;
            }

            // instanceof.
            if self.check(&TokenKind::InstanceOf) && min_bp <= 29 {
                self.advance();
                let class = self.parse_class_ref()?;
                let span = lhs.span.merge(self.prev_span());
                lhs = Expr {
                    kind: ExprKind::InstanceOf {
                        expr: Box::new(lhs),
                        class,
                    },
                    span,
                };
                continue;
            }

            let Some((op, l_bp, r_bp)) = binary_op(self.peek_kind()) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr_bp(r_bp)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                span,
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let start = self.cur_span();
        match self.peek_kind().clone() {
            TokenKind::Bang => self.parse_unary(UnaryOp::Not, start),
            TokenKind::Minus => self.parse_unary(UnaryOp::Neg, start),
            TokenKind::Plus => self.parse_unary(UnaryOp::Plus, start),
            TokenKind::Tilde => self.parse_unary(UnaryOp::BitNot, start),
            TokenKind::Amp => {
                // Stray reference marker (e.g. in array literals); the
                // value expression follows.
                self.advance();
                self.parse_prefix()
            }
            TokenKind::LParen => {
                if let Some(kind) = self.peek_cast() {
                    self.advance(); // (
                    self.advance(); // type word
                    self.advance(); // )
                    let expr = self.parse_expr_bp(30)?;
                    let span = start.merge(expr.span);
                    return Ok(Expr {
                        kind: ExprKind::Cast {
                            kind,
                            expr: Box::new(expr),
                        },
                        span,
                    });
                }
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                self.parse_postfix(expr)
            }
            TokenKind::New => {
                self.advance();
                let class = self.parse_class_ref()?;
                let args = if self.check(&TokenKind::LParen) {
                    self.parse_args()?
                } else {
                    Vec::new()
                };
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::New { class, args },
                    span,
                })
            }
            TokenKind::Clone => {
                self.advance();
                let expr = self.parse_expr_bp(30)?;
                let span = start.merge(expr.span);
                Ok(Expr {
                    kind: ExprKind::Clone(Box::new(expr)),
                    span,
                })
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, start: Span) -> PResult<Expr> {
        self.advance();
        let expr = self.parse_expr_bp(30)?;
        let span = start.merge(expr.span);
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        })
    }

    /// Look ahead for a cast: `(` typeword `)` not followed by nothing.
    fn peek_cast(&self) -> Option<CastKind> {
        if !matches!(self.peek_kind(), TokenKind::LParen) {
            return None;
        }
        if !matches!(self.peek_kind_at(2), TokenKind::RParen) {
            return None;
        }
        match self.peek_kind_at(1) {
            TokenKind::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "int" | "integer" => Some(CastKind::Int),
                "float" | "double" => Some(CastKind::Float),
                "bool" | "boolean" => Some(CastKind::Bool),
                "string" => Some(CastKind::String),
                _ => None,
            },
            TokenKind::Array => Some(CastKind::Array),
            _ => None,
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.cur_span();
        match self.peek_kind().clone() {
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Var(name),
                    span: start,
                })
            }
            TokenKind::Dollar => {
                self.advance();
                let inner = if self.eat(&TokenKind::LBrace) {
                    let expr = self.parse_expr()?;
                    self.expect(&TokenKind::RBrace, "'}'")?;
                    expr
                } else {
                    self.parse_primary()?
                };
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::VarVar(Box::new(inner)),
                    span,
                })
            }
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Int(n),
                    span: start,
                })
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Float(n),
                    span: start,
                })
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Str(s),
                    span: start,
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_array_items(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket, "']'")?;
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::Array { items, short: true },
                    span,
                })
            }
            TokenKind::Array => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let items = self.parse_array_items(&TokenKind::RParen)?;
                self.expect(&TokenKind::RParen, "')'")?;
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::Array {
                        items,
                        short: false,
                    },
                    span,
                })
            }
            TokenKind::List => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let items = self.parse_array_items(&TokenKind::RParen)?;
                self.expect(&TokenKind::RParen, "')'")?;
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::List { items },
                    span,
                })
            }
            TokenKind::Isset => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let vars = self.parse_expr_list_until(&TokenKind::RParen)?;
                self.expect(&TokenKind::RParen, "')'")?;
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::Isset(vars),
                    span,
                })
            }
            TokenKind::Empty => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::Empty(Box::new(expr)),
                    span,
                })
            }
            TokenKind::Exit => {
                self.advance();
                let code = if self.eat(&TokenKind::LParen) {
                    let e = if self.check(&TokenKind::RParen) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.expect(&TokenKind::RParen, "')'")?;
                    e
                } else {
                    None
                };
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::Exit(code),
                    span,
                })
            }
            TokenKind::Fn => self.parse_closure(start),
            TokenKind::Static if matches!(self.peek_kind_at(1), TokenKind::Fn) => {
                self.advance();
                let fn_start = self.cur_span();
                self.parse_closure(start.merge(fn_start))
            }
            TokenKind::Ident(_) | TokenKind::Backslash | TokenKind::Static => {
                let name = self.parse_name()?;
                let name_span = start.merge(self.prev_span());
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    let span = name_span.merge(self.prev_span());
                    return Ok(Expr {
                        kind: ExprKind::FuncCall {
                            name: Some(name),
                            callee: None,
                            args,
                        },
                        span,
                    });
                }
                if self.check(&TokenKind::DoubleColon) {
                    return self.parse_static_member(ClassRef::Name(name), name_span);
                }
                Ok(Expr {
                    kind: ExprKind::ConstFetch(name),
                    span: name_span,
                })
            }
            _ => Err(ParseError::ExpectedExpression {
                found: format!("{:?}", self.peek_kind()),
                span: self.cur_span().into(),
            }),
        }
    }

    fn parse_closure(&mut self, start: Span) -> PResult<Expr> {
        self.expect(&TokenKind::Fn, "'function'")?;
        self.eat(&TokenKind::Amp);
        let params = self.parse_params()?;
        let mut uses = Vec::new();
        if self.eat(&TokenKind::Use) {
            self.expect(&TokenKind::LParen, "'('")?;
            loop {
                let use_start = self.cur_span();
                let by_ref = self.eat(&TokenKind::Amp);
                let name = match self.peek_kind().clone() {
                    TokenKind::Variable(name) => {
                        self.advance();
                        name
                    }
                    _ => return Err(self.err_expected("captured variable")),
                };
                uses.push(ClosureUse {
                    name,
                    by_ref,
                    span: use_start.merge(self.prev_span()),
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen, "')'")?;
        }
        let body = self.parse_braced_block()?;
        let span = start.merge(self.prev_span());
        Ok(Expr {
            kind: ExprKind::Closure(ClosureExpr { params, uses, body }),
            span,
        })
    }

    fn parse_static_member(&mut self, class: ClassRef, start: Span) -> PResult<Expr> {
        self.expect(&TokenKind::DoubleColon, "'::'")?;
        match self.peek_kind().clone() {
            TokenKind::Variable(name) => {
                let name_span = self.cur_span();
                self.advance();
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::StaticProp {
                        class,
                        name: Some(name),
                        name_span,
                    },
                    span,
                })
            }
            TokenKind::Dollar => {
                self.advance();
                let name_span = self.cur_span();
                // Dynamic static property: walk the inner expression.
                let _inner = self.parse_primary()?;
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::StaticProp {
                        class,
                        name: None,
                        name_span,
                    },
                    span,
                })
            }
            TokenKind::Ident(name) => {
                let name_span = self.cur_span();
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    let span = start.merge(self.prev_span());
                    return Ok(Expr {
                        kind: ExprKind::StaticCall {
                            class,
                            name,
                            name_span,
                            args,
                        },
                        span,
                    });
                }
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::ClassConst {
                        class,
                        name,
                        name_span,
                    },
                    span,
                })
            }
            TokenKind::Class => {
                let name_span = self.cur_span();
                self.advance();
                let span = start.merge(self.prev_span());
                Ok(Expr {
                    kind: ExprKind::ClassConst {
                        class,
                        name: "class".to_string(),
                        name_span,
                    },
                    span,
                })
            }
            _ => Err(self.err_expected("member name")),
        }
    }

    fn parse_class_ref(&mut self) -> PResult<ClassRef> {
        match self.peek_kind() {
            TokenKind::Ident(_) | TokenKind::Backslash | TokenKind::Static => {
                Ok(ClassRef::Name(self.parse_name()?))
            }
            _ => {
                let expr = self.parse_prefix()?;
                Ok(ClassRef::Dynamic(Box::new(expr)))
            }
        }
    }

    fn parse_args(&mut self) -> PResult<Vec<Arg>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let unpack = self.eat(&TokenKind::Ellipsis);
                let expr = self.parse_expr()?;
                args.push(Arg { expr, unpack });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn parse_array_items(&mut self, terminator: &TokenKind) -> PResult<Vec<ArrayItem>> {
        let mut items = Vec::new();
        while !self.check(terminator) {
            // `list($a, , $b)` skips positions with empty slots.
            if self.eat(&TokenKind::Comma) {
                items.push(ArrayItem {
                    key: None,
                    value: None,
                    by_ref: false,
                });
                continue;
            }
            let by_ref = self.eat(&TokenKind::Amp);
            let first = self.parse_expr()?;
            let item = if self.eat(&TokenKind::DoubleArrow) {
                let by_ref = self.eat(&TokenKind::Amp);
                let value = self.parse_expr()?;
                ArrayItem {
                    key: Some(first),
                    value: Some(value),
                    by_ref,
                }
            } else {
                ArrayItem {
                    key: None,
                    value: Some(first),
                    by_ref,
                }
            };
            items.push(item);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::LBracket => {
                    self.advance();
                    let index = if self.check(&TokenKind::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.expect(&TokenKind::RBracket, "']'")?;
                    let span = expr.span.merge(self.prev_span());
                    expr = Expr {
                        kind: ExprKind::Index {
                            base: Box::new(expr),
                            index,
                        },
                        span,
                    };
                }
                TokenKind::Arrow => {
                    self.advance();
                    let name_span = self.cur_span();
                    let name = match self.peek_kind().clone() {
                        TokenKind::Ident(name) => {
                            self.advance();
                            Some(name)
                        }
                        TokenKind::Variable(_) | TokenKind::LBrace | TokenKind::Dollar => {
                            // Dynamic member name: consume the expression.
                            if self.eat(&TokenKind::LBrace) {
                                self.parse_expr()?;
                                self.expect(&TokenKind::RBrace, "'}'")?;
                            } else {
                                self.parse_primary()?;
                            }
                            None
                        }
                        _ => return Err(self.err_expected("member name")),
                    };
                    if self.check(&TokenKind::LParen) {
                        let args = self.parse_args()?;
                        let span = expr.span.merge(self.prev_span());
                        expr = Expr {
                            kind: ExprKind::MethodCall {
                                base: Box::new(expr),
                                name,
                                name_span,
                                args,
                            },
                            span,
                        };
                    } else {
                        let span = expr.span.merge(self.prev_span());
                        expr = Expr {
                            kind: ExprKind::Prop {
                                base: Box::new(expr),
                                name,
                                name_span,
                            },
                            span,
                        };
                    }
                }
                TokenKind::LParen => {
                    // Dynamic call: `$f(...)`, `$obj->cb(...)` chains.
                    let args = self.parse_args()?;
                    let span = expr.span.merge(self.prev_span());
                    expr = Expr {
                        kind: ExprKind::FuncCall {
                            name: None,
                            callee: Some(Box::new(expr)),
                            args,
                        },
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
}

fn compound_assign_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PlusAssign => BinaryOp::Add,
        TokenKind::MinusAssign => BinaryOp::Sub,
        TokenKind::MulAssign => BinaryOp::Mul,
        TokenKind::DivAssign => BinaryOp::Div,
        TokenKind::ModAssign => BinaryOp::Mod,
        TokenKind::ConcatAssign => BinaryOp::Concat,
        _ => return None,
    })
}

/// Binary operator binding powers; higher binds tighter.
fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8, u8)> {
    Some(match kind {
        TokenKind::Or => (BinaryOp::BoolOr, 1, 2),
        TokenKind::And => (BinaryOp::BoolAnd, 3, 4),
        TokenKind::BoolOr => (BinaryOp::BoolOr, 9, 10),
        TokenKind::BoolAnd => (BinaryOp::BoolAnd, 11, 12),
        TokenKind::Pipe => (BinaryOp::BitOr, 13, 14),
        TokenKind::Caret => (BinaryOp::BitXor, 15, 16),
        TokenKind::Amp => (BinaryOp::BitAnd, 17, 18),
        TokenKind::Eq => (BinaryOp::Eq, 19, 20),
        TokenKind::Identical => (BinaryOp::Identical, 19, 20),
        TokenKind::NotEq => (BinaryOp::NotEq, 19, 20),
        TokenKind::NotIdentical => (BinaryOp::NotIdentical, 19, 20),
        TokenKind::Lt => (BinaryOp::Lt, 21, 22),
        TokenKind::Le => (BinaryOp::Le, 21, 22),
        TokenKind::Gt => (BinaryOp::Gt, 21, 22),
        TokenKind::Ge => (BinaryOp::Ge, 21, 22),
        TokenKind::Shl => (BinaryOp::Shl, 23, 24),
        TokenKind::Shr => (BinaryOp::Shr, 23, 24),
        TokenKind::Plus => (BinaryOp::Add, 25, 26),
        TokenKind::Minus => (BinaryOp::Sub, 25, 26),
        TokenKind::Dot => (BinaryOp::Concat, 25, 26),
        TokenKind::Star => (BinaryOp::Mul, 27, 28),
        TokenKind::Slash => (BinaryOp::Div, 27, 28),
        TokenKind::Percent => (BinaryOp::Mod, 27, 28),
        _ => return None,
    })
}

#[cfg(test)]
mod tests;
