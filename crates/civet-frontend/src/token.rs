// token.rs

use crate::Span;

/// Lexical token kinds. Keywords are matched case-insensitively by the
/// lexer; the original spelling stays reachable through the token span.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals and names
    Variable(String), // $name, without the sigil
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    Abstract,
    And,
    Array,
    Break,
    Case,
    Catch,
    Class,
    Clone,
    Const,
    Continue,
    Default,
    Do,
    Echo,
    Else,
    Elseif,
    Empty,
    Exit,
    Extends,
    Final,
    Finally,
    Fn, // `function`
    For,
    Foreach,
    Global,
    If,
    Implements,
    InstanceOf,
    Interface,
    Isset,
    List,
    Namespace,
    New,
    Or,
    Private,
    Protected,
    Public,
    Return,
    Static,
    Switch,
    Throw,
    Trait,
    Try,
    Unset,
    Use,
    While,

    // Punctuation and operators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    DoubleColon, // ::
    Arrow,       // ->
    DoubleArrow, // =>
    Question,
    Dollar, // bare $ as in $$x / ${...}
    Ellipsis,

    Assign, // =
    PlusAssign,
    MinusAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ConcatAssign,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    BoolAnd, // &&
    BoolOr,  // ||
    Eq,      // ==
    Identical,
    NotEq,
    NotIdentical,
    Lt,
    Gt,
    Le,
    Ge,
    Backslash,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Map an identifier to its keyword token, if it is one.
/// The analyzed language treats keywords case-insensitively.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    let lower = ident.to_ascii_lowercase();
    let kind = match lower.as_str() {
        "abstract" => TokenKind::Abstract,
        "and" => TokenKind::And,
        "array" => TokenKind::Array,
        "break" => TokenKind::Break,
        "case" => TokenKind::Case,
        "catch" => TokenKind::Catch,
        "class" => TokenKind::Class,
        "clone" => TokenKind::Clone,
        "const" => TokenKind::Const,
        "continue" => TokenKind::Continue,
        "default" => TokenKind::Default,
        "die" | "exit" => TokenKind::Exit,
        "do" => TokenKind::Do,
        "echo" => TokenKind::Echo,
        "else" => TokenKind::Else,
        "elseif" => TokenKind::Elseif,
        "empty" => TokenKind::Empty,
        "extends" => TokenKind::Extends,
        "final" => TokenKind::Final,
        "finally" => TokenKind::Finally,
        "for" => TokenKind::For,
        "foreach" => TokenKind::Foreach,
        "function" => TokenKind::Fn,
        "global" => TokenKind::Global,
        "if" => TokenKind::If,
        "implements" => TokenKind::Implements,
        "instanceof" => TokenKind::InstanceOf,
        "interface" => TokenKind::Interface,
        "isset" => TokenKind::Isset,
        "list" => TokenKind::List,
        "namespace" => TokenKind::Namespace,
        "new" => TokenKind::New,
        "or" => TokenKind::Or,
        "private" => TokenKind::Private,
        "protected" => TokenKind::Protected,
        "public" => TokenKind::Public,
        "return" => TokenKind::Return,
        "static" => TokenKind::Static,
        "switch" => TokenKind::Switch,
        "throw" => TokenKind::Throw,
        "trait" => TokenKind::Trait,
        "try" => TokenKind::Try,
        "unset" => TokenKind::Unset,
        "use" => TokenKind::Use,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}
