// errors.rs
//! Parse errors (E1xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    #[diagnostic(code(E1001))]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("unexpected end of file: expected {expected}")]
    #[diagnostic(code(E1002))]
    UnexpectedEof {
        expected: String,
        #[label("input ends here")]
        span: SourceSpan,
    },

    #[error("expected expression, found {found}")]
    #[diagnostic(code(E1003))]
    ExpectedExpression {
        found: String,
        #[label("not an expression")]
        span: SourceSpan,
    },
}

impl ParseError {
    /// Offset of the error, for report positioning.
    pub fn offset(&self) -> usize {
        let span = match self {
            ParseError::UnexpectedToken { span, .. } => span,
            ParseError::UnexpectedEof { span, .. } => span,
            ParseError::ExpectedExpression { span, .. } => span,
        };
        span.offset()
    }
}
