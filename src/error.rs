use std::fmt::{Display, Formatter};

use crate::util::Code;

/// Row/column plus a rendered caret excerpt for a single source position.
#[derive(Debug, Clone)]
pub struct SourceExcerpt {
    pub line: usize,
    pub column: usize,
    pub rendered: String,
}

impl SourceExcerpt {
    pub fn at(code: &Code, pointer: usize) -> Self {
        let position = code.obtain_position(pointer);
        Self {
            line: position.line,
            column: position.column,
            rendered: code.render_excerpt(pointer),
        }
    }
}

impl Display for SourceExcerpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}\n{}", self.line, self.column, self.rendered)
    }
}

/// Failure scanning the input into a token stream: an unknown code point at
/// a given source position.
#[derive(Debug, Clone)]
pub struct TokenizingError {
    pub excerpt: SourceExcerpt,
    pub found: String,
}

impl Display for TokenizingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TokenizingError: unexpected character {} at {}",
            self.found, self.excerpt
        )
    }
}

/// Failure building the expression tree.
#[derive(Debug, Clone)]
pub enum ParseError {
    EmptyExpression,
    TrailingTokens(SourceExcerpt),
    ExpectedIdentifierAfterDot(SourceExcerpt),
    UnmatchedBracket(SourceExcerpt),
    EmptySubscript(SourceExcerpt),
    DanglingOperator(SourceExcerpt),
    UnexpectedToken(SourceExcerpt, String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyExpression => write!(f, "ParseError: empty expression"),
            ParseError::TrailingTokens(e) => write!(f, "ParseError: trailing tokens at {}", e),
            ParseError::ExpectedIdentifierAfterDot(e) => {
                write!(f, "ParseError: expected identifier after '.' at {}", e)
            }
            ParseError::UnmatchedBracket(e) => write!(f, "ParseError: unmatched bracket at {}", e),
            ParseError::EmptySubscript(e) => write!(f, "ParseError: empty subscript at {}", e),
            ParseError::DanglingOperator(e) => {
                write!(f, "ParseError: dangling operator at {}", e)
            }
            ParseError::UnexpectedToken(e, literal) => {
                write!(f, "ParseError: unexpected token '{}' at {}", literal, e)
            }
        }
    }
}

/// Failure evaluating an already-parsed expression tree.
#[derive(Debug, Clone)]
pub enum EvalError {
    UnknownIdentifier(String),
    NotCallable,
    UnsupportedSlicing,
    StepIsZero,
    UnsupportedOperation { op: &'static str, operand: String },
    IndexOutOfRange { index: i64, len: usize },
    NoSuchProperty(String),
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::UnknownIdentifier(name) => {
                write!(f, "EvalError: unknown identifier '{}'", name)
            }
            EvalError::NotCallable => write!(f, "EvalError: value is not callable"),
            EvalError::UnsupportedSlicing => {
                write!(f, "EvalError: target does not support slicing")
            }
            EvalError::StepIsZero => write!(f, "EvalError: slice step must not be zero"),
            EvalError::UnsupportedOperation { op, operand } => write!(
                f,
                "EvalError: operation '{}' is not supported on {}",
                op, operand
            ),
            EvalError::IndexOutOfRange { index, len } => write!(
                f,
                "EvalError: index {} out of range for length {}",
                index, len
            ),
            EvalError::NoSuchProperty(name) => {
                write!(f, "EvalError: no such property '{}'", name)
            }
        }
    }
}

/// The single error type the façade surfaces to callers: errors abort the
/// pipeline and surface to the caller unchanged.
#[derive(Debug, Clone)]
pub enum EngineError {
    Tokenizing(TokenizingError),
    Parse(ParseError),
    Eval(EvalError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Tokenizing(e) => Display::fmt(e, f),
            EngineError::Parse(e) => Display::fmt(e, f),
            EngineError::Eval(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<TokenizingError> for EngineError {
    fn from(e: TokenizingError) -> Self {
        EngineError::Tokenizing(e)
    }
}
impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        EngineError::Parse(e)
    }
}
impl From<EvalError> for EngineError {
    fn from(e: EvalError) -> Self {
        EngineError::Eval(e)
    }
}
