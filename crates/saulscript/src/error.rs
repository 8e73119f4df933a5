use std::{fmt, time::Duration};

/// Failure raised while lexing, parsing, or evaluating a script.
///
/// Every variant that originates from a specific piece of source text
/// carries the 1-based line number of that text. Budget violations carry
/// the configured limit and the observed usage instead.
///
/// Parser-internal control signals (a `}` closing a block, a `return`
/// unwinding a branch) are never represented here; they are sentinel
/// values inside the parser and evaluator and cannot reach the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The lexer met a byte it has no rule for.
    UnexpectedCharacter { line: usize, ch: char },
    /// Malformed token or grammar.
    Parse { line: usize, message: String },
    /// The parser needed more tokens than the source provided, e.g. an
    /// unterminated list literal or argument list at end of input.
    UnexpectedEnd { line: usize },
    /// A variable, or a dictionary member accessed through dot notation,
    /// does not exist.
    ObjectResolution { line: usize, name: String },
    /// Type mismatch, non-callable invocation, bad subscript, division by
    /// zero, or a similar evaluation failure.
    Runtime { line: usize, message: String },
    /// The operation counter exceeded the configured budget.
    OperationLimitReached { limit: u64, count: u64 },
    /// Wall-clock time exceeded the configured budget.
    TimeLimitReached { limit: Duration, elapsed: Duration },
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn runtime(line: usize, message: impl Into<String>) -> Self {
        Self::Runtime {
            line,
            message: message.into(),
        }
    }

    /// The source line the error points at, when it has one.
    ///
    /// Budget violations are not tied to a single line and return `None`.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnexpectedCharacter { line, .. }
            | Self::Parse { line, .. }
            | Self::UnexpectedEnd { line }
            | Self::ObjectResolution { line, .. }
            | Self::Runtime { line, .. } => Some(*line),
            Self::OperationLimitReached { .. } | Self::TimeLimitReached { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter { line, ch } => {
                write!(f, "Unexpected character ({ch}) at line {line}")
            }
            Self::Parse { line, message } => {
                write!(f, "Parse error at line {line}: {message}")
            }
            Self::UnexpectedEnd { line } => {
                write!(f, "Unexpected end of input at line {line}")
            }
            Self::ObjectResolution { line, name } => {
                write!(f, "No object named '{name}' at line {line}")
            }
            Self::Runtime { line, message } => {
                write!(f, "Runtime error at line {line}: {message}")
            }
            Self::OperationLimitReached { limit, count } => {
                write!(f, "operation limit exceeded: {count} > {limit}")
            }
            Self::TimeLimitReached { limit, elapsed } => {
                write!(f, "time limit exceeded: {elapsed:?} > {limit:?}")
            }
        }
    }
}

impl std::error::Error for Error {}
