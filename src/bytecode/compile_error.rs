use thiserror::Error;

use crate::bytecode::ir::{PROGRAM_CAPACITY, ProgramFull};
use crate::frontend::lexer::LexerError;

/// Why a compile attempt failed.
///
/// Positions are 1-based columns into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A `(` was never closed, or a `)` had no operand before it.
    #[error("unbalanced parenthesis at column {col}")]
    UnbalancedParen { col: usize },

    /// Reserved for operator-stack misuse distinct from [`CompileError::ProgramTooLong`].
    #[error("operator stack exhausted")]
    StackExhausted,

    /// Unrecognized character, malformed literal, or a token in the wrong position.
    #[error("invalid token at column {col}")]
    InvalidToken { col: usize },

    /// Output program or operator stack capacity exceeded.
    #[error("program too long (max {} instructions)", PROGRAM_CAPACITY)]
    ProgramTooLong,
}

impl CompileError {
    /// Short name used in logs and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            CompileError::UnbalancedParen { .. } => "unbalanced-parenthesis",
            CompileError::StackExhausted => "stack-exhaustion",
            CompileError::InvalidToken { .. } => "invalid-token",
            CompileError::ProgramTooLong => "program-too-long",
        }
    }

    /// Column of the offending character, if the error has one.
    pub fn col(&self) -> Option<usize> {
        match self {
            CompileError::UnbalancedParen { col } | CompileError::InvalidToken { col } => {
                Some(*col)
            }
            CompileError::StackExhausted | CompileError::ProgramTooLong => None,
        }
    }
}

impl From<ProgramFull> for CompileError {
    fn from(_: ProgramFull) -> Self {
        CompileError::ProgramTooLong
    }
}

impl From<LexerError> for CompileError {
    fn from(e: LexerError) -> Self {
        CompileError::InvalidToken { col: e.col }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_column() {
        let err = CompileError::InvalidToken { col: 4 };
        assert_eq!(err.to_string(), "invalid token at column 4");

        let err = CompileError::UnbalancedParen { col: 1 };
        assert!(err.to_string().contains("unbalanced parenthesis"));
    }

    #[test]
    fn test_program_too_long_mentions_capacity() {
        let msg = CompileError::ProgramTooLong.to_string();
        assert!(msg.contains(&PROGRAM_CAPACITY.to_string()), "msg was: {}", msg);
    }

    #[test]
    fn test_names() {
        assert_eq!(CompileError::ProgramTooLong.name(), "program-too-long");
        assert_eq!(CompileError::StackExhausted.name(), "stack-exhaustion");
        assert_eq!(CompileError::InvalidToken { col: 1 }.name(), "invalid-token");
    }

    #[test]
    fn test_lexer_error_becomes_invalid_token() {
        let err: CompileError = LexerError {
            message: "unexpected character: '$'".to_string(),
            col: 7,
        }
        .into();
        assert_eq!(err, CompileError::InvalidToken { col: 7 });
        assert_eq!(err.col(), Some(7));
    }

    #[test]
    fn test_program_full_becomes_program_too_long() {
        let err: CompileError = ProgramFull.into();
        assert_eq!(err, CompileError::ProgramTooLong);
        assert_eq!(err.col(), None);
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = CompileError::StackExhausted;
        let _: &dyn std::error::Error = &err;
    }
}
