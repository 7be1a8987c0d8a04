/// A classified lexeme of a bytebeat expression.
///
/// `Plus` and `Minus` are not split into unary/binary forms here: that
/// depends on whether the compiler is expecting an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    // Operands
    T,
    Number(u32),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Comparison
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,

    // Delimiters
    LParen,
    RParen,
}

impl Token {
    /// Returns true if this token pushes a value
    pub fn is_operand(&self) -> bool {
        matches!(self, Token::T | Token::Number(_))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::T => write!(f, "t"),
            Token::Number(n) => write!(f, "{}", n),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Eq => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}
