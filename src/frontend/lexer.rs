use thiserror::Error;

use crate::frontend::token::Token;

/// 1-based column of a lexeme. Expressions are single-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column {col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub col: usize,
}

pub struct Lexer<'a> {
    text: &'a str,
    source: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            text: source,
            source: source.as_bytes(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.current();
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span { col: self.pos + 1 }
    }

    /// Only plain spaces separate lexemes; tabs and newlines are invalid.
    fn skip_spaces(&mut self) {
        while self.current() == Some(b' ') {
            self.advance();
        }
    }

    fn error_at(&self, col: usize, message: impl Into<String>) -> LexerError {
        LexerError {
            message: message.into(),
            col,
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.span();

        if self.current() == Some(b'0') {
            match self.peek() {
                Some(b'x') | Some(b'X') => {
                    self.advance(); // '0'
                    self.advance(); // 'x' or 'X'
                    return self.read_radix(16, start, "expected hex digits after 0x");
                }
                Some(b'b') | Some(b'B') => {
                    self.advance(); // '0'
                    self.advance(); // 'b' or 'B'
                    return self.read_radix(2, start, "expected binary digits after 0b");
                }
                _ => {}
            }
        }

        let mut value: u32 = 0;
        while let Some(ch) = self.current() {
            if !ch.is_ascii_digit() {
                break;
            }
            value = value.wrapping_mul(10).wrapping_add(u32::from(ch - b'0'));
            self.advance();
        }

        Ok(Token::Number(value))
    }

    /// Accumulates hex or binary digits. Bits shifted past 32 are dropped.
    fn read_radix(&mut self, radix: u32, start: Span, missing: &str) -> Result<Token, LexerError> {
        let shift = radix.trailing_zeros();
        let mut value: u32 = 0;
        let mut digits = 0usize;

        while let Some(digit) = self.current().and_then(|ch| char::from(ch).to_digit(radix)) {
            value = (value << shift) | digit;
            digits += 1;
            self.advance();
        }

        if digits == 0 {
            return Err(self.error_at(start.col, missing));
        }

        Ok(Token::Number(value))
    }

    fn read_operator(&mut self) -> Option<Token> {
        let ch = self.current()?;
        let next = self.peek();

        let (token, width) = match (ch, next) {
            (b'<', Some(b'<')) => (Token::Shl, 2),
            (b'<', Some(b'=')) => (Token::LtEq, 2),
            (b'>', Some(b'>')) => (Token::Shr, 2),
            (b'>', Some(b'=')) => (Token::GtEq, 2),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            (b'&', _) => (Token::Amp, 1),
            (b'|', _) => (Token::Pipe, 1),
            (b'^', _) => (Token::Caret, 1),
            (b'~', _) => (Token::Tilde, 1),
            (b'=', _) => (Token::Eq, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            _ => return None,
        };

        for _ in 0..width {
            self.advance();
        }
        Some(token)
    }

    /// Reads the next lexeme, or `None` at the end of the source.
    pub fn next_token(&mut self) -> Result<Option<Spanned>, LexerError> {
        self.skip_spaces();
        let span = self.span();

        let token = match self.current() {
            None => return Ok(None),
            Some(b't') => {
                self.advance();
                Token::T
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(_) => match self.read_operator() {
                Some(token) => token,
                None => {
                    let found = self.text[self.pos..].chars().next().unwrap_or('?');
                    return Err(self.error_at(
                        span.col,
                        format!("unexpected character: {:?}", found),
                    ));
                }
            },
        };

        Ok(Some(Spanned { token, span }))
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(spanned) = self.next_token()? {
            tokens.push(spanned);
        }
        Ok(tokens)
    }
}
