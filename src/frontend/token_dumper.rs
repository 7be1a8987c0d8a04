use std::fmt::Write;

use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the source form of each token
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const CYN: &'static str = "\x1b[36m";
    const YEL: &'static str = "\x1b[33m";
    const MAG: &'static str = "\x1b[35m";
    const DIM: &'static str = "\x1b[2m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        for s in tokens {
            self.render_one(&mut out, s);
        }
        out
    }

    fn render_one(&self, out: &mut String, s: &Spanned) {
        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        // writing into a String cannot fail
        let _ = if self.show_debug_repr {
            writeln!(
                out,
                "[{:03}] {}{:<6} {:?}{}",
                s.span.col, colr, kind, s.token, reset
            )
        } else {
            writeln!(
                out,
                "[{:03}] {}{:<6} {}{}",
                s.span.col, colr, kind, s.token, reset
            )
        };
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            T => "VAR",
            Number(_) => "INT",
            LParen | RParen => "PAREN",
            Lt | Gt | LtEq | GtEq | Eq => "CMP",
            _ => "OP",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            T => Self::YEL,
            Number(_) => Self::CYN,
            LParen | RParen => Self::DIM,
            _ => Self::MAG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn lex(source: &str) -> Vec<Spanned> {
        Lexer::new(source).tokenize().unwrap()
    }

    #[test]
    fn test_plain_debug_output() {
        let out = TokenDumper::new().no_color().render(&lex("t>>4"));
        assert_eq!(out, "[001] VAR    T\n[002] OP     Shr\n[004] INT    Number(4)\n");
    }

    #[test]
    fn test_pretty_output_uses_source_form() {
        let out = TokenDumper::new().no_color().pretty().render(&lex("(t<=0x10)"));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "[001] PAREN  (");
        assert_eq!(lines[2], "[003] CMP    <=");
        assert_eq!(lines[3], "[005] INT    16");
    }

    #[test]
    fn test_color_output_wraps_in_escape_codes() {
        let out = TokenDumper::new().render(&lex("t"));
        assert!(out.contains("\x1b[33m"));
        assert!(out.ends_with("\x1b[0m\n"));
    }
}
