use tracing::debug;

use crate::{
    bytecode::{
        Op, Program,
        compile_error::CompileError,
        op::Assoc,
    },
    frontend::{lexer::Lexer, token::Token},
};

/// Maximum depth of the operator stack during compilation.
pub const OP_STACK_CAPACITY: usize = 64;

/// Longest accepted source text, in bytes.
pub const MAX_SOURCE_LEN: usize = 255;

/// Pending entry on the shunting-yard operator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackEntry {
    Operator(Op),
    OpenParen,
}

/// Compiles `source` into a fresh program.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let mut program = Program::new();
    compile_into(source, &mut program)?;
    Ok(program)
}

/// Compiles `source` directly into `dst` and returns the instruction count.
///
/// On failure `dst` is left empty; a partially emitted program is never
/// observable.
pub fn compile_into(source: &str, dst: &mut Program) -> Result<usize, CompileError> {
    Compiler::new(source).run(dst)
}

/// Shunting-yard translation from infix source to postfix bytecode.
///
/// Operands are emitted as soon as they are read; operators wait on
/// `op_stack` until something of lower (or, for left-associative
/// operators, equal) precedence arrives.
struct Compiler<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    op_stack: Vec<StackEntry>,

    /// Open parentheses not yet closed.
    depth: usize,

    /// True at the start and after `(` or any operator; decides whether
    /// `+`/`-` are unary.
    expect_operand: bool,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            op_stack: Vec::with_capacity(OP_STACK_CAPACITY),
            depth: 0,
            expect_operand: true,
        }
    }

    /// Replaces the contents of `dst` with the compiled program. On error
    /// `dst` is left empty.
    fn run(self, dst: &mut Program) -> Result<usize, CompileError> {
        dst.clear();

        let result = self.emit(dst);
        if result.is_err() {
            dst.clear();
        }
        result
    }

    fn emit(mut self, dst: &mut Program) -> Result<usize, CompileError> {
        if self.source.len() > MAX_SOURCE_LEN {
            return Err(CompileError::ProgramTooLong);
        }

        while let Some(spanned) = self.lexer.next_token().map_err(|e| {
            debug!(col = e.col, message = %e.message, "lexer rejected input");
            CompileError::from(e)
        })? {
            self.token(spanned.token, spanned.span.col, dst)?;
        }

        self.finish(dst)
    }

    fn token(&mut self, token: Token, col: usize, dst: &mut Program) -> Result<(), CompileError> {
        match token {
            _ if token.is_operand() => {
                if !self.expect_operand {
                    return Err(CompileError::InvalidToken { col });
                }
                let op = match token {
                    Token::Number(n) => Op::PushNum(n),
                    _ => Op::PushT,
                };
                dst.push(op)?;
                self.expect_operand = false;
            }

            Token::LParen => {
                if !self.expect_operand {
                    return Err(CompileError::InvalidToken { col });
                }
                self.push_entry(StackEntry::OpenParen)?;
                self.depth += 1;
            }

            Token::RParen => {
                if self.expect_operand {
                    return Err(CompileError::UnbalancedParen { col });
                }
                if self.depth == 0 {
                    return Err(CompileError::InvalidToken { col });
                }
                while let Some(StackEntry::Operator(op)) = self.op_stack.last().copied() {
                    self.op_stack.pop();
                    dst.push(op)?;
                }
                // the matching '(' (depth > 0 guarantees one)
                self.op_stack.pop();
                self.depth -= 1;
                self.expect_operand = false;
            }

            Token::Tilde => {
                if !self.expect_operand {
                    return Err(CompileError::InvalidToken { col });
                }
                self.operator(Op::Not, dst)?;
            }

            // unary plus is a no-op
            Token::Plus if self.expect_operand => {}

            Token::Minus if self.expect_operand => self.operator(Op::Neg, dst)?,

            _ => {
                let Some(op) = binary_op(token) else {
                    return Err(CompileError::InvalidToken { col });
                };
                if self.expect_operand {
                    return Err(CompileError::InvalidToken { col });
                }
                self.operator(op, dst)?;
                self.expect_operand = true;
            }
        }

        Ok(())
    }

    fn operator(&mut self, op: Op, dst: &mut Program) -> Result<(), CompileError> {
        let prec = op.precedence();

        while let Some(StackEntry::Operator(top)) = self.op_stack.last().copied() {
            let pops = match op.assoc() {
                Assoc::Left => prec <= top.precedence(),
                Assoc::Right => prec < top.precedence(),
            };
            if !pops {
                break;
            }
            self.op_stack.pop();
            dst.push(top)?;
        }

        self.push_entry(StackEntry::Operator(op))
    }

    fn push_entry(&mut self, entry: StackEntry) -> Result<(), CompileError> {
        if self.op_stack.len() >= OP_STACK_CAPACITY {
            return Err(CompileError::ProgramTooLong);
        }
        self.op_stack.push(entry);
        Ok(())
    }

    fn finish(mut self, dst: &mut Program) -> Result<usize, CompileError> {
        let end = self.source.len() + 1;

        // trailing operator or empty source
        if self.expect_operand {
            return Err(CompileError::InvalidToken { col: end });
        }

        if self.depth > 0 {
            return Err(CompileError::UnbalancedParen { col: end });
        }

        while let Some(entry) = self.op_stack.pop() {
            match entry {
                StackEntry::Operator(op) => dst.push(op)?,
                StackEntry::OpenParen => return Err(CompileError::UnbalancedParen { col: end }),
            }
        }

        Ok(dst.len())
    }
}

fn binary_op(token: Token) -> Option<Op> {
    Some(match token {
        Token::Plus => Op::Add,
        Token::Minus => Op::Sub,
        Token::Star => Op::Mul,
        Token::Slash => Op::Div,
        Token::Percent => Op::Mod,
        Token::Amp => Op::And,
        Token::Pipe => Op::Or,
        Token::Caret => Op::Xor,
        Token::Shl => Op::Shl,
        Token::Shr => Op::Shr,
        Token::Lt => Op::Lt,
        Token::Gt => Op::Gt,
        Token::LtEq => Op::Le,
        Token::GtEq => Op::Ge,
        Token::Eq => Op::Eq,
        Token::T | Token::Number(_) | Token::Tilde | Token::LParen | Token::RParen => {
            return None;
        }
    })
}
