use serde::{Deserialize, Serialize};

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // operands
    PushT,
    PushNum(u32),

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // bitwise
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,

    // comparison
    Lt,
    Gt,
    Eq,
    Le,
    Ge,
    /// Reserved: the lexer never produces `!=`.
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

impl Op {
    /// Binding strength of an operator; higher binds tighter.
    ///
    /// Operands have no precedence and report 0.
    pub fn precedence(self) -> u8 {
        use Op::*;
        match self {
            Not | Neg => 7,
            Mul | Div | Mod => 6,
            Add | Sub => 5,
            Shl | Shr => 4,
            Lt | Gt | Le | Ge => 3,
            Eq | Ne => 2,
            And => 1,
            Xor | Or => 0,
            PushT | PushNum(_) => 0,
        }
    }

    pub fn assoc(self) -> Assoc {
        if self.is_unary() {
            Assoc::Right
        } else {
            Assoc::Left
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Op::Neg | Op::Not)
    }

    pub fn is_operand(self) -> bool {
        matches!(self, Op::PushT | Op::PushNum(_))
    }

    /// Returns (pops, pushes) for this instruction.
    pub fn stack_effect(self) -> (usize, usize) {
        if self.is_operand() {
            (0, 1)
        } else if self.is_unary() {
            (1, 1)
        } else {
            (2, 1)
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Op::*;
        match self {
            PushT => "PUSH_T",
            PushNum(_) => "PUSH",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            Neg => "NEG",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Not => "NOT",
            Shl => "SHL",
            Shr => "SHR",
            Lt => "LT",
            Gt => "GT",
            Eq => "EQ",
            Le => "LE",
            Ge => "GE",
            Ne => "NE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_tiers() {
        assert_eq!(Op::Neg.precedence(), 7);
        assert_eq!(Op::Not.precedence(), 7);
        assert_eq!(Op::Mul.precedence(), 6);
        assert_eq!(Op::Mod.precedence(), 6);
        assert_eq!(Op::Sub.precedence(), 5);
        assert_eq!(Op::Shr.precedence(), 4);
        assert_eq!(Op::Ge.precedence(), 3);
        assert_eq!(Op::Eq.precedence(), 2);
        assert_eq!(Op::Ne.precedence(), 2);
        assert_eq!(Op::And.precedence(), 1);
        assert_eq!(Op::Xor.precedence(), 0);
        assert_eq!(Op::Or.precedence(), 0);
    }

    #[test]
    fn test_only_unary_ops_are_right_assoc() {
        assert_eq!(Op::Neg.assoc(), Assoc::Right);
        assert_eq!(Op::Not.assoc(), Assoc::Right);
        assert_eq!(Op::Sub.assoc(), Assoc::Left);
        assert_eq!(Op::Shl.assoc(), Assoc::Left);
    }

    #[test]
    fn test_stack_effects() {
        assert_eq!(Op::PushT.stack_effect(), (0, 1));
        assert_eq!(Op::PushNum(3).stack_effect(), (0, 1));
        assert_eq!(Op::Not.stack_effect(), (1, 1));
        assert_eq!(Op::Xor.stack_effect(), (2, 1));
    }
}
