use crate::bytecode::op::Op;

/// Slots in the evaluation stack.
pub const EVAL_STACK_CAPACITY: usize = 8;

/// Fixed-size evaluation stack. Lives on the caller's stack frame.
struct EvalStack {
    slots: [u32; EVAL_STACK_CAPACITY],
    len: usize,
}

impl EvalStack {
    fn new() -> Self {
        Self {
            slots: [0; EVAL_STACK_CAPACITY],
            len: 0,
        }
    }

    /// Returns false (and drops `value`) when full.
    fn push(&mut self, value: u32) -> bool {
        match self.slots.get_mut(self.len) {
            Some(slot) => {
                *slot = value;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    fn pop(&mut self) -> Option<u32> {
        self.len = self.len.checked_sub(1)?;
        Some(self.slots[self.len])
    }

    fn pop_two(&mut self) -> Option<(u32, u32)> {
        if self.len < 2 {
            return None;
        }
        let b = self.pop()?;
        let a = self.pop()?;
        Some((a, b))
    }

    fn top(&self) -> u32 {
        self.len.checked_sub(1).map_or(0, |i| self.slots[i])
    }
}

/// Evaluates `ops` for counter value `t`.
///
/// Never fails: an instruction that would overflow or underflow the stack
/// is skipped, and the result is the top of the stack afterwards (0 if the
/// stack is empty). Does not allocate.
pub fn evaluate(t: u32, ops: &[Op]) -> u32 {
    let mut stack = EvalStack::new();

    for op in ops {
        match *op {
            // Literals
            Op::PushT => {
                stack.push(t);
            }
            Op::PushNum(n) => {
                stack.push(n);
            }

            // Unary
            Op::Neg | Op::Not => {
                if let Some(a) = stack.pop() {
                    let result = if *op == Op::Neg { a.wrapping_neg() } else { !a };
                    stack.push(result);
                }
            }

            // Binary
            _ => {
                if let Some((a, b)) = stack.pop_two() {
                    stack.push(binary(*op, a, b));
                }
            }
        }
    }

    stack.top()
}

fn binary(op: Op, a: u32, b: u32) -> u32 {
    match op {
        // Arithmetic
        Op::Add => a.wrapping_add(b),
        Op::Sub => a.wrapping_sub(b),
        Op::Mul => a.wrapping_mul(b),
        Op::Div => a.checked_div(b).unwrap_or(0),
        Op::Mod => a.checked_rem(b).unwrap_or(0),

        // Bitwise
        Op::And => a & b,
        Op::Or => a | b,
        Op::Xor => a ^ b,
        Op::Shl => a.wrapping_shl(b),
        Op::Shr => a.wrapping_shr(b),

        // Comparison
        Op::Lt => u32::from(a < b),
        Op::Gt => u32::from(a > b),
        Op::Eq => u32::from(a == b),
        Op::Le => u32::from(a <= b),
        Op::Ge => u32::from(a >= b),
        Op::Ne => u32::from(a != b),

        Op::PushT | Op::PushNum(_) | Op::Neg | Op::Not => a,
    }
}

/// The unsigned 8-bit sample for an evaluation result.
pub fn sample_byte(value: u32) -> u8 {
    (value & 0xFF) as u8
}
