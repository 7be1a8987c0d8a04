use thiserror::Error;

use crate::bytecode::Op;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stack-check error: {message}")]
pub struct StackCheckError {
    pub message: String,
    /// Instruction index where the check failed.
    pub ip: usize,
}

impl StackCheckError {
    fn new(ip: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ip,
        }
    }
}

/// Highest evaluation-stack height reached while running `ops` from an
/// empty stack.
///
/// Straight-line code only, so a single linear scan is exact.
pub fn peak_depth(ops: &[Op]) -> Result<usize, StackCheckError> {
    let mut h: usize = 0;
    let mut peak: usize = 0;

    for (ip, op) in ops.iter().enumerate() {
        let (pops, pushes) = op.stack_effect();
        h = h.checked_sub(pops).ok_or_else(|| {
            StackCheckError::new(
                ip,
                format!(
                    "stack underflow at ip={}, op={}, needed {} items, had {}",
                    ip,
                    op.mnemonic(),
                    pops,
                    h
                ),
            )
        })?;
        h += pushes;
        peak = peak.max(h);
    }

    Ok(peak)
}

/// Checks that `ops` never underflows and leaves exactly one result.
pub fn check_ops(ops: &[Op]) -> Result<(), StackCheckError> {
    peak_depth(ops)?;

    let end: usize = ops
        .iter()
        .map(|op| op.stack_effect())
        .fold(0, |h, (pops, pushes)| h - pops + pushes);

    if end != 1 {
        return Err(StackCheckError::new(
            ops.len(),
            format!("program leaves {} values on the stack, expected 1", end),
        ));
    }
    Ok(())
}
