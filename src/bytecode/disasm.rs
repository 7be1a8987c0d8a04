use std::fmt::Write;

use crate::bytecode::{Op, Program, stack_check::peak_depth};
use crate::runtime::vm::EVAL_STACK_CAPACITY;

/// Print disassembly of a compiled program
pub fn print_program(source: &str, program: &Program) {
    print!("{}", format_program(source, program));
}

/// Return the full listing, header included, as a String
pub fn format_program(source: &str, program: &Program) -> String {
    let mut out = String::new();

    let depth = match peak_depth(program.ops()) {
        Ok(depth) if depth > EVAL_STACK_CAPACITY => {
            format!("{} (exceeds {})", depth, EVAL_STACK_CAPACITY)
        }
        Ok(depth) => depth.to_string(),
        Err(e) => e.to_string(),
    };

    // writing into a String cannot fail
    let _ = writeln!(out, "════════════════════════════════════════");
    let _ = writeln!(out, " {}", source);
    let _ = writeln!(out, " {} instructions, peak stack depth {}", program.len(), depth);
    let _ = writeln!(out, "════════════════════════════════════════");
    out.push_str(&disassemble_ops(program.ops()));
    out
}

/// Return one `ip  MNEMONIC [operand]` line per instruction
pub fn disassemble_ops(ops: &[Op]) -> String {
    let mut out = String::new();
    for (ip, op) in ops.iter().enumerate() {
        let _ = writeln!(out, "{:04}  {}", ip, format_op(op));
    }
    out
}

fn format_op(op: &Op) -> String {
    match op {
        Op::PushNum(n) if *n > 0xFFFF => format!("{:<8}{} ; {:#x}", op.mnemonic(), n, n),
        Op::PushNum(n) => format!("{:<8}{}", op.mnemonic(), n),
        other => other.mnemonic().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::compile;

    #[test]
    fn test_listing_lines() {
        let out = disassemble_ops(&[Op::PushT, Op::PushNum(8), Op::Shr]);
        assert_eq!(out, "0000  PUSH_T\n0001  PUSH    8\n0002  SHR\n");
    }

    #[test]
    fn test_large_literal_shows_hex() {
        let out = disassemble_ops(&[Op::PushNum(0xdead_beef)]);
        assert!(out.contains("3735928559 ; 0xdeadbeef"), "out was: {}", out);
    }

    #[test]
    fn test_header_reports_count_and_depth() {
        let source = "t*(42&t>>10)";
        let out = format_program(source, &compile(source).unwrap());
        assert!(out.contains(source));
        assert!(
            out.contains("7 instructions, peak stack depth 4"),
            "out was: {}",
            out
        );
        assert!(out.ends_with("0006  MUL\n"), "out was: {}", out);
    }

    #[test]
    fn test_header_flags_deep_programs() {
        let source = "1+(2+(3+(4+(5+(6+(7+(8+9)))))))";
        let out = format_program(source, &compile(source).unwrap());
        assert!(out.contains("peak stack depth 9 (exceeds 8)"), "out was: {}", out);
    }

    #[test]
    fn test_header_reports_malformed_programs() {
        let program = Program::from_ops(&[Op::Add]).unwrap();
        let out = format_program("<image>", &program);
        assert!(out.contains("underflow"), "out was: {}", out);
        assert!(out.contains("0000  ADD"));
    }
}
