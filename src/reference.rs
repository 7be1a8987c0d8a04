//! Regression oracle: expressions with a hand-written native equivalent.
//!
//! Each case is compiled and run through the evaluator, and the low 8 bits
//! (what ends up as audio) are compared against the native function over a
//! sweep of counter values.

use crate::bytecode::{CompileError, compile};
use crate::runtime::vm::sample_byte;

/// Mismatches kept in a report for display.
pub const MAX_RECORDED_MISMATCHES: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceCase {
    pub name: &'static str,
    pub source: &'static str,
    pub native: fn(u32) -> u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub t: u32,
    pub expected: u32,
    pub actual: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub name: &'static str,
    pub instructions: usize,
    pub samples: u32,
    pub mismatches: u32,
    /// The first few mismatches, in counter order.
    pub recorded: Vec<Mismatch>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }

    pub fn first_mismatch(&self) -> Option<&Mismatch> {
        self.recorded.first()
    }
}

pub const REFERENCE_CASES: [ReferenceCase; 8] = [
    ReferenceCase {
        name: "Complex expression 1",
        source: "t*(0xdeadbeef>>(t>>11)&15)/2|t>>3|t>>(t>>10)",
        native: |t| {
            (t.wrapping_mul(0xdead_beef_u32.wrapping_shr(t >> 11) & 15) / 2)
                | (t >> 3)
                | t.wrapping_shr(t >> 10)
        },
    },
    ReferenceCase {
        name: "Complex expression 2",
        source: "t*((0xdeadbeef>>(15&t>>10)*4&15))",
        native: |t| t.wrapping_mul(0xdead_beef_u32.wrapping_shr((15 & (t >> 10)) * 4) & 15),
    },
    ReferenceCase {
        name: "Simple t*t>>8",
        source: "t*t>>8",
        native: |t| t.wrapping_mul(t) >> 8,
    },
    ReferenceCase {
        name: "Bitwise operations",
        source: "(t>>10&42)*t",
        native: |t| ((t >> 10) & 42).wrapping_mul(t),
    },
    ReferenceCase {
        name: "OR operations",
        source: "t*(t>>8|t>>9)",
        native: |t| t.wrapping_mul((t >> 8) | (t >> 9)),
    },
    ReferenceCase {
        name: "Complex shifts",
        source: "(t>>6|t|t>>(t>>16))*10+((t>>11)&7)",
        native: |t| {
            ((t >> 6) | t | t.wrapping_shr(t >> 16))
                .wrapping_mul(10)
                .wrapping_add((t >> 11) & 7)
        },
    },
    ReferenceCase {
        name: "Multiple OR",
        source: "t|(t>>9|t>>7)",
        native: |t| t | ((t >> 9) | (t >> 7)),
    },
    ReferenceCase {
        name: "Mask operations",
        source: "t*5&t>>7|t*3&t>>10",
        native: |t| (t.wrapping_mul(5) & (t >> 7)) | (t.wrapping_mul(3) & (t >> 10)),
    },
];

/// Compiles `case` and compares it with its native function for
/// `samples` counter values starting at `start` (wrapping).
pub fn run_case(case: &ReferenceCase, start: u32, samples: u32) -> Result<CaseReport, CompileError> {
    let program = compile(case.source)?;

    let mut report = CaseReport {
        name: case.name,
        instructions: program.len(),
        samples,
        mismatches: 0,
        recorded: Vec::new(),
    };

    for i in 0..samples {
        let t = start.wrapping_add(i);
        let expected = (case.native)(t);
        let actual = program.evaluate(t);

        if sample_byte(expected) != sample_byte(actual) {
            report.mismatches += 1;
            if report.recorded.len() < MAX_RECORDED_MISMATCHES {
                report.recorded.push(Mismatch { t, expected, actual });
            }
        }
    }

    Ok(report)
}
