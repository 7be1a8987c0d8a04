//! Bytebeat expression compiler and real-time evaluator.
//!
//! Source text such as `t*(42&t>>10)` is compiled by a shunting-yard pass
//! into a short postfix [`Program`], which a fixed-stack evaluator runs
//! once per sample. [`runtime::program_slots`] hands freshly compiled
//! programs to the sample loop without locking it.

pub mod bytecode;
pub mod frontend;
pub mod presets;
pub mod reference;
pub mod runtime;

pub use bytecode::{CompileError, Op, Program, compile, compile_into};
pub use runtime::{ProgramReader, ProgramWriter, evaluate, program_slots};
