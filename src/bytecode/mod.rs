pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod op;
pub mod stack_check;

pub use compile::{compile, compile_into};
pub use compile_error::CompileError;
pub use ir::{ImageError, PROGRAM_CAPACITY, Program};
pub use op::Op;
