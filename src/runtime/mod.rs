pub mod player;
pub mod slots;
pub mod vm;

pub use player::{Player, PlayerConfig, SampleCounter};
pub use slots::{ProgramReader, ProgramWriter, program_slots};
pub use vm::{EVAL_STACK_CAPACITY, evaluate, sample_byte};
