use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, warn};

use crate::bytecode::compile::compile_into;
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::Program;
use crate::bytecode::stack_check::peak_depth;
use crate::runtime::vm::EVAL_STACK_CAPACITY;

/// `in_use` value when the reader holds no slot.
const NONE: usize = usize::MAX;

struct Shared {
    slots: [UnsafeCell<Program>; 2],
    /// Slot the reader should use.
    active: AtomicUsize,
    /// Slot the reader is currently evaluating, or `NONE`.
    in_use: AtomicUsize,
}

// SAFETY: Shared is Sync because:
// - Only the single ProgramWriter mutates a slot, and only the slot that is
//   neither `active` nor marked `in_use`
// - The single ProgramReader only reads the slot it has marked `in_use` and
//   confirmed is `active`
// - Both handles are !Clone, so there is exactly one of each
unsafe impl Sync for Shared {}

/// Creates an empty slot pair and returns its two ends.
///
/// The reader starts out seeing an empty program, which evaluates to 0.
pub fn program_slots() -> (ProgramWriter, ProgramReader) {
    let shared = Arc::new(Shared {
        slots: [UnsafeCell::new(Program::new()), UnsafeCell::new(Program::new())],
        active: AtomicUsize::new(0),
        in_use: AtomicUsize::new(NONE),
    });

    (
        ProgramWriter {
            shared: Arc::clone(&shared),
        },
        ProgramReader { shared },
    )
}

/// Control-side handle: compiles into the inactive slot and publishes it.
pub struct ProgramWriter {
    shared: Arc<Shared>,
}

impl ProgramWriter {
    /// Runs `f` on the inactive slot and, if it succeeds, makes that slot
    /// active. On error the active program is left as it was.
    ///
    /// May yield while the reader is still finishing with the slot; never
    /// call this from the real-time side.
    pub fn publish_with<T, E>(
        &mut self,
        f: impl FnOnce(&mut Program) -> Result<T, E>,
    ) -> Result<T, E> {
        let target = 1 - self.shared.active.load(Ordering::Acquire);

        while self.shared.in_use.load(Ordering::SeqCst) == target {
            thread::yield_now();
        }

        // SAFETY: `target` is not active, and the reader is not holding it
        // (checked above). The reader can only start holding `target` after
        // it becomes active again, which only this handle can cause.
        let slot = unsafe { &mut *self.shared.slots[target].get() };

        let value = f(slot)?;

        // SeqCst pairs with the reader's in_use store / active reload.
        self.shared.active.store(target, Ordering::SeqCst);
        Ok(value)
    }

    /// Copies `program` into the inactive slot and publishes it.
    pub fn publish(&mut self, program: &Program) {
        let _ = self.publish_with(|slot| {
            *slot = *program;
            Ok::<(), std::convert::Infallible>(())
        });
    }

    /// Compiles `source` straight into the inactive slot and publishes it.
    ///
    /// A failed compile keeps the previously published program.
    pub fn compile(&mut self, source: &str) -> Result<usize, CompileError> {
        let result: Result<usize, CompileError> = self.publish_with(|slot| {
            let count = compile_into(source, slot)?;

            if let Ok(depth) = peak_depth(slot.ops()) {
                if depth > EVAL_STACK_CAPACITY {
                    warn!(
                        source,
                        depth,
                        capacity = EVAL_STACK_CAPACITY,
                        "program needs a deeper stack than the evaluator has; extra pushes will be dropped"
                    );
                }
            }
            Ok(count)
        });

        match &result {
            Ok(count) => debug!(source, instructions = count, "published program"),
            Err(e) => warn!(
                source,
                error = %e,
                kind = e.name(),
                "compile failed; keeping previous program"
            ),
        }
        result
    }

    /// Copy of the currently published program.
    pub fn published(&self) -> Program {
        let active = self.shared.active.load(Ordering::Acquire);
        // SAFETY: only this handle mutates slots, and never the active one.
        unsafe { *self.shared.slots[active].get() }
    }
}

/// Real-time handle: reads the active program without blocking.
pub struct ProgramReader {
    shared: Arc<Shared>,
}

impl ProgramReader {
    /// Runs `f` on the currently published program.
    ///
    /// Never blocks, locks or allocates. The program seen by `f` is always
    /// one complete published version.
    pub fn with_current<R>(&mut self, f: impl FnOnce(&Program) -> R) -> R {
        let shared = &*self.shared;

        let mut idx = shared.active.load(Ordering::Acquire);
        loop {
            shared.in_use.store(idx, Ordering::SeqCst);
            // re-check: the writer may have flipped between load and mark
            let now = shared.active.load(Ordering::SeqCst);
            if now == idx {
                break;
            }
            idx = now;
        }

        // SAFETY: `idx` is marked in_use and was active after the mark was
        // visible, so the writer will not pick it as a target until the
        // mark is cleared below.
        let program = unsafe { &*shared.slots[idx].get() };
        let result = f(program);

        shared.in_use.store(NONE, Ordering::Release);
        result
    }

    /// Evaluates the current program at `t`.
    pub fn evaluate(&mut self, t: u32) -> u32 {
        self.with_current(|program| program.evaluate(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::Op;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_starts_empty() {
        let (_writer, mut reader) = program_slots();
        assert!(reader.with_current(|p| p.is_empty()));
        assert_eq!(reader.evaluate(123), 0);
    }

    #[test]
    fn test_compile_publishes() {
        let (mut writer, mut reader) = program_slots();
        assert_eq!(writer.compile("t*2"), Ok(3));
        assert_eq!(reader.evaluate(21), 42);

        writer.compile("t+1").unwrap();
        assert_eq!(reader.evaluate(21), 22);
        assert_eq!(writer.published().ops(), &[Op::PushT, Op::PushNum(1), Op::Add]);
    }

    #[test]
    fn test_failed_compile_keeps_previous_program() {
        let (mut writer, mut reader) = program_slots();
        writer.compile("t>>1").unwrap();

        let err = writer.compile("(t>>2").unwrap_err();
        assert!(matches!(err, CompileError::UnbalancedParen { .. }));
        assert_eq!(reader.evaluate(10), 5);

        // the failed attempt must not poison the next one
        writer.compile("t>>3").unwrap();
        assert_eq!(reader.evaluate(16), 2);
    }

    #[test]
    fn test_publish_with_error_leaves_active_slot() {
        let (mut writer, mut reader) = program_slots();
        writer.compile("7").unwrap();

        let result: Result<(), &str> = writer.publish_with(|slot| {
            slot.clear();
            slot.push(Op::PushNum(99)).unwrap();
            Err("nope")
        });
        assert_eq!(result, Err("nope"));
        assert_eq!(reader.evaluate(0), 7);
    }

    #[test]
    fn test_publish_copies_program() {
        let (mut writer, mut reader) = program_slots();
        let program = Program::from_ops(&[Op::PushNum(5), Op::Not]).unwrap();
        writer.publish(&program);
        assert_eq!(reader.evaluate(0), !5);
        assert_eq!(writer.published(), program);
    }

    #[test]
    fn test_handles_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ProgramWriter>();
        assert_send::<ProgramReader>();
    }

    /// Program `n` holds `1 + n % 32` copies of `PushNum(n)`, so a reader
    /// can tell a complete program from a torn one.
    fn marker_program(n: u32) -> Program {
        let len = 1 + (n as usize % crate::bytecode::ir::PROGRAM_CAPACITY);
        Program::from_ops(&vec![Op::PushNum(n); len]).unwrap()
    }

    #[test]
    fn test_reader_only_sees_complete_programs() {
        const PUBLISHES: u32 = 20_000;

        let (mut writer, mut reader) = program_slots();
        writer.publish(&marker_program(0));
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                let mut last = 0;
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) || reads == 0 {
                    let seen = reader.with_current(|program| {
                        let ops = program.ops();
                        let Op::PushNum(n) = ops[0] else {
                            panic!("unexpected op {:?}", ops[0]);
                        };
                        assert_eq!(ops.len(), 1 + (n as usize % 32), "torn length for {}", n);
                        assert!(ops.iter().all(|op| *op == Op::PushNum(n)), "torn ops for {}", n);
                        n
                    });
                    assert!(seen >= last, "went backwards: {} after {}", seen, last);
                    last = seen;
                    reads += 1;
                }
            });

            for n in 1..=PUBLISHES {
                writer.publish(&marker_program(n));
            }
            done.store(true, Ordering::Release);
        });

        assert_eq!(writer.published(), marker_program(PUBLISHES));
    }
}
