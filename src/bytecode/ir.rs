use crate::bytecode::Op;
use crate::bytecode::stack_check::{StackCheckError, check_ops};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of instructions in a compiled program.
pub const PROGRAM_CAPACITY: usize = 32;

/// Version tag written at the start of every bytecode image.
pub const IMAGE_VERSION: u16 = 1;

/// A compiled bytecode program.
///
/// Storage is inline so a program can live in a preallocated slot and be
/// read from a real-time thread without touching the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    ops: [Op; PROGRAM_CAPACITY],
    len: usize,
}

/// Returned by [`Program::push`] when the program already holds
/// [`PROGRAM_CAPACITY`] instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("program is full ({} instructions)", PROGRAM_CAPACITY)]
pub struct ProgramFull;

impl Program {
    pub const fn new() -> Self {
        Self {
            ops: [Op::PushT; PROGRAM_CAPACITY],
            len: 0,
        }
    }

    /// Builds a program from a slice, or `None` if it does not fit.
    pub fn from_ops(ops: &[Op]) -> Option<Self> {
        let mut program = Self::new();
        for op in ops {
            program.push(*op).ok()?;
        }
        Some(program)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, op: Op) -> Result<(), ProgramFull> {
        let slot = self.ops.get_mut(self.len).ok_or(ProgramFull)?;
        *slot = op;
        self.len += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Evaluates this program for one counter value.
    pub fn evaluate(&self, t: u32) -> u32 {
        crate::runtime::vm::evaluate(t, self.ops())
    }

    /// Encodes the program as a versioned postcard image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        let image = ProgramImage {
            version: IMAGE_VERSION,
            ops: self.ops().to_vec(),
        };
        Ok(postcard::to_allocvec(&image)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let image: ProgramImage = postcard::from_bytes(bytes)?;

        if image.version != IMAGE_VERSION {
            return Err(ImageError::UnsupportedVersion {
                found: image.version,
            });
        }

        let program = Self::from_ops(&image.ops).ok_or(ImageError::TooLong {
            len: image.ops.len(),
        })?;

        check_ops(program.ops())?;
        Ok(program)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk form of a [`Program`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgramImage {
    version: u16,
    ops: Vec<Op>,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("bytecode image codec error: {0}")]
    Codec(#[from] postcard::Error),

    #[error("unsupported bytecode image version {found} (expected {})", IMAGE_VERSION)]
    UnsupportedVersion { found: u16 },

    #[error("bytecode image holds {len} instructions (max {})", PROGRAM_CAPACITY)]
    TooLong { len: usize },

    #[error("malformed bytecode image: {0}")]
    Malformed(#[from] StackCheckError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut program = Program::new();
        for i in 0..PROGRAM_CAPACITY {
            program.push(Op::PushNum(i as u32)).unwrap();
        }
        assert_eq!(program.len(), PROGRAM_CAPACITY);
        assert_eq!(program.push(Op::Add), Err(ProgramFull));
        assert_eq!(program.len(), PROGRAM_CAPACITY);
    }

    #[test]
    fn test_clear_empties_program() {
        let mut program = Program::from_ops(&[Op::PushT, Op::PushT, Op::Mul]).unwrap();
        assert_eq!(program.len(), 3);
        program.clear();
        assert!(program.is_empty());
        assert!(program.ops().is_empty());
    }

    #[test]
    fn test_from_ops_rejects_oversized() {
        let ops = vec![Op::PushT; PROGRAM_CAPACITY + 1];
        assert!(Program::from_ops(&ops).is_none());
        assert!(Program::from_ops(&ops[..PROGRAM_CAPACITY]).is_some());
    }

    #[test]
    fn test_image_round_trip() {
        let program =
            Program::from_ops(&[Op::PushT, Op::PushNum(0xdead_beef), Op::Shr]).unwrap();
        let bytes = program.to_bytes().unwrap();
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
    }

    #[test]
    fn test_image_file_round_trip() {
        let program = crate::bytecode::compile("t*(42&t>>10)").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classic.bbc");
        std::fs::write(&path, program.to_bytes().unwrap()).unwrap();

        let loaded = Program::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, program);
        assert_eq!(loaded.evaluate(5000), program.evaluate(5000));
    }

    #[test]
    fn test_image_rejects_wrong_version() {
        let image = ProgramImage {
            version: IMAGE_VERSION + 1,
            ops: vec![Op::PushT],
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        let err = Program::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedVersion { found } if found == IMAGE_VERSION + 1));
    }

    #[test]
    fn test_image_rejects_too_many_ops() {
        let image = ProgramImage {
            version: IMAGE_VERSION,
            ops: vec![Op::PushT; PROGRAM_CAPACITY + 3],
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        let err = Program::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::TooLong { len } if len == PROGRAM_CAPACITY + 3));
    }

    #[test]
    fn test_image_rejects_unbalanced_stack() {
        let image = ProgramImage {
            version: IMAGE_VERSION,
            ops: vec![Op::PushT, Op::Add],
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        let err = Program::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::Malformed(ref e) if e.ip == 1), "err was: {}", err);

        let image = ProgramImage {
            version: IMAGE_VERSION,
            ops: vec![Op::PushT, Op::PushT],
        };
        let bytes = postcard::to_allocvec(&image).unwrap();
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(ImageError::Malformed(_))
        ));
    }

    #[test]
    fn test_image_rejects_garbage() {
        let err = Program::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ImageError::Codec(_)));
    }
}
