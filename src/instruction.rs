use crate::{address, opcodes::Opcode};
use itertools::Itertools;

/// One memory access of a single lane.
///
/// Global accesses have at most one record per lane, LDS instructions up
/// to four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemAccess {
    pub lane: usize,
    pub addr: address,
    pub size: u32,
}

/// Decoded instruction of a wavefront as returned by the functional
/// emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub asm: String,
    pub accesses: Vec<MemAccess>,
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.asm)
    }
}

impl Instruction {
    /// Number of distinct lanes touching memory.
    #[must_use]
    pub fn active_lanes(&self) -> usize {
        self.accesses.iter().map(|access| access.lane).unique().count()
    }
}
