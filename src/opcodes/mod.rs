pub mod fermi;
pub mod southern_islands;

use crate::config::Arch;

/// Instruction opcodes for all modeled hardware generations.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    SouthernIslands(southern_islands::op::Op),
    Fermi(fermi::op::Op),
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::SouthernIslands(op) => op.fmt(f),
            Op::Fermi(op) => op.fmt(f),
        }
    }
}

/// Instruction class.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArchOp {
    /// Branches and jumps
    BRANCH_OP,
    /// Vector ALU
    ALU_OP,
    /// Scalar ALU
    SCALAR_ALU_OP,
    /// Scalar memory read
    SCALAR_LOAD_OP,
    /// Global memory load
    LOAD_OP,
    /// Global memory store
    STORE_OP,
    /// Global memory atomic
    ATOMIC_OP,
    /// Local data share load
    LDS_LOAD_OP,
    /// Local data share store
    LDS_STORE_OP,
    /// Local data share atomic
    LDS_ATOMIC_OP,
    /// Work-group barrier
    BARRIER_OP,
    /// Wait for outstanding memory counters
    WAITCNT_OP,
    /// End of program
    EXIT_OP,
    /// Export to fixed-function hardware, which is not modeled
    EXPORT_OP,
}

/// Functional unit class a uop is issued to.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::EnumIter,
    strum::AsRefStr,
    strum::Display,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Category {
    Branch,
    Scalar,
    Simd,
    VectorMemory,
    Lds,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Opcode {
    pub op: Op,
    pub category: ArchOp,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self.op)
    }
}

impl Opcode {
    /// Functional unit class of this opcode.
    ///
    /// Without a scalar unit, control instructions go to the branch unit,
    /// scalar arithmetic to the SIMD units and scalar loads to vector memory.
    /// Exports are not modeled and have no unit.
    #[must_use]
    pub fn unit(&self, has_scalar_unit: bool) -> Option<Category> {
        match (self.category, has_scalar_unit) {
            (ArchOp::BRANCH_OP, _) => Some(Category::Branch),
            (ArchOp::ALU_OP, _) => Some(Category::Simd),
            (ArchOp::LOAD_OP | ArchOp::STORE_OP | ArchOp::ATOMIC_OP, _) => {
                Some(Category::VectorMemory)
            }
            (ArchOp::LDS_LOAD_OP | ArchOp::LDS_STORE_OP | ArchOp::LDS_ATOMIC_OP, _) => {
                Some(Category::Lds)
            }
            (
                ArchOp::SCALAR_ALU_OP
                | ArchOp::SCALAR_LOAD_OP
                | ArchOp::BARRIER_OP
                | ArchOp::WAITCNT_OP
                | ArchOp::EXIT_OP,
                true,
            ) => Some(Category::Scalar),
            (ArchOp::SCALAR_ALU_OP, false) => Some(Category::Simd),
            (ArchOp::SCALAR_LOAD_OP, false) => Some(Category::VectorMemory),
            (ArchOp::BARRIER_OP | ArchOp::WAITCNT_OP | ArchOp::EXIT_OP, false) => {
                Some(Category::Branch)
            }
            (ArchOp::EXPORT_OP, _) => None,
        }
    }

    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.category == ArchOp::BRANCH_OP
    }

    #[must_use]
    pub fn is_vector_mem_read(&self) -> bool {
        matches!(self.category, ArchOp::LOAD_OP | ArchOp::ATOMIC_OP)
    }

    #[must_use]
    pub fn is_vector_mem_write(&self) -> bool {
        matches!(self.category, ArchOp::STORE_OP | ArchOp::ATOMIC_OP)
    }

    #[must_use]
    pub fn is_atomic(&self) -> bool {
        matches!(self.category, ArchOp::ATOMIC_OP | ArchOp::LDS_ATOMIC_OP)
    }

    #[must_use]
    pub fn is_lds_read(&self) -> bool {
        matches!(self.category, ArchOp::LDS_LOAD_OP | ArchOp::LDS_ATOMIC_OP)
    }

    #[must_use]
    pub fn is_lds_write(&self) -> bool {
        matches!(self.category, ArchOp::LDS_STORE_OP | ArchOp::LDS_ATOMIC_OP)
    }

    #[must_use]
    pub fn is_scalar_mem_read(&self) -> bool {
        self.category == ArchOp::SCALAR_LOAD_OP
    }

    #[must_use]
    pub fn is_barrier(&self) -> bool {
        self.category == ArchOp::BARRIER_OP
    }

    #[must_use]
    pub fn is_mem_wait(&self) -> bool {
        self.category == ArchOp::WAITCNT_OP
    }

    #[must_use]
    pub fn is_exit(&self) -> bool {
        self.category == ArchOp::EXIT_OP
    }
}

pub type OpcodeMap = phf::Map<&'static str, Opcode>;

#[must_use]
pub fn get_opcode_map(arch: Arch) -> &'static OpcodeMap {
    match arch {
        Arch::SouthernIslands => &southern_islands::OPCODES,
        Arch::Fermi => &fermi::OPCODES,
    }
}

/// Looks up the opcode of an assembly line by its mnemonic.
#[must_use]
pub fn lookup(arch: Arch, asm: &str) -> Option<&'static Opcode> {
    let mnemonic = asm.split_whitespace().next()?;
    get_opcode_map(arch).get(mnemonic)
}

#[cfg(test)]
mod tests {
    use super::{lookup, ArchOp, Category};
    use crate::config::Arch;

    #[test]
    fn test_southern_islands_units() {
        let unit = |asm| lookup(Arch::SouthernIslands, asm).and_then(|op| op.unit(true));
        assert_eq!(unit("s_cbranch_scc1 label"), Some(Category::Branch));
        assert_eq!(unit("v_add_f32 v0, v1, v2"), Some(Category::Simd));
        assert_eq!(unit("s_load_dwordx4 s[0:3], s[4:5], 0x0"), Some(Category::Scalar));
        assert_eq!(unit("s_waitcnt lgkmcnt(0)"), Some(Category::Scalar));
        assert_eq!(unit("tbuffer_load_format_x v1, v0"), Some(Category::VectorMemory));
        assert_eq!(unit("ds_write_b32 v0, v1"), Some(Category::Lds));
        assert_eq!(unit("exp mrt0 v0, v0, v0, v0"), None);
        assert_eq!(unit("not_an_instruction"), None);
    }

    #[test]
    fn test_fermi_units_without_scalar_unit() {
        let unit = |asm| lookup(Arch::Fermi, asm).and_then(|op| op.unit(false));
        assert_eq!(unit("BRA 0x40"), Some(Category::Branch));
        assert_eq!(unit("BAR.RED.POPC"), None);
        assert_eq!(unit("BAR"), Some(Category::Branch));
        assert_eq!(unit("EXIT"), Some(Category::Branch));
        assert_eq!(unit("FFMA R0, R1, R2, R3"), Some(Category::Simd));
        assert_eq!(unit("LDS R0, [R1]"), Some(Category::Lds));
        assert_eq!(unit("STG [R0], R1"), Some(Category::VectorMemory));
    }

    #[test]
    fn test_memory_flags() {
        let atomic = lookup(Arch::SouthernIslands, "buffer_atomic_add").copied();
        let atomic = atomic.map(|op| (op.category, op.is_vector_mem_read(), op.is_vector_mem_write()));
        assert_eq!(atomic, Some((ArchOp::ATOMIC_OP, true, true)));

        let lds = lookup(Arch::SouthernIslands, "ds_add_u32").copied();
        assert_eq!(lds.map(|op| (op.is_lds_read(), op.is_lds_write())), Some((true, true)));
    }
}
