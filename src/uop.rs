use crate::{
    instruction::MemAccess,
    memory::{AccessKind, Witness},
    opcodes::{Category, Opcode},
};
use serde::Serialize;

/// Cycles at which a uop may leave each pipeline stage.
///
/// Stamped on admission into each stage, so they never decrease along the
/// pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Timestamps {
    pub fetch_ready: u64,
    pub issue_ready: u64,
    pub decode_ready: u64,
    pub read_ready: u64,
    pub execute_ready: u64,
    pub write_ready: u64,
}

impl Timestamps {
    #[must_use]
    pub fn as_array(&self) -> [u64; 6] {
        [
            self.fetch_ready,
            self.issue_ready,
            self.decode_ready,
            self.read_ready,
            self.execute_ready,
            self.write_ready,
        ]
    }

    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.as_array().windows(2).all(|w| w[0] <= w[1])
    }
}

/// Classification flags derived from the opcode at fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    pub branch: bool,
    pub vector_mem_read: bool,
    pub vector_mem_write: bool,
    pub vector_mem_atomic: bool,
    pub lds_read: bool,
    pub lds_write: bool,
    pub lds_atomic: bool,
    pub scalar_mem_read: bool,
    pub mem_wait: bool,
    pub barrier: bool,
}

impl From<&Opcode> for Flags {
    fn from(opcode: &Opcode) -> Self {
        Self {
            branch: opcode.is_branch(),
            vector_mem_read: opcode.is_vector_mem_read(),
            vector_mem_write: opcode.is_vector_mem_write(),
            vector_mem_atomic: opcode.is_vector_mem_read() && opcode.is_vector_mem_write(),
            lds_read: opcode.is_lds_read(),
            lds_write: opcode.is_lds_write(),
            lds_atomic: opcode.is_lds_read() && opcode.is_lds_write(),
            scalar_mem_read: opcode.is_scalar_mem_read(),
            mem_wait: opcode.is_mem_wait(),
            barrier: opcode.is_barrier(),
        }
    }
}

/// One fetched instruction of one wavefront.
#[derive(Debug, Clone)]
pub struct Uop {
    /// Unique across the device
    pub id: u64,
    pub id_in_compute_unit: u64,
    pub id_in_wavefront: u64,
    pub compute_unit_id: usize,
    pub work_group_id: u64,
    /// Slot of the owning work-group in the compute unit
    pub work_group_slot: usize,
    pub wavefront_id: u64,
    /// Index of the owning wavefront within its work-group
    pub wavefront_index: usize,
    pub pool_id: usize,
    pub entry_id: usize,

    pub opcode: Opcode,
    pub asm: String,
    pub category: Option<Category>,
    pub flags: Flags,
    pub last_instruction: bool,

    pub ready: Timestamps,
    pub witness: Witness,
    pub accesses: Vec<MemAccess>,
    /// Number of `accesses` handed to memory so far
    pub accesses_issued: usize,
}

impl std::fmt::Display for Uop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "uop[{}] wf={} {:?}: {}",
            self.id,
            self.wavefront_id,
            self.category,
            self.asm
        )
    }
}

impl Uop {
    /// Kind of the memory accesses this uop issues, if any.
    #[must_use]
    pub fn access_kind(&self) -> Option<AccessKind> {
        let flags = &self.flags;
        if flags.vector_mem_atomic {
            Some(AccessKind::Atomic)
        } else if flags.vector_mem_write {
            Some(AccessKind::Store)
        } else if flags.vector_mem_read {
            Some(AccessKind::Load)
        } else if flags.lds_atomic {
            Some(AccessKind::LdsAtomic)
        } else if flags.lds_write {
            Some(AccessKind::LdsStore)
        } else if flags.lds_read {
            Some(AccessKind::LdsLoad)
        } else if flags.scalar_mem_read {
            Some(AccessKind::ScalarLoad)
        } else {
            None
        }
    }

    #[must_use]
    pub fn all_accesses_issued(&self) -> bool {
        self.access_kind().is_none() || self.accesses_issued >= self.accesses.len()
    }

    /// Uops that keep the wavefront from fetching until they complete.
    ///
    /// Everything else releases the wavefront one cycle after issue.
    #[must_use]
    pub fn blocks_fetch_until_complete(&self) -> bool {
        match self.category {
            Some(Category::Branch) => true,
            Some(Category::Scalar) => !self.flags.scalar_mem_read,
            _ => self.flags.barrier || self.flags.mem_wait || self.last_instruction,
        }
    }
}

/// Free list of uops owned by one compute unit.
///
/// Freed uops keep their access buffer, so steady state fetch does not
/// allocate.
#[derive(Debug, Default)]
pub struct Pool {
    free: Vec<Uop>,
    live: usize,
    max_free: usize,
}

impl Pool {
    #[must_use]
    pub fn new(max_free: usize) -> Self {
        Self {
            free: Vec::with_capacity(max_free),
            live: 0,
            max_free,
        }
    }

    /// Allocates a uop built by `new` from a recycled access buffer.
    pub fn alloc(&mut self, new: impl FnOnce(Vec<MemAccess>) -> Uop) -> Uop {
        let accesses = match self.free.pop() {
            Some(uop) => {
                let mut accesses = uop.accesses;
                accesses.clear();
                accesses
            }
            None => Vec::new(),
        };
        self.live += 1;
        new(accesses)
    }

    pub fn free(&mut self, uop: Uop) {
        assert!(self.live > 0, "freed {uop} that was never allocated");
        self.live -= 1;
        if self.free.len() < self.max_free {
            self.free.push(uop);
        }
    }

    /// Number of allocated uops not returned yet.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Flags, Pool, Timestamps, Uop};
    use crate::{config::Arch, instruction::MemAccess, memory::AccessKind, opcodes};

    pub(crate) fn uop(asm: &str, accesses: Vec<MemAccess>) -> Uop {
        let opcode = *opcodes::lookup(Arch::SouthernIslands, asm).unwrap();
        Uop {
            id: 0,
            id_in_compute_unit: 0,
            id_in_wavefront: 0,
            compute_unit_id: 0,
            work_group_id: 0,
            work_group_slot: 0,
            wavefront_id: 0,
            wavefront_index: 0,
            pool_id: 0,
            entry_id: 0,
            category: opcode.unit(true),
            flags: Flags::from(&opcode),
            opcode,
            asm: asm.to_string(),
            last_instruction: false,
            ready: Timestamps::default(),
            witness: crate::memory::Witness::new(),
            accesses,
            accesses_issued: 0,
        }
    }

    #[test]
    fn test_pool_recycles_access_buffers() {
        let mut pool = Pool::new(4);
        let access = MemAccess {
            lane: 0,
            addr: 0x40,
            size: 4,
        };
        let first = pool.alloc(|accesses| uop("buffer_load_dword", {
            let mut accesses = accesses;
            accesses.push(access);
            accesses
        }));
        assert_eq!(pool.live(), 1);
        pool.free(first);
        assert_eq!(pool.live(), 0);

        let second = pool.alloc(|accesses| {
            assert!(accesses.is_empty());
            assert!(accesses.capacity() >= 1);
            uop("v_add_f32", accesses)
        });
        assert_eq!(pool.live(), 1);
        pool.free(second);
    }

    #[test]
    fn test_access_kind_and_fetch_gating() {
        let load = uop("buffer_load_dword", vec![]);
        assert_eq!(load.access_kind(), Some(AccessKind::Load));
        assert!(!load.blocks_fetch_until_complete());

        let atomic = uop("buffer_atomic_add", vec![]);
        assert_eq!(atomic.access_kind(), Some(AccessKind::Atomic));

        let lds_atomic = uop("ds_add_u32", vec![]);
        assert_eq!(lds_atomic.access_kind(), Some(AccessKind::LdsAtomic));
        assert!(AccessKind::LdsAtomic.is_lds());
        assert_eq!(uop("ds_write_b32", vec![]).access_kind(), Some(AccessKind::LdsStore));

        let smem = uop("s_load_dword", vec![]);
        assert_eq!(smem.access_kind(), Some(AccessKind::ScalarLoad));
        assert!(!smem.blocks_fetch_until_complete());

        assert!(uop("s_mov_b32", vec![]).blocks_fetch_until_complete());
        assert!(uop("s_waitcnt", vec![]).blocks_fetch_until_complete());
        assert!(uop("s_cbranch_scc0", vec![]).blocks_fetch_until_complete());
        assert!(!uop("v_mul_f32", vec![]).blocks_fetch_until_complete());
    }

    #[test]
    fn test_monotonic_timestamps() {
        let mut ready = Timestamps {
            fetch_ready: 5,
            issue_ready: 6,
            decode_ready: 7,
            read_ready: 7,
            execute_ready: 15,
            write_ready: 15,
        };
        assert!(ready.is_monotonic());
        ready.read_ready = 4;
        assert!(!ready.is_monotonic());
    }
}
