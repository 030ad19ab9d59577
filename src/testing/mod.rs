use crate::{
    address, config,
    emu::{Program, ProgramEmulator, ProgramInstruction},
    kernel::KernelLaunch,
    memory::{AccessKind, Memory, Witness},
};
use std::collections::VecDeque;

static LOGGER: std::sync::Once = std::sync::Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        env_logger::builder().is_test(true).init();
    });
}

/// Memory whose accesses only complete when the test says so.
#[derive(Debug, Default)]
pub struct ManualMemory {
    pending: VecDeque<(AccessKind, address, Witness)>,
    /// Refuse all new accesses
    pub blocked: bool,
}

impl ManualMemory {
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Completes the oldest access.
    pub fn complete_one(&mut self) -> Option<(AccessKind, address)> {
        let (kind, addr, witness) = self.pending.pop_front()?;
        witness.complete();
        Some((kind, addr))
    }

    pub fn complete_all(&mut self) {
        while self.complete_one().is_some() {}
    }
}

impl Memory for ManualMemory {
    fn can_access(&self, _kind: AccessKind, _addr: address) -> bool {
        !self.blocked
    }

    fn access(&mut self, kind: AccessKind, addr: address, _size: u32, witness: Witness) {
        self.pending.push_back((kind, addr, witness));
    }

    fn cycle(&mut self, _cycle: u64) {}

    fn inflight(&self) -> usize {
        self.pending.len()
    }
}

/// Small Southern Islands compute unit used across tests.
///
/// Two wavefront pools of four entries each, with unit latencies so
/// schedules stay easy to follow.
#[must_use]
pub fn small_config() -> config::GPU {
    config::GPU {
        num_compute_units: 1,
        num_wavefront_pools: 2,
        max_work_groups_per_wavefront_pool: 2,
        max_wavefronts_per_wavefront_pool: 4,
        stall_cycles: 1_000,
        front_end: config::FrontEnd {
            fetch_latency: 1,
            fetch_width: 4,
            fetch_buffer_size: 4,
            issue_latency: 1,
            issue_width: 5,
            max_inst_issued_per_type: 1,
        },
        ..config::GPU::default()
    }
}

/// Program replaying `asm` for a kernel of the given shape.
#[must_use]
pub fn program(num_work_groups: usize, threads_per_work_group: usize, asm: &[&str]) -> Program {
    Program {
        kernel: KernelLaunch {
            num_work_groups,
            threads_per_work_group,
            ..KernelLaunch::default()
        },
        instructions: asm.iter().copied().map(ProgramInstruction::new).collect(),
    }
}

pub fn emulator(config: &config::GPU, program: &Program) -> ProgramEmulator {
    match ProgramEmulator::new(config.arch, program) {
        Ok(emulator) => emulator,
        Err(err) => panic!("invalid test program: {err}"),
    }
}
