use crate::{
    config::Arch,
    instruction::{Instruction, MemAccess},
    kernel::KernelLaunch,
    opcodes::{self, Opcode},
    wavefront::Wavefront,
};
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("wavefront {wavefront} ran past the end of the program")]
    ProgramExhausted { wavefront: u64 },
    #[error("unknown {arch:?} instruction {asm:?}")]
    UnknownInstruction { arch: Arch, asm: String },
    #[error("{accesses_per_lane} accesses per lane exceed the maximum of 4 for {asm:?}")]
    TooManyLaneAccesses { asm: String, accesses_per_lane: usize },
}

/// Functional model producing the next instruction of a wavefront.
///
/// Implementations advance `wavefront.pc` and set `wavefront.finished`
/// once the last instruction was returned.
pub trait Emulator: std::fmt::Debug {
    fn execute(&mut self, wavefront: &mut Wavefront) -> Result<Instruction, Error>;
}

/// Addresses touched by a memory instruction.
///
/// The address of access `k` of `lane` is `base + work_group *
/// stride_work_group + wavefront * stride_wavefront + lane * stride_lane +
/// k * size`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPattern {
    pub base: u64,
    pub stride_work_group: u64,
    pub stride_wavefront: u64,
    pub stride_lane: u64,
    pub size: u32,
    pub accesses_per_lane: usize,
}

impl Default for AccessPattern {
    fn default() -> Self {
        Self {
            base: 0,
            stride_work_group: 0,
            stride_wavefront: 0,
            stride_lane: 4,
            size: 4,
            accesses_per_lane: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramInstruction {
    pub asm: String,
    #[serde(default)]
    pub access: Option<AccessPattern>,
}

impl ProgramInstruction {
    #[must_use]
    pub fn new(asm: impl Into<String>) -> Self {
        Self {
            asm: asm.into(),
            access: None,
        }
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessPattern) -> Self {
        self.access = Some(access);
        self
    }
}

/// A kernel launch and the instruction sequence every wavefront executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub kernel: KernelLaunch,
    pub instructions: Vec<ProgramInstruction>,
}

impl Program {
    pub fn from_yaml(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let program: Self = serde_yaml::from_reader(reader)
            .map_err(|err| eyre::eyre!("failed to parse program {}: {err}", path.display()))?;
        eyre::ensure!(
            !program.instructions.is_empty(),
            "program {} has no instructions",
            path.display()
        );
        Ok(program)
    }
}

/// Replays a [`Program`] for every wavefront.
#[derive(Debug, Clone)]
pub struct ProgramEmulator {
    instructions: Vec<(Opcode, ProgramInstruction)>,
}

impl ProgramEmulator {
    pub fn new(arch: Arch, program: &Program) -> Result<Self, Error> {
        let instructions = program
            .instructions
            .iter()
            .map(|inst| {
                let opcode = opcodes::lookup(arch, &inst.asm).ok_or_else(|| {
                    Error::UnknownInstruction {
                        arch,
                        asm: inst.asm.clone(),
                    }
                })?;
                if let Some(access) = &inst.access {
                    if access.accesses_per_lane > 4 {
                        return Err(Error::TooManyLaneAccesses {
                            asm: inst.asm.clone(),
                            accesses_per_lane: access.accesses_per_lane,
                        });
                    }
                }
                Ok((*opcode, inst.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { instructions })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

fn accesses(
    opcode: &Opcode,
    pattern: &AccessPattern,
    wavefront: &Wavefront,
    out: &mut Vec<MemAccess>,
) {
    let touches_memory = opcode.is_vector_mem_read()
        || opcode.is_vector_mem_write()
        || opcode.is_lds_read()
        || opcode.is_lds_write()
        || opcode.is_scalar_mem_read();
    if !touches_memory {
        return;
    }
    let wavefront_base = pattern.base
        + wavefront.work_group_id * pattern.stride_work_group
        + wavefront.id_in_work_group as u64 * pattern.stride_wavefront;

    // scalar loads are issued once per wavefront
    let lanes: Vec<usize> = if opcode.is_scalar_mem_read() {
        vec![0]
    } else {
        wavefront.active_mask.iter_ones().collect()
    };
    let per_lane = if opcode.is_lds_read() || opcode.is_lds_write() {
        pattern.accesses_per_lane.max(1)
    } else {
        1
    };
    for lane in lanes {
        for k in 0..per_lane {
            out.push(MemAccess {
                lane,
                addr: wavefront_base
                    + lane as u64 * pattern.stride_lane
                    + k as u64 * u64::from(pattern.size),
                size: pattern.size,
            });
        }
    }
}

impl Emulator for ProgramEmulator {
    fn execute(&mut self, wavefront: &mut Wavefront) -> Result<Instruction, Error> {
        let Some((opcode, inst)) = self.instructions.get(wavefront.pc) else {
            return Err(Error::ProgramExhausted {
                wavefront: wavefront.id,
            });
        };
        let mut out = Vec::new();
        if let Some(pattern) = &inst.access {
            accesses(opcode, pattern, wavefront, &mut out);
        }
        wavefront.pc += 1;
        if opcode.is_exit() || wavefront.pc == self.instructions.len() {
            wavefront.finished = true;
        }
        log::trace!("emulated {} pc={}: {}", wavefront, wavefront.pc - 1, inst.asm);
        Ok(Instruction {
            opcode: *opcode,
            asm: inst.asm.clone(),
            accesses: out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessPattern, Emulator, Error, Program, ProgramEmulator, ProgramInstruction};
    use crate::{config::Arch, kernel::KernelLaunch, wavefront::WorkGroup};
    use color_eyre::eyre;

    fn program(instructions: Vec<ProgramInstruction>) -> Program {
        Program {
            kernel: KernelLaunch::default(),
            instructions,
        }
    }

    #[test]
    fn test_replay_sets_finished_on_last_instruction() -> eyre::Result<()> {
        let mut emu = ProgramEmulator::new(
            Arch::SouthernIslands,
            &program(vec![
                ProgramInstruction::new("v_mov_b32 v0, 0"),
                ProgramInstruction::new("s_endpgm"),
            ]),
        )?;
        let mut wg = WorkGroup::new(0, 0, 64, 64, 0);
        let wavefront = &mut wg.wavefronts[0];
        let first = emu.execute(wavefront)?;
        assert_eq!(first.asm, "v_mov_b32 v0, 0");
        assert!(!wavefront.finished);
        emu.execute(wavefront)?;
        assert!(wavefront.finished);
        assert_eq!(
            emu.execute(wavefront),
            Err(Error::ProgramExhausted { wavefront: 0 })
        );
        Ok(())
    }

    #[test]
    fn test_access_pattern_addresses() -> eyre::Result<()> {
        let load = ProgramInstruction::new("buffer_load_dword v1, v0").with_access(AccessPattern {
            base: 0x1000,
            stride_work_group: 0x100,
            stride_wavefront: 0x10,
            stride_lane: 4,
            size: 4,
            accesses_per_lane: 1,
        });
        let mut emu = ProgramEmulator::new(Arch::SouthernIslands, &program(vec![load]))?;
        let mut wg = WorkGroup::new(2, 0, 68, 64, 0);
        let inst = emu.execute(&mut wg.wavefronts[1])?;
        assert_eq!(inst.accesses.len(), 4);
        assert_eq!(inst.active_lanes(), 4);
        assert_eq!(inst.accesses[0].addr, 0x1000 + 0x200 + 0x10);
        assert_eq!(inst.accesses[3].addr, 0x1000 + 0x200 + 0x10 + 12);
        Ok(())
    }

    #[test]
    fn test_lds_accesses_per_lane() -> eyre::Result<()> {
        let read2 = ProgramInstruction::new("ds_read2_b32 v0, v1").with_access(AccessPattern {
            stride_lane: 8,
            accesses_per_lane: 2,
            ..AccessPattern::default()
        });
        let mut emu = ProgramEmulator::new(Arch::SouthernIslands, &program(vec![read2]))?;
        let mut wg = WorkGroup::new(0, 0, 2, 64, 0);
        let inst = emu.execute(&mut wg.wavefronts[0])?;
        let addrs: Vec<_> = inst.accesses.iter().map(|a| (a.lane, a.addr)).collect();
        assert_eq!(addrs, vec![(0, 0), (0, 4), (1, 8), (1, 12)]);
        Ok(())
    }

    #[test]
    fn test_unknown_instruction() {
        let err = ProgramEmulator::new(
            Arch::Fermi,
            &program(vec![ProgramInstruction::new("v_add_f32 v0, v1, v2")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownInstruction { arch: Arch::Fermi, .. }));
    }
}
