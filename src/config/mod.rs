pub mod fermi;

use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hardware generation the compute units model.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::AsRefStr,
)]
pub enum Arch {
    SouthernIslands,
    Fermi,
}

impl Arch {
    /// Prefix of the trace events, e.g. `si.new_inst`.
    #[must_use]
    pub fn trace_prefix(self) -> &'static str {
        match self {
            Self::SouthernIslands => "si",
            Self::Fermi => "frm",
        }
    }
}

/// Fetch and issue stage parameters shared by all wavefront pools.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontEnd {
    /// Cycles between fetch and the uop being visible to issue
    pub fetch_latency: u64,
    /// Maximum number of instructions fetched per compute unit and cycle
    pub fetch_width: usize,
    /// Capacity of each per-pool fetch buffer
    pub fetch_buffer_size: usize,
    /// Cycles an issued uop spends before it can be decoded
    pub issue_latency: u64,
    /// Maximum number of uops issued per fetch buffer and cycle
    pub issue_width: usize,
    /// Maximum number of uops issued per category and cycle
    pub max_inst_issued_per_type: usize,
}

impl Default for FrontEnd {
    fn default() -> Self {
        Self {
            fetch_latency: 5,
            fetch_width: 4,
            fetch_buffer_size: 10,
            issue_latency: 1,
            issue_width: 5,
            max_inst_issued_per_type: 1,
        }
    }
}

/// Stage parameters of one functional unit.
///
/// The SIMD unit only uses the issue, decode and exec parameters. For the
/// memory units, `exec_buffer_size` bounds the number of uops with accesses
/// in flight.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionalUnit {
    /// Uops moved per stage transition and cycle
    pub width: usize,
    pub issue_buffer_size: usize,
    pub decode_latency: u64,
    pub decode_buffer_size: usize,
    pub read_latency: u64,
    pub read_buffer_size: usize,
    pub exec_latency: u64,
    pub exec_buffer_size: usize,
    pub write_latency: u64,
    pub write_buffer_size: usize,
}

impl Default for FunctionalUnit {
    fn default() -> Self {
        Self {
            width: 1,
            issue_buffer_size: 1,
            decode_latency: 1,
            decode_buffer_size: 1,
            read_latency: 1,
            read_buffer_size: 1,
            exec_latency: 1,
            exec_buffer_size: 1,
            write_latency: 1,
            write_buffer_size: 1,
        }
    }
}

impl FunctionalUnit {
    #[must_use]
    pub fn simd() -> Self {
        Self {
            exec_latency: 8,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn scalar() -> Self {
        Self {
            exec_latency: 4,
            exec_buffer_size: 32,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn branch() -> Self {
        Self {
            exec_latency: 4,
            exec_buffer_size: 4,
            ..Self::default()
        }
    }

    /// LDS and vector memory units.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            exec_buffer_size: 32,
            ..Self::default()
        }
    }

    fn validate(&self, name: &str) -> eyre::Result<()> {
        eyre::ensure!(self.width > 0, "{name}: width must be positive");
        for (stage, size) in [
            ("issue", self.issue_buffer_size),
            ("decode", self.decode_buffer_size),
            ("read", self.read_buffer_size),
            ("exec", self.exec_buffer_size),
            ("write", self.write_buffer_size),
        ] {
            eyre::ensure!(size > 0, "{name}: {stage} buffer size must be positive");
        }
        Ok(())
    }
}

/// Timing configuration of the simulated device.
///
/// Defaults model a Southern Islands GPU.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GPU {
    pub arch: Arch,
    /// Number of compute units
    pub num_compute_units: usize,
    /// Stop after this many device cycles
    pub max_cycles: Option<u64>,
    /// Stop after this many fetched instructions
    pub max_instructions: Option<u64>,
    /// Finish with a stall once no uop completed for this many cycles
    pub stall_cycles: u64,

    /// Number of wavefront pools (and SIMD units) per compute unit
    pub num_wavefront_pools: usize,
    pub max_work_groups_per_wavefront_pool: usize,
    pub max_wavefronts_per_wavefront_pool: usize,
    /// Lanes per wavefront
    pub wavefront_size: usize,

    /// Vector registers per compute unit
    pub num_vector_registers: usize,
    /// Scalar registers per compute unit
    pub num_scalar_registers: usize,
    /// Register allocation granularity
    pub register_alloc_size: usize,
    /// LDS bytes per compute unit
    pub lds_size: usize,
    /// LDS allocation granularity in bytes
    pub lds_alloc_size: usize,

    pub front_end: FrontEnd,
    pub simd: FunctionalUnit,
    /// Generations without a scalar pipeline leave this unset
    pub scalar_unit: Option<FunctionalUnit>,
    pub branch_unit: FunctionalUnit,
    pub lds_unit: FunctionalUnit,
    pub vector_mem_unit: FunctionalUnit,
}

impl Default for GPU {
    fn default() -> Self {
        Self {
            arch: Arch::SouthernIslands,
            num_compute_units: 32,
            max_cycles: None,
            max_instructions: None,
            stall_cycles: 1_000_000,
            num_wavefront_pools: 4,
            max_work_groups_per_wavefront_pool: 10,
            max_wavefronts_per_wavefront_pool: 10,
            wavefront_size: 64,
            num_vector_registers: 65536,
            num_scalar_registers: 2048,
            register_alloc_size: 32,
            lds_size: 65536,
            lds_alloc_size: 64,
            front_end: FrontEnd::default(),
            simd: FunctionalUnit::simd(),
            scalar_unit: Some(FunctionalUnit::scalar()),
            branch_unit: FunctionalUnit::branch(),
            lds_unit: FunctionalUnit::memory(),
            vector_mem_unit: FunctionalUnit::memory(),
        }
    }
}

#[must_use]
pub fn pad_to_multiple(n: usize, k: usize) -> usize {
    let rem = n % k;
    if rem != 0 {
        ((n / k) + 1) * k
    } else {
        n
    }
}

impl GPU {
    /// Southern Islands preset, same as [`GPU::default`].
    #[must_use]
    pub fn southern_islands() -> Self {
        Self::default()
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let config: Self = serde_yaml::from_reader(reader)
            .map_err(|err| eyre::eyre!("failed to parse config {}: {err}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        eyre::ensure!(self.num_compute_units > 0, "need at least one compute unit");
        eyre::ensure!(
            self.num_wavefront_pools > 0,
            "need at least one wavefront pool"
        );
        eyre::ensure!(
            (1..=crate::wavefront::MAX_WAVEFRONT_SIZE).contains(&self.wavefront_size),
            "wavefront size {} not in 1..={}",
            self.wavefront_size,
            crate::wavefront::MAX_WAVEFRONT_SIZE
        );
        eyre::ensure!(
            self.max_wavefronts_per_wavefront_pool > 0,
            "wavefront pools must hold at least one wavefront"
        );
        eyre::ensure!(
            self.max_work_groups_per_wavefront_pool > 0,
            "wavefront pools must hold at least one work-group"
        );
        eyre::ensure!(
            self.register_alloc_size > 0 && self.lds_alloc_size > 0,
            "allocation granularity must be positive"
        );
        eyre::ensure!(
            self.max_wavefronts_per_compute_unit() <= crate::barrier::MAX_WAVEFRONTS_PER_COMPUTE_UNIT,
            "{} wavefronts per compute unit exceed the maximum of {}",
            self.max_wavefronts_per_compute_unit(),
            crate::barrier::MAX_WAVEFRONTS_PER_COMPUTE_UNIT
        );
        let fe = &self.front_end;
        eyre::ensure!(fe.fetch_width > 0, "fetch width must be positive");
        eyre::ensure!(fe.issue_width > 0, "issue width must be positive");
        eyre::ensure!(
            fe.fetch_buffer_size > 0,
            "fetch buffer size must be positive"
        );
        eyre::ensure!(
            fe.max_inst_issued_per_type > 0,
            "max instructions issued per type must be positive"
        );

        self.simd.validate("simd")?;
        if let Some(scalar) = &self.scalar_unit {
            scalar.validate("scalar")?;
        }
        self.branch_unit.validate("branch")?;
        self.lds_unit.validate("lds")?;
        self.vector_mem_unit.validate("vector memory")?;
        Ok(())
    }

    /// Number of wavefronts a work-group of `threads` threads occupies.
    #[must_use]
    pub fn wavefronts_per_work_group(&self, threads: usize) -> usize {
        pad_to_multiple(threads.max(1), self.wavefront_size) / self.wavefront_size
    }

    /// Work-group slots of a compute unit.
    #[must_use]
    pub fn max_work_groups_per_compute_unit(&self) -> usize {
        self.max_work_groups_per_wavefront_pool * self.num_wavefront_pools
    }

    /// Wavefront slots of a compute unit.
    #[must_use]
    pub fn max_wavefronts_per_compute_unit(&self) -> usize {
        self.max_wavefronts_per_wavefront_pool * self.num_wavefront_pools
    }
}

#[cfg(test)]
mod tests {
    use super::{Arch, GPU};
    use color_eyre::eyre;

    #[test]
    fn test_southern_islands_defaults() -> eyre::Result<()> {
        let config = GPU::default();
        config.validate()?;
        assert_eq!(config.max_work_groups_per_compute_unit(), 40);
        assert_eq!(config.max_wavefronts_per_compute_unit(), 40);
        assert_eq!(config.wavefronts_per_work_group(256), 4);
        assert_eq!(config.wavefronts_per_work_group(65), 2);
        assert_eq!(config.simd.exec_latency, 8);
        assert_eq!(config.scalar_unit.as_ref().map(|s| s.exec_buffer_size), Some(32));
        Ok(())
    }

    #[test]
    fn test_partial_yaml_uses_defaults() -> eyre::Result<()> {
        let yaml = r"
arch: Fermi
num_wavefront_pools: 2
front_end:
  fetch_width: 2
simd:
  exec_latency: 3
scalar_unit: null
";
        let config: GPU = serde_yaml::from_str(yaml)?;
        config.validate()?;
        assert_eq!(config.arch, Arch::Fermi);
        assert_eq!(config.num_wavefront_pools, 2);
        assert_eq!(config.front_end.fetch_width, 2);
        assert_eq!(config.front_end.fetch_latency, 5);
        assert_eq!(config.simd.exec_latency, 3);
        assert_eq!(config.simd.decode_buffer_size, 1);
        assert_eq!(config.scalar_unit, None);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let mut config = GPU::default();
        config.branch_unit.width = 0;
        assert!(config.validate().is_err());
    }
}
