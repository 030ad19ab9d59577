use super::{Arch, FrontEnd, FunctionalUnit, GPU};

impl GPU {
    /// Fermi preset.
    ///
    /// Two warp pools per SM, 32-wide warps and no scalar pipeline.
    #[must_use]
    pub fn fermi() -> Self {
        Self {
            arch: Arch::Fermi,
            num_compute_units: 16,
            num_wavefront_pools: 2,
            max_work_groups_per_wavefront_pool: 4,
            max_wavefronts_per_wavefront_pool: 24,
            wavefront_size: 32,
            num_vector_registers: 32768,
            num_scalar_registers: 0,
            register_alloc_size: 64,
            lds_size: 49152,
            lds_alloc_size: 128,
            front_end: FrontEnd {
                fetch_latency: 5,
                fetch_width: 4,
                fetch_buffer_size: 10,
                issue_latency: 1,
                issue_width: 2,
                max_inst_issued_per_type: 1,
            },
            simd: FunctionalUnit {
                exec_latency: 8,
                ..FunctionalUnit::default()
            },
            scalar_unit: None,
            branch_unit: FunctionalUnit::branch(),
            lds_unit: FunctionalUnit::memory(),
            vector_mem_unit: FunctionalUnit::memory(),
            ..Self::default()
        }
    }
}
