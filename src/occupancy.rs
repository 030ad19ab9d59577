use crate::{
    config::{pad_to_multiple, GPU},
    kernel::KernelLaunch,
    sync::Arc,
};

/// Number of work-groups of a kernel that fit one compute unit.
pub trait Occupancy: std::fmt::Debug {
    fn work_groups_per_compute_unit(&self, launch: &KernelLaunch) -> usize;
}

/// Resource limiting how many work-groups fit a compute unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Limiter {
    WavefrontSlots,
    VectorRegisters,
    ScalarRegisters,
    Lds,
    WorkGroupSlots,
}

/// Occupancy from the resource limits of the configured compute unit.
#[derive(Debug, Clone)]
pub struct Calculator {
    config: Arc<GPU>,
}

impl Calculator {
    #[must_use]
    pub fn new(config: Arc<GPU>) -> Self {
        Self { config }
    }

    /// Work-groups per compute unit and the resource limiting them.
    ///
    /// The minimum over wavefront slots, vector and scalar registers, LDS
    /// and the work-group slots of all wavefront pools.
    #[must_use]
    pub fn limit(&self, launch: &KernelLaunch) -> (usize, Limiter) {
        let config = &self.config;
        let wavefronts = config.wavefronts_per_work_group(launch.threads_per_work_group);

        let by_wavefronts = config.max_wavefronts_per_compute_unit() / wavefronts;

        let by_vector_registers = if launch.vector_registers_per_thread == 0 {
            usize::MAX
        } else {
            let per_wavefront = pad_to_multiple(
                launch.vector_registers_per_thread * config.wavefront_size,
                config.register_alloc_size,
            );
            config.num_vector_registers / (per_wavefront * wavefronts)
        };

        let by_scalar_registers = if launch.scalar_registers_per_wavefront == 0 {
            usize::MAX
        } else {
            let per_wavefront = pad_to_multiple(launch.scalar_registers_per_wavefront, 8);
            config.num_scalar_registers / (per_wavefront * wavefronts)
        };

        let by_lds = if launch.lds_per_work_group == 0 {
            usize::MAX
        } else {
            config.lds_size / pad_to_multiple(launch.lds_per_work_group, config.lds_alloc_size)
        };

        let by_work_groups = config.max_work_groups_per_compute_unit();

        [
            (by_wavefronts, Limiter::WavefrontSlots),
            (by_vector_registers, Limiter::VectorRegisters),
            (by_scalar_registers, Limiter::ScalarRegisters),
            (by_lds, Limiter::Lds),
            (by_work_groups, Limiter::WorkGroupSlots),
        ]
        .into_iter()
        .min_by_key(|(limit, _)| *limit)
        .unwrap_or((0, Limiter::WorkGroupSlots))
    }
}

impl Occupancy for Calculator {
    fn work_groups_per_compute_unit(&self, launch: &KernelLaunch) -> usize {
        let (limit, limiter) = self.limit(launch);
        log::debug!("{launch}: {limit} work-groups per compute unit (limited by {limiter})");
        limit
    }
}
