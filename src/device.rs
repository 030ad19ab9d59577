use crate::{
    config,
    core::{ComputeUnit, Env},
    emu::{self, Emulator},
    kernel::{Kernel, KernelLaunch},
    memory::{self, Memory},
    occupancy::{self, Occupancy},
    stats,
    sync::{atomic, Arc},
    trace,
};
use console::style;
use crossbeam::utils::CachePadded;
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("{kernel}: {wavefronts} wavefronts per work-group exceed the {max} wavefront slots of a compute unit")]
    TooManyWavefronts {
        kernel: String,
        wavefronts: usize,
        max: usize,
    },
    #[error("{kernel}: a single work-group does not fit a compute unit")]
    DoesNotFit { kernel: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Emulation(#[from] emu::Error),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum FinishReason {
    Completed,
    MaxCycles,
    MaxInstructions,
    /// No uop completed within the configured number of stall cycles
    Stall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Running,
    Finished(FinishReason),
}

#[derive(Debug)]
struct Launched {
    kernel: Kernel,
    /// Work-groups per compute unit
    limit: usize,
}

/// A GPU: compute units fed with the work-groups of launched kernels.
///
/// Kernels run one after another. Compute units that can take another
/// work-group of the running kernel are kept in the ready set, the ones
/// with work mapped in the busy set.
#[derive(Debug)]
pub struct Device {
    pub config: Arc<config::GPU>,
    compute_units: Vec<ComputeUnit>,
    ready: IndexSet<usize>,
    busy: IndexSet<usize>,
    kernels: VecDeque<Launched>,
    completed_kernels: Vec<Kernel>,

    emulator: Box<dyn Emulator>,
    memory: Box<dyn Memory>,
    occupancy: Box<dyn Occupancy>,
    sink: Box<dyn trace::Sink>,

    uop_uid: Arc<CachePadded<atomic::AtomicU64>>,
    pub cycle: u64,
    last_complete_cycle: u64,
    work_groups_completed: u64,
    finished: Option<FinishReason>,
}

impl Device {
    #[must_use]
    pub fn new(config: Arc<config::GPU>, emulator: Box<dyn Emulator>) -> Self {
        let uop_uid = Arc::new(CachePadded::new(atomic::AtomicU64::new(0)));
        let compute_units = (0..config.num_compute_units)
            .map(|id| ComputeUnit::new(id, Arc::clone(&config), Arc::clone(&uop_uid)))
            .collect();
        Self {
            compute_units,
            ready: IndexSet::new(),
            busy: IndexSet::new(),
            kernels: VecDeque::new(),
            completed_kernels: Vec::new(),
            emulator,
            memory: Box::<memory::FixedLatency>::default(),
            occupancy: Box::new(occupancy::Calculator::new(Arc::clone(&config))),
            sink: Box::new(trace::Noop),
            uop_uid,
            cycle: 0,
            last_complete_cycle: 0,
            work_groups_completed: 0,
            finished: None,
            config,
        }
    }

    #[must_use]
    pub fn with_memory(mut self, memory: impl Memory + 'static) -> Self {
        self.memory = Box::new(memory);
        self
    }

    #[must_use]
    pub fn with_occupancy(mut self, occupancy: impl Occupancy + 'static) -> Self {
        self.occupancy = Box::new(occupancy);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl trace::Sink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn compute_units(&self) -> &[ComputeUnit] {
        &self.compute_units
    }

    /// Compute units that accept another work-group, in mapping order.
    #[must_use]
    pub fn ready(&self) -> &IndexSet<usize> {
        &self.ready
    }

    /// Compute units with at least one work-group mapped.
    #[must_use]
    pub fn busy(&self) -> &IndexSet<usize> {
        &self.busy
    }

    #[must_use]
    pub fn completed_kernels(&self) -> &[Kernel] {
        &self.completed_kernels
    }

    /// Queues a kernel behind the ones already launched.
    pub fn launch(&mut self, launch: KernelLaunch) -> Result<(), LaunchError> {
        let wavefronts = self
            .config
            .wavefronts_per_work_group(launch.threads_per_work_group);
        let max_wavefronts = self.config.max_wavefronts_per_compute_unit();
        if wavefronts > max_wavefronts {
            return Err(LaunchError::TooManyWavefronts {
                kernel: launch.to_string(),
                wavefronts,
                max: max_wavefronts,
            });
        }
        // slot numbering requires every mapped wavefront to get a pool entry
        let limit = self
            .occupancy
            .work_groups_per_compute_unit(&launch)
            .min(self.config.max_work_groups_per_compute_unit())
            .min(max_wavefronts / wavefronts);
        if limit == 0 {
            return Err(LaunchError::DoesNotFit {
                kernel: launch.to_string(),
            });
        }

        log::info!(
            "launching {} with {} work-groups per compute unit",
            launch,
            limit
        );
        let kernel = Kernel::new(launch, self.config.wavefront_size);
        self.kernels.push_back(Launched { kernel, limit });
        if self.kernels.len() == 1 {
            self.start_front_kernel();
        }
        Ok(())
    }

    fn start_front_kernel(&mut self) {
        let Some(front) = self.kernels.front_mut() else {
            return;
        };
        front.kernel.start_cycle = Some(self.cycle);
        let limit = front.limit;
        self.ready = self
            .compute_units
            .iter()
            .filter(|cu| cu.num_mapped() < limit)
            .map(|cu| cu.id)
            .collect();
        self.last_complete_cycle = self.cycle;
    }

    /// Maps pending work-groups round-robin over the ready compute units.
    fn map_work_groups(&mut self) {
        let Some(Launched { kernel, limit }) = self.kernels.front_mut() else {
            return;
        };
        while kernel.has_pending_work_groups() {
            let Some(cu_id) = self.ready.shift_remove_index(0) else {
                break;
            };
            let Some(work_group) = kernel.next_work_group() else {
                break;
            };
            let cu = &mut self.compute_units[cu_id];
            cu.map_work_group(work_group, &mut *self.sink);
            self.busy.insert(cu_id);
            if cu.num_mapped() < *limit {
                self.ready.insert(cu_id);
            }
        }
    }

    fn handle_finished_work_groups(&mut self, cu_id: usize) {
        let cu = &mut self.compute_units[cu_id];
        let finished = cu.take_finished();
        if finished.is_empty() {
            return;
        }
        let Some(Launched { kernel, limit }) = self.kernels.front_mut() else {
            panic!("{cu}: work-groups finished without a running kernel");
        };
        for work_group in finished {
            assert_eq!(
                work_group.kernel_id,
                kernel.id(),
                "{cu}: {work_group} does not belong to {kernel}"
            );
            kernel.work_group_completed();
            self.work_groups_completed += 1;
        }
        if cu.num_mapped() < *limit {
            self.ready.insert(cu_id);
        }
        if cu.is_idle() {
            self.busy.shift_remove(&cu_id);
        }
    }

    fn retire_kernels(&mut self) {
        while self.kernels.front().is_some_and(|front| front.kernel.done()) {
            let Some(Launched { mut kernel, .. }) = self.kernels.pop_front() else {
                break;
            };
            kernel.completed_cycle = Some(self.cycle);
            log::info!(
                "{} completed {} after {} cycles",
                style(format!("cycle {:03}", self.cycle)).bold(),
                kernel,
                self.cycle - kernel.start_cycle.unwrap_or(0)
            );
            self.completed_kernels.push(kernel);
            self.start_front_kernel();
        }
    }

    #[must_use]
    pub fn instructions(&self) -> u64 {
        self.compute_units
            .iter()
            .map(|cu| cu.stats.instructions)
            .sum()
    }

    fn finish_reason(&self) -> Option<FinishReason> {
        if self.kernels.is_empty() {
            return Some(FinishReason::Completed);
        }
        if self
            .config
            .max_cycles
            .is_some_and(|max| self.cycle >= max)
        {
            return Some(FinishReason::MaxCycles);
        }
        if self
            .config
            .max_instructions
            .is_some_and(|max| self.instructions() >= max)
        {
            return Some(FinishReason::MaxInstructions);
        }
        if self.cycle - self.last_complete_cycle > self.config.stall_cycles {
            return Some(FinishReason::Stall);
        }
        None
    }

    /// Advances the device by one cycle.
    #[tracing::instrument(name = "device_cycle", skip_all, fields(cycle = self.cycle))]
    pub fn cycle(&mut self) -> Result<Status, Error> {
        if let Some(reason) = self.finished {
            return Ok(Status::Finished(reason));
        }
        if let Some(reason) = self.finish_reason() {
            log::info!(
                "{} finished: {}",
                style(format!("cycle {:03}", self.cycle)).bold(),
                reason
            );
            if reason == FinishReason::Stall {
                log::warn!(
                    "no uop completed since cycle {} ({} work-groups in flight)",
                    self.last_complete_cycle,
                    self.compute_units
                        .iter()
                        .map(ComputeUnit::num_mapped)
                        .sum::<usize>()
                );
            }
            self.finished = Some(reason);
            return Ok(Status::Finished(reason));
        }

        let now = self.cycle;
        log::debug!("{}", style(format!("======== cycle {now} ========")).bold());

        crate::timeit!("device::map", self.map_work_groups());
        crate::timeit!("device::memory", self.memory.cycle(now));

        let busy: Vec<usize> = self.busy.iter().copied().collect();
        for cu_id in busy {
            let mut env = Env {
                emulator: &mut *self.emulator,
                memory: &mut *self.memory,
                sink: &mut *self.sink,
            };
            let cu = &mut self.compute_units[cu_id];
            crate::timeit!("device::compute_unit", cu.cycle(now, &mut env))?;
            if cu.last_completion() == Some(now) {
                self.last_complete_cycle = now;
            }
            self.handle_finished_work_groups(cu_id);
        }
        self.retire_kernels();

        self.cycle += 1;
        Ok(Status::Running)
    }

    /// Runs until all kernels completed or a limit was hit.
    pub fn run(&mut self) -> Result<FinishReason, Error> {
        loop {
            if let Status::Finished(reason) = self.cycle()? {
                return Ok(reason);
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> stats::Sim {
        let compute_units: Vec<_> = self.compute_units.iter().map(|cu| cu.stats.clone()).collect();
        let mut total = stats::ComputeUnit::default();
        for cu in &compute_units {
            total += cu;
        }
        stats::Sim {
            cycles: self.cycle,
            instructions: total.instructions,
            work_groups_completed: self.work_groups_completed,
            finish_reason: self.finished.map(|reason| reason.to_string()),
            total,
            compute_units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Device, FinishReason, LaunchError};
    use crate::{
        config,
        emu::{AccessPattern, Program, ProgramInstruction},
        kernel::KernelLaunch,
        memory::Perfect,
        sync::Arc,
        testing::{self, ManualMemory},
        trace::{Event, Recorder},
    };
    use color_eyre::eyre;

    fn device(config: config::GPU, program: &Program) -> Device {
        testing::init_logging();
        let emulator = testing::emulator(&config, program);
        Device::new(Arc::new(config), Box::new(emulator))
    }

    #[test]
    fn test_run_to_completion() -> eyre::Result<()> {
        let config = config::GPU {
            num_compute_units: 2,
            ..testing::small_config()
        };
        let program = testing::program(4, 128, &["v_add_f32 v0, v1, v2", "s_endpgm"]);
        let sink = Recorder::default();
        let mut device = device(config, &program)
            .with_memory(Perfect)
            .with_sink(sink.clone());
        device.launch(program.kernel.clone())?;

        assert_eq!(device.run()?, FinishReason::Completed);
        let stats = device.stats();
        assert_eq!(stats.work_groups_completed, 4);
        assert_eq!(stats.instructions, 16);
        assert_eq!(stats.total.completed_uops, 16);
        assert_eq!(stats.finish_reason.as_deref(), Some("Completed"));
        // work-groups alternate between the two compute units
        assert_eq!(stats.compute_units[0].mapped_work_groups, 2);
        assert_eq!(stats.compute_units[1].mapped_work_groups, 2);
        assert!(device.busy().is_empty());
        assert_eq!(device.completed_kernels().len(), 1);

        let mapped: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::MapWorkGroup {
                    compute_unit,
                    work_group,
                    ..
                } => Some((compute_unit, work_group)),
                _ => None,
            })
            .collect();
        assert_eq!(mapped, vec![(0, 0), (1, 1), (0, 2), (1, 3)]);
        Ok(())
    }

    #[test]
    fn test_kernels_run_back_to_back() -> eyre::Result<()> {
        let program = testing::program(1, 64, &["v_add_f32 v0, v1, v2", "s_endpgm"]);
        let mut device = device(testing::small_config(), &program).with_memory(Perfect);
        device.launch(program.kernel.clone())?;
        device.launch(KernelLaunch {
            id: 1,
            name: "second".to_string(),
            ..program.kernel.clone()
        })?;
        assert_eq!(device.run()?, FinishReason::Completed);

        let kernels = device.completed_kernels();
        assert_eq!(kernels.len(), 2);
        let first_done = kernels[0].completed_cycle.unwrap();
        assert!(kernels[1].start_cycle.unwrap() >= first_done);
        assert_eq!(device.stats().work_groups_completed, 2);
        Ok(())
    }

    #[test]
    fn test_stall_watchdog() -> eyre::Result<()> {
        let config = config::GPU {
            stall_cycles: 100,
            ..testing::small_config()
        };
        let program = Program {
            kernel: KernelLaunch::default(),
            instructions: vec![
                ProgramInstruction::new("buffer_load_dword v1, v0")
                    .with_access(AccessPattern::default()),
                ProgramInstruction::new("s_waitcnt vmcnt(0)"),
                ProgramInstruction::new("s_endpgm"),
            ],
        };
        let mut device = device(config, &program).with_memory(ManualMemory::default());
        device.launch(program.kernel.clone())?;

        assert_eq!(device.run()?, FinishReason::Stall);
        assert!(device.cycle > 100 && device.cycle < 200);
        // finished devices stay finished
        assert_eq!(device.run()?, FinishReason::Stall);
        Ok(())
    }

    #[test]
    fn test_max_cycles() -> eyre::Result<()> {
        let config = config::GPU {
            max_cycles: Some(5),
            ..testing::small_config()
        };
        let program = testing::program(8, 256, &["v_add_f32 v0, v1, v2", "s_endpgm"]);
        let mut device = device(config, &program);
        device.launch(program.kernel.clone())?;
        assert_eq!(device.run()?, FinishReason::MaxCycles);
        assert_eq!(device.stats().cycles, 5);
        Ok(())
    }

    #[test]
    fn test_max_instructions() -> eyre::Result<()> {
        let config = config::GPU {
            max_instructions: Some(3),
            ..testing::small_config()
        };
        let program = testing::program(8, 256, &["v_add_f32 v0, v1, v2", "s_endpgm"]);
        let mut device = device(config, &program);
        device.launch(program.kernel.clone())?;
        assert_eq!(device.run()?, FinishReason::MaxInstructions);
        assert!(device.instructions() >= 3);
        Ok(())
    }

    #[test]
    fn test_launch_errors() {
        let program = testing::program(1, 64, &["s_endpgm"]);
        let mut device = device(testing::small_config(), &program);

        // eight wavefront slots per compute unit
        let err = device
            .launch(KernelLaunch {
                threads_per_work_group: 1024,
                ..KernelLaunch::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            LaunchError::TooManyWavefronts {
                wavefronts: 16,
                max: 8,
                ..
            }
        ));

        let err = device
            .launch(KernelLaunch {
                lds_per_work_group: 1 << 20,
                ..KernelLaunch::default()
            })
            .unwrap_err();
        assert!(matches!(err, LaunchError::DoesNotFit { .. }));
    }
}
