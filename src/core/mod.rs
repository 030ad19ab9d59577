mod fetch;
mod issue;

use crate::{
    barrier::{BarrierSet, WavefrontMask},
    config,
    emu::{self, Emulator},
    fifo::Fifo,
    func_unit::FunctionalUnit,
    memory::Memory,
    opcodes::Category,
    stats,
    sync::{atomic, Arc},
    trace::{self, Event},
    uop::{self, Uop},
    wavefront::{State, WorkGroup},
    wavefront_pool::{WavefrontPool, WavefrontRef},
};
use bitvec::{array::BitArray, bitvec, vec::BitVec};
use console::style;
use crossbeam::utils::CachePadded;
use itertools::Itertools;

/// Collaborators a compute unit talks to while advancing a cycle.
pub struct Env<'a> {
    pub emulator: &'a mut dyn Emulator,
    pub memory: &'a mut dyn Memory,
    pub sink: &'a mut dyn trace::Sink,
}

/// A compute unit: wavefront pools, the fetch and issue front end, and the
/// functional units shared by all pools.
#[derive(Debug)]
pub struct ComputeUnit {
    pub id: usize,
    pub config: Arc<config::GPU>,
    /// Cycles this unit ran with work mapped
    pub cycle: u64,
    pub stats: stats::ComputeUnit,

    uop_uid: Arc<CachePadded<atomic::AtomicU64>>,
    next_uop_id: u64,

    pools: Vec<WavefrontPool>,
    fetch_buffers: Vec<Fifo<Uop>>,
    simd_units: Vec<FunctionalUnit>,
    scalar_unit: Option<FunctionalUnit>,
    branch_unit: FunctionalUnit,
    lds_unit: FunctionalUnit,
    vector_mem_unit: FunctionalUnit,

    work_groups: Box<[Option<WorkGroup>]>,
    free_slots: BitVec,
    num_mapped: usize,
    barriers: BarrierSet,

    uops: uop::Pool,
    completed: Vec<Uop>,
    finished: Vec<WorkGroup>,
    last_completion: Option<u64>,
}

impl std::fmt::Display for ComputeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComputeUnit({})", self.id)
    }
}

impl ComputeUnit {
    #[must_use]
    pub fn new(
        id: usize,
        config: Arc<config::GPU>,
        uop_uid: Arc<CachePadded<atomic::AtomicU64>>,
    ) -> Self {
        let num_pools = config.num_wavefront_pools;
        let issue_latency = config.front_end.issue_latency;
        let max_work_groups = config.max_work_groups_per_compute_unit();

        let pools = (0..num_pools)
            .map(|pool_id| WavefrontPool::new(pool_id, config.max_wavefronts_per_wavefront_pool))
            .collect();
        let fetch_buffers = (0..num_pools)
            .map(|pool_id| {
                Fifo::new(
                    format!("cu[{id}]::fetch[{pool_id}]"),
                    Some(config.front_end.fetch_buffer_size),
                )
            })
            .collect();
        let simd_units = (0..num_pools)
            .map(|pool_id| {
                FunctionalUnit::new(Category::Simd, pool_id, id, &config.simd, issue_latency)
            })
            .collect();
        let scalar_unit = config.scalar_unit.as_ref().map(|scalar| {
            FunctionalUnit::new(Category::Scalar, 0, id, scalar, issue_latency)
        });
        let branch_unit =
            FunctionalUnit::new(Category::Branch, 0, id, &config.branch_unit, issue_latency);
        let lds_unit = FunctionalUnit::new(Category::Lds, 0, id, &config.lds_unit, issue_latency);
        let vector_mem_unit = FunctionalUnit::new(
            Category::VectorMemory,
            0,
            id,
            &config.vector_mem_unit,
            issue_latency,
        );
        let max_free_uops = num_pools * config.front_end.fetch_buffer_size * 4;

        Self {
            id,
            cycle: 0,
            stats: stats::ComputeUnit::default(),
            uop_uid,
            next_uop_id: 0,
            pools,
            fetch_buffers,
            simd_units,
            scalar_unit,
            branch_unit,
            lds_unit,
            vector_mem_unit,
            work_groups: vec![None; max_work_groups].into_boxed_slice(),
            free_slots: bitvec![1; max_work_groups],
            num_mapped: 0,
            barriers: BarrierSet::new(max_work_groups),
            uops: uop::Pool::new(max_free_uops),
            completed: Vec::new(),
            finished: Vec::new(),
            last_completion: None,
            config,
        }
    }

    #[must_use]
    pub fn num_mapped(&self) -> usize {
        self.num_mapped
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.num_mapped == 0
    }

    #[must_use]
    pub fn work_group(&self, slot: usize) -> Option<&WorkGroup> {
        self.work_groups.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn free_slots(&self) -> &BitVec {
        &self.free_slots
    }

    #[must_use]
    pub fn pools(&self) -> &[WavefrontPool] {
        &self.pools
    }

    #[must_use]
    pub fn fetch_buffer(&self, pool: usize) -> &Fifo<Uop> {
        &self.fetch_buffers[pool]
    }

    /// Cycle of the most recent uop completion.
    #[must_use]
    pub fn last_completion(&self) -> Option<u64> {
        self.last_completion
    }

    /// All functional units.
    pub fn units(&self) -> impl Iterator<Item = &FunctionalUnit> {
        std::iter::once(&self.branch_unit)
            .chain(self.scalar_unit.iter())
            .chain(self.simd_units.iter())
            .chain([&self.vector_mem_unit, &self.lds_unit])
    }

    fn units_mut(&mut self) -> impl Iterator<Item = &mut FunctionalUnit> {
        std::iter::once(&mut self.branch_unit)
            .chain(self.scalar_unit.iter_mut())
            .chain(self.simd_units.iter_mut())
            .chain([&mut self.vector_mem_unit, &mut self.lds_unit])
    }

    /// Uops held by the fetch buffers and functional units.
    #[must_use]
    pub fn uops_in_flight(&self) -> usize {
        let fetched: usize = self.fetch_buffers.iter().map(Fifo::len).sum();
        let issued: usize = self.units().map(FunctionalUnit::occupancy).sum();
        fetched + issued
    }

    /// Uops allocated from the pool and not freed yet.
    #[must_use]
    pub fn live_uops(&self) -> usize {
        self.uops.live()
    }

    /// Work-groups unmapped since the last call.
    pub fn take_finished(&mut self) -> Vec<WorkGroup> {
        std::mem::take(&mut self.finished)
    }

    fn wavefront_location(&self, id_in_compute_unit: usize) -> (usize, usize) {
        let num_pools = self.config.num_wavefront_pools;
        (id_in_compute_unit % num_pools, id_in_compute_unit / num_pools)
    }

    /// Maps a work-group into the smallest free slot and binds its
    /// wavefronts to pool entries.
    ///
    /// Wavefront `i` gets id `slot * wavefronts + i` in the compute unit,
    /// which selects pool `id % pools` and entry `id / pools`.
    pub fn map_work_group(&mut self, mut work_group: WorkGroup, sink: &mut dyn trace::Sink) -> usize {
        let Some(slot) = self.free_slots.first_one() else {
            panic!("{self}: no free slot for {work_group}");
        };
        let num_wavefronts = work_group.wavefronts.len();
        let mut mask: WavefrontMask = BitArray::ZERO;

        for (index, wavefront) in work_group.wavefronts.iter_mut().enumerate() {
            let id_in_compute_unit = slot * num_wavefronts + index;
            let (pool_id, entry_id) = self.wavefront_location(id_in_compute_unit);
            self.pools[pool_id].map(entry_id, WavefrontRef { slot, index });
            wavefront.id_in_compute_unit = Some(id_in_compute_unit);
            wavefront.pool_id = Some(pool_id);
            wavefront.entry_id = Some(entry_id);
            mask.set(id_in_compute_unit, true);
        }
        self.barriers.allocate(slot, mask);

        log::debug!(
            "{}: mapped {} into slot {} ({} wavefronts)",
            style(format!("cu {:>2}", self.id)).cyan(),
            work_group,
            slot,
            num_wavefronts
        );
        if sink.enabled() {
            sink.event(Event::MapWorkGroup {
                compute_unit: self.id,
                work_group: work_group.id,
                first_wavefront: work_group.wavefronts.first().map_or(0, |wf| wf.id),
                num_wavefronts,
            });
        }

        work_group.state = State::Mapped {
            compute_unit: self.id,
            slot,
        };
        self.work_groups[slot] = Some(work_group);
        self.free_slots.set(slot, false);
        self.num_mapped += 1;
        self.stats.mapped_work_groups += 1;
        slot
    }

    /// Releases the slot and pool entries of a work-group.
    pub fn unmap_work_group(&mut self, slot: usize, sink: &mut dyn trace::Sink) -> WorkGroup {
        let Some(mut work_group) = self.work_groups.get_mut(slot).and_then(Option::take) else {
            panic!("{self}: unmap of empty work-group slot {slot}");
        };
        for wavefront in &work_group.wavefronts {
            let (Some(pool_id), Some(entry_id)) = (wavefront.pool_id, wavefront.entry_id) else {
                panic!("{self}: {wavefront} of mapped {work_group} has no pool entry");
            };
            self.pools[pool_id].unmap(entry_id);
        }
        self.barriers.deallocate(slot);

        log::debug!(
            "{}: unmapped {} from slot {}",
            style(format!("cu {:>2}", self.id)).cyan(),
            work_group,
            slot
        );
        if sink.enabled() {
            sink.event(Event::UnmapWorkGroup {
                compute_unit: self.id,
                work_group: work_group.id,
            });
        }

        work_group.state = State::Finished;
        self.free_slots.set(slot, true);
        self.num_mapped -= 1;
        self.stats.unmapped_work_groups += 1;
        work_group
    }

    /// Advances the compute unit by one cycle.
    ///
    /// Functional units run first, each from its last stage to its first,
    /// followed by issue and fetch.
    #[tracing::instrument(name = "compute_unit_cycle", skip_all, fields(cu = self.id))]
    pub fn cycle(&mut self, now: u64, env: &mut Env<'_>) -> Result<(), emu::Error> {
        if self.num_mapped == 0 {
            return Ok(());
        }
        log::debug!(
            "{} mapped={} in flight={}",
            style(format!("cycle {now:03} cu {:>2}:", self.id)).blue(),
            self.num_mapped,
            self.uops_in_flight()
        );

        let mut completed = std::mem::take(&mut self.completed);
        crate::timeit!("cycle::units", {
            for unit in self.units_mut() {
                unit.cycle(now, &mut *env.memory, &mut *env.sink, &mut completed);
            }
        });
        for uop in completed.drain(..) {
            self.complete(uop, now, &mut *env.sink);
        }
        self.completed = completed;

        crate::timeit!("cycle::issue", self.issue(now, &mut *env.sink));
        crate::timeit!("cycle::fetch", self.fetch(now, env))?;

        self.cycle += 1;
        self.stats.cycles = self.cycle;
        Ok(())
    }

    fn complete(&mut self, uop: Uop, now: u64, sink: &mut dyn trace::Sink) {
        let slot = uop.work_group_slot;
        let Some(work_group) = self.work_groups.get_mut(slot).and_then(Option::as_mut) else {
            panic!("cu {}: completed {uop} of unmapped work-group slot {slot}", self.id);
        };
        let wavefront = &work_group.wavefronts[uop.wavefront_index];
        let Some(id_in_compute_unit) = wavefront.id_in_compute_unit else {
            panic!("cu {}: completed {uop} of unmapped {wavefront}", self.id);
        };
        let wavefront_finished = wavefront.finished;

        let entry = self.pools[uop.pool_id].entry_mut(uop.entry_id);
        assert_eq!(
            entry.wavefront,
            Some(WavefrontRef {
                slot,
                index: uop.wavefront_index
            }),
            "cu {}: {uop} completed for a different pool entry",
            self.id
        );

        let flags = uop.flags;
        if flags.vector_mem_read || flags.vector_mem_write {
            assert!(entry.vm_cnt > 0, "cu {}: {uop} vm_cnt underflow", self.id);
            entry.vm_cnt -= 1;
        }
        if flags.lds_read || flags.lds_write || flags.scalar_mem_read {
            assert!(entry.lgkm_cnt > 0, "cu {}: {uop} lgkm_cnt underflow", self.id);
            entry.lgkm_cnt -= 1;
        }
        if flags.mem_wait {
            entry.wait_for_mem = true;
        }
        if flags.barrier {
            entry.wait_for_barrier = true;
        }
        if uop.blocks_fetch_until_complete() {
            entry.ready = true;
        }
        if uop.last_instruction {
            assert!(
                wavefront_finished,
                "cu {}: last {uop} of a wavefront that is not finished",
                self.id
            );
            entry.wavefront_finished = true;
            work_group.wavefronts_finished += 1;
        }
        assert!(work_group.inflight > 0, "cu {}: {uop} not in flight", self.id);
        work_group.inflight -= 1;
        let work_group_done = work_group.done();

        let mut released = None;
        if flags.barrier {
            released = self.barriers.wavefront_reached_barrier(slot, id_in_compute_unit);
        }
        if uop.last_instruction {
            released = self
                .barriers
                .wavefront_exited(slot, id_in_compute_unit)
                .or(released);
        }
        if let Some(released) = released {
            self.release_barrier(&released);
        }

        log::debug!(
            "{}: completed {} (ready {:?})",
            style(format!("cycle {now:03} cu {:>2}", self.id)).yellow(),
            uop,
            uop.ready.as_array()
        );
        if sink.enabled() {
            sink.event(Event::EndInst {
                id: uop.id_in_compute_unit,
                compute_unit: self.id,
                cycle: now,
                ready: uop.ready,
            });
        }
        self.stats.completed_uops += 1;
        self.last_completion = Some(now);
        self.uops.free(uop);

        if work_group_done {
            let work_group = self.unmap_work_group(slot, sink);
            self.finished.push(work_group);
        }
    }

    /// Clears the barrier flag of all released wavefronts at once.
    fn release_barrier(&mut self, released: &WavefrontMask) {
        for id_in_compute_unit in released.iter_ones() {
            let (pool_id, entry_id) = self.wavefront_location(id_in_compute_unit);
            let entry = self.pools[pool_id].entry_mut(entry_id);
            assert!(
                entry.valid,
                "cu {}: barrier released unmapped wavefront {id_in_compute_unit}",
                self.id
            );
            entry.wait_for_barrier = false;
        }
        log::debug!(
            "cu {}: barrier released wavefronts [{}]",
            self.id,
            released.iter_ones().join(", ")
        );
    }
}
