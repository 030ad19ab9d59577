pub mod stage;

pub use stage::{Stage, StageKind};

use crate::{
    config,
    memory::{Memory, Witness},
    opcodes::Category,
    trace::{self, Event},
    uop::Uop,
};
use smallvec::SmallVec;

/// Functional unit: an ordered chain of bounded stage buffers.
///
/// The stage layout depends on the category:
///
/// - SIMD: issue, decode, execute (read and write fused into execute)
/// - branch and scalar: issue, decode, read, execute, write
/// - LDS and vector memory: issue, decode, read, mem, write
///
/// Uops with memory accesses start issuing them on admission into the
/// execute or mem stage. Accesses the memory refuses are retried in later
/// cycles, and the uop only leaves once all of them completed.
#[derive(Debug)]
pub struct FunctionalUnit {
    pub category: Category,
    /// Wavefront pool served by a SIMD unit, zero for shared units
    pub id: usize,
    pub compute_unit_id: usize,
    width: usize,
    stages: Vec<Stage>,
}

impl std::fmt::Display for FunctionalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.category, self.id)
    }
}

impl FunctionalUnit {
    #[must_use]
    pub fn new(
        category: Category,
        id: usize,
        compute_unit_id: usize,
        config: &config::FunctionalUnit,
        issue_latency: u64,
    ) -> Self {
        let name = |stage: StageKind| format!("cu[{compute_unit_id}]::{category}[{id}]::{stage}");
        let stage = |kind: StageKind, latency: u64, size: usize| {
            Stage::new(kind, latency, size, name(kind))
        };
        let mut stages = vec![
            stage(StageKind::Issue, issue_latency, config.issue_buffer_size),
            stage(
                StageKind::Decode,
                config.decode_latency,
                config.decode_buffer_size,
            ),
        ];
        match category {
            Category::Simd => {
                stages.push(stage(
                    StageKind::Execute,
                    config.exec_latency,
                    config.exec_buffer_size,
                ));
            }
            Category::Branch | Category::Scalar => {
                stages.extend([
                    stage(StageKind::Read, config.read_latency, config.read_buffer_size),
                    stage(
                        StageKind::Execute,
                        config.exec_latency,
                        config.exec_buffer_size,
                    ),
                    stage(
                        StageKind::Write,
                        config.write_latency,
                        config.write_buffer_size,
                    ),
                ]);
            }
            Category::Lds | Category::VectorMemory => {
                stages.extend([
                    stage(StageKind::Read, config.read_latency, config.read_buffer_size),
                    stage(StageKind::Mem, 0, config.exec_buffer_size),
                    stage(
                        StageKind::Write,
                        config.write_latency,
                        config.write_buffer_size,
                    ),
                ]);
            }
        }
        Self {
            category,
            id,
            compute_unit_id,
            width: config.width,
            stages,
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.kind == kind)
    }

    /// Whether the issue buffer has room for another uop.
    #[must_use]
    pub fn can_issue(&self) -> bool {
        !self.stages[0].buffer.full()
    }

    /// Number of uops in all stages.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.stages.iter().map(|stage| stage.buffer.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    /// Admits a uop from the fetch buffer into the issue buffer.
    pub fn issue(&mut self, mut uop: Uop, now: u64, sink: &mut dyn trace::Sink) {
        assert_eq!(
            uop.category,
            Some(self.category),
            "{self}: cannot issue {uop}"
        );
        let issue = &mut self.stages[0];
        uop.ready.issue_ready = now + issue.latency;
        log::trace!(
            "{}: issue {} ready at cycle {}",
            issue.buffer.name(),
            uop,
            uop.ready.issue_ready
        );
        if sink.enabled() {
            sink.event(Event::Stage {
                id: uop.id_in_compute_unit,
                compute_unit: self.compute_unit_id,
                category: self.category,
                stage: StageKind::Issue,
            });
        }
        issue.buffer.enqueue(uop);
    }

    /// Advances all stages by one cycle, last stage first.
    ///
    /// Uops leaving the last stage are appended to `completed`.
    pub fn cycle(
        &mut self,
        now: u64,
        memory: &mut dyn Memory,
        sink: &mut dyn trace::Sink,
        completed: &mut Vec<Uop>,
    ) {
        for stage in &mut self.stages {
            if stage.kind.issues_memory() {
                for uop in stage.buffer.iter_mut() {
                    if !uop.all_accesses_issued() {
                        issue_accesses(uop, memory);
                    }
                }
            }
        }
        self.complete(now, completed);
        for src in (0..self.stages.len() - 1).rev() {
            self.advance(src, now, memory, sink);
        }
    }

    fn complete(&mut self, now: u64, completed: &mut Vec<Uop>) {
        let width = self.width;
        let last = self.stages.len() - 1;
        let stage = &mut self.stages[last];
        let ready: SmallVec<[usize; 4]> = stage
            .buffer
            .iter()
            .enumerate()
            .filter(|(_, uop)| stage.kind.can_leave(uop, now))
            .map(|(i, _)| i)
            .take(width)
            .collect();
        for (removed, i) in ready.into_iter().enumerate() {
            let Some(uop) = stage.buffer.remove(i - removed) else {
                continue;
            };
            log::debug!(
                "{}: completed {} at cycle {now}",
                stage.buffer.name(),
                uop
            );
            completed.push(uop);
        }
    }

    fn advance(
        &mut self,
        src: usize,
        now: u64,
        memory: &mut dyn Memory,
        sink: &mut dyn trace::Sink,
    ) {
        let (head, tail) = self.stages.split_at_mut(src + 1);
        let from = &mut head[src];
        let to = &mut tail[0];

        let mut moved = 0;
        let mut i = 0;
        while moved < self.width && i < from.buffer.len() {
            let Some(uop) = from.buffer.get(i) else {
                break;
            };
            if !from.kind.can_leave(uop, now) {
                i += 1;
                continue;
            }
            if to.buffer.full() {
                log::trace!("{}: full, {} stays", to.buffer.name(), uop);
                break;
            }
            if to.kind.issues_memory() {
                if let Some(kind) = uop.access_kind() {
                    let accepted = uop
                        .accesses
                        .first()
                        .map_or(true, |access| memory.can_access(kind, access.addr));
                    if !accepted {
                        log::trace!("{}: memory busy, {} stays", to.buffer.name(), uop);
                        break;
                    }
                }
            }
            let Some(mut uop) = from.buffer.remove(i) else {
                break;
            };
            to.admit(&mut uop, now);
            if to.kind.issues_memory() {
                issue_accesses(&mut uop, memory);
            }
            if sink.enabled() {
                sink.event(Event::Stage {
                    id: uop.id_in_compute_unit,
                    compute_unit: self.compute_unit_id,
                    category: self.category,
                    stage: to.kind,
                });
            }
            to.buffer.enqueue(uop);
            moved += 1;
        }
    }
}

/// Issues the remaining accesses of `uop` until memory refuses one.
fn issue_accesses(uop: &mut Uop, memory: &mut dyn Memory) {
    let Some(kind) = uop.access_kind() else {
        return;
    };
    if uop.accesses_issued == 0 {
        uop.witness = Witness::new();
    }
    let start = uop.accesses_issued;
    for access in &uop.accesses[start..] {
        if !memory.can_access(kind, access.addr) {
            break;
        }
        uop.witness.increment();
        memory.access(kind, access.addr, access.size, uop.witness.clone());
        uop.accesses_issued += 1;
    }
    log::trace!(
        "{}: issued {} of {} {} accesses, {} pending",
        uop,
        uop.accesses_issued - start,
        uop.accesses.len(),
        kind.as_ref(),
        uop.witness.pending()
    );
}

#[cfg(test)]
mod tests {
    use super::{FunctionalUnit, StageKind};
    use crate::{
        config,
        instruction::MemAccess,
        memory::{FixedLatency, Memory, Perfect},
        opcodes::Category,
        testing::ManualMemory,
        trace,
        uop::{tests::uop, Uop},
    };

    fn run(
        unit: &mut FunctionalUnit,
        memory: &mut dyn crate::memory::Memory,
        cycles: std::ops::Range<u64>,
    ) -> Vec<(u64, Uop)> {
        let mut done = Vec::new();
        for now in cycles {
            memory.cycle(now);
            let mut completed = Vec::new();
            unit.cycle(now, memory, &mut trace::Noop, &mut completed);
            done.extend(completed.into_iter().map(|uop| (now, uop)));
        }
        done
    }

    #[test]
    fn test_simd_latency() {
        let config = config::FunctionalUnit::simd();
        let mut unit = FunctionalUnit::new(Category::Simd, 0, 0, &config, 1);
        assert_eq!(
            unit.stages().iter().map(|s| s.kind).collect::<Vec<_>>(),
            vec![StageKind::Issue, StageKind::Decode, StageKind::Execute]
        );
        let mut uop = uop("v_add_f32 v0, v1, v2", vec![]);
        uop.ready.fetch_ready = 0;
        unit.issue(uop, 0, &mut trace::Noop);
        assert!(!unit.can_issue());

        let done = run(&mut unit, &mut Perfect, 0..20);
        assert_eq!(done.len(), 1);
        let (cycle, uop) = &done[0];
        // issue ready at 1, decoded at 1 ready at 2, execute at 2 ready at 10
        assert_eq!(*cycle, 10);
        assert_eq!(uop.ready.issue_ready, 1);
        assert_eq!(uop.ready.decode_ready, 2);
        assert_eq!(uop.ready.read_ready, 2);
        assert_eq!(uop.ready.execute_ready, 10);
        assert_eq!(uop.ready.write_ready, 10);
        assert!(uop.ready.is_monotonic());
        assert!(unit.is_empty());
    }

    #[test]
    fn test_backpressure_respects_capacity() {
        let config = config::FunctionalUnit::simd();
        let mut unit = FunctionalUnit::new(Category::Simd, 0, 0, &config, 1);
        let mut issued_at = Vec::new();
        let mut done = Vec::new();
        for now in 0..100 {
            let mut completed = Vec::new();
            unit.cycle(now, &mut Perfect, &mut trace::Noop, &mut completed);
            done.extend(completed.into_iter().map(|uop| (now, uop)));
            if issued_at.len() < 5 && unit.can_issue() {
                let mut uop = uop("v_mul_f32", vec![]);
                uop.id = issued_at.len() as u64;
                unit.issue(uop, now, &mut trace::Noop);
                issued_at.push(now);
            }
            for stage in unit.stages() {
                assert!(stage.buffer.len() <= stage.buffer.capacity().unwrap_or(usize::MAX));
            }
        }
        assert_eq!(done.len(), 5);

        // time in the unit is the sum of stage latencies plus stall cycles
        let latencies = 1 + config.decode_latency + config.exec_latency;
        let mut total_stall = 0;
        for (completed_at, uop) in &done {
            let ready = &uop.ready;
            assert!(ready.is_monotonic());
            let decode_admitted = ready.decode_ready - config.decode_latency;
            let execute_admitted = ready.execute_ready - config.exec_latency;
            assert!(decode_admitted >= ready.issue_ready);
            assert!(execute_admitted >= ready.decode_ready);
            assert!(*completed_at >= ready.execute_ready);
            let stall = (decode_admitted - ready.issue_ready)
                + (execute_admitted - ready.decode_ready)
                + (completed_at - ready.execute_ready);
            let issued = issued_at[uop.id as usize];
            assert_eq!(completed_at - issued, latencies + stall, "uop {}", uop.id);
            total_stall += stall;
        }
        assert_eq!(done[0].0 - issued_at[0], latencies);
        assert!(total_stall > 0, "single entry execute buffer never stalled");
    }

    #[test]
    fn test_accesses_respect_memory_inflight_cap() {
        let config = config::FunctionalUnit::memory();
        let mut unit = FunctionalUnit::new(Category::VectorMemory, 0, 0, &config, 1);
        let accesses = (0..64)
            .map(|lane| MemAccess {
                lane,
                addr: 0x1000 + 4 * lane as u64,
                size: 4,
            })
            .collect();
        unit.issue(uop("buffer_load_dword v1, v0", accesses), 0, &mut trace::Noop);

        let mut memory = FixedLatency::new(10, 2, 10).with_max_inflight(8);
        let mut max_inflight = 0;
        let mut done = Vec::new();
        for now in 0..500 {
            memory.cycle(now);
            let mut completed = Vec::new();
            unit.cycle(now, &mut memory, &mut trace::Noop, &mut completed);
            max_inflight = max_inflight.max(memory.inflight());
            assert!(memory.inflight() <= 8, "{} accesses in flight at {now}", memory.inflight());
            done.extend(completed.into_iter().map(|uop| (now, uop)));
        }
        assert_eq!(max_inflight, 8);
        assert_eq!(done.len(), 1);
        let (completed_at, uop) = &done[0];
        assert_eq!(uop.accesses_issued, 64);
        assert_eq!(uop.witness.pending(), 0);
        // eight rounds of eight accesses with global latency
        assert!(*completed_at >= 8 * 10, "completed at {completed_at}");
    }

    #[test]
    fn test_vector_memory_waits_for_all_lane_accesses() {
        let config = config::FunctionalUnit::memory();
        let mut unit = FunctionalUnit::new(Category::VectorMemory, 0, 0, &config, 1);
        let accesses = (0..4)
            .map(|lane| MemAccess {
                lane,
                addr: 0x1000 + 4 * lane as u64,
                size: 4,
            })
            .collect();
        unit.issue(uop("buffer_load_dword v1, v0", accesses), 0, &mut trace::Noop);

        let mut memory = ManualMemory::default();
        let mut completed = Vec::new();
        for now in 0..4 {
            unit.cycle(now, &mut memory, &mut trace::Noop, &mut completed);
        }
        assert_eq!(memory.pending(), 4);
        assert_eq!(unit.stage(StageKind::Mem).map(|s| s.buffer.len()), Some(1));

        // complete one access per cycle
        for now in 4..8 {
            memory.complete_one();
            unit.cycle(now, &mut memory, &mut trace::Noop, &mut completed);
            if now < 7 {
                assert_eq!(unit.stage(StageKind::Mem).map(|s| s.buffer.len()), Some(1));
            }
        }
        assert_eq!(unit.stage(StageKind::Mem).map(|s| s.buffer.len()), Some(0));
        assert_eq!(unit.stage(StageKind::Write).map(|s| s.buffer.len()), Some(1));

        unit.cycle(8, &mut memory, &mut trace::Noop, &mut completed);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].witness.pending(), 0);
        assert!(completed[0].ready.is_monotonic());
    }

    #[test]
    fn test_memory_refusal_keeps_uop_in_read() {
        let config = config::FunctionalUnit::memory();
        let mut unit = FunctionalUnit::new(Category::Lds, 0, 0, &config, 1);
        let access = MemAccess {
            lane: 0,
            addr: 0,
            size: 4,
        };
        unit.issue(uop("ds_read_b32 v0, v1", vec![access]), 0, &mut trace::Noop);
        let mut memory = FixedLatency::new(10, 2, 10).with_max_inflight(0);
        let done = run(&mut unit, &mut memory, 0..10);
        assert!(done.is_empty());
        assert_eq!(unit.stage(StageKind::Read).map(|s| s.buffer.len()), Some(1));

        memory.max_inflight = None;
        let done = run(&mut unit, &mut memory, 10..20);
        assert_eq!(done.len(), 1);
    }
}
