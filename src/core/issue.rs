use super::ComputeUnit;
use crate::{
    fifo::Fifo,
    func_unit::FunctionalUnit,
    opcodes::Category,
    trace::{self, Event},
    uop::Uop,
};

/// Categories in the order they are issued each cycle.
const ISSUE_ORDER: [Category; 5] = [
    Category::Branch,
    Category::Scalar,
    Category::Simd,
    Category::VectorMemory,
    Category::Lds,
];

/// Position of the uop of `category` with the smallest fetch ready cycle,
/// the first one in buffer order on ties.
fn oldest(buffer: &Fifo<Uop>, category: Category, now: u64) -> Option<usize> {
    buffer
        .iter()
        .enumerate()
        .filter(|(_, uop)| uop.category == Some(category) && uop.ready.fetch_ready <= now)
        .min_by_key(|(_, uop)| uop.ready.fetch_ready)
        .map(|(i, _)| i)
}

impl ComputeUnit {
    fn unit_mut(&mut self, category: Category, pool_id: usize) -> Option<&mut FunctionalUnit> {
        match category {
            Category::Branch => Some(&mut self.branch_unit),
            Category::Scalar => self.scalar_unit.as_mut(),
            Category::Simd => self.simd_units.get_mut(pool_id),
            Category::VectorMemory => Some(&mut self.vector_mem_unit),
            Category::Lds => Some(&mut self.lds_unit),
        }
    }

    /// Moves fetched uops into the issue buffers of their functional units.
    pub(super) fn issue(&mut self, now: u64, sink: &mut dyn trace::Sink) {
        for pool_id in 0..self.fetch_buffers.len() {
            self.issue_from_fetch_buffer(pool_id, now, sink);
        }
    }

    fn issue_from_fetch_buffer(&mut self, pool_id: usize, now: u64, sink: &mut dyn trace::Sink) {
        if let Some(uop) = self.fetch_buffers[pool_id]
            .iter()
            .find(|uop| uop.category.is_none() && uop.ready.fetch_ready <= now)
        {
            panic!("cu {}: {uop} has no functional unit", self.id);
        }

        let issue_width = self.config.front_end.issue_width;
        let max_per_category = self.config.front_end.max_inst_issued_per_type;
        let mut issued = 0;

        'categories: for category in ISSUE_ORDER {
            for _ in 0..max_per_category {
                if issued >= issue_width {
                    break 'categories;
                }
                let Some(index) = oldest(&self.fetch_buffers[pool_id], category, now) else {
                    break;
                };
                let can_issue = self
                    .unit_mut(category, pool_id)
                    .is_some_and(|unit| unit.can_issue());
                if !can_issue {
                    log::trace!(
                        "cu {}: {} issue buffer full for pool {pool_id}",
                        self.id,
                        category
                    );
                    break;
                }
                let Some(uop) = self.fetch_buffers[pool_id].remove(index) else {
                    break;
                };
                self.dispatched(&uop);
                self.stats.inc_issued(category);
                if let Some(unit) = self.unit_mut(category, pool_id) {
                    unit.issue(uop, now, sink);
                }
                issued += 1;
            }
        }

        let stalled = self.fetch_buffers[pool_id]
            .iter()
            .filter(|uop| uop.ready.fetch_ready <= now);
        for uop in stalled {
            self.stats.issue_stalls += 1;
            if sink.enabled() {
                sink.event(Event::Stall {
                    id: uop.id_in_compute_unit,
                    compute_unit: self.id,
                });
            }
        }
    }

    /// Updates the pool entry of a uop leaving the fetch buffer.
    ///
    /// Most uops let their wavefront fetch again in the next cycle. Memory
    /// uops are counted as outstanding until they complete.
    fn dispatched(&mut self, uop: &Uop) {
        let entry = self.pools[uop.pool_id].entry_mut(uop.entry_id);
        if !uop.blocks_fetch_until_complete() {
            entry.ready_next_cycle = true;
        }
        let flags = &uop.flags;
        if flags.vector_mem_read || flags.vector_mem_write {
            entry.vm_cnt += 1;
        }
        if flags.lds_read || flags.lds_write || flags.scalar_mem_read {
            entry.lgkm_cnt += 1;
        }
    }
}
