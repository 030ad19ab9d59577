use bitvec::{array::BitArray, BitArr};
use std::collections::HashMap;

pub const MAX_WAVEFRONTS_PER_COMPUTE_UNIT: usize = 256;

pub type WavefrontMask = BitArr!(for MAX_WAVEFRONTS_PER_COMPUTE_UNIT);

/// Work-group barriers of one compute unit.
///
/// Wavefronts are identified by their id in the compute unit.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct BarrierSet {
    max_work_groups: usize,
    wavefronts_per_work_group: HashMap<usize, WavefrontMask>,
    active: WavefrontMask,
    at_barrier: WavefrontMask,
}

impl BarrierSet {
    #[must_use]
    pub fn new(max_work_groups: usize) -> Self {
        Self {
            max_work_groups,
            wavefronts_per_work_group: HashMap::new(),
            active: BitArray::ZERO,
            at_barrier: BitArray::ZERO,
        }
    }

    #[must_use]
    pub fn is_waiting_at_barrier(&self, wavefront: usize) -> bool {
        self.at_barrier[wavefront]
    }

    /// Allocates the barrier of the work-group in `slot`.
    pub fn allocate(&mut self, slot: usize, wavefronts: WavefrontMask) {
        assert!(slot < self.max_work_groups);
        assert!(
            self.wavefronts_per_work_group.insert(slot, wavefronts).is_none(),
            "work-group slot {slot} already has a barrier"
        );
        self.active |= wavefronts;
        self.at_barrier &= !wavefronts;
    }

    /// Deallocates the barrier once the work-group completed.
    pub fn deallocate(&mut self, slot: usize) {
        let Some(wavefronts) = self.wavefronts_per_work_group.remove(&slot) else {
            return;
        };
        let stuck = wavefronts & self.at_barrier;
        assert!(
            !stuck.any(),
            "work-group slot {slot}: wavefronts {:?} stuck at barrier",
            stuck.iter_ones().collect::<Vec<_>>()
        );
        self.active &= !wavefronts;
        self.at_barrier &= !wavefronts;
    }

    fn try_release(&mut self, wavefronts: WavefrontMask) -> Option<WavefrontMask> {
        let active = wavefronts & self.active;
        let waiting = active & self.at_barrier;
        if waiting.any() && waiting == active {
            // all wavefronts reached the barrier
            self.at_barrier &= !waiting;
            Some(waiting)
        } else {
            None
        }
    }

    /// Wavefront finished and no longer takes part in barriers.
    ///
    /// Returns the wavefronts released if the others were all waiting.
    pub fn wavefront_exited(&mut self, slot: usize, wavefront: usize) -> Option<WavefrontMask> {
        self.active.set(wavefront, false);
        self.at_barrier.set(wavefront, false);
        let wavefronts = *self.wavefronts_per_work_group.get(&slot)?;
        self.try_release(wavefronts)
    }

    /// Wavefront reached the barrier of its work-group.
    ///
    /// Returns the released wavefronts once every active wavefront of the
    /// work-group arrived, all of them in the same call.
    pub fn wavefront_reached_barrier(
        &mut self,
        slot: usize,
        wavefront: usize,
    ) -> Option<WavefrontMask> {
        let wavefronts = self
            .wavefronts_per_work_group
            .get(&slot)
            .copied()
            .unwrap_or_else(|| panic!("work-group slot {slot} has no barrier"));
        assert!(
            wavefronts[wavefront],
            "wavefront {wavefront} is not part of work-group slot {slot}"
        );
        assert!(
            self.active[wavefront],
            "finished wavefront {wavefront} reached a barrier"
        );
        self.at_barrier.set(wavefront, true);
        self.try_release(wavefronts)
    }
}

#[cfg(test)]
mod tests {
    use super::{BarrierSet, WavefrontMask};
    use bitvec::array::BitArray;

    fn mask(ids: impl IntoIterator<Item = usize>) -> WavefrontMask {
        let mut mask: WavefrontMask = BitArray::ZERO;
        for id in ids {
            mask.set(id, true);
        }
        mask
    }

    #[test]
    fn test_release_when_all_arrive() {
        let mut barriers = BarrierSet::new(4);
        barriers.allocate(1, mask(4..8));
        for id in 4..7 {
            assert_eq!(barriers.wavefront_reached_barrier(1, id), None);
            assert!(barriers.is_waiting_at_barrier(id));
        }
        let released = barriers.wavefront_reached_barrier(1, 7);
        assert_eq!(released, Some(mask(4..8)));
        assert!((4..8).all(|id| !barriers.is_waiting_at_barrier(id)));
    }

    #[test]
    fn test_exited_wavefront_releases_others() {
        let mut barriers = BarrierSet::new(4);
        barriers.allocate(0, mask(0..2));
        assert_eq!(barriers.wavefront_reached_barrier(0, 0), None);
        assert_eq!(barriers.wavefront_exited(0, 1), Some(mask([0])));
        barriers.wavefront_exited(0, 0);
        barriers.deallocate(0);
    }

    #[test]
    fn test_barrier_as_last_instruction() {
        let mut barriers = BarrierSet::new(4);
        barriers.allocate(0, mask(0..2));
        assert_eq!(barriers.wavefront_reached_barrier(0, 0), None);
        assert_eq!(barriers.wavefront_exited(0, 0), None);
        assert!(!barriers.is_waiting_at_barrier(0));
        assert_eq!(barriers.wavefront_reached_barrier(0, 1), Some(mask([1])));
        assert_eq!(barriers.wavefront_exited(0, 1), None);
        barriers.deallocate(0);
    }

    #[test]
    #[should_panic(expected = "stuck at barrier")]
    fn test_deallocate_with_waiting_wavefront_panics() {
        let mut barriers = BarrierSet::new(4);
        barriers.allocate(0, mask(0..2));
        barriers.wavefront_reached_barrier(0, 0);
        barriers.deallocate(0);
    }
}
