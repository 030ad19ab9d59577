use bitvec::{array::BitArray, BitArr};

pub const MAX_WAVEFRONT_SIZE: usize = 64;

pub type ActiveMask = BitArr!(for MAX_WAVEFRONT_SIZE, in u64);

/// A wavefront: lanes of one work-group executing in lockstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wavefront {
    /// Unique across the device
    pub id: u64,
    pub kernel_id: u64,
    pub work_group_id: u64,
    pub id_in_work_group: usize,
    /// Assigned when the work-group is mapped
    pub id_in_compute_unit: Option<usize>,
    pub pool_id: Option<usize>,
    pub entry_id: Option<usize>,
    pub active_mask: ActiveMask,

    /// Program counter of the functional emulator
    pub pc: usize,
    /// Set by the emulator once the last instruction was emulated
    pub finished: bool,
    /// Number of uops fetched so far
    pub num_uops: u64,
}

impl std::fmt::Display for Wavefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wavefront(id={}, wg={}, local={})",
            self.id, self.work_group_id, self.id_in_work_group
        )
    }
}

impl Wavefront {
    #[must_use]
    pub fn new(
        id: u64,
        kernel_id: u64,
        work_group_id: u64,
        id_in_work_group: usize,
        active_lanes: usize,
    ) -> Self {
        let mut active_mask = BitArray::ZERO;
        active_mask[..active_lanes.min(MAX_WAVEFRONT_SIZE)].fill(true);
        Self {
            id,
            kernel_id,
            work_group_id,
            id_in_work_group,
            id_in_compute_unit: None,
            pool_id: None,
            entry_id: None,
            active_mask,
            pc: 0,
            finished: false,
            num_uops: 0,
        }
    }

    #[must_use]
    pub fn active_lanes(&self) -> usize {
        self.active_mask.count_ones()
    }
}

/// Lifecycle of a work-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Mapped { compute_unit: usize, slot: usize },
    Finished,
}

/// Wavefronts mapped together onto one compute unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkGroup {
    pub id: u64,
    pub kernel_id: u64,
    pub state: State,
    pub wavefronts: Vec<Wavefront>,
    /// Wavefronts whose last uop completed
    pub wavefronts_finished: usize,
    /// Uops fetched and not yet completed
    pub inflight: usize,
}

impl std::fmt::Display for WorkGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WorkGroup({}, {} wavefronts)", self.id, self.wavefronts.len())
    }
}

impl WorkGroup {
    /// Creates a pending work-group of `threads` threads.
    ///
    /// Wavefront ids are `first_wavefront_id..`.
    #[must_use]
    pub fn new(
        id: u64,
        kernel_id: u64,
        threads: usize,
        wavefront_size: usize,
        first_wavefront_id: u64,
    ) -> Self {
        let num_wavefronts = threads.max(1).div_ceil(wavefront_size);
        let wavefronts = (0..num_wavefronts)
            .map(|i| {
                let active_lanes = (threads - i * wavefront_size).min(wavefront_size);
                Wavefront::new(first_wavefront_id + i as u64, kernel_id, id, i, active_lanes)
            })
            .collect();
        Self {
            id,
            kernel_id,
            state: State::Pending,
            wavefronts,
            wavefronts_finished: 0,
            inflight: 0,
        }
    }

    /// All wavefronts completed their last uop and nothing is in flight.
    #[must_use]
    pub fn done(&self) -> bool {
        self.wavefronts_finished == self.wavefronts.len() && self.inflight == 0
    }
}

#[cfg(test)]
mod tests {
    use super::WorkGroup;

    #[test]
    fn test_partial_last_wavefront() {
        let wg = WorkGroup::new(3, 0, 100, 64, 12);
        assert_eq!(wg.wavefronts.len(), 2);
        assert_eq!(wg.wavefronts[0].active_lanes(), 64);
        assert_eq!(wg.wavefronts[1].active_lanes(), 36);
        assert_eq!(wg.wavefronts[1].id, 13);
        assert_eq!(wg.wavefronts[1].id_in_work_group, 1);
        assert!(!wg.done());
    }
}
