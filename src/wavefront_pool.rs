/// Location of a wavefront inside its compute unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WavefrontRef {
    /// Work-group slot
    pub slot: usize,
    /// Index of the wavefront within the work-group
    pub index: usize,
}

/// Scheduling state of one wavefront.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub id_in_pool: usize,
    pub wavefront: Option<WavefrontRef>,

    pub valid: bool,
    /// May fetch its next instruction
    pub ready: bool,
    /// Becomes ready at the start of the next fetch
    pub ready_next_cycle: bool,
    pub wait_for_mem: bool,
    pub wait_for_barrier: bool,
    /// The last instruction completed
    pub wavefront_finished: bool,

    /// Outstanding vector memory instructions
    pub vm_cnt: usize,
    /// Outstanding LDS and scalar memory instructions
    pub lgkm_cnt: usize,
    /// Outstanding exports
    pub exp_cnt: usize,
}

impl Entry {
    fn bind(&mut self, wavefront: WavefrontRef) {
        assert!(
            !self.valid,
            "entry {} already holds {:?}",
            self.id_in_pool, self.wavefront
        );
        *self = Self {
            id_in_pool: self.id_in_pool,
            wavefront: Some(wavefront),
            valid: true,
            ready: true,
            ..Self::default()
        };
    }

    fn clear(&mut self) {
        *self = Self {
            id_in_pool: self.id_in_pool,
            ..Self::default()
        };
    }

    /// No memory counter is outstanding.
    #[must_use]
    pub fn memory_drained(&self) -> bool {
        self.vm_cnt == 0 && self.lgkm_cnt == 0 && self.exp_cnt == 0
    }
}

/// Fixed-size table of wavefront entries served by one SIMD unit.
#[derive(Debug)]
pub struct WavefrontPool {
    pub id: usize,
    entries: Box<[Entry]>,
    /// Entry examined by the next fetch
    next: usize,
}

impl WavefrontPool {
    #[must_use]
    pub fn new(id: usize, size: usize) -> Self {
        let entries = (0..size)
            .map(|id_in_pool| Entry {
                id_in_pool,
                ..Entry::default()
            })
            .collect();
        Self {
            id,
            entries,
            next: 0,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    #[must_use]
    pub fn entry(&self, id: usize) -> &Entry {
        &self.entries[id]
    }

    pub fn entry_mut(&mut self, id: usize) -> &mut Entry {
        &mut self.entries[id]
    }

    #[must_use]
    pub fn num_valid(&self) -> usize {
        self.entries.iter().filter(|entry| entry.valid).count()
    }

    pub fn map(&mut self, entry: usize, wavefront: WavefrontRef) {
        assert!(
            entry < self.entries.len(),
            "pool {}: entry {entry} out of range for {} entries",
            self.id,
            self.entries.len()
        );
        self.entries[entry].bind(wavefront);
    }

    pub fn unmap(&mut self, entry: usize) {
        assert!(
            self.entries[entry].valid,
            "pool {}: unmap of empty entry {entry}",
            self.id
        );
        self.entries[entry].clear();
    }

    /// Releases entries that set `ready_next_cycle` in the previous cycle.
    ///
    /// Returns a mask of the released entries.
    pub fn release_ready_next_cycle(&mut self) -> Vec<bool> {
        self.entries
            .iter_mut()
            .map(|entry| {
                if entry.ready_next_cycle {
                    entry.ready_next_cycle = false;
                    entry.ready = true;
                    true
                } else {
                    false
                }
            })
            .collect()
    }

    /// Returns the entry to examine this cycle and moves the round-robin
    /// pointer to the next valid entry.
    pub fn select(&mut self) -> Option<usize> {
        let n = self.entries.len();
        let selected = (0..n)
            .map(|offset| (self.next + offset) % n)
            .find(|&i| self.entries[i].valid)?;
        self.next = (selected + 1) % n;
        Some(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::{WavefrontPool, WavefrontRef};

    #[test]
    fn test_map_unmap_restores_entry() {
        let mut pool = WavefrontPool::new(0, 4);
        let before = pool.entries().to_vec();
        pool.map(1, WavefrontRef { slot: 0, index: 2 });
        assert!(pool.entry(1).valid);
        assert!(pool.entry(1).ready);
        assert_eq!(pool.num_valid(), 1);
        pool.entry_mut(1).vm_cnt = 0;
        pool.unmap(1);
        assert_eq!(pool.entries(), &before[..]);
    }

    #[test]
    fn test_round_robin_skips_invalid_entries() {
        let mut pool = WavefrontPool::new(0, 4);
        assert_eq!(pool.select(), None);
        pool.map(0, WavefrontRef { slot: 0, index: 0 });
        pool.map(2, WavefrontRef { slot: 0, index: 1 });
        assert_eq!(pool.select(), Some(0));
        assert_eq!(pool.select(), Some(2));
        assert_eq!(pool.select(), Some(0));
    }

    #[test]
    fn test_release_ready_next_cycle() {
        let mut pool = WavefrontPool::new(0, 2);
        pool.map(0, WavefrontRef { slot: 0, index: 0 });
        pool.entry_mut(0).ready = false;
        pool.entry_mut(0).ready_next_cycle = true;
        assert_eq!(pool.release_ready_next_cycle(), vec![true, false]);
        assert!(pool.entry(0).ready);
        assert_eq!(pool.release_ready_next_cycle(), vec![false, false]);
    }

    #[test]
    #[should_panic(expected = "already holds")]
    fn test_double_map_panics() {
        let mut pool = WavefrontPool::new(0, 1);
        pool.map(0, WavefrontRef { slot: 0, index: 0 });
        pool.map(0, WavefrontRef { slot: 1, index: 0 });
    }
}
