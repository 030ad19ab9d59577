use crate::{
    address,
    sync::{atomic, Arc},
};

/// Outstanding-access counter of one uop.
///
/// The compute unit increments it once per issued access; the memory model
/// completes each access by calling [`Witness::complete`].
#[derive(Debug, Clone, Default)]
pub struct Witness(Arc<atomic::AtomicUsize>);

impl Witness {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, atomic::Ordering::SeqCst);
    }

    pub fn complete(&self) {
        let before = self.0.fetch_sub(1, atomic::Ordering::SeqCst);
        assert!(before > 0, "witness completed more accesses than issued");
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.0.load(atomic::Ordering::SeqCst)
    }
}

#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, strum::AsRefStr, serde::Serialize, serde::Deserialize,
)]
pub enum AccessKind {
    Load,
    Store,
    Atomic,
    LdsLoad,
    LdsStore,
    LdsAtomic,
    ScalarLoad,
}

impl AccessKind {
    #[must_use]
    pub fn is_lds(self) -> bool {
        matches!(self, Self::LdsLoad | Self::LdsStore | Self::LdsAtomic)
    }
}

/// Memory hierarchy seen by the compute units.
pub trait Memory: std::fmt::Debug {
    /// Whether a new access can be accepted this cycle.
    fn can_access(&self, kind: AccessKind, addr: address) -> bool;

    /// Issues an access. The model completes `witness` once it is done.
    fn access(&mut self, kind: AccessKind, addr: address, size: u32, witness: Witness);

    /// Advances the model to cycle `cycle`.
    fn cycle(&mut self, cycle: u64);

    /// Number of accesses not completed yet.
    fn inflight(&self) -> usize;
}

/// Memory that completes every access as soon as it is issued.
#[derive(Debug, Default)]
pub struct Perfect;

impl Memory for Perfect {
    fn can_access(&self, _kind: AccessKind, _addr: address) -> bool {
        true
    }

    fn access(&mut self, kind: AccessKind, addr: address, size: u32, witness: Witness) {
        log::trace!("perfect memory: {:?} {addr:#x} ({size} bytes)", kind);
        witness.complete();
    }

    fn cycle(&mut self, _cycle: u64) {}

    fn inflight(&self) -> usize {
        0
    }
}

#[derive(Debug)]
struct Pending {
    ready_cycle: u64,
    witness: Witness,
}

/// Memory completing every access after a fixed number of cycles.
#[derive(Debug)]
pub struct FixedLatency {
    pub global_latency: u64,
    pub lds_latency: u64,
    pub scalar_latency: u64,
    /// When set, accesses are refused while this many are in flight
    pub max_inflight: Option<usize>,
    cycle: u64,
    pending: Vec<Pending>,
}

impl Default for FixedLatency {
    fn default() -> Self {
        Self::new(100, 2, 10)
    }
}

impl FixedLatency {
    #[must_use]
    pub fn new(global_latency: u64, lds_latency: u64, scalar_latency: u64) -> Self {
        Self {
            global_latency,
            lds_latency,
            scalar_latency,
            max_inflight: None,
            cycle: 0,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_inflight(mut self, max_inflight: usize) -> Self {
        self.max_inflight = Some(max_inflight);
        self
    }

    fn latency(&self, kind: AccessKind) -> u64 {
        match kind {
            AccessKind::Load | AccessKind::Store | AccessKind::Atomic => self.global_latency,
            AccessKind::LdsLoad | AccessKind::LdsStore | AccessKind::LdsAtomic => self.lds_latency,
            AccessKind::ScalarLoad => self.scalar_latency,
        }
    }
}

impl Memory for FixedLatency {
    fn can_access(&self, _kind: AccessKind, _addr: address) -> bool {
        self.max_inflight
            .map_or(true, |max| self.pending.len() < max)
    }

    fn access(&mut self, kind: AccessKind, addr: address, size: u32, witness: Witness) {
        let ready_cycle = self.cycle + self.latency(kind);
        log::trace!(
            "fixed latency memory: {} {addr:#x} ({size} bytes) ready at cycle {ready_cycle}",
            kind.as_ref()
        );
        self.pending.push(Pending {
            ready_cycle,
            witness,
        });
    }

    fn cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
        self.pending.retain(|pending| {
            if pending.ready_cycle <= cycle {
                pending.witness.complete();
                false
            } else {
                true
            }
        });
    }

    fn inflight(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessKind, FixedLatency, Memory, Witness};

    #[test]
    fn test_witness_counts_accesses() {
        let witness = Witness::new();
        witness.increment();
        witness.increment();
        let shared = witness.clone();
        shared.complete();
        assert_eq!(witness.pending(), 1);
        shared.complete();
        assert_eq!(witness.pending(), 0);
    }

    #[test]
    fn test_fixed_latency_completes_after_latency() {
        let mut mem = FixedLatency::new(3, 1, 1).with_max_inflight(2);
        let witness = Witness::new();
        mem.cycle(10);
        for addr in [0x100, 0x104] {
            assert!(mem.can_access(AccessKind::Load, addr));
            witness.increment();
            mem.access(AccessKind::Load, addr, 4, witness.clone());
        }
        assert!(!mem.can_access(AccessKind::Load, 0x108));

        mem.cycle(12);
        assert_eq!(witness.pending(), 2);
        mem.cycle(13);
        assert_eq!(witness.pending(), 0);
        assert_eq!(mem.inflight(), 0);
        assert!(mem.can_access(AccessKind::Load, 0x108));
    }
}
