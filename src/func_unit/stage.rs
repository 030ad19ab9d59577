use crate::{fifo::Fifo, uop::Uop};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display)]
pub enum StageKind {
    #[strum(serialize = "issue")]
    Issue,
    #[strum(serialize = "decode")]
    Decode,
    #[strum(serialize = "read")]
    Read,
    #[strum(serialize = "exec")]
    Execute,
    #[strum(serialize = "mem")]
    Mem,
    #[strum(serialize = "write")]
    Write,
}

impl StageKind {
    /// Uops entering this stage issue their memory accesses.
    #[must_use]
    pub fn issues_memory(self) -> bool {
        matches!(self, Self::Execute | Self::Mem)
    }

    /// Cycle from which a uop may leave this stage.
    #[must_use]
    pub fn ready_at(self, uop: &Uop) -> u64 {
        match self {
            Self::Issue => uop.ready.issue_ready,
            Self::Decode => uop.ready.decode_ready,
            Self::Read => uop.ready.read_ready,
            Self::Execute | Self::Mem => uop.ready.execute_ready,
            Self::Write => uop.ready.write_ready,
        }
    }

    #[must_use]
    pub fn can_leave(self, uop: &Uop, now: u64) -> bool {
        if now < self.ready_at(uop) {
            return false;
        }
        !self.issues_memory() || (uop.all_accesses_issued() && uop.witness.pending() == 0)
    }
}

/// One bounded stage buffer of a functional unit.
#[derive(Debug)]
pub struct Stage {
    pub kind: StageKind,
    pub latency: u64,
    pub buffer: Fifo<Uop>,
}

impl Stage {
    #[must_use]
    pub fn new(kind: StageKind, latency: u64, capacity: usize, name: impl Into<String>) -> Self {
        Self {
            kind,
            latency,
            buffer: Fifo::new(name, Some(capacity)),
        }
    }

    /// Stamps the ready cycle of a uop admitted into this stage at `now`.
    ///
    /// Units without a read stage admit straight into execute, which then
    /// also covers register read and writeback.
    pub fn admit(&self, uop: &mut Uop, now: u64) {
        let ready = now + self.latency;
        match self.kind {
            StageKind::Issue => uop.ready.issue_ready = ready,
            StageKind::Decode => uop.ready.decode_ready = ready,
            StageKind::Read => uop.ready.read_ready = ready,
            StageKind::Execute | StageKind::Mem => {
                if uop.ready.read_ready < uop.ready.decode_ready {
                    uop.ready.read_ready = now;
                }
                uop.ready.execute_ready = ready;
                uop.ready.write_ready = ready;
            }
            StageKind::Write => uop.ready.write_ready = ready,
        }
    }
}
