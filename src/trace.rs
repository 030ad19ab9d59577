use crate::{
    func_unit::StageKind,
    opcodes::Category,
    sync::{Arc, Mutex},
    uop::Timestamps,
};

/// Pipeline trace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A uop was fetched
    NewInst {
        id: u64,
        compute_unit: usize,
        pool: usize,
        work_group: u64,
        wavefront: u64,
        id_in_wavefront: u64,
        asm: String,
    },
    /// A uop entered a functional unit stage
    Stage {
        id: u64,
        compute_unit: usize,
        category: Category,
        stage: StageKind,
    },
    /// A fetched uop could not be issued this cycle
    Stall { id: u64, compute_unit: usize },
    /// A uop left the pipeline
    EndInst {
        id: u64,
        compute_unit: usize,
        cycle: u64,
        ready: Timestamps,
    },
    MapWorkGroup {
        compute_unit: usize,
        work_group: u64,
        first_wavefront: u64,
        num_wavefronts: usize,
    },
    UnmapWorkGroup { compute_unit: usize, work_group: u64 },
}

fn unit_name(category: Category) -> &'static str {
    match category {
        Category::Branch => "bu",
        Category::Scalar => "su",
        Category::Simd => "simd",
        Category::VectorMemory => "vm",
        Category::Lds => "lds",
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewInst {
                id,
                compute_unit,
                pool,
                work_group,
                wavefront,
                id_in_wavefront,
                asm,
            } => write!(
                f,
                "new_inst id={id} cu={compute_unit} ib={pool} wg={work_group} wf={wavefront} uop_id={id_in_wavefront} stg=\"f\" asm=\"{asm}\""
            ),
            Self::Stage {
                id,
                compute_unit,
                category,
                stage,
            } => write!(
                f,
                "inst id={id} cu={compute_unit} stg=\"{}-{stage}\"",
                unit_name(*category)
            ),
            Self::Stall { id, compute_unit } => {
                write!(f, "inst id={id} cu={compute_unit} stg=\"s\"")
            }
            Self::EndInst {
                id, compute_unit, ..
            } => write!(f, "end_inst id={id} cu={compute_unit}"),
            Self::MapWorkGroup {
                compute_unit,
                work_group,
                first_wavefront,
                num_wavefronts,
            } => write!(
                f,
                "map_wg cu={compute_unit} wg={work_group} wf_first={first_wavefront} wf_count={num_wavefronts}"
            ),
            Self::UnmapWorkGroup {
                compute_unit,
                work_group,
            } => write!(f, "unmap_wg cu={compute_unit} wg={work_group}"),
        }
    }
}

/// Receiver of pipeline trace events.
pub trait Sink: std::fmt::Debug {
    fn event(&mut self, event: Event);

    /// Producers skip building events for disabled sinks.
    fn enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

impl Sink for Noop {
    fn event(&mut self, _event: Event) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Writes events as trace lines through `log` under the `trace` target.
#[derive(Debug, Clone)]
pub struct Log {
    prefix: &'static str,
}

impl Log {
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

impl Sink for Log {
    fn event(&mut self, event: Event) {
        log::trace!(target: "trace", "{}.{}", self.prefix, event);
    }

    fn enabled(&self) -> bool {
        log::log_enabled!(target: "trace", log::Level::Trace)
    }
}

/// Keeps every event in memory.
///
/// Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Sink for Recorder {
    fn event(&mut self, event: Event) {
        self.events.lock().push(event);
    }
}
