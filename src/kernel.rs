use crate::wavefront::WorkGroup;
use serde::{Deserialize, Serialize};

/// Launch configuration of a kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelLaunch {
    pub id: u64,
    pub name: String,
    pub num_work_groups: usize,
    pub threads_per_work_group: usize,
    /// Vector registers per work item
    pub vector_registers_per_thread: usize,
    /// Scalar registers per wavefront
    pub scalar_registers_per_wavefront: usize,
    /// LDS bytes per work-group
    pub lds_per_work_group: usize,
}

impl Default for KernelLaunch {
    fn default() -> Self {
        Self {
            id: 0,
            name: "kernel".to_string(),
            num_work_groups: 1,
            threads_per_work_group: 64,
            vector_registers_per_thread: 0,
            scalar_registers_per_wavefront: 0,
            lds_per_work_group: 0,
        }
    }
}

impl std::fmt::Display for KernelLaunch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Kernel(id={}, name={}, grid={}, block={})",
            self.id, self.name, self.num_work_groups, self.threads_per_work_group
        )
    }
}

/// A launched kernel and the execution state of its work-groups.
#[derive(Debug)]
pub struct Kernel {
    pub launch: KernelLaunch,
    wavefront_size: usize,
    next_work_group: usize,
    running: usize,
    completed: usize,
    pub start_cycle: Option<u64>,
    pub completed_cycle: Option<u64>,
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.launch.fmt(f)
    }
}

impl Kernel {
    #[must_use]
    pub fn new(launch: KernelLaunch, wavefront_size: usize) -> Self {
        Self {
            launch,
            wavefront_size,
            next_work_group: 0,
            running: 0,
            completed: 0,
            start_cycle: None,
            completed_cycle: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.launch.id
    }

    #[must_use]
    pub fn wavefronts_per_work_group(&self) -> usize {
        self.launch
            .threads_per_work_group
            .max(1)
            .div_ceil(self.wavefront_size)
    }

    #[must_use]
    pub fn has_pending_work_groups(&self) -> bool {
        self.next_work_group < self.launch.num_work_groups
    }

    /// Takes the next pending work-group.
    pub fn next_work_group(&mut self) -> Option<WorkGroup> {
        if !self.has_pending_work_groups() {
            return None;
        }
        let id = self.next_work_group;
        self.next_work_group += 1;
        self.running += 1;
        let first_wavefront_id = (id * self.wavefronts_per_work_group()) as u64;
        Some(WorkGroup::new(
            id as u64,
            self.launch.id,
            self.launch.threads_per_work_group,
            self.wavefront_size,
            first_wavefront_id,
        ))
    }

    pub fn work_group_completed(&mut self) {
        assert!(self.running > 0, "{self}: no running work-group completed");
        self.running -= 1;
        self.completed += 1;
    }

    #[must_use]
    pub fn num_running_work_groups(&self) -> usize {
        self.running
    }

    #[must_use]
    pub fn num_completed_work_groups(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn done(&self) -> bool {
        !self.has_pending_work_groups() && self.running == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Kernel, KernelLaunch};

    #[test]
    fn test_work_group_lifecycle() {
        let mut kernel = Kernel::new(
            KernelLaunch {
                num_work_groups: 2,
                threads_per_work_group: 128,
                ..KernelLaunch::default()
            },
            64,
        );
        assert_eq!(kernel.wavefronts_per_work_group(), 2);
        let first = kernel.next_work_group().unwrap();
        let second = kernel.next_work_group().unwrap();
        assert!(kernel.next_work_group().is_none());
        assert_eq!(first.wavefronts[0].id, 0);
        assert_eq!(second.wavefronts[0].id, 2);
        assert!(!kernel.done());

        kernel.work_group_completed();
        kernel.work_group_completed();
        assert!(kernel.done());
        assert_eq!(kernel.num_completed_work_groups(), 2);
    }
}
