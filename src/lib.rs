#![allow(
    clippy::upper_case_acronyms,
    non_camel_case_types,
    clippy::too_many_arguments,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::too_many_lines,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

pub mod barrier;
pub mod config;
pub mod core;
pub mod device;
pub mod emu;
pub mod fifo;
pub mod func_unit;
pub mod instruction;
pub mod kernel;
pub mod memory;
pub mod occupancy;
pub mod opcodes;
pub mod stats;
pub mod sync;
pub mod trace;
pub mod uop;
pub mod wavefront;
pub mod wavefront_pool;

#[cfg(test)]
pub mod testing;

pub use device::{Device, Error, FinishReason, LaunchError, Status};

use crate::sync::Mutex;
use std::collections::HashMap;

pub type address = u64;

#[derive(Default, Debug)]
pub struct TotalDuration {
    count: u128,
    dur: std::time::Duration,
}

impl TotalDuration {
    pub fn add(&mut self, dur: std::time::Duration) {
        self.count += 1;
        self.dur += dur;
    }

    #[must_use]
    pub fn count(&self) -> u128 {
        self.count
    }

    #[must_use]
    pub fn total(&self) -> &std::time::Duration {
        &self.dur
    }

    #[must_use]
    pub fn mean(&self) -> std::time::Duration {
        if self.count == 0 {
            return std::time::Duration::ZERO;
        }
        let nanos = u64::try_from(self.dur.as_nanos() / self.count).unwrap_or(u64::MAX);
        std::time::Duration::from_nanos(nanos)
    }
}

/// Wall clock time per simulation phase, filled by [`timeit!`] when the
/// `timings` feature is enabled.
pub static TIMINGS: once_cell::sync::Lazy<Mutex<HashMap<&'static str, TotalDuration>>> =
    once_cell::sync::Lazy::new(|| Mutex::new(HashMap::default()));

#[macro_export]
macro_rules! timeit {
    ($name:expr, $call:expr) => {{
        #[cfg(feature = "timings")]
        {
            let start = std::time::Instant::now();
            let res = $call;
            let dur = start.elapsed();
            let mut timings = $crate::TIMINGS.lock();
            timings.entry($name).or_default().add(dur);
            drop(timings);
            res
        }
        #[cfg(not(feature = "timings"))]
        $call
    }};
    ($call:expr) => {{
        $crate::timeit!(stringify!($call), $call)
    }};
}
