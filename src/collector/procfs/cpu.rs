//! Windowed CPU-utilization sampling.
//!
//! A single instantaneous CPU-percent read is too noisy to graph, so the
//! sampler takes a burst of interval-spaced readings and reduces them to
//! average and maximum. With the defaults (20 samples at 100 ms) one
//! process costs about two seconds of wall time, and processes are sampled
//! sequentially: total cycle latency grows linearly with the number of
//! running processes. Both knobs are configuration.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::collector::procfs::parser::parse_proc_stat;
use crate::collector::procfs::process::SampleError;
use crate::collector::traits::FileSystem;

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: u64 = 100;

/// Default number of readings per window.
pub const DEFAULT_SAMPLES: usize = 20;
/// Default spacing between readings.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Smoothed CPU utilization for one process over one sampling window.
///
/// Values are percentages of one CPU; a process busy on several cores at
/// once reads above 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuWindow {
    pub avg: f64,
    pub max: f64,
}

impl CpuWindow {
    /// Reduces a burst of instantaneous readings. No samples are discarded.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self { avg: 0.0, max: 0.0 };
        }
        let sum: f64 = samples.iter().sum();
        let max = samples.iter().copied().fold(f64::MIN, f64::max);
        Self {
            avg: sum / samples.len() as f64,
            max,
        }
    }
}

/// Takes windowed CPU-percent bursts from `/proc/[pid]/stat`.
pub struct CpuSampler<F: FileSystem> {
    fs: F,
    proc_path: String,
    samples: usize,
    interval: Duration,
}

impl<F: FileSystem> CpuSampler<F> {
    /// Creates a sampler with the default 20 x 100 ms window.
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            samples: DEFAULT_SAMPLES,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Overrides the window shape. A zero `samples` count yields an empty
    /// window (avg and max both zero).
    pub fn with_window(mut self, samples: usize, interval: Duration) -> Self {
        self.samples = samples;
        self.interval = interval;
        self
    }

    /// Samples one window for `pid`. Blocks for roughly
    /// `samples * interval`.
    ///
    /// The process disappearing at any point abandons the window with
    /// `ProcessGone`; no partial figures are reported.
    pub fn sample(&self, pid: u32) -> Result<CpuWindow, SampleError> {
        let mut readings = Vec::with_capacity(self.samples);
        let mut prev_ticks = self.busy_ticks(pid)?;
        let mut prev_at = Instant::now();

        for _ in 0..self.samples {
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
            let ticks = self.busy_ticks(pid)?;
            let now = Instant::now();
            readings.push(cpu_percent(prev_ticks, ticks, (now - prev_at).as_secs_f64()));
            prev_ticks = ticks;
            prev_at = now;
        }

        Ok(CpuWindow::from_samples(&readings))
    }

    /// Reads accumulated user+system CPU ticks for `pid`.
    fn busy_ticks(&self, pid: u32) -> Result<u64, SampleError> {
        let path = format!("{}/{}/stat", self.proc_path, pid);
        let content = self
            .fs
            .read_to_string(Path::new(&path))
            .map_err(|_| SampleError::ProcessGone(pid))?;
        let stat = parse_proc_stat(&content).map_err(|e| SampleError::Parse(e.message))?;
        Ok(stat.utime + stat.stime)
    }
}

/// Busy-tick delta over one wall-clock window, as a percentage of one CPU.
fn cpu_percent(prev_ticks: u64, ticks: u64, elapsed_secs: f64) -> f64 {
    let busy_secs = ticks.saturating_sub(prev_ticks) as f64 / CLK_TCK as f64;
    // The window can only measure zero-length when the configured interval
    // is zero.
    let window = elapsed_secs.max(1e-9);
    busy_secs / window * 100.0
}
