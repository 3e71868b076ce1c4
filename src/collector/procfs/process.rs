//! Per-process resource counters from `/proc/[pid]/`.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::collector::procfs::parser::{
    parse_mem_total_kb, parse_proc_stat, parse_proc_status,
};
use crate::collector::traits::FileSystem;

/// Page size in bytes. Standard value for Linux.
const PAGE_SIZE: u64 = 4096;

/// Error type for sampling failures.
#[derive(Debug)]
pub enum SampleError {
    /// Process disappeared between discovery and (or during) sampling.
    ProcessGone(u32),
    /// I/O error reading process files.
    Io(io::Error),
    /// Parse error in process files.
    Parse(String),
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            SampleError::Io(e) => write!(f, "I/O error: {}", e),
            SampleError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for SampleError {}

impl From<io::Error> for SampleError {
    fn from(e: io::Error) -> Self {
        SampleError::Io(e)
    }
}

/// Outcome of one sub-measurement for one process.
///
/// `Skipped` means the reading was not requested (its graphs are disabled);
/// `Denied` means the kernel withheld it. Both render as an absent data
/// point, but tests and logs can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reading<T> {
    Value(T),
    Skipped,
    Denied,
}

impl<T> Reading<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::Skipped | Reading::Denied => None,
        }
    }
}

/// Resource counters for one process, taken in a single pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSample {
    pub num_fds: Reading<u64>,
    pub num_threads: u32,
    pub ctx_voluntary: u64,
    pub ctx_involuntary: u64,
    /// Resident set size as a percentage of total system memory.
    pub memory_percent: f64,
    pub num_connections: Reading<u64>,
}

/// Reads per-process resource counters from `/proc/[pid]/`.
pub struct ResourceSampler<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ResourceSampler<F> {
    /// Creates a new sampler.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Total system memory in MiB, re-read on every call so a runtime
    /// change in total memory is reflected immediately.
    pub fn total_memory_mib(&self) -> Result<f64, SampleError> {
        let path = format!("{}/meminfo", self.proc_path);
        let content = self.fs.read_to_string(Path::new(&path))?;
        let total_kb =
            parse_mem_total_kb(&content).map_err(|e| SampleError::Parse(e.message))?;
        Ok(total_kb as f64 / 1024.0)
    }

    /// Collects one resource sample for `pid`.
    ///
    /// `walk_fds` gates the `/proc/[pid]/fd` walk; when false the fd and
    /// connection readings come back `Skipped`. A permission-denied fd
    /// table yields `Denied` for both without failing the sample; the
    /// process disappearing fails the whole sample with `ProcessGone`.
    pub fn sample(&self, pid: u32, walk_fds: bool) -> Result<ResourceSample, SampleError> {
        let proc_dir = format!("{}/{}", self.proc_path, pid);

        let stat_path = format!("{}/stat", proc_dir);
        let stat_content = self
            .fs
            .read_to_string(Path::new(&stat_path))
            .map_err(|_| SampleError::ProcessGone(pid))?;
        let stat =
            parse_proc_stat(&stat_content).map_err(|e| SampleError::Parse(e.message))?;

        let status_path = format!("{}/status", proc_dir);
        let status_content = self
            .fs
            .read_to_string(Path::new(&status_path))
            .map_err(|_| SampleError::ProcessGone(pid))?;
        let status =
            parse_proc_status(&status_content).map_err(|e| SampleError::Parse(e.message))?;

        let total_mib = self.total_memory_mib()?;
        let rss_mib = (stat.rss_pages.max(0) as u64 * PAGE_SIZE) as f64 / (1024.0 * 1024.0);
        let memory_percent = if total_mib > 0.0 {
            rss_mib / total_mib * 100.0
        } else {
            0.0
        };

        let (num_fds, num_connections) = if walk_fds {
            self.fd_readings(pid, &proc_dir)?
        } else {
            (Reading::Skipped, Reading::Skipped)
        };

        Ok(ResourceSample {
            num_fds,
            num_threads: stat.num_threads,
            ctx_voluntary: status.voluntary_ctxt_switches,
            ctx_involuntary: status.nonvoluntary_ctxt_switches,
            memory_percent,
            num_connections,
        })
    }

    /// Walks `/proc/[pid]/fd`, counting entries and `socket:` targets.
    fn fd_readings(
        &self,
        pid: u32,
        proc_dir: &str,
    ) -> Result<(Reading<u64>, Reading<u64>), SampleError> {
        let fd_dir = PathBuf::from(format!("{}/fd", proc_dir));
        let entries = match self.fs.read_dir(&fd_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!("fd table for pid {} is not readable", pid);
                return Ok((Reading::Denied, Reading::Denied));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SampleError::ProcessGone(pid));
            }
            Err(e) => return Err(SampleError::Io(e)),
        };

        let num_fds = entries.len() as u64;
        // Descriptors closed between the listing and the link lookup are
        // simply not counted.
        let num_connections = entries
            .iter()
            .filter_map(|entry| self.fs.read_link(entry).ok())
            .filter(|target| target.to_string_lossy().starts_with("socket:"))
            .count() as u64;

        Ok((Reading::Value(num_fds), Reading::Value(num_connections)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_sample_typical_process() {
        let fs = MockFs::supervised_workers();
        let sampler = ResourceSampler::new(fs, "/proc");

        let sample = sampler.sample(101, true).unwrap();
        assert_eq!(sample.num_threads, 4);
        assert_eq!(sample.ctx_voluntary, 1500);
        assert_eq!(sample.ctx_involuntary, 37);
        assert_eq!(sample.num_fds, Reading::Value(4));
        assert_eq!(sample.num_connections, Reading::Value(2));
        // 25600 pages * 4096 B = 100 MiB of 4000 MiB total.
        assert!((sample.memory_percent - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_sample_skips_fd_walk_when_not_requested() {
        let fs = MockFs::supervised_workers();
        let sampler = ResourceSampler::new(fs, "/proc");

        let sample = sampler.sample(101, false).unwrap();
        assert_eq!(sample.num_fds, Reading::Skipped);
        assert_eq!(sample.num_connections, Reading::Skipped);
        assert_eq!(sample.num_fds.value(), None);
    }

    #[test]
    fn test_sample_denied_fd_table() {
        let mut fs = MockFs::supervised_workers();
        fs.deny("/proc/101/fd");
        let sampler = ResourceSampler::new(fs, "/proc");

        let sample = sampler.sample(101, true).unwrap();
        assert_eq!(sample.num_fds, Reading::Denied);
        assert_eq!(sample.num_connections, Reading::Denied);
        // Everything else still reads.
        assert_eq!(sample.num_threads, 4);
    }

    #[test]
    fn test_sample_gone_process() {
        let fs = MockFs::supervised_workers();
        let sampler = ResourceSampler::new(fs, "/proc");

        let result = sampler.sample(9999, true);
        assert!(matches!(result, Err(SampleError::ProcessGone(9999))));
    }

    #[test]
    fn test_total_memory_read_per_call() {
        let mut fs = MockFs::supervised_workers();
        fs.add_file_sequence(
            "/proc/meminfo",
            ["MemTotal: 4096000 kB\n", "MemTotal: 8192000 kB\n"],
        );
        let sampler = ResourceSampler::new(fs, "/proc");

        assert!((sampler.total_memory_mib().unwrap() - 4000.0).abs() < 1e-9);
        assert!((sampler.total_memory_mib().unwrap() - 8000.0).abs() < 1e-9);
    }
}
