//! Collection-cycle orchestration.
//!
//! One cycle is a stateless pass: fetch the running process table, sample
//! every process for the enabled graphs, and merge the values into a
//! two-level `graph -> label -> value` map. Individual processes failing
//! never fail the cycle; only an unreachable supervisor does.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::collector::procfs::{CpuSampler, Reading, ResourceSampler, SampleError};
use crate::collector::traits::FileSystem;
use crate::graphs::{Graph, GraphSet};
use crate::supervisor::{DirectoryError, ProcessDescriptor, ProcessDirectory};

/// One cycle's values: graph -> process label -> gauge value.
///
/// Disabled graphs are entirely absent. A label appears under a graph only
/// if the process was running and that measurement succeeded; partial
/// presence across graphs is normal degradation.
pub type CollectionResult = BTreeMap<Graph, BTreeMap<String, f64>>;

/// Samples the supervised process set and aggregates one collection cycle.
///
/// Holds no state across cycles; every `collect` call starts from a fresh
/// directory fetch.
pub struct StatsCollector<F: FileSystem + Clone> {
    cpu: CpuSampler<F>,
    resources: ResourceSampler<F>,
    graphs: GraphSet,
}

impl<F: FileSystem + Clone> StatsCollector<F> {
    /// Creates a collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `graphs` - Per-run graph enablement
    pub fn new(fs: F, proc_path: impl Into<String>, graphs: GraphSet) -> Self {
        let proc_path = proc_path.into();
        Self {
            cpu: CpuSampler::new(fs.clone(), &proc_path),
            resources: ResourceSampler::new(fs, &proc_path),
            graphs,
        }
    }

    /// Overrides the CPU window shape (default 20 samples at 100 ms).
    pub fn with_cpu_window(mut self, samples: usize, interval: Duration) -> Self {
        self.cpu = self.cpu.with_window(samples, interval);
        self
    }

    /// Runs one full collection cycle against `directory`.
    ///
    /// Fails only when the directory itself cannot be fetched; every
    /// per-process failure is absorbed into absent data points.
    pub fn collect<D: ProcessDirectory>(
        &self,
        directory: &D,
    ) -> Result<CollectionResult, DirectoryError> {
        let processes = directory.list_running()?;
        Ok(self.collect_from(&processes))
    }

    /// Samples an already-fetched running set, in the given order.
    pub fn collect_from(&self, processes: &[ProcessDescriptor]) -> CollectionResult {
        let mut result = CollectionResult::new();
        for graph in Graph::ALL {
            if self.graphs.is_enabled(graph) {
                result.insert(graph, BTreeMap::new());
            }
        }

        for process in processes {
            let label = process.label();
            match self.sample_process(process) {
                Some(staged) => {
                    for (graph, value) in staged {
                        if let Some(values) = result.get_mut(&graph) {
                            values.insert(label.clone(), value);
                        }
                    }
                }
                // The process is dropped from the entire cycle; nothing it
                // produced so far is kept.
                None => debug!("dropped {} from this cycle", label),
            }
        }

        result
    }

    /// Samples one process for every enabled graph.
    ///
    /// Returns the staged `(graph, value)` contributions, or `None` when
    /// the process must be dropped from the cycle (vanished or unreadable).
    fn sample_process(&self, process: &ProcessDescriptor) -> Option<Vec<(Graph, f64)>> {
        let mut staged = Vec::new();

        // The burst runs once if either CPU graph wants it; both statistics
        // come from the same sample set.
        if self.graphs.cpu_enabled() {
            match self.cpu.sample(process.pid) {
                Ok(window) => {
                    if self.graphs.is_enabled(Graph::CpuPercentAvg) {
                        staged.push((Graph::CpuPercentAvg, window.avg));
                    }
                    if self.graphs.is_enabled(Graph::CpuPercentMax) {
                        staged.push((Graph::CpuPercentMax, window.max));
                    }
                }
                Err(SampleError::ProcessGone(pid)) => {
                    debug!("process {} vanished during cpu sampling", pid);
                    return None;
                }
                Err(e) => {
                    warn!("cpu sampling failed for pid {}: {}", process.pid, e);
                    return None;
                }
            }
        }

        if self.graphs.resources_enabled() {
            let sample = match self
                .resources
                .sample(process.pid, self.graphs.fd_walk_enabled())
            {
                Ok(sample) => sample,
                Err(SampleError::ProcessGone(pid)) => {
                    debug!("process {} vanished during resource sampling", pid);
                    return None;
                }
                Err(e) => {
                    warn!("resource sampling failed for pid {}: {}", process.pid, e);
                    return None;
                }
            };

            if self.graphs.is_enabled(Graph::MemoryUsage) {
                match self.resources.total_memory_mib() {
                    Ok(total_mib) => staged.push((
                        Graph::MemoryUsage,
                        total_mib * sample.memory_percent / 100.0,
                    )),
                    Err(e) => warn!("total memory unavailable: {}", e),
                }
            }
            if self.graphs.is_enabled(Graph::CtxSwitchesVoluntary) {
                staged.push((Graph::CtxSwitchesVoluntary, sample.ctx_voluntary as f64));
            }
            if self.graphs.is_enabled(Graph::CtxSwitchesInvoluntary) {
                staged.push((
                    Graph::CtxSwitchesInvoluntary,
                    sample.ctx_involuntary as f64,
                ));
            }
            if self.graphs.is_enabled(Graph::NumThreads) {
                staged.push((Graph::NumThreads, sample.num_threads as f64));
            }
            if self.graphs.is_enabled(Graph::NumFds)
                && let Reading::Value(n) = sample.num_fds
            {
                staged.push((Graph::NumFds, n as f64));
            }
            if self.graphs.is_enabled(Graph::NumConnections)
                && let Reading::Value(n) = sample.num_connections
            {
                staged.push((Graph::NumConnections, n as f64));
            }
        }

        Some(staged)
    }
}
