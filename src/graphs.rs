//! The fixed catalog of metric graphs and their enablement.
//!
//! Eight graphs, one per collected counter. Each graph is independently
//! togglable from configuration; a disabled graph is never sampled and never
//! appears in a collection result.

use serde::Serialize;

/// One metric graph. The set is closed: identifiers are not free strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Graph {
    #[serde(rename = "supervisord_processes_memory_usage")]
    MemoryUsage,
    #[serde(rename = "supervisord_processes_cpu_percent_avg")]
    CpuPercentAvg,
    #[serde(rename = "supervisord_processes_cpu_percent_max")]
    CpuPercentMax,
    #[serde(rename = "supervisord_processes_num_context_switches_involuntary")]
    CtxSwitchesInvoluntary,
    #[serde(rename = "supervisord_processes_num_context_switches_voluntary")]
    CtxSwitchesVoluntary,
    #[serde(rename = "supervisord_processes_num_fds")]
    NumFds,
    #[serde(rename = "supervisord_processes_num_threads")]
    NumThreads,
    #[serde(rename = "supervisord_processes_num_connections")]
    NumConnections,
}

impl Graph {
    /// All graphs, in declaration order. This is also the rendering order.
    pub const ALL: [Graph; 8] = [
        Graph::MemoryUsage,
        Graph::CpuPercentAvg,
        Graph::CpuPercentMax,
        Graph::CtxSwitchesInvoluntary,
        Graph::CtxSwitchesVoluntary,
        Graph::NumFds,
        Graph::NumThreads,
        Graph::NumConnections,
    ];

    /// Munin multigraph name, also the configuration identifier.
    pub fn name(self) -> &'static str {
        match self {
            Graph::MemoryUsage => "supervisord_processes_memory_usage",
            Graph::CpuPercentAvg => "supervisord_processes_cpu_percent_avg",
            Graph::CpuPercentMax => "supervisord_processes_cpu_percent_max",
            Graph::CtxSwitchesInvoluntary => {
                "supervisord_processes_num_context_switches_involuntary"
            }
            Graph::CtxSwitchesVoluntary => "supervisord_processes_num_context_switches_voluntary",
            Graph::NumFds => "supervisord_processes_num_fds",
            Graph::NumThreads => "supervisord_processes_num_threads",
            Graph::NumConnections => "supervisord_processes_num_connections",
        }
    }

    /// Human title, rendered as `Supervisord - {title}`.
    pub fn title(self) -> &'static str {
        match self {
            Graph::MemoryUsage => "Memory usage",
            Graph::CpuPercentAvg => "CPU utilization as a percentage (avg)",
            Graph::CpuPercentMax => "CPU utilization as a percentage (max)",
            Graph::CtxSwitchesInvoluntary => "Context switches (involuntary)",
            Graph::CtxSwitchesVoluntary => "Context switches (voluntary)",
            Graph::NumFds => "File descriptors used",
            Graph::NumThreads => "Threads currently used",
            Graph::NumConnections => "Socket connections opened",
        }
    }

    /// Vertical-axis label, where the graph has a meaningful unit.
    pub fn vlabel(self) -> Option<&'static str> {
        match self {
            Graph::MemoryUsage => Some("Memory usage (MiB)"),
            Graph::CpuPercentAvg => Some("Avg CPU percentage"),
            Graph::CpuPercentMax => Some("Max CPU percentage"),
            Graph::CtxSwitchesInvoluntary => Some("Involuntary context switches"),
            Graph::CtxSwitchesVoluntary => Some("Voluntary context switches"),
            Graph::NumFds | Graph::NumThreads | Graph::NumConnections => None,
        }
    }

    /// Extra graph arguments for the counter-style graphs.
    pub fn graph_args(self) -> Option<&'static str> {
        match self {
            Graph::NumFds | Graph::NumThreads | Graph::NumConnections => Some("--lower-limit 0"),
            _ => None,
        }
    }

    /// Whether fields carry an explicit `min 0` (all the `num_*` graphs).
    pub fn non_negative(self) -> bool {
        self.name()
            .starts_with("supervisord_processes_num_")
    }

    /// Whether this graph is fed from the windowed CPU burst.
    pub fn is_cpu(self) -> bool {
        matches!(self, Graph::CpuPercentAvg | Graph::CpuPercentMax)
    }

    /// Looks a graph up by its munin name.
    pub fn from_name(name: &str) -> Option<Graph> {
        Graph::ALL.iter().copied().find(|g| g.name() == name)
    }
}

/// Per-run enablement of the graph catalog.
///
/// Resolved once from configuration and passed by reference into the
/// collector; flags never change within a run.
#[derive(Debug, Clone)]
pub struct GraphSet {
    enabled: [bool; Graph::ALL.len()],
}

impl GraphSet {
    /// Everything enabled, the default when no lists are configured.
    pub fn all() -> Self {
        Self {
            enabled: [true; Graph::ALL.len()],
        }
    }

    /// Resolves enablement from include/exclude graph-name lists.
    ///
    /// A graph is enabled iff it appears in `include` (or `include` is
    /// `None`) and does not appear in `exclude`. Names that match no known
    /// graph are ignored.
    pub fn from_lists(include: Option<&[String]>, exclude: &[String]) -> Self {
        let mut set = Self::all();
        for (slot, graph) in set.enabled.iter_mut().zip(Graph::ALL) {
            let included = include.is_none_or(|list| list.iter().any(|n| n == graph.name()));
            let excluded = exclude.iter().any(|n| n == graph.name());
            *slot = included && !excluded;
        }
        set
    }

    pub fn is_enabled(&self, graph: Graph) -> bool {
        let idx = Graph::ALL.iter().position(|g| *g == graph).unwrap_or(0);
        self.enabled[idx]
    }

    /// Whether the CPU burst is needed at all.
    pub fn cpu_enabled(&self) -> bool {
        self.is_enabled(Graph::CpuPercentAvg) || self.is_enabled(Graph::CpuPercentMax)
    }

    /// Whether any graph fed from the resource read is enabled.
    pub fn resources_enabled(&self) -> bool {
        Graph::ALL
            .iter()
            .any(|g| !g.is_cpu() && self.is_enabled(*g))
    }

    /// Whether the `/proc/[pid]/fd` walk is needed.
    pub fn fd_walk_enabled(&self) -> bool {
        self.is_enabled(Graph::NumFds) || self.is_enabled(Graph::NumConnections)
    }
}

impl Default for GraphSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_order_matches_catalog() {
        assert_eq!(Graph::ALL[0], Graph::MemoryUsage);
        assert_eq!(Graph::ALL[7], Graph::NumConnections);
        // Ord follows declaration order, so BTreeMap iteration is stable.
        assert!(Graph::MemoryUsage < Graph::NumConnections);
    }

    #[test]
    fn test_name_round_trip() {
        for graph in Graph::ALL {
            assert_eq!(Graph::from_name(graph.name()), Some(graph));
        }
        assert_eq!(Graph::from_name("nonsense"), None);
    }

    #[test]
    fn test_non_negative_covers_all_num_graphs() {
        assert!(Graph::NumFds.non_negative());
        assert!(Graph::NumThreads.non_negative());
        assert!(Graph::NumConnections.non_negative());
        assert!(Graph::CtxSwitchesVoluntary.non_negative());
        assert!(Graph::CtxSwitchesInvoluntary.non_negative());
        assert!(!Graph::MemoryUsage.non_negative());
        assert!(!Graph::CpuPercentAvg.non_negative());
    }

    #[test]
    fn test_graph_args_only_on_counter_graphs() {
        assert_eq!(Graph::NumFds.graph_args(), Some("--lower-limit 0"));
        assert_eq!(Graph::CtxSwitchesVoluntary.graph_args(), None);
        assert_eq!(Graph::MemoryUsage.graph_args(), None);
    }

    #[test]
    fn test_exclude_list_disables() {
        let set = GraphSet::from_lists(
            None,
            &["supervisord_processes_num_fds".to_string()],
        );
        assert!(!set.is_enabled(Graph::NumFds));
        assert!(set.is_enabled(Graph::NumThreads));
    }

    #[test]
    fn test_include_list_restricts() {
        let set = GraphSet::from_lists(
            Some(&["supervisord_processes_memory_usage".to_string()]),
            &[],
        );
        assert!(set.is_enabled(Graph::MemoryUsage));
        assert!(!set.is_enabled(Graph::CpuPercentAvg));
        assert!(!set.cpu_enabled());
        assert!(set.resources_enabled());
        assert!(!set.fd_walk_enabled());
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let name = "supervisord_processes_num_threads".to_string();
        let set = GraphSet::from_lists(Some(std::slice::from_ref(&name)), &[name.clone()]);
        assert!(!set.is_enabled(Graph::NumThreads));
        assert!(!set.resources_enabled());
    }

    #[test]
    fn test_cpu_enabled_with_single_cpu_graph() {
        let set = GraphSet::from_lists(
            Some(&["supervisord_processes_cpu_percent_max".to_string()]),
            &[],
        );
        assert!(set.cpu_enabled());
        assert!(!set.resources_enabled());
    }
}
