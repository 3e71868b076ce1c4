//! Munin plugin-protocol rendering.
//!
//! The collector never prints; these functions turn a running process
//! table and a collection result into the multigraph text munin expects
//! from `config` and fetch invocations.

use crate::collector::CollectionResult;
use crate::graphs::{Graph, GraphSet};
use crate::supervisor::ProcessDescriptor;

/// Munin's marker for a declared field with no value this poll.
const UNKNOWN: &str = "U";

/// Sanitizes a label into a munin field name
/// (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn field_name(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Renders the `config` response: one multigraph section per enabled graph
/// with at least one running process. Graphs with no fields are omitted.
pub fn render_config(processes: &[ProcessDescriptor], graphs: &GraphSet) -> String {
    let mut out = String::new();
    for graph in Graph::ALL {
        if !graphs.is_enabled(graph) || processes.is_empty() {
            continue;
        }

        out.push_str(&format!("multigraph {}\n", graph.name()));
        out.push_str(&format!("graph_title Supervisord - {}\n", graph.title()));
        if let Some(args) = graph.graph_args() {
            out.push_str(&format!("graph_args {}\n", args));
        }
        if let Some(vlabel) = graph.vlabel() {
            out.push_str(&format!("graph_vlabel {}\n", vlabel));
        }
        out.push_str("graph_category supervisord\n");
        out.push_str(&format!("graph_info {}\n", graph.title()));

        for process in processes {
            let label = process.label();
            let field = field_name(&label);
            out.push_str(&format!("{}.label {}\n", field, label));
            out.push_str(&format!("{}.draw LINE2\n", field));
            out.push_str(&format!("{}.type GAUGE\n", field));
            out.push_str(&format!("{}.info {}\n", field, graph.title()));
            if graph.non_negative() {
                out.push_str(&format!("{}.min 0\n", field));
            }
        }
        out.push('\n');
    }
    out
}

/// Renders the fetch response: every declared field with its sampled value,
/// `U` where the value is missing this cycle.
pub fn render_values(processes: &[ProcessDescriptor], result: &CollectionResult) -> String {
    let mut out = String::new();
    for (graph, values) in result {
        if processes.is_empty() {
            continue;
        }

        out.push_str(&format!("multigraph {}\n", graph.name()));
        for process in processes {
            let label = process.label();
            let field = field_name(&label);
            match values.get(&label) {
                Some(value) => out.push_str(&format!("{}.value {}\n", field, value)),
                None => out.push_str(&format!("{}.value {}\n", field, UNKNOWN)),
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::RunState;
    use std::collections::BTreeMap;

    fn processes() -> Vec<ProcessDescriptor> {
        vec![
            ProcessDescriptor {
                name: "worker".to_string(),
                group: "worker".to_string(),
                pid: 42,
                state: RunState::Running,
            },
            ProcessDescriptor {
                name: "worker".to_string(),
                group: "pool".to_string(),
                pid: 43,
                state: RunState::Running,
            },
        ]
    }

    #[test]
    fn test_field_name_sanitization() {
        assert_eq!(field_name("worker.42"), "worker_42");
        assert_eq!(field_name("pool:worker"), "pool_worker");
        assert_eq!(field_name("9lives"), "_9lives");
        assert_eq!(field_name("plain"), "plain");
    }

    #[test]
    fn test_render_config_declares_enabled_graphs() {
        let graphs = GraphSet::from_lists(
            Some(&[
                "supervisord_processes_memory_usage".to_string(),
                "supervisord_processes_num_fds".to_string(),
            ]),
            &[],
        );
        let out = render_config(&processes(), &graphs);

        assert!(out.contains("multigraph supervisord_processes_memory_usage\n"));
        assert!(out.contains("graph_title Supervisord - Memory usage\n"));
        assert!(out.contains("graph_vlabel Memory usage (MiB)\n"));
        assert!(out.contains("graph_category supervisord\n"));
        assert!(out.contains("worker_42.label worker.42\n"));
        assert!(out.contains("pool_worker.label pool:worker\n"));
        assert!(out.contains("worker_42.draw LINE2\n"));
        assert!(out.contains("worker_42.type GAUGE\n"));

        // Disabled graphs are not declared at all.
        assert!(!out.contains("supervisord_processes_cpu_percent_avg"));
        assert!(!out.contains("supervisord_processes_num_threads"));
    }

    #[test]
    fn test_render_config_counter_graph_bounds() {
        let graphs = GraphSet::from_lists(
            Some(&["supervisord_processes_num_fds".to_string()]),
            &[],
        );
        let out = render_config(&processes(), &graphs);
        assert!(out.contains("graph_args --lower-limit 0\n"));
        assert!(out.contains("worker_42.min 0\n"));
    }

    #[test]
    fn test_render_config_memory_graph_has_no_min() {
        let graphs = GraphSet::from_lists(
            Some(&["supervisord_processes_memory_usage".to_string()]),
            &[],
        );
        let out = render_config(&processes(), &graphs);
        assert!(!out.contains(".min 0"));
        assert!(!out.contains("graph_args"));
    }

    #[test]
    fn test_render_config_empty_process_table() {
        let out = render_config(&[], &GraphSet::all());
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_values_with_gaps() {
        let mut result = CollectionResult::new();
        let mut threads = BTreeMap::new();
        threads.insert("worker.42".to_string(), 4.0);
        // pool:worker vanished this cycle; no value recorded.
        result.insert(Graph::NumThreads, threads);

        let out = render_values(&processes(), &result);
        assert!(out.contains("multigraph supervisord_processes_num_threads\n"));
        assert!(out.contains("worker_42.value 4\n"));
        assert!(out.contains("pool_worker.value U\n"));
    }

    #[test]
    fn test_render_values_only_covers_result_graphs() {
        let mut result = CollectionResult::new();
        result.insert(Graph::NumFds, BTreeMap::new());

        let out = render_values(&processes(), &result);
        assert!(out.contains("multigraph supervisord_processes_num_fds\n"));
        assert!(!out.contains("num_threads"));
        // Declared fields with no values still print as unknown.
        assert!(out.contains("worker_42.value U\n"));
    }

    #[test]
    fn test_render_values_float_formatting() {
        let mut result = CollectionResult::new();
        let mut avg = BTreeMap::new();
        avg.insert("worker.42".to_string(), 2.5);
        result.insert(Graph::CpuPercentAvg, avg);

        let out = render_values(&processes(), &result);
        assert!(out.contains("worker_42.value 2.5\n"));
    }
}
