//! Plugin configuration.
//!
//! Munin hands plugins their configuration through the environment
//! (`env.*` lines in plugin-conf). Everything is resolved once at startup
//! into a `Config` value that is passed by reference from then on; nothing
//! reads the environment after that.

use std::time::Duration;

use crate::collector::procfs::cpu;
use crate::graphs::GraphSet;

/// Default supervisord endpoint, supervisord's own default socket path.
pub const DEFAULT_URL: &str = "unix:///var/run/supervisor.sock";
/// Default proc filesystem base path.
pub const DEFAULT_PROC_PATH: &str = "/proc";

/// Resolved per-run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Supervisord XML-RPC endpoint (`http://host[:port]` or `unix:///path`).
    pub url: String,
    /// Per-run graph enablement.
    pub graphs: GraphSet,
    /// Readings per CPU window.
    pub cpu_samples: usize,
    /// Spacing between CPU readings.
    pub cpu_interval: Duration,
    /// Base path of the proc filesystem (overridable for testing).
    pub proc_path: String,
}

impl Config {
    /// Resolves configuration from the process environment:
    /// `url`, `include_graphs`, `exclude_graphs` (comma-separated munin
    /// graph names), `cpu_samples` and `cpu_interval_ms`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let include = get("include_graphs").map(parse_list);
        let exclude = get("exclude_graphs").map(parse_list).unwrap_or_default();

        Self {
            url: get("url").unwrap_or_else(|| DEFAULT_URL.to_string()),
            graphs: GraphSet::from_lists(include.as_deref(), &exclude),
            cpu_samples: get("cpu_samples")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(cpu::DEFAULT_SAMPLES),
            cpu_interval: get("cpu_interval_ms")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(cpu::DEFAULT_INTERVAL),
            proc_path: DEFAULT_PROC_PATH.to_string(),
        }
    }
}

fn parse_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
