//! supstat — supervisord process statistics for Munin.
//!
//! Samples OS-level resource counters for every RUNNING process managed by
//! a supervisord instance and reports them as Munin multigraph gauges.
//!
//! Provides:
//! - `supervisor` — supervisord process directory (XML-RPC client)
//! - `collector` — per-process CPU and resource sampling from `/proc`
//! - `graphs` — the fixed metric-graph catalog and enablement
//! - `munin` — plugin-protocol rendering (config / fetch)
//! - `config` — environment-driven configuration

pub mod collector;
pub mod config;
pub mod graphs;
pub mod munin;
pub mod supervisor;
