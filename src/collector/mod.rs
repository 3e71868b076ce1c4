//! Per-process metrics collection from `/proc`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     StatsCollector                       │
//! │  ┌─────────────────────┐   ┌──────────────────────────┐  │
//! │  │     CpuSampler      │   │     ResourceSampler      │  │
//! │  │  - /proc/[pid]/stat │   │  - /proc/[pid]/stat      │  │
//! │  │    (windowed burst) │   │  - /proc/[pid]/status    │  │
//! │  └──────────┬──────────┘   │  - /proc/[pid]/fd        │  │
//! │             │              │  - /proc/meminfo         │  │
//! │             │              └────────────┬─────────────┘  │
//! │             └──────────────┬────────────┘                │
//! │                            │                             │
//! │                     ┌──────▼──────┐                      │
//! │                     │  FileSystem │ (trait)              │
//! │                     └──────┬──────┘                      │
//! └────────────────────────────┼─────────────────────────────┘
//!                              │
//!                     ┌────────┴────────┐
//!              ┌──────▼──────┐   ┌──────▼──────┐
//!              │   RealFs    │   │   MockFs    │
//!              │  (Linux)    │   │  (Testing)  │
//!              └─────────────┘   └─────────────┘
//! ```
//!
//! The process set itself comes from a `ProcessDirectory` (see the
//! `supervisor` module), not from walking `/proc`.

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use collector::{CollectionResult, StatsCollector};
pub use mock::MockFs;
pub use procfs::{CpuSampler, CpuWindow, Reading, ResourceSample, ResourceSampler, SampleError};
pub use traits::{FileSystem, RealFs};
