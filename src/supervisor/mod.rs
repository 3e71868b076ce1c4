//! Supervisord process-table access.
//!
//! The collector only ever sees the process table through the
//! `ProcessDirectory` trait, so tests can substitute a fixed in-memory
//! table and production code can talk to a live supervisord over XML-RPC.

mod client;
mod transport;
mod xmlrpc;

pub use client::SupervisorClient;

use serde::Serialize;
use std::io;

/// Run state reported by supervisord for a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    /// Any state string outside the enumerated set. Excluded from sampling,
    /// never an error.
    Unknown,
}

impl RunState {
    /// Parses a supervisord `statename` string.
    pub fn parse(name: &str) -> Self {
        match name {
            "STOPPED" => RunState::Stopped,
            "STARTING" => RunState::Starting,
            "RUNNING" => RunState::Running,
            "BACKOFF" => RunState::Backoff,
            "STOPPING" => RunState::Stopping,
            "EXITED" => RunState::Exited,
            "FATAL" => RunState::Fatal,
            _ => RunState::Unknown,
        }
    }
}

/// One supervised process as reported by the supervisor.
///
/// Identity within a cycle is the pid; `(group, name)` is unique within the
/// supervisor's process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessDescriptor {
    pub name: String,
    pub group: String,
    pub pid: u32,
    pub state: RunState,
}

impl ProcessDescriptor {
    /// Display key for this process, stable within a run.
    ///
    /// Single-instance programs (group == name) read as `name.pid`; grouped
    /// instances as `group:name`, which keeps same-named processes under
    /// different groups apart.
    pub fn label(&self) -> String {
        if self.group == self.name {
            format!("{}.{}", self.name, self.pid)
        } else {
            format!("{}:{}", self.group, self.name)
        }
    }
}

/// Error fetching the process table. Fatal for the whole collection cycle.
#[derive(Debug)]
pub enum DirectoryError {
    /// Transport-level failure reaching the supervisor.
    Io(io::Error),
    /// The supervisor answered with a non-200 HTTP status.
    Http(u16),
    /// The supervisor returned an XML-RPC fault.
    Fault { code: i64, message: String },
    /// Malformed endpoint URL.
    Url(String),
    /// Malformed XML-RPC response.
    Parse(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::Io(e) => write!(f, "supervisor unreachable: {}", e),
            DirectoryError::Http(status) => write!(f, "supervisor returned HTTP {}", status),
            DirectoryError::Fault { code, message } => {
                write!(f, "supervisor fault {}: {}", code, message)
            }
            DirectoryError::Url(url) => write!(f, "unsupported supervisor url: {}", url),
            DirectoryError::Parse(msg) => write!(f, "bad supervisor response: {}", msg),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<io::Error> for DirectoryError {
    fn from(e: io::Error) -> Self {
        DirectoryError::Io(e)
    }
}

/// Source of the supervised process table.
pub trait ProcessDirectory {
    /// The current process table filtered to RUNNING entries, in supervisor
    /// order. Any failure here aborts the collection cycle.
    fn list_running(&self) -> Result<Vec<ProcessDescriptor>, DirectoryError>;
}

/// Fixed in-memory process table for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    processes: Vec<ProcessDescriptor>,
}

impl StaticDirectory {
    pub fn new(processes: Vec<ProcessDescriptor>) -> Self {
        Self { processes }
    }
}

impl ProcessDirectory for StaticDirectory {
    fn list_running(&self) -> Result<Vec<ProcessDescriptor>, DirectoryError> {
        Ok(self
            .processes
            .iter()
            .filter(|p| p.state == RunState::Running)
            .cloned()
            .collect())
    }
}
