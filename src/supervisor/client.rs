//! Supervisord XML-RPC client.

use tracing::debug;

use super::transport::{self, Endpoint};
use super::xmlrpc::{self, Response, Value};
use super::{DirectoryError, ProcessDescriptor, ProcessDirectory, RunState};

/// Talks to a live supervisord instance over its XML-RPC interface.
pub struct SupervisorClient {
    endpoint: Endpoint,
}

impl SupervisorClient {
    /// Creates a client for a `http://host[:port]` or `unix:///path` URL.
    pub fn new(url: &str) -> Result<Self, DirectoryError> {
        Ok(Self {
            endpoint: Endpoint::parse(url)?,
        })
    }

    fn call(&self, method: &str) -> Result<Value, DirectoryError> {
        let request = xmlrpc::method_call(method);
        let response = transport::post(&self.endpoint, &request)?;
        match xmlrpc::parse_response(&response).map_err(|e| DirectoryError::Parse(e.message))? {
            Response::Success(value) => Ok(value),
            Response::Fault { code, message } => Err(DirectoryError::Fault { code, message }),
        }
    }
}

impl ProcessDirectory for SupervisorClient {
    fn list_running(&self) -> Result<Vec<ProcessDescriptor>, DirectoryError> {
        let table = self.call("supervisor.getAllProcessInfo")?;
        let processes = descriptors_from_value(table)?;
        debug!("supervisor reported {} running processes", processes.len());
        Ok(processes)
    }
}

/// Maps a `getAllProcessInfo` result onto descriptors, keeping RUNNING
/// entries only. Unknown state names exclude the entry, never error.
fn descriptors_from_value(table: Value) -> Result<Vec<ProcessDescriptor>, DirectoryError> {
    let Value::Array(entries) = table else {
        return Err(DirectoryError::Parse(
            "getAllProcessInfo did not return an array".to_string(),
        ));
    };

    let mut processes = Vec::new();
    for entry in entries {
        let Value::Struct(fields) = entry else {
            return Err(DirectoryError::Parse(
                "process entry is not a struct".to_string(),
            ));
        };

        let state = fields
            .get("statename")
            .and_then(Value::as_str)
            .map(RunState::parse)
            .unwrap_or(RunState::Unknown);
        if state != RunState::Running {
            continue;
        }

        let name = require_str(&fields, "name")?;
        let group = require_str(&fields, "group")?;
        let pid = fields
            .get("pid")
            .and_then(Value::as_i64)
            .filter(|pid| *pid > 0)
            .ok_or_else(|| {
                DirectoryError::Parse(format!("running process {} has no pid", name))
            })?;

        processes.push(ProcessDescriptor {
            name,
            group,
            pid: pid as u32,
            state,
        });
    }
    Ok(processes)
}

fn require_str(
    fields: &std::collections::HashMap<String, Value>,
    key: &str,
) -> Result<String, DirectoryError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DirectoryError::Parse(format!("process entry missing {:?}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(name: &str, group: &str, pid: i64, statename: &str) -> Value {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        fields.insert("group".to_string(), Value::String(group.to_string()));
        fields.insert("pid".to_string(), Value::Int(pid));
        fields.insert(
            "statename".to_string(),
            Value::String(statename.to_string()),
        );
        Value::Struct(fields)
    }

    #[test]
    fn test_descriptors_keep_running_only() {
        let table = Value::Array(vec![
            entry("web", "web", 100, "RUNNING"),
            entry("worker", "pool", 0, "STOPPED"),
            entry("worker", "pool", 101, "RUNNING"),
            entry("flaky", "flaky", 0, "BACKOFF"),
            entry("odd", "odd", 0, "SOME_FUTURE_STATE"),
        ]);

        let processes = descriptors_from_value(table).unwrap();
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].label(), "web.100");
        assert_eq!(processes[1].label(), "pool:worker");
    }

    #[test]
    fn test_descriptors_preserve_supervisor_order() {
        let table = Value::Array(vec![
            entry("b", "b", 2, "RUNNING"),
            entry("a", "a", 1, "RUNNING"),
        ]);
        let processes = descriptors_from_value(table).unwrap();
        assert_eq!(processes[0].name, "b");
        assert_eq!(processes[1].name, "a");
    }

    #[test]
    fn test_descriptors_reject_non_array() {
        assert!(matches!(
            descriptors_from_value(Value::Int(1)),
            Err(DirectoryError::Parse(_))
        ));
    }

    #[test]
    fn test_descriptors_reject_running_without_pid() {
        let table = Value::Array(vec![entry("web", "web", 0, "RUNNING")]);
        assert!(matches!(
            descriptors_from_value(table),
            Err(DirectoryError::Parse(_))
        ));
    }

    #[test]
    fn test_parsed_wire_response_maps_to_descriptors() {
        let body = "<?xml version='1.0'?>\n<methodResponse><params><param><value><array><data>\n<value><struct>\n<member><name>name</name><value><string>worker</string></value></member>\n<member><name>group</name><value><string>pool</string></value></member>\n<member><name>pid</name><value><int>4242</int></value></member>\n<member><name>statename</name><value><string>RUNNING</string></value></member>\n</struct></value>\n</data></array></value></param></params></methodResponse>";
        let Response::Success(table) = xmlrpc::parse_response(body).unwrap() else {
            panic!("expected success");
        };
        let processes = descriptors_from_value(table).unwrap();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].pid, 4242);
        assert_eq!(processes[0].state, RunState::Running);
    }
}
