// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Domain models exchanged with the host platform.
//!
//! Inputs (`ActionRequest`, `ActionParams`) and outputs (`ActionResult`,
//! `Container`, `ActionOutcome`) are plain serde structures. Nothing here
//! performs I/O.

use crate::core::errors::ConnectorError;
use crate::state::ConnectorState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// One invocation as the host describes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action identifier, e.g. `isolate_machine`
    pub identifier: String,
    /// Asset configuration
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub parameters: Vec<ActionParams>,
}

/// Named parameters for a single action run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParams(Map<String, Value>);

impl ActionParams {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// String form of a required parameter; numbers are accepted as ids
    pub fn required_str(&self, key: &str) -> Result<String, ConnectorError> {
        self.optional_str(key).ok_or_else(|| {
            ConnectorError::Validation(format!("Missing required parameter '{}'", key))
        })
    }

    pub fn optional_str(&self, key: &str) -> Option<String> {
        self.raw(key).and_then(value_to_string)
    }

    pub fn optional_bool(&self, key: &str) -> bool {
        match self.raw(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Value> for ActionParams {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Scalar JSON value as the string the console expects in paths and filters
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Terminal outcome of an action run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Failed,
}

/// Status, message and result records for one parameter set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
    pub parameter: Value,
    pub data: Vec<Value>,
    pub summary: Map<String, Value>,
}

impl ActionResult {
    pub fn new(params: &ActionParams) -> Self {
        Self {
            status: ActionStatus::Failed,
            message: String::new(),
            parameter: params.to_value(),
            data: Vec::new(),
            summary: Map::new(),
        }
    }

    /// Append a result record
    pub fn add_data(&mut self, record: Value) {
        self.data.push(record);
    }

    /// Merge an object into the summary; other values land under `response`
    pub fn update_summary(&mut self, value: Value) {
        match value {
            Value::Object(map) => self.summary.extend(map),
            other => {
                self.summary.insert("response".to_string(), other);
            }
        }
    }

    pub fn set_success(&mut self, message: impl Into<String>) {
        self.status = ActionStatus::Success;
        self.message = message.into();
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = ActionStatus::Failed;
        self.message = message.into();
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

/// Ordered progress feed shown live by the host
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    messages: Vec<String>,
}

impl ProgressLog {
    pub fn save_progress(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "progress", "{}", message);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Evidence attached to an ingested container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub label: String,
    pub source_data_identifier: String,
    pub cef: Map<String, Value>,
}

/// Incident record produced by polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub label: String,
    pub description: String,
    pub severity: String,
    pub source_data_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub artifacts: Vec<Artifact>,
}

/// Everything one invocation hands back to the host
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: String,
    pub results: Vec<ActionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    pub progress: Vec<String>,
    /// Persisted separately by the caller
    #[serde(skip)]
    pub state: ConnectorState,
}

impl ActionOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(ActionResult::is_success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str_accepts_numbers() {
        let params = ActionParams::from(json!({"malop_id": "11.123", "machine_id": 42}));
        assert_eq!(params.required_str("malop_id").unwrap(), "11.123");
        assert_eq!(params.required_str("machine_id").unwrap(), "42");
    }

    #[test]
    fn test_required_str_missing_names_key() {
        let params = ActionParams::from(json!({"malop_id": null}));
        let err = params.required_str("malop_id").unwrap_err();
        assert!(err.to_string().contains("'malop_id'"));
    }

    #[test]
    fn test_optional_bool_variants() {
        let params = ActionParams::from(json!({"a": true, "b": "True", "c": 0, "d": "no"}));
        assert!(params.optional_bool("a"));
        assert!(params.optional_bool("b"));
        assert!(!params.optional_bool("c"));
        assert!(!params.optional_bool("d"));
        assert!(!params.optional_bool("missing"));
    }

    #[test]
    fn test_update_summary_merges_objects() {
        let mut result = ActionResult::new(&ActionParams::default());
        result.update_summary(json!({"a": 1}));
        result.update_summary(json!({"b": 2}));
        result.update_summary(json!([1, 2]));
        assert_eq!(result.summary["a"], 1);
        assert_eq!(result.summary["b"], 2);
        assert_eq!(result.summary["response"], json!([1, 2]));
    }

    #[test]
    fn test_result_starts_failed() {
        let mut result = ActionResult::new(&ActionParams::default());
        assert!(!result.is_success());
        result.set_success("done");
        assert!(result.is_success());
        assert_eq!(result.message, "done");
    }

    #[test]
    fn test_request_defaults() {
        let request: ActionRequest =
            serde_json::from_value(json!({"identifier": "test_connectivity"})).unwrap();
        assert!(request.parameters.is_empty());
        assert!(request.config.is_null());
    }
}
