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

//! Remediation commands and their progress.

use super::{ActionContext, HandlerOutcome};
use crate::client::visual_search::{self, element_values};
use crate::client::{ensure_success, read_json};
use crate::core::constants::{endpoints, limits, messages};
use crate::core::errors::ConnectorError;
use crate::core::models::{value_to_string, ActionParams, ActionResult};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};

pub const DELETE_REGISTRY_KEY: &str = "DELETE_REGISTRY_KEY";
pub const KILL_PROCESS: &str = "KILL_PROCESS";

/// Build the remediation request that deletes the autorun registry keys a
/// malop left on `machine_name`.
///
/// Only processes with autorun evidence count. The owning machine is matched
/// case-insensitively; a target already queued for any machine is not queued
/// again, though its machine still gets a possibly empty entry.
pub fn delete_registry_key_body(
    malop_id: &str,
    machine_name: &str,
    search_response: &Value,
) -> Result<Value, ConnectorError> {
    let wanted = machine_name.to_lowercase();
    let mut actions_by_machine = Map::new();
    let mut queued: HashSet<String> = HashSet::new();

    for process in visual_search::result_elements(search_response)?.values() {
        let Some(target_id) = element_values(process, "hasAutorunEvidence")
            .first()
            .and_then(|evidence| evidence.get("guid"))
            .and_then(value_to_string)
        else {
            continue;
        };

        let machine_id = element_values(process, "ownerMachine")
            .iter()
            .find(|machine| {
                machine
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.to_lowercase() == wanted)
            })
            .and_then(|machine| machine.get("guid"))
            .and_then(value_to_string);
        let Some(machine_id) = machine_id else {
            continue;
        };

        let entry = actions_by_machine
            .entry(machine_id)
            .or_insert_with(|| Value::Array(Vec::new()));
        if queued.insert(target_id.clone()) {
            if let Value::Array(actions) = entry {
                actions.push(json!({"targetId": target_id, "actionType": DELETE_REGISTRY_KEY}));
            }
        }
    }

    Ok(json!({
        "malopId": malop_id,
        "actionsByMachine": actions_by_machine,
        "initiatorUserName": "",
    }))
}

pub async fn delete_registry_key(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let machine_name = params.required_str("machine_name")?;
    let session = ctx.login().await?;

    let query = visual_search::malop_processes_query(
        &malop_id,
        &["ownerMachine", "hasAutorunEvidence"],
        limits::REGISTRY_RESULT_LIMIT,
        limits::REGISTRY_QUERY_TIMEOUT_MS,
    );
    let search = session.query(endpoints::VISUAL_SEARCH, &query).await?;
    let remediation = delete_registry_key_body(&malop_id, &machine_name, &search)?;
    debug!(body = %remediation, "Remediation request");

    let response = session.query(endpoints::REMEDIATE, &remediation).await?;
    let remediation_id = required_field(&response, "remediationId")?;
    result.add_data(json!({
        "remediation_id": remediation_id,
        "initiating_user": response.get("initiatingUser").cloned().unwrap_or(Value::Null),
    }));

    info!(malop_id = %malop_id, remediation_id = %remediation_id, "Registry key deletion requested");
    Ok(messages::DELETE_REGISTRY_KEY_SUCCESS.to_string())
}

pub fn kill_process_body(malop_id: &str, machine_id: &str, user: &str, process_id: &str) -> Value {
    let mut actions_by_machine = Map::new();
    actions_by_machine.insert(
        machine_id.to_string(),
        json!([{"targetId": process_id, "actionType": KILL_PROCESS}]),
    );
    json!({
        "malopId": malop_id,
        "initiatorUserName": user,
        "actionsByMachine": actions_by_machine,
    })
}

pub async fn kill_process(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let machine_id = params.required_str("machine_id")?;
    let user = params.required_str("remediation_user")?;
    let process_id = params.required_str("process_id")?;
    let session = ctx.login().await?;

    let body = kill_process_body(&malop_id, &machine_id, &user, &process_id);
    let response = session.query(endpoints::REMEDIATE, &body).await?;

    if let Some(first) = status_log(&response)?.first() {
        result.add_data(json!({
            "remediation_id": required_field(&response, "remediationId")?,
            "remediation_status": first.get("status").cloned().unwrap_or(Value::Null),
        }));
    }

    Ok(messages::KILL_PROCESS_SUCCESS.to_string())
}

/// Status and message of the latest status log entry
pub fn latest_remediation_status(response: &Value) -> Result<Value, ConnectorError> {
    let last = status_log(response)?
        .last()
        .ok_or_else(|| ConnectorError::Decode("Remediation status log is empty".to_string()))?;

    let message = match last.get("error") {
        None | Some(Value::Null) => Value::String(messages::REMEDIATION_NO_ERROR.to_string()),
        Some(error) => error
            .get("message")
            .cloned()
            .unwrap_or_else(|| Value::String(messages::REMEDIATION_UNKNOWN_ERROR.to_string())),
    };

    Ok(json!({
        "remediation_status": last.get("status").cloned().unwrap_or(Value::Null),
        "remediation_message": message,
    }))
}

pub async fn get_remediation_status(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let user = params.required_str("remediation_user")?;
    let remediation_id = params.required_str("remediation_id")?;
    let session = ctx.login().await?;

    let path = format!(
        "{}/{}/{}/{}",
        endpoints::REMEDIATE_PROGRESS,
        user,
        malop_id,
        remediation_id
    );
    let response = read_json(ensure_success(session.get(&path).await?).await?).await?;
    result.add_data(latest_remediation_status(&response)?);

    Ok(messages::REMEDIATION_STATUS_SUCCESS.to_string())
}

fn status_log(response: &Value) -> Result<&Vec<Value>, ConnectorError> {
    response
        .get("statusLog")
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectorError::Decode("Response has no 'statusLog'".to_string()))
}

fn required_field(response: &Value, field: &str) -> Result<String, ConnectorError> {
    response
        .get(field)
        .and_then(value_to_string)
        .ok_or_else(|| ConnectorError::Decode(format!("Response has no '{}'", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(machine: (&str, &str), autorun: Option<&str>) -> Value {
        let mut element_values = json!({
            "ownerMachine": {"elementValues": [{"guid": machine.0, "name": machine.1, "elementType": "Machine"}]}
        });
        if let Some(target) = autorun {
            element_values["hasAutorunEvidence"] =
                json!({"elementValues": [{"guid": target, "name": "Run key", "elementType": "AutorunEvidence"}]});
        }
        json!({"simpleValues": {}, "elementValues": element_values})
    }

    fn search(processes: Vec<(&str, Value)>) -> Value {
        let map: Map<String, Value> = processes
            .into_iter()
            .map(|(guid, p)| (guid.to_string(), p))
            .collect();
        json!({"data": {"resultIdToElementDataMap": map}})
    }

    #[test]
    fn test_single_autorun_target() {
        let response = search(vec![("p1", process(("MID1", "HOST1"), Some("T1")))]);
        let body = delete_registry_key_body("M1", "host1", &response).unwrap();
        assert_eq!(
            body,
            json!({
                "malopId": "M1",
                "actionsByMachine": {"MID1": [{"targetId": "T1", "actionType": "DELETE_REGISTRY_KEY"}]},
                "initiatorUserName": ""
            })
        );
    }

    #[test]
    fn test_duplicate_targets_queued_once() {
        let response = search(vec![
            ("p1", process(("MID1", "host1"), Some("T1"))),
            ("p2", process(("MID1", "Host1"), Some("T1"))),
            ("p3", process(("MID1", "HOST1"), Some("T2"))),
        ]);
        let body = delete_registry_key_body("M1", "HOST1", &response).unwrap();
        let actions = body["actionsByMachine"]["MID1"].as_array().unwrap();
        let targets: Vec<&str> = actions.iter().map(|a| a["targetId"].as_str().unwrap()).collect();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&"T1"));
        assert!(targets.contains(&"T2"));
    }

    #[test]
    fn test_duplicate_target_on_other_machine_keeps_empty_entry() {
        let response = search(vec![
            ("p1", process(("MID1", "host1"), Some("T1"))),
            ("p2", process(("MID2", "host1"), Some("T1"))),
        ]);
        let body = delete_registry_key_body("M1", "host1", &response).unwrap();
        let machines = body["actionsByMachine"].as_object().unwrap();
        assert_eq!(machines.len(), 2);
        let queued: usize = machines.values().map(|v| v.as_array().unwrap().len()).sum();
        assert_eq!(queued, 1);
    }

    #[test]
    fn test_processes_without_evidence_or_match_skipped() {
        let response = search(vec![
            ("p1", process(("MID1", "host1"), None)),
            ("p2", process(("MID2", "other"), Some("T9"))),
        ]);
        let body = delete_registry_key_body("M1", "host1", &response).unwrap();
        assert_eq!(body["actionsByMachine"], json!({}));
    }

    #[test]
    fn test_kill_process_body() {
        assert_eq!(
            kill_process_body("M1", "MID1", "analyst", "PID9"),
            json!({
                "malopId": "M1",
                "initiatorUserName": "analyst",
                "actionsByMachine": {"MID1": [{"targetId": "PID9", "actionType": "KILL_PROCESS"}]}
            })
        );
    }

    #[test]
    fn test_latest_status_messages() {
        let no_error = json!({"statusLog": [
            {"status": "SENDING", "error": {"message": "ignored"}},
            {"status": "SUCCESS", "error": null}
        ]});
        assert_eq!(
            latest_remediation_status(&no_error).unwrap(),
            json!({"remediation_status": "SUCCESS", "remediation_message": "No error message"})
        );

        let unknown = json!({"statusLog": [{"status": "FAILURE", "error": {"code": 3}}]});
        assert_eq!(
            latest_remediation_status(&unknown).unwrap()["remediation_message"],
            "Unknown error"
        );

        let explicit = json!({"statusLog": [{"status": "FAILURE", "error": {"message": "Probe offline"}}]});
        assert_eq!(
            latest_remediation_status(&explicit).unwrap()["remediation_message"],
            "Probe offline"
        );
    }

    #[test]
    fn test_empty_status_log_is_decode_error() {
        let err = latest_remediation_status(&json!({"statusLog": []})).unwrap_err();
        assert!(matches!(err, ConnectorError::Decode(_)));
    }
}
