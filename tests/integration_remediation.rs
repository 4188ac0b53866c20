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

// Remediation: registry key deletion, process kill and progress polling

mod common;

use common::{mock_login, run, search_response};
use cybereason_connector::core::models::ActionStatus;
use mockito::{Matcher, Server};
use serde_json::json;

fn autorun_process(target: &str) -> serde_json::Value {
    json!({
        "simpleValues": {},
        "elementValues": {
            "ownerMachine": {"elementValues": [{"guid": "MID1", "name": "HOST1", "elementType": "Machine"}]},
            "hasAutorunEvidence": {"elementValues": [{"guid": target, "name": "Run", "elementType": "AutorunEvidence"}]}
        }
    })
}

#[tokio::test]
async fn test_delete_registry_key_end_to_end() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let search = server
        .mock("POST", "/rest/visualsearch/query/simple")
        .match_body(Matcher::PartialJson(json!({
            "queryPath": [{"guidList": ["M1"]}, {"requestedType": "Process", "isResult": true}],
            "totalResultLimit": 100,
            "perGroupLimit": 100,
            "perFeatureLimit": 100,
            "queryTimeout": 120000,
            "customFields": ["ownerMachine", "hasAutorunEvidence"]
        })))
        .with_status(200)
        .with_body(search_response(json!({
            "p1": autorun_process("T1"),
            "p2": autorun_process("T1")
        })))
        .create_async()
        .await;
    let remediate = server
        .mock("POST", "/rest/remediate")
        .match_body(Matcher::Json(json!({
            "malopId": "M1",
            "actionsByMachine": {"MID1": [{"targetId": "T1", "actionType": "DELETE_REGISTRY_KEY"}]},
            "initiatorUserName": ""
        })))
        .with_status(200)
        .with_body(r#"{"remediationId": "R1", "initiatingUser": "analyst", "statusLog": []}"#)
        .create_async()
        .await;

    let outcome = run(
        &server,
        "delete_registry_key",
        json!({"malop_id": "M1", "machine_name": "host1"}),
    )
    .await;

    search.assert_async().await;
    remediate.assert_async().await;
    let result = &outcome.results[0];
    assert_eq!(result.status, ActionStatus::Success);
    assert_eq!(
        result.data,
        vec![json!({"remediation_id": "R1", "initiating_user": "analyst"})]
    );
}

#[tokio::test]
async fn test_kill_process() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let remediate = server
        .mock("POST", "/rest/remediate")
        .match_body(Matcher::Json(json!({
            "malopId": "M1",
            "initiatorUserName": "analyst@corp",
            "actionsByMachine": {"MID1": [{"targetId": "PID1", "actionType": "KILL_PROCESS"}]}
        })))
        .with_status(200)
        .with_body(r#"{"remediationId": "R2", "statusLog": [{"status": "PENDING", "error": null}]}"#)
        .create_async()
        .await;

    let outcome = run(
        &server,
        "kill_process",
        json!({
            "malop_id": "M1",
            "machine_id": "MID1",
            "remediation_user": "analyst@corp",
            "process_id": "PID1"
        }),
    )
    .await;

    remediate.assert_async().await;
    assert_eq!(
        outcome.results[0].data,
        vec![json!({"remediation_id": "R2", "remediation_status": "PENDING"})]
    );
}

#[tokio::test]
async fn test_kill_process_without_status_log_entries_has_no_data() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/rest/remediate")
        .with_status(200)
        .with_body(r#"{"remediationId": "R3", "statusLog": []}"#)
        .create_async()
        .await;

    let outcome = run(
        &server,
        "kill_process",
        json!({"malop_id": "M1", "machine_id": "MID1", "remediation_user": "u", "process_id": "P"}),
    )
    .await;

    assert_eq!(outcome.results[0].status, ActionStatus::Success);
    assert!(outcome.results[0].data.is_empty());
}

#[tokio::test]
async fn test_get_remediation_status_reads_latest_entry() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let progress = server
        .mock("GET", "/rest/remediate/progress/analyst/M1/R1")
        .with_status(200)
        .with_body(
            json!({"statusLog": [
                {"status": "STARTED", "error": null},
                {"status": "FAILURE", "error": {"message": "Probe disconnected"}}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let outcome = run(
        &server,
        "get_remediation_status",
        json!({"malop_id": "M1", "remediation_user": "analyst", "remediation_id": "R1"}),
    )
    .await;

    progress.assert_async().await;
    assert_eq!(
        outcome.results[0].data,
        vec![json!({"remediation_status": "FAILURE", "remediation_message": "Probe disconnected"})]
    );
}

#[tokio::test]
async fn test_missing_parameter_named() {
    let server = Server::new_async().await;

    let outcome = run(&server, "kill_process", json!({"malop_id": "M1"})).await;

    assert_eq!(outcome.results[0].status, ActionStatus::Failed);
    assert_eq!(
        outcome.results[0].message,
        "Missing required parameter 'machine_id'"
    );
}
