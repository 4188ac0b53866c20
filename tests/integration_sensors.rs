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

// Sensor upgrade and restart commands

mod common;

use common::{mock_login, run};
use cybereason_connector::core::models::ActionStatus;
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn test_upgrade_trims_comma_separated_ids() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let upgrade = server
        .mock("POST", "/rest/sensors/action/upgrade")
        .match_body(Matcher::Json(json!({
            "filters": [{"fieldName": "pylumId", "operator": "ContainsIgnoreCase", "values": ["a", "b", "c"]}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"batchId": -1234, "actionType": "Upgrade", "totalNumberOfProbes": 3}"#)
        .create_async()
        .await;

    let outcome = run(&server, "upgrade_sensor", json!({"pylumid": "a, b ,c"})).await;

    upgrade.assert_async().await;
    let result = &outcome.results[0];
    assert_eq!(result.status, ActionStatus::Success);
    assert_eq!(result.message, "Successfully requested for sensor upgrade");
    let echoed = json!({"batchId": -1234, "actionType": "Upgrade", "totalNumberOfProbes": 3});
    assert_eq!(result.data, vec![echoed.clone()]);
    assert_eq!(serde_json::Value::Object(result.summary.clone()), echoed);
}

#[tokio::test]
async fn test_restart_no_match_is_distinct_error() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/rest/sensors/action/restart")
        .with_status(204)
        .create_async()
        .await;

    let outcome = run(&server, "restart_sensor", json!({"pylumid": "unknown-sensor"})).await;

    let result = &outcome.results[0];
    assert_eq!(result.status, ActionStatus::Failed);
    assert_eq!(
        result.message,
        "Status Code:204. The sensor names are incorrect or the filters are not valid"
    );
    assert!(result.data.is_empty());
}

#[tokio::test]
async fn test_restart_single_id_sent_verbatim() {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let restart = server
        .mock("POST", "/rest/sensors/action/restart")
        .match_body(Matcher::PartialJson(json!({
            "filters": [{"values": ["PYLUM-1"]}]
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let outcome = run(&server, "restart_sensor", json!({"pylumid": "PYLUM-1"})).await;

    restart.assert_async().await;
    assert_eq!(outcome.results[0].message, "Successfully requested for sensor restart");
}
