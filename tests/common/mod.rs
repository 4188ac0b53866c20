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

// Shared helpers for integration tests against a mocked console
#![allow(dead_code)]

use cybereason_connector::actions;
use cybereason_connector::config::{AssetConfig, RuntimeConfig};
use cybereason_connector::core::models::{ActionOutcome, ActionParams, ActionRequest};
use cybereason_connector::state::ConnectorState;
use mockito::{Mock, ServerGuard};
use serde_json::{json, Value};

pub const SESSION_ID: &str = "s3ss10n";

/// Login endpoint that hands out a session cookie
pub async fn mock_login(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/login.html")
        .with_status(200)
        .with_header("set-cookie", &format!("JSESSIONID={}; Path=/", SESSION_ID))
        .with_body("<html><body>ok</body></html>")
        .create_async()
        .await
}

pub fn asset_for(server: &ServerGuard) -> AssetConfig {
    AssetConfig {
        base_url: server.url(),
        username: Some("analyst".to_string()),
        password: Some("secret".to_string()),
        ..Default::default()
    }
}

pub fn request(identifier: &str, params: Value) -> ActionRequest {
    ActionRequest {
        identifier: identifier.to_string(),
        config: Value::Null,
        parameters: vec![ActionParams::from(params)],
    }
}

pub async fn run_with(
    asset: AssetConfig,
    identifier: &str,
    params: Value,
    state: ConnectorState,
) -> ActionOutcome {
    actions::execute(&request(identifier, params), asset, &RuntimeConfig::default(), state)
        .await
        .expect("known action")
}

pub async fn run(server: &ServerGuard, identifier: &str, params: Value) -> ActionOutcome {
    run_with(asset_for(server), identifier, params, ConnectorState::default()).await
}

/// Visual-search response wrapping the given guid -> element map
pub fn search_response(elements: Value) -> String {
    json!({"data": {"resultIdToElementDataMap": elements}, "status": "SUCCESS"}).to_string()
}

pub fn sensors_response(sensors: Value) -> String {
    let total = sensors.as_array().map(Vec::len).unwrap_or(0);
    json!({"sensors": sensors, "totalResults": total}).to_string()
}
