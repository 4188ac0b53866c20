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

//! Sensor lifecycle commands and sensor inventory lookups.

use super::{ActionContext, HandlerOutcome};
use crate::client::visual_search::sensor_filter_query;
use crate::client::{ensure_success, read_json, CybereasonSession};
use crate::core::constants::{endpoints, messages};
use crate::core::errors::ConnectorError;
use crate::core::models::{value_to_string, ActionParams, ActionResult};
use crate::core::validation::split_sensor_ids;
use serde_json::{json, Value};
use tracing::info;

pub const FIELD_MACHINE_NAME: &str = "machineName";
pub const FIELD_EXTERNAL_IP: &str = "externalIpAddress";

/// Lifecycle command body: case-insensitive contains match on sensor ids
pub fn sensor_action_body(pylum_ids: &[String]) -> Value {
    json!({
        "filters": [{"fieldName": "pylumId", "operator": "ContainsIgnoreCase", "values": pylum_ids}]
    })
}

pub async fn upgrade_sensor(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    sensor_action(
        ctx,
        params,
        result,
        SensorCommand {
            path: endpoints::SENSORS_UPGRADE,
            label: "Upgrade",
            success: messages::SENSOR_UPGRADE_SUCCESS,
        },
    )
    .await
}

pub async fn restart_sensor(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    sensor_action(
        ctx,
        params,
        result,
        SensorCommand {
            path: endpoints::SENSORS_RESTART,
            label: "Restart",
            success: messages::SENSOR_RESTART_SUCCESS,
        },
    )
    .await
}

struct SensorCommand {
    path: &'static str,
    label: &'static str,
    success: &'static str,
}

async fn sensor_action(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
    command: SensorCommand,
) -> HandlerOutcome {
    let pylum_ids = split_sensor_ids(&params.required_str("pylumid")?);
    let session = ctx.login().await?;
    ctx.save_progress(format!(
        "{} sensor URL: {}",
        command.label,
        session.url(command.path)
    ));

    let response = session
        .post_json(command.path, &sensor_action_body(&pylum_ids))
        .await?;
    // 204 means the filter matched no sensor
    if response.status().as_u16() == 204 {
        return Err(ConnectorError::HttpStatus {
            status: 204,
            message: messages::SENSORS_NOT_MATCHED.to_string(),
        });
    }

    let body = read_json(ensure_success(response).await?).await?;
    ctx.save_progress(format!("Sensors {} Requested", command.label));
    info!(sensors = pylum_ids.len(), command = command.label, "Sensor command accepted");

    result.update_summary(body.clone());
    result.add_data(body);
    Ok(command.success.to_string())
}

/// `pylumId` of every sensor whose `field` equals `value`
pub async fn sensor_ids_by_field(
    session: &CybereasonSession,
    field: &str,
    value: &str,
) -> Result<Vec<String>, ConnectorError> {
    let body = session
        .query(endpoints::SENSORS_QUERY, &sensor_filter_query(field, value))
        .await?;
    sensor_values(&body, "pylumId")
}

/// Machine names of the sensors reporting `ip` as external address
pub async fn machine_names_by_ip(
    session: &CybereasonSession,
    ip: &str,
) -> Result<Vec<String>, ConnectorError> {
    let body = session
        .query(endpoints::SENSORS_QUERY, &sensor_filter_query(FIELD_EXTERNAL_IP, ip))
        .await?;
    sensor_values(&body, "machineName")
}

/// Pull one field out of every sensor in a sensors query response
pub fn sensor_values(body: &Value, field: &str) -> Result<Vec<String>, ConnectorError> {
    let total = body
        .get("totalResults")
        .and_then(Value::as_u64)
        .ok_or_else(|| ConnectorError::Decode("Sensors response has no 'totalResults'".to_string()))?;
    if total == 0 {
        return Ok(Vec::new());
    }

    let sensors = body
        .get("sensors")
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectorError::Decode("Sensors response has no 'sensors'".to_string()))?;

    sensors
        .iter()
        .map(|sensor| {
            sensor.get(field).and_then(value_to_string).ok_or_else(|| {
                ConnectorError::Decode(format!("Sensor entry has no '{}'", field))
            })
        })
        .collect()
}
