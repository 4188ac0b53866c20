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

//! Network isolation of machines, resolved either from a malop or from a
//! machine name / IP address.

use super::sensors::{sensor_ids_by_field, FIELD_EXTERNAL_IP, FIELD_MACHINE_NAME};
use super::{ActionContext, HandlerOutcome};
use crate::client::visual_search::{self, first_simple_string};
use crate::client::{ensure_success, read_json, CybereasonSession};
use crate::core::constants::{endpoints, messages};
use crate::core::errors::ConnectorError;
use crate::core::models::{ActionParams, ActionResult};
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Isolate,
    Unisolate,
}

impl Command {
    fn path(self) -> &'static str {
        match self {
            Command::Isolate => endpoints::ISOLATE,
            Command::Unisolate => endpoints::UNISOLATE,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Command::Isolate => "Isolate",
            Command::Unisolate => "Unisolate",
        }
    }

    fn success(self) -> &'static str {
        match self {
            Command::Isolate => messages::ISOLATE_SUCCESS,
            Command::Unisolate => messages::UNISOLATE_SUCCESS,
        }
    }
}

pub async fn isolate_machine(
    ctx: &mut ActionContext,
    params: &ActionParams,
    _result: &mut ActionResult,
) -> HandlerOutcome {
    malop_command(ctx, params, Command::Isolate).await
}

pub async fn unisolate_machine(
    ctx: &mut ActionContext,
    params: &ActionParams,
    _result: &mut ActionResult,
) -> HandlerOutcome {
    malop_command(ctx, params, Command::Unisolate).await
}

pub async fn isolate_specific_machine(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    machine_command(ctx, params, result, Command::Isolate).await
}

pub async fn unisolate_specific_machine(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    machine_command(ctx, params, result, Command::Unisolate).await
}

async fn malop_command(
    ctx: &mut ActionContext,
    params: &ActionParams,
    command: Command,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let session = ctx.login().await?;
    let sensor_ids = malop_sensor_ids(ctx, &session, &malop_id).await?;

    ctx.save_progress(format!(
        "{} machine URL: {}",
        command.label(),
        session.url(command.path())
    ));
    let body = json!({"pylumIds": sensor_ids, "malopId": malop_id});
    ensure_success(session.post_json(command.path(), &body).await?).await?;

    info!(malop_id = %malop_id, sensors = sensor_ids.len(), command = command.label(), "Isolation command accepted");
    Ok(command.success().to_string())
}

async fn machine_command(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
    command: Command,
) -> HandlerOutcome {
    let machine = params.required_str("machine_name_or_ip")?;
    let session = ctx.login().await?;
    let sensor_ids = machine_sensor_ids(ctx, &session, &machine, result).await;

    ctx.save_progress(format!(
        "{} specific machine URL: {}",
        command.label(),
        session.url(command.path())
    ));
    let response =
        ensure_success(session.post_json(command.path(), &json!({"pylumIds": sensor_ids})).await?)
            .await?;
    let status = response.status().as_u16();
    let body = read_json(response).await?;

    result.add_data(json!({
        "response_code_from_server": status,
        "response_from_server": body,
    }));
    Ok(command.success().to_string())
}

/// Sensor ids of every machine a malop touched
pub async fn malop_sensor_ids(
    ctx: &mut ActionContext,
    session: &CybereasonSession,
    malop_id: &str,
) -> Result<Vec<String>, ConnectorError> {
    let query = visual_search::malop_machines_query(
        malop_id,
        &["pylumId", "elementDisplayName"],
        Value::Null,
    );
    let body = session.query(endpoints::VISUAL_SEARCH, &query).await?;
    ctx.save_progress(format!("Got result from {}", endpoints::VISUAL_SEARCH));

    visual_search::result_elements(&body)?
        .iter()
        .map(|(guid, machine)| {
            first_simple_string(machine, "pylumId").ok_or_else(|| {
                ConnectorError::Decode(format!("Machine {} has no 'pylumId'", guid))
            })
        })
        .collect()
}

/// Sensors matching by machine name followed by sensors matching by IP.
///
/// The two lists are concatenated as-is, so a sensor matching both appears
/// twice. A failed lookup counts as no match.
pub async fn machine_sensor_ids(
    ctx: &mut ActionContext,
    session: &CybereasonSession,
    name_or_ip: &str,
    result: &mut ActionResult,
) -> Vec<String> {
    let by_name = lookup_or_empty(ctx, session, FIELD_MACHINE_NAME, name_or_ip).await;
    let by_ip = lookup_or_empty(ctx, session, FIELD_EXTERNAL_IP, name_or_ip).await;

    result.add_data(json!({
        "sensor_ids_by_machine_ip": by_ip,
        "sensor_ids_by_machine_name": by_name,
    }));

    by_name.into_iter().chain(by_ip).collect()
}

async fn lookup_or_empty(
    ctx: &mut ActionContext,
    session: &CybereasonSession,
    field: &str,
    value: &str,
) -> Vec<String> {
    ctx.save_progress(format!("Sensors query URL: {}", session.url(endpoints::SENSORS_QUERY)));
    match sensor_ids_by_field(session, field, value).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(field, error = %e, "Sensor lookup failed");
            ctx.save_progress(e.status_message());
            Vec::new()
        }
    }
}
