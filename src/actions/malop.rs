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

//! Malop triage: sensor status, comments, status changes and file reputation.

use super::{ActionContext, HandlerOutcome};
use crate::client::ensure_success;
use crate::client::visual_search::{self, first_simple_string};
use crate::core::constants::{endpoints, limits, messages};
use crate::core::errors::ConnectorError;
use crate::core::models::{ActionParams, ActionResult};
use crate::core::validation::{map_malop_status, parse_reputation, Reputation};
use serde_json::{json, Map, Value};

const ONLINE: &str = "Online";
const OFFLINE: &str = "Offline";

pub async fn get_sensor_status(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let session = ctx.login().await?;

    let query = visual_search::malop_machines_query(
        &malop_id,
        &["isConnected", "elementDisplayName"],
        json!(limits::SENSOR_STATUS_QUERY_TIMEOUT),
    );
    let body = session.query(endpoints::VISUAL_SEARCH, &query).await?;
    ctx.save_progress(messages::MACHINE_DETAILS_FETCHED);

    for (machine_id, machine) in visual_search::result_elements(&body)? {
        let machine_name = first_simple_string(machine, "elementDisplayName").ok_or_else(|| {
            ConnectorError::Decode(format!("Machine {} has no display name", machine_id))
        })?;
        let connected = first_simple_string(machine, "isConnected").as_deref() == Some("true");
        result.add_data(json!({
            "machine_id": machine_id,
            "machine_name": machine_name,
            "status": if connected { ONLINE } else { OFFLINE },
        }));
    }

    Ok(messages::MACHINE_DETAILS_FETCHED.to_string())
}

pub async fn add_malop_comment(
    ctx: &mut ActionContext,
    params: &ActionParams,
    _result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let comment = params.optional_str("comment").unwrap_or_default();
    ctx.save_progress(format!("MALOP ID: {}", malop_id));

    let session = ctx.login().await?;
    let path = format!("{}{}", endpoints::CRIMES_COMMENT, malop_id);
    ctx.save_progress(format!("Add malop comment URL: {}", session.url(&path)));

    ensure_success(session.post_raw(&path, comment).await?).await?;
    Ok(messages::ADD_COMMENT_SUCCESS.to_string())
}

pub async fn update_malop_status(
    ctx: &mut ActionContext,
    params: &ActionParams,
    _result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let label = params.optional_str("status").unwrap_or_default();
    let code = match map_malop_status(&label) {
        Ok(code) => code,
        Err(e) => {
            ctx.save_progress("Invalid status selected");
            return Err(e);
        }
    };

    let session = ctx.login().await?;
    ctx.save_progress(format!(
        "Update malop status URL: {}",
        session.url(endpoints::CRIMES_STATUS)
    ));

    let mut body = Map::new();
    body.insert(malop_id, Value::String(code.to_string()));
    ensure_success(session.post_json(endpoints::CRIMES_STATUS, &body).await?).await?;

    Ok(messages::UPDATE_STATUS_SUCCESS.to_string())
}

/// Classification update body for one file hash
pub fn reputation_body(item_hash: &str, reputation: Reputation) -> Value {
    let remove = reputation == Reputation::Remove;
    let malicious_type = if remove {
        Value::Null
    } else {
        Value::String(reputation.as_str().to_string())
    };
    json!([{
        "keys": [item_hash],
        "maliciousType": malicious_type,
        "prevent": false,
        "remove": remove,
    }])
}

pub async fn set_reputation(
    ctx: &mut ActionContext,
    params: &ActionParams,
    _result: &mut ActionResult,
) -> HandlerOutcome {
    let reputation = parse_reputation(&params.optional_str("custom_reputation").unwrap_or_default())?;
    let item_hash = params.required_str("reputation_item_hash")?;

    let session = ctx.login().await?;
    ctx.save_progress(format!(
        "Set reputation URL: {}",
        session.url(endpoints::CLASSIFICATION_UPDATE)
    ));

    let body = reputation_body(&item_hash, reputation);
    ensure_success(session.post_json(endpoints::CLASSIFICATION_UPDATE, &body).await?).await?;
    ctx.save_progress(format!("{}ed...", reputation.as_str()));

    Ok(messages::SET_REPUTATION_SUCCESS.to_string())
}
