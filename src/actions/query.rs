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

//! Read-only investigation queries.
//!
//! Each entity type has a field table: which console fields to request and
//! which key each lands under in the flattened record. Fields the console
//! leaves out are simply absent from the record.

use super::sensors::machine_names_by_ip;
use super::{ActionContext, HandlerOutcome};
use crate::client::visual_search::{self, element_names, first_simple_value};
use crate::client::CybereasonSession;
use crate::core::constants::{endpoints, limits};
use crate::core::errors::ConnectorError;
use crate::core::models::{ActionParams, ActionResult};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// First entry of `simpleValues.<field>.values`
    Simple,
    /// Names of `elementValues.<field>.elementValues`
    Elements,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub source: &'static str,
    pub key: &'static str,
    pub kind: FieldKind,
}

const fn simple(source: &'static str, key: &'static str) -> FieldSpec {
    FieldSpec { source, key, kind: FieldKind::Simple }
}

const fn elements(source: &'static str, key: &'static str) -> FieldSpec {
    FieldSpec { source, key, kind: FieldKind::Elements }
}

pub const PROCESS_FIELDS: &[FieldSpec] = &[
    simple("elementDisplayName", "process_name"),
    simple("creationTime", "creation_time"),
    simple("endTime", "end_time"),
    simple("commandLine", "command_line"),
    simple("isImageFileSignedAndVerified", "signed_and_verified"),
    simple("productType", "product_type"),
    elements("ownerMachine", "owner_machine"),
    elements("calculatedUser", "user"),
    elements("parentProcess", "parent_process"),
    elements("children", "children"),
    elements("imageFile", "image_file"),
];

pub const MACHINE_FIELDS: &[FieldSpec] = &[
    simple("elementDisplayName", "machine_name"),
    simple("osVersionType", "os_version"),
    simple("platformArchitecture", "platform_architecture"),
    simple("uptime", "uptime"),
    simple("isActiveProbeConnected", "is_connected_to_cybereason"),
    simple("lastSeenTimeStamp", "last_seen"),
    simple("timeStampSinceLastConnectionTime", "time_since_last_connection"),
    elements("activeUsers", "active_users"),
    elements("mountPoints", "mount_points"),
    elements("processes", "processes"),
    elements("services", "services"),
];

pub const USER_FIELDS: &[FieldSpec] = &[
    simple("elementDisplayName", "username"),
    simple("domain", "domain"),
    simple("isLocalSystem", "is_local_system"),
    simple("emailAddress", "email_address"),
    elements("ownerMachine", "owner_machine"),
    elements("ownerOrganization", "owner_organization"),
];

pub const FILE_FIELDS: &[FieldSpec] = &[
    simple("elementDisplayName", "file_name"),
    simple("md5String", "md5"),
    simple("sha1String", "sha1"),
    simple("correctedPath", "path"),
    simple("sizeInBytes", "size"),
    simple("isSigned", "is_signed"),
    simple("signatureVerified", "signature_verified"),
    simple("productName", "product_name"),
    simple("companyName", "company_name"),
    simple("createdTime", "created_time"),
    simple("modifiedTime", "modified_time"),
    simple("maliciousClassificationType", "malicious_classification"),
    simple("avRemediationStatus", "av_remediation_status"),
    elements("ownerMachine", "owner_machine"),
];

pub const DOMAIN_FIELDS: &[FieldSpec] = &[
    simple("elementDisplayName", "domain_name"),
    simple("maliciousClassificationType", "malicious_classification"),
    simple("isInternalDomain", "is_internal_domain"),
    simple("everResolvedDomain", "ever_resolved_domain"),
    simple("everResolvedSecondLevelDomain", "ever_resolved_second_level_domain"),
];

pub const CONNECTION_FIELDS: &[FieldSpec] = &[
    simple("elementDisplayName", "connection_name"),
    simple("direction", "direction"),
    simple("serverPort", "server_port"),
    simple("portType", "port_type"),
    simple("aggregatedReceivedBytesCount", "received_bytes"),
    simple("aggregatedTransmittedBytesCount", "transmitted_bytes"),
    simple("remoteAddressCountryName", "remote_address_country"),
    elements("ownerMachine", "owner_machine"),
    elements("ownerProcess", "owner_process"),
    elements("serverAddress", "server_address"),
];

fn custom_fields(fields: &[FieldSpec]) -> Vec<&'static str> {
    fields.iter().map(|f| f.source).collect()
}

/// Flatten one visual-search element into a record keyed by `fields`
pub fn element_record(guid: &str, element: &Value, fields: &[FieldSpec]) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("element_id".to_string(), Value::String(guid.to_string()));

    for field in fields {
        let value = match field.kind {
            FieldKind::Simple => first_simple_value(element, field.source).cloned(),
            FieldKind::Elements => {
                let names = element_names(element, field.source);
                (!names.is_empty()).then(|| Value::from(names))
            }
        };
        if let Some(value) = value {
            record.insert(field.key.to_string(), value);
        }
    }
    record
}

/// Every record of a visual-search response
pub fn extract_records(
    body: &Value,
    fields: &[FieldSpec],
) -> Result<Vec<Map<String, Value>>, ConnectorError> {
    Ok(visual_search::result_elements(body)?
        .iter()
        .map(|(guid, element)| element_record(guid, element, fields))
        .collect())
}

async fn search_by_name(
    session: &CybereasonSession,
    requested_type: &str,
    name: &str,
    fields: &[FieldSpec],
) -> Result<Vec<Map<String, Value>>, ConnectorError> {
    let query = visual_search::element_by_name_query(requested_type, name, &custom_fields(fields));
    let body = session.query(endpoints::VISUAL_SEARCH, &query).await?;
    extract_records(&body, fields)
}

fn report(result: &mut ActionResult, records: Vec<Map<String, Value>>, noun: &str) -> String {
    let count = records.len();
    for record in records {
        result.add_data(Value::Object(record));
    }
    result.update_summary(serde_json::json!({ "total_results": count }));
    info!(entity = noun, count, "Query returned records");
    format!("Found {} {}(s)", count, noun)
}

async fn entity_query(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
    param: &str,
    requested_type: &str,
    fields: &[FieldSpec],
    noun: &str,
) -> HandlerOutcome {
    let name = params.required_str(param)?;
    let session = ctx.login().await?;
    ctx.save_progress(format!("Querying {} elements named {}", requested_type, name));

    let records = search_by_name(&session, requested_type, &name, fields).await?;
    Ok(report(result, records, noun))
}

pub async fn query_processes(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    let malop_id = params.required_str("malop_id")?;
    let session = ctx.login().await?;
    ctx.save_progress(format!("Querying suspect processes of malop {}", malop_id));

    let query = visual_search::malop_processes_query(
        &malop_id,
        &custom_fields(PROCESS_FIELDS),
        limits::ENTITY_TOTAL_RESULT_LIMIT,
        limits::ENTITY_QUERY_TIMEOUT_MS,
    );
    let body = session.query(endpoints::VISUAL_SEARCH, &query).await?;
    let records = extract_records(&body, PROCESS_FIELDS)?;
    Ok(report(result, records, "process"))
}

pub async fn query_machine(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    entity_query(ctx, params, result, "machine_name", "Machine", MACHINE_FIELDS, "machine").await
}

/// Machines behind an external IP: sensor inventory first, then one
/// machine query per reported machine name
pub async fn query_machine_ip(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    let ip = params.required_str("machine_ip")?;
    let session = ctx.login().await?;

    let names = machine_names_by_ip(&session, &ip).await?;
    ctx.save_progress(format!("{} machine(s) report external IP {}", names.len(), ip));

    let mut records = Vec::new();
    for name in &names {
        records.extend(search_by_name(&session, "Machine", name, MACHINE_FIELDS).await?);
    }
    Ok(report(result, records, "machine"))
}

pub async fn query_users(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    entity_query(ctx, params, result, "user", "User", USER_FIELDS, "user").await
}

pub async fn query_files(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    entity_query(ctx, params, result, "file_name", "File", FILE_FIELDS, "file").await
}

pub async fn query_domain(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    entity_query(ctx, params, result, "domain_name", "DomainName", DOMAIN_FIELDS, "domain").await
}

pub async fn query_connections(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    entity_query(
        ctx,
        params,
        result,
        "connection_name",
        "Connection",
        CONNECTION_FIELDS,
        "connection",
    )
    .await
}
