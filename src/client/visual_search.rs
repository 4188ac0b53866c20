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

//! Visual-search query bodies and result walking.
//!
//! Results come back as `data.resultIdToElementDataMap`, a map from element
//! guid to `{simpleValues, elementValues}`. Simple values hold scalar lists,
//! element values hold references to other elements.

use crate::core::constants::limits;
use crate::core::errors::ConnectorError;
use crate::core::models::value_to_string;
use serde_json::{json, Map, Value};

/// `MalopProcess -> Process -> Machine` query returning the malop's machines
pub fn malop_machines_query(malop_id: &str, custom_fields: &[&str], query_timeout: Value) -> Value {
    json!({
        "queryPath": [
            {
                "requestedType": "MalopProcess",
                "filters": [],
                "guidList": [malop_id],
                "connectionFeature": {"elementInstanceType": "MalopProcess", "featureName": "suspects"}
            },
            {
                "requestedType": "Process",
                "filters": [],
                "connectionFeature": {"elementInstanceType": "Process", "featureName": "ownerMachine"}
            },
            {"requestedType": "Machine", "filters": [], "isResult": true}
        ],
        "totalResultLimit": limits::MALOP_TOTAL_RESULT_LIMIT,
        "perGroupLimit": limits::MALOP_PER_GROUP_LIMIT,
        "perFeatureLimit": limits::MALOP_PER_FEATURE_LIMIT,
        "templateContext": "SPECIFIC",
        "queryTimeout": query_timeout,
        "customFields": custom_fields
    })
}

/// `MalopProcess -> Process` query returning the malop's suspect processes
pub fn malop_processes_query(
    malop_id: &str,
    custom_fields: &[&str],
    result_limit: u32,
    query_timeout: u64,
) -> Value {
    json!({
        "queryPath": [
            {
                "requestedType": "MalopProcess",
                "filters": [],
                "guidList": [malop_id],
                "connectionFeature": {"elementInstanceType": "MalopProcess", "featureName": "suspects"}
            },
            {"requestedType": "Process", "filter": [], "isResult": true}
        ],
        "totalResultLimit": result_limit,
        "perGroupLimit": result_limit,
        "perFeatureLimit": result_limit,
        "templateContext": "SPECIFIC",
        "queryTimeout": query_timeout,
        "customFields": custom_fields
    })
}

/// Single-step query for elements of `requested_type` whose display name equals `name`
pub fn element_by_name_query(requested_type: &str, name: &str, custom_fields: &[&str]) -> Value {
    json!({
        "queryPath": [
            {
                "requestedType": requested_type,
                "filters": [
                    {"facetName": "elementDisplayName", "values": [name], "filterType": "Equals"}
                ],
                "isResult": true
            }
        ],
        "totalResultLimit": limits::ENTITY_TOTAL_RESULT_LIMIT,
        "perGroupLimit": limits::ENTITY_PER_GROUP_LIMIT,
        "perFeatureLimit": limits::ENTITY_PER_FEATURE_LIMIT,
        "templateContext": "SPECIFIC",
        "queryTimeout": limits::ENTITY_QUERY_TIMEOUT_MS,
        "customFields": custom_fields
    })
}

/// Sensor inventory lookup with a single exact-match filter
pub fn sensor_filter_query(field_name: &str, value: &str) -> Value {
    json!({
        "limit": limits::SENSOR_QUERY_LIMIT,
        "offset": 0,
        "filters": [{"fieldName": field_name, "operator": "Equals", "values": [value]}]
    })
}

/// The guid -> element map of a visual-search response
pub fn result_elements(body: &Value) -> Result<&Map<String, Value>, ConnectorError> {
    body.get("data")
        .and_then(|data| data.get("resultIdToElementDataMap"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ConnectorError::Decode("Response has no 'data.resultIdToElementDataMap'".to_string())
        })
}

/// First entry of a simple value list
pub fn first_simple_value<'a>(element: &'a Value, field: &str) -> Option<&'a Value> {
    element
        .get("simpleValues")?
        .get(field)?
        .get("values")?
        .get(0)
}

pub fn first_simple_string(element: &Value, field: &str) -> Option<String> {
    first_simple_value(element, field).and_then(value_to_string)
}

/// Referenced elements of an element-valued field; empty when absent
pub fn element_values<'a>(element: &'a Value, field: &str) -> &'a [Value] {
    element
        .get("elementValues")
        .and_then(|values| values.get(field))
        .and_then(|field| field.get("elementValues"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Names of the referenced elements of a field
pub fn element_names(element: &Value, field: &str) -> Vec<String> {
    element_values(element, field)
        .iter()
        .filter_map(|v| v.get("name").and_then(value_to_string))
        .collect()
}
