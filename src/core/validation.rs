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

//! Parameter validation and normalization.
//!
//! Every check here runs before a session is opened, so a rejected
//! parameter never causes network traffic.

use crate::core::constants::{messages, reputation, status};
use crate::core::errors::ConnectorError;
use serde_json::Value;

/// Custom reputation override for a file hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reputation {
    Whitelist,
    Blacklist,
    Remove,
}

impl Reputation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reputation::Whitelist => reputation::WHITELIST,
            Reputation::Blacklist => reputation::BLACKLIST,
            Reputation::Remove => reputation::REMOVE,
        }
    }
}

/// Validate a whole, non-negative integer parameter.
///
/// Strings must be integer literals (`"5"`); JSON numbers only need to be
/// whole (`5.0`). `None` passes through untouched.
pub fn validate_integer(value: Option<&Value>, key: &str) -> Result<Option<u64>, ConnectorError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let invalid = || ConnectorError::Validation(format!("{} {}", messages::INVALID_INTEGER_PREFIX, key));

    let parsed: i64 = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).map_err(|_| invalid())?
            } else {
                let f = n.as_f64().ok_or_else(invalid)?;
                if !f.is_finite() || f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
                    return Err(invalid());
                }
                f as i64
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let as_float: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !as_float.is_finite() || as_float.fract() != 0.0 {
                return Err(invalid());
            }
            trimmed.parse::<i64>().map_err(|_| invalid())?
        }
        _ => return Err(invalid()),
    };

    if parsed < 0 {
        return Err(ConnectorError::Validation(format!(
            "{} {}",
            messages::INVALID_NON_NEGATIVE_INTEGER_PREFIX,
            key
        )));
    }

    Ok(Some(parsed as u64))
}

/// Split a comma-separated id list, trimming each segment.
///
/// Input without a comma is passed through as one value.
pub fn split_sensor_ids(input: &str) -> Vec<String> {
    if input.contains(',') {
        input
            .trim()
            .split(',')
            .map(|id| id.trim().to_string())
            .collect()
    } else {
        vec![input.to_string()]
    }
}

/// Double braces so the host's template engine renders them literally
pub fn escape_braces(message: &str) -> String {
    message.replace('{', "{{").replace('}', "}}")
}

/// Map a host malop status label to the console's status code
pub fn map_malop_status(label: &str) -> Result<&'static str, ConnectorError> {
    status::MALOP_STATUS_MAP
        .iter()
        .find(|(host_label, _)| *host_label == label)
        .map(|(_, code)| *code)
        .ok_or_else(|| ConnectorError::Validation(messages::INVALID_STATUS.to_string()))
}

pub fn parse_reputation(label: &str) -> Result<Reputation, ConnectorError> {
    match label {
        reputation::WHITELIST => Ok(Reputation::Whitelist),
        reputation::BLACKLIST => Ok(Reputation::Blacklist),
        reputation::REMOVE => Ok(Reputation::Remove),
        _ => Err(ConnectorError::Validation(messages::INVALID_REPUTATION.to_string())),
    }
}
