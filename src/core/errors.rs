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

// Domain error types - one variant per failure kind an action can end in

use crate::core::constants::messages;
use thiserror::Error;

/// Main error type for the connector
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Missing or malformed action/asset parameter; no call was made
    #[error("{0}")]
    Validation(String),

    /// Login did not yield a usable session
    #[error("{0}")]
    Authentication(String),

    /// Connection refused, bad URL, timeout
    #[error("{0}")]
    Transport(String),

    /// Console answered outside [200, 399); message is already classified
    #[error("{message}")]
    HttpStatus { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported action: {0}")]
    UnknownAction(String),

    #[error("State error: {0}")]
    State(String),
}

impl ConnectorError {
    /// Short machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::Validation(_) => "validation",
            ConnectorError::Authentication(_) => "authentication",
            ConnectorError::Transport(_) => "transport",
            ConnectorError::HttpStatus { .. } => "http_status",
            ConnectorError::Decode(_) => "decode",
            ConnectorError::Configuration(_) => "configuration",
            ConnectorError::UnknownAction(_) => "unknown_action",
            ConnectorError::State(_) => "state",
        }
    }

    /// Message reported to the host as the action's status message
    pub fn status_message(&self) -> String {
        match self {
            ConnectorError::Validation(msg)
            | ConnectorError::Authentication(msg)
            | ConnectorError::Transport(msg)
            | ConnectorError::HttpStatus { message: msg, .. } => msg.clone(),
            ConnectorError::Decode(msg)
            | ConnectorError::Configuration(msg)
            | ConnectorError::State(msg) => {
                format!("Error occurred. {}", format_error_detail(None, Some(msg)))
            }
            ConnectorError::UnknownAction(action) => format!("Unsupported action: {}", action),
        }
    }
}

/// Render an error code/message pair, substituting placeholders for missing parts
pub fn format_error_detail(code: Option<&str>, message: Option<&str>) -> String {
    let code = code.unwrap_or(messages::ERROR_CODE_MESSAGE);
    let message = message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(messages::ERROR_MESSAGE_UNAVAILABLE);
    format!("Error Code: {}. Error Message: {}", code, message)
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ConnectorError::Decode(e.to_string())
        } else if e.is_timeout() {
            ConnectorError::Transport(format!("Error connecting to server. Request timed out: {}", e))
        } else if e.is_connect() {
            ConnectorError::Transport(messages::CONNECTION_REFUSED.to_string())
        } else if e.is_builder() {
            let url = e.url().map(|u| u.to_string()).unwrap_or_default();
            ConnectorError::Transport(format!("Error connecting to server. Invalid URL {}", url))
        } else {
            let code = e.status().map(|s| s.as_u16().to_string());
            ConnectorError::Transport(format!(
                "Error occurred. {}",
                format_error_detail(code.as_deref(), Some(&e.to_string()))
            ))
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(e: serde_json::Error) -> Self {
        ConnectorError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_verbatim() {
        let err = ConnectorError::Validation(messages::INVALID_STATUS.to_string());
        assert_eq!(err.status_message(), messages::INVALID_STATUS);
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_decode_message_wrapped() {
        let err = ConnectorError::Decode("missing field `data`".to_string());
        assert_eq!(
            err.status_message(),
            "Error occurred. Error Code: Error code unavailable. Error Message: missing field `data`"
        );
    }

    #[test]
    fn test_error_detail_placeholders() {
        let detail = format_error_detail(None, None);
        assert!(detail.contains(messages::ERROR_CODE_MESSAGE));
        assert!(detail.contains(messages::ERROR_MESSAGE_UNAVAILABLE));

        let detail = format_error_detail(Some("500"), Some(""));
        assert!(detail.starts_with("Error Code: 500."));
        assert!(detail.contains(messages::ERROR_MESSAGE_UNAVAILABLE));
    }

    #[test]
    fn test_http_status_keeps_classified_message() {
        let err = ConnectorError::HttpStatus {
            status: 500,
            message: "Status Code: 500. Data from server:\nboom\n".to_string(),
        };
        assert_eq!(err.status_message(), "Status Code: 500. Data from server:\nboom\n");
        assert_eq!(err.kind(), "http_status");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ConnectorError = json_err.into();
        assert!(matches!(err, ConnectorError::Decode(_)));
    }
}
