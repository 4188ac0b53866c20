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

//! Response classification.
//!
//! Callers treat any status in `[200, 399)` as success and only hand failed
//! responses to [`classify`], which turns the body into the message the host
//! shows. Classification itself never fails.

use crate::core::constants::messages;
use crate::core::errors::ConnectorError;
use crate::core::validation::escape_braces;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use scraper::{Html, Node};
use serde_json::Value;
use tracing::warn;

/// Elements whose text never reaches the error message
const STRIPPED_ELEMENTS: [&str; 5] = ["script", "style", "footer", "nav", "title"];

pub fn is_success_status(code: u16) -> bool {
    (200..399).contains(&code)
}

/// Visible text of an HTML page: one trimmed, non-empty line per text run
pub fn extract_html_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let mut lines: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if STRIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        lines.extend(text.split('\n').map(str::trim).filter(|line| !line.is_empty()));
    }

    lines.join("\n")
}

fn format_html_message(status: u16, error_text: &str) -> String {
    let message = format!("Status Code: {}. Data from server:\n{}\n", status, error_text);
    // invalid UTF-8 after decoding becomes U+FFFD; valid escapes still decode
    let decoded = urlencoding::decode_binary(message.as_bytes());
    escape_braces(&String::from_utf8_lossy(&decoded))
}

/// Message for an HTML error page
pub fn process_html_response(status: u16, body: &str) -> String {
    format_html_message(status, &extract_html_text(body))
}

/// Message for any failed response, dispatching on content type
pub fn process_response(status: u16, content_type: &str, body: &str) -> String {
    if content_type.contains("html") {
        return process_html_response(status, body);
    }
    format!(
        "Can't process response from server. Status Code: {} Data from server: {}",
        status,
        escape_braces(body)
    )
}

/// Turn a failed response into an `HttpStatus` error
pub async fn classify(response: Response) -> ConnectorError {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let url = response.url().to_string();

    let message = match response.bytes().await {
        Ok(bytes) => match std::str::from_utf8(&bytes) {
            Ok(body) => process_response(status, &content_type, body),
            Err(_) if content_type.contains("html") => {
                format_html_message(status, messages::CANNOT_PARSE_ERROR_DETAILS)
            }
            Err(_) => process_response(status, &content_type, &String::from_utf8_lossy(&bytes)),
        },
        Err(e) => {
            warn!(error = %e, url = %url, "Failed to read error body");
            if content_type.contains("html") {
                format_html_message(status, messages::CANNOT_PARSE_ERROR_DETAILS)
            } else {
                process_response(status, &content_type, "")
            }
        }
    };

    warn!(status, url = %url, "Console returned error status");
    ConnectorError::HttpStatus { status, message }
}

/// Pass a successful response through, classify anything else
pub async fn ensure_success(response: Response) -> Result<Response, ConnectorError> {
    if is_success_status(response.status().as_u16()) {
        Ok(response)
    } else {
        Err(classify(response).await)
    }
}

pub async fn read_json(response: Response) -> Result<Value, ConnectorError> {
    Ok(response.json::<Value>().await?)
}
