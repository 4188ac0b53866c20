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

use cybereason_connector::client::is_success_status;
use cybereason_connector::client::response::process_response;
use cybereason_connector::core::validation::{escape_braces, split_sensor_ids, validate_integer};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn test_integer_strings_round_trip(n in 0u64..=i64::MAX as u64) {
        let value = json!(n.to_string());
        prop_assert_eq!(validate_integer(Some(&value), "count").unwrap(), Some(n));
    }

    #[test]
    fn test_negative_integers_rejected_with_key(n in i64::MIN..0i64) {
        let err = validate_integer(Some(&json!(n)), "container_count action parameter").unwrap_err();
        let message = err.to_string();
        prop_assert!(message.contains("non-negative"));
        prop_assert!(message.ends_with("container_count action parameter"));
    }

    #[test]
    fn test_fractions_rejected(whole in 0u32..10_000, frac in 1u32..1000) {
        let value = json!(format!("{}.{:03}", whole, frac));
        let err = validate_integer(Some(&value), "days").unwrap_err();
        prop_assert_eq!(err.to_string(), "Please provide a valid integer value in the days");
    }

    #[test]
    fn test_split_ids_are_trimmed(ids in prop::collection::vec("[A-Za-z0-9:.-]{1,12}", 2..6)) {
        let input = ids.iter().map(|id| format!("  {} ", id)).collect::<Vec<_>>().join(",");
        prop_assert_eq!(split_sensor_ids(&input), ids);
    }

    #[test]
    fn test_escaped_text_has_no_lone_braces(text in "\\PC*") {
        let escaped = escape_braces(&text);
        prop_assert_eq!(escaped.matches('{').count(), 2 * text.matches('{').count());
        prop_assert_eq!(escaped.matches('}').count(), 2 * text.matches('}').count());
    }

    #[test]
    fn test_non_html_failures_keep_status(status in 399u16..600, body in "[a-z ]{0,40}") {
        prop_assert!(!is_success_status(status));
        let message = process_response(status, "application/json", &body);
        let expected = format!(
            "Can't process response from server. Status Code: {} Data from server: {}",
            status, body
        );
        prop_assert_eq!(message, expected);
    }
}
