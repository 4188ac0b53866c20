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

//! Connector constants - single source of truth for fixed strings and limits.
//!
//! Everything the console or the host platform treats as an external contract
//! (status labels, endpoint paths, message templates) lives here.

/// Malop status labels as the host presents them, mapped to console codes.
pub mod status {
    /// "Reopend" is the label the host ships; it is an external contract.
    pub const MALOP_STATUS_MAP: [(&str, &str); 6] = [
        ("Unread", "UNREAD"),
        ("To Review", "TODO"),
        ("Not Relevant", "FP"),
        ("Remediated", "CLOSE"),
        ("Reopend", "REOPEN"),
        ("Under Investigation", "OPEN"),
    ];
}

/// Custom reputation values accepted by `set_reputation`
pub mod reputation {
    pub const WHITELIST: &str = "whitelist";
    pub const BLACKLIST: &str = "blacklist";
    pub const REMOVE: &str = "remove";
}

/// User-facing message templates
pub mod messages {
    pub const ERROR_CODE_MESSAGE: &str = "Error code unavailable";
    pub const ERROR_MESSAGE_UNAVAILABLE: &str =
        "Error message unavailable. Please check the asset configuration and|or action parameters";

    /// Followed by the parameter key
    pub const INVALID_INTEGER_PREFIX: &str = "Please provide a valid integer value in the";
    /// Followed by the parameter key
    pub const INVALID_NON_NEGATIVE_INTEGER_PREFIX: &str =
        "Please provide a valid non-negative integer value in the";

    pub const INVALID_STATUS: &str =
        "Invalid status. Please provide a valid value in the 'status' action parameter";
    pub const INVALID_REPUTATION: &str =
        "Please provide a valid value for the 'custom_reputation' action parameter";

    pub const CANNOT_PARSE_ERROR_DETAILS: &str = "Cannot parse error details";
    pub const CONNECTION_REFUSED: &str = "Error Details: Connection refused from the server";
    pub const LOGIN_CONNECTION_REFUSED: &str = "Error Details: Connection Refused from the Server";
    pub const NO_SESSION_COOKIE: &str =
        "Error when logging in to the the Cybereason console: No session cookie returned";
    pub const LOGIN_UNKNOWN_ERROR: &str =
        "Error when logging in to the Cybereason console: Unknown error";
    pub const LOGIN_SUCCESS: &str = "Successfully logged in to the Cybereason console";
    pub const SESSION_CREATED: &str = "CybereasonSession created";

    pub const CONNECTIVITY_SUCCESS: &str =
        "Successfully connected to the Cybereason console and verified session cookie";
    pub const CONNECTIVITY_FAILED: &str =
        "Connectivity failed. Unable to get session cookie from Cybereason console";

    pub const SENSORS_NOT_MATCHED: &str =
        "Status Code:204. The sensor names are incorrect or the filters are not valid";
    pub const SENSOR_UPGRADE_SUCCESS: &str = "Successfully requested for sensor upgrade";
    pub const SENSOR_RESTART_SUCCESS: &str = "Successfully requested for sensor restart";

    pub const ADD_COMMENT_SUCCESS: &str = "Add malop comment action executed successfully";
    pub const UPDATE_STATUS_SUCCESS: &str = "Update malop status action executed successfully";
    pub const SET_REPUTATION_SUCCESS: &str = "Set reputation action executed successfully";

    pub const MACHINE_DETAILS_FETCHED: &str =
        "Successfully fetched machine details from Cybereason console";
    pub const ISOLATE_SUCCESS: &str = "Successfully requested machine isolation";
    pub const UNISOLATE_SUCCESS: &str = "Successfully requested machine unisolation";
    pub const DELETE_REGISTRY_KEY_SUCCESS: &str = "Successfully requested registry key deletion";
    pub const KILL_PROCESS_SUCCESS: &str = "Successfully requested process kill";
    pub const REMEDIATION_STATUS_SUCCESS: &str = "Successfully fetched remediation status";
    pub const REMEDIATION_UNKNOWN_ERROR: &str = "Unknown error";
    pub const REMEDIATION_NO_ERROR: &str = "No error message";
}

/// Parameter keys quoted in validation messages
pub mod keys {
    pub const MALOP_HISTORICAL_DAYS_KEY: &str =
        "malop_historical_days asset configuration parameter";
    pub const MALWARE_HISTORICAL_DAYS_KEY: &str =
        "malware_historical_days asset configuration parameter";
    pub const CONTAINER_COUNT_KEY: &str = "container_count action parameter";
}

/// REST endpoint paths relative to the asset base URL
pub mod endpoints {
    pub const LOGIN: &str = "/login.html";
    pub const VISUAL_SEARCH: &str = "/rest/visualsearch/query/simple";
    pub const SENSORS_QUERY: &str = "/rest/sensors/query";
    pub const SENSORS_UPGRADE: &str = "/rest/sensors/action/upgrade";
    pub const SENSORS_RESTART: &str = "/rest/sensors/action/restart";
    pub const ISOLATE: &str = "/rest/monitor/global/commands/isolate";
    pub const UNISOLATE: &str = "/rest/monitor/global/commands/un-isolate";
    pub const REMEDIATE: &str = "/rest/remediate";
    pub const REMEDIATE_PROGRESS: &str = "/rest/remediate/progress";
    pub const CRIMES_COMMENT: &str = "/rest/crimes/comment/";
    pub const CRIMES_STATUS: &str = "/rest/crimes/status";
    pub const CRIMES_UNIFIED: &str = "/rest/crimes/unified";
    pub const CLASSIFICATION_UPDATE: &str = "/rest/classification/update";
    pub const MALWARE_QUERY: &str = "/rest/malware/query";
}

/// Session establishment
pub mod session {
    /// Cookie that marks an authenticated console session
    pub const SESSION_COOKIE: &str = "JSESSIONID";
    pub const USER_AGENT: &str = "CybereasonPhantom/2.1.0 (target=unknown)";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
}

/// Result-size limits sent with console queries
pub mod limits {
    pub const MALOP_TOTAL_RESULT_LIMIT: u32 = 1000;
    pub const MALOP_PER_GROUP_LIMIT: u32 = 1200;
    pub const MALOP_PER_FEATURE_LIMIT: u32 = 1200;

    pub const REGISTRY_RESULT_LIMIT: u32 = 100;
    pub const REGISTRY_QUERY_TIMEOUT_MS: u64 = 120_000;
    pub const SENSOR_STATUS_QUERY_TIMEOUT: u64 = 30;

    pub const ENTITY_TOTAL_RESULT_LIMIT: u32 = 1000;
    pub const ENTITY_PER_GROUP_LIMIT: u32 = 100;
    pub const ENTITY_PER_FEATURE_LIMIT: u32 = 100;
    pub const ENTITY_QUERY_TIMEOUT_MS: u64 = 120_000;

    pub const SENSOR_QUERY_LIMIT: u32 = 1000;

    pub const POLL_RESULT_LIMIT: u32 = 10_000;
    pub const POLL_PER_FEATURE_LIMIT: u32 = 100;
    pub const MALWARE_QUERY_LIMIT: u32 = 1000;
}

/// Polling defaults and persisted state keys
pub mod poll {
    pub const DEFAULT_HISTORICAL_DAYS: u64 = 3;
    pub const MILLIS_PER_DAY: i64 = 86_400_000;
    pub const LAST_MALOP_POLL_KEY: &str = "last_malop_poll_ms";
    pub const LAST_MALWARE_POLL_KEY: &str = "last_malware_poll_ms";
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
    pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CYBEREASON_REQUEST_TIMEOUT_SECS";
}
