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

//! Scheduled ingestion of malops and malware detections.
//!
//! Each stream keeps its own checkpoint (epoch milliseconds) in the persisted
//! state. Without a checkpoint the window opens `<stream>_historical_days`
//! before now. Checkpoints only advance after a successful scheduled poll;
//! manual polls leave them alone. When a stream is cut short, either by
//! `container_count` or because the console matched more than it returned,
//! its checkpoint stops just before the oldest entry that was not emitted.

use crate::actions::{ActionContext, HandlerOutcome};
use crate::client::visual_search::{self, element_values, first_simple_string};
use crate::core::constants::{endpoints, keys, limits, poll};
use crate::core::errors::ConnectorError;
use crate::core::models::{value_to_string, ActionParams, ActionResult, Artifact, Container};
use crate::core::validation::validate_integer;
use crate::utils::time::{millis_to_rfc3339, now_millis};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

const CONTAINER_LABEL: &str = "events";
const DEFAULT_SEVERITY: &str = "medium";

/// Start of a stream's window: its checkpoint, else `now - days`
pub fn window_start(checkpoint: Option<i64>, now: i64, days: u64) -> i64 {
    checkpoint.unwrap_or_else(|| {
        let span = i64::try_from(days)
            .unwrap_or(i64::MAX)
            .saturating_mul(poll::MILLIS_PER_DAY);
        now.saturating_sub(span)
    })
}

pub fn malop_query(start: i64) -> Value {
    json!({
        "totalResultLimit": limits::POLL_RESULT_LIMIT,
        "perGroupLimit": limits::POLL_RESULT_LIMIT,
        "perFeatureLimit": limits::POLL_PER_FEATURE_LIMIT,
        "templateContext": "OVERVIEW",
        "queryPath": [{
            "requestedType": "MalopProcess",
            "result": true,
            "filters": [
                {"facetName": "malopLastUpdateTime", "values": [start], "filterType": "GreaterThan"}
            ]
        }]
    })
}

pub fn malware_query(start: i64) -> Value {
    json!({
        "filters": [{"fieldName": "timestamp", "operator": "GreaterThan", "values": [start]}],
        "sortingFieldName": "timestamp",
        "sortDirection": "ASC",
        "limit": limits::MALWARE_QUERY_LIMIT,
        "offset": 0
    })
}

fn severity_from_priority(priority: Option<&str>) -> String {
    match priority.map(str::to_ascii_uppercase).as_deref() {
        Some("HIGH") => "high",
        Some("LOW") => "low",
        _ => DEFAULT_SEVERITY,
    }
    .to_string()
}

fn millis_of(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn related_artifacts(
    malop: &Value,
    malop_id: &str,
    field: &str,
    name: &str,
    label: &str,
    cef_name_key: &str,
    cef_id_key: &str,
) -> Vec<Artifact> {
    element_values(malop, field)
        .iter()
        .filter_map(|element| {
            let guid = element.get("guid").and_then(value_to_string)?;
            let mut cef = Map::new();
            if let Some(display) = element.get("name").and_then(value_to_string) {
                cef.insert(cef_name_key.to_string(), Value::String(display));
            }
            cef.insert(cef_id_key.to_string(), Value::String(guid.clone()));
            cef.insert("malopId".to_string(), Value::String(malop_id.to_string()));
            Some(Artifact {
                name: name.to_string(),
                label: label.to_string(),
                source_data_identifier: format!("{}-{}", malop_id, guid),
                cef,
            })
        })
        .collect()
}

/// Containers of one stream, oldest update first
#[derive(Debug, Clone, Default)]
pub struct Feed {
    items: Vec<(Option<i64>, Container)>,
    /// Console matched more entries than it returned
    more_on_console: bool,
}

impl Feed {
    pub fn new(mut items: Vec<(Option<i64>, Container)>, more_on_console: bool) -> Self {
        items.sort_by_key(|(updated, _)| *updated);
        Self { items, more_on_console }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checkpoint once the first `emitted` entries are ingested; `None` keeps
    /// the previous one.
    ///
    /// A complete stream moves to `now`. A cut stream moves to its newest
    /// emitted update time, but never past the entry right after the cut.
    pub fn checkpoint(&self, emitted: usize, now: i64) -> Option<i64> {
        let boundary = match self.items.get(emitted) {
            Some((updated, _)) => *updated,
            None if self.more_on_console => self.items.last().and_then(|(updated, _)| *updated),
            None => return Some(now),
        }?;
        let newest = self.items[..emitted.min(self.items.len())]
            .iter()
            .filter_map(|(updated, _)| *updated)
            .max()?;
        Some(newest.min(boundary.saturating_sub(1)))
    }

    pub fn into_containers(self, emitted: usize) -> impl Iterator<Item = Container> {
        self.items.into_iter().take(emitted).map(|(_, container)| container)
    }
}

/// `data.totalResults` above the number of returned entries
fn console_has_more(body: &Value, returned: usize) -> bool {
    body.get("data")
        .and_then(|data| data.get("totalResults"))
        .and_then(Value::as_u64)
        .is_some_and(|total| total > returned as u64)
}

/// One container per malop, with machine and suspect process artifacts
pub fn malop_feed(body: &Value) -> Result<Feed, ConnectorError> {
    let elements = visual_search::result_elements(body)?;
    let mut items = Vec::with_capacity(elements.len());
    for (guid, malop) in elements {
        let detection = first_simple_string(malop, "detectionType");
        let name = first_simple_string(malop, "displayName")
            .or_else(|| first_simple_string(malop, "elementDisplayName"))
            .unwrap_or_else(|| guid.clone());

        let mut artifacts = related_artifacts(
            malop,
            guid,
            "affectedMachines",
            "Machine Artifact",
            "machine",
            "sourceHostName",
            "machineId",
        );
        artifacts.extend(related_artifacts(
            malop,
            guid,
            "suspects",
            "Process Artifact",
            "process",
            "processName",
            "processId",
        ));

        let updated = millis_of(visual_search::first_simple_value(malop, "malopLastUpdateTime"));
        items.push((updated, Container {
            name,
            label: CONTAINER_LABEL.to_string(),
            description: format!(
                "Cybereason malop ({})",
                detection.as_deref().unwrap_or("unknown detection type")
            ),
            severity: severity_from_priority(first_simple_string(malop, "malopPriority").as_deref()),
            source_data_identifier: guid.clone(),
            start_time: millis_of(visual_search::first_simple_value(malop, "creationTime"))
                .and_then(millis_to_rfc3339),
            artifacts,
        }));
    }
    Ok(Feed::new(items, console_has_more(body, elements.len())))
}

/// One container per malware detection, carrying a single artifact
pub fn malware_feed(body: &Value) -> Result<Feed, ConnectorError> {
    let malwares = body
        .get("data")
        .and_then(|data| data.get("malwares"))
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectorError::Decode("Response has no 'data.malwares'".to_string()))?;

    let mut items = Vec::with_capacity(malwares.len());
    for malware in malwares {
        let Some(guid) = malware.get("guid").and_then(value_to_string) else {
            warn!("Skipping malware entry without guid");
            continue;
        };
        let name = malware
            .get("name")
            .and_then(value_to_string)
            .unwrap_or_else(|| guid.clone());

        let mut cef = Map::new();
        for (source, target) in [
            ("name", "fileName"),
            ("machineName", "sourceHostName"),
            ("type", "malwareType"),
            ("elementType", "elementType"),
            ("status", "status"),
            ("needsAttention", "needsAttention"),
            ("timestamp", "detectionTime"),
        ] {
            if let Some(value) = malware.get(source).filter(|v| !v.is_null()) {
                cef.insert(target.to_string(), value.clone());
            }
        }
        cef.insert("malwareId".to_string(), Value::String(guid.clone()));

        let updated = millis_of(malware.get("timestamp"));
        items.push((updated, Container {
            name: format!("Malware: {}", name),
            label: CONTAINER_LABEL.to_string(),
            description: format!(
                "Cybereason malware detection ({})",
                malware.get("type").and_then(value_to_string).unwrap_or_else(|| "unknown".to_string())
            ),
            severity: DEFAULT_SEVERITY.to_string(),
            source_data_identifier: guid.clone(),
            start_time: millis_of(malware.get("timestamp")).and_then(millis_to_rfc3339),
            artifacts: vec![Artifact {
                name: "Malware Artifact".to_string(),
                label: "malware".to_string(),
                source_data_identifier: guid,
                cef,
            }],
        }));
    }
    Ok(Feed::new(items, console_has_more(body, malwares.len())))
}

fn advance_checkpoint(ctx: &mut ActionContext, key: &str, checkpoint: Option<i64>) {
    match checkpoint {
        Some(millis) => ctx.state.set_i64(key, millis),
        None => {
            warn!(key, "No entry emitted from a cut stream, checkpoint kept");
            ctx.save_progress(format!("Checkpoint {} kept", key));
        }
    }
}

/// `on_poll`: pull malops and malware updated since the last checkpoint
pub async fn on_poll(
    ctx: &mut ActionContext,
    params: &ActionParams,
    result: &mut ActionResult,
) -> HandlerOutcome {
    ctx.save_progress("Entered the on_poll function");

    let malop_days = validate_integer(
        ctx.asset.malop_historical_days.as_ref(),
        keys::MALOP_HISTORICAL_DAYS_KEY,
    )?
    .unwrap_or(poll::DEFAULT_HISTORICAL_DAYS);
    let malware_days = validate_integer(
        ctx.asset.malware_historical_days.as_ref(),
        keys::MALWARE_HISTORICAL_DAYS_KEY,
    )?
    .unwrap_or(poll::DEFAULT_HISTORICAL_DAYS);
    let container_limit = validate_integer(params.raw("container_count"), keys::CONTAINER_COUNT_KEY)?
        .filter(|count| *count > 0)
        .map(|count| usize::try_from(count).unwrap_or(usize::MAX));
    let poll_now = params.optional_bool("poll_now");

    let now = now_millis();
    let malop_start = window_start(ctx.state.get_i64(poll::LAST_MALOP_POLL_KEY), now, malop_days);
    let malware_start =
        window_start(ctx.state.get_i64(poll::LAST_MALWARE_POLL_KEY), now, malware_days);

    let session = ctx.login().await?;

    ctx.save_progress(format!("Fetching malops updated after {}", malop_start));
    let malop_body = session
        .query(endpoints::CRIMES_UNIFIED, &malop_query(malop_start))
        .await?;
    let malops = malop_feed(&malop_body)?;

    ctx.save_progress(format!("Fetching malware detected after {}", malware_start));
    let malware_body = session
        .query(endpoints::MALWARE_QUERY, &malware_query(malware_start))
        .await?;
    let malware = malware_feed(&malware_body)?;

    let (malop_count, malware_count) = (malops.len(), malware.len());
    let limit = container_limit.unwrap_or(usize::MAX);
    let malops_emitted = malop_count.min(limit);
    let malware_emitted = malware_count.min(limit - malops_emitted);
    let emitted = malops_emitted + malware_emitted;

    if poll_now {
        ctx.save_progress("Manual poll, checkpoints unchanged");
    } else {
        let malop_checkpoint = malops.checkpoint(malops_emitted, now);
        let malware_checkpoint = malware.checkpoint(malware_emitted, now);
        advance_checkpoint(ctx, poll::LAST_MALOP_POLL_KEY, malop_checkpoint);
        advance_checkpoint(ctx, poll::LAST_MALWARE_POLL_KEY, malware_checkpoint);
    }

    ctx.containers.extend(malops.into_containers(malops_emitted));
    ctx.containers.extend(malware.into_containers(malware_emitted));

    result.update_summary(json!({
        "malops": malop_count,
        "malware": malware_count,
        "containers": emitted,
    }));
    info!(malops = malop_count, malware = malware_count, containers = emitted, poll_now, "Poll completed");
    Ok(format!("Ingested {} container(s)", emitted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_prefers_checkpoint() {
        assert_eq!(window_start(Some(42), 1_000_000_000, 3), 42);
        assert_eq!(
            window_start(None, 1_000_000_000, 3),
            1_000_000_000 - 3 * poll::MILLIS_PER_DAY
        );
        assert_eq!(window_start(None, 0, u64::MAX), -i64::MAX);
    }

    #[test]
    fn test_malop_query_filters_on_update_time() {
        let query = malop_query(1234);
        let filter = &query["queryPath"][0]["filters"][0];
        assert_eq!(filter["facetName"], "malopLastUpdateTime");
        assert_eq!(filter["filterType"], "GreaterThan");
        assert_eq!(filter["values"], json!([1234]));
        assert_eq!(query["templateContext"], "OVERVIEW");
    }

    #[test]
    fn test_malop_container_with_artifacts() {
        let body = json!({"data": {"resultIdToElementDataMap": {
            "11.22": {
                "simpleValues": {
                    "displayName": {"values": ["mimikatz.exe"]},
                    "detectionType": {"values": ["CREDENTIAL_THEFT"]},
                    "malopPriority": {"values": ["HIGH"]},
                    "creationTime": {"values": ["0"]}
                },
                "elementValues": {
                    "affectedMachines": {"elementValues": [{"guid": "m1", "name": "HOST1"}]},
                    "suspects": {"elementValues": [{"guid": "p1", "name": "mimikatz.exe"}]}
                }
            }
        }}});

        let containers: Vec<_> = malop_feed(&body).unwrap().into_containers(usize::MAX).collect();
        assert_eq!(containers.len(), 1);
        let container = &containers[0];
        assert_eq!(container.name, "mimikatz.exe");
        assert_eq!(container.severity, "high");
        assert_eq!(container.source_data_identifier, "11.22");
        assert_eq!(container.start_time.as_deref(), Some("1970-01-01T00:00:00+00:00"));
        assert_eq!(container.artifacts.len(), 2);
        assert_eq!(container.artifacts[0].cef["sourceHostName"], "HOST1");
        assert_eq!(container.artifacts[0].source_data_identifier, "11.22-m1");
        assert_eq!(container.artifacts[1].cef["processId"], "p1");
    }

    #[test]
    fn test_malware_containers() {
        let body = json!({"data": {"malwares": [
            {"guid": "w1", "name": "bad.exe", "type": "KnownMalware", "machineName": "host1", "timestamp": 1000},
            {"name": "no-guid.exe"}
        ]}});
        let containers: Vec<_> = malware_feed(&body).unwrap().into_containers(usize::MAX).collect();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "Malware: bad.exe");
        assert_eq!(containers[0].artifacts[0].cef["sourceHostName"], "host1");
        assert_eq!(containers[0].artifacts[0].cef["malwareId"], "w1");
    }

    #[test]
    fn test_malware_response_shape_checked() {
        let err = malware_feed(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, ConnectorError::Decode(_)));
    }

    fn feed(times: &[i64], more_on_console: bool) -> Feed {
        let items = times
            .iter()
            .map(|t| {
                let container = Container {
                    name: t.to_string(),
                    label: CONTAINER_LABEL.to_string(),
                    description: String::new(),
                    severity: DEFAULT_SEVERITY.to_string(),
                    source_data_identifier: t.to_string(),
                    start_time: None,
                    artifacts: Vec::new(),
                };
                (Some(*t), container)
            })
            .collect();
        Feed::new(items, more_on_console)
    }

    #[test]
    fn test_feed_orders_oldest_first() {
        let names: Vec<_> = feed(&[300, 100, 200], false)
            .into_containers(2)
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["100", "200"]);
    }

    #[test]
    fn test_complete_feed_checkpoints_at_now() {
        assert_eq!(feed(&[100, 200], false).checkpoint(2, 9_000), Some(9_000));
        assert_eq!(feed(&[], false).checkpoint(0, 9_000), Some(9_000));
        assert!(feed(&[], false).is_empty());
    }

    #[test]
    fn test_capped_feed_stops_at_newest_emitted() {
        assert_eq!(feed(&[300, 100, 200], false).checkpoint(1, 9_000), Some(100));
    }

    #[test]
    fn test_capped_feed_never_passes_equal_timestamps() {
        // the dropped entry shares the emitted entry's time
        assert_eq!(feed(&[100, 100, 200], false).checkpoint(1, 9_000), Some(99));
    }

    #[test]
    fn test_console_truncation_refetches_boundary() {
        assert_eq!(feed(&[100, 200], true).checkpoint(2, 9_000), Some(199));
    }

    #[test]
    fn test_nothing_emitted_from_cut_feed_keeps_checkpoint() {
        assert_eq!(feed(&[100, 200], false).checkpoint(0, 9_000), None);
    }

    #[test]
    fn test_console_total_compared_with_returned_entries() {
        let body = json!({"data": {"malwares": [
            {"guid": "w1", "timestamp": 1000}
        ], "totalResults": 5}});
        assert_eq!(malware_feed(&body).unwrap().checkpoint(1, 9_000), Some(999));
    }
}
