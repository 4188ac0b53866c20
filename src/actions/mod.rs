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

//! Action dispatch.
//!
//! An invocation resolves its identifier to an [`ActionKind`] through a
//! static table, builds one [`ActionContext`] and runs the matching handler
//! once per parameter set. Handlers return the success message or a
//! [`ConnectorError`]; [`dispatch`] turns either into the final status.

pub mod connectivity;
pub mod isolation;
pub mod malop;
pub mod query;
pub mod remediation;
pub mod sensors;

use crate::client::CybereasonSession;
use crate::config::{AssetConfig, RuntimeConfig};
use crate::core::errors::ConnectorError;
use crate::core::models::{
    ActionOutcome, ActionParams, ActionRequest, ActionResult, Container, ProgressLog,
};
use crate::poller;
use crate::state::ConnectorState;
use std::time::Duration;
use tracing::{error, info, info_span, Instrument};

/// What a handler reports: success message or failure
pub type HandlerOutcome = Result<String, ConnectorError>;

/// Per-invocation context, created once and handed to every handler
pub struct ActionContext {
    pub asset: AssetConfig,
    pub request_timeout: Duration,
    pub progress: ProgressLog,
    pub state: ConnectorState,
    /// Containers emitted by polling
    pub containers: Vec<Container>,
}

impl ActionContext {
    pub fn new(asset: AssetConfig, runtime: &RuntimeConfig, state: ConnectorState) -> Self {
        Self {
            asset,
            request_timeout: runtime.request_timeout(),
            progress: ProgressLog::default(),
            state,
            containers: Vec::new(),
        }
    }

    pub fn save_progress(&mut self, message: impl Into<String>) {
        self.progress.save_progress(message);
    }

    /// Open a fresh console session for this invocation
    pub async fn login(&mut self) -> Result<CybereasonSession, ConnectorError> {
        CybereasonSession::login(&self.asset, self.request_timeout, &mut self.progress).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    TestConnectivity,
    DeleteRegistryKey,
    GetSensorStatus,
    OnPoll,
    AddMalopComment,
    UpdateMalopStatus,
    IsolateMachine,
    UnisolateMachine,
    IsolateSpecificMachine,
    UnisolateSpecificMachine,
    KillProcess,
    GetRemediationStatus,
    SetReputation,
    UpgradeSensor,
    RestartSensor,
    QueryProcesses,
    QueryMachine,
    QueryMachineIp,
    QueryUsers,
    QueryFiles,
    QueryDomain,
    QueryConnections,
}

const ACTION_TABLE: [(&str, ActionKind); 22] = [
    ("test_connectivity", ActionKind::TestConnectivity),
    ("delete_registry_key", ActionKind::DeleteRegistryKey),
    ("get_sensor_status", ActionKind::GetSensorStatus),
    ("on_poll", ActionKind::OnPoll),
    ("add_malop_comment", ActionKind::AddMalopComment),
    ("update_malop_status", ActionKind::UpdateMalopStatus),
    ("isolate_machine", ActionKind::IsolateMachine),
    ("unisolate_machine", ActionKind::UnisolateMachine),
    ("isolate_specific_machine", ActionKind::IsolateSpecificMachine),
    ("unisolate_specific_machine", ActionKind::UnisolateSpecificMachine),
    ("kill_process", ActionKind::KillProcess),
    ("get_remediation_status", ActionKind::GetRemediationStatus),
    ("set_reputation", ActionKind::SetReputation),
    ("upgrade_sensor", ActionKind::UpgradeSensor),
    ("restart_sensor", ActionKind::RestartSensor),
    ("query_processes", ActionKind::QueryProcesses),
    ("query_machine", ActionKind::QueryMachine),
    ("query_machine_ip", ActionKind::QueryMachineIp),
    ("query_users", ActionKind::QueryUsers),
    ("query_files", ActionKind::QueryFiles),
    ("query_domain", ActionKind::QueryDomain),
    ("query_connections", ActionKind::QueryConnections),
];

impl ActionKind {
    pub fn from_identifier(identifier: &str) -> Result<Self, ConnectorError> {
        ACTION_TABLE
            .iter()
            .find(|(id, _)| *id == identifier)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ConnectorError::UnknownAction(identifier.to_string()))
    }

    pub fn identifier(self) -> &'static str {
        ACTION_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(id, _)| *id)
            .unwrap_or("unknown")
    }

    pub fn all() -> impl Iterator<Item = ActionKind> {
        ACTION_TABLE.iter().map(|(_, kind)| *kind)
    }
}

/// Run one handler for one parameter set and record its terminal status
pub async fn dispatch(ctx: &mut ActionContext, kind: ActionKind, params: &ActionParams) -> ActionResult {
    ctx.save_progress(format!("In action handler for: {}", kind.identifier()));
    let mut result = ActionResult::new(params);

    let outcome = {
        let result = &mut result;
        match kind {
            ActionKind::TestConnectivity => connectivity::test_connectivity(ctx, params, result).await,
            ActionKind::DeleteRegistryKey => remediation::delete_registry_key(ctx, params, result).await,
            ActionKind::GetSensorStatus => malop::get_sensor_status(ctx, params, result).await,
            ActionKind::OnPoll => poller::on_poll(ctx, params, result).await,
            ActionKind::AddMalopComment => malop::add_malop_comment(ctx, params, result).await,
            ActionKind::UpdateMalopStatus => malop::update_malop_status(ctx, params, result).await,
            ActionKind::IsolateMachine => isolation::isolate_machine(ctx, params, result).await,
            ActionKind::UnisolateMachine => isolation::unisolate_machine(ctx, params, result).await,
            ActionKind::IsolateSpecificMachine => {
                isolation::isolate_specific_machine(ctx, params, result).await
            }
            ActionKind::UnisolateSpecificMachine => {
                isolation::unisolate_specific_machine(ctx, params, result).await
            }
            ActionKind::KillProcess => remediation::kill_process(ctx, params, result).await,
            ActionKind::GetRemediationStatus => {
                remediation::get_remediation_status(ctx, params, result).await
            }
            ActionKind::SetReputation => malop::set_reputation(ctx, params, result).await,
            ActionKind::UpgradeSensor => sensors::upgrade_sensor(ctx, params, result).await,
            ActionKind::RestartSensor => sensors::restart_sensor(ctx, params, result).await,
            ActionKind::QueryProcesses => query::query_processes(ctx, params, result).await,
            ActionKind::QueryMachine => query::query_machine(ctx, params, result).await,
            ActionKind::QueryMachineIp => query::query_machine_ip(ctx, params, result).await,
            ActionKind::QueryUsers => query::query_users(ctx, params, result).await,
            ActionKind::QueryFiles => query::query_files(ctx, params, result).await,
            ActionKind::QueryDomain => query::query_domain(ctx, params, result).await,
            ActionKind::QueryConnections => query::query_connections(ctx, params, result).await,
        }
    };

    match outcome {
        Ok(message) => {
            info!(action = kind.identifier(), records = result.data.len(), "Action succeeded");
            result.set_success(message);
        }
        Err(e) => {
            error!(action = kind.identifier(), kind = e.kind(), error = %e, "Action failed");
            result.set_error(e.status_message());
        }
    }
    result
}

/// Run a whole invocation: resolve the action, then every parameter set in order
pub async fn execute(
    request: &ActionRequest,
    asset: AssetConfig,
    runtime: &RuntimeConfig,
    state: ConnectorState,
) -> Result<ActionOutcome, ConnectorError> {
    let kind = ActionKind::from_identifier(&request.identifier)?;
    let mut ctx = ActionContext::new(asset, runtime, state);

    let default_params = [ActionParams::default()];
    let param_sets: &[ActionParams] = if request.parameters.is_empty() {
        &default_params
    } else {
        &request.parameters
    };

    let mut results = Vec::with_capacity(param_sets.len());
    for params in param_sets {
        let span = info_span!("action", action = kind.identifier());
        results.push(dispatch(&mut ctx, kind, params).instrument(span).await);
    }

    Ok(ActionOutcome {
        action: kind.identifier().to_string(),
        results,
        containers: ctx.containers,
        progress: ctx.progress.into_messages(),
        state: ctx.state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_round_trips_through_table() {
        for kind in ActionKind::all() {
            assert_eq!(ActionKind::from_identifier(kind.identifier()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        let err = ActionKind::from_identifier("format_disk").unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownAction(ref id) if id == "format_disk"));
    }

    #[test]
    fn test_table_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for (id, kind) in ACTION_TABLE {
            assert!(seen.insert(id), "duplicate identifier {}", id);
            assert_eq!(kind.identifier(), id);
        }
    }
}
