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

use super::{ActionContext, HandlerOutcome};
use crate::core::constants::messages;
use crate::core::errors::ConnectorError;
use crate::core::models::{ActionParams, ActionResult};
use tracing::debug;

/// Log in and confirm the console handed out a session cookie
pub async fn test_connectivity(
    ctx: &mut ActionContext,
    _params: &ActionParams,
    _result: &mut ActionResult,
) -> HandlerOutcome {
    match ctx.login().await {
        Ok(session) if !session.session_cookie().is_empty() => {
            ctx.save_progress(messages::CONNECTIVITY_SUCCESS);
            Ok(messages::CONNECTIVITY_SUCCESS.to_string())
        }
        Ok(_) | Err(_) => {
            debug!("Failure to verify session cookie");
            Err(ConnectorError::Authentication(
                messages::CONNECTIVITY_FAILED.to_string(),
            ))
        }
    }
}
