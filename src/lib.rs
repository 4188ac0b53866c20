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

//! cybereason-connector: orchestration actions against the Cybereason EDR console.
//!
//! The host platform hands the connector an action identifier, the asset
//! configuration and one or more parameter sets. Each invocation logs in to
//! the console, issues the REST calls for that action and reports a status
//! plus zero or more result records.

pub mod actions;
pub mod client;
pub mod config;
pub mod core;
pub mod poller;
pub mod state;
pub mod utils;
