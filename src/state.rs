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

//! Persisted state blob.
//!
//! The host keeps this key/value map between invocations. It is loaded once
//! before the action runs and written once afterwards; keys this crate does
//! not own are carried through verbatim.

use crate::core::errors::ConnectorError;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorState(Map<String, Value>);

impl ConnectorState {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Load state from disk; a missing or empty file is an empty state
    pub fn load(path: &Path) -> Result<Self, ConnectorError> {
        let mut file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "No state file, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConnectorError::State(format!("Cannot open {:?}: {}", path, e)));
            }
        };

        file.lock_shared()
            .map_err(|e| ConnectorError::State(format!("Cannot lock {:?}: {}", path, e)))?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content);
        release(&file, path);
        read.map_err(|e| ConnectorError::State(format!("Cannot read {:?}: {}", path, e)))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let values: Map<String, Value> = serde_json::from_str(&content)
            .map_err(|e| ConnectorError::State(format!("Invalid state in {:?}: {}", path, e)))?;
        Ok(Self(values))
    }

    /// Write state as pretty JSON under an exclusive lock
    pub fn save(&self, path: &Path) -> Result<(), ConnectorError> {
        let serialized = serde_json::to_string_pretty(&self.0)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| ConnectorError::State(format!("Cannot open {:?}: {}", path, e)))?;

        file.lock_exclusive()
            .map_err(|e| ConnectorError::State(format!("Cannot lock {:?}: {}", path, e)))?;
        let written = file
            .set_len(0)
            .and_then(|_| file.write_all(serialized.as_bytes()))
            .and_then(|_| file.sync_all());
        release(&file, path);
        written.map_err(|e| ConnectorError::State(format!("Cannot write {:?}: {}", path, e)))?;

        debug!(path = ?path, keys = self.0.len(), "State saved");
        Ok(())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_string(), Value::from(value));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn release(file: &File, path: &Path) {
    if let Err(e) = file.unlock() {
        debug!(path = ?path, error = %e, "State file unlock failed, released on close");
    }
}
