// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status codes the daemon uses for operations.
pub mod status_code {
    pub const CREATED: i64 = 100;
    pub const STARTED: i64 = 101;
    pub const STOPPED: i64 = 102;
    pub const RUNNING: i64 = 103;
    pub const CANCELLING: i64 = 104;
    pub const PENDING: i64 = 105;
    pub const SUCCESS: i64 = 200;
    pub const FAILURE: i64 = 400;
    pub const CANCELLED: i64 = 401;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationClass {
    #[default]
    Task,
    Websocket,
    Token,
}

/// A daemon-side long running task, as returned by
/// `GET /1.0/operations/{id}` and its `wait` variant.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Operation {
    pub id: String,
    pub class: OperationClass,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
    pub status_code: i64,
    /// Affected objects by kind, e.g. `containers` → URLs.
    pub resources: Option<HashMap<String, Vec<String>>>,
    pub metadata: Option<Value>,
    pub may_cancel: bool,
    pub err: String,
}

impl Operation {
    pub const fn state(&self) -> OperationState {
        OperationState::from_status_code(self.status_code)
    }
}

/// Where an operation is in its lifecycle. Everything but `Running` is
/// terminal and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    Running,
    Success,
    Failure,
    Cancelled,
}

impl OperationState {
    pub const fn from_status_code(code: i64) -> Self {
        match code {
            status_code::SUCCESS => Self::Success,
            status_code::FAILURE => Self::Failure,
            status_code::CANCELLED => Self::Cancelled,
            _ => Self::Running,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Handle returned by every endpoint that answers with an `async` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncOperation {
    /// Operation identifier, usable with the `/1.0/operations/{id}` family.
    pub id: String,
    /// The `operation` field of the envelope, e.g. `/1.0/operations/{id}`.
    pub location: String,
    /// The operation as it was when the daemon accepted the request.
    pub operation: Operation,
}
