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

//! JSON wrapper shared by every daemon response, and the JSON encoding of
//! request bodies.

use bytes::Bytes;
use lxd_client_error::{Code, Error, ResultExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded response body. The variant follows the `type` member.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Sync(SyncResponse),
    Async(AsyncResponse),
    Error(ErrorResponse),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SyncResponse {
    pub status: String,
    pub status_code: i64,
    /// Kept opaque until the caller picks the payload type.
    pub metadata: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AsyncResponse {
    pub status: String,
    pub status_code: i64,
    /// Path of the operation, e.g. `/1.0/operations/{id}`.
    pub operation: String,
    pub metadata: Value,
}

impl AsyncResponse {
    /// The operation id: taken from the metadata when present, otherwise the
    /// last segment of `operation`.
    pub fn operation_id(&self) -> Option<&str> {
        if let Some(id) = self.metadata.get("id").and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id);
            }
        }
        self.operation
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: i64,
    pub metadata: Value,
}

/// Decodes a response body. Members the envelope does not know are ignored.
pub fn decode(body: &[u8]) -> Result<Envelope, Error> {
    serde_json::from_slice(body)
        .err_tip_with_code(|_| (Code::Decode, "While decoding the daemon's response envelope"))
}

/// Decodes opaque `metadata` into the payload type the caller asked for.
pub fn project<T: DeserializeOwned>(metadata: Value) -> Result<T, Error> {
    serde_json::from_value(metadata).err_tip_with_code(|_| {
        (
            Code::Decode,
            format!(
                "While decoding response metadata as {}",
                core::any::type_name::<T>()
            ),
        )
    })
}

/// Encodes a request body.
pub fn encode<T: Serialize + ?Sized>(body: &T) -> Result<Bytes, Error> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .err_tip_with_code(|_| (Code::InvalidArgument, "While encoding the request body"))
}
