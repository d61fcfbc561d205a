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

use core::time::Duration;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use lxd_client::{RawResponse, Transport};
use lxd_client_error::{Code, Error, make_err};
use parking_lot::Mutex;
use serde_json::Value;

/// A request as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) content_type: Option<String>,
    pub(crate) body: Bytes,
}

impl RecordedRequest {
    pub(crate) fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Request body is not JSON")
    }
}

/// Answers requests from a script, in order. Once the script is exhausted
/// the fallback answer (if any) is repeated forever.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<RawResponse>>,
    fallback: Mutex<Option<RawResponse>>,
    delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_json(&self, status: u16, body: &Value) -> &Self {
        self.push_raw(status, &body.to_string())
    }

    pub(crate) fn push_raw(&self, status: u16, body: &str) -> &Self {
        self.script.lock().push_back(raw(status, body));
        self
    }

    pub(crate) fn set_fallback_json(&self, status: u16, body: &Value) {
        *self.fallback.lock() = Some(raw(status, &body.to_string()));
    }

    /// Every answer is held back this long.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn targets(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| format!("{} {}", r.method, r.target))
            .collect()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

fn raw(status: u16, body: &str) -> RawResponse {
    RawResponse::new(
        StatusCode::from_u16(status).expect("Invalid status code"),
        Bytes::from(body.to_string()),
    )
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse, Error> {
        self.requests.lock().push(RecordedRequest {
            method: request.method().clone(),
            target: request.uri().to_string(),
            content_type: request
                .headers()
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            body: request.body().clone(),
        });
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.or_else(|| self.fallback.lock().clone())
            .ok_or_else(|| make_err!(Code::Internal, "No scripted response left"))
    }
}

/// `{"type":"sync",...}` around `metadata`.
pub(crate) fn sync_envelope(metadata: Value) -> Value {
    serde_json::json!({
        "type": "sync",
        "status": "Success",
        "status_code": 200,
        "metadata": metadata,
    })
}

/// What the daemon answers when it starts operation `id`.
pub(crate) fn async_envelope(id: &str) -> Value {
    serde_json::json!({
        "type": "async",
        "status": "Operation created",
        "status_code": 100,
        "operation": format!("/1.0/operations/{id}"),
        "metadata": {
            "id": id,
            "class": "task",
            "status": "Running",
            "status_code": 103,
            "may_cancel": false,
            "err": "",
        },
    })
}

pub(crate) fn error_envelope(code: i64, message: &str) -> Value {
    serde_json::json!({
        "type": "error",
        "error": message,
        "error_code": code,
        "metadata": null,
    })
}

/// An operation as returned by `wait`.
pub(crate) fn operation(id: &str, status: &str, status_code: i64, err: &str, metadata: Value) -> Value {
    sync_envelope(serde_json::json!({
        "id": id,
        "class": "task",
        "status": status,
        "status_code": status_code,
        "metadata": metadata,
        "may_cancel": true,
        "err": err,
    }))
}
