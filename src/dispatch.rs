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

use http::StatusCode;
use lxd_client_error::{Code, Error, make_err};
use serde::de::DeserializeOwned;

use crate::api::{AsyncOperation, Operation};
use crate::envelope::{self, Envelope};
use crate::transport::RawResponse;

/// A daemon response paired with the status codes its request accepted.
/// Each `parse_*` consumes it and yields exactly one outcome.
#[derive(Debug, Clone)]
pub struct Response {
    raw: RawResponse,
    expected: Vec<u16>,
}

impl Response {
    pub const fn new(raw: RawResponse, expected: Vec<u16>) -> Self {
        Self { raw, expected }
    }

    pub const fn status(&self) -> StatusCode {
        self.raw.status
    }

    pub const fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// Checks the status against the expected set and decodes the body.
    /// Error envelopes never reach the caller as a value.
    fn into_envelope(self) -> Result<(u16, Envelope), Error> {
        let status = self.raw.status.as_u16();
        if self.is_bare_error() || !self.expected.contains(&status) {
            return Err(self.unexpected());
        }
        match envelope::decode(&self.raw.body)? {
            Envelope::Error(err) => Err(Error::api(status, err.error_code, &err.error)),
            envelope => Ok((status, envelope)),
        }
    }

    /// An error status with nothing in the body.
    fn is_bare_error(&self) -> bool {
        let status = self.raw.status;
        (status.is_client_error() || status.is_server_error())
            && self.raw.body.trim_ascii().is_empty()
    }

    /// The error for a bare error status or a status outside the expected
    /// set. A bare error status counts as an `Api` error whose code is the
    /// HTTP status; any other body without an error envelope is
    /// `UnexpectedStatus`.
    fn unexpected(&self) -> Error {
        let status = self.raw.status;
        if let Ok(Envelope::Error(err)) = envelope::decode(&self.raw.body) {
            return Error::api(status.as_u16(), err.error_code, &err.error);
        }
        if self.is_bare_error() {
            return Error::api(
                status.as_u16(),
                i64::from(status.as_u16()),
                status.canonical_reason().unwrap_or("No response body"),
            );
        }
        Error::unexpected_status(status.as_u16(), &String::from_utf8_lossy(&self.raw.body))
    }

    /// Projects the metadata of a `sync` envelope into `T`.
    pub fn parse_sync<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self.into_envelope()? {
            (_, Envelope::Sync(sync)) => envelope::project(sync.metadata),
            (status, Envelope::Async(response)) => Err(wrong_variant(
                status,
                &format!(
                    "Expected a sync response, the daemon started operation {}",
                    response.operation
                ),
            )),
            (status, Envelope::Error(_)) => Err(wrong_variant(status, "Unexpected error envelope")),
        }
    }

    /// Like `parse_sync`, but a 404 error envelope becomes `None`. Only
    /// meaningful when 404 is part of the expected set.
    pub fn parse_optional<T: DeserializeOwned>(self) -> Result<Option<T>, Error> {
        match self.parse_sync() {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Accepts a `sync` envelope and discards its metadata.
    pub fn parse_empty(self) -> Result<(), Error> {
        match self.into_envelope()? {
            (_, Envelope::Sync(_)) => Ok(()),
            (status, _) => Err(wrong_variant(status, "Expected a sync response")),
        }
    }

    /// Turns an `async` envelope into a handle on the started operation.
    pub fn parse_async(self) -> Result<AsyncOperation, Error> {
        let response = match self.into_envelope()? {
            (_, Envelope::Async(response)) => response,
            (status, _) => {
                return Err(wrong_variant(
                    status,
                    "Expected an async response, got a sync one",
                ));
            }
        };
        let id = response
            .operation_id()
            .ok_or_else(|| {
                make_err!(
                    Code::Decode,
                    "Async response carries no operation id: '{}'",
                    response.operation
                )
            })?
            .to_string();
        let mut operation: Operation = if response.metadata.is_null() {
            Operation::default()
        } else {
            envelope::project(response.metadata)?
        };
        if operation.id.is_empty() {
            operation.id.clone_from(&id);
        }
        Ok(AsyncOperation {
            id,
            location: response.operation,
            operation,
        })
    }
}

fn wrong_variant(status: u16, message: &str) -> Error {
    Error {
        http_status: Some(status),
        ..make_err!(Code::UnexpectedStatus, "{message}")
    }
}
