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

//! Follows a daemon operation until it reaches a terminal state.
//!
//! Every step is a `GET /1.0/operations/{id}/wait?timeout=N` that the daemon
//! holds open for up to `N` seconds. A non-terminal answer is simply
//! reissued; nothing is retried on error.

use core::time::Duration;

use lxd_client_error::{Error, ResultExt, error_if};
use serde_json::Value;
use tracing::{debug, trace};

use crate::api::{Operation, OperationState};
use crate::context::RequestContext;
use crate::request::Request;

/// Shortest hold time asked of the daemon. `timeout=0` answers at once and
/// turns the loop into a busy poll.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

const fn clamp_poll_interval(poll_interval: Duration) -> Duration {
    if poll_interval.as_secs() == 0 {
        MIN_POLL_INTERVAL
    } else {
        poll_interval
    }
}

/// Polls one operation on behalf of a caller.
#[derive(Debug)]
pub struct OperationFollower<'a> {
    ctx: &'a RequestContext,
    id: String,
    poll_interval: Duration,
}

impl<'a> OperationFollower<'a> {
    pub fn new(ctx: &'a RequestContext, id: impl Into<String>) -> Self {
        Self {
            ctx,
            id: id.into(),
            poll_interval: clamp_poll_interval(ctx.config().operation_poll_interval()),
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = clamp_poll_interval(poll_interval);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// One `wait` round trip. The HTTP deadline covers the time the daemon
    /// is allowed to hold the request on top of the usual request timeout.
    pub async fn poll_once(&self) -> Result<Operation, Error> {
        let request = Request::get(format!("operations/{}/wait", self.id))
            .query("timeout", self.poll_interval.as_secs())
            .build();
        let deadline = self
            .ctx
            .config()
            .request_timeout()
            .saturating_add(self.poll_interval);
        self.ctx
            .execute_with_timeout(request, deadline)
            .await?
            .parse_sync()
            .err_tip(|| format!("While waiting on operation {}", self.id))
    }

    /// Waits for the terminal state and returns the operation as last seen.
    /// `Failure` and `Cancelled` surface as `OperationFailed`.
    pub async fn wait_terminal(&self) -> Result<Operation, Error> {
        error_if!(self.id.is_empty(), "Operation id must not be empty");
        let mut polls = 0_u64;
        loop {
            let operation = self.poll_once().await?;
            polls += 1;
            let state = operation.state();
            trace!(
                id = %self.id,
                polls,
                status_code = operation.status_code,
                "Operation poll"
            );
            match state {
                OperationState::Running => {}
                OperationState::Success => {
                    debug!(id = %self.id, polls, "Operation succeeded");
                    return Ok(operation);
                }
                OperationState::Failure | OperationState::Cancelled => {
                    debug!(id = %self.id, polls, ?state, err = %operation.err, "Operation did not succeed");
                    let message = if operation.err.is_empty() {
                        format!("Operation {} ended as {}", self.id, operation.status)
                    } else {
                        operation.err
                    };
                    return Err(Error::operation_failed(operation.status_code, &message));
                }
            }
        }
    }

    /// Waits for success and returns the terminal metadata.
    pub async fn follow(&self) -> Result<Option<Value>, Error> {
        self.wait_terminal().await.map(|operation| operation.metadata)
    }
}

/// `GET /1.0/operations/{id}`.
pub async fn operation_info(ctx: &RequestContext, id: &str) -> Result<Operation, Error> {
    error_if!(id.is_empty(), "Operation id must not be empty");
    ctx.execute(Request::get(format!("operations/{id}")).build())
        .await?
        .parse_sync()
}

/// Asks the daemon to cancel an operation. A follower still running keeps
/// polling until it observes the terminal state.
pub async fn cancel(ctx: &RequestContext, id: &str) -> Result<(), Error> {
    error_if!(id.is_empty(), "Operation id must not be empty");
    debug!(%id, "Cancelling operation");
    ctx.execute(Request::delete(format!("operations/{id}")).build())
        .await?
        .parse_empty()
        .err_tip(|| format!("While cancelling operation {id}"))
}
