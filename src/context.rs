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
use std::sync::Arc;

use lxd_client_config::client::ClientConfig;
use lxd_client_error::{Error, ResultExt};
use tracing::{debug, trace};

use crate::dispatch::Response;
use crate::request::Request;
use crate::transport::{HttpTransport, Transport};

/// Owns the transport for one client and carries the configuration every
/// request is issued under. Dropping the last reference drops the pool and
/// with it every open connection.
pub struct RequestContext {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl core::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RequestContext")
            .field("endpoint", &self.config.endpoint)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Connects according to `config.endpoint`.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config).err_tip(|| "While creating RequestContext")?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request` under the configured request timeout.
    pub async fn execute(&self, request: Request) -> Result<Response, Error> {
        let timeout = self.config.request_timeout();
        self.execute_with_timeout(request, timeout).await
    }

    /// Sends `request`, failing with `DeadlineExceeded` once `timeout`
    /// elapses. Dropping the returned future aborts the exchange.
    pub async fn execute_with_timeout(
        &self,
        request: Request,
        timeout: Duration,
    ) -> Result<Response, Error> {
        let method = request.method().clone();
        let target = request.path_and_query();
        let (http_request, expected) = request.into_http()?;
        debug!(%method, %target, ?timeout, "Sending request to daemon");

        let raw = tokio::time::timeout(timeout, self.transport.send(http_request))
            .await
            .err_tip(|| format!("Request {method} {target} timed out"))?
            .err_tip(|| format!("While executing {method} {target}"))?;

        trace!(
            %method,
            %target,
            status = raw.status.as_u16(),
            body_len = raw.body.len(),
            "Received daemon response"
        );
        Ok(Response::new(raw, expected))
    }
}
