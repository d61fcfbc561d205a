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
use lxd_client_error::{Code, Error, ResultExt};
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::api::{
    AsyncOperation, ContainerAction, ContainerInfo, ContainerState, ImageAliasesEntry, ImageInfo,
    Operation, ServerState,
};
use crate::context::RequestContext;
use crate::facade::{self, ContainerInit};
use crate::transport::Transport;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocking client. Every call parks the calling thread until the daemon
/// has answered; it must not be used from within an async runtime.
///
/// Dropping the client (or calling [`LxdClient::close`]) releases the
/// connection pool and the private runtime driving it.
pub struct LxdClient {
    // Declared before `runtime` so the pool goes away first.
    ctx: RequestContext,
    runtime: Runtime,
}

impl core::fmt::Debug for LxdClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LxdClient").field("ctx", &self.ctx).finish()
    }
}

impl LxdClient {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let runtime = build_runtime()?;
        let ctx = RequestContext::new(config)?;
        Ok(Self { ctx, runtime })
    }

    /// Client for the local daemon socket.
    pub fn local() -> Result<Self, Error> {
        Self::new(ClientConfig::local_access())
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        Ok(Self {
            ctx: RequestContext::with_transport(config, transport),
            runtime: build_runtime()?,
        })
    }

    pub const fn config(&self) -> &ClientConfig {
        self.ctx.config()
    }

    /// Releases the transport, waiting a bounded time for in-flight
    /// connection tasks to wind down.
    pub fn close(self) {
        let Self { ctx, runtime } = self;
        drop(ctx);
        runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        debug!("LxdClient closed");
    }

    pub fn server_status(&self) -> Result<ServerState, Error> {
        self.runtime.block_on(facade::server_status(&self.ctx))
    }

    pub fn list_containers(&self) -> Result<Vec<ContainerInfo>, Error> {
        self.runtime.block_on(facade::list_containers(&self.ctx))
    }

    /// `None` when the daemon does not know the container.
    pub fn container_info(&self, name: &str) -> Result<Option<ContainerInfo>, Error> {
        self.runtime.block_on(facade::container_info(&self.ctx, name))
    }

    pub fn container_state(&self, name: &str) -> Result<Option<ContainerState>, Error> {
        self.runtime
            .block_on(facade::container_state(&self.ctx, name))
    }

    pub fn container_init(&self, init: ContainerInit) -> Result<AsyncOperation, Error> {
        self.runtime.block_on(facade::container_init(&self.ctx, init))
    }

    pub fn container_action(
        &self,
        name: &str,
        action: ContainerAction,
        timeout: i32,
        force: bool,
        stateful: bool,
    ) -> Result<AsyncOperation, Error> {
        self.runtime.block_on(facade::container_action(
            &self.ctx, name, action, timeout, force, stateful,
        ))
    }

    pub fn container_delete(&self, name: &str) -> Result<AsyncOperation, Error> {
        self.runtime
            .block_on(facade::container_delete(&self.ctx, name))
    }

    pub fn list_images(&self) -> Result<Vec<ImageInfo>, Error> {
        self.runtime.block_on(facade::list_images(&self.ctx))
    }

    pub fn image_info(&self, fingerprint: &str) -> Result<ImageInfo, Error> {
        self.runtime
            .block_on(facade::image_info(&self.ctx, fingerprint))
    }

    pub fn image_get_alias(&self, alias: &str) -> Result<ImageAliasesEntry, Error> {
        self.runtime
            .block_on(facade::image_get_alias(&self.ctx, alias))
    }

    pub fn image_delete(&self, fingerprint: &str) -> Result<AsyncOperation, Error> {
        self.runtime
            .block_on(facade::image_delete(&self.ctx, fingerprint))
    }

    pub fn operation_info(&self, id: &str) -> Result<Operation, Error> {
        self.runtime.block_on(facade::operation_info(&self.ctx, id))
    }

    /// Blocks until the operation is terminal; returns its metadata on
    /// success.
    pub fn operation_wait(&self, id: &str) -> Result<Option<Value>, Error> {
        self.runtime.block_on(facade::operation_wait(&self.ctx, id))
    }

    pub fn operation_cancel(&self, id: &str) -> Result<(), Error> {
        self.runtime
            .block_on(facade::operation_cancel(&self.ctx, id))
    }
}

fn build_runtime() -> Result<Runtime, Error> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("lxd-client")
        .enable_all()
        .build()
        .err_tip_with_code(|_| (Code::Internal, "While starting the client runtime"))
}
