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

use core::future::{Future, IntoFuture};
use core::pin::Pin;
use core::task::{Context, Poll, ready};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use lxd_client_config::client::ClientConfig;
use lxd_client_error::Error;
use lxd_client_util::spawn;
use lxd_client_util::task::JoinHandleDropGuard;
use serde_json::Value;

use crate::api::{
    AsyncOperation, ContainerAction, ContainerInfo, ContainerState, ImageAliasesEntry, ImageInfo,
    Operation, ServerState,
};
use crate::context::RequestContext;
use crate::facade::{self, ContainerInit};
use crate::transport::Transport;

type Producer<T> = dyn Fn() -> BoxFuture<'static, Result<T, Error>> + Send + Sync;

/// A lazy single-value producer. Nothing reaches the daemon until the value
/// is awaited or subscribed, and every await or subscription issues its own
/// request. No caching, no retry.
#[must_use = "a Single does nothing until it is awaited or subscribed"]
pub struct Single<T> {
    producer: Arc<Producer<T>>,
}

impl<T> Clone for Single<T> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
        }
    }
}

impl<T> core::fmt::Debug for Single<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Single")
            .field("output", &core::any::type_name::<T>())
            .finish()
    }
}

impl<T: Send + 'static> Single<T> {
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self {
            producer: Arc::new(move || producer().boxed()),
        }
    }

    /// Starts a fresh request driven by the caller.
    pub fn get(&self) -> BoxFuture<'static, Result<T, Error>> {
        (self.producer)()
    }

    /// Starts a fresh request on the current tokio runtime. Dropping or
    /// cancelling the subscription aborts it, including any pending
    /// operation polls.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            task: spawn!("lxd_subscription", self.get()),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Single<T> {
    type Output = Result<T, Error>;
    type IntoFuture = BoxFuture<'static, Result<T, Error>>;

    fn into_future(self) -> Self::IntoFuture {
        self.get()
    }
}

/// A running request started by [`Single::subscribe`]. Resolves to the
/// request's outcome; a cancelled subscription resolves to `Cancelled`.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription<T> {
    task: JoinHandleDropGuard<Result<T, Error>>,
}

impl<T> core::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl<T> Subscription<T> {
    /// Aborts the request. Once this returns no further daemon requests
    /// are started on its behalf.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Future for Subscription<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Poll::Ready(match ready!(Pin::new(&mut self.task).poll(cx)) {
            Ok(result) => result,
            Err(join_err) => Err(Error::from(join_err).append("Subscription ended early")),
        })
    }
}

/// Reactive client: the same operations as [`crate::LxdClient`], each
/// returned as a [`Single`]. Cheap to clone; clones share one pool.
#[derive(Debug, Clone)]
pub struct RxLxdClient {
    ctx: Arc<RequestContext>,
}

impl RxLxdClient {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Ok(Self::from_context(Arc::new(RequestContext::new(config)?)))
    }

    pub fn local() -> Result<Self, Error> {
        Self::new(ClientConfig::local_access())
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::from_context(Arc::new(RequestContext::with_transport(config, transport)))
    }

    pub const fn from_context(ctx: Arc<RequestContext>) -> Self {
        Self { ctx }
    }

    pub const fn context(&self) -> &Arc<RequestContext> {
        &self.ctx
    }

    fn single<T, F, Fut>(&self, call: F) -> Single<T>
    where
        T: Send + 'static,
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let ctx = self.ctx.clone();
        Single::new(move || call(ctx.clone()))
    }

    pub fn server_status(&self) -> Single<ServerState> {
        self.single(|ctx| async move { facade::server_status(&ctx).await })
    }

    pub fn list_containers(&self) -> Single<Vec<ContainerInfo>> {
        self.single(|ctx| async move { facade::list_containers(&ctx).await })
    }

    pub fn container_info(&self, name: &str) -> Single<Option<ContainerInfo>> {
        let name = name.to_string();
        self.single(move |ctx| {
            let name = name.clone();
            async move { facade::container_info(&ctx, &name).await }
        })
    }

    pub fn container_state(&self, name: &str) -> Single<Option<ContainerState>> {
        let name = name.to_string();
        self.single(move |ctx| {
            let name = name.clone();
            async move { facade::container_state(&ctx, &name).await }
        })
    }

    pub fn container_init(&self, init: ContainerInit) -> Single<AsyncOperation> {
        self.single(move |ctx| {
            let init = init.clone();
            async move { facade::container_init(&ctx, init).await }
        })
    }

    pub fn container_action(
        &self,
        name: &str,
        action: ContainerAction,
        timeout: i32,
        force: bool,
        stateful: bool,
    ) -> Single<AsyncOperation> {
        let name = name.to_string();
        self.single(move |ctx| {
            let name = name.clone();
            async move {
                facade::container_action(&ctx, &name, action, timeout, force, stateful).await
            }
        })
    }

    pub fn container_delete(&self, name: &str) -> Single<AsyncOperation> {
        let name = name.to_string();
        self.single(move |ctx| {
            let name = name.clone();
            async move { facade::container_delete(&ctx, &name).await }
        })
    }

    pub fn list_images(&self) -> Single<Vec<ImageInfo>> {
        self.single(|ctx| async move { facade::list_images(&ctx).await })
    }

    pub fn image_info(&self, fingerprint: &str) -> Single<ImageInfo> {
        let fingerprint = fingerprint.to_string();
        self.single(move |ctx| {
            let fingerprint = fingerprint.clone();
            async move { facade::image_info(&ctx, &fingerprint).await }
        })
    }

    pub fn image_get_alias(&self, alias: &str) -> Single<ImageAliasesEntry> {
        let alias = alias.to_string();
        self.single(move |ctx| {
            let alias = alias.clone();
            async move { facade::image_get_alias(&ctx, &alias).await }
        })
    }

    pub fn image_delete(&self, fingerprint: &str) -> Single<AsyncOperation> {
        let fingerprint = fingerprint.to_string();
        self.single(move |ctx| {
            let fingerprint = fingerprint.clone();
            async move { facade::image_delete(&ctx, &fingerprint).await }
        })
    }

    pub fn operation_info(&self, id: &str) -> Single<Operation> {
        let id = id.to_string();
        self.single(move |ctx| {
            let id = id.clone();
            async move { facade::operation_info(&ctx, &id).await }
        })
    }

    pub fn operation_wait(&self, id: &str) -> Single<Option<Value>> {
        let id = id.to_string();
        self.single(move |ctx| {
            let id = id.clone();
            async move { facade::operation_wait(&ctx, &id).await }
        })
    }

    pub fn operation_cancel(&self, id: &str) -> Single<()> {
        let id = id.to_string();
        self.single(move |ctx| {
            let id = id.clone();
            async move { facade::operation_cancel(&ctx, &id).await }
        })
    }
}
