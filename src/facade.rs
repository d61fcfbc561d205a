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

//! The named daemon operations. Both clients call into these; they differ
//! only in who drives the returned future.

use std::collections::HashMap;

use lxd_client_error::{Code, Error, ResultExt, error_if, make_err, make_input_err};
use serde_json::Value;
use tracing::debug;

use crate::api::{
    AsyncOperation, ContainerAction, ContainerActionRequest, ContainerInfo, ContainerInitRequest,
    ContainerSource, ContainerState, Device, ImageAliasesEntry, ImageInfo, Operation, ServerState,
};
use crate::context::RequestContext;
use crate::operation_follower::{self, OperationFollower};
use crate::request::Request;

const ACCEPTED: u16 = 202;
const NOT_FOUND: u16 = 404;
const OK: u16 = 200;

/// Arguments of `container_init`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInit {
    /// Name of the new container. The daemon picks one when absent.
    pub name: Option<String>,
    /// Short name of a remote in `ClientConfig::remotes_url`. When set the
    /// daemon downloads `image` from that remote.
    pub image_remote: Option<String>,
    /// Alias or fingerprint of the image.
    pub image: String,
    pub profiles: Vec<String>,
    pub config: HashMap<String, String>,
    pub devices: Vec<Device>,
    pub ephemeral: bool,
}

impl ContainerInit {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn image_remote(mut self, remote: impl Into<String>) -> Self {
        self.image_remote = Some(remote.into());
        self
    }

    #[must_use]
    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn config(mut self, config: HashMap<String, String>) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    #[must_use]
    pub const fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
}

pub async fn server_status(ctx: &RequestContext) -> Result<ServerState, Error> {
    ctx.execute(Request::get("").build()).await?.parse_sync()
}

pub async fn list_containers(ctx: &RequestContext) -> Result<Vec<ContainerInfo>, Error> {
    ctx.execute(Request::get("containers").query("recursion", 1).build())
        .await?
        .parse_sync()
}

pub async fn container_info(
    ctx: &RequestContext,
    name: &str,
) -> Result<Option<ContainerInfo>, Error> {
    error_if!(name.is_empty(), "Container name must not be empty");
    ctx.execute(
        Request::get(format!("containers/{name}"))
            .expect([OK, NOT_FOUND])
            .build(),
    )
    .await?
    .parse_optional()
}

pub async fn container_state(
    ctx: &RequestContext,
    name: &str,
) -> Result<Option<ContainerState>, Error> {
    error_if!(name.is_empty(), "Container name must not be empty");
    ctx.execute(
        Request::get(format!("containers/{name}/state"))
            .expect([OK, NOT_FOUND])
            .build(),
    )
    .await?
    .parse_optional()
}

async fn find_image_alias(
    ctx: &RequestContext,
    alias: &str,
) -> Result<Option<ImageAliasesEntry>, Error> {
    ctx.execute(
        Request::get(format!("images/aliases/{alias}"))
            .expect([OK, NOT_FOUND])
            .build(),
    )
    .await?
    .parse_optional()
}

async fn find_image(ctx: &RequestContext, fingerprint: &str) -> Result<Option<ImageInfo>, Error> {
    ctx.execute(
        Request::get(format!("images/{fingerprint}"))
            .expect([OK, NOT_FOUND])
            .build(),
    )
    .await?
    .parse_optional()
}

/// Resolves where the container's root filesystem comes from. Local images
/// are checked to exist before anything is created.
async fn resolve_source(
    ctx: &RequestContext,
    image: &str,
    image_remote: Option<&str>,
) -> Result<ContainerSource, Error> {
    if let Some(remote) = image_remote {
        let server = ctx
            .config()
            .remotes_url
            .get(remote)
            .ok_or_else(|| make_input_err!("Unknown image remote '{remote}'"))?;
        return Ok(ContainerSource::simplestreams_image(server.clone(), image));
    }

    let fingerprint = match find_image_alias(ctx, image)
        .await
        .err_tip(|| format!("While resolving image alias '{image}'"))?
    {
        Some(alias) => alias.target,
        None => image.to_string(),
    };
    if find_image(ctx, &fingerprint)
        .await
        .err_tip(|| format!("While looking up image '{fingerprint}'"))?
        .is_none()
    {
        return Err(make_err!(
            Code::LocalImageNotFound,
            "Image '{image}' is not available locally (fingerprint '{fingerprint}')"
        ));
    }
    Ok(ContainerSource::local_image(fingerprint))
}

pub async fn container_init(
    ctx: &RequestContext,
    init: ContainerInit,
) -> Result<AsyncOperation, Error> {
    error_if!(init.image.is_empty(), "An image is required to create a container");
    let source = resolve_source(ctx, &init.image, init.image_remote.as_deref()).await?;
    debug!(
        name = ?init.name,
        fingerprint = %source.fingerprint,
        server = ?source.server,
        "Creating container"
    );
    let body = ContainerInitRequest {
        source,
        name: init.name,
        profiles: init.profiles,
        config: init.config,
        devices: init.devices,
        ephem: init.ephemeral,
    };
    ctx.execute(
        Request::post("containers")
            .body(&body)?
            .expect([ACCEPTED])
            .build(),
    )
    .await?
    .parse_async()
}

pub async fn container_action(
    ctx: &RequestContext,
    name: &str,
    action: ContainerAction,
    timeout: i32,
    force: bool,
    stateful: bool,
) -> Result<AsyncOperation, Error> {
    error_if!(name.is_empty(), "Container name must not be empty");
    debug!(%name, %action, timeout, force, stateful, "Changing container state");
    let body = ContainerActionRequest::new(action, timeout, force, stateful);
    ctx.execute(
        Request::put(format!("containers/{name}/state"))
            .body(&body)?
            .expect([ACCEPTED])
            .build(),
    )
    .await?
    .parse_async()
}

/// Deletes a container, or one of its snapshots when `name` reads
/// `container/snapshot`.
pub async fn container_delete(ctx: &RequestContext, name: &str) -> Result<AsyncOperation, Error> {
    error_if!(name.is_empty(), "Container name must not be empty");
    let path = match name.split_once('/') {
        Some((container, snapshot)) => {
            error_if!(
                container.is_empty() || snapshot.is_empty(),
                "Snapshot reference '{name}' must read container/snapshot"
            );
            format!("containers/{container}/snapshots/{snapshot}")
        }
        None => format!("containers/{name}"),
    };
    ctx.execute(Request::delete(path).expect([ACCEPTED]).build())
        .await?
        .parse_async()
}

pub async fn list_images(ctx: &RequestContext) -> Result<Vec<ImageInfo>, Error> {
    ctx.execute(Request::get("images").query("recursion", 1).build())
        .await?
        .parse_sync()
}

pub async fn image_info(ctx: &RequestContext, fingerprint: &str) -> Result<ImageInfo, Error> {
    error_if!(fingerprint.is_empty(), "Image fingerprint must not be empty");
    ctx.execute(Request::get(format!("images/{fingerprint}")).build())
        .await?
        .parse_sync()
}

pub async fn image_get_alias(
    ctx: &RequestContext,
    alias: &str,
) -> Result<ImageAliasesEntry, Error> {
    error_if!(alias.is_empty(), "Image alias must not be empty");
    ctx.execute(Request::get(format!("images/aliases/{alias}")).build())
        .await?
        .parse_sync()
}

pub async fn image_delete(ctx: &RequestContext, fingerprint: &str) -> Result<AsyncOperation, Error> {
    error_if!(fingerprint.is_empty(), "Image fingerprint must not be empty");
    ctx.execute(
        Request::delete(format!("images/{fingerprint}"))
            .expect([ACCEPTED])
            .build(),
    )
    .await?
    .parse_async()
}

pub async fn operation_info(ctx: &RequestContext, id: &str) -> Result<Operation, Error> {
    operation_follower::operation_info(ctx, id).await
}

/// Follows the operation to completion and returns its terminal metadata.
pub async fn operation_wait(ctx: &RequestContext, id: &str) -> Result<Option<Value>, Error> {
    OperationFollower::new(ctx, id).follow().await
}

pub async fn operation_cancel(ctx: &RequestContext, id: &str) -> Result<(), Error> {
    operation_follower::cancel(ctx, id).await
}
