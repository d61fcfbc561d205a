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

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::uri::PathAndQuery;
use http::{HeaderMap, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use lxd_client_config::client::{ClientConfig, Endpoint};
use lxd_client_error::{Error, ResultExt, make_input_err};
use lxd_client_util::task::TaskExecutor;
use lxd_client_util::tls_utils;
use tokio::net::UnixStream;
use tower::Service;
use tracing::trace;

/// Authority used for requests that travel over the UNIX socket. The
/// connector ignores it; it only has to form a valid absolute URI.
const UNIX_ORIGIN: &str = "http://unix";

/// Status, headers and the fully read body of a daemon response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: Bytes) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
}

/// Delivers one request to the daemon. The request's URI is origin-form
/// (`/1.0/...`); the transport decides where it goes.
///
/// Implementations must be safe to share between concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse, Error>;
}

/// Dials the daemon's UNIX socket for every new pooled connection.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    socket_path: Arc<Path>,
}

impl UnixConnector {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: Arc::from(socket_path.into()),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Service<Uri> for UnixConnector {
    type Response = UnixConnection;
    type Error = std::io::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: Uri) -> Self::Future {
        let socket_path = self.socket_path.clone();
        Box::pin(async move {
            trace!(socket_path = %socket_path.display(), "Dialing daemon socket");
            let stream = UnixStream::connect(&*socket_path).await?;
            Ok(UnixConnection {
                io: TokioIo::new(stream),
            })
        })
    }
}

/// A connected UNIX stream usable by the pooled client.
#[derive(Debug)]
pub struct UnixConnection {
    io: TokioIo<UnixStream>,
}

impl Connection for UnixConnection {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl hyper::rt::Read for UnixConnection {
    #[inline]
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Pin::new(&mut self.get_mut().io).poll_read(cx, buf)
    }
}

impl hyper::rt::Write for UnixConnection {
    #[inline]
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
    }

    #[inline]
    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        Pin::new(&mut self.get_mut().io).poll_flush(cx)
    }

    #[inline]
    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
    }
}

enum Inner {
    Unix(LegacyClient<UnixConnector, Full<Bytes>>),
    Https {
        client: LegacyClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
        origin: String,
    },
}

/// Pooled HTTP/1.1 transport, either over the local socket or over mutual
/// TLS against a daemon with a pinned certificate.
pub struct HttpTransport {
    inner: Inner,
    endpoint: Endpoint,
}

impl core::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let endpoint = config.parsed_endpoint().ok_or_else(|| {
            make_input_err!(
                "Endpoint '{}' is neither a UNIX socket path nor an https:// URL",
                config.endpoint
            )
        })?;
        match &endpoint {
            Endpoint::Unix(path) => Ok(Self::unix(path)),
            Endpoint::Https(origin) => {
                let tls_config = tls_utils::load_client_config(
                    config.client_certificate_pem.as_deref(),
                    config.client_key_pem.as_deref(),
                    config.server_certificate_pem.as_deref(),
                )
                .err_tip(|| format!("While configuring TLS for {origin}"))?;
                let connector = HttpsConnectorBuilder::new()
                    .with_tls_config(tls_config)
                    .https_only()
                    .enable_http1()
                    .build();
                Ok(Self {
                    inner: Inner::Https {
                        client: LegacyClient::builder(TaskExecutor::new()).build(connector),
                        origin: origin.clone(),
                    },
                    endpoint,
                })
            }
        }
    }

    /// Transport over the daemon's local socket.
    pub fn unix(socket_path: &str) -> Self {
        let connector = UnixConnector::new(socket_path);
        Self {
            inner: Inner::Unix(LegacyClient::builder(TaskExecutor::new()).build(connector)),
            endpoint: Endpoint::Unix(socket_path.to_string()),
        }
    }

    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn origin(&self) -> &str {
        match &self.inner {
            Inner::Unix(_) => UNIX_ORIGIN,
            Inner::Https { origin, .. } => origin,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse, Error> {
        let (mut parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or("/", PathAndQuery::as_str);
        parts.uri = format!("{}{path_and_query}", self.origin())
            .parse::<Uri>()
            .err_tip(|| "While forming the daemon URI")?;
        let request = http::Request::from_parts(parts, Full::new(body));

        let response = match &self.inner {
            Inner::Unix(client) => client.request(request).await,
            Inner::Https { client, .. } => client.request(request).await,
        }
        .err_tip(|| format!("While sending request to {}", self.origin()))?;

        let (parts, incoming) = response.into_parts();
        let body = incoming
            .collect()
            .await
            .err_tip(|| "While reading the daemon's response body")?
            .to_bytes();
        Ok(RawResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
