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

use core::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use lxd_client_error::Error;
use lxd_client_util::background_spawn;
use lxd_client_util::spawn;
use lxd_client_util::task::JoinHandleDropGuard;
use parking_lot::Mutex;
use tokio::net::UnixListener;
use tracing::warn;

type Handler = dyn Fn(&Method, &str) -> (StatusCode, String) + Send + Sync;

/// A daemon stand-in serving HTTP/1.1 on a fresh UNIX socket. The socket
/// file is removed on drop.
#[derive(Debug)]
pub(crate) struct MockDaemon {
    socket_path: PathBuf,
    requests: Arc<Mutex<Vec<String>>>,
    _accept_loop: JoinHandleDropGuard<()>,
}

impl MockDaemon {
    /// Must be called from within a tokio runtime.
    pub(crate) fn start<F>(handler: F) -> Result<Self, Error>
    where
        F: Fn(&Method, &str) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let socket_path =
            std::env::temp_dir().join(format!("lxd-client-{}.sock", uuid::Uuid::new_v4()));
        let listener = UnixListener::bind(&socket_path)?;
        let handler: Arc<Handler> = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let accept_requests = requests.clone();
        let accept_loop = spawn!("mock_daemon_accept", async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let requests = accept_requests.clone();
                let service = service_fn(move |request: hyper::Request<Incoming>| {
                    let handler = handler.clone();
                    let requests = requests.clone();
                    async move {
                        let target = request
                            .uri()
                            .path_and_query()
                            .map_or_else(|| request.uri().path().to_string(), ToString::to_string);
                        requests
                            .lock()
                            .push(format!("{} {target}", request.method()));
                        let (status, body) = handler(request.method(), &target);
                        let response = hyper::Response::builder()
                            .status(status)
                            .header(CONTENT_TYPE, "application/json")
                            .body(Full::new(Bytes::from(body)))
                            .expect("Valid response");
                        Ok::<_, Infallible>(response)
                    }
                });
                drop(background_spawn!("mock_daemon_connection", async move {
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        warn!(?err, "Mock daemon connection failed");
                    }
                }));
            }
        });

        Ok(Self {
            socket_path,
            requests,
            _accept_loop: accept_loop,
        })
    }

    pub(crate) fn socket_path(&self) -> String {
        self.socket_path.display().to_string()
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.socket_path) {
            warn!(?err, path = %self.socket_path.display(), "Could not remove mock daemon socket");
        }
    }
}
