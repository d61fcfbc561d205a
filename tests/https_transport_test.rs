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
use core::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use lxd_client::{ClientConfig, RxLxdClient};
use lxd_client_error::{Code, Error, make_err};
use lxd_client_macro::lxd_test;
use lxd_client_util::task::JoinHandleDropGuard;
use lxd_client_util::tls_utils::{certificates_from_pem, private_key_from_pem};
use lxd_client_util::{background_spawn, spawn};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tracing::warn;

mod utils;
use utils::mock_transport::sync_envelope;

const CLIENT_CA_PEM: &str = include_str!("data/client-ca.pem");
const CLIENT_CERT_PEM: &str = include_str!("data/client.pem");
const CLIENT_KEY_PEM: &str = include_str!("data/client.key");
const SERVER_CERT_PEM: &str = include_str!("data/server.pem");
const SERVER_KEY_PEM: &str = include_str!("data/server.key");
const OTHER_SERVER_CERT_PEM: &str = include_str!("data/other-server.pem");
const OTHER_SERVER_KEY_PEM: &str = include_str!("data/other-server.key");

/// A daemon stand-in on loopback TLS. Clients must present a certificate
/// issued by the test CA; every request is answered with the server state.
struct TlsDaemon {
    addr: SocketAddr,
    _accept_loop: JoinHandleDropGuard<()>,
}

impl TlsDaemon {
    async fn start(cert_pem: &str, key_pem: &str) -> Result<Self, Error> {
        let provider = Arc::new(ring::default_provider());
        let mut client_roots = RootCertStore::empty();
        for cert in certificates_from_pem(CLIENT_CA_PEM)? {
            client_roots
                .add(cert)
                .map_err(|e| make_err!(Code::Internal, "Could not read client CA: {e:?}"))?;
        }
        let verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(client_roots), provider.clone())
                .build()
                .map_err(|e| {
                    make_err!(Code::Internal, "Could not create WebPkiClientVerifier: {e:?}")
                })?;
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_client_cert_verifier(verifier)
            .with_single_cert(certificates_from_pem(cert_pem)?, private_key_from_pem(key_pem)?)?;
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let accept_loop = spawn!("tls_daemon_accept", async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                drop(background_spawn!("tls_daemon_connection", async move {
                    let stream = match acceptor.accept(stream).await {
                        Ok(stream) => stream,
                        Err(err) => {
                            warn!(?err, "TLS daemon handshake failed");
                            return;
                        }
                    };
                    let service = service_fn(|_request: hyper::Request<Incoming>| async {
                        let body = sync_envelope(json!({
                            "api_version": "1.0",
                            "auth": "trusted",
                            "environment": {"driver": "lxc"},
                        }));
                        let response = hyper::Response::builder()
                            .header(CONTENT_TYPE, "application/json")
                            .body(Full::new(Bytes::from(body.to_string())))
                            .expect("Valid response");
                        Ok::<_, Infallible>(response)
                    });
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        warn!(?err, "TLS daemon connection failed");
                    }
                }));
            }
        });
        Ok(Self {
            addr,
            _accept_loop: accept_loop,
        })
    }

    fn endpoint(&self) -> String {
        format!("https://{}", self.addr)
    }
}

#[lxd_test]
async fn pinned_certificate_is_accepted() -> Result<(), Error> {
    let daemon = TlsDaemon::start(SERVER_CERT_PEM, SERVER_KEY_PEM).await?;
    let client = RxLxdClient::new(ClientConfig::remote(
        daemon.endpoint(),
        CLIENT_CERT_PEM,
        CLIENT_KEY_PEM,
        SERVER_CERT_PEM,
    ))?;

    let state = client.server_status().await?;

    assert_eq!(state.api_version, "1.0");
    assert_eq!(state.auth, "trusted");
    Ok(())
}

#[lxd_test]
async fn other_server_certificate_is_transport_error() -> Result<(), Error> {
    let daemon = TlsDaemon::start(OTHER_SERVER_CERT_PEM, OTHER_SERVER_KEY_PEM).await?;
    let client = RxLxdClient::new(ClientConfig::remote(
        daemon.endpoint(),
        CLIENT_CERT_PEM,
        CLIENT_KEY_PEM,
        SERVER_CERT_PEM,
    ))?;

    let err = client.server_status().await.unwrap_err();

    assert_eq!(err.code, Code::Transport, "{err}");
    Ok(())
}

#[lxd_test]
async fn untrusted_client_certificate_is_transport_error() -> Result<(), Error> {
    let daemon = TlsDaemon::start(SERVER_CERT_PEM, SERVER_KEY_PEM).await?;
    // Self-signed, so the daemon's client CA never issued it.
    let client = RxLxdClient::new(ClientConfig::remote(
        daemon.endpoint(),
        OTHER_SERVER_CERT_PEM,
        OTHER_SERVER_KEY_PEM,
        SERVER_CERT_PEM,
    ))?;

    let err = client.server_status().await.unwrap_err();

    assert_eq!(err.code, Code::Transport, "{err}");
    Ok(())
}
