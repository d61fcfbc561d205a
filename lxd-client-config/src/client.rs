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
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::serde_utils::{
    convert_numeric_with_shellexpand, convert_optional_string_with_shellexpand,
    convert_string_map_with_shellexpand, convert_string_with_shellexpand,
};

/// Socket the daemon listens on for local, trusted access.
pub const DEFAULT_UNIX_SOCKET: &str = "/var/lib/lxd/unix.socket";

const DEFAULT_REQUEST_TIMEOUT_S: u64 = 30;
const DEFAULT_OPERATION_POLL_INTERVAL_S: u64 = 10;

fn default_endpoint() -> String {
    format!("unix://{DEFAULT_UNIX_SOCKET}")
}

const fn default_request_timeout_s() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_S
}

const fn default_operation_poll_interval_s() -> u64 {
    DEFAULT_OPERATION_POLL_INTERVAL_S
}

/// Simplestreams image servers known by their short name.
pub fn default_remotes() -> HashMap<String, String> {
    HashMap::from([
        (
            "images".to_string(),
            "https://images.linuxcontainers.org".to_string(),
        ),
        (
            "ubuntu".to_string(),
            "https://cloud-images.ubuntu.com/releases".to_string(),
        ),
        (
            "ubuntu-daily".to_string(),
            "https://cloud-images.ubuntu.com/daily".to_string(),
        ),
    ])
}

/// Configuration of a client talking to a single daemon.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Where the daemon is reached. Either a UNIX socket path (optionally
    /// prefixed with `unix://`) or an `https://host:port` URL.
    ///
    /// Default: `unix:///var/lib/lxd/unix.socket`
    #[serde(
        default = "default_endpoint",
        deserialize_with = "convert_string_with_shellexpand"
    )]
    pub endpoint: String,

    /// PEM encoded certificate presented to the daemon. Required for https.
    ///
    /// Default: None
    #[serde(default, deserialize_with = "convert_optional_string_with_shellexpand")]
    pub client_certificate_pem: Option<String>,

    /// PEM encoded private key matching `client_certificate_pem`. Required
    /// for https.
    ///
    /// Default: None
    #[serde(default, deserialize_with = "convert_optional_string_with_shellexpand")]
    pub client_key_pem: Option<String>,

    /// PEM encoded certificate the daemon must present. The connection is
    /// only accepted if the daemon's certificate is exactly this one; the
    /// system trust store is never consulted. Required for https.
    ///
    /// Default: None
    #[serde(default, deserialize_with = "convert_optional_string_with_shellexpand")]
    pub server_certificate_pem: Option<String>,

    /// Image servers usable as `image_remote` when creating containers,
    /// keyed by short name. The URL is passed through to the daemon; the
    /// client never contacts it.
    ///
    /// Default: `images`, `ubuntu` and `ubuntu-daily`.
    #[serde(
        default = "default_remotes",
        deserialize_with = "convert_string_map_with_shellexpand"
    )]
    pub remotes_url: HashMap<String, String>,

    /// Deadline for a single request, in seconds.
    ///
    /// Default: 30
    #[serde(
        default = "default_request_timeout_s",
        deserialize_with = "convert_numeric_with_shellexpand"
    )]
    pub request_timeout_s: u64,

    /// How long the daemon may hold a single operation `wait` request
    /// before answering with the current state, in seconds. Values below 1
    /// are raised to 1.
    ///
    /// Default: 10
    #[serde(
        default = "default_operation_poll_interval_s",
        deserialize_with = "convert_numeric_with_shellexpand"
    )]
    pub operation_poll_interval_s: u64,
}

impl ClientConfig {
    /// Configuration for the daemon on this host, through its UNIX socket.
    pub fn local_access() -> Self {
        Self {
            endpoint: default_endpoint(),
            client_certificate_pem: None,
            client_key_pem: None,
            server_certificate_pem: None,
            remotes_url: default_remotes(),
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
            operation_poll_interval_s: DEFAULT_OPERATION_POLL_INTERVAL_S,
        }
    }

    /// Configuration for a daemon at a UNIX socket other than the default.
    pub fn unix_socket(path: impl Into<String>) -> Self {
        Self {
            endpoint: path.into(),
            ..Self::local_access()
        }
    }

    /// Configuration for a remote daemon reached over mutual TLS.
    pub fn remote(
        endpoint: impl Into<String>,
        client_certificate_pem: impl Into<String>,
        client_key_pem: impl Into<String>,
        server_certificate_pem: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_certificate_pem: Some(client_certificate_pem.into()),
            client_key_pem: Some(client_key_pem.into()),
            server_certificate_pem: Some(server_certificate_pem.into()),
            ..Self::local_access()
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s)
    }

    pub const fn operation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.operation_poll_interval_s)
    }

    /// Parses `endpoint`. Returns `None` for values that are neither an
    /// absolute socket path nor an `https://` URL.
    pub fn parsed_endpoint(&self) -> Option<Endpoint> {
        Endpoint::parse(&self.endpoint)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::local_access()
    }
}

/// The two ways of reaching a daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Absolute path of the daemon's UNIX socket.
    Unix(String),
    /// Base URL (`https://host:port`) without a trailing slash.
    Https(String),
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Option<Self> {
        let endpoint = endpoint.trim();
        if let Some(path) = endpoint.strip_prefix("unix://") {
            return path.starts_with('/').then(|| Self::Unix(path.to_string()));
        }
        if endpoint.starts_with('/') {
            return Some(Self::Unix(endpoint.to_string()));
        }
        let rest = endpoint.strip_prefix("https://")?;
        if rest.is_empty() {
            return None;
        }
        Some(Self::Https(endpoint.trim_end_matches('/').to_string()))
    }
}
