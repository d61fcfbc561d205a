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

use core::fmt;
use core::str::FromStr;
use std::collections::{BTreeMap, HashMap};

use lxd_client_error::{Error, make_input_err};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /1.0/containers/{name}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ContainerInfo {
    pub architecture: String,
    pub config: HashMap<String, String>,
    pub created_at: String,
    pub devices: HashMap<String, HashMap<String, String>>,
    pub ephemeral: bool,
    pub expanded_config: HashMap<String, String>,
    pub expanded_devices: HashMap<String, HashMap<String, String>>,
    pub name: String,
    pub profiles: Vec<String>,
    pub stateful: bool,
    pub status: String,
    pub status_code: i64,
}

/// `GET /1.0/containers/{name}/state`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ContainerState {
    pub status: String,
    pub status_code: i64,
    pub pid: i64,
    pub processes: i64,
    pub cpu: HashMap<String, Value>,
    pub disk: HashMap<String, Value>,
    pub memory: HashMap<String, Value>,
    pub network: HashMap<String, Value>,
}

/// A device attached to a container at creation time.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    /// Remaining device keys such as `path`, `source` or `nictype`.
    #[serde(flatten)]
    pub config: BTreeMap<String, String>,
}

/// State changes accepted by `PUT /1.0/containers/{name}/state`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Stop,
    Start,
    Restart,
    Freeze,
    Unfreeze,
}

impl ContainerAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Restart => "restart",
            Self::Freeze => "freeze",
            Self::Unfreeze => "unfreeze",
        }
    }

    /// Only start and stop may snapshot or restore the runtime state.
    pub const fn supports_stateful(self) -> bool {
        matches!(self, Self::Start | Self::Stop)
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerAction {
    type Err = Error;

    fn from_str(action: &str) -> Result<Self, Self::Err> {
        match action {
            "stop" => Ok(Self::Stop),
            "start" => Ok(Self::Start),
            "restart" => Ok(Self::Restart),
            "freeze" => Ok(Self::Freeze),
            "unfreeze" => Ok(Self::Unfreeze),
            _ => Err(make_input_err!("{action} has no corresponding value")),
        }
    }
}

/// Body of `PUT /1.0/containers/{name}/state`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerActionRequest {
    pub action: ContainerAction,
    pub timeout: i32,
    pub force: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful: Option<bool>,
}

impl ContainerActionRequest {
    pub const fn new(action: ContainerAction, timeout: i32, force: bool, stateful: bool) -> Self {
        Self {
            action,
            timeout,
            force,
            stateful: if action.supports_stateful() {
                Some(stateful)
            } else {
                None
            },
        }
    }
}

/// Where a new container's root filesystem comes from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerSource {
    #[serde(rename = "type")]
    pub source_type: String,
    /// Base URL of the image server, for remote images only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub fingerprint: String,
}

impl ContainerSource {
    /// An image already present on the daemon.
    pub fn local_image(fingerprint: impl Into<String>) -> Self {
        Self {
            source_type: "image".to_string(),
            server: None,
            protocol: None,
            fingerprint: fingerprint.into(),
        }
    }

    /// An image the daemon downloads from a simplestreams server.
    pub fn simplestreams_image(server: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            source_type: "image".to_string(),
            server: Some(server.into()),
            protocol: Some("simplestreams".to_string()),
            fingerprint: fingerprint.into(),
        }
    }
}

const fn is_false(value: &bool) -> bool {
    !*value
}

fn is_unnamed(name: &Option<String>) -> bool {
    name.as_deref().is_none_or(str::is_empty)
}

/// Body of `POST /1.0/containers`. Empty members are left out of the wire
/// representation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerInitRequest {
    pub source: ContainerSource,
    #[serde(default, skip_serializing_if = "is_unnamed")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<Device>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ephem: bool,
}
