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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An image known to the daemon, `GET /1.0/images/{fingerprint}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ImageInfo {
    pub aliases: Vec<ImageAlias>,
    pub architecture: String,
    pub auto_update: bool,
    pub cached: bool,
    pub fingerprint: String,
    pub filename: String,
    pub properties: HashMap<String, String>,
    pub public: bool,
    pub size: i64,
    pub created_at: String,
    pub expires_at: String,
    pub last_used_at: String,
    pub uploaded_at: String,
    /// Where the image came from, when it was downloaded from a remote.
    pub update_source: Option<ImageSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ImageAlias {
    pub name: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ImageSource {
    pub alias: String,
    pub certificate: String,
    pub protocol: String,
    pub server: String,
}

/// `GET /1.0/images/aliases/{name}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ImageAliasesEntry {
    pub name: String,
    pub description: String,
    /// Fingerprint of the image the alias points at.
    pub target: String,
}
