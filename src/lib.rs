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

//! Client for the LXD daemon's REST API.
//!
//! Requests travel over the daemon's UNIX socket or over mutual TLS with a
//! pinned server certificate. Responses are decoded from the daemon's
//! envelope into typed payloads or handles on asynchronous operations, which
//! can be followed until they finish.
//!
//! [`LxdClient`] blocks the calling thread; [`RxLxdClient`] hands out lazy
//! [`Single`] values for use on a tokio runtime. Both share the same request
//! pipeline.

pub mod api;
pub mod client;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod facade;
pub mod operation_follower;
pub mod request;
pub mod rx_client;
pub mod transport;

pub use client::LxdClient;
pub use context::RequestContext;
pub use facade::ContainerInit;
pub use lxd_client_config::client::ClientConfig;
pub use lxd_client_error::{Code, Error};
pub use operation_follower::OperationFollower;
pub use request::Request;
pub use rx_client::{RxLxdClient, Single, Subscription};
pub use transport::{HttpTransport, RawResponse, Transport};
