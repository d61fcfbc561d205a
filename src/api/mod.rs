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

//! Records exchanged with the daemon. Field names match the wire JSON.

pub mod container;
pub mod image;
pub mod operation;
pub mod server;

pub use container::{
    ContainerAction, ContainerActionRequest, ContainerInfo, ContainerInitRequest, ContainerSource,
    ContainerState, Device,
};
pub use image::{ImageAlias, ImageAliasesEntry, ImageInfo, ImageSource};
pub use operation::{AsyncOperation, Operation, OperationClass, OperationState};
pub use server::{ServerEnvironment, ServerState};
