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

pub mod task;
pub mod tls_utils;

// Re-export tracing mostly for use in macros.
pub use tracing as __tracing;

/// Initialize tracing.
///
/// The verbosity follows `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() -> Result<(), lxd_client_error::Error> {
    use std::sync::OnceLock;

    use tracing::metadata::LevelFilter;
    use tracing_subscriber::EnvFilter;

    static INITIALIZED: OnceLock<()> = OnceLock::new();

    if INITIALIZED.set(()).is_err() {
        return Err(lxd_client_error::make_err!(
            lxd_client_error::Code::Internal,
            "Logging already initialized"
        ));
    }
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .pretty()
        .with_timer(tracing_subscriber::fmt::time::time())
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| {
            lxd_client_error::make_err!(
                lxd_client_error::Code::Internal,
                "Failed to install tracing subscriber: {e}"
            )
        })
}
