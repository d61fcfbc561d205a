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

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use lxd_client_error::Error;
use lxd_client_macro::lxd_test;
use lxd_client_util::spawn;
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

#[lxd_test]
async fn spawned_task_returns_value() -> Result<(), Error> {
    let handle = spawn!("spawned_task_returns_value", async { 42 });
    assert_eq!(handle.await?, 42);
    Ok(())
}

#[lxd_test]
async fn abort_yields_cancelled_join_error() -> Result<(), Error> {
    let (_tx, rx) = oneshot::channel::<()>();
    let handle = spawn!("abort_yields_cancelled_join_error", async move {
        drop(rx.await);
    });
    handle.abort();
    let err = handle.await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(Error::from(err).code, lxd_client_error::Code::Cancelled);
    Ok(())
}

#[lxd_test]
async fn dropping_guard_aborts_task() -> Result<(), Error> {
    let finished = Arc::new(AtomicBool::new(false));
    let (started_tx, started_rx) = oneshot::channel();
    let handle = spawn!("dropping_guard_aborts_task", {
        let finished = finished.clone();
        async move {
            drop(started_tx.send(()));
            tokio::time::sleep(Duration::from_millis(200)).await;
            finished.store(true, Ordering::Release);
        }
    });
    started_rx.await.unwrap();
    drop(handle);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::Acquire), "Task should have been aborted");
    Ok(())
}
