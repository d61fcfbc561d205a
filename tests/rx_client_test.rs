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

use lxd_client::{ClientConfig, RxLxdClient};
use lxd_client_error::{Code, Error};
use lxd_client_macro::lxd_test;
use pretty_assertions::assert_eq;
use serde_json::json;

mod utils;
use utils::mock_transport::{MockTransport, error_envelope, operation, sync_envelope};

fn server_state() -> serde_json::Value {
    sync_envelope(json!({
        "api_version": "1.0",
        "auth": "trusted",
        "environment": {"driver": "lxc"},
    }))
}

#[lxd_test]
async fn nothing_is_sent_before_await() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.set_fallback_json(200, &server_state());
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    let single = client.server_status();
    tokio::task::yield_now().await;
    assert_eq!(transport.request_count(), 0);

    let state = single.clone().await?;
    assert_eq!(state.auth, "trusted");
    assert_eq!(transport.request_count(), 1);

    // Every await is its own request.
    single.await?;
    assert_eq!(transport.request_count(), 2);
    Ok(())
}

#[lxd_test]
async fn subscribe_delivers_value() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.set_fallback_json(200, &server_state());
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    let first = client.server_status().subscribe();
    let second = client.server_status().subscribe();
    let (first, second) = (first.await?, second.await?);

    assert_eq!(first, second);
    assert_eq!(first.environment.driver, "lxc");
    assert_eq!(transport.request_count(), 2);
    Ok(())
}

#[lxd_test]
async fn not_found_travels_through_failure_channel() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.push_json(404, &error_envelope(404, "not found"));
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    let err = client.server_status().subscribe().await.unwrap_err();

    assert_eq!(err.code, Code::Api);
    assert_eq!(err.http_status, Some(404));
    assert_eq!(transport.request_count(), 1);
    Ok(())
}

#[lxd_test]
async fn bare_not_found_travels_through_failure_channel() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.push_raw(404, "");
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    let err = client.server_status().await.unwrap_err();

    assert_eq!(err.code, Code::Api);
    assert_eq!(err.http_status, Some(404));
    assert_eq!(err.status_code, Some(404));
    assert_eq!(transport.request_count(), 1);
    Ok(())
}

#[lxd_test]
async fn optional_lookup_yields_none() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.push_json(404, &error_envelope(404, "not found"));
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    assert_eq!(client.container_state("ghost").await?, None);
    Ok(())
}

#[lxd_test]
async fn cancelled_subscription_stops_polling() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.set_fallback_json(200, &operation("op-1", "Running", 103, "", json!(null)));
    transport.set_delay(Duration::from_millis(10));
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    let subscription = client.operation_wait("op-1").subscribe();
    tokio::time::sleep(Duration::from_millis(50)).await;
    subscription.cancel();
    let polls = transport.request_count();
    assert!(polls >= 1, "Expected the follower to have started polling");

    let err = subscription.await.unwrap_err();
    assert_eq!(err.code, Code::Cancelled);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.request_count(), polls);
    Ok(())
}

#[lxd_test]
async fn dropped_subscription_stops_polling() -> Result<(), Error> {
    let transport = MockTransport::new();
    transport.set_fallback_json(200, &operation("op-1", "Running", 103, "", json!(null)));
    transport.set_delay(Duration::from_millis(10));
    let client = RxLxdClient::with_transport(ClientConfig::local_access(), transport.clone());

    let subscription = client.operation_wait("op-1").subscribe();
    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(subscription);
    let polls = transport.request_count();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.request_count(), polls);
    Ok(())
}
