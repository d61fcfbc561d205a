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

use http::Method;
use http::header::CONTENT_TYPE;
use lxd_client::Request;
use lxd_client_error::Error;
use pretty_assertions::assert_eq;

#[test]
fn defaults_to_expecting_200() {
    let request = Request::get("").build();
    assert_eq!(request.path_and_query(), "/1.0");
    assert_eq!(request.expected(), &[200]);
    assert_eq!(request.body(), None);
}

#[test]
fn query_parameters_are_appended_in_order() {
    let request = Request::get("operations/op-1/wait")
        .query("timeout", 5)
        .query("project", "default")
        .build();
    assert_eq!(
        request.path_and_query(),
        "/1.0/operations/op-1/wait?timeout=5&project=default"
    );
}

#[test]
fn expect_replaces_default_and_dedups() {
    let request = Request::get("containers/c1")
        .expect([200, 404])
        .expect([404])
        .build();
    assert_eq!(request.expected(), &[200, 404]);
}

#[test]
fn body_sets_content_type() -> Result<(), Error> {
    let request = Request::put("/containers/c1/state/")
        .body(&serde_json::json!({"action": "start"}))?
        .expect([202])
        .build();
    let (http_request, expected) = request.into_http()?;
    assert_eq!(http_request.method(), Method::PUT);
    assert_eq!(http_request.uri(), "/1.0/containers/c1/state");
    assert_eq!(
        http_request.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(http_request.body().as_ref(), br#"{"action":"start"}"#);
    assert_eq!(expected, vec![202]);
    Ok(())
}

#[test]
fn bodiless_request_has_no_content_type() -> Result<(), Error> {
    let (http_request, _) = Request::delete("images/FP1").expect([202]).build().into_http()?;
    assert_eq!(http_request.method(), Method::DELETE);
    assert!(http_request.headers().get(CONTENT_TYPE).is_none());
    assert!(http_request.body().is_empty());
    Ok(())
}

#[test]
fn reserved_characters_are_percent_encoded() -> Result<(), Error> {
    let request = Request::get("images/aliases/a?b#c d")
        .query("filter", "name=x&y")
        .build();
    assert_eq!(
        request.path_and_query(),
        "/1.0/images/aliases/a%3Fb%23c%20d?filter=name%3Dx%26y"
    );
    let (http_request, _) = request.into_http()?;
    assert_eq!(http_request.uri().path(), "/1.0/images/aliases/a%3Fb%23c%20d");
    assert_eq!(http_request.uri().query(), Some("filter=name%3Dx%26y"));
    Ok(())
}

#[test]
fn slashes_still_separate_segments() {
    let request = Request::get("images/aliases/ubuntu/22.04").build();
    assert_eq!(request.path_and_query(), "/1.0/images/aliases/ubuntu/22.04");
}
