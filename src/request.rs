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

//! Composition of a single daemon request.

use bytes::Bytes;
use http::Method;
use http::header::{CONTENT_TYPE, HeaderValue};
use lxd_client_error::{Error, ResultExt};
use serde::Serialize;

use crate::envelope;

/// Every path is relative to this prefix.
pub const API_PREFIX: &str = "/1.0";

const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// A finalized request. It is consumed by `RequestContext::execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
    expected: Vec<u16>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::DELETE, path)
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// HTTP status codes that count as success for this request.
    pub fn expected(&self) -> &[u16] {
        &self.expected
    }

    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Absolute path plus query, e.g. `/1.0/containers?recursion=1`. Each
    /// path segment and query component is percent-encoded, so a name can
    /// never change which resource is addressed.
    pub fn path_and_query(&self) -> String {
        let mut target = API_PREFIX.to_string();
        if !self.path.is_empty() {
            for segment in self.path.split('/') {
                target.push('/');
                target.push_str(&urlencoding::encode(segment));
            }
        }
        for (i, (key, value)) in self.query.iter().enumerate() {
            target.push(if i == 0 { '?' } else { '&' });
            target.push_str(&urlencoding::encode(key));
            target.push('=');
            target.push_str(&urlencoding::encode(value));
        }
        target
    }

    /// Splits the request into what goes on the wire and the set of
    /// expected status codes.
    pub fn into_http(self) -> Result<(http::Request<Bytes>, Vec<u16>), Error> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.path_and_query());
        if self.body.is_some() {
            builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let request = builder
            .body(self.body.unwrap_or_default())
            .err_tip(|| format!("While building request for {}", self.path))?;
        Ok((request, self.expected))
    }
}

/// Fluent construction of a `Request`.
#[derive(Debug, Clone)]
#[must_use]
pub struct RequestBuilder {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
    expected: Vec<u16>,
}

impl RequestBuilder {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into().trim_matches('/').to_string(),
            query: Vec::new(),
            body: None,
            expected: Vec::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attaches a JSON body.
    pub fn body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(envelope::encode(body)?);
        Ok(self)
    }

    /// Adds status codes to the set treated as success. Without any call
    /// the set is `{200}`.
    pub fn expect(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        for code in codes {
            if !self.expected.contains(&code) {
                self.expected.push(code);
            }
        }
        self
    }

    pub fn build(self) -> Request {
        let expected = if self.expected.is_empty() {
            vec![DEFAULT_EXPECTED_STATUS]
        } else {
            self.expected
        };
        Request {
            method: self.method,
            path: self.path,
            query: self.query,
            body: self.body,
            expected,
        }
    }
}
