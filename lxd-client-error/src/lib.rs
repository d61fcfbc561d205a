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

#[macro_export]
macro_rules! make_err {
    ($code:expr, $($arg:tt)+) => {{
        $crate::Error::new(
            $code,
            format!("{}", format_args!($($arg)+)),
        )
    }};
}

#[macro_export]
macro_rules! make_input_err {
    ($($arg:tt)+) => {{
        $crate::make_err!($crate::Code::InvalidArgument, $($arg)+)
    }};
}

#[macro_export]
macro_rules! error_if {
    ($cond:expr, $($arg:tt)+) => {{
        if $cond {
            Err($crate::make_err!($crate::Code::InvalidArgument, $($arg)+))?;
        }
    }};
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Error {
    pub code: Code,
    pub messages: Vec<String>,
    /// HTTP status of the daemon response this error was built from.
    pub http_status: Option<u16>,
    /// The daemon's own code: `error_code` of an error envelope, or the
    /// `status_code` of a failed operation.
    pub status_code: Option<i64>,
}

impl Error {
    pub fn new(code: Code, msg: String) -> Self {
        let mut msgs = Vec::with_capacity(1);
        if !msg.is_empty() {
            msgs.push(msg);
        }
        Self {
            code,
            messages: msgs,
            http_status: None,
            status_code: None,
        }
    }

    /// An `error` envelope returned by the daemon.
    pub fn api(http_status: u16, error_code: i64, message: &str) -> Self {
        Self {
            http_status: Some(http_status),
            status_code: Some(error_code),
            ..make_err!(Code::Api, "{message}")
        }
    }

    /// A response outside of the expected status set that carried no error
    /// envelope.
    pub fn unexpected_status(http_status: u16, body: &str) -> Self {
        Self {
            http_status: Some(http_status),
            ..make_err!(
                Code::UnexpectedStatus,
                "Unexpected HTTP status {http_status}: {body}"
            )
        }
    }

    /// An asynchronous operation that reached a non-success terminal state.
    pub fn operation_failed(status_code: i64, message: &str) -> Self {
        Self {
            status_code: Some(status_code),
            ..make_err!(Code::OperationFailed, "{message}")
        }
    }

    #[inline]
    #[must_use]
    pub fn append<S: ToString>(mut self, msg: S) -> Self {
        self.messages.push(msg.to_string());
        self
    }

    /// True when the daemon answered with a 404 error envelope.
    pub fn is_not_found(&self) -> bool {
        self.code == Code::Api && self.http_status == Some(404)
    }

    pub fn message_string(&self) -> String {
        self.messages.join(" : ")
    }

    pub fn to_std_err(self) -> std::io::Error {
        std::io::Error::new(self.code.into(), self.messages.join(" : "))
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A manual impl to reduce the noise of frequently empty fields.
        let mut builder = f.debug_struct("Error");

        builder.field("code", &self.code);

        if let Some(http_status) = self.http_status {
            builder.field("http_status", &http_status);
        }
        if let Some(status_code) = self.status_code {
            builder.field("status_code", &status_code);
        }
        if !self.messages.is_empty() {
            builder.field("messages", &self.messages);
        }

        builder.finish()
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        make_err!(Code::Decode, "{msg}")
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        make_err!(Code::InvalidArgument, "{msg}")
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => make_err!(Code::Transport, "{err}"),
            _ => make_err!(Code::Decode, "{err}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        let code = if err.is_timeout() {
            Code::DeadlineExceeded
        } else if err.is_canceled() {
            Code::Cancelled
        } else {
            Code::Transport
        };
        make_err!(code, "{err}")
    }
}

impl From<hyper_util::client::legacy::Error> for Error {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        // The Display impl of this error hides the root cause, so walk
        // the source chain.
        let mut msg = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        make_err!(Code::Transport, "{msg}")
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        make_err!(Code::InvalidArgument, "{err}")
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        make_err!(Code::InvalidArgument, "{err}")
    }
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        make_err!(Code::Transport, "{err}")
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        make_err!(Code::DeadlineExceeded, "{err}")
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return make_err!(Code::Cancelled, "{err}");
        }
        make_err!(Code::Internal, "{err}")
    }
}

impl From<Code> for Error {
    fn from(code: Code) -> Self {
        make_err!(code, "")
    }
}

pub trait ResultExt<T> {
    fn err_tip_with_code<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        Self: Sized,
        S: ToString,
        F: (FnOnce(&Error) -> (Code, S)) + Sized;

    #[inline]
    fn err_tip<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        Self: Sized,
        S: ToString,
        F: (FnOnce() -> S) + Sized,
    {
        self.err_tip_with_code(|e| (e.code, tip_fn()))
    }
}

impl<T, E: Into<Error>> ResultExt<T> for Result<T, E> {
    #[inline]
    fn err_tip_with_code<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        Self: Sized,
        S: ToString,
        F: (FnOnce(&Error) -> (Code, S)) + Sized,
    {
        self.map_err(|e| {
            let mut error: Error = e.into();
            let (code, message) = tip_fn(&error);
            error.code = code;
            error.messages.push(message.to_string());
            error
        })
    }
}

impl<T> ResultExt<T> for Option<T> {
    #[inline]
    fn err_tip_with_code<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        Self: Sized,
        S: ToString,
        F: (FnOnce(&Error) -> (Code, S)) + Sized,
    {
        self.ok_or_else(|| {
            let mut error = Error::from(Code::Internal);
            let (code, message) = tip_fn(&error);
            error.code = code;
            error.messages.push(message.to_string());
            error
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive] // New Codes may be added in the future, so never exhaustively match!
pub enum Code {
    /// Connection, TLS or protocol failure talking to the daemon.
    Transport,
    /// The request was cancelled before a response was observed.
    Cancelled,
    /// The per-request deadline expired.
    DeadlineExceeded,
    /// Malformed JSON or a body that is not an envelope.
    Decode,
    /// HTTP status outside of the expected set, without an error envelope.
    UnexpectedStatus,
    /// The daemon returned an `error` envelope.
    Api,
    /// An asynchronous operation ended in failure or was cancelled.
    OperationFailed,
    /// Container creation referenced an image the daemon does not have.
    LocalImageNotFound,
    InvalidArgument,
    Internal,
}

impl Code {
    /// Codes raised by the connection layer rather than by the daemon.
    pub const fn is_transport(self) -> bool {
        matches!(self, Self::Transport | Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<std::io::ErrorKind> for Code {
    fn from(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::TimedOut => Self::DeadlineExceeded,
            std::io::ErrorKind::Interrupted => Self::Cancelled,
            std::io::ErrorKind::InvalidInput => Self::InvalidArgument,
            std::io::ErrorKind::InvalidData => Self::Decode,
            _ => Self::Transport,
        }
    }
}

impl From<Code> for std::io::ErrorKind {
    fn from(kind: Code) -> Self {
        match kind {
            Code::Cancelled => Self::Interrupted,
            Code::DeadlineExceeded => Self::TimedOut,
            Code::InvalidArgument => Self::InvalidInput,
            Code::Decode => Self::InvalidData,
            Code::LocalImageNotFound => Self::NotFound,
            Code::Transport => Self::ConnectionRefused,
            _ => Self::Other,
        }
    }
}
