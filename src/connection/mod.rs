//! Transport plumbing between the conversation engine and the remote service.
//!
//! A [`ConnectionSession`] owns one [`Transport`] and tracks whether it is
//! usable. The transport does the actual resolve/connect/handshake and HTTP
//! exchange; [`HttpTransport`] is the real one, [`MockTransport`] a scripted
//! stand-in for tests.

mod error;
mod http_transport;
pub mod mock;
mod session;

pub use error::{TransportError, TransportResult};
pub use http_transport::HttpTransport;
pub use mock::MockTransport;
pub use session::{ConnectionSession, Credential, SessionState};

use async_trait::async_trait;
use std::fmt;

use crate::config::EndpointConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} HTTP/1.1", self.method, self.path)?;
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("authorization") {
                writeln!(f, "{}: Bearer ***", name)?;
            } else {
                writeln!(f, "{}: {}", name, value)?;
            }
        }
        if let Some(body) = &self.body {
            writeln!(f)?;
            write!(f, "{}", body)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// The byte-moving half of a session: resolve, connect, handshake, exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolves the host, opens the connection and completes the handshake.
    async fn open(&mut self, endpoint: &EndpointConfig) -> TransportResult<()>;

    /// Whether the underlying connection is still usable.
    fn is_open(&self) -> bool;

    async fn round_trip(&mut self, request: &HttpRequest) -> TransportResult<HttpResponse>;

    async fn shutdown(&mut self) -> TransportResult<()>;
}
