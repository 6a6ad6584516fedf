use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::{HttpRequest, HttpResponse, Transport, TransportError, TransportResult};
use crate::config::EndpointConfig;
use crate::console::console;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Bearer token for the remote service. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

/// Owns the transport to the chat service and its connection state.
///
/// `Disconnected -> Connecting -> Connected`, and back to `Disconnected`
/// whenever the transport reports the connection closed. Nothing here
/// reconnects on its own; callers decide when to call [`connect`] again.
///
/// [`connect`]: ConnectionSession::connect
pub struct ConnectionSession {
    endpoint: EndpointConfig,
    credential: Credential,
    transport: Box<dyn Transport>,
    state: SessionState,
}

impl ConnectionSession {
    pub fn new(
        endpoint: EndpointConfig,
        credential: Credential,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            endpoint,
            credential,
            transport,
            state: SessionState::Disconnected,
        }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Resolves, connects and handshakes. On failure the session stays
    /// `Disconnected` and the error is returned; there is no retry.
    pub async fn connect(&mut self) -> TransportResult<()> {
        console().connecting(&self.endpoint.host, self.endpoint.port);
        self.state = SessionState::Connecting;

        let limit = self.endpoint.connect_timeout();
        let outcome = with_timeout(limit, "connect", self.transport.open(&self.endpoint)).await;

        match outcome {
            Ok(()) => {
                self.state = SessionState::Connected;
                console().connected();
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                console().error(&format!("Failed to connect: {}", e));
                Err(e)
            }
        }
    }

    /// Re-checks the live connection. Downgrades to `Disconnected` when the
    /// transport reports it closed.
    pub fn is_connected(&mut self) -> bool {
        if self.state == SessionState::Connected && !self.transport.is_open() {
            console().connection_closed();
            self.state = SessionState::Disconnected;
        }
        self.state == SessionState::Connected
    }

    /// Sends one request with auth headers attached and waits for the full
    /// response.
    pub async fn send(&mut self, mut request: HttpRequest) -> TransportResult<HttpResponse> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        request.set_header("User-Agent", USER_AGENT);
        request.set_header(
            "Authorization",
            format!("Bearer {}", self.credential.expose()),
        );
        if request.body.is_some() {
            request.set_header("Content-Type", "application/json");
        }
        console().dump("Request", &request.to_string());

        let limit = self.endpoint.request_timeout();
        let result = with_timeout(limit, "request", self.transport.round_trip(&request)).await;

        if !self.transport.is_open() {
            self.state = SessionState::Disconnected;
        }

        if let Ok(response) = &result {
            console().debug(&format!("Response status: {}", response.status));
            console().dump("Response body", &response.body);
        }
        result
    }

    /// Tears the connection down at session end. Errors are logged only.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.transport.shutdown().await {
            console().warning(&format!("Error while closing connection: {}", e));
        }
        self.state = SessionState::Disconnected;
    }
}

async fn with_timeout<T, F>(limit: Duration, operation: &str, future: F) -> TransportResult<T>
where
    F: Future<Output = TransportResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::timeout(operation, limit.as_secs())),
    }
}
