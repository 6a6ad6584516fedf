use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{HttpRequest, HttpResponse, Transport, TransportError, TransportResult};
use crate::config::EndpointConfig;

enum Scripted {
    Response(HttpResponse),
    Error(TransportError),
    Disconnect,
}

#[derive(Default)]
struct MockState {
    open: bool,
    hang_on_open: bool,
    next_open_error: Option<TransportError>,
    script: VecDeque<Scripted>,
    requests: Vec<HttpRequest>,
    open_calls: usize,
    shutdown_calls: usize,
}

/// Scripted transport. Clones share state, so a test can keep a handle after
/// boxing one into a session.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.state()
            .script
            .push_back(Scripted::Response(HttpResponse::new(status, body)));
    }

    pub fn push_error(&self, error: TransportError) {
        self.state().script.push_back(Scripted::Error(error));
    }

    /// The next request fails and leaves the connection closed.
    pub fn push_disconnect(&self) {
        self.state().script.push_back(Scripted::Disconnect);
    }

    pub fn fail_next_open(&self, error: TransportError) {
        self.state().next_open_error = Some(error);
    }

    pub fn hang_on_open(&self) {
        self.state().hang_on_open = true;
    }

    /// Simulates the peer closing the connection.
    pub fn close(&self) {
        self.state().open = false;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    pub fn open_calls(&self) -> usize {
        self.state().open_calls
    }

    pub fn shutdown_calls(&self) -> usize {
        self.state().shutdown_calls
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self, _endpoint: &EndpointConfig) -> TransportResult<()> {
        let hang = {
            let mut state = self.state();
            state.open_calls += 1;
            if let Some(error) = state.next_open_error.take() {
                state.open = false;
                return Err(error);
            }
            state.hang_on_open
        };

        if hang {
            std::future::pending::<()>().await;
        }

        self.state().open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    async fn round_trip(&mut self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let mut state = self.state();
        if !state.open {
            return Err(TransportError::NotConnected);
        }
        state.requests.push(request.clone());

        match state.script.pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error(error)) => Err(error),
            Some(Scripted::Disconnect) => {
                state.open = false;
                Err(TransportError::Read("connection reset by peer".to_string()))
            }
            None => Err(TransportError::Read("no scripted response".to_string())),
        }
    }

    async fn shutdown(&mut self) -> TransportResult<()> {
        let mut state = self.state();
        state.shutdown_calls += 1;
        state.open = false;
        Ok(())
    }
}
