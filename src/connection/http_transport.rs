use async_trait::async_trait;
use std::net::SocketAddr;

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError, TransportResult};
use crate::config::EndpointConfig;

/// HTTP/1.1 transport over reqwest, pinned to the address resolved at
/// connect time and keeping a single idle connection alive between turns.
///
/// `is_open` does not probe the socket. reqwest redials a pooled connection
/// the peer has closed, so "closed" here means the last dial failed.
#[derive(Default)]
pub struct HttpTransport {
    client: Option<reqwest::Client>,
    base_url: String,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn resolve(endpoint: &EndpointConfig) -> TransportResult<SocketAddr> {
        let resolve_error = |message: String| TransportError::Resolve {
            host: endpoint.host.clone(),
            port: endpoint.port,
            message,
        };

        tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| resolve_error(e.to_string()))?
            .next()
            .ok_or_else(|| resolve_error("no addresses found".to_string()))
    }

    fn build_client(endpoint: &EndpointConfig, addr: SocketAddr) -> TransportResult<reqwest::Client> {
        let mut client_builder = reqwest::Client::builder()
            .http1_only()
            .pool_max_idle_per_host(1)
            .connect_timeout(endpoint.connect_timeout())
            .timeout(endpoint.request_timeout())
            .resolve(&endpoint.host, addr);

        if let Ok(http_proxy) = std::env::var("HTTP_PROXY") {
            if let Ok(proxy) = reqwest::Proxy::http(&http_proxy) {
                client_builder = client_builder.proxy(proxy);
            }
        }

        if let Ok(https_proxy) = std::env::var("HTTPS_PROXY") {
            if let Ok(proxy) = reqwest::Proxy::https(&https_proxy) {
                client_builder = client_builder.proxy(proxy);
            }
        }

        client_builder
            .build()
            .map_err(|e| TransportError::Handshake(format!("Failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&mut self, endpoint: &EndpointConfig) -> TransportResult<()> {
        self.client = None;

        let addr = Self::resolve(endpoint).await?;
        let client = Self::build_client(endpoint, addr)?;
        let base_url = endpoint.base_url();

        // Any status at all means TCP and TLS are up; the pooled connection is reused.
        client
            .head(&base_url)
            .send()
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        self.client = Some(client);
        self.base_url = base_url;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn round_trip(&mut self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => client.get(&url),
            Method::Post => client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_connect() {
                    self.client = None;
                }
                return Err(TransportError::Write(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Read(e.to_string()))?;

        Ok(HttpResponse::new(status, body))
    }

    async fn shutdown(&mut self) -> TransportResult<()> {
        self.client = None;
        Ok(())
    }
}
