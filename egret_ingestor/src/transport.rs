//! HTTP transport for dispatching import requests to cluster nodes.

use async_trait::async_trait;
use bytes::Bytes;
use egret_core::topology::NodeAddress;
use snafu::Snafu;

/// Errors returned by the transport.
///
/// `Connection` failures never reached the server and may be retried
/// against another node; `Status` responses are the server's verdict on
/// the payload and are terminal.
#[derive(Debug, Clone, Snafu)]
pub enum TransportError {
    #[snafu(display("connection error: {message}"))]
    Connection { message: String },
    #[snafu(display("server returned status {status}: {message}"))]
    Status { status: u16, message: String },
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;

/// The transport trait sends bytes to a node and returns the response body.
#[async_trait]
pub trait ImportTransport: Send + Sync {
    /// POST a payload to `path` on the given node.
    async fn post(
        &self,
        address: &NodeAddress,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<Bytes>;
}

/// Transport over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpImportTransport {
    client: reqwest::Client,
}

impl HttpImportTransport {
    /// Create a new transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new transport over an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImportTransport for HttpImportTransport {
    async fn post(
        &self,
        address: &NodeAddress,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<Bytes> {
        let url = format!("{}{}", address.uri(), path);

        let mut request = self.client.post(&url).body(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Connection {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .bytes()
                .await
                .map_err(|err| TransportError::Connection {
                    message: err.to_string(),
                });
        }

        let message = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
