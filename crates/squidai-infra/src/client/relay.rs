//! Relay transport over `POST /api/chat`.

use futures_util::TryStreamExt;
use reqwest::Method;
use tracing::debug;

use squidai_core::client::transport::{ByteStream, RelayTransport, TransportError};
use squidai_types::chat::RelayRequest;

use super::{ApiClient, rejection};

pub struct HttpRelayTransport {
    api: ApiClient,
}

impl HttpRelayTransport {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl RelayTransport for HttpRelayTransport {
    async fn send(&self, request: RelayRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .api
            .request(Method::POST, "/api/chat")
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        debug!(status = response.status().as_u16(), "Relay stream opened");

        let body = response
            .bytes_stream()
            .map_err(|e| TransportError::Stream(e.without_url().to_string()));
        Ok(Box::pin(body))
    }
}
