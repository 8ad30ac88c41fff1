//! HTTP client side of the SquidAI API, used by the terminal chat.

pub mod persistence;
pub mod relay;

pub use persistence::HttpChatPersistence;
pub use relay::HttpRelayTransport;

use serde::Deserialize;

use squidai_core::client::controller::ClientIdentity;
use squidai_core::client::transport::TransportError;

/// Headers the server reads the caller's identity from.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Base URL, shared connection pool and identity for API calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    identity: ClientIdentity,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, identity: ClientIdentity) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(user_id) = &self.identity.user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        if let Some(email) = &self.identity.email {
            builder = builder.header(USER_EMAIL_HEADER, email);
        }
        builder
    }
}

/// `{ error, hint?, retryAfterMs? }` error body returned by the server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    retry_after_ms: Option<u64>,
}

/// Turn a non-success response into a [`TransportError::Rejected`].
async fn rejection(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let header_delay = retry_after_header_ms(response.headers());
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => TransportError::Rejected {
            status,
            message: parsed.error,
            hint: parsed.hint,
            retry_after_ms: parsed.retry_after_ms.or(header_delay),
        },
        Err(_) => TransportError::Rejected {
            status,
            message: default_rejection_message(status),
            hint: None,
            retry_after_ms: header_delay,
        },
    }
}

/// `Retry-After` in delay-seconds form, as milliseconds.
fn retry_after_header_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs * 1000)
}

fn default_rejection_message(status: u16) -> String {
    match status {
        429 => "Rate limit reached. Please wait a few seconds and try again.".to_string(),
        _ => format!("Server error: {status}"),
    }
}
