//! Caller identity extractor.
//!
//! Sign-in is handled by a fronting identity provider, which forwards the
//! authenticated user as `x-user-id` / `x-user-email`. Requests without a
//! user id are guests.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use squidai_infra::client::{USER_EMAIL_HEADER, USER_ID_HEADER};

/// Who is calling. Never rejects; missing headers mean guest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            user_id: header(USER_ID_HEADER),
            email: header(USER_EMAIL_HEADER),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("u1"));
        headers.insert("x-user-email", HeaderValue::from_static("a@b.c"));
        let identity = Identity::from_headers(&headers);
        assert_eq!(identity.user_id(), Some("u1"));
        assert_eq!(identity.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn blank_headers_mean_guest() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("  "));
        assert_eq!(Identity::from_headers(&headers), Identity::default());
    }
}
