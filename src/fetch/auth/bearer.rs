use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// Access token returned by the upstream auth exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// An [`HttpClient`] wrapper that sends `Authorization: Bearer <token>`.
///
/// Built per request batch from a borrowed base client, so one long-lived
/// client can be reused across token refreshes.
pub struct BearerToken<'a, C: ?Sized> {
    pub inner: &'a C,
    pub token: &'a AccessToken,
}

impl<'a, C: ?Sized> BearerToken<'a, C> {
    pub fn new(inner: &'a C, token: &'a AccessToken) -> Self {
        Self { inner, token }
    }
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for BearerToken<'_, C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        // Tokens are opaque ASCII; anything else is left off and the request
        // fails upstream with a 401.
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.token.as_str())) {
            req.headers_mut().insert(AUTHORIZATION, value);
        }
        self.inner.execute(req).await
    }
}
