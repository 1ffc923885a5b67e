//! Blocking HTTP client shared by every endpoint group.
//!
//! One request per call: no retries, no backoff. Non-2xx responses become
//! [`ApiError`] with the server's `{ "error": ... }` message.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// REST client for the trading API.
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("tradedash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Client against an arbitrary base URL with default settings.
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let mut config = ClientConfig::default().with_base_url(base_url);
        config.validate()?;
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        match &self.token {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// Send and return the raw body of a successful response.
    fn execute(&self, method: Method, path: &str, rb: RequestBuilder) -> Result<String, ApiError> {
        debug!(%method, path, "api request");
        let resp = rb.send().map_err(|e| {
            warn!(%method, path, error = %e, "api request failed to send");
            ApiError::from(e)
        })?;
        let status = resp.status();
        let body = resp.text().map_err(ApiError::from)?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            warn!(%method, path, status = status.as_u16(), error = %err, "api request rejected");
            return Err(err);
        }
        debug!(%method, path, status = status.as_u16(), bytes = body.len(), "api response");
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
        let text = if body.trim().is_empty() { "null" } else { body };
        serde_json::from_str(text).map_err(|e| {
            warn!(path, error = %e, "api response did not match expected shape");
            ApiError::Decode(format!("{path}: {e}"))
        })
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.execute(Method::GET, path, self.request(Method::GET, path))?;
        Self::decode(path, &body)
    }

    pub(crate) fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let rb = self.request(Method::GET, path).query(query);
        let body = self.execute(Method::GET, path, rb)?;
        Self::decode(path, &body)
    }

    pub(crate) fn send_json<B, T>(&self, method: Method, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let rb = self.request(method.clone(), path).json(payload);
        let body = self.execute(method, path, rb)?;
        Self::decode(path, &body)
    }

    pub(crate) fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, payload)
    }

    /// Call for side effects only; the response body is discarded.
    pub(crate) fn fire(&self, method: Method, path: &str) -> Result<(), ApiError> {
        self.execute(method.clone(), path, self.request(method, path))
            .map(|_| ())
    }

    pub(crate) fn fire_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
    ) -> Result<(), ApiError> {
        let rb = self.request(method.clone(), path).json(payload);
        self.execute(method, path, rb).map(|_| ())
    }

    pub(crate) fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.execute(Method::DELETE, path, self.request(Method::DELETE, path))?;
        Self::decode(path, &body)
    }
}

/// Escape a caller-supplied id or symbol for use as one path segment.
pub(crate) fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.trim().bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = ApiClient::with_base_url("http://localhost:4000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:4000/api");
        assert_eq!(client.url("/orders"), "http://localhost:4000/api/orders");
    }

    #[test]
    fn empty_token_is_no_token() {
        let mut client = ApiClient::with_base_url("http://localhost:4000/api").unwrap();
        client.set_token(Some(String::new()));
        assert!(!client.is_authenticated());
        client.set_token(Some("abc".into()));
        assert_eq!(client.token(), Some("abc"));
    }

    #[test]
    fn segments_are_escaped() {
        assert_eq!(segment("BRK.B"), "BRK.B");
        assert_eq!(segment("BTC/USD"), "BTC%2FUSD");
        assert_eq!(segment(" 42 "), "42");
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let v: Option<serde_json::Value> = ApiClient::decode("/x", "  ").unwrap();
        assert!(v.is_none());
    }
}
