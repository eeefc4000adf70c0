//! Shared HTTP plumbing

use crate::error::ClientError;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// Header carrying the user identity on every request
pub const USER_HEADER: &str = "X-User-Name";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root
    pub base_url: Url,
    /// Identity sent in [`USER_HEADER`]
    pub identity: String,
    /// Per request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for `base_url` acting as `identity`
    ///
    /// # Errors
    /// - `ClientError::Url` when `base_url` does not parse
    pub fn new(base_url: &str, identity: impl Into<String>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        // Relative joins keep the last path segment only with a trailing slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            identity: identity.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body shapes servers answer with
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default, alias = "detail", alias = "message")]
    pub(crate) error: Option<String>,
    #[serde(default, alias = "nodeId")]
    pub(crate) node_id: Option<String>,
}

impl ErrorBody {
    /// Parse a body, falling back to the raw text as the message
    pub(crate) fn parse(text: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(text) {
            Ok(body) if body.error.is_some() => body,
            _ => Self {
                error: Some(text.trim().trim_matches('"').to_string()),
                node_id: None,
            },
        }
    }

    pub(crate) fn message(&self) -> String {
        self.error.clone().unwrap_or_default()
    }
}

/// HTTP client for one server
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create client
    ///
    /// # Errors
    /// - `ClientError::Transport` when the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Connection settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of `path`, relative to the base URL
    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Request carrying `identity`
    pub(crate) fn request_as(&self, method: Method, url: Url, identity: &str) -> RequestBuilder {
        trace!(%method, %url, "request");
        self.http.request(method, url).header(USER_HEADER, identity)
    }

    /// Request carrying the configured identity
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_as(method, url, &self.config.identity)
    }

    /// Send and turn non-success statuses into [`ClientError::Status`]
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), &text))
    }

    /// Send and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        decode(&text)
    }
}

/// Status error with the message extracted from `body`
pub(crate) fn status_error(status: u16, body: &str) -> ClientError {
    let message = ErrorBody::parse(body).message();
    ClientError::Status { status, message }
}

/// Decode a JSON body, reporting shape errors as [`ClientError::Decode`]
pub(crate) fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ClientError> {
    serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8000/app", "ann").unwrap();
        let client = ApiClient::new(config).unwrap();
        assert_eq!(
            client.url("/sheets/abc").unwrap().as_str(),
            "http://localhost:8000/app/sheets/abc"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            ClientConfig::new("not a url", "ann"),
            Err(ClientError::Url(_))
        ));
    }

    #[test]
    fn error_bodies() {
        assert_eq!(status_error(409, r#"{"detail": "Locked by bob"}"#).to_string(), "HTTP 409: Locked by bob");
        assert_eq!(status_error(409, "\"Locked by bob\"").to_string(), "HTTP 409: Locked by bob");
        assert_eq!(status_error(500, "oops\n").to_string(), "HTTP 500: oops");

        let body = ErrorBody::parse(r#"{"error": "bad ref", "nodeId": "n1"}"#);
        assert_eq!(body.node_id.as_deref(), Some("n1"));
    }
}
