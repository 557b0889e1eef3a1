//! HTTP client for the protrack backend.
//!
//! All requests go through [`ApiClient`], which reads the current auth
//! token at call time and attaches it as `Authorization: Token <t>`.
//! Errors are categorized into [`ApiErrorKind`] so callers can react to
//! auth rejection (forced logout) without string matching.

use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::session::SharedToken;

/// Standard User-Agent header for protrack API requests.
pub const USER_AGENT: &str = concat!("protrack/", env!("CARGO_PKG_VERSION"));

/// Default backend base URL (local development server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV_VAR: &str = "PROTRACK_BASE_URL";

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request was rejected locally before reaching the network
    Validation,
    /// The server rejected the credentials or token (401/403)
    AuthRejected,
    /// The request never completed (DNS, connect, timeout)
    Network,
    /// The server answered with a non-2xx status other than auth
    Server,
    /// Failed to decode the response body
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Validation => write!(f, "validation"),
            ApiErrorKind::AuthRejected => write!(f, "auth_rejected"),
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Server => write!(f, "server"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the backend with kind and details.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// A request-side validation failure; never reaches the network.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    /// Categorizes an HTTP error status and extracts the backend's
    /// `detail` message from the body when present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ApiErrorKind::AuthRejected,
            _ => ApiErrorKind::Server,
        };

        let mut message = format!("HTTP {status}");
        if let Ok(json) = serde_json::from_str::<Value>(body) {
            if let Some(detail) = json.get("detail").and_then(Value::as_str) {
                message = format!("HTTP {status}: {detail}");
            } else if let Some(errors) = json.get("non_field_errors").and_then(Value::as_array)
                && let Some(first) = errors.first().and_then(Value::as_str)
            {
                message = format!("HTTP {status}: {first}");
            }
        }

        Self {
            kind,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        Self::new(ApiErrorKind::Network, format!("Request failed: {err}"))
    }

    pub fn parse(err: &dyn std::error::Error) -> Self {
        Self::new(ApiErrorKind::Parse, format!("Invalid response body: {err}"))
    }

    pub fn is_auth_rejected(&self) -> bool {
        self.kind == ApiErrorKind::AuthRejected
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Resolves the backend base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the env or config value is not a valid URL.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    // Try env var first
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(ensure_trailing_slash(trimmed));
        }
    }

    // Try config value
    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(ensure_trailing_slash(trimmed));
        }
    }

    // Default
    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

/// Relative endpoint paths join onto the base, so it must end with '/'.
fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Backend API client.
pub struct ApiClient {
    base_url: String,
    token: SharedToken,
    http: reqwest::Client,
}

impl ApiClient {
    /// Builds a client from config, resolving the base URL
    /// (PROTRACK_BASE_URL > config > default).
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &Config, token: SharedToken) -> Result<Self> {
        let base_url = resolve_base_url(
            config.base_url.as_deref(),
            BASE_URL_ENV_VAR,
            DEFAULT_BASE_URL,
        )?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the auth header when a token is present. The token is
    /// read per request, so a mid-session login/logout takes effect on
    /// the next call.
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.get() {
            Some(token) => builder.header("Authorization", format!("Token {token}")),
            None => builder,
        }
    }

    /// GET a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!(path, "GET");
        let request = self.authorize(self.http.get(self.url(path)));
        Self::read_json(request.send().await).await
    }

    /// POST a JSON body, decoding a JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        debug!(path, "POST");
        let request = self.authorize(self.http.post(self.url(path)).json(body));
        Self::read_json(request.send().await).await
    }

    /// POST with an empty body, ignoring any response payload.
    pub async fn post_empty(&self, path: &str) -> ApiResult<()> {
        debug!(path, "POST");
        let request = self.authorize(self.http.post(self.url(path)));
        Self::read_unit(request.send().await).await
    }

    /// PATCH a JSON body, decoding a JSON response.
    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        debug!(path, "PATCH");
        let request = self.authorize(self.http.patch(self.url(path)).json(body));
        Self::read_json(request.send().await).await
    }

    /// POST a multipart form, decoding a JSON response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<T> {
        debug!(path, "POST (multipart)");
        let request = self.authorize(self.http.post(self.url(path)).multipart(form));
        Self::read_json(request.send().await).await
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Result<reqwest::Response>,
    ) -> ApiResult<T> {
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|err| ApiError::parse(&err))
    }

    async fn read_unit(response: reqwest::Result<reqwest::Response>) -> ApiResult<()> {
        Self::read_body(response).await.map(|_| ())
    }

    async fn read_body(response: reqwest::Result<reqwest::Response>) -> ApiResult<String> {
        let response = response.map_err(|err| ApiError::network(&err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::network(&err))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::http_status(status.as_u16(), &body))
        }
    }
}
