//! Shared HTTP client for upstream sports APIs.
//!
//! Wraps `reqwest` with a per-provider timeout and translates HTTP and
//! transport failures into the engine's error taxonomy. Adapters never
//! look at status codes themselves.

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{EngineError, EngineResult};

const USER_AGENT: &str = "sportsfeed/0.1.0";

/// Longest slice of an error body kept in log lines.
const MAX_BODY_LOG: usize = 200;

pub struct UpstreamClient {
    http: Client,
    provider: &'static str,
}

impl UpstreamClient {
    pub fn new(provider: &'static str, timeout: Duration) -> EngineResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build {provider} HTTP client: {e}")))?;
        Ok(Self { http, provider })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: HeaderMap,
    ) -> EngineResult<serde_json::Value> {
        self.get_json_opt(url, params, headers)
            .await?
            .ok_or_else(|| EngineError::MalformedPayload {
                provider: self.provider.to_string(),
                message: format!("no content at {url}"),
            })
    }

    /// Like [`get_json`](Self::get_json), but a 404, a 204 or an empty
    /// body is `Ok(None)` rather than an error.
    pub async fn get_json_opt(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: HeaderMap,
    ) -> EngineResult<Option<serde_json::Value>> {
        debug!(provider = self.provider, url, "Fetching upstream");

        let resp = self
            .http
            .get(url)
            .query(params)
            .headers(headers)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            debug!(provider = self.provider, url, %status, "Upstream has no content");
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = classify_status(self.provider, status, &body);
            warn!(provider = self.provider, %status, error = %err, "Upstream request failed");
            return Err(err);
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| EngineError::MalformedPayload {
                provider: self.provider.to_string(),
                message: format!("response is not valid JSON: {e}"),
            })
    }

    fn transport_error(&self, e: reqwest::Error) -> EngineError {
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else {
            e.to_string()
        };
        EngineError::UpstreamUnreachable {
            provider: self.provider.to_string(),
            message,
        }
    }
}

/// Map a non-success HTTP status to an engine error.
pub fn classify_status(provider: &str, status: StatusCode, body: &str) -> EngineError {
    let provider = provider.to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => EngineError::UpstreamRateLimited { provider },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EngineError::UpstreamAuthFailed {
            provider,
            status: status.as_u16(),
        },
        s if s.is_server_error() => EngineError::UpstreamUnreachable {
            provider,
            message: format!("HTTP {s}"),
        },
        s => EngineError::MalformedPayload {
            provider,
            message: format!("HTTP {s}: {}", truncate(body, MAX_BODY_LOG)),
        },
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
