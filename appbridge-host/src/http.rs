//! Outbound HTTP performed by the host on a component's behalf.
//!
//! Components run on a blocking thread, so the gateway drives async
//! `reqwest` through the ambient tokio runtime handle. Every request is
//! bounded by the time left before the invocation deadline.

use reqwest::header::{HeaderName, HeaderValue, USER_AGENT};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpGateway {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sends `request`, blocking the current thread.
    ///
    /// Must be called from a thread inside a tokio runtime context that is
    /// not itself an async task (the blocking pool qualifies).
    pub fn send(
        &self,
        request: OutboundRequest,
        deadline: Option<Instant>,
    ) -> Result<OutboundResponse, HttpError> {
        let runtime = Handle::try_current()
            .map_err(|_| HttpError::Other("no async runtime available".into()))?;

        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining == Some(Duration::ZERO) {
            return Err(HttpError::Timeout(format!(
                "{} {}: deadline already passed",
                request.method, request.url
            )));
        }

        let mut builder = self.client.request(request.method.clone(), url);
        let overrides_agent = request
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(USER_AGENT.as_str()));
        if !overrides_agent {
            builder = builder.header(USER_AGENT, &self.user_agent);
        }
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| HttpError::Other(format!("invalid header name {key:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HttpError::Other(format!("invalid header value for {key}: {e}")))?;
            builder = builder.header(name, value);
        }
        builder = builder.body(request.body);
        if let Some(remaining) = remaining {
            builder = builder.timeout(remaining);
        }

        debug!(method = %request.method, url = %request.url, "Outbound request");

        let method = request.method;
        let target = request.url;
        runtime
            .block_on(async move {
                let response = builder.send().await?;
                let status = response.status().as_u16();
                let headers = response
                    .headers()
                    .iter()
                    .map(|(k, v)| {
                        (
                            k.as_str().to_string(),
                            v.to_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>(OutboundResponse {
                    status,
                    headers,
                    body,
                })
            })
            .map_err(|e| {
                let message = format!("Request failed to {method} {target}: {e}");
                if e.is_timeout() {
                    HttpError::Timeout(message)
                } else {
                    HttpError::Other(message)
                }
            })
    }
}
