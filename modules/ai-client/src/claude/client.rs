use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::types::*;
use crate::traits::RequestTag;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Error envelope returned by the Messages API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Human-readable error for a failed Messages call. Falls back to the raw
/// body when it isn't the documented envelope.
fn describe_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "Claude API error ({status}, {}): {}",
            envelope.error.kind, envelope.error.message
        ),
        Err(_) if body.trim().is_empty() => format!("Claude API error ({status})"),
        Err(_) => format!("Claude API error ({status}): {}", body.trim()),
    }
}

/// HTTP transport for the Messages API. Cloning shares the connection pool.
#[derive(Clone)]
pub(crate) struct MessagesApi {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl MessagesApi {
    pub fn new(api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.to_string(),
            http,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).context("API key is not a valid header value")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn send(&self, tag: &RequestTag, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            model = %request.model,
            module = %tag.module,
            request_type = %tag.request_type,
            turns = request.messages.len(),
            "Claude messages request"
        );

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Claude request failed ({}/{})", tag.module, tag.request_type))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(describe_error(status, &body));
        }

        response
            .json()
            .await
            .context("Failed to decode Claude response")
    }
}
