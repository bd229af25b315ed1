//! Thin HTTP wrapper over the backend endpoints.

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::api::{
    ChatReply, ChatRequest, ErrorBody, ImageReply, ImageRequest, SearchReply, SearchRequest,
};
use crate::utils::url::join_endpoint;

/// Failure of one backend call, before any transcript rendering.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Non-2xx response, with the server's `detail` text when the error
    /// body carried one.
    #[error("backend returned {status}")]
    Http {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// A success-path body that did not decode; surfaced to the user like
    /// a transport failure.
    #[error("malformed backend reply: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// In-band wording rendered into the transcript in place of an
    /// assistant reply. Callers never rethrow these.
    pub fn transcript_text(&self) -> String {
        match self {
            BackendError::Http { status, detail } => {
                let reason = detail.clone().unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .map(str::to_string)
                        .unwrap_or_else(|| status.to_string())
                });
                format!("Error: {reason}")
            }
            other => format!("Network error: {other}"),
        }
    }
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        let response = self
            .http
            .post(join_endpoint(&self.base_url, endpoint))
            .json(body)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.detail);
        Err(BackendError::Http { status, detail })
    }

    /// Whole-payload chat turn (`POST /chat`).
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        let body = self.post("chat", request).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Chunked chat turn (`POST /chat-stream`). The returned response has
    /// already passed the status check; its body yields raw assistant text
    /// bytes in arrival order.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, BackendError> {
        self.post("chat-stream", request).await
    }

    /// One-shot image generation (`POST /generate-image`); returns the
    /// image URL.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, BackendError> {
        let request = ImageRequest {
            prompt: prompt.to_string(),
        };
        let body = self.post("generate-image", &request).await?.text().await?;
        let reply: ImageReply = serde_json::from_str(&body)?;
        Ok(reply.url)
    }

    /// One-shot web search (`POST /search`); returns the result snippets.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<String>, BackendError> {
        let request = SearchRequest {
            query: query.to_string(),
            max_results,
        };
        let body = self.post("search", &request).await?.text().await?;
        let reply: SearchReply = serde_json::from_str(&body)?;
        Ok(reply.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_uses_server_detail_when_present() {
        let error = BackendError::Http {
            status: StatusCode::TOO_MANY_REQUESTS,
            detail: Some("rate limited".to_string()),
        };
        assert_eq!(error.transcript_text(), "Error: rate limited");
    }

    #[test]
    fn http_error_falls_back_to_the_status_line() {
        let error = BackendError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        };
        assert_eq!(error.transcript_text(), "Error: Internal Server Error");
    }

    #[test]
    fn decode_errors_read_as_network_failures() {
        let cause = serde_json::from_str::<ChatReply>("not json").expect_err("must fail");
        let error = BackendError::from(cause);
        assert!(error.transcript_text().starts_with("Network error: "));
    }

    #[test]
    fn error_body_detail_is_optional() {
        let parsed: ErrorBody = serde_json::from_str(r#"{"detail":"boom"}"#).expect("parse");
        assert_eq!(parsed.detail.as_deref(), Some("boom"));

        let parsed: ErrorBody = serde_json::from_str("{}").expect("parse");
        assert!(parsed.detail.is_none());
    }
}
