//! Analysis API Gateway
//!
//! Access to the remote analysis service through a trait, so the Conductor
//! can be driven by a mock in tests and by [`HttpGateway`] in the binary.
//!
//! # Endpoints
//!
//! - `GET /api/market_pulse` - market snapshot rows for the sidebar
//! - `POST /api/chat` - one question about one ticker
//!
//! There is no retry and no caching. A client-level timeout bounds hung
//! requests.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::messages::{ChatReply, ChatRequest, MarketPulseItem, PricePoint};

/// Errors from the analysis API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, reset)
    #[error("Request failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The body was not the expected JSON
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Analysis API trait
///
/// Implement this trait to plug in a different transport or a test double.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Gateway name for logs
    fn name(&self) -> &str;

    /// Fetch the market snapshot rows
    async fn fetch_market_pulse(&self) -> Result<Vec<MarketPulseItem>, ApiError>;

    /// Send one chat request and wait for the answer
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;
}

/// Wire format of a `/api/chat` answer
#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    response: String,
    #[serde(default)]
    ticker_display: Option<String>,
    #[serde(default)]
    chart_data: Option<Vec<PricePoint>>,
}

impl From<ChatResponseBody> for ChatReply {
    fn from(body: ChatResponseBody) -> Self {
        Self {
            response_text: body.response,
            display_ticker: body.ticker_display,
            chart_data: body.chart_data,
        }
    }
}

/// HTTP gateway over `reqwest`
#[derive(Clone)]
pub struct HttpGateway {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway for a base URL
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Connection`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url: String = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Create from [`ApiConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Connection`] if the HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn market_pulse_url(&self) -> String {
        format!("{}/api/market_pulse", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Check the status, then decode the body
    async fn decode<T>(response: reqwest::Response) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AnalysisApi for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_market_pulse(&self) -> Result<Vec<MarketPulseItem>, ApiError> {
        let response = self.http_client.get(self.market_pulse_url()).send().await?;
        Self::decode(response).await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        tracing::debug!(ticker = %request.ticker, url = %self.chat_url(), "Sending chat request");

        let response = self
            .http_client
            .post(self.chat_url())
            .json(request)
            .send()
            .await?;

        let body: ChatResponseBody = Self::decode(response).await?;
        Ok(body.into())
    }
}
