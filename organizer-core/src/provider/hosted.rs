//! Hosted backend: an Anthropic-style messages API over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OrganizerError;
use crate::provider::{LlmBackend, LlmError, LlmResponse};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
// Hosted APIs meter aggressively; keep a wide gap between requests.
const REQUEST_INTERVAL: Duration = Duration::from_secs(10);

pub struct HostedBackend {
    client: Client,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<InputMessage<'a>>,
}

#[derive(Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl HostedBackend {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
    ) -> Result<Self, OrganizerError> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(api_key)
            .map_err(|_| OrganizerError::Config("API key contains invalid characters".into()))?;
        headers.insert("x-api-key", key_value);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .user_agent("organizer/0.1")
            .default_headers(headers)
            .build()
            .map_err(|e| OrganizerError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(HostedBackend {
            client,
            model: model.to_string(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmBackend for HostedBackend {
    fn name(&self) -> &str {
        "hosted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn min_request_interval(&self) -> Duration {
        REQUEST_INTERVAL
    }

    async fn complete(&self, prompt: &str, system_prompt: &str) -> Result<LlmResponse, LlmError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: system_prompt,
            messages: vec![InputMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Unreachable(e.to_string())
                } else {
                    LlmError::Unknown(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Authentication);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimit { retry_after });
        }
        if status.is_server_error() {
            return Err(LlmError::ServerError(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::InvalidRequest(format!("HTTP {status}: {body}")));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unknown(format!("Malformed response body: {e}")))?;
        debug!(model = %message.model, "hosted completion received");

        let content = message
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        let tokens_used = message
            .usage
            .map(|u| u.input_tokens + u.output_tokens);

        Ok(LlmResponse {
            content,
            model: message.model,
            tokens_used,
            response_time: Duration::ZERO,
            finish_reason: message.stop_reason,
        })
    }
}
