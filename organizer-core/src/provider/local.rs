//! Local backend: an Ollama-style generate API on localhost.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::OrganizerError;
use crate::provider::{LlmBackend, LlmError, LlmResponse};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const REQUEST_INTERVAL: Duration = Duration::from_millis(50);

pub struct LocalBackend {
    client: Client,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    done_reason: Option<String>,
}

impl LocalBackend {
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self, OrganizerError> {
        let client = Client::builder()
            .user_agent("organizer/0.1")
            .build()
            .map_err(|e| OrganizerError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(LocalBackend {
            client,
            model: model.to_string(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn min_request_interval(&self) -> Duration {
        REQUEST_INTERVAL
    }

    async fn complete(&self, prompt: &str, system_prompt: &str) -> Result<LlmResponse, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Unreachable(format!(
                        "Cannot reach local model server at {}: {e}",
                        self.base_url
                    ))
                } else {
                    LlmError::Unknown(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LlmError::InvalidRequest(format!(
                "Model '{}' not found on the local server",
                self.model
            )));
        }
        if status.is_server_error() {
            return Err(LlmError::ServerError(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::InvalidRequest(format!("HTTP {status}: {body}")));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unknown(format!("Malformed response body: {e}")))?;

        let model = if generated.model.is_empty() {
            self.model.clone()
        } else {
            generated.model
        };

        Ok(LlmResponse {
            content: generated.response,
            model,
            tokens_used: generated.eval_count,
            response_time: Duration::ZERO,
            finish_reason: generated.done_reason,
        })
    }
}
