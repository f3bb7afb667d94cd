//! Chat completions client

use super::{GenerationProvider, GenerationRequest, Role};
use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: WireMessage,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct GenerationClient {
    config: GenerationConfig,
    http_client: Client,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GenerationError::NetworkError)?;

        info!("Initialized generation client for model {}", config.model);
        Ok(Self { config, http_client })
    }

    fn messages(request: &GenerationRequest) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(WireMessage {
            role: Role::System.as_str().to_string(),
            content: Some(request.system_message()),
        });
        messages.extend(request.history.iter().map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: Some(m.content.clone()),
        }));
        messages.push(WireMessage {
            role: Role::User.as_str().to_string(),
            content: Some(request.prompt.clone()),
        });
        messages
    }
}

#[async_trait]
impl GenerationProvider for GenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: Self::messages(&request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        debug!(
            "Requesting completion with {} history turns and {} context passages",
            request.history.len(),
            request.context.len()
        );

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_token.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::NetworkError)?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("Generation API authentication failed");
                return Err(GenerationError::AuthenticationFailed.into());
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Generation API rate limit exceeded");
                return Err(GenerationError::RateLimitExceeded.into());
            }
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                error!("Generation request failed with status {}: {}", status, error_text);
                return Err(GenerationError::Failure(format!("Status {}: {}", status, error_text)).into());
            }
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(GenerationError::NetworkError)?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        debug!("Received completion of {} characters", text.len());
        Ok(text)
    }
}
