use crate::config::OpenAIConfig;
use crate::error::{RagError, Result};
use log::warn;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retries after the first attempt on a transient failure
pub const MAX_RETRIES: u32 = 2;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// A text-in, text-out language model.
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for the OpenAI chat completions API.
///
/// Always samples greedily (temperature 0).
#[derive(Clone)]
pub struct OpenAIChat {
    config: OpenAIConfig,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Outcome of a single request attempt
enum AttemptError {
    Transient(String),
    Fatal(String),
}

impl OpenAIChat {
    pub fn new(config: OpenAIConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAIChat {
            config,
            client,
            max_retries: MAX_RETRIES,
        }
    }

    async fn attempt(&self, request: &ChatRequest<'_>) -> std::result::Result<String, AttemptError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AttemptError::Transient(e.to_string())
                } else {
                    AttemptError::Fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("API request failed: {} {}", status, error_text);
            return Err(if is_retryable(status) {
                AttemptError::Transient(message)
            } else {
                AttemptError::Fatal(message)
            });
        }

        let response_data: ChatResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(e.to_string()))?;

        // Extract the generated text from the response
        response_data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AttemptError::Fatal("No response generated".to_string()))
    }
}

impl ChatModel for OpenAIChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.llm_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let mut attempt = 0;
        loop {
            match self.attempt(&request).await {
                Ok(text) => return Ok(text),
                Err(AttemptError::Transient(message)) if attempt < self.max_retries => {
                    let delay = backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Chat completion failed ({}), retrying in {:?} ({}/{})",
                        message, delay, attempt, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Transient(message)) | Err(AttemptError::Fatal(message)) => {
                    return Err(RagError::upstream("chat completion", message));
                }
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS
    ) || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    INITIAL_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> OpenAIChat {
        OpenAIChat::new(OpenAIConfig {
            api_key: "sk-test".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            base_url: server.url(),
        })
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff(0), Duration::from_millis(500));
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(10), MAX_BACKOFF);
    }

    #[test]
    fn test_request_is_greedy_single_user_message() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
                "temperature": 0.0,
            })
        );
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0,
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"olá"}},{"message":{"content":"outra"}}]}"#)
            .create_async()
            .await;

        let answer = client_for(&server).complete("pergunta").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "olá");
    }

    #[tokio::test]
    async fn test_server_error_retried_twice_then_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("{}")
            .expect(3)
            .create_async()
            .await;

        let err = client_for(&server).complete("pergunta").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, RagError::Upstream { service: "chat completion", .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"invalid api key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client_for(&server).complete("pergunta").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let result = client_for(&server).complete("pergunta").await;

        mock.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_url_fails_without_backoff() {
        let chat = OpenAIChat::new(OpenAIConfig {
            api_key: "sk-test".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            base_url: "not a url".to_string(),
        });

        let started = std::time::Instant::now();
        let err = chat.complete("pergunta").await.unwrap_err();

        assert!(matches!(err, RagError::Upstream { .. }));
        assert!(started.elapsed() < INITIAL_BACKOFF);
    }
}
