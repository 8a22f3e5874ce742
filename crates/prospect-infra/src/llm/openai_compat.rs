//! OpenAI-compatible completion backend.
//!
//! A single [`OpenAiCompatBackend`] covers OpenAI itself plus any endpoint
//! speaking the same chat completions protocol, selected via a configurable
//! base URL.
//!
//! Uses [`async_openai`] for type-safe request/response handling.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, StopConfiguration,
};
use secrecy::{ExposeSecret, SecretString};

use prospect_core::backend::CompletionBackend;
use prospect_types::chat::{Role, Turn};
use prospect_types::config::GenerationParams;
use prospect_types::error::BackendError;

/// Configuration for an OpenAI-compatible completion backend.
pub struct OpenAiCompatConfig {
    /// API key for authentication.
    pub api_key: SecretString,
    /// Base URL override. `None` targets the upstream OpenAI endpoint.
    pub api_base: Option<String>,
}

impl OpenAiCompatConfig {
    /// Configuration for the upstream OpenAI endpoint.
    pub fn openai(api_key: &str) -> Self {
        Self {
            api_key: SecretString::from(api_key.to_string()),
            api_base: None,
        }
    }

    /// Configuration for any other endpoint speaking the same protocol.
    pub fn compatible(api_key: &str, api_base: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.to_string()),
            api_base: Some(api_base.into()),
        }
    }
}

/// Completion backend for any OpenAI-compatible chat API.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
pub struct OpenAiCompatBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompatBackend {
    /// Create a new backend from a configuration.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.expose_secret());
        if let Some(base) = config.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Self {
            client: Client::with_config(openai_config),
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from conversation turns.
    fn build_request(history: &[Turn], params: &GenerationParams) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len());

        for turn in history {
            let msg = match turn.role {
                Role::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(turn.text.clone()),
                        name: None,
                    })
                }
                // The salesperson is the human side of the conversation.
                Role::Salesperson => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(turn.text.clone()),
                        name: None,
                    })
                }
                // The customer is the side the model plays.
                Role::Customer => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            turn.text.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            };
            messages.push(msg);
        }

        let mut request = CreateChatCompletionRequest {
            model: params.model.clone(),
            messages,
            max_completion_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature as f32),
            top_p: Some(params.top_p as f32),
            frequency_penalty: Some(params.frequency_penalty as f32),
            presence_penalty: Some(params.presence_penalty as f32),
            ..Default::default()
        };

        if !params.stop_sequences.is_empty() {
            request.stop = Some(StopConfiguration::StringArray(params.stop_sequences.clone()));
        }

        request
    }
}

// OpenAiCompatBackend intentionally does NOT derive Debug to prevent
// accidental exposure of internal state including the API key inside the
// async-openai Client.

impl CompletionBackend for OpenAiCompatBackend {
    async fn complete(
        &self,
        history: &[Turn],
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let request = Self::build_request(history, params);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(BackendError::EmptyCompletion)
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`BackendError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> BackendError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                BackendError::RateLimited
            } else {
                BackendError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if reqwest_err.is_timeout() {
                BackendError::Timeout
            } else if reqwest_err.status().map(|s| s.as_u16()) == Some(429) {
                BackendError::RateLimited
            } else {
                BackendError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::InvalidArgument(msg) => BackendError::InvalidConfig(msg.clone()),
        _ => BackendError::Provider {
            message: err.to_string(),
        },
    }
}
