use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
        CreateChatCompletionResponse,
    },
};

use super::{GenerateRequest, GenerateResponse, Provider};

const GOOGLE_COMPAT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Adapter for any OpenAI-compatible chat endpoint. Covers OpenAI itself,
/// Gemini through Google's compatibility surface, and a local Ollama.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::with_config(OpenAIConfig::new().with_api_key(api_key)),
            provider_name: "openai".to_string(),
        }
    }

    pub fn new_google(api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(GOOGLE_COMPAT_BASE);
        Self {
            client: Client::with_config(config),
            provider_name: "google".to_string(),
        }
    }

    pub fn new_ollama(base_url: &str) -> Self {
        // Ollama ignores the key but async-openai requires one.
        let config = OpenAIConfig::new()
            .with_api_key("ollama")
            .with_api_base(format!("{base_url}/v1"));
        Self {
            client: Client::with_config(config),
            provider_name: "ollama".to_string(),
        }
    }
}

fn build_messages(system: &str, prompt: &str) -> Vec<ChatCompletionRequestMessage> {
    vec![
        ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(system.to_string()),
            name: None,
        }),
        ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        }),
    ]
}

fn into_generate_response(response: CreateChatCompletionResponse) -> GenerateResponse {
    let first = response.choices.first();

    let content = first
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    let finish_reason = first
        .and_then(|c| c.finish_reason)
        .map(|r| format!("{r:?}").to_lowercase())
        .unwrap_or_default();

    let (input_tokens, output_tokens) = response
        .usage
        .as_ref()
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    GenerateResponse {
        content,
        model: response.model,
        input_tokens,
        output_tokens,
        finish_reason,
        provider: String::new(),
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages: build_messages(&req.system, &req.prompt),
            temperature: Some(req.temperature),
            max_completion_tokens: Some(req.max_tokens),
            ..Default::default()
        };

        let response = self.client.chat().create(request).await?;
        Ok(into_generate_response(response))
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_order() {
        let messages = build_messages("be terse", "Which suburbs are trending?");
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(OpenAiProvider::new("k").name(), "openai");
        assert_eq!(OpenAiProvider::new_google("k").name(), "google");
        assert_eq!(
            OpenAiProvider::new_ollama("http://localhost:11434").name(),
            "ollama"
        );
    }
}
