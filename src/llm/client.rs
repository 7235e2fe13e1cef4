use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{CapabilityFailure, GenerateRequest, GenerateResponse, Provider};
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
};

/// One external reasoning capability (planner or synthesizer). The provider
/// is optional: an unconfigured capability fails fast with
/// `CapabilityFailure::Unconfigured` without any network traffic.
///
/// Each invocation is a single blocking call. There are no retries and no
/// provider fallback; the orchestrator substitutes canned text instead.
pub struct CapabilityClient {
    pub role: &'static str,
    pub provider: Option<Arc<dyn Provider>>,
    pub provider_name: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CapabilityClient {
    pub fn new(
        role: &'static str,
        provider: Option<Arc<dyn Provider>>,
        provider_name: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            role,
            provider,
            provider_name,
            model,
            temperature,
            max_tokens,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn invoke(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<GenerateResponse, CapabilityFailure> {
        let Some(provider) = self.provider.as_ref() else {
            return Err(CapabilityFailure::Unconfigured);
        };

        let req = GenerateRequest {
            model: self.model.clone(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stage: self.role.to_string(),
        };

        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %self.provider_name,
            gen_ai.request.model = %req.model,
            gen_ai.request.temperature = req.temperature,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            analysis.stage = %req.stage,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        {
            let mut user_event_attrs =
                vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))];
            if !req.system.is_empty() {
                user_event_attrs.push(KeyValue::new(
                    "gen_ai.system_instructions",
                    truncate(&req.system, 500),
                ));
            }
            span.add_event("gen_ai.user.message", user_event_attrs);
        }

        let result = provider.generate(&req).instrument(span.clone()).await;

        let duration = start.elapsed().as_secs_f64();

        let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
        let provider_kv = KeyValue::new("gen_ai.provider.name", self.provider_name.clone());
        let model_kv = KeyValue::new("gen_ai.request.model", req.model.clone());

        match result {
            Ok(mut resp) => {
                resp.provider = self.provider_name.clone();

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                if resp.content.trim().is_empty() {
                    span.record("otel.status_code", "ERROR");
                    span.record("error.type", CapabilityFailure::EmptyResponse.as_str());
                    return Err(CapabilityFailure::EmptyResponse);
                }

                Ok(resp)
            }
            Err(err) => {
                let failure = CapabilityFailure::classify(&err);

                span.record("otel.status_code", "ERROR");
                span.record("error.type", failure.as_str());

                tracing::warn!(
                    capability = self.role,
                    provider = %self.provider_name,
                    model = %req.model,
                    error = %err,
                    failure = failure.as_str(),
                    "capability call failed"
                );

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", self.provider_name.clone()),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                        KeyValue::new("error.type", failure.as_str()),
                    ],
                );

                Err(failure)
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProvider {
        content: &'static str,
    }

    #[async_trait::async_trait]
    impl Provider for CannedProvider {
        async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Ok(GenerateResponse {
                content: self.content.to_string(),
                model: req.model.clone(),
                input_tokens: 10,
                output_tokens: 5,
                finish_reason: "stop".to_string(),
                provider: String::new(),
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl Provider for FailingProvider {
        async fn generate(&self, _req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Err(anyhow::anyhow!("429 too many requests"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn client_with(provider: Option<Arc<dyn Provider>>) -> CapabilityClient {
        CapabilityClient::new(
            "planner",
            provider,
            "test".to_string(),
            "test-model".to_string(),
            0.3,
            256,
        )
    }

    #[tokio::test]
    async fn test_unconfigured_fails_without_network() {
        let client = client_with(None);
        let result = client.invoke("system", "prompt").await;
        assert_eq!(result.unwrap_err(), CapabilityFailure::Unconfigured);
    }

    #[tokio::test]
    async fn test_invoke_returns_provider_content() {
        let client = client_with(Some(Arc::new(CannedProvider { content: "answer" })));
        let resp = client.invoke("system", "prompt").await.unwrap();
        assert_eq!(resp.content, "answer");
        assert_eq!(resp.provider, "test");
    }

    #[tokio::test]
    async fn test_blank_content_is_empty_response() {
        let client = client_with(Some(Arc::new(CannedProvider { content: "   " })));
        let result = client.invoke("system", "prompt").await;
        assert_eq!(result.unwrap_err(), CapabilityFailure::EmptyResponse);
    }

    #[tokio::test]
    async fn test_provider_error_is_classified() {
        let client = client_with(Some(Arc::new(FailingProvider)));
        let result = client.invoke("system", "prompt").await;
        assert_eq!(result.unwrap_err(), CapabilityFailure::RateLimited);
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("hé世界!", 3);
        assert!(result.len() <= 3);
        assert!(result.is_char_boundary(result.len()));
    }
}
