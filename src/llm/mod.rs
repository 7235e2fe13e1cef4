pub mod anthropic;
pub mod client;
pub mod openai;

pub use client::CapabilityClient;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stage: String,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
    pub provider: String,
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
    fn name(&self) -> &str;
}

/// Typed reason a capability call produced no usable output. Callers decide
/// at the call site whether to substitute a fallback; these never propagate
/// out of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityFailure {
    #[error("capability not configured")]
    Unconfigured,
    #[error("rate limited by provider")]
    RateLimited,
    #[error("request timed out")]
    Timeout,
    #[error("authentication rejected")]
    Auth,
    #[error("invalid request")]
    InvalidRequest,
    #[error("upstream server error")]
    Upstream,
    #[error("network error")]
    Network,
    #[error("empty response from provider")]
    EmptyResponse,
    #[error("unclassified provider error")]
    Unknown,
}

impl CapabilityFailure {
    /// Buckets a provider error by its message text. Providers speak
    /// different dialects, so this stays deliberately coarse.
    pub fn classify(err: &anyhow::Error) -> Self {
        let msg = err.to_string().to_lowercase();
        if msg.contains("rate limit") || msg.contains("429") {
            CapabilityFailure::RateLimited
        } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
            CapabilityFailure::Timeout
        } else if msg.contains("401")
            || msg.contains("403")
            || msg.contains("auth")
            || msg.contains("api key")
        {
            CapabilityFailure::Auth
        } else if msg.contains("400") || msg.contains("422") || msg.contains("invalid") {
            CapabilityFailure::InvalidRequest
        } else if msg.contains("500")
            || msg.contains("502")
            || msg.contains("503")
            || msg.contains("server")
        {
            CapabilityFailure::Upstream
        } else if msg.contains("connect")
            || msg.contains("dns")
            || msg.contains("network")
            || msg.contains("reset")
        {
            CapabilityFailure::Network
        } else {
            CapabilityFailure::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityFailure::Unconfigured => "unconfigured",
            CapabilityFailure::RateLimited => "rate_limit",
            CapabilityFailure::Timeout => "timeout",
            CapabilityFailure::Auth => "auth_error",
            CapabilityFailure::InvalidRequest => "invalid_request",
            CapabilityFailure::Upstream => "server_error",
            CapabilityFailure::Network => "network_error",
            CapabilityFailure::EmptyResponse => "empty_response",
            CapabilityFailure::Unknown => "unknown_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_failure_categories() {
        let cases = vec![
            ("rate limit exceeded", CapabilityFailure::RateLimited),
            ("status 429: too many requests", CapabilityFailure::RateLimited),
            ("context deadline exceeded: timeout", CapabilityFailure::Timeout),
            ("request timed out", CapabilityFailure::Timeout),
            ("401 unauthorized", CapabilityFailure::Auth),
            ("403 forbidden", CapabilityFailure::Auth),
            ("authentication failed", CapabilityFailure::Auth),
            ("invalid api key", CapabilityFailure::Auth),
            ("400 bad request", CapabilityFailure::InvalidRequest),
            ("422 unprocessable entity", CapabilityFailure::InvalidRequest),
            ("invalid model name", CapabilityFailure::InvalidRequest),
            ("500 internal server error", CapabilityFailure::Upstream),
            ("502 bad gateway", CapabilityFailure::Upstream),
            ("503 service unavailable", CapabilityFailure::Upstream),
            ("connection refused", CapabilityFailure::Network),
            ("dns resolution failed", CapabilityFailure::Network),
            ("connection reset by peer", CapabilityFailure::Network),
            ("something unexpected", CapabilityFailure::Unknown),
        ];

        for (msg, expected) in cases {
            let err = anyhow::anyhow!("{}", msg);
            assert_eq!(
                CapabilityFailure::classify(&err),
                expected,
                "classify({msg:?}) should be {expected:?}"
            );
        }
    }

    #[test]
    fn test_failure_display_is_stable() {
        assert_eq!(
            CapabilityFailure::Unconfigured.to_string(),
            "capability not configured"
        );
        assert_eq!(
            CapabilityFailure::EmptyResponse.to_string(),
            "empty response from provider"
        );
    }

    #[test]
    fn test_failure_as_str_unique() {
        let all = [
            CapabilityFailure::Unconfigured,
            CapabilityFailure::RateLimited,
            CapabilityFailure::Timeout,
            CapabilityFailure::Auth,
            CapabilityFailure::InvalidRequest,
            CapabilityFailure::Upstream,
            CapabilityFailure::Network,
            CapabilityFailure::EmptyResponse,
            CapabilityFailure::Unknown,
        ];
        let mut names: Vec<&str> = all.iter().map(|f| f.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }
}
