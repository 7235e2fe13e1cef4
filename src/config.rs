use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub planner_provider: String,
    pub planner_model: String,
    pub synthesizer_provider: String,
    pub synthesizer_model: String,
    pub ollama_base_url: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub context_source: String,
    pub scrape_delay_ms: u64,
    pub scrape_timeout_secs: u64,
    pub scrape_user_agent: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("APP_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            // Planner pairs with Anthropic and synthesizer with Gemini by
            // default; either can be set to "none" to run degraded.
            planner_provider: env::var("PLANNER_PROVIDER")
                .unwrap_or_else(|_| "anthropic".to_string()),
            planner_model: env::var("PLANNER_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string()),
            synthesizer_provider: env::var("SYNTHESIZER_PROVIDER")
                .unwrap_or_else(|_| "google".to_string()),
            synthesizer_model: env::var("SYNTHESIZER_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            google_api_key: env::var("GOOGLE_API_KEY").ok(),
            context_source: env::var("CONTEXT_SOURCE").unwrap_or_else(|_| "canned".to_string()),
            scrape_delay_ms: env::var("SCRAPE_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .expect("SCRAPE_DELAY_MS must be a number"),
            scrape_timeout_secs: env::var("SCRAPE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("SCRAPE_TIMEOUT_SECS must be a number"),
            scrape_user_agent: env::var("SCRAPE_USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
            }),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "property-intel".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            default_temperature: env::var("DEFAULT_TEMPERATURE")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .expect("DEFAULT_TEMPERATURE must be a number"),
            default_max_tokens: env::var("DEFAULT_MAX_TOKENS")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .expect("DEFAULT_MAX_TOKENS must be a number"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
