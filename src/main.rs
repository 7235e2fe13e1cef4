use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get, post};
use opentelemetry::KeyValue;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

mod analysis;
mod config;
mod db;
mod error;
mod llm;
mod report;
mod routes;
mod scrape;
mod telemetry;

use analysis::{CannedSource, ContextSource, PriceFeedSource};
use config::Config;
use llm::CapabilityClient;
use telemetry::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL, init_telemetry};

// Uploads beyond 16 MiB are rejected outright.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub planner: Arc<CapabilityClient>,
    pub synthesizer: Arc<CapabilityClient>,
    pub context_source: Arc<dyn ContextSource>,
    pub http: reqwest::Client,
}

#[derive(Clone)]
struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let method = request.method().as_str();
        let path = request.uri().path();

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{} {}", method, path),
            http.method = %method,
            http.route = %path,
            http.target = %request.uri(),
            http.scheme = "http",
            http.flavor = ?request.version(),
            http.user_agent = request.headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();

        span.record("http.response.status_code", status as i64);

        if status >= 500 {
            span.record("otel.status_code", "ERROR");
        } else {
            span.record("otel.status_code", "OK");
        }

        let latency_ms = latency.as_secs_f64() * 1000.0;
        let status_class = format!("{}xx", status / 100);

        HTTP_REQUESTS_TOTAL.add(
            1,
            &[
                KeyValue::new("http.status_code", status.to_string()),
                KeyValue::new("http.status_class", status_class.clone()),
            ],
        );

        HTTP_REQUEST_DURATION.record(
            latency_ms,
            &[
                KeyValue::new("http.status_code", status.to_string()),
                KeyValue::new("http.status_class", status_class),
            ],
        );

        tracing::info!(
            http.response.status_code = status,
            latency_ms = latency_ms,
            "finished processing request"
        );
    }
}

fn build_provider(config: &Config, provider: &str) -> Option<Arc<dyn llm::Provider>> {
    match provider {
        "none" => None,
        "anthropic" => Some(Arc::new(llm::anthropic::AnthropicProvider::new(
            config.anthropic_api_key.as_deref().unwrap_or(""),
        ))),
        "google" => Some(Arc::new(llm::openai::OpenAiProvider::new_google(
            config.google_api_key.as_deref().unwrap_or(""),
        ))),
        "ollama" => Some(Arc::new(llm::openai::OpenAiProvider::new_ollama(
            &config.ollama_base_url,
        ))),
        _ => Some(Arc::new(llm::openai::OpenAiProvider::new(
            config.openai_api_key.as_deref().unwrap_or(""),
        ))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting property-intel"
    );

    let pool = db::create_pool(&config.database_url).await?;

    let planner = Arc::new(CapabilityClient::new(
        "planner",
        build_provider(&config, &config.planner_provider),
        config.planner_provider.clone(),
        config.planner_model.clone(),
        config.default_temperature,
        config.default_max_tokens,
    ));

    let synthesizer = Arc::new(CapabilityClient::new(
        "synthesizer",
        build_provider(&config, &config.synthesizer_provider),
        config.synthesizer_provider.clone(),
        config.synthesizer_model.clone(),
        config.default_temperature,
        config.default_max_tokens,
    ));

    tracing::info!(
        planner = %config.planner_provider,
        planner_configured = planner.is_configured(),
        synthesizer = %config.synthesizer_provider,
        synthesizer_configured = synthesizer.is_configured(),
        "Capability clients initialized"
    );

    let context_source: Arc<dyn ContextSource> = match config.context_source.as_str() {
        "price-feed" => Arc::new(PriceFeedSource::new(pool.clone())),
        _ => Arc::new(CannedSource),
    };

    let http = reqwest::Client::builder()
        .user_agent(config.scrape_user_agent.clone())
        .timeout(Duration::from_secs(config.scrape_timeout_secs))
        .build()?;

    let state = AppState {
        pool,
        config: config.clone(),
        planner,
        synthesizer,
        context_source,
        http,
    };

    let app = Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/questions", get(routes::analysis::list_presets))
        .route("/api/analysis", post(routes::analysis::create_analysis))
        .route("/api/history", get(routes::analysis::list_history))
        .route("/api/stats", get(routes::analysis::get_stats))
        .route("/api/reset", post(routes::analysis::reset))
        .route("/api/sites", get(routes::sites::list_sites))
        .route("/api/sites", post(routes::sites::add_site))
        .route("/api/sites/{id}/prices", get(routes::sites::site_prices))
        .route("/api/scrape", post(routes::sites::run_scrape))
        .route("/api/report", post(routes::reports::create_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(300),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
