use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("property-intel"));

// --- Gen-AI semconv metrics ---

pub static GEN_AI_TOKEN_USAGE: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.token.usage")
        .with_description("Number of tokens used per LLM call")
        .with_unit("{token}")
        .build()
});

pub static GEN_AI_OPERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.operation.duration")
        .with_description("Duration of LLM operations in seconds")
        .with_unit("s")
        .build()
});

pub static GEN_AI_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("gen_ai.client.error.count")
        .with_description("Number of LLM call errors")
        .with_unit("{error}")
        .build()
});

pub static CAPABILITY_SUBSTITUTIONS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("capability.substitution.count")
        .with_description("Times a failed capability was replaced by a canned substitute")
        .with_unit("{substitution}")
        .build()
});

// --- Domain metrics ---

pub static ANALYSIS_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("analysis.duration")
        .with_description("End-to-end question analysis duration in seconds")
        .with_unit("s")
        .build()
});

pub static ANALYSIS_SNIPPETS: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("analysis.snippets")
        .with_description("Context snippets gathered per analysis")
        .with_unit("{snippet}")
        .build()
});

pub static SCRAPE_CYCLE_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("scrape.cycle.duration")
        .with_description("Duration of a full scrape cycle in seconds")
        .with_unit("s")
        .build()
});

pub static SCRAPE_SITES_OK: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("scrape.sites.succeeded")
        .with_description("Sites that yielded a parseable price")
        .with_unit("{site}")
        .build()
});

pub static SCRAPE_SITES_FAILED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("scrape.sites.failed")
        .with_description("Sites skipped during a scrape cycle")
        .with_unit("{site}")
        .build()
});

pub static REPORT_GENERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.generation.duration")
        .with_description("CSV-to-PDF report generation duration in seconds")
        .with_unit("s")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});
