use serde::Serialize;
use sqlx::PgPool;

/// Upper bound on snippets handed to the synthesizer.
pub const MAX_SNIPPETS: usize = 5;

/// One labeled unit of gathered context.
#[derive(Debug, Clone, Serialize)]
pub struct Snippet {
    pub source: String,
    pub title: String,
    pub summary: String,
    pub date: String,
}

/// Stage 2 collaborator. Either a live feed or the canned list; the
/// orchestrator treats both identically and never sees a failure from this
/// seam.
#[async_trait::async_trait]
pub trait ContextSource: Send + Sync {
    async fn gather(&self) -> Vec<Snippet>;
    fn name(&self) -> &str;
}

/// The fixed deterministic snippet set used in the degraded path. No network
/// I/O on this path, ever.
pub fn canned_snippets() -> Vec<Snippet> {
    vec![
        Snippet {
            source: "Brisbane City Council".to_string(),
            title: "Brisbane Development Applications - January 2025".to_string(),
            summary: "Recent development applications show continued growth in South Brisbane \
                      and Fortitude Valley areas with focus on mixed-use developments."
                .to_string(),
            date: "2025-01-15".to_string(),
        },
        Snippet {
            source: "Property Observer".to_string(),
            title: "Brisbane Property Market Update".to_string(),
            summary: "Brisbane property market showing sustained growth with particular strength \
                      in inner-city areas. Paddington and New Farm leading growth."
                .to_string(),
            date: "2025-01-14".to_string(),
        },
        Snippet {
            source: "Queensland Government".to_string(),
            title: "Cross River Rail Property Impact Study".to_string(),
            summary: "Infrastructure investment analysis shows 20-30% property value uplift \
                      within 800m of new stations. Woolloongabba and South Brisbane most affected."
                .to_string(),
            date: "2025-01-12".to_string(),
        },
    ]
}

pub struct CannedSource;

#[async_trait::async_trait]
impl ContextSource for CannedSource {
    async fn gather(&self) -> Vec<Snippet> {
        canned_snippets()
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// Live source built from the most recent price observation per monitored
/// site. Degrades to the canned list when the store is empty or unreachable.
pub struct PriceFeedSource {
    pool: PgPool,
}

impl PriceFeedSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FeedRow {
    name: String,
    category: Option<String>,
    price: f64,
    observed_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait::async_trait]
impl ContextSource for PriceFeedSource {
    #[tracing::instrument(name = "analysis_stage gather", skip(self), fields(analysis.stage = "gather"))]
    async fn gather(&self) -> Vec<Snippet> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT DISTINCT ON (s.id) s.name, s.category, ph.price, ph.observed_at \
             FROM monitored_sites s \
             JOIN price_history ph ON ph.site_id = s.id \
             ORDER BY s.id, ph.observed_at DESC",
        )
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) if !rows.is_empty() => {
                let mut snippets: Vec<Snippet> = rows
                    .into_iter()
                    .map(|r| Snippet {
                        source: r.name.clone(),
                        title: format!(
                            "Latest listed price for {} ({})",
                            r.name,
                            r.category.as_deref().unwrap_or("general")
                        ),
                        summary: format!("Most recent observed price: ${}.", r.price),
                        date: r.observed_at.format("%Y-%m-%d").to_string(),
                    })
                    .collect();
                snippets.truncate(MAX_SNIPPETS);
                snippets
            }
            Ok(_) => canned_snippets(),
            Err(e) => {
                tracing::warn!(error = %e, "price feed unavailable, using canned snippets");
                canned_snippets()
            }
        }
    }

    fn name(&self) -> &str {
        "price-feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_snippets_are_bounded_and_labeled() {
        let snippets = canned_snippets();
        assert!(!snippets.is_empty());
        assert!(snippets.len() <= MAX_SNIPPETS);
        for s in &snippets {
            assert!(!s.source.is_empty());
            assert!(!s.title.is_empty());
            assert!(!s.summary.is_empty());
            assert!(!s.date.is_empty());
        }
    }

    #[tokio::test]
    async fn test_canned_source_is_deterministic() {
        let source = CannedSource;
        let a = source.gather().await;
        let b = source.gather().await;
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.title, y.title);
            assert_eq!(x.summary, y.summary);
        }
    }
}
