use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::sites::{self, SiteRow};
use crate::error::AppError;
use crate::telemetry::metrics::{SCRAPE_CYCLE_DURATION, SCRAPE_SITES_FAILED, SCRAPE_SITES_OK};

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("price regex is valid"));

/// Pulls the first numeric substring (commas stripped) out of the element's
/// text. Non-positive values count as a failed parse.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    let matched = PRICE_RE.find(&cleaned)?;
    let price: f64 = matched.as_str().parse().ok()?;
    (price > 0.0).then_some(price)
}

/// Locates the price element by CSS selector and parses its text. Sync on
/// purpose: `scraper::Html` is not `Send`, so it must never live across an
/// await point.
pub fn extract_price(html: &str, selector: &str) -> Option<f64> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    let text: String = element.text().collect();
    parse_price_text(&text)
}

/// Fetches one site's current price. The cycle loop only sees this seam, so
/// it can run against a stand-in instead of a live server.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, site: &SiteRow) -> anyhow::Result<f64>;
}

struct HttpSource<'a> {
    http: &'a reqwest::Client,
}

#[async_trait::async_trait]
impl PriceSource for HttpSource<'_> {
    async fn fetch(&self, site: &SiteRow) -> anyhow::Result<f64> {
        let body = self
            .http
            .get(&site.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        extract_price(&body, &site.price_selector).ok_or_else(|| {
            anyhow::anyhow!("no parseable price for selector {:?}", site.price_selector)
        })
    }
}

/// Where successful observations land.
#[async_trait::async_trait]
pub trait ObservationSink: Send + Sync {
    async fn record(&self, site_id: Uuid, price: f64) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl ObservationSink for PgPool {
    async fn record(&self, site_id: Uuid, price: f64) -> anyhow::Result<()> {
        sites::insert_observation(self, site_id, price).await?;
        Ok(())
    }
}

/// Inner loop over an already-listed set of sites. A site succeeds only when
/// its price was fetched, parsed, AND recorded; a failure at any of those
/// steps logs, counts, and skips the site, so every returned entry has a
/// matching observation. A fixed sleep separates sites; there is no
/// concurrency and no backoff.
pub async fn cycle(
    sites: &[SiteRow],
    source: &dyn PriceSource,
    sink: &dyn ObservationSink,
    delay: Duration,
) -> Vec<String> {
    let mut results = Vec::new();

    for site in sites {
        match source.fetch(site).await {
            Ok(price) => match sink.record(site.id, price).await {
                Ok(()) => {
                    SCRAPE_SITES_OK.add(1, &[]);
                    results.push(format!("{}: ${}", site.name, price));
                }
                Err(e) => {
                    SCRAPE_SITES_FAILED.add(1, &[]);
                    tracing::warn!(
                        site = %site.name,
                        error = %e,
                        "failed to record observation, skipping site"
                    );
                }
            },
            Err(e) => {
                SCRAPE_SITES_FAILED.add(1, &[]);
                tracing::warn!(site = %site.name, url = %site.url, error = %e, "skipping site");
            }
        }

        tokio::time::sleep(delay).await;
    }

    results
}

/// One full pass over every monitored site.
#[tracing::instrument(
    name = "scrape cycle",
    skip(pool, http),
    fields(scrape.sites, scrape.succeeded)
)]
pub async fn run_cycle(
    pool: &PgPool,
    http: &reqwest::Client,
    delay: Duration,
) -> Result<Vec<String>, AppError> {
    let start = std::time::Instant::now();
    let sites = sites::list_sites(pool).await.map_err(AppError::Database)?;

    let results = cycle(&sites, &HttpSource { http }, pool, delay).await;

    SCRAPE_CYCLE_DURATION.record(start.elapsed().as_secs_f64(), &[]);

    let span = tracing::Span::current();
    span.record("scrape.sites", sites.len());
    span.record("scrape.succeeded", results.len());

    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_price_text("450000"), Some(450000.0));
    }

    #[test]
    fn test_parse_currency_with_commas() {
        assert_eq!(parse_price_text("$1,234.56 per week"), Some(1234.56));
    }

    #[test]
    fn test_parse_takes_first_numeric_substring() {
        assert_eq!(parse_price_text("was $800, now $650"), Some(800.0));
    }

    #[test]
    fn test_parse_rejects_no_digits() {
        assert_eq!(parse_price_text("price on application"), None);
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert_eq!(parse_price_text("$0"), None);
    }

    #[test]
    fn test_extract_price_with_selector() {
        let html = r#"<html><body>
            <div class="listing">
                <span class="price">$1,250,000</span>
                <span class="address">12 Example St, Paddington</span>
            </div>
        </body></html>"#;
        assert_eq!(extract_price(html, ".price"), Some(1250000.0));
    }

    #[test]
    fn test_extract_price_missing_selector_match() {
        let html = "<html><body><p>no price here</p></body></html>";
        assert_eq!(extract_price(html, ".price"), None);
    }

    #[test]
    fn test_extract_price_invalid_selector() {
        let html = "<html><body><span class='price'>$5</span></body></html>";
        assert_eq!(extract_price(html, ":::not a selector"), None);
    }

    #[test]
    fn test_extract_price_unparseable_text() {
        let html = "<html><body><span class='price'>TBA</span></body></html>";
        assert_eq!(extract_price(html, ".price"), None);
    }

    fn site(name: &str) -> SiteRow {
        SiteRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            price_selector: ".price".to_string(),
            category: None,
            created_at: None,
        }
    }

    /// Fails for sites named "down" (fetch error) and "blank" (no price),
    /// returns a fixed price for everything else.
    struct FixedPrices;

    #[async_trait::async_trait]
    impl PriceSource for FixedPrices {
        async fn fetch(&self, site: &SiteRow) -> anyhow::Result<f64> {
            match site.name.as_str() {
                "down" => Err(anyhow::anyhow!("connection refused")),
                "blank" => Err(anyhow::anyhow!("no parseable price for selector \".price\"")),
                _ => Ok(500.0),
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        recorded: Mutex<Vec<(Uuid, f64)>>,
    }

    #[async_trait::async_trait]
    impl ObservationSink for MemorySink {
        async fn record(&self, site_id: Uuid, price: f64) -> anyhow::Result<()> {
            self.recorded.lock().unwrap().push((site_id, price));
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait::async_trait]
    impl ObservationSink for FailingSink {
        async fn record(&self, _site_id: Uuid, _price: f64) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("connection pool exhausted"))
        }
    }

    #[tokio::test]
    async fn test_cycle_three_of_five_sites_succeed() {
        let sites: Vec<SiteRow> = ["alpha", "down", "beta", "blank", "gamma"]
            .iter()
            .map(|n| site(n))
            .collect();
        let sink = MemorySink::default();

        let results = cycle(&sites, &FixedPrices, &sink, Duration::ZERO).await;

        assert_eq!(results, vec!["alpha: $500", "beta: $500", "gamma: $500"]);
        // One recorded observation per returned entry, in the same order.
        let recorded = sink.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].0, sites[0].id);
        assert_eq!(recorded[1].0, sites[2].id);
        assert_eq!(recorded[2].0, sites[4].id);
    }

    #[tokio::test]
    async fn test_cycle_skips_site_when_record_fails() {
        let sites = vec![site("alpha")];
        let results = cycle(&sites, &FixedPrices, &FailingSink, Duration::ZERO).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_empty_site_list() {
        let sink = MemorySink::default();
        let results = cycle(&[], &FixedPrices, &sink, Duration::ZERO).await;
        assert!(results.is_empty());
        assert!(sink.recorded.lock().unwrap().is_empty());
    }
}
