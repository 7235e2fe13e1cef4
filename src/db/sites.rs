use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SiteRow {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub price_selector: String,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct InsertSite<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub url: &'a str,
    pub price_selector: &'a str,
    pub category: Option<&'a str>,
}

#[tracing::instrument(name = "db.sites.insert", skip_all)]
pub async fn insert_site(pool: &PgPool, params: &InsertSite<'_>) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO monitored_sites (id, name, url, price_selector, category) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(params.id)
    .bind(params.name)
    .bind(params.url)
    .bind(params.price_selector)
    .bind(params.category)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

#[tracing::instrument(name = "db.sites.list", skip(pool))]
pub async fn list_sites(pool: &PgPool) -> Result<Vec<SiteRow>, sqlx::Error> {
    sqlx::query_as::<_, SiteRow>(
        "SELECT id, name, url, price_selector, category, created_at \
         FROM monitored_sites ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
}

#[tracing::instrument(name = "db.sites.get", skip(pool))]
pub async fn get_site(pool: &PgPool, id: Uuid) -> Result<Option<SiteRow>, sqlx::Error> {
    sqlx::query_as::<_, SiteRow>(
        "SELECT id, name, url, price_selector, category, created_at \
         FROM monitored_sites WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ObservationRow {
    pub id: Uuid,
    pub site_id: Uuid,
    pub price: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[tracing::instrument(name = "db.price_history.insert", skip(pool))]
pub async fn insert_observation(
    pool: &PgPool,
    site_id: Uuid,
    price: f64,
) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO price_history (id, site_id, price) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(site_id)
    .bind(price)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

#[tracing::instrument(name = "db.price_history.list", skip(pool))]
pub async fn price_history(
    pool: &PgPool,
    site_id: Uuid,
    limit: i64,
) -> Result<Vec<ObservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ObservationRow>(
        "SELECT id, site_id, price, observed_at \
         FROM price_history WHERE site_id = $1 \
         ORDER BY observed_at DESC LIMIT $2",
    )
    .bind(site_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
