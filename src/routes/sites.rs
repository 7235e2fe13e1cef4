use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::AppState;
use crate::db::sites::{InsertSite, ObservationRow, SiteRow};
use crate::error::{AppError, AppResult};
use crate::scrape;

#[derive(Debug, Deserialize)]
pub struct AddSiteBody {
    pub name: String,
    pub url: String,
    pub price_selector: String,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PricesQuery {
    pub limit: Option<i64>,
}

pub async fn add_site(
    State(state): State<AppState>,
    Json(body): Json<AddSiteBody>,
) -> AppResult<Json<Value>> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    if !body.url.starts_with("http://") && !body.url.starts_with("https://") {
        return Err(AppError::Validation(
            "url must start with http:// or https://".into(),
        ));
    }
    if body.price_selector.trim().is_empty() {
        return Err(AppError::Validation(
            "price_selector must not be empty".into(),
        ));
    }

    let id = crate::db::sites::insert_site(
        &state.pool,
        &InsertSite {
            id: Uuid::new_v4(),
            name: &body.name,
            url: &body.url,
            price_selector: &body.price_selector,
            category: body.category.as_deref(),
        },
    )
    .await
    .map_err(AppError::Database)?;

    tracing::info!(site = %body.name, %id, "monitored site registered");

    Ok(Json(json!({ "id": id })))
}

pub async fn list_sites(State(state): State<AppState>) -> AppResult<Json<Vec<SiteRow>>> {
    let sites = crate::db::sites::list_sites(&state.pool)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(sites))
}

/// Runs one scrape cycle over every registered site. Failed sites are
/// omitted from the returned list.
pub async fn run_scrape(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let results = scrape::run_cycle(
        &state.pool,
        &state.http,
        Duration::from_millis(state.config.scrape_delay_ms),
    )
    .await?;

    Ok(Json(json!({ "results": results })))
}

pub async fn site_prices(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PricesQuery>,
) -> AppResult<Json<Vec<ObservationRow>>> {
    crate::db::sites::get_site(&state.pool, id)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("Site {id} not found")))?;

    let limit = params.limit.unwrap_or(50);

    let history = crate::db::sites::price_history(&state.pool, id, limit)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(history))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_site_body_deserialize() {
        let body: AddSiteBody = serde_json::from_str(
            r#"{"name": "Example Agency", "url": "https://example.com/listing",
                "price_selector": ".price", "category": "rental"}"#,
        )
        .unwrap();
        assert_eq!(body.name, "Example Agency");
        assert_eq!(body.category.as_deref(), Some("rental"));
    }

    #[test]
    fn test_add_site_body_category_optional() {
        let body: AddSiteBody = serde_json::from_str(
            r#"{"name": "n", "url": "https://example.com", "price_selector": ".p"}"#,
        )
        .unwrap();
        assert!(body.category.is_none());
    }

    #[test]
    fn test_prices_query_defaults() {
        let query: PricesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, None);
    }
}
