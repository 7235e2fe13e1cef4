use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::analysis::{self, PRESET_QUESTIONS};
use crate::db::queries::{QueryRow, QueryStats};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct AskBody {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(body): Json<AskBody>,
) -> AppResult<Json<analysis::Analysis>> {
    let analysis = analysis::run_analysis(
        &state.pool,
        &state.planner,
        &state.synthesizer,
        state.context_source.as_ref(),
        &body.question,
    )
    .await?;

    Ok(Json(analysis))
}

pub async fn list_presets() -> Json<Value> {
    Json(json!({ "questions": PRESET_QUESTIONS }))
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<Vec<QueryRow>>> {
    let limit = params.limit.unwrap_or(20);

    let rows = crate::db::queries::list_queries(&state.pool, limit)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(rows))
}

pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<QueryStats>> {
    let stats = crate::db::queries::query_stats(&state.pool)
        .await
        .map_err(AppError::Database)?;

    Ok(Json(stats))
}

pub async fn reset(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let deleted = crate::db::queries::reset_queries(&state.pool)
        .await
        .map_err(AppError::Database)?;

    tracing::info!(deleted, "query history reset");

    Ok(Json(json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_body_deserialize() {
        let body: AskBody =
            serde_json::from_str(r#"{"question": "Is New Farm overvalued?"}"#).unwrap();
        assert_eq!(body.question, "Is New Farm overvalued?");
    }

    #[test]
    fn test_ask_body_requires_question() {
        assert!(serde_json::from_str::<AskBody>("{}").is_err());
    }

    #[test]
    fn test_history_query_defaults() {
        let query: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_history_query_with_limit() {
        let query: HistoryQuery = serde_json::from_str(r#"{"limit": 5}"#).unwrap();
        assert_eq!(query.limit, Some(5));
    }
}
