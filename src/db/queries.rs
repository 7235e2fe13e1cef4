use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QueryRow {
    pub id: Uuid,
    pub question: String,
    pub classification: String,
    pub answer: String,
    pub duration_ms: i32,
    pub success: bool,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct InsertQuery<'a> {
    pub id: Uuid,
    pub question: &'a str,
    pub classification: &'a str,
    pub answer: &'a str,
    pub duration_ms: i32,
    pub success: bool,
}

#[tracing::instrument(name = "db.queries.insert", skip_all)]
pub async fn insert_query(pool: &PgPool, params: &InsertQuery<'_>) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO queries (id, question, classification, answer, duration_ms, success) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(params.id)
    .bind(params.question)
    .bind(params.classification)
    .bind(params.answer)
    .bind(params.duration_ms)
    .bind(params.success)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

#[tracing::instrument(name = "db.queries.list", skip(pool))]
pub async fn list_queries(pool: &PgPool, limit: i64) -> Result<Vec<QueryRow>, sqlx::Error> {
    sqlx::query_as::<_, QueryRow>(
        "SELECT id, question, classification, answer, duration_ms, success, created_at \
         FROM queries ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QueryAggregates {
    pub total: i64,
    pub preset: i64,
    pub custom: i64,
    pub avg_duration_ms: Option<f64>,
    pub min_duration_ms: Option<i32>,
    pub max_duration_ms: Option<i32>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuestionCount {
    pub question: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    #[serde(flatten)]
    pub aggregates: QueryAggregates,
    pub top_questions: Vec<QuestionCount>,
}

#[tracing::instrument(name = "db.queries.stats", skip(pool))]
pub async fn query_stats(pool: &PgPool) -> Result<QueryStats, sqlx::Error> {
    let aggregates = sqlx::query_as::<_, QueryAggregates>(
        "SELECT COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE classification = 'preset') AS preset, \
                COUNT(*) FILTER (WHERE classification = 'custom') AS custom, \
                AVG(duration_ms)::float8 AS avg_duration_ms, \
                MIN(duration_ms) AS min_duration_ms, \
                MAX(duration_ms) AS max_duration_ms \
         FROM queries",
    )
    .fetch_one(pool)
    .await?;

    // Duplicate submissions are separate rows by design; repeat counts are
    // the popularity signal.
    let top_questions = sqlx::query_as::<_, QuestionCount>(
        "SELECT question, COUNT(*) AS count \
         FROM queries GROUP BY question ORDER BY count DESC, question ASC LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    Ok(QueryStats {
        aggregates,
        top_questions,
    })
}

#[tracing::instrument(name = "db.queries.reset", skip(pool))]
pub async fn reset_queries(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM queries").execute(pool).await?;
    Ok(result.rows_affected())
}
