use chrono::Utc;
use opentelemetry::KeyValue;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries::InsertQuery;
use crate::error::AppError;
use crate::llm::{CapabilityClient, CapabilityFailure};
use crate::telemetry::metrics::{ANALYSIS_DURATION, ANALYSIS_SNIPPETS, CAPABILITY_SUBSTITUTIONS};

use super::classify::{Classification, classify};
use super::format::{self, FormatParams};
use super::gather::ContextSource;
use super::{plan, synthesize};

/// Per-stage outcome surfaced to the caller: the stage either produced real
/// capability output or a canned substitute.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Substituted { reason: String },
}

impl StageStatus {
    fn from_outcome<T>(outcome: &Result<T, CapabilityFailure>) -> Self {
        match outcome {
            Ok(_) => StageStatus::Completed,
            Err(failure) => StageStatus::Substituted {
                reason: failure.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub id: Option<Uuid>,
    pub question: String,
    pub classification: Classification,
    pub answer: String,
    pub planner: StageStatus,
    pub synthesizer: StageStatus,
    pub snippet_count: usize,
    pub duration_ms: u64,
    pub success: bool,
}

pub fn validate_question(question: &str) -> Result<(), AppError> {
    if question.trim().is_empty() {
        return Err(AppError::Validation("question must not be empty".into()));
    }
    Ok(())
}

/// Runs the full sequential chain: classify, plan, gather, synthesize,
/// format, persist. Capability failures are substituted, never propagated;
/// every path past validation produces a non-empty answer with success=true.
#[tracing::instrument(
    name = "analysis question",
    skip(pool, planner, synthesizer, source),
    fields(
        analysis.id,
        analysis.classification,
        analysis.duration_ms,
        analysis.snippet_count,
    )
)]
pub async fn run_analysis(
    pool: &PgPool,
    planner: &CapabilityClient,
    synthesizer: &CapabilityClient,
    source: &dyn ContextSource,
    question: &str,
) -> Result<Analysis, AppError> {
    validate_question(question)?;

    let start = std::time::Instant::now();

    // The raw string is classified; only the emptiness check trims.
    let classification = classify(question);

    // Stage 1: plan. A typed failure selects the substitute here, visibly.
    let plan_outcome = plan::plan(planner, question).await;
    if let Err(failure) = &plan_outcome {
        CAPABILITY_SUBSTITUTIONS.add(
            1,
            &[
                KeyValue::new("capability", "planner"),
                KeyValue::new("reason", failure.as_str()),
            ],
        );
    }
    let plan_text = match &plan_outcome {
        Ok(text) => text.clone(),
        Err(_) => plan::placeholder(question),
    };

    // Stage 2: gather context snippets.
    let snippets = source.gather().await;

    // Stage 3: synthesize.
    let synthesis_outcome =
        synthesize::synthesize(synthesizer, question, &plan_text, snippets.len()).await;
    if let Err(failure) = &synthesis_outcome {
        CAPABILITY_SUBSTITUTIONS.add(
            1,
            &[
                KeyValue::new("capability", "synthesizer"),
                KeyValue::new("reason", failure.as_str()),
            ],
        );
    }

    // Stage 4: format.
    let duration = start.elapsed();
    let answer = format::format_answer(FormatParams {
        question,
        plan: plan_outcome.as_deref(),
        synthesis: synthesis_outcome.as_deref(),
        snippets: &snippets,
        generated_at: Utc::now(),
    });

    let mut analysis = Analysis {
        id: None,
        question: question.to_string(),
        classification,
        answer,
        planner: StageStatus::from_outcome(&plan_outcome),
        synthesizer: StageStatus::from_outcome(&synthesis_outcome),
        snippet_count: snippets.len(),
        duration_ms: duration.as_millis() as u64,
        success: true,
    };

    // A failed store does not fail the request; the answer is returned
    // without a record id.
    let insert = crate::db::queries::insert_query(
        pool,
        &InsertQuery {
            id: Uuid::new_v4(),
            question: &analysis.question,
            classification: analysis.classification.as_str(),
            answer: &analysis.answer,
            duration_ms: analysis.duration_ms as i32,
            success: analysis.success,
        },
    )
    .await;

    match insert {
        Ok(id) => analysis.id = Some(id),
        Err(e) => {
            tracing::warn!(error = %e, "failed to persist analysis record");
        }
    }

    ANALYSIS_DURATION.record(duration.as_secs_f64(), &[]);
    ANALYSIS_SNIPPETS.record(analysis.snippet_count as f64, &[]);

    let span = tracing::Span::current();
    if let Some(id) = analysis.id {
        span.record("analysis.id", id.to_string());
    }
    span.record("analysis.classification", analysis.classification.as_str());
    span.record("analysis.duration_ms", analysis.duration_ms);
    span.record("analysis.snippet_count", analysis.snippet_count);

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_question_rejected() {
        assert!(validate_question("").is_err());
    }

    #[test]
    fn test_whitespace_question_rejected() {
        assert!(validate_question("   \t\n").is_err());
    }

    #[test]
    fn test_nonempty_question_accepted() {
        assert!(validate_question("Is New Farm overvalued?").is_ok());
    }

    #[test]
    fn test_stage_status_serialization() {
        let completed = serde_json::to_value(StageStatus::Completed).unwrap();
        assert_eq!(completed["status"], "completed");

        let substituted = serde_json::to_value(StageStatus::Substituted {
            reason: "capability not configured".to_string(),
        })
        .unwrap();
        assert_eq!(substituted["status"], "substituted");
        assert_eq!(substituted["reason"], "capability not configured");
    }

    #[test]
    fn test_stage_status_from_outcome() {
        let ok: Result<String, CapabilityFailure> = Ok("text".to_string());
        assert!(matches!(
            StageStatus::from_outcome(&ok),
            StageStatus::Completed
        ));

        let err: Result<String, CapabilityFailure> = Err(CapabilityFailure::Timeout);
        match StageStatus::from_outcome(&err) {
            StageStatus::Substituted { reason } => assert_eq!(reason, "request timed out"),
            other => panic!("expected Substituted, got {other:?}"),
        }
    }
}
