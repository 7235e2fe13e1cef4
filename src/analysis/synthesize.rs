use crate::llm::{CapabilityClient, CapabilityFailure};

const SYSTEM: &str = "You are a Brisbane property market analyst. \
    Focus on actionable information for Brisbane property professionals.";

/// Stage 3: hand the synthesizer the question, the stage-1 text (real or
/// placeholder), and the snippet count, and get back the long-form answer.
#[tracing::instrument(
    name = "analysis_stage synthesize",
    skip(client, plan_text),
    fields(analysis.stage = "synthesize", analysis.snippet_count = snippet_count)
)]
pub async fn synthesize(
    client: &CapabilityClient,
    question: &str,
    plan_text: &str,
    snippet_count: usize,
) -> Result<String, CapabilityFailure> {
    let prompt = format!(
        "Based on this research question and initial analysis, provide a comprehensive answer:\n\n\
        Question: \"{question}\"\n\n\
        Initial Analysis: {plan_text}\n\n\
        Data Sources Available: {snippet_count} Brisbane property data sources\n\n\
        Please provide a detailed Brisbane property market analysis that directly answers the \
        question. Include:\n\
        - Specific Brisbane suburbs and areas\n\
        - Current market trends and data\n\
        - Investment or development implications\n\
        - Professional insights for property industry"
    );

    let resp = client.invoke(SYSTEM, &prompt).await?;
    Ok(resp.content)
}
