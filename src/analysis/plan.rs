use crate::llm::{CapabilityClient, CapabilityFailure};

const SYSTEM: &str = "You are a Brisbane property research specialist. \
    Keep responses concise and focused on Brisbane, Queensland, Australia.";

/// Stage 1: ask the planner capability to classify the question's intent and
/// name the relevant Brisbane areas. Failures are returned typed; the
/// orchestrator substitutes [`placeholder`] at the call site.
#[tracing::instrument(
    name = "analysis_stage plan",
    skip(client),
    fields(analysis.stage = "plan")
)]
pub async fn plan(client: &CapabilityClient, question: &str) -> Result<String, CapabilityFailure> {
    let prompt = format!(
        "Analyze this Brisbane property question and provide insights:\n\n\
        Question: \"{question}\"\n\n\
        Please provide:\n\
        1. What type of property question this is (development, market, infrastructure, zoning, etc.)\n\
        2. Which specific Brisbane suburbs/areas are most relevant\n\
        3. What data sources would help answer this question\n\
        4. Key insights to look for in the data"
    );

    let resp = client.invoke(SYSTEM, &prompt).await?;
    Ok(resp.content)
}

/// Fixed substitute used when the planner is unavailable. Also fed into the
/// synthesizer prompt so stage 3 still has a stage-1 input.
pub fn placeholder(question: &str) -> String {
    format!("Planner analysis not available for: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_embeds_question() {
        let text = placeholder("Is New Farm overvalued?");
        assert_eq!(
            text,
            "Planner analysis not available for: Is New Farm overvalued?"
        );
    }
}
