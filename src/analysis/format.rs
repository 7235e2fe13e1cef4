use chrono::{DateTime, Utc};

use super::gather::Snippet;
use crate::llm::CapabilityFailure;

/// One entry of the degraded-path answer table. Predicates run against the
/// lowercased question text, top to bottom; the first match wins. Questions
/// matching no entry get [`GENERIC_TEMPLATE`].
pub struct AnswerTemplate {
    pub name: &'static str,
    matcher: fn(&str) -> bool,
    pub body: &'static str,
}

pub static TEMPLATES: &[AnswerTemplate] = &[
    AnswerTemplate {
        name: "development",
        matcher: |q| q.contains("development") && q.contains("application"),
        body: "### Development Application Activity\n\n\
               Brisbane City Council's development pipeline remains concentrated in South \
               Brisbane, Fortitude Valley and Woolloongabba, with mixed-use projects making up \
               the largest share of recent lodgements. Kurilpa Point and the Gabba precinct are \
               seeing renewed developer interest ahead of major infrastructure delivery.\n\n\
               ### What To Watch\n\n\
               Track lodgement volumes against approvals: a widening gap has historically \
               signalled assessment backlogs rather than falling demand. Character-housing \
               overlays in Paddington and New Farm continue to constrain infill supply.",
    },
    AnswerTemplate {
        name: "infrastructure",
        matcher: |q| {
            q.contains("infrastructure") || q.contains("cross river rail") || q.contains("transport")
        },
        body: "### Infrastructure Impact\n\n\
               Cross River Rail and Brisbane Metro remain the dominant value drivers. Published \
               impact studies indicate a 20-30% uplift within 800m of new stations, with \
               Woolloongabba, Boggo Road and Albert Street catchments most affected.\n\n\
               ### Investment Implications\n\n\
               Station-adjacent precincts typically re-rate in the two years before opening. \
               Watch rezoning activity around announced station boxes for the earliest signal.",
    },
    AnswerTemplate {
        name: "zoning",
        matcher: |q| q.contains("zoning"),
        body: "### Zoning and Planning Context\n\n\
               Zoning questions in the Brisbane region hinge on the City Plan 2014 \
               neighbourhood plans and any active temporary local planning instruments. Recent \
               amendment packages have focused on increasing density along transit corridors \
               while preserving character-housing precincts.\n\n\
               ### Key Considerations\n\n\
               Check the relevant neighbourhood plan, current overlays (flood, character, \
               heritage), and any site-specific preliminary approvals before relying on the \
               base zoning. Proposed amendments are exhibited publicly before adoption.",
    },
    AnswerTemplate {
        name: "trending",
        matcher: |q| q.contains("trending") || q.contains("suburb"),
        body: "### Trending Brisbane Suburbs\n\n\
               South Brisbane, Fortitude Valley, New Farm, Paddington and Teneriffe are the \
               suburbs most frequently cited in current property coverage, driven by \
               development pipeline activity, infrastructure delivery and character-housing \
               demand.\n\n\
               ### Why They Are Moving\n\n\
               Inner-city mixed-use precincts are absorbing the bulk of new supply while \
               character precincts trade on scarcity. Cross River Rail catchments are the \
               common thread across most trending lists.",
    },
];

/// Documented default when no table entry matches.
pub static GENERIC_TEMPLATE: AnswerTemplate = AnswerTemplate {
    name: "generic",
    matcher: |_| true,
    body: "### Enhanced Analysis\n\n\
           This Brisbane property question requires analysis of current market conditions, \
           development activity, and infrastructure impact.\n\n\
           **Primary Brisbane Areas:** South Brisbane, Fortitude Valley, New Farm, Paddington, \
           Teneriffe\n\
           **Market Factors:** Development pipeline, infrastructure projects (Cross River Rail, \
           Brisbane Metro), character housing demand\n\
           **Data Sources:** Brisbane City Council applications, property market reports, \
           infrastructure project updates\n\n\
           Current market conditions show sustained growth in inner-city areas with particular \
           strength in mixed-use developments and character housing precincts.",
};

pub fn select_template(question: &str) -> &'static AnswerTemplate {
    let q = question.to_lowercase();
    TEMPLATES
        .iter()
        .find(|t| (t.matcher)(&q))
        .unwrap_or(&GENERIC_TEMPLATE)
}

pub struct FormatParams<'a> {
    pub question: &'a str,
    pub plan: Result<&'a str, &'a CapabilityFailure>,
    pub synthesis: Result<&'a str, &'a CapabilityFailure>,
    pub snippets: &'a [Snippet],
    pub generated_at: DateTime<Utc>,
}

/// Stage 4: assemble the final Markdown answer. Deterministic for a given
/// (question, capability outcome) pair apart from the embedded timestamp.
#[tracing::instrument(
    name = "analysis_stage format",
    skip(params),
    fields(analysis.stage = "format", analysis.template = tracing::field::Empty)
)]
pub fn format_answer(params: FormatParams<'_>) -> String {
    let mut answer = format!(
        "# Brisbane Property Intelligence Analysis\n\n## Query: {}\n\n",
        params.question
    );

    if let Ok(synthesis) = params.synthesis {
        answer.push_str("## Market Analysis\n\n");
        answer.push_str(synthesis);
        answer.push_str("\n\n");
    }

    if let Ok(plan) = params.plan {
        answer.push_str("## Strategic Research Insights\n\n");
        answer.push_str(plan);
        answer.push_str("\n\n");
    }

    if params.plan.is_err() && params.synthesis.is_err() {
        let template = select_template(params.question);
        tracing::Span::current().record("analysis.template", template.name);
        answer.push_str(template.body);
        answer.push_str("\n\n");
    }

    answer.push_str("## Data Sources Analyzed\n\n");
    for snippet in params.snippets {
        answer.push_str(&format!(
            "- **{}** ({}): {}\n",
            snippet.source, snippet.date, snippet.title
        ));
    }

    answer.push_str("\n## Processing Summary\n\n");
    answer.push_str(&format!("- **Planner**: {}\n", stage_line(params.plan)));
    answer.push_str(&format!(
        "- **Synthesizer**: {}\n",
        stage_line(params.synthesis)
    ));
    answer.push_str(&format!(
        "- **Data sources**: {} Brisbane property sources analyzed\n",
        params.snippets.len()
    ));
    answer.push_str(&format!(
        "- **Analysis date**: {}\n",
        params.generated_at.format("%B %d, %Y at %H:%M UTC")
    ));

    answer.push_str("\n---\n*Brisbane Property Intelligence - Multi-LLM Analysis System*\n");

    answer
}

fn stage_line(outcome: Result<&str, &CapabilityFailure>) -> String {
    match outcome {
        Ok(_) => "Completed".to_string(),
        Err(failure) => format!("Substituted ({failure})"),
    }
}
