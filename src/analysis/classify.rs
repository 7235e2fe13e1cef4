use serde::Serialize;

/// The suggestion list offered to users. Classification is an exact string
/// match against these entries.
pub const PRESET_QUESTIONS: &[&str] = &[
    "Which Brisbane suburbs are trending in property news?",
    "What new development applications were lodged in Brisbane this month?",
    "How is Cross River Rail affecting property values?",
    "Which Brisbane areas have the strongest rental demand?",
    "What zoning changes are proposed for inner Brisbane?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Preset,
    Custom,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Preset => "preset",
            Classification::Custom => "custom",
        }
    }
}

/// Exact, case- and whitespace-sensitive membership check. A question
/// differing from a preset only by trailing whitespace is `Custom`.
pub fn classify(question: &str) -> Classification {
    if PRESET_QUESTIONS.contains(&question) {
        Classification::Preset
    } else {
        Classification::Custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_preset_matches() {
        for preset in PRESET_QUESTIONS {
            assert_eq!(classify(preset), Classification::Preset);
        }
    }

    #[test]
    fn test_unknown_question_is_custom() {
        assert_eq!(
            classify("Tell me about Gold Coast zoning"),
            Classification::Custom
        );
    }

    #[test]
    fn test_trailing_whitespace_is_custom() {
        let padded = format!("{} ", PRESET_QUESTIONS[0]);
        assert_eq!(classify(&padded), Classification::Custom);
    }

    #[test]
    fn test_case_change_is_custom() {
        let lowered = PRESET_QUESTIONS[0].to_lowercase();
        assert_eq!(classify(&lowered), Classification::Custom);
    }

    #[test]
    fn test_classification_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Classification::Preset).unwrap(),
            "\"preset\""
        );
        assert_eq!(Classification::Custom.as_str(), "custom");
    }
}
