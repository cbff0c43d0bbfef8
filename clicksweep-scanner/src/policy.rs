use crate::result::{ClassificationLabel, PLACEHOLDER_TEXT};
use serde::{Deserialize, Serialize};

/// A class of repeating, equivalent targets (listing cards and the like)
/// of which only one representative is exercised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

impl VolumeGroup {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Exact display texts that are never clicked.
    pub skip_texts: Vec<String>,
    /// Substrings that mark a target as never clicked.
    pub skip_keywords: Vec<String>,
    pub important_keywords: Vec<String>,
    pub volume_groups: Vec<VolumeGroup>,
    /// Texts with at most this many words count as button-like.
    pub max_words: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            skip_texts: ["Login", "Sign Up", "Register", "Next", "Continue", "🔓 Continue with Google"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_keywords: Vec::new(),
            important_keywords: ["Apply", "Buy", "Enquiry", "Contact", "Submit"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            volume_groups: vec![VolumeGroup::new(
                "car-listing",
                &["Car", "Carz", "Motors", "Bazar"],
            )],
            max_words: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Policy {
    config: PolicyConfig,
}

impl Policy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Label a display text. Pure: same text and config, same label.
    pub fn classify(&self, text: &str) -> ClassificationLabel {
        if self.is_skipped(text) {
            return ClassificationLabel::Skip;
        }

        if let Some(group) = self.volume_group(text) {
            return ClassificationLabel::VolumeLimited(group.name.clone());
        }

        if text == PLACEHOLDER_TEXT {
            return ClassificationLabel::Excluded;
        }

        let important = self
            .config
            .important_keywords
            .iter()
            .any(|k| text.contains(k.as_str()));
        if important || text.split_whitespace().count() <= self.config.max_words {
            ClassificationLabel::Testable
        } else {
            ClassificationLabel::Excluded
        }
    }

    fn is_skipped(&self, text: &str) -> bool {
        self.config.skip_texts.iter().any(|s| s == text)
            || self
                .config
                .skip_keywords
                .iter()
                .any(|k| !k.is_empty() && text.contains(k.as_str()))
    }

    fn volume_group(&self, text: &str) -> Option<&VolumeGroup> {
        self.config.volume_groups.iter().find(|group| {
            group
                .keywords
                .iter()
                .any(|k| !k.is_empty() && text.contains(k.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy::default()
    }

    #[test]
    fn test_skip_list_exact_match() {
        assert_eq!(policy().classify("Login"), ClassificationLabel::Skip);
        assert_eq!(policy().classify("Sign Up"), ClassificationLabel::Skip);
        // exact list is not a substring list
        assert_eq!(policy().classify("Login help"), ClassificationLabel::Testable);
    }

    #[test]
    fn test_skip_keywords_match_substrings() {
        let policy = Policy::new(PolicyConfig {
            skip_keywords: vec!["Pune".to_string(), "Delhi".to_string()],
            ..PolicyConfig::default()
        });
        assert_eq!(policy.classify("Used cars in Pune"), ClassificationLabel::Skip);
        assert_eq!(policy.classify("Delhi"), ClassificationLabel::Skip);
    }

    #[test]
    fn test_skip_wins_over_volume_group() {
        let policy = Policy::new(PolicyConfig {
            skip_texts: vec!["Sell Car".to_string()],
            ..PolicyConfig::default()
        });
        assert_eq!(policy.classify("Sell Car"), ClassificationLabel::Skip);
    }

    #[test]
    fn test_volume_group_key_is_group_name_not_text() {
        let p = policy();
        assert_eq!(
            p.classify("Used Cars"),
            ClassificationLabel::VolumeLimited("car-listing".to_string())
        );
        assert_eq!(
            p.classify("Sharma Motors, Karol Bagh - 2019 Swift VXI 45,000 km"),
            ClassificationLabel::VolumeLimited("car-listing".to_string())
        );
    }

    #[test]
    fn test_groups_checked_in_configured_order() {
        let policy = Policy::new(PolicyConfig {
            volume_groups: vec![
                VolumeGroup::new("dealer", &["Motors"]),
                VolumeGroup::new("vehicle", &["Motors", "Bikes"]),
            ],
            ..PolicyConfig::default()
        });
        assert_eq!(
            policy.classify("City Motors"),
            ClassificationLabel::VolumeLimited("dealer".to_string())
        );
        assert_eq!(
            policy.classify("Bikes"),
            ClassificationLabel::VolumeLimited("vehicle".to_string())
        );
    }

    #[test]
    fn test_short_text_is_testable() {
        assert_eq!(policy().classify("Expand Filters"), ClassificationLabel::Testable);
        assert_eq!(policy().classify("Read the blog"), ClassificationLabel::Testable);
    }

    #[test]
    fn test_important_keyword_promotes_long_text() {
        assert_eq!(
            policy().classify("Submit your details and we will call back"),
            ClassificationLabel::Testable
        );
    }

    #[test]
    fn test_walls_of_text_are_excluded() {
        assert_eq!(
            policy().classify("We have been serving happy customers since many years now"),
            ClassificationLabel::Excluded
        );
    }

    #[test]
    fn test_placeholder_is_excluded() {
        assert_eq!(policy().classify(PLACEHOLDER_TEXT), ClassificationLabel::Excluded);
    }

    #[test]
    fn test_max_words_threshold_is_configurable() {
        let policy = Policy::new(PolicyConfig {
            max_words: 1,
            ..PolicyConfig::default()
        });
        assert_eq!(policy.classify("Pricing"), ClassificationLabel::Testable);
        assert_eq!(policy.classify("Our pricing"), ClassificationLabel::Excluded);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let p = policy();
        for text in ["Login", "Used Cars", "Expand Filters", "a b c d e f", PLACEHOLDER_TEXT] {
            assert_eq!(p.classify(text), p.classify(text));
        }
    }

    #[test]
    fn test_config_round_trips_through_json_with_defaults() {
        let parsed: PolicyConfig = serde_json::from_str(r#"{ "max_words": 5 }"#).unwrap();
        assert_eq!(parsed.max_words, 5);
        assert_eq!(parsed.skip_texts, PolicyConfig::default().skip_texts);
    }
}
