use serde::Serialize;

use crate::categorization::CategorizationRule;

/// The category suggested when no rule matches.
pub const OTHER_CATEGORY: &str = "OTHER";

/// A suggested category for a transaction and how strongly the rules point to it.
///
/// The confidence is a heuristic keyword-match score in `[0, 1]`, not a probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySuggestion {
    /// The suggested category.
    pub category: String,
    /// The score of the winning rule.
    pub confidence: f64,
}

impl CategorySuggestion {
    fn other() -> Self {
        Self {
            category: OTHER_CATEGORY.to_owned(),
            confidence: 0.0,
        }
    }
}

/// Suggest a category for a transaction `description`.
///
/// Each rule scores `matched keywords / total keywords * base confidence`,
/// matching keywords as case-insensitive substrings. The highest score wins
/// and the earlier rule wins a tie. If no rule scores above zero the
/// suggestion is [OTHER_CATEGORY] with zero confidence.
pub fn categorize(description: &str, rules: &[CategorizationRule]) -> CategorySuggestion {
    let description = description.to_lowercase();

    rules
        .iter()
        .fold(CategorySuggestion::other(), |best, rule| {
            let confidence = score_rule(&description, rule);

            if confidence > best.confidence {
                CategorySuggestion {
                    category: rule.category.clone(),
                    confidence,
                }
            } else {
                best
            }
        })
}

/// Score a lower-cased `description` against a single rule.
fn score_rule(description: &str, rule: &CategorizationRule) -> f64 {
    if rule.keywords.is_empty() {
        return 0.0;
    }

    let matched = rule
        .keywords
        .iter()
        .filter(|keyword| matches_keyword(description, keyword))
        .count();

    (matched as f64 / rule.keywords.len() as f64) * rule.base_confidence
}

#[inline]
fn matches_keyword(description: &str, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();

    !keyword.is_empty() && description.contains(&keyword)
}
