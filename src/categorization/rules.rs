//! The keyword rules used to suggest a category for a bank transaction.

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A set of keywords that point to a renovation budget category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationRule {
    /// The category suggested when the rule matches, e.g. "Matériaux".
    pub category: String,
    /// Lower-case fragments searched for in transaction descriptions.
    pub keywords: BTreeSet<String>,
    /// The confidence given when every keyword matches, in `[0, 1]`.
    pub base_confidence: f64,
}

impl CategorizationRule {
    /// Create a rule, lower-casing the keywords.
    pub fn new(category: &str, keywords: &[&str], base_confidence: f64) -> Self {
        Self {
            category: category.to_owned(),
            keywords: keywords
                .iter()
                .map(|keyword| keyword.trim().to_lowercase())
                .collect(),
            base_confidence,
        }
    }
}

/// The rule set used when no rules file is configured.
pub fn default_rules() -> Vec<CategorizationRule> {
    vec![
        CategorizationRule::new(
            "Matériaux",
            &[
                "leroy merlin",
                "castorama",
                "brico depot",
                "brico dépôt",
                "bricomarche",
                "bricomarché",
                "point p",
                "gedimat",
                "carrelage",
                "parquet",
                "peinture",
                "placo",
                "ciment",
            ],
            0.9,
        ),
        CategorizationRule::new(
            "Outillage",
            &[
                "kiloutou",
                "loxam",
                "outillage",
                "perceuse",
                "visseuse",
                "location materiel",
                "location matériel",
            ],
            0.85,
        ),
        CategorizationRule::new(
            "Main d'oeuvre",
            &[
                "artisan",
                "plombier",
                "plomberie",
                "electricien",
                "électricien",
                "maconnerie",
                "maçonnerie",
                "menuiserie",
                "facture travaux",
            ],
            0.8,
        ),
        CategorizationRule::new(
            "Électroménager",
            &["darty", "boulanger", "electromenager", "électroménager"],
            0.8,
        ),
        CategorizationRule::new(
            "Décoration",
            &[
                "ikea",
                "maisons du monde",
                "conforama",
                "alinea",
                "luminaire",
                "rideau",
                "decoration",
                "décoration",
            ],
            0.75,
        ),
        CategorizationRule::new(
            "Transport",
            &["carburant", "station service", "peage", "péage", "sncf"],
            0.6,
        ),
    ]
}

/// Parse a JSON array of rules.
///
/// # Errors
/// Returns [Error::InvalidRules] if the JSON is malformed, a category is
/// empty, or a base confidence is outside `[0, 1]`.
pub fn parse_rules(json: &str) -> Result<Vec<CategorizationRule>, Error> {
    let rules: Vec<CategorizationRule> =
        serde_json::from_str(json).map_err(|error| Error::InvalidRules(error.to_string()))?;

    rules
        .into_iter()
        .map(|rule| {
            if rule.category.trim().is_empty() {
                return Err(Error::InvalidRules("rule category cannot be empty".to_owned()));
            }

            if !(0.0..=1.0).contains(&rule.base_confidence) {
                return Err(Error::InvalidRules(format!(
                    "base confidence for \"{}\" must be between 0 and 1, got {}",
                    rule.category, rule.base_confidence
                )));
            }

            Ok(CategorizationRule {
                keywords: rule
                    .keywords
                    .iter()
                    .map(|keyword| keyword.trim().to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .collect(),
                ..rule
            })
        })
        .collect()
}

/// Load rules from a JSON file.
///
/// # Errors
/// Returns [Error::InvalidRules] if the file cannot be read or parsed.
pub fn load_rules(path: &Path) -> Result<Vec<CategorizationRule>, Error> {
    let json = fs::read_to_string(path).map_err(|error| {
        Error::InvalidRules(format!("could not read {}: {error}", path.display()))
    })?;

    parse_rules(&json)
}
