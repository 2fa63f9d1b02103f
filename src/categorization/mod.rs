//! Keyword based category suggestions for bank transactions.
//!
//! Suggestions are computed on the fly when transactions are listed and are
//! never persisted.

mod rules;
mod scorer;

pub use rules::{CategorizationRule, default_rules, load_rules, parse_rules};
pub use scorer::{CategorySuggestion, OTHER_CATEGORY, categorize};
