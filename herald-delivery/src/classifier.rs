//! Failure classification.
//!
//! The transport is a black box whose error vocabulary is unstructured
//! text, so classification is substring matching, kept honest by living
//! in one ordered rule table instead of conditionals scattered through
//! the delivery loop. First matching rule wins; anything unmatched is
//! treated as transient.

use serde::{Deserialize, Serialize};

/// What the scheduler should do about a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Log and continue with the next recipient; no identity state change.
    Transient,
    /// The identity's quota or credentials are spent: pause it and warn.
    IdentityExhausted,
    /// The transport itself is unusable. No default rule produces this;
    /// the variant exists so custom tables can halt a campaign outright.
    Fatal,
}

/// One pattern-to-disposition mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRule {
    /// Case-insensitive substring matched against the raw error text
    pub pattern: String,
    pub disposition: Disposition,
}

impl ClassifierRule {
    #[must_use]
    pub fn new(pattern: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
            disposition,
        }
    }
}

/// Ordered rule table mapping transport error text to a [`Disposition`].
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    rules: Vec<ClassifierRule>,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::with_rules(Self::default_rules())
    }
}

impl FailureClassifier {
    /// Build a classifier from a custom rule table.
    #[must_use]
    pub fn with_rules(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// The stock exhaustion signatures: provider quota and daily-limit
    /// wording, and the SMTP authentication rejections (535, 5.7.1).
    #[must_use]
    pub fn default_rules() -> Vec<ClassifierRule> {
        ["quota", "daily", "535", "5.7.1", "authentication"]
            .into_iter()
            .map(|pattern| ClassifierRule::new(pattern, Disposition::IdentityExhausted))
            .collect()
    }

    /// Classify raw transport error text.
    #[must_use]
    pub fn classify(&self, error_text: &str) -> Disposition {
        let haystack = error_text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| haystack.contains(&rule.pattern))
            .map_or(Disposition::Transient, |rule| rule.disposition)
    }
}
