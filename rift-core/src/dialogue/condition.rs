//! Predicate conditions gating dialogue branches.
//!
//! A [`Condition`] names a predicate and carries its string parameters; it
//! is checked against whatever [`ConditionEvaluator`]s the conversation
//! participant exposes. There is no central predicate registry: any
//! gameplay system can answer for the predicates it understands and abstain
//! from the rest.

use serde::{Deserialize, Serialize};

/// A tri-state predicate answerer.
///
/// `None` means "I don't know this predicate" and abstains from the check.
pub trait ConditionEvaluator {
    fn evaluate(&self, predicate: &str, parameters: &[String]) -> Option<bool>;
}

/// A named predicate with ordered string parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    predicate: String,
    #[serde(default)]
    parameters: Vec<String>,
}

impl Condition {
    pub fn new<P, I, S>(predicate: P, parameters: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicate: predicate.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// AND-of-non-false over all evaluators.
    ///
    /// Every evaluator is queried; abstentions are skipped, any `false`
    /// short-circuits the whole check, and a check with only `true`s and
    /// abstentions passes. This is not a majority vote.
    pub fn check<'a, I>(&self, evaluators: I) -> bool
    where
        I: IntoIterator<Item = &'a dyn ConditionEvaluator>,
    {
        for evaluator in evaluators {
            match evaluator.evaluate(&self.predicate, &self.parameters) {
                Some(false) => return false,
                Some(true) | None => {}
            }
        }
        true
    }
}
