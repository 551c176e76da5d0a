//! Layered answer resolution.
//!
//! A question runs through an ordered chain of stages; the first stage that
//! produces an answer wins. Per-candidate policy answers, when present, sit
//! in front of every stage. Numeric answers are conformed to the control's
//! declared bounds after resolution, whatever stage produced them.

mod document;
mod experience;
mod profile;
mod work_auth;

pub use document::DocumentResolver;
pub use experience::ExperienceResolver;
pub use profile::ProfileResolver;
pub use work_auth::WorkAuthResolver;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::experience::normalize_label;
use crate::types::{AnswerResult, AnswerSource, ControlKind, Question};

/// One stage of the chain. Stages must be deterministic for a given input
/// except the document stage, which consults an external service.
#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(&self, question: &Question) -> AnswerResult;
}

/// Canonical key for matching policy answer names against question labels.
/// Both sides reduce to the same token for the recurring question families.
fn canonical_key(text: &str) -> String {
    let norm = normalize_label(text);
    let compact = norm.replace(['_', '-'], " ");
    if (compact.contains("year") || compact.contains("année")) && compact.contains("exp") {
        return "years_of_experience".to_string();
    }
    if compact.contains("salary") || compact.contains("salaire") || compact.contains("rémunération")
    {
        return "salary".to_string();
    }
    if compact.contains("sponsor") || compact.contains("visa") || compact.contains("parrainage") {
        return "visa".to_string();
    }
    if compact.contains("notice") || compact.contains("préavis") {
        return "notice".to_string();
    }
    if compact.contains("phone") || compact.contains("téléphone") {
        return "phone".to_string();
    }
    let mut key = compact;
    if let Some((cut, _)) = key.char_indices().nth(80) {
        key.truncate(cut);
    }
    key
}

/// Per-candidate answers returned by the screening workflow, matched
/// against question labels ahead of every chain stage.
#[derive(Debug, Clone, Default)]
pub struct PolicyAnswers {
    entries: Vec<PolicyEntry>,
}

#[derive(Debug, Clone)]
struct PolicyEntry {
    canonical: String,
    normalized: String,
    value: String,
}

impl PolicyAnswers {
    pub fn new(answers: HashMap<String, String>) -> Self {
        let entries = answers
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| PolicyEntry {
                canonical: canonical_key(&key),
                normalized: normalize_label(&key.replace(['_', '-'], " ")),
                value: value.trim().to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer for a question label: canonical match first, then a
    /// containment match on the normalized forms.
    pub fn lookup(&self, label: &str) -> Option<&str> {
        let canonical = canonical_key(label);
        if let Some(entry) = self.entries.iter().find(|e| e.canonical == canonical) {
            return Some(&entry.value);
        }
        let normalized = normalize_label(label);
        self.entries
            .iter()
            .find(|e| {
                e.normalized.len() >= 4
                    && (normalized.contains(&e.normalized) || e.normalized.contains(&normalized))
            })
            .map(|e| e.value.as_str())
    }
}

/// Conform a resolved value to a text control's declared numeric bounds.
/// Non-numeric values for a bounded control are unusable.
fn conform_numeric(question: &Question, value: String) -> Option<String> {
    let Some((min, max)) = question.numeric_bounds else {
        return Some(value);
    };
    if question.control != ControlKind::Text {
        return Some(value);
    }
    let parsed: f64 = value.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let clamped = (parsed.round() as i64).clamp(min, max);
    Some(clamped.to_string())
}

/// The ordered stages, consulted first-match-wins.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    pub async fn resolve(&self, question: &Question) -> AnswerResult {
        self.resolve_with_policy(question, None).await
    }

    /// Resolve one question, letting per-candidate policy answers shadow
    /// the chain for the labels they cover.
    pub async fn resolve_with_policy(
        &self,
        question: &Question,
        policy: Option<&PolicyAnswers>,
    ) -> AnswerResult {
        if let Some(value) = policy.and_then(|p| p.lookup(&question.label)) {
            debug!(label = %question.label, "policy answer matched");
            return self.conform(question, value.to_string(), AnswerSource::Policy);
        }
        for resolver in &self.resolvers {
            if let AnswerResult::Answered { value, source } = resolver.resolve(question).await {
                debug!(label = %question.label, stage = resolver.name(), "question resolved");
                return self.conform(question, value, source);
            }
        }
        AnswerResult::Unresolved
    }

    fn conform(&self, question: &Question, value: String, source: AnswerSource) -> AnswerResult {
        match conform_numeric(question, value) {
            Some(value) => AnswerResult::Answered { value, source },
            None => {
                debug!(label = %question.label, "resolved value does not fit the numeric control");
                AnswerResult::Unresolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        value: Option<&'static str>,
        source: AnswerSource,
    }

    #[async_trait]
    impl Resolver for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn resolve(&self, _question: &Question) -> AnswerResult {
            match self.value {
                Some(v) => AnswerResult::answered(v, self.source),
                None => AnswerResult::Unresolved,
            }
        }
    }

    fn text_question(label: &str) -> Question {
        Question {
            label: label.to_string(),
            control: ControlKind::Text,
            current_value: String::new(),
            required: true,
            options: Vec::new(),
            numeric_bounds: None,
            max_length: None,
        }
    }

    #[tokio::test]
    async fn first_answering_stage_wins() {
        let chain = ResolverChain::new(vec![
            Box::new(Fixed {
                name: "first",
                value: None,
                source: AnswerSource::WorkAuth,
            }),
            Box::new(Fixed {
                name: "second",
                value: Some("No"),
                source: AnswerSource::WorkAuth,
            }),
            Box::new(Fixed {
                name: "third",
                value: Some("should not be reached"),
                source: AnswerSource::DocumentAi,
            }),
        ]);
        let question = text_question("Are you authorized to work in France?");
        let result = chain.resolve(&question).await;
        assert_eq!(result, AnswerResult::answered("No", AnswerSource::WorkAuth));
        // Deterministic stages make resolution idempotent.
        assert_eq!(chain.resolve(&question).await, result);
    }

    #[tokio::test]
    async fn policy_answers_shadow_the_chain_only_for_covered_labels() {
        let chain = ResolverChain::new(vec![Box::new(Fixed {
            name: "classifier",
            value: Some("No"),
            source: AnswerSource::WorkAuth,
        })]);
        let mut answers = HashMap::new();
        answers.insert("visa".to_string(), "Yes".to_string());
        let policy = PolicyAnswers::new(answers);

        let covered = text_question("Will you require visa sponsorship?");
        assert_eq!(
            chain.resolve_with_policy(&covered, Some(&policy)).await,
            AnswerResult::answered("Yes", AnswerSource::Policy)
        );

        let uncovered = text_question("What is your current city?");
        assert_eq!(
            chain.resolve_with_policy(&uncovered, Some(&policy)).await,
            AnswerResult::answered("No", AnswerSource::WorkAuth)
        );
    }

    #[tokio::test]
    async fn numeric_answers_are_clamped_into_declared_bounds() {
        let chain = ResolverChain::new(vec![Box::new(Fixed {
            name: "years",
            value: Some("120"),
            source: AnswerSource::ExperienceMap,
        })]);
        let mut question = text_question("Years of experience with COBOL?");
        question.numeric_bounds = Some((0, 99));
        assert_eq!(
            chain.resolve(&question).await,
            AnswerResult::answered("99", AnswerSource::ExperienceMap)
        );
    }

    #[tokio::test]
    async fn non_numeric_answer_for_bounded_control_is_unresolved() {
        let chain = ResolverChain::new(vec![Box::new(Fixed {
            name: "chatty",
            value: Some("plenty of experience"),
            source: AnswerSource::DocumentAi,
        })]);
        let mut question = text_question("Years of experience?");
        question.numeric_bounds = Some((0, 99));
        assert!(chain.resolve(&question).await.is_unresolved());
    }

    #[test]
    fn policy_lookup_matches_canonical_families() {
        let mut answers = HashMap::new();
        answers.insert("years_of_experience".to_string(), "6".to_string());
        answers.insert("expected salary".to_string(), "90000".to_string());
        let policy = PolicyAnswers::new(answers);

        assert_eq!(
            policy.lookup("How many years of experience do you have with Java?"),
            Some("6")
        );
        assert_eq!(policy.lookup("Quel est votre salaire souhaité ?"), Some("90000"));
        assert_eq!(policy.lookup("What is your phone number?"), None);
    }

    #[test]
    fn blank_policy_values_are_dropped() {
        let mut answers = HashMap::new();
        answers.insert("salary".to_string(), "   ".to_string());
        let policy = PolicyAnswers::new(answers);
        assert!(policy.is_empty());
        assert_eq!(policy.lookup("Expected salary"), None);
    }
}
