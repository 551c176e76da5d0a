//! Experience questions answered from the configured years table.

use async_trait::async_trait;
use postule_config::AnswerConfig;

use crate::experience::{
    extract_skill_tokens, is_years_question, is_yes_no_experience_question, normalize_label,
    ExperienceProfile,
};
use crate::types::{AnswerResult, AnswerSource, Question};

pub struct ExperienceResolver {
    profile: ExperienceProfile,
    yes_word: String,
    no_word: String,
}

impl ExperienceResolver {
    pub fn new(profile: ExperienceProfile, answers: &AnswerConfig) -> Self {
        Self {
            profile,
            yes_word: answers.yes_word.clone(),
            no_word: answers.no_word.clone(),
        }
    }

    fn answer(&self, label: &str) -> Option<String> {
        let norm = normalize_label(label);

        // Yes/no phrasing first: "do you have at least N years with X" is a
        // yes/no question even though it mentions years.
        if is_yes_no_experience_question(&norm) {
            for token in extract_skill_tokens(&norm) {
                if let Some(years) = self.profile.lookup(&token) {
                    let word = if years > 0 { &self.yes_word } else { &self.no_word };
                    return Some(word.clone());
                }
            }
            return None;
        }

        if is_years_question(&norm) {
            // Generic totals fall back to the configured default.
            if norm.contains("total") || norm.contains("professional experience") {
                return Some(self.profile.default_years().to_string());
            }
            for token in extract_skill_tokens(&norm) {
                if let Some(years) = self.profile.lookup(&token) {
                    return Some(years.to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl super::Resolver for ExperienceResolver {
    fn name(&self) -> &'static str {
        "experience_map"
    }

    async fn resolve(&self, question: &Question) -> AnswerResult {
        match self.answer(&question.label) {
            Some(value) => AnswerResult::answered(value, AnswerSource::ExperienceMap),
            None => AnswerResult::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postule_config::ExperienceConfig;

    fn resolver(entries: &[(&str, u32)]) -> ExperienceResolver {
        let cfg = ExperienceConfig {
            years: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_years: 3,
        };
        ExperienceResolver::new(ExperienceProfile::from_config(&cfg), &AnswerConfig::default())
    }

    #[test]
    fn mapped_technology_answers_its_years() {
        let r = resolver(&[("react", 3)]);
        assert_eq!(
            r.answer("How many years of experience do you have with React?"),
            Some("3".to_string())
        );
    }

    #[test]
    fn yes_no_questions_answer_from_the_table() {
        let r = resolver(&[("kubernetes", 4), ("cobol", 0)]);
        assert_eq!(
            r.answer("Do you have experience with Kubernetes?"),
            Some("Yes".to_string())
        );
        assert_eq!(
            r.answer("Do you have experience with COBOL?"),
            Some("No".to_string())
        );
        assert_eq!(r.answer("Do you have experience with Fortran?"), None);
    }

    #[test]
    fn totals_use_the_default_years() {
        let r = resolver(&[]);
        assert_eq!(
            r.answer("How many years of total professional experience do you have?"),
            Some("3".to_string())
        );
    }

    #[test]
    fn unmapped_technology_stays_unresolved() {
        let r = resolver(&[("java", 5)]);
        assert_eq!(r.answer("How many years of experience with Erlang?"), None);
        assert_eq!(r.answer("What is your expected salary?"), None);
    }

    #[test]
    fn french_phrasing_resolves_too() {
        let r = resolver(&[("java", 5)]);
        assert_eq!(
            r.answer("Combien d'années d'expérience avec Java ?"),
            Some("5".to_string())
        );
    }
}
