//! Fixed personal answers for recurring non-experience questions.

use async_trait::async_trait;
use postule_config::{AnswerConfig, ProfileConfig};

use crate::experience::normalize_label;
use crate::types::{AnswerResult, AnswerSource, ControlKind, Question};

/// Consent-style vocabulary; checkboxes carrying it are agreed to.
const CONSENT_WORDS: &[&str] = &[
    "agree",
    "consent",
    "privacy",
    "accept",
    "terms",
    "j'accepte",
    "conditions",
    "confidentialité",
];

/// Answers salary, notice period, city, phone, and consent questions from
/// the configured profile. An empty configured value disables that rule.
pub struct ProfileResolver {
    cfg: ProfileConfig,
    yes_word: String,
}

impl ProfileResolver {
    pub fn new(cfg: &ProfileConfig, answers: &AnswerConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            yes_word: answers.yes_word.clone(),
        }
    }

    fn answer(&self, label: &str, control: ControlKind) -> Option<String> {
        let norm = normalize_label(label);

        if control == ControlKind::Checkbox && CONSENT_WORDS.iter().any(|w| norm.contains(w)) {
            return Some(self.yes_word.clone());
        }

        if norm.contains("salary")
            || norm.contains("salaire")
            || norm.contains("compensation")
            || norm.contains("rémunération")
        {
            return non_empty(&self.cfg.salary);
        }
        if norm.contains("notice period")
            || norm.contains("préavis")
            || (norm.contains("notice") && norm.contains("day"))
        {
            return Some(self.cfg.notice_days.to_string());
        }
        if norm.contains("city") || norm.contains("ville") {
            return non_empty(&self.cfg.city);
        }
        if norm.contains("phone") || norm.contains("téléphone") || norm.contains("mobile") {
            return non_empty(&self.cfg.phone);
        }
        None
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl super::Resolver for ProfileResolver {
    fn name(&self) -> &'static str {
        "profile"
    }

    async fn resolve(&self, question: &Question) -> AnswerResult {
        match self.answer(&question.label, question.control) {
            Some(value) => AnswerResult::answered(value, AnswerSource::Profile),
            None => AnswerResult::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(cfg: ProfileConfig) -> ProfileResolver {
        ProfileResolver::new(&cfg, &AnswerConfig::default())
    }

    #[test]
    fn recurring_questions_draw_from_the_profile() {
        let r = resolver(ProfileConfig {
            salary: "95000".to_string(),
            notice_days: 30,
            city: "Montréal".to_string(),
            phone: "+1 514 000 0000".to_string(),
        });
        let text = ControlKind::Text;
        assert_eq!(r.answer("What is your expected salary?", text), Some("95000".to_string()));
        assert_eq!(r.answer("Quel est votre salaire souhaité ?", text), Some("95000".to_string()));
        assert_eq!(r.answer("Notice period (days)", text), Some("30".to_string()));
        assert_eq!(r.answer("Quel est votre préavis ?", text), Some("30".to_string()));
        assert_eq!(r.answer("Current city", text), Some("Montréal".to_string()));
        assert_eq!(r.answer("Phone number", text), Some("+1 514 000 0000".to_string()));
        assert_eq!(r.answer("Why do you want this role?", text), None);
    }

    #[test]
    fn consent_checkboxes_get_the_yes_word() {
        let r = resolver(ProfileConfig::default());
        assert_eq!(
            r.answer(
                "I agree to the privacy policy and terms of service",
                ControlKind::Checkbox
            ),
            Some("Yes".to_string())
        );
        assert_eq!(
            r.answer("J'accepte les conditions d'utilisation", ControlKind::Checkbox),
            Some("Yes".to_string())
        );
        // Same vocabulary on a text control is not a consent box.
        assert_eq!(
            r.answer("I agree to the privacy policy", ControlKind::Text),
            None
        );
    }

    #[test]
    fn empty_values_disable_their_rule() {
        let r = resolver(ProfileConfig {
            salary: String::new(),
            notice_days: 15,
            city: String::new(),
            phone: String::new(),
        });
        let text = ControlKind::Text;
        assert_eq!(r.answer("Expected salary", text), None);
        assert_eq!(r.answer("Current city", text), None);
        assert_eq!(r.answer("Notice period in days", text), Some("15".to_string()));
    }
}
