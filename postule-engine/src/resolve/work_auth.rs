//! Deterministic classifier for work-authorization and sponsorship
//! questions, in both UI languages.

use async_trait::async_trait;
use postule_config::AnswerConfig;
use regex::RegexSet;

use crate::experience::normalize_label;
use crate::types::{AnswerResult, AnswerSource, Question};

/// Resolves authorization/sponsorship questions to the configured fixed
/// answers. Sponsorship phrasing is checked first: "do you require visa
/// sponsorship" mentions both families and must not be read as an
/// authorization question.
pub struct WorkAuthResolver {
    sponsorship: RegexSet,
    authorization: RegexSet,
    authorization_answer: String,
    sponsorship_answer: String,
}

impl WorkAuthResolver {
    pub fn new(cfg: &AnswerConfig) -> Self {
        let sponsorship = RegexSet::new([
            r"require.*sponsorship",
            r"need.*sponsorship",
            r"sponsorship.*(required|needed|now or in the future)",
            r"sponsor.*(visa|work (permit|authorization))",
            r"visa.*sponsor",
            r"parrainage",
            r"sponsoriser",
            r"besoin.*(visa|permis de travail)",
        ])
        .expect("static sponsorship patterns");
        let authorization = RegexSet::new([
            r"legally (authorized|eligible|able) to work",
            r"authorized to work",
            r"right to work",
            r"eligible to work",
            r"work (permit|authorization|authorisation)",
            r"citizen(ship)?",
            r"permanent resident",
            r"currently (reside|live|located)",
            r"autorisé.{0,3} à travailler",
            r"légalement.*travailler",
            r"permis de travail",
            r"citoyennet",
            r"résident permanent",
        ])
        .expect("static authorization patterns");
        Self {
            sponsorship,
            authorization,
            authorization_answer: cfg.work_authorization.clone(),
            sponsorship_answer: cfg.needs_sponsorship.clone(),
        }
    }

    fn classify(&self, label: &str) -> Option<&str> {
        let norm = normalize_label(label);
        if self.sponsorship.is_match(&norm) {
            return Some(&self.sponsorship_answer);
        }
        if self.authorization.is_match(&norm) {
            return Some(&self.authorization_answer);
        }
        None
    }
}

#[async_trait]
impl super::Resolver for WorkAuthResolver {
    fn name(&self) -> &'static str {
        "work_auth"
    }

    async fn resolve(&self, question: &Question) -> AnswerResult {
        match self.classify(&question.label) {
            Some(answer) => AnswerResult::answered(answer, AnswerSource::WorkAuth),
            None => AnswerResult::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> WorkAuthResolver {
        WorkAuthResolver::new(&AnswerConfig::default())
    }

    #[test]
    fn authorization_questions_get_the_authorization_answer() {
        let r = resolver();
        assert_eq!(
            r.classify("Are you legally authorized to work in France?"),
            Some("No")
        );
        assert_eq!(r.classify("Êtes-vous autorisé à travailler au Canada ?"), Some("No"));
        assert_eq!(r.classify("Do you have a valid work permit?"), Some("No"));
    }

    #[test]
    fn sponsorship_wins_when_both_families_appear() {
        let r = resolver();
        assert_eq!(
            r.classify("Will you now or in the future require sponsorship for an employment visa?"),
            Some("Yes")
        );
        assert_eq!(
            r.classify("Do you require sponsorship to obtain work authorization?"),
            Some("Yes")
        );
        assert_eq!(
            r.classify("Aurez-vous besoin d'un parrainage pour travailler ?"),
            Some("Yes")
        );
    }

    #[test]
    fn classification_ignores_case_and_spacing() {
        let r = resolver();
        assert_eq!(
            r.classify("ARE YOU   LEGALLY AUTHORIZED TO WORK IN CANADA?"),
            r.classify("are you legally authorized to work in canada?")
        );
    }

    #[test]
    fn unrelated_questions_pass_through() {
        let r = resolver();
        assert_eq!(r.classify("How many years of experience with Java?"), None);
        assert_eq!(r.classify("What is your expected salary?"), None);
    }
}
