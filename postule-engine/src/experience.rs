//! Technology-to-years lookup and the label analysis that feeds it.
//!
//! Questions arrive as free-form French or English labels. The helpers here
//! classify a label (years question, yes/no experience question) and pull
//! the technology phrases out of it so the configured table can be consulted
//! before any reasoning call is made.

use std::collections::HashMap;
use std::sync::OnceLock;

use postule_config::ExperienceConfig;
use regex::Regex;

/// Phrases that introduce the technology part of an experience question.
const SKILL_SEPARATORS: &[&str] = &[
    " experience with ",
    " experience in ",
    " experience using ",
    " expérience avec ",
    " expérience en ",
    " expérience sur ",
    " with ",
    " avec ",
    " using ",
    " utilisant ",
    " in ",
    " en ",
];

/// Connectors splitting one phrase into several technology tokens.
const TOKEN_SPLITTERS: &[&str] = &[" and ", " or ", " et ", " ou "];

const LEADING_ARTICLES: &[&str] = &["the ", "a ", "an ", "le ", "la ", "les ", "l'", "du ", "de "];

const MAX_TOKENS: usize = 8;

fn yes_no_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^do you have\b",
            r"(?i)^have you\b",
            r"(?i)^are you (familiar|experienced|comfortable)\b",
            r"(?i)^avez[- ]vous\b",
            r"(?i)^êtes[- ]vous (familier|à l'aise)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

/// Lowercase the label and collapse runs of whitespace.
pub fn normalize_label(label: &str) -> String {
    label.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a (normalized) label asks for a number of years of experience.
pub fn is_years_question(label_norm: &str) -> bool {
    let mentions_years = label_norm.contains("year")
        || label_norm.contains("année")
        || label_norm.contains("ans ")
        || label_norm.ends_with(" ans")
        || label_norm.contains("ans d'")
        || label_norm.contains("ans de");
    let mentions_experience =
        label_norm.contains("experience") || label_norm.contains("expérience");
    mentions_years && mentions_experience
}

/// Whether a (normalized) label is a yes/no experience question.
///
/// "How many years …" phrasings are counting questions and are never
/// treated as yes/no, regardless of how they open.
pub fn is_yes_no_experience_question(label_norm: &str) -> bool {
    if label_norm.contains("how many") || label_norm.contains("combien") {
        return false;
    }
    let mentions_experience = label_norm.contains("experience")
        || label_norm.contains("expérience")
        || label_norm.contains("worked with")
        || label_norm.contains("travaillé avec");
    mentions_experience && yes_no_patterns().iter().any(|p| p.is_match(label_norm))
}

/// Pull the technology phrases out of a (normalized) label.
///
/// The text after the last separator phrase is split on connectors, commas,
/// and slashes; each piece is stripped of articles and trailing punctuation.
/// Order is preserved and the result is capped at [`MAX_TOKENS`].
pub fn extract_skill_tokens(label_norm: &str) -> Vec<String> {
    let mut tail: &str = label_norm;
    let mut best_start = None;
    for separator in SKILL_SEPARATORS {
        if let Some(pos) = label_norm.rfind(separator) {
            let start = pos + separator.len();
            if best_start.map_or(true, |prior| start > prior) {
                best_start = Some(start);
            }
        }
    }
    if let Some(start) = best_start {
        tail = &label_norm[start..];
    } else if let Some(pos) = label_norm.rfind(':') {
        // "React: how many years?" keeps the head, not the question tail.
        tail = &label_norm[..pos];
    } else {
        return Vec::new();
    }

    let mut pieces = vec![tail.to_string()];
    for splitter in TOKEN_SPLITTERS {
        pieces = pieces
            .into_iter()
            .flat_map(|piece| {
                piece
                    .split(splitter)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
    }
    pieces = pieces
        .into_iter()
        .flat_map(|piece| {
            piece
                .split(|c| c == ',' || c == '/')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    let mut tokens = Vec::new();
    for piece in pieces {
        let mut token = piece.trim().trim_matches(|c: char| "?.!;()".contains(c)).trim();
        for article in LEADING_ARTICLES {
            if let Some(stripped) = token.strip_prefix(article) {
                token = stripped;
                break;
            }
        }
        let token = token.trim();
        if !token.is_empty() && token.len() <= 40 && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
        if tokens.len() == MAX_TOKENS {
            break;
        }
    }
    tokens
}

/// The configured technology-to-years table.
#[derive(Debug, Clone)]
pub struct ExperienceProfile {
    years: HashMap<String, u32>,
    default_years: u32,
}

impl ExperienceProfile {
    pub fn from_config(cfg: &ExperienceConfig) -> Self {
        let years = cfg
            .years
            .iter()
            .map(|(name, years)| (normalize_label(name), *years))
            .collect();
        Self {
            years,
            default_years: cfg.default_years,
        }
    }

    /// Years for a technology token, if the table names it. Matching is
    /// case-insensitive and tolerates spacing differences ("node js").
    pub fn lookup(&self, token: &str) -> Option<u32> {
        let normalized = normalize_label(token);
        if let Some(years) = self.years.get(&normalized) {
            return Some(*years);
        }
        let compact = normalized.replace(' ', "");
        self.years
            .iter()
            .find(|(name, _)| name.replace(' ', "") == compact)
            .map(|(_, years)| *years)
    }

    /// Fallback for generic years questions naming no technology.
    pub fn default_years(&self) -> u32 {
        self.default_years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(entries: &[(&str, u32)]) -> ExperienceProfile {
        let cfg = ExperienceConfig {
            years: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_years: 3,
        };
        ExperienceProfile::from_config(&cfg)
    }

    #[test]
    fn years_questions_need_both_vocabularies() {
        assert!(is_years_question(&normalize_label(
            "How many years of experience do you have with React?"
        )));
        assert!(is_years_question(&normalize_label(
            "Combien d'années d'expérience avec Java ?"
        )));
        assert!(!is_years_question(&normalize_label("How many years old are you?")));
        assert!(!is_years_question(&normalize_label(
            "Do you have experience with Kubernetes?"
        )));
    }

    #[test]
    fn counting_questions_are_never_yes_no() {
        assert!(is_yes_no_experience_question(&normalize_label(
            "Do you have experience with Kubernetes?"
        )));
        assert!(is_yes_no_experience_question(&normalize_label(
            "Avez-vous de l'expérience avec Docker ?"
        )));
        assert!(!is_yes_no_experience_question(&normalize_label(
            "How many years of experience do you have with React?"
        )));
        assert!(!is_yes_no_experience_question(&normalize_label(
            "Combien d'années d'expérience avec Java ?"
        )));
    }

    #[test]
    fn tokens_come_from_the_separator_tail() {
        let tokens = extract_skill_tokens(&normalize_label(
            "How many years of experience do you have with React?"
        ));
        assert_eq!(tokens, vec!["react"]);

        let tokens = extract_skill_tokens(&normalize_label(
            "Years of experience with Java and Spring Boot"
        ));
        assert_eq!(tokens, vec!["java", "spring boot"]);
    }

    #[test]
    fn tokens_split_on_commas_and_slashes() {
        let tokens =
            extract_skill_tokens(&normalize_label("Experience with AWS, GCP/Azure and Terraform"));
        assert_eq!(tokens, vec!["aws", "gcp", "azure", "terraform"]);
    }

    #[test]
    fn colon_labels_keep_the_head() {
        let tokens = extract_skill_tokens("kubernetes: how many years");
        assert_eq!(tokens, vec!["kubernetes"]);
    }

    #[test]
    fn no_separator_means_no_tokens() {
        assert!(extract_skill_tokens("years of total professional experience").is_empty());
    }

    #[test]
    fn lookup_is_case_and_spacing_insensitive() {
        let profile = profile(&[("Node.js", 4), ("spring boot", 2)]);
        assert_eq!(profile.lookup("node.js"), Some(4));
        assert_eq!(profile.lookup("Spring Boot"), Some(2));
        assert_eq!(profile.lookup("springboot"), Some(2));
        assert_eq!(profile.lookup("rust"), None);
        assert_eq!(profile.default_years(), 3);
    }
}
