use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Grounding text beyond this length is clipped before prompting; form
/// questions never need more context than this.
const MAX_GROUNDING_CHARS: usize = 12_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub confidence: Option<f64>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Clip to at most `max` characters on a char boundary.
fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Check if the service is reachable and answering.
    async fn health_check(&self) -> Result<bool>;

    /// The model name being used.
    fn model_name(&self) -> &str;

    /// System prompt shared by the form-answering helpers.
    fn form_assistant_system_prompt(&self) -> &str {
        "You are a form-filling assistant for job applications. You answer \
         with ONLY the value to put in the form field: no explanation, no \
         markdown, no surrounding quotes. For Yes/No questions reply exactly \
         \"Yes\" or \"No\". For numbers reply with just the number. Be \
         professional and concise."
    }

    /// Answer an open-ended form question in one short phrase, grounded in
    /// the candidate's CV text.
    async fn short_answer(
        &self,
        question: &str,
        grounding_text: &str,
        max_length: usize,
    ) -> Result<String> {
        let prompt = format!(
            "Given the candidate's CV and a job application question, return \
             ONLY the exact value to put in the form field (max {max_length} \
             characters).\n\nCV:\n---\n{}\n---\n\nQuestion: {}\n\nAnswer \
             (only the value, nothing else):",
            clip(grounding_text, MAX_GROUNDING_CHARS),
            question.trim(),
        );
        let response = self
            .generate(
                &prompt,
                Some(self.form_assistant_system_prompt()),
                Some(150),
                Some(0.2),
            )
            .await?;
        let mut answer = response.text.trim().trim_matches(['"', '\'']).to_string();
        answer.truncate(
            answer
                .char_indices()
                .nth(max_length)
                .map(|(idx, _)| idx)
                .unwrap_or(answer.len()),
        );
        Ok(answer)
    }

    /// Infer a whole-number years-of-experience answer (0-99) from the CV.
    /// Returns `None` when the reply carries no usable number.
    async fn years_of_experience(
        &self,
        question: &str,
        grounding_text: &str,
    ) -> Result<Option<u8>> {
        let prompt = format!(
            "The job application asks a \"years of experience\" question. \
             Based ONLY on the candidate's CV below (job titles, tenure \
             dates, skills), infer how many years of experience they have \
             for what is asked. Reply with ONLY one whole number between 0 \
             and 99. No decimals, no words. If the CV shows no relevant \
             experience, reply 0.\n\nCV:\n---\n{}\n---\n\nQuestion: {}\n\n\
             Answer (single integer 0-99 only):",
            clip(grounding_text, MAX_GROUNDING_CHARS),
            question.trim(),
        );
        let response = self
            .generate(
                &prompt,
                Some(self.form_assistant_system_prompt()),
                Some(10),
                Some(0.1),
            )
            .await?;
        let digits: String = response
            .text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .take(2)
            .collect();
        Ok(digits.parse::<u8>().ok().map(|n| n.min(99)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    #[async_trait]
    impl LlmClient for Canned {
        async fn generate(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _max_tokens: Option<u32>,
            _temperature: Option<f32>,
        ) -> Result<LlmResponse> {
            Ok(LlmResponse {
                text: self.0.to_string(),
                model: None,
                tokens_used: None,
                confidence: None,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn short_answer_strips_quotes_and_caps_length() {
        let client = Canned("\"Strong background in distributed systems and tooling\"");
        let answer = client.short_answer("Why you?", "cv text", 20).await.unwrap();
        assert_eq!(answer, "Strong background in");
    }

    #[tokio::test]
    async fn years_parses_first_number_and_caps_at_99() {
        let client = Canned("About 5 years");
        assert_eq!(client.years_of_experience("q", "cv").await.unwrap(), Some(5));

        let client = Canned("1204");
        assert_eq!(client.years_of_experience("q", "cv").await.unwrap(), Some(12));

        let client = Canned("unsure");
        assert_eq!(client.years_of_experience("q", "cv").await.unwrap(), None);
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("ab", 5), "ab");
    }
}
