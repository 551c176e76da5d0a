//! Last-resort stage: answers grounded in the candidate's CV text via the
//! configured reasoning service.

use std::sync::Arc;

use async_trait::async_trait;
use postule_llm::traits::{LlmClient, LlmError};
use tracing::{debug, warn};

use crate::document::DocumentStore;
use crate::experience::{is_years_question, normalize_label};
use crate::types::{AnswerResult, AnswerSource, ControlKind, Question};

/// Default character budget for free-text answers when the control
/// declares no maxlength.
const DEFAULT_ANSWER_CHARS: usize = 100;

pub struct DocumentResolver {
    llm: Arc<dyn LlmClient>,
    documents: Arc<DocumentStore>,
}

impl DocumentResolver {
    pub fn new(llm: Arc<dyn LlmClient>, documents: Arc<DocumentStore>) -> Self {
        Self { llm, documents }
    }

    async fn years_answer(&self, label: &str, grounding: &str) -> Option<String> {
        let attempt = self.llm.years_of_experience(label, grounding).await;
        match retry_network(attempt, || self.llm.years_of_experience(label, grounding)).await {
            Ok(Some(years)) => Some(years.to_string()),
            Ok(None) => {
                debug!(label, "reasoning service returned no usable year count");
                None
            }
            Err(e) => {
                warn!(label, error = %e, "years-of-experience call failed");
                None
            }
        }
    }

    async fn free_text_answer(&self, label: &str, grounding: &str, max: usize) -> Option<String> {
        let attempt = self.llm.short_answer(label, grounding, max).await;
        match retry_network(attempt, || self.llm.short_answer(label, grounding, max)).await {
            Ok(answer) if !answer.trim().is_empty() => Some(answer),
            Ok(_) => {
                debug!(label, "reasoning service returned a blank answer");
                None
            }
            Err(e) => {
                warn!(label, error = %e, "document-grounded answer failed");
                None
            }
        }
    }
}

/// One bounded retry, for transport errors only. API and rate-limit errors
/// are final here; rate limits are already the fallback wrapper's concern.
async fn retry_network<T, F, Fut>(
    first: postule_llm::traits::Result<T>,
    retry: F,
) -> postule_llm::traits::Result<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = postule_llm::traits::Result<T>>,
{
    match first {
        Err(LlmError::Network(e)) => {
            debug!(error = %e, "transport error from reasoning service; retrying once");
            retry().await
        }
        other => other,
    }
}

#[async_trait]
impl super::Resolver for DocumentResolver {
    fn name(&self) -> &'static str {
        "document_ai"
    }

    async fn resolve(&self, question: &Question) -> AnswerResult {
        // Only free-text controls; fabricated option picks are worse than a
        // clean failure.
        if question.control != ControlKind::Text {
            return AnswerResult::Unresolved;
        }
        let Some(grounding) = self.documents.grounding_text() else {
            return AnswerResult::Unresolved;
        };

        let norm = normalize_label(&question.label);
        let answer = if is_years_question(&norm) {
            self.years_answer(&question.label, &grounding).await
        } else {
            let max = question.max_length.unwrap_or(DEFAULT_ANSWER_CHARS);
            self.free_text_answer(&question.label, &grounding, max).await
        };

        match answer {
            Some(value) => AnswerResult::answered(value, AnswerSource::DocumentAi),
            None => AnswerResult::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Resolver;
    use postule_config::DocumentConfig;
    use postule_llm::traits::LlmResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for Scripted {
        async fn generate(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _max_tokens: Option<u32>,
            _temperature: Option<f32>,
        ) -> postule_llm::traits::Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                text: self.reply.to_string(),
                model: None,
                tokens_used: None,
                confidence: None,
            })
        }

        async fn health_check(&self) -> postule_llm::traits::Result<bool> {
            Ok(true)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn grounded_store() -> Arc<DocumentStore> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        std::fs::write(
            &path,
            "Backend engineer with six years of Java and three years of Go, \
             based in Montréal, open to hybrid work.",
        )
        .unwrap();
        // Leak the tempdir so the file outlives this helper.
        std::mem::forget(dir);
        Arc::new(DocumentStore::from_config(&DocumentConfig {
            cv_path: Some(path.to_string_lossy().into_owned()),
            resume_path: None,
        }))
    }

    fn question(label: &str, control: ControlKind) -> Question {
        Question {
            label: label.to_string(),
            control,
            current_value: String::new(),
            required: true,
            options: Vec::new(),
            numeric_bounds: None,
            max_length: None,
        }
    }

    #[tokio::test]
    async fn years_questions_go_through_the_integer_path() {
        let resolver = DocumentResolver::new(
            Arc::new(Scripted {
                reply: "about 6 years",
                calls: AtomicUsize::new(0),
            }),
            grounded_store(),
        );
        let q = question("How many years of experience with Java?", ControlKind::Text);
        assert_eq!(
            resolver.resolve(&q).await,
            AnswerResult::answered("6", AnswerSource::DocumentAi)
        );
    }

    #[tokio::test]
    async fn non_text_controls_are_never_answered_here() {
        let resolver = DocumentResolver::new(
            Arc::new(Scripted {
                reply: "Yes",
                calls: AtomicUsize::new(0),
            }),
            grounded_store(),
        );
        let q = question("Willing to relocate?", ControlKind::Radio);
        assert!(resolver.resolve(&q).await.is_unresolved());
    }

    #[tokio::test]
    async fn missing_grounding_text_stays_unresolved_without_a_call() {
        let llm = Arc::new(Scripted {
            reply: "should not be used",
            calls: AtomicUsize::new(0),
        });
        let resolver = DocumentResolver::new(
            llm.clone(),
            Arc::new(DocumentStore::from_config(&DocumentConfig::default())),
        );
        let q = question("Why this role?", ControlKind::Text);
        assert!(resolver.resolve(&q).await.is_unresolved());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_replies_stay_unresolved() {
        let resolver = DocumentResolver::new(
            Arc::new(Scripted {
                reply: "   ",
                calls: AtomicUsize::new(0),
            }),
            grounded_store(),
        );
        let q = question("Why this role?", ControlKind::Text);
        assert!(resolver.resolve(&q).await.is_unresolved());
    }
}
