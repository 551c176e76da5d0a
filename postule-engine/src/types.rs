//! Domain types shared by the navigator, resolver chain, and modal driver.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of form control a question is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Select,
    Radio,
    Checkbox,
    File,
}

/// One question read from a modal step, decoupled from its DOM handles.
#[derive(Debug, Clone)]
pub struct Question {
    pub label: String,
    pub control: ControlKind,
    /// Value already present in the control; a non-empty value is never
    /// overwritten.
    pub current_value: String,
    pub required: bool,
    /// Selectable option labels, for selects and radio groups.
    pub options: Vec<String>,
    /// Declared numeric bounds (`min`/`max`); answers are clamped into them.
    pub numeric_bounds: Option<(i64, i64)>,
    pub max_length: Option<usize>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        !self.current_value.trim().is_empty()
    }
}

/// Position of a step within the modal traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Contact,
    Additional,
    Review,
    /// Post-submit confirmation screen; carries no questions.
    Terminal,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Contact => "contact",
            StepKind::Additional => "additional",
            StepKind::Review => "review",
            StepKind::Terminal => "terminal",
        }
    }
}

/// The questions visible on one modal step.
#[derive(Debug, Clone)]
pub struct QuestionStep {
    pub kind: StepKind,
    pub questions: Vec<Question>,
}

/// Which stage of the chain produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Policy,
    WorkAuth,
    ExperienceMap,
    Profile,
    DocumentAi,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Policy => "policy",
            AnswerSource::WorkAuth => "work_auth",
            AnswerSource::ExperienceMap => "experience_map",
            AnswerSource::Profile => "profile",
            AnswerSource::DocumentAi => "document_ai",
        }
    }
}

/// Outcome of running a question through the resolver chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerResult {
    Answered { value: String, source: AnswerSource },
    Unresolved,
}

impl AnswerResult {
    pub fn answered(value: impl Into<String>, source: AnswerSource) -> Self {
        AnswerResult::Answered {
            value: value.into(),
            source,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, AnswerResult::Unresolved)
    }
}

/// A listing surfaced by the navigator, identified and deduplicated by `id`.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    /// Card text used for policy screening and as a fallback identifier.
    pub snippet: String,
    pub has_simplified_apply: bool,
}

/// Why a candidate was passed over without opening the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotSimplified,
    Policy,
    DailyLimit,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotSimplified => "not_simplified",
            SkipReason::Policy => "policy",
            SkipReason::DailyLimit => "daily_limit",
        }
    }
}

/// Why an opened application did not reach a confirmed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The modal never opened or never became visible.
    ModalOpen,
    /// A required question fell through every resolver stage.
    UnresolvedQuestion,
    /// A resolved answer matched none of the control's options.
    NoMatchingOption,
    /// The form reported validation errors after filling.
    ValidationRejected,
    /// The submit control was clicked but confirmation never appeared.
    SubmitUnconfirmed,
    /// Traversal hit its step bound or an unexpected page state.
    Aborted,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ModalOpen => "modal_open",
            FailureReason::UnresolvedQuestion => "unresolved_question",
            FailureReason::NoMatchingOption => "no_matching_option",
            FailureReason::ValidationRejected => "validation_rejected",
            FailureReason::SubmitUnconfirmed => "submit_unconfirmed",
            FailureReason::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    Applied,
    Skipped(SkipReason),
    Failed(FailureReason),
}

impl OutcomeKind {
    pub fn describe(&self) -> String {
        match self {
            OutcomeKind::Applied => "applied".to_string(),
            OutcomeKind::Skipped(reason) => format!("skipped ({})", reason.as_str()),
            OutcomeKind::Failed(reason) => format!("failed ({})", reason.as_str()),
        }
    }
}

/// One processed candidate, recorded in order.
#[derive(Debug, Clone)]
pub struct ApplicationOutcome {
    pub candidate_id: String,
    pub title: String,
    pub at: DateTime<Utc>,
    pub kind: OutcomeKind,
}

impl ApplicationOutcome {
    pub fn now(candidate: &Candidate, kind: OutcomeKind) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            title: candidate.title.clone(),
            at: Utc::now(),
            kind,
        }
    }
}

/// Snapshot published on the status channel after every outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
    pub processed: u32,
    pub last_outcome: Option<String>,
}

/// Whether a resolved value counts as an affirmative for checkbox and
/// yes/no handling. Covers both UI languages.
pub fn is_affirmative(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "oui" | "true" | "1" | "y"
    )
}
