//! The simplified-apply modal: open, read each step's questions, fill them
//! through the resolver chain, advance, and submit.
//!
//! Per-candidate trouble (unresolved question, no matching option, rejected
//! validation) is a verdict, not an error; only a lost session escapes as
//! one. Every close path that did not submit goes through the discard
//! prompt so the site never accumulates half-finished drafts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use postule_common::{PostuleError, Result};
use postule_drivers::{is_auth_wall, Page, PageElement};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::document::DocumentStore;
use crate::navigator::{APPLY_TEXTS, FILTER_PILL_ID};
use crate::resolve::{PolicyAnswers, ResolverChain};
use crate::types::{
    AnswerResult, Candidate, ControlKind, FailureReason, Question, QuestionStep, StepKind,
};

/// Modal container variants, probed in order.
const MODAL_SCOPES: &[&str] = &[
    ".jobs-easy-apply-modal",
    "[data-test-modal]",
    "div[role='dialog']",
];
/// Union of the scope variants, for absence checks.
const MODAL_ANY: &str = ".jobs-easy-apply-modal, [data-test-modal], div[role='dialog']";

const NEXT_TEXTS: &[&str] = &["Suivant", "Next"];
const REVIEW_TEXTS: &[&str] = &["Vérifier", "Review"];
const SUBMIT_TEXTS: &[&str] = &["Envoyer la candidature", "Soumettre", "Submit application", "Submit"];
const CONFIRM_TEXTS: &[&str] = &["Terminé", "Done", "OK", "Fermer", "Close"];
const DISCARD_TEXTS: &[&str] = &["Supprimer", "Discard", "Ne pas enregistrer"];

const DISMISS_SELECTOR: &str =
    ".artdeco-modal__dismiss, button[aria-label*='Fermer'], button[aria-label*='Close'], button[aria-label*='Dismiss']";

/// Inline messages the form shows next to rejected fields.
const VALIDATION_PHRASES: &[&str] = &[
    "please enter a valid",
    "please make a selection",
    "is required",
    "enter a whole number",
    "enter a decimal number",
    "file is required",
    "veuillez saisir",
    "veuillez sélectionner",
    "est obligatoire",
    "champ obligatoire",
    "saisissez un nombre",
];

const MODAL_OPEN_WAIT: Duration = Duration::from_secs(15);
const SUBMIT_CONFIRM_WAIT: Duration = Duration::from_secs(12);
const SETTLE_POLL: Duration = Duration::from_millis(500);

/// Placeholder texts a pristine select renders; they do not count as a
/// pre-filled value.
const SELECT_PLACEHOLDER_PATTERN: &str = "^(select an option|sélectionnez|choose|--)";

/// One flat control descriptor, read in a single script so label walking
/// happens page-side. Array order matches `querySelectorAll('input, select,
/// textarea')` on the same scope, which is how handles are zipped back in.
const DESCRIBE_CONTROLS_SCRIPT: &str = r#"
const scope = document.querySelector(arguments[0]);
if (!scope) return [];
const placeholder = new RegExp(arguments[1], 'i');
return Array.from(scope.querySelectorAll('input, select, textarea')).map((el) => {
    const tag = el.tagName.toLowerCase();
    const type = (el.getAttribute('type') || '').toLowerCase();
    let label = '';
    if (el.id) {
        const forLabel = scope.querySelector('label[for="' + CSS.escape(el.id) + '"]');
        if (forLabel) label = forLabel.innerText || '';
    }
    if (!label) {
        let node = el.parentElement;
        for (let depth = 0; depth < 8 && node && node !== scope.parentElement; depth++) {
            const candidate = node.querySelector('legend, label');
            if (candidate) { label = candidate.innerText || ''; break; }
            node = node.parentElement;
        }
    }
    if (!label) label = el.getAttribute('placeholder') || el.getAttribute('aria-label') || '';
    label = label.trim();
    const required = el.required === true
        || el.getAttribute('aria-required') === 'true'
        || label.indexOf('*') !== -1;
    const visible = !!el.offsetParent || type === 'radio' || type === 'checkbox' || type === 'file';
    let value = '';
    let checked = false;
    let optionLabel = '';
    let options = [];
    if (tag === 'select') {
        options = Array.from(el.options)
            .map((o) => (o.textContent || '').trim())
            .filter((t) => t && !placeholder.test(t));
        const selected = el.options[el.selectedIndex];
        const selectedText = selected ? (selected.textContent || '').trim() : '';
        value = placeholder.test(selectedText) ? '' : selectedText;
    } else if (type === 'radio' || type === 'checkbox') {
        checked = el.checked === true;
        const wrapping = el.closest('label');
        optionLabel = ((wrapping && wrapping.innerText)
            || (el.nextElementSibling && el.nextElementSibling.innerText)
            || '').trim();
    } else {
        value = el.value || '';
    }
    return {
        tag, type, label, required, visible, value, checked,
        option_label: optionLabel,
        options,
        name: el.getAttribute('name') || '',
        min: el.getAttribute('min'),
        max: el.getAttribute('max'),
        maxlength: el.getAttribute('maxlength'),
    };
});
"#;

const VALIDATION_SCAN_SCRIPT: &str = r#"
const scope = document.querySelector(arguments[0]);
if (!scope) return { text: '', invalid: 0 };
return {
    text: scope.innerText || '',
    invalid: scope.querySelectorAll("[aria-invalid='true'], .artdeco-inline-feedback--error").length,
};
"#;

#[derive(Debug, Deserialize)]
struct ControlDescriptor {
    tag: String,
    #[serde(rename = "type")]
    input_type: String,
    label: String,
    required: bool,
    visible: bool,
    value: String,
    checked: bool,
    option_label: String,
    options: Vec<String>,
    name: String,
    min: Option<String>,
    max: Option<String>,
    maxlength: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidationScan {
    text: String,
    invalid: u32,
}

/// A question with the live handles needed to write its answer. Radio
/// groups hold one handle per option, aligned with `question.options`.
struct RenderedQuestion {
    question: Question,
    handles: Vec<PageElement>,
    checked: bool,
}

/// Terminal state of one application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyVerdict {
    Submitted,
    Failed(FailureReason),
}

pub struct ModalDriver {
    page: Page,
    chain: Arc<ResolverChain>,
    documents: Arc<DocumentStore>,
    max_steps: u32,
}

impl ModalDriver {
    pub fn new(
        page: Page,
        chain: Arc<ResolverChain>,
        documents: Arc<DocumentStore>,
        max_steps: u32,
    ) -> Self {
        Self {
            page,
            chain,
            documents,
            max_steps: max_steps.max(1),
        }
    }

    /// Run one application attempt end to end.
    ///
    /// Everything a single candidate can trip over comes back as a
    /// [`ApplyVerdict::Failed`]; the only error path is a lost session.
    pub async fn apply(
        &self,
        candidate: &Candidate,
        policy: Option<&PolicyAnswers>,
    ) -> Result<ApplyVerdict> {
        match self.drive(candidate, policy).await {
            Ok(verdict) => Ok(verdict),
            Err(e) => {
                if let Ok(url) = self.page.current_url().await {
                    if is_auth_wall(&url) {
                        return Err(PostuleError::SessionInvalid(url));
                    }
                }
                warn!(candidate = %candidate.id, error = %e, "application attempt aborted");
                let _ = self.close_discarding().await;
                Ok(ApplyVerdict::Failed(FailureReason::Aborted))
            }
        }
    }

    async fn drive(
        &self,
        candidate: &Candidate,
        policy: Option<&PolicyAnswers>,
    ) -> anyhow::Result<ApplyVerdict> {
        let Some(open) = self.find_button(None, APPLY_TEXTS).await? else {
            debug!(candidate = %candidate.id, "no apply control in the detail panel");
            return Ok(ApplyVerdict::Failed(FailureReason::ModalOpen));
        };
        open.click().await?;

        let Some(scope) = self.wait_for_modal().await else {
            return Ok(ApplyVerdict::Failed(FailureReason::ModalOpen));
        };
        info!(candidate = %candidate.id, title = %candidate.title, "application modal open");

        for step_index in 0..self.max_steps {
            let url = self.page.current_url().await?;
            if is_auth_wall(&url) {
                anyhow::bail!("redirected to a login wall at {url}");
            }

            let rendered = self.read_step(scope).await?;
            let submit = self.find_button(Some(scope), SUBMIT_TEXTS).await?;
            let step = step_view(step_index, submit.is_some(), &rendered);
            debug!(
                step = step.kind.as_str(),
                index = step_index,
                questions = step.questions.len(),
                "reading modal step"
            );

            if let Err(reason) = self.fill_step(&rendered, policy).await? {
                self.close_discarding().await?;
                return Ok(ApplyVerdict::Failed(reason));
            }

            // Handles can go stale after typing rerenders the step.
            if submit.is_some() {
                let Some(submit) = self.find_button(Some(scope), SUBMIT_TEXTS).await? else {
                    anyhow::bail!("submit control disappeared after filling");
                };
                submit.click().await?;
                return self.confirm_submission(scope).await;
            }

            let advance = match self.find_button(Some(scope), REVIEW_TEXTS).await? {
                Some(button) => Some(button),
                None => self.find_button(Some(scope), NEXT_TEXTS).await?,
            };
            let Some(advance) = advance else {
                warn!(candidate = %candidate.id, "modal step offers no way forward");
                self.close_discarding().await?;
                return Ok(ApplyVerdict::Failed(FailureReason::Aborted));
            };
            advance.click().await?;
            sleep(SETTLE_POLL).await;

            if let Some(reason) = self.validation_failure(scope).await? {
                self.close_discarding().await?;
                return Ok(ApplyVerdict::Failed(reason));
            }
        }

        warn!(candidate = %candidate.id, max_steps = self.max_steps, "step bound exceeded");
        self.close_discarding().await?;
        Ok(ApplyVerdict::Failed(FailureReason::Aborted))
    }

    async fn wait_for_modal(&self) -> Option<&'static str> {
        let deadline = tokio::time::Instant::now() + MODAL_OPEN_WAIT;
        loop {
            for &scope in MODAL_SCOPES {
                if let Ok(element) = self.page.find(scope).await {
                    if element.is_displayed().await.unwrap_or(false) {
                        return Some(scope);
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            sleep(SETTLE_POLL).await;
        }
    }

    /// Read the current step: one script for the descriptors, one element
    /// query for the handles, zipped by position.
    async fn read_step(&self, scope: &str) -> anyhow::Result<Vec<RenderedQuestion>> {
        let raw = self
            .page
            .execute(
                DESCRIBE_CONTROLS_SCRIPT,
                vec![json!(scope), json!(SELECT_PLACEHOLDER_PATTERN)],
            )
            .await?;
        let descriptors: Vec<ControlDescriptor> = serde_json::from_value(raw)?;
        let scope_element = self.page.find(scope).await?;
        let handles = scope_element.find_all("input, select, textarea").await?;
        anyhow::ensure!(
            descriptors.len() == handles.len(),
            "modal rerendered mid-read ({} descriptors, {} handles)",
            descriptors.len(),
            handles.len()
        );
        Ok(group_controls(descriptors, handles))
    }

    async fn fill_step(
        &self,
        rendered: &[RenderedQuestion],
        policy: Option<&PolicyAnswers>,
    ) -> anyhow::Result<std::result::Result<(), FailureReason>> {
        for item in rendered {
            let question = &item.question;

            if question.control == ControlKind::File {
                if question.is_answered() {
                    continue;
                }
                match self.documents.resume_path() {
                    Some(path) => {
                        debug!(label = label_prefix(&question.label), "uploading resume");
                        item.handles[0].send_keys(&path.to_string_lossy()).await?;
                    }
                    None if question.required => {
                        warn!(label = label_prefix(&question.label), "required upload with no configured resume");
                        return Ok(Err(FailureReason::UnresolvedQuestion));
                    }
                    None => {}
                }
                continue;
            }

            // Pre-filled values are never overwritten, and optional blanks
            // are left alone; neither consults the chain.
            if question.is_answered() || !question.required {
                continue;
            }

            let resolved = self.chain.resolve_with_policy(question, policy).await;
            let plan = match plan_write(question, resolved) {
                Ok(plan) => plan,
                Err(reason) => return Ok(Err(reason)),
            };
            match plan {
                WritePlan::Leave => {}
                WritePlan::Type(text) => item.handles[0].clear_and_type(&text).await?,
                WritePlan::SelectOption(label) => {
                    item.handles[0].select_by_label(&label).await?
                }
                WritePlan::ClickOption(index) => item.handles[index].click().await?,
                WritePlan::SetChecked(want) => {
                    if want != item.checked {
                        item.handles[0].click().await?;
                    }
                }
            }
        }
        Ok(Ok(()))
    }

    async fn validation_failure(&self, scope: &str) -> anyhow::Result<Option<FailureReason>> {
        let raw = self
            .page
            .execute(VALIDATION_SCAN_SCRIPT, vec![json!(scope)])
            .await?;
        let scan: ValidationScan = serde_json::from_value(raw)?;
        if scan.invalid > 0 || text_has_validation_error(&scan.text) {
            warn!(invalid = scan.invalid, "form rejected the filled step");
            return Ok(Some(FailureReason::ValidationRejected));
        }
        Ok(None)
    }

    /// After clicking submit: the modal either closes (possibly behind a
    /// confirmation dialog that needs dismissing) or stays with errors.
    async fn confirm_submission(&self, scope: &str) -> anyhow::Result<ApplyVerdict> {
        let deadline = tokio::time::Instant::now() + SUBMIT_CONFIRM_WAIT;
        loop {
            if self.modal_gone().await {
                info!(step = StepKind::Terminal.as_str(), "submission confirmed");
                return Ok(ApplyVerdict::Submitted);
            }
            if let Some(done) = self.find_button(None, CONFIRM_TEXTS).await? {
                done.click().await.ok();
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            sleep(SETTLE_POLL).await;
        }
        if self.validation_failure(scope).await?.is_some() {
            self.close_discarding().await?;
            return Ok(ApplyVerdict::Failed(FailureReason::ValidationRejected));
        }
        warn!("modal still open after submit; not counting an application");
        self.close_discarding().await?;
        Ok(ApplyVerdict::Failed(FailureReason::SubmitUnconfirmed))
    }

    async fn modal_gone(&self) -> bool {
        match self.page.find(MODAL_ANY).await {
            Err(_) => true,
            Ok(element) => !element.is_displayed().await.unwrap_or(false),
        }
    }

    /// Close without submitting, answering the save-draft prompt with
    /// discard so no half-finished application lingers.
    async fn close_discarding(&self) -> anyhow::Result<()> {
        if let Ok(dismiss) = self.page.find(DISMISS_SELECTOR).await {
            dismiss.click().await.ok();
            sleep(SETTLE_POLL).await;
        }
        if let Some(discard) = self.find_button(None, DISCARD_TEXTS).await? {
            discard.click().await.ok();
        }
        if self
            .page
            .wait_for_gone(MODAL_ANY, Duration::from_secs(5))
            .await
            .is_err()
        {
            warn!("modal still visible after discard");
        }
        Ok(())
    }

    /// First displayed button whose text (or aria-label) carries one of
    /// `texts`. The results-filter pill shares the apply wording and is
    /// excluded by id.
    async fn find_button(
        &self,
        scope: Option<&str>,
        texts: &[&str],
    ) -> anyhow::Result<Option<PageElement>> {
        let selector = match scope {
            Some(scope) => format!("{scope} button"),
            None => "button".to_string(),
        };
        let buttons = match self.page.find_all(&selector).await {
            Ok(buttons) => buttons,
            Err(_) => return Ok(None),
        };
        for button in buttons {
            if let Ok(Some(id)) = button.attr("id").await {
                if id == FILTER_PILL_ID {
                    continue;
                }
            }
            let mut label = button.text().await.unwrap_or_default();
            if label.is_empty() {
                label = button
                    .attr("aria-label")
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default();
            }
            if button_text_matches(&label, texts) && button.is_displayed().await.unwrap_or(false) {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }
}

/// Short needles ("OK", "Done") must match the whole label or its prefix;
/// only long distinctive phrases are allowed to match anywhere, so that an
/// aria-label like "Easy Apply to Backend Engineer" still qualifies.
fn button_text_matches(label: &str, texts: &[&str]) -> bool {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return false;
    }
    texts.iter().any(|t| {
        let needle = t.to_lowercase();
        label == needle
            || label.starts_with(&format!("{needle} "))
            || (needle.len() >= 6 && label.contains(&needle))
    })
}

/// Clip a label for log fields; long question text would drown the line.
fn label_prefix(label: &str) -> &str {
    match label.char_indices().nth(60) {
        Some((idx, _)) => &label[..idx],
        None => label,
    }
}

/// Exact label match first, then case-insensitive. Nothing fuzzier: picking
/// a wrong option submits a wrong answer.
pub(crate) fn match_option<'a>(options: &'a [String], value: &str) -> Option<&'a str> {
    let wanted = value.trim();
    if let Some(exact) = options.iter().find(|o| o.trim() == wanted) {
        return Some(exact.as_str());
    }
    options
        .iter()
        .find(|o| o.trim().eq_ignore_ascii_case(wanted))
        .map(String::as_str)
}

/// Decided write-back for one question, decoupled from live handles.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WritePlan {
    /// Leave the control untouched (pre-filled, or optional and blank).
    Leave,
    Type(String),
    SelectOption(String),
    ClickOption(usize),
    SetChecked(bool),
}

/// Turn a question's resolution into a write-back plan. A required
/// question no stage answered, or an answer matching none of the options,
/// fails the whole step; the step is never advanced past it.
fn plan_write(
    question: &Question,
    resolved: AnswerResult,
) -> std::result::Result<WritePlan, FailureReason> {
    if question.is_answered() || !question.required {
        return Ok(WritePlan::Leave);
    }
    let AnswerResult::Answered { value, source } = resolved else {
        warn!(label = label_prefix(&question.label), "required question fell through every stage");
        return Err(FailureReason::UnresolvedQuestion);
    };
    debug!(label = label_prefix(&question.label), source = source.as_str(), "writing answer");

    match question.control {
        ControlKind::Text => {
            let mut text = value;
            if let Some(max) = question.max_length {
                if let Some((cut, _)) = text.char_indices().nth(max) {
                    text.truncate(cut);
                }
            }
            Ok(WritePlan::Type(text))
        }
        ControlKind::Select => match match_option(&question.options, &value) {
            Some(label) => Ok(WritePlan::SelectOption(label.to_string())),
            None => {
                warn!(label = label_prefix(&question.label), answer = %value, "no select option matches");
                Err(FailureReason::NoMatchingOption)
            }
        },
        ControlKind::Radio => match match_option(&question.options, &value) {
            Some(matched) => {
                let index = question
                    .options
                    .iter()
                    .position(|o| o.as_str() == matched)
                    .unwrap_or(0);
                Ok(WritePlan::ClickOption(index))
            }
            None => {
                warn!(label = label_prefix(&question.label), answer = %value, "no radio option matches");
                Err(FailureReason::NoMatchingOption)
            }
        },
        ControlKind::Checkbox => Ok(WritePlan::SetChecked(crate::types::is_affirmative(&value))),
        ControlKind::File => unreachable!("file controls are written before planning"),
    }
}

pub(crate) fn text_has_validation_error(text: &str) -> bool {
    let lowered = text.to_lowercase();
    VALIDATION_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Group flat controls into questions: radios merge by `name` (falling back
/// to the walked label), everything else stands alone. Hidden text/select
/// controls are dropped; collapsed radios and checkboxes are kept.
fn group_controls(
    descriptors: Vec<ControlDescriptor>,
    handles: Vec<PageElement>,
) -> Vec<RenderedQuestion> {
    let mut questions: Vec<RenderedQuestion> = Vec::new();
    let mut radio_groups: HashMap<String, usize> = HashMap::new();

    for (descriptor, handle) in descriptors.into_iter().zip(handles) {
        let Some(kind) = control_kind(&descriptor) else {
            continue;
        };
        if matches!(kind, ControlKind::Text | ControlKind::Select) && !descriptor.visible {
            continue;
        }

        if kind == ControlKind::Radio {
            let key = if descriptor.name.is_empty() {
                descriptor.label.clone()
            } else {
                descriptor.name.clone()
            };
            if let Some(&index) = radio_groups.get(&key) {
                let existing = &mut questions[index];
                let option = if descriptor.option_label.is_empty() {
                    format!("option {}", existing.question.options.len() + 1)
                } else {
                    descriptor.option_label.clone()
                };
                if descriptor.checked {
                    existing.question.current_value = option.clone();
                }
                existing.question.options.push(option);
                existing.handles.push(handle);
                continue;
            }
            let option = if descriptor.option_label.is_empty() {
                "option 1".to_string()
            } else {
                descriptor.option_label.clone()
            };
            radio_groups.insert(key, questions.len());
            questions.push(RenderedQuestion {
                question: Question {
                    label: descriptor.label,
                    control: ControlKind::Radio,
                    current_value: if descriptor.checked { option.clone() } else { String::new() },
                    required: descriptor.required,
                    options: vec![option],
                    numeric_bounds: None,
                    max_length: None,
                },
                handles: vec![handle],
                checked: descriptor.checked,
            });
            continue;
        }

        let current_value = match kind {
            ControlKind::Checkbox => {
                if descriptor.checked {
                    descriptor.option_label.clone()
                } else {
                    String::new()
                }
            }
            _ => descriptor.value.clone(),
        };
        questions.push(RenderedQuestion {
            question: Question {
                label: if descriptor.label.is_empty() && kind == ControlKind::Checkbox {
                    descriptor.option_label.clone()
                } else {
                    descriptor.label.clone()
                },
                control: kind,
                current_value,
                required: descriptor.required,
                options: if kind == ControlKind::Select {
                    descriptor.options.clone()
                } else {
                    Vec::new()
                },
                numeric_bounds: numeric_bounds(&descriptor),
                max_length: descriptor.maxlength.as_deref().and_then(|m| m.parse().ok()),
            },
            handles: vec![handle],
            checked: descriptor.checked,
        });
    }
    questions
}

fn control_kind(descriptor: &ControlDescriptor) -> Option<ControlKind> {
    match descriptor.tag.as_str() {
        "select" => Some(ControlKind::Select),
        "textarea" => Some(ControlKind::Text),
        "input" => match descriptor.input_type.as_str() {
            "" | "text" | "email" | "tel" | "number" | "url" => Some(ControlKind::Text),
            "radio" => Some(ControlKind::Radio),
            "checkbox" => Some(ControlKind::Checkbox),
            "file" => Some(ControlKind::File),
            _ => None,
        },
        _ => None,
    }
}

/// Bounds from declared `min`/`max`; a lone `min` on a number input gets
/// the conventional 99 ceiling.
fn numeric_bounds(descriptor: &ControlDescriptor) -> Option<(i64, i64)> {
    let min = descriptor.min.as_deref().and_then(|v| v.parse::<i64>().ok());
    let max = descriptor.max.as_deref().and_then(|v| v.parse::<i64>().ok());
    match (min, max) {
        (Some(min), Some(max)) if min <= max => Some((min, max)),
        (Some(min), None) => Some((min, min.max(99))),
        (None, Some(max)) => Some((max.min(0), max)),
        _ => None,
    }
}

fn step_view(step_index: u32, has_submit: bool, rendered: &[RenderedQuestion]) -> QuestionStep {
    let kind = if has_submit {
        StepKind::Review
    } else if step_index == 0 {
        StepKind::Contact
    } else {
        StepKind::Additional
    };
    QuestionStep {
        kind,
        questions: rendered.iter().map(|r| r.question.clone()).collect(),
    }
}
