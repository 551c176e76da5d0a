//! Typed configuration schema with serde defaults for every section.
//!
//! Every field has a default so an empty environment still deserializes into
//! a runnable (if credential-less) configuration. Defaults mirror the values
//! the apply loop was tuned with; override any of them per source precedence
//! documented on the loader.

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration consumed by the binary and handed to the engine.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub session: SessionConfig,
    pub answers: AnswerConfig,
    pub experience: ExperienceConfig,
    pub profile: ProfileConfig,
    pub documents: DocumentConfig,
    pub pacing: PacingConfig,
    pub llm: LlmConfig,
    pub policy: PolicyConfig,
    pub limits: LimitConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reject configurations that cannot drive a run at all.
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        if self.search.keywords.trim().is_empty() {
            return Err(crate::ConfigError::Invalid(
                "search.keywords must not be empty".into(),
            ));
        }
        if self.pacing.min_delay_secs > self.pacing.max_delay_secs {
            return Err(crate::ConfigError::Invalid(format!(
                "pacing.min_delay_secs ({}) exceeds pacing.max_delay_secs ({})",
                self.pacing.min_delay_secs, self.pacing.max_delay_secs
            )));
        }
        if self.limits.max_modal_steps == 0 {
            return Err(crate::ConfigError::Invalid(
                "limits.max_modal_steps must be at least 1".into(),
            ));
        }
        if self.policy.base_url.is_some() && self.policy.api_key.trim().is_empty() {
            return Err(crate::ConfigError::Invalid(
                "policy.base_url is set but policy.api_key is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Search-results view construction and readiness bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub keywords: String,
    pub location: String,
    /// Base of the results view; query parameters are appended per run.
    pub base_url: String,
    /// Attempts to reach a recognizable results state before giving up.
    pub navigation_attempts: u32,
    /// Fixed backoff between navigation attempts, in seconds.
    pub navigation_backoff_secs: u64,
    /// Upper bound for the results list to render after navigation.
    pub results_wait_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: "software engineer java".to_string(),
            location: "Canada".to_string(),
            base_url: "https://www.linkedin.com/jobs/search/".to_string(),
            navigation_attempts: 3,
            navigation_backoff_secs: 5,
            results_wait_secs: 45,
        }
    }
}

/// Browser session: WebDriver endpoint and persisted profile state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub webdriver_url: String,
    pub headless: bool,
    /// Persistent profile directory; keeps the login across runs.
    pub user_data_dir: String,
    /// Cookie snapshot written atomically after each successful run.
    pub cookies_path: String,
    /// How long to wait for an out-of-band interactive login, in seconds.
    pub login_wait_secs: u64,
    /// Browser UI language. The button-text sets cover French and English.
    pub lang: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            user_data_dir: "user_data".to_string(),
            cookies_path: "data/cookies.json".to_string(),
            login_wait_secs: 180,
            lang: "fr-FR".to_string(),
        }
    }
}

/// Fixed answers for authorization and sponsorship questions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Answer to "are you legally authorized to work in <country>".
    pub work_authorization: String,
    /// Answer to "will you require sponsorship".
    pub needs_sponsorship: String,
    /// Country the authorization answer refers to (logging only).
    pub authorization_country: String,
    /// Word written into yes/no controls for affirmative answers.
    pub yes_word: String,
    pub no_word: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            work_authorization: "No".to_string(),
            needs_sponsorship: "Yes".to_string(),
            authorization_country: "Canada".to_string(),
            yes_word: "Yes".to_string(),
            no_word: "No".to_string(),
        }
    }
}

/// Technology-to-years table consulted before any reasoning call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    /// Lowercased technology name to integer years.
    pub years: HashMap<String, u32>,
    /// Fallback for generic "years of experience" questions naming no
    /// particular technology.
    pub default_years: u32,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            years: HashMap::new(),
            default_years: 3,
        }
    }
}

/// Deterministic personal answers for recurring non-experience questions.
/// Empty strings disable the corresponding rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub salary: String,
    pub notice_days: u32,
    pub city: String,
    pub phone: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            salary: "95000".to_string(),
            notice_days: 30,
            city: String::new(),
            phone: String::new(),
        }
    }
}

/// Résumé/CV sources. `cv_path` feeds grounding text extraction;
/// `resume_path` is the file uploaded into file controls.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DocumentConfig {
    pub cv_path: Option<String>,
    pub resume_path: Option<String>,
}

/// Randomized delays between discrete UI actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    /// Per-character typing delay bounds, in milliseconds.
    pub typing_min_ms: u64,
    pub typing_max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 5.0,
            max_delay_secs: 15.0,
            typing_min_ms: 30,
            typing_max_ms: 150,
        }
    }
}

/// Reasoning-service provider configuration. The tag is `provider`; the
/// fallback, when present, is consulted only on rate-limit errors.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Gemini {
        api_key: String,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default)]
        fallback: Option<GroqFallback>,
    },
    Groq {
        api_key: String,
        #[serde(default = "default_groq_model")]
        model: String,
    },
    #[default]
    None,
}

/// Secondary provider used when the primary reports a rate limit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GroqFallback {
    pub api_key: String,
    #[serde(default = "default_groq_model")]
    pub model: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_groq_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

/// Optional external proceed/skip policy service; disabled when
/// `base_url` is unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub base_url: Option<String>,
    pub api_key: String,
    /// Stable user tag attached to workflow runs.
    pub user: String,
    /// Identifier of a CV file previously uploaded to the policy service,
    /// forwarded with each screening request.
    pub cv_file_id: Option<String>,
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: String::new(),
            user: "postule".to_string(),
            cv_file_id: None,
            poll_attempts: 60,
            poll_interval_secs: 2,
            timeout_secs: 30,
        }
    }
}

/// Run-scoped caps and traversal bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Applications per run; 0 means unlimited.
    pub max_applications: u32,
    /// Modal steps traversed before aborting a candidate.
    pub max_modal_steps: u32,
    /// Scroll rounds attempted when the list looks exhausted.
    pub max_scroll_rounds: u32,
    /// Cap on cards considered per list read.
    pub max_list_count: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_applications: 0,
            max_modal_steps: 12,
            max_scroll_rounds: 5,
            max_list_count: 50,
        }
    }
}

/// Log sink configuration handed to the observability initializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<String>,
    /// "text" or "json".
    pub format: String,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: "text".to_string(),
            stderr: true,
            filter: "info,postule=debug".to_string(),
        }
    }
}
