//! Layered configuration loader for the Postule workspace.
//!
//! Sources are merged lowest to highest precedence: schema defaults, an
//! optional JSON config file, `POSTULE`-prefixed environment variables
//! (`__` separates nesting levels, e.g. `POSTULE__SEARCH__KEYWORDS`), and
//! finally an optional overrides file holding setup data saved by a
//! launcher. String values pass recursive `${VAR}` expansion before the
//! typed schema materialises.

use config::{Config, Environment, File, FileFormat};
use serde_json::Value;
use std::path::{Path, PathBuf};

mod model;

pub use model::{
    AnswerConfig, AppConfig, DocumentConfig, ExperienceConfig, GroqFallback, LimitConfig,
    LlmConfig, LoggingConfig, PacingConfig, PolicyConfig, ProfileConfig, SearchConfig,
    SessionConfig,
};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Errors surfaced while assembling or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring. Source precedence is fixed by
/// the loader, not by call order: file < inline snippets < environment <
/// overrides file.
pub struct PostuleConfigLoader {
    file: Option<PathBuf>,
    inline_json: Vec<String>,
    overrides_file: Option<PathBuf>,
}

impl Default for PostuleConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PostuleConfigLoader {
    /// Start from schema defaults plus `POSTULE_` environment overrides.
    ///
    /// ```
    /// use postule_config::PostuleConfigLoader;
    ///
    /// let config = PostuleConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.experience.default_years, 3);
    /// ```
    pub fn new() -> Self {
        Self {
            file: None,
            inline_json: Vec::new(),
            overrides_file: None,
        }
    }

    /// Attach a JSON config file. The file must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Merge an inline JSON snippet (tests, CLI `--set`-style overrides).
    ///
    /// ```
    /// use postule_config::PostuleConfigLoader;
    ///
    /// let config = PostuleConfigLoader::new()
    ///     .with_json_str(r#"{"search": {"keywords": "rust backend"}}"#)
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.search.keywords, "rust backend");
    /// assert_eq!(config.search.location, "Canada");
    /// ```
    pub fn with_json_str(mut self, json: &str) -> Self {
        self.inline_json.push(json.to_string());
        self
    }

    /// Attach the saved-setup overrides file. Missing files are fine; when
    /// present its values beat every other source.
    pub fn with_overrides_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.overrides_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, and materialise the
    /// typed schema. Validation rejects configurations that cannot drive a
    /// run (empty keywords, inverted pacing bounds, policy URL without key).
    pub fn load(self) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = &self.file {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }
        for snippet in &self.inline_json {
            builder = builder.add_source(File::from_str(snippet, FileFormat::Json));
        }
        builder = builder.add_source(
            Environment::with_prefix("POSTULE")
                .separator("__")
                .try_parsing(true),
        );
        if let Some(path) = &self.overrides_file {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
        let cfg = builder.build()?;

        // Through serde_json::Value first so ${VAR} expansion sees every
        // string, including ones the typed schema defaults.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: AppConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        typed.validate()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn expands_nested_placeholders() {
        temp_env::with_vars(
            [
                ("DATA_ROOT", Some("/srv/postule")),
                ("COOKIES", Some("${DATA_ROOT}/cookies.json")),
            ],
            || {
                let mut v = json!({"session": {"cookies_path": "${COOKIES}"}});
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!({"session": {"cookies_path": "/srv/postule/cookies.json"}})
                );
            },
        );
    }

    #[test]
    fn expansion_terminates_on_cycles() {
        temp_env::with_vars([("LOOP_A", Some("${LOOP_B}")), ("LOOP_B", Some("${LOOP_A}"))], || {
            let mut v = json!("dir=${LOOP_A}");
            expand_env_in_value(&mut v);
            // Depth cap stops the walk; the unresolved placeholder stays put.
            assert!(v.as_str().unwrap().contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_untouched() {
        let mut v = json!(["${POSTULE_NOT_SET_ANYWHERE}", 7, null]);
        expand_env_in_value(&mut v);
        assert_eq!(v, json!(["${POSTULE_NOT_SET_ANYWHERE}", 7, null]));
    }

    #[test]
    #[serial]
    fn environment_beats_config_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"search": {{"keywords": "from file", "location": "France"}}}}"#
        )
        .unwrap();

        temp_env::with_var("POSTULE__SEARCH__KEYWORDS", Some("from env"), || {
            let cfg = PostuleConfigLoader::new()
                .with_file(file.path())
                .load()
                .unwrap();
            assert_eq!(cfg.search.keywords, "from env");
            // Untouched file values still apply.
            assert_eq!(cfg.search.location, "France");
        });
    }

    #[test]
    #[serial]
    fn overrides_file_beats_environment() {
        let mut overrides = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            overrides,
            r#"{{"answers": {{"work_authorization": "Yes"}}}}"#
        )
        .unwrap();

        temp_env::with_var("POSTULE__ANSWERS__WORK_AUTHORIZATION", Some("No"), || {
            let cfg = PostuleConfigLoader::new()
                .with_overrides_file(overrides.path())
                .load()
                .unwrap();
            assert_eq!(cfg.answers.work_authorization, "Yes");
        });
    }

    #[test]
    fn missing_overrides_file_is_not_an_error() {
        let cfg = PostuleConfigLoader::new()
            .with_overrides_file("/nonexistent/overrides.json")
            .load()
            .unwrap();
        assert_eq!(cfg.answers.needs_sponsorship, "Yes");
    }

    #[test]
    fn api_keys_expand_from_environment() {
        temp_env::with_var("GEMINI_KEY_FOR_TEST", Some("sk-123"), || {
            let cfg = PostuleConfigLoader::new()
                .with_json_str(
                    r#"{"llm": {"provider": "gemini", "api_key": "${GEMINI_KEY_FOR_TEST}"}}"#,
                )
                .load()
                .unwrap();
            match cfg.llm {
                LlmConfig::Gemini { api_key, .. } => assert_eq!(api_key, "sk-123"),
                other => panic!("expected gemini config, got {other:?}"),
            }
        });
    }
}
