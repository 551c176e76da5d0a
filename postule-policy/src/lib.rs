//! Optional external proceed/skip policy client.
//!
//! The policy service is a workflow API: one POST runs the screening
//! workflow over the listing text in blocking mode; a "running" reply is
//! polled on the run-detail endpoint with a bounded attempt count. The
//! successful output carries an `apply_status` decision plus per-question
//! `form_answers` that pre-populate the resolver chain for that candidate.
//!
//! Every failure path (transport error, non-success HTTP, timeout,
//! malformed outputs) degrades to [`Decision::Skip`]: when the screen is
//! configured but unreachable, applying blind would defeat its purpose.

use std::collections::HashMap;
use std::time::Duration;

use postule_config::PolicyConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const WORKFLOW_RUN_PATH: &str = "/workflows/run";

/// The screening verdict for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip,
}

/// Decision plus the per-candidate answer map. Keys are question labels as
/// the workflow names them; values are flattened to strings.
#[derive(Debug, Clone)]
pub struct Screening {
    pub decision: Decision,
    pub answers: HashMap<String, String>,
}

impl Screening {
    fn skip() -> Self {
        Self {
            decision: Decision::Skip,
            answers: HashMap::new(),
        }
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    inputs: RunInputs<'a>,
    user: &'a str,
    response_mode: &'static str,
}

#[derive(Serialize)]
struct RunInputs<'a> {
    linkedin_data: &'a str,
    cv_pdf: &'a str,
}

#[derive(Deserialize)]
struct RunEnvelope {
    #[serde(default)]
    data: Option<RunState>,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    workflow_run_id: Option<String>,
}

/// Shape shared by the blocking reply's `data` object and the run-detail
/// endpoint's body.
#[derive(Deserialize, Default)]
struct RunState {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    outputs: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the screening workflow. Construct via [`PolicyClient::from_config`];
/// an unset `base_url` means screening is disabled and the run loop proceeds
/// unconditionally.
pub struct PolicyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    user: String,
    cv_file_id: String,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl PolicyClient {
    pub fn from_config(cfg: &PolicyConfig) -> Option<Self> {
        let base_url = cfg.base_url.clone()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            user: cfg.user.clone(),
            cv_file_id: cfg.cv_file_id.clone().unwrap_or_default(),
            poll_attempts: cfg.poll_attempts,
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
        })
    }

    /// Screen one listing. Infallible by design: every failure is a Skip.
    pub async fn screen(&self, listing_text: &str) -> Screening {
        let request = RunRequest {
            inputs: RunInputs {
                linkedin_data: listing_text,
                cv_pdf: &self.cv_file_id,
            },
            user: &self.user,
            response_mode: "blocking",
        };

        let response = self
            .http
            .post(format!("{}{}", self.base_url, WORKFLOW_RUN_PATH))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "policy workflow request failed; skipping candidate");
                return Screening::skip();
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "policy workflow returned non-success; skipping candidate");
            return Screening::skip();
        }

        let envelope: RunEnvelope = match response.json().await {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "policy workflow reply was not valid JSON; skipping candidate");
                return Screening::skip();
            }
        };

        let state = envelope.data.unwrap_or_default();
        match state.status.as_deref() {
            Some("succeeded") => screening_from_outputs(state.outputs.as_ref()),
            Some("running") => {
                let run_id = envelope.task_id.or(envelope.workflow_run_id);
                match run_id {
                    Some(id) => self.poll_run_detail(&id).await,
                    None => {
                        warn!("policy workflow still running but returned no run id; skipping");
                        Screening::skip()
                    }
                }
            }
            other => {
                warn!(status = ?other, error = ?state.error, "policy workflow did not succeed; skipping candidate");
                Screening::skip()
            }
        }
    }

    async fn poll_run_detail(&self, run_id: &str) -> Screening {
        let url = format!("{}{}/{}", self.base_url, WORKFLOW_RUN_PATH, run_id);
        for attempt in 0..self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;
            let state: RunState = match self
                .http
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .and_then(|r| r.error_for_status())
            {
                Ok(r) => match r.json().await {
                    Ok(detail) => detail,
                    Err(e) => {
                        debug!(error = %e, attempt, "run-detail body unreadable; retrying");
                        continue;
                    }
                },
                Err(e) => {
                    debug!(error = %e, attempt, "run-detail poll failed; retrying");
                    continue;
                }
            };
            match state.status.as_deref() {
                Some("succeeded") => return screening_from_outputs(state.outputs.as_ref()),
                Some("failed") | Some("stopped") => {
                    warn!(error = ?state.error, "policy workflow run ended without success; skipping");
                    return Screening::skip();
                }
                _ => {}
            }
        }
        warn!(run_id, "policy workflow still running after poll budget; skipping candidate");
        Screening::skip()
    }
}

/// Parse workflow outputs into a screening. Unknown `apply_status` values
/// are sanitized to Skip; `form_answers` may arrive as a JSON object or as
/// a JSON string containing one.
fn screening_from_outputs(outputs: Option<&Value>) -> Screening {
    let Some(outputs) = outputs else {
        return Screening::skip();
    };

    let decision = match outputs
        .get("apply_status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_uppercase())
        .as_deref()
    {
        Some("PROCEED") => Decision::Proceed,
        _ => Decision::Skip,
    };

    let answers_value = match outputs.get("form_answers") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).unwrap_or(Value::Null),
        Some(v) => v.clone(),
        None => Value::Null,
    };
    let mut answers = HashMap::new();
    if let Value::Object(map) = answers_value {
        for (key, value) in map {
            let flat = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            answers.insert(key, flat);
        }
    }

    Screening { decision, answers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> PolicyConfig {
        PolicyConfig {
            base_url: Some(server.uri()),
            api_key: "pk-test".to_string(),
            user: "postule".to_string(),
            cv_file_id: Some("file-1".to_string()),
            poll_attempts: 3,
            poll_interval_secs: 0,
            timeout_secs: 5,
        }
    }

    #[test]
    fn unset_base_url_disables_the_client() {
        assert!(PolicyClient::from_config(&PolicyConfig::default()).is_none());
    }

    #[test]
    fn unknown_apply_status_is_sanitized_to_skip() {
        let outputs = json!({"apply_status": "MAYBE", "form_answers": {}});
        let screening = screening_from_outputs(Some(&outputs));
        assert_eq!(screening.decision, Decision::Skip);
    }

    #[test]
    fn form_answers_accepts_object_or_json_string() {
        let as_object = json!({"apply_status": "PROCEED",
            "form_answers": {"years_of_experience": 3, "salary": "95000"}});
        let screening = screening_from_outputs(Some(&as_object));
        assert_eq!(screening.decision, Decision::Proceed);
        assert_eq!(screening.answers["years_of_experience"], "3");
        assert_eq!(screening.answers["salary"], "95000");

        let as_string = json!({"apply_status": "PROCEED",
            "form_answers": "{\"visa\": \"Yes\"}"});
        let screening = screening_from_outputs(Some(&as_string));
        assert_eq!(screening.answers["visa"], "Yes");

        let garbled = json!({"apply_status": "PROCEED", "form_answers": "not json"});
        let screening = screening_from_outputs(Some(&garbled));
        assert_eq!(screening.decision, Decision::Proceed);
        assert!(screening.answers.is_empty());
    }

    #[tokio::test]
    async fn blocking_success_parses_decision_and_answers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workflows/run"))
            .and(header("authorization", "Bearer pk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "status": "succeeded",
                    "outputs": {"apply_status": "proceed",
                                "form_answers": {"salary": 95000}}
                }
            })))
            .mount(&server)
            .await;

        let client = PolicyClient::from_config(&config_for(&server)).unwrap();
        let screening = client.screen("Backend engineer, Montreal").await;
        assert_eq!(screening.decision, Decision::Proceed);
        assert_eq!(screening.answers["salary"], "95000");
    }

    #[tokio::test]
    async fn transport_failure_fails_closed_to_skip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = PolicyClient::from_config(&config_for(&server)).unwrap();
        let screening = client.screen("whatever").await;
        assert_eq!(screening.decision, Decision::Skip);
        assert!(screening.answers.is_empty());
    }

    #[tokio::test]
    async fn running_reply_polls_detail_until_succeeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workflows/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "run-42",
                "data": {"status": "running"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/workflows/run/run-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "outputs": {"apply_status": "PROCEED", "form_answers": {}}
            })))
            .mount(&server)
            .await;

        let client = PolicyClient::from_config(&config_for(&server)).unwrap();
        let screening = client.screen("listing").await;
        assert_eq!(screening.decision, Decision::Proceed);
    }

    #[tokio::test]
    async fn failed_run_detail_is_a_skip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workflows/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflow_run_id": "run-9",
                "data": {"status": "running"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/workflows/run/run-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed", "error": "workflow exploded"
            })))
            .mount(&server)
            .await;

        let client = PolicyClient::from_config(&config_for(&server)).unwrap();
        assert_eq!(client.screen("listing").await.decision, Decision::Skip);
    }
}
