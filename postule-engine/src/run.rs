//! The run loop: wire the drivers together, walk the search, and keep the
//! counters honest.

use std::sync::Arc;

use postule_common::{PostuleError, Result};
use postule_config::AppConfig;
use postule_drivers::{LaunchOptions, Pacer, Session, SessionOptions, SessionStore};
use postule_llm::ensure_llm_ready;
use postule_policy::{Decision, PolicyClient};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::document::DocumentStore;
use crate::limit::is_daily_limit_text;
use crate::modal::{ApplyVerdict, ModalDriver};
use crate::navigator::Navigator;
use crate::resolve::{
    DocumentResolver, ExperienceResolver, PolicyAnswers, ProfileResolver, Resolver, ResolverChain,
    WorkAuthResolver,
};
use crate::experience::ExperienceProfile;
use crate::types::{
    ApplicationOutcome, Candidate, OutcomeKind, RunStatus, SkipReason,
};

/// Ordered record of every processed candidate plus the derived counters.
/// The counters are only ever advanced through [`RunReport::record`], which
/// keeps them consistent with the outcome list by construction.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ApplicationOutcome>,
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunReport {
    pub fn record(&mut self, outcome: ApplicationOutcome) -> &ApplicationOutcome {
        match outcome.kind {
            OutcomeKind::Applied => self.applied += 1,
            OutcomeKind::Skipped(_) => self.skipped += 1,
            OutcomeKind::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(outcome);
        self.outcomes.last().expect("just pushed")
    }

    pub fn processed(&self) -> u32 {
        self.outcomes.len() as u32
    }
}

/// The wired apply engine. Built once per run from configuration; consumed
/// by [`Engine::run`].
pub struct Engine {
    session: Session,
    store: SessionStore,
    navigator: Navigator,
    modal: ModalDriver,
    policy: Option<PolicyClient>,
    pacer: Pacer,
    max_applications: u32,
    status_tx: watch::Sender<RunStatus>,
    status_rx: watch::Receiver<RunStatus>,
}

impl Engine {
    /// Connect the browser, restore the session, and wire the resolver
    /// chain per configuration.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let pacer = Pacer::from_secs(
            config.pacing.min_delay_secs,
            config.pacing.max_delay_secs,
            config.pacing.typing_min_ms,
            config.pacing.typing_max_ms,
        );

        let store = SessionStore::new(SessionOptions {
            launch: LaunchOptions {
                webdriver_url: config.session.webdriver_url.clone(),
                headless: config.session.headless,
                user_data_dir: config.session.user_data_dir.clone().into(),
                lang: config.session.lang.clone(),
            },
            cookies_path: config.session.cookies_path.clone().into(),
            home_url: home_url_for(&config.search.base_url),
            login_wait: std::time::Duration::from_secs(config.session.login_wait_secs),
        });
        let session = store.acquire(pacer.clone()).await?;
        let page = session.page();

        let documents = Arc::new(DocumentStore::from_config(&config.documents));
        let llm = ensure_llm_ready(&config.llm).await?;

        let mut resolvers: Vec<Box<dyn Resolver>> = vec![
            Box::new(WorkAuthResolver::new(&config.answers)),
            Box::new(ExperienceResolver::new(
                ExperienceProfile::from_config(&config.experience),
                &config.answers,
            )),
            Box::new(ProfileResolver::new(&config.profile, &config.answers)),
        ];
        match llm {
            Some(llm) => resolvers.push(Box::new(DocumentResolver::new(llm, documents.clone()))),
            None => info!("no reasoning provider configured; document-grounded stage disabled"),
        }
        let chain = Arc::new(ResolverChain::new(resolvers));

        let navigator = Navigator::new(page.clone(), config.search.clone(), config.limits.clone());
        let modal = ModalDriver::new(page, chain, documents, config.limits.max_modal_steps);
        let policy = PolicyClient::from_config(&config.policy);
        if policy.is_some() {
            info!("screening policy enabled");
        }

        let (status_tx, status_rx) = watch::channel(RunStatus::default());
        Ok(Self {
            session,
            store,
            navigator,
            modal,
            policy,
            pacer,
            max_applications: config.limits.max_applications,
            status_tx,
            status_rx,
        })
    }

    /// Live counter snapshots, refreshed after every outcome.
    pub fn status(&self) -> watch::Receiver<RunStatus> {
        self.status_rx.clone()
    }

    /// Walk the search until it drains, a cap or limit is hit, the token is
    /// cancelled, or a fatal error ends the run. The session snapshot is
    /// persisted and the browser closed on every exit path.
    pub async fn run(self, cancel: CancellationToken) -> Result<RunReport> {
        let mut report = RunReport::default();
        let result = self.run_inner(&cancel, &mut report).await;

        self.publish(&report, false);
        if let Err(e) = self.store.persist(&self.session).await {
            warn!(error = %e, "could not persist session snapshot");
        }
        info!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            "run finished"
        );
        if let Err(e) = self.session.browser.close().await {
            warn!(error = %e, "could not close the browser session");
        }
        result.map(|()| report)
    }

    async fn run_inner(&self, cancel: &CancellationToken, report: &mut RunReport) -> Result<()> {
        let mut handle = self.navigator.open_search().await?;
        self.publish(report, true);

        loop {
            if cancel.is_cancelled() {
                info!("stop requested; ending run at a candidate boundary");
                return Ok(());
            }
            let Some(candidate) = self.navigator.next_candidate(&mut handle).await? else {
                return Ok(());
            };

            if !candidate.has_simplified_apply {
                self.record(report, &candidate, OutcomeKind::Skipped(SkipReason::NotSimplified));
                continue;
            }

            if let Err(e) = self.navigator.focus(&candidate).await {
                warn!(candidate = %candidate.id, error = %e, "could not focus the listing");
                self.record(
                    report,
                    &candidate,
                    OutcomeKind::Failed(crate::types::FailureReason::Aborted),
                );
                continue;
            }

            if self.daily_limit_reached().await {
                warn!("daily application limit reached; stopping the run");
                self.record(report, &candidate, OutcomeKind::Skipped(SkipReason::DailyLimit));
                return Ok(());
            }

            let policy_answers = match &self.policy {
                Some(client) => {
                    let screening = client.screen(&candidate.snippet).await;
                    if screening.decision == Decision::Skip {
                        self.record(report, &candidate, OutcomeKind::Skipped(SkipReason::Policy));
                        continue;
                    }
                    Some(PolicyAnswers::new(screening.answers))
                }
                None => None,
            };

            match self.modal.apply(&candidate, policy_answers.as_ref()).await {
                Ok(ApplyVerdict::Submitted) => {
                    self.record(report, &candidate, OutcomeKind::Applied);
                }
                Ok(ApplyVerdict::Failed(reason)) => {
                    self.record(report, &candidate, OutcomeKind::Failed(reason));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(candidate = %candidate.id, error = %e, "unexpected driver error");
                    self.record(
                        report,
                        &candidate,
                        OutcomeKind::Failed(crate::types::FailureReason::Aborted),
                    );
                }
            }

            if self.max_applications > 0 && report.applied >= self.max_applications {
                info!(cap = self.max_applications, "application cap reached");
                return Ok(());
            }
            self.pacer.action_pause().await;
        }
    }

    async fn daily_limit_reached(&self) -> bool {
        match self.session.page().body_text().await {
            Ok(text) => is_daily_limit_text(&text),
            Err(e) => {
                warn!(error = %e, "could not read page text for limit check");
                false
            }
        }
    }

    fn record(&self, report: &mut RunReport, candidate: &Candidate, kind: OutcomeKind) {
        let outcome = report.record(ApplicationOutcome::now(candidate, kind));
        info!(
            candidate = %outcome.candidate_id,
            title = %outcome.title,
            outcome = %outcome.kind.describe(),
            "candidate processed"
        );
        self.publish(report, true);
    }

    fn publish(&self, report: &RunReport, running: bool) {
        let status = RunStatus {
            running,
            applied: report.applied,
            skipped: report.skipped,
            failed: report.failed,
            processed: report.processed(),
            last_outcome: report.outcomes.last().map(|o| o.kind.describe()),
        };
        let _ = self.status_tx.send(status);
    }
}

/// The login-probe page on the same origin as the search.
fn home_url_for(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}/feed/", url.scheme(), host),
            None => SessionOptions::default().home_url,
        },
        Err(_) => SessionOptions::default().home_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureReason;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            title: format!("Job {id}"),
            snippet: String::new(),
            has_simplified_apply: true,
        }
    }

    #[test]
    fn counters_track_the_outcome_list() {
        let mut report = RunReport::default();
        report.record(ApplicationOutcome::now(&candidate("1"), OutcomeKind::Applied));
        report.record(ApplicationOutcome::now(
            &candidate("2"),
            OutcomeKind::Skipped(SkipReason::Policy),
        ));
        report.record(ApplicationOutcome::now(
            &candidate("3"),
            OutcomeKind::Failed(FailureReason::UnresolvedQuestion),
        ));
        report.record(ApplicationOutcome::now(
            &candidate("4"),
            OutcomeKind::Failed(FailureReason::SubmitUnconfirmed),
        ));

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.processed(), 4);
        assert_eq!(
            report.processed(),
            report.applied + report.skipped + report.failed
        );
    }

    #[test]
    fn unconfirmed_submission_never_counts_as_applied() {
        let mut report = RunReport::default();
        report.record(ApplicationOutcome::now(
            &candidate("1"),
            OutcomeKind::Failed(FailureReason::SubmitUnconfirmed),
        ));
        assert_eq!(report.applied, 0);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn home_url_follows_the_search_origin() {
        assert_eq!(
            home_url_for("https://www.linkedin.com/jobs/search/"),
            "https://www.linkedin.com/feed/"
        );
        assert_eq!(
            home_url_for("not a url"),
            "https://www.linkedin.com/feed/"
        );
    }
}
