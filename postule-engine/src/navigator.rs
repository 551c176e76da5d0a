//! Search-results navigation: building the filtered results URL, reading
//! listing cards, deduplicating across reads, and scrolling for more.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use postule_common::{PostuleError, Result};
use postule_config::{LimitConfig, SearchConfig};
use postule_drivers::Page;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::Candidate;

/// Known renderings of the results list container.
const RESULTS_CONTAINER_SELECTORS: &[&str] = &[
    ".jobs-search-results-list",
    ".scaffold-layout__list-container",
    "ul.jobs-search__results-list",
    "[data-job-id]",
];

/// Card variants, matched together in document order.
const CARD_SELECTOR: &str =
    ".job-card-container, li.jobs-search-results__list-item, li[data-occludable-job-id]";

/// Scrollable list element, first variant that exists wins.
const LIST_SCROLL_SELECTOR: &str =
    ".jobs-search-results-list, .scaffold-layout__list-container, ul.jobs-search__results-list";

/// Button texts marking a listing as simplified-apply, both languages.
pub(crate) const APPLY_TEXTS: &[&str] = &["Candidature simplifiée", "Easy Apply"];

/// The results-filter pill carries the same text as the apply control and
/// must never be mistaken for one.
pub(crate) const FILTER_PILL_ID: &str = "searchFilter_applyWithLinkedin";

/// Reads one visible card into a serializable snapshot; the apply marker is
/// taken from the card's own controls, never from the filter pill.
const READ_CARDS_SCRIPT: &str = r#"
const cards = Array.from(document.querySelectorAll(arguments[0]));
return cards.map((card) => {
    const text = (card.innerText || '').slice(0, 2000);
    const id = card.getAttribute('data-job-id')
        || card.getAttribute('data-occludable-job-id')
        || text.slice(0, 120);
    const title = (text.split('\n').find((line) => line.trim().length > 0) || '').trim();
    let hasApply = false;
    for (const control of card.querySelectorAll('button, [role="button"], .job-card-container__apply-method')) {
        if (control.id === arguments[2]) continue;
        const label = (control.innerText || '') + ' ' + (control.getAttribute('aria-label') || '');
        if (arguments[1].some((needle) => label.includes(needle))) { hasApply = true; break; }
    }
    return { id: id.trim(), title, snippet: text, has_apply: hasApply };
});
"#;

const SCROLL_SCRIPT: &str = r#"
const list = document.querySelector(arguments[0]);
if (list) { list.scrollTop = list.scrollHeight; }
else { window.scrollTo(0, document.body.scrollHeight); }
"#;

#[derive(Debug, Deserialize)]
pub(crate) struct CardSnapshot {
    id: String,
    title: String,
    snippet: String,
    has_apply: bool,
}

/// Traversal state for one search: identifiers already surfaced, cards
/// waiting to be handed out, and the remaining scroll budget.
pub struct SearchHandle {
    seen: HashSet<String>,
    queue: VecDeque<Candidate>,
    scroll_rounds_left: u32,
}

pub struct Navigator {
    page: Page,
    search: SearchConfig,
    limits: LimitConfig,
}

impl Navigator {
    pub fn new(page: Page, search: SearchConfig, limits: LimitConfig) -> Self {
        Self {
            page,
            search,
            limits,
        }
    }

    /// The results URL with keywords, location, and the simplified-apply
    /// filter applied.
    pub fn results_url(&self) -> Result<String> {
        build_results_url(&self.search)
    }

    /// Navigate to the results view, retrying until a recognizable list
    /// container renders. Exhausting the attempts is fatal to the run.
    pub async fn open_search(&self) -> Result<SearchHandle> {
        let url = self.results_url()?;
        let results_wait = Duration::from_secs(self.search.results_wait_secs);
        let backoff = Duration::from_secs(self.search.navigation_backoff_secs);

        for attempt in 1..=self.search.navigation_attempts.max(1) {
            info!(%url, attempt, "opening search results");
            if let Err(e) = self.page.goto(&url).await {
                warn!(attempt, error = %e, "navigation failed");
            } else {
                match self
                    .page
                    .wait_for_any(RESULTS_CONTAINER_SELECTORS, results_wait)
                    .await
                {
                    Ok(_) => {
                        return Ok(SearchHandle {
                            seen: HashSet::new(),
                            queue: VecDeque::new(),
                            scroll_rounds_left: self.limits.max_scroll_rounds,
                        })
                    }
                    Err(e) => warn!(attempt, error = %e, "results list never rendered"),
                }
            }
            tokio::time::sleep(backoff).await;
        }
        Err(PostuleError::Navigation(format!(
            "no recognizable results list after {} attempts",
            self.search.navigation_attempts.max(1)
        )))
    }

    /// The next not-yet-seen candidate, scrolling for more when the current
    /// read is exhausted. `None` means the search is drained.
    pub async fn next_candidate(&self, handle: &mut SearchHandle) -> Result<Option<Candidate>> {
        loop {
            if let Some(candidate) = handle.queue.pop_front() {
                return Ok(Some(candidate));
            }
            let cards = self.read_cards().await?;
            let fresh = admit_unseen(cards, &mut handle.seen, self.limits.max_list_count);
            if !fresh.is_empty() {
                debug!(count = fresh.len(), "admitted fresh candidates");
                handle.queue.extend(fresh);
                continue;
            }
            if handle.scroll_rounds_left == 0 {
                info!(seen = handle.seen.len(), "search drained");
                return Ok(None);
            }
            handle.scroll_rounds_left -= 1;
            self.scroll_list().await?;
        }
    }

    /// Click the candidate's card so its detail panel renders.
    pub async fn focus(&self, candidate: &Candidate) -> anyhow::Result<()> {
        let by_id = format!(
            "[data-job-id='{id}'], [data-occludable-job-id='{id}']",
            id = candidate.id
        );
        if let Ok(card) = self.page.find(&by_id).await {
            card.click().await?;
            return Ok(());
        }
        // Identifier was a text fallback: click the card whose text starts
        // with the same prefix.
        let prefix: String = candidate.snippet.chars().take(120).collect();
        self.page
            .execute(
                r#"
                const cards = Array.from(document.querySelectorAll(arguments[0]));
                const target = cards.find((card) => (card.innerText || '').startsWith(arguments[1]));
                if (!target) { throw new Error('candidate card not found'); }
                target.click();
                "#,
                vec![json!(CARD_SELECTOR), json!(prefix)],
            )
            .await?;
        self.page.pacer().action_pause().await;
        Ok(())
    }

    async fn read_cards(&self) -> Result<Vec<CardSnapshot>> {
        let value = self
            .page
            .execute(
                READ_CARDS_SCRIPT,
                vec![json!(CARD_SELECTOR), json!(APPLY_TEXTS), json!(FILTER_PILL_ID)],
            )
            .await?;
        let cards: Vec<CardSnapshot> = serde_json::from_value(value)
            .map_err(|e| PostuleError::Driver(anyhow::anyhow!("card snapshot decode: {e}")))?;
        Ok(cards)
    }

    async fn scroll_list(&self) -> Result<()> {
        debug!("scrolling results list for more cards");
        self.page
            .execute(SCROLL_SCRIPT, vec![json!(LIST_SCROLL_SELECTOR)])
            .await?;
        self.page.pacer().action_pause().await;
        Ok(())
    }
}

fn build_results_url(search: &SearchConfig) -> Result<String> {
    let mut url = Url::parse(&search.base_url)
        .map_err(|e| PostuleError::Config(format!("search.base_url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("keywords", &search.keywords)
        .append_pair("location", &search.location)
        .append_pair("f_AL", "true");
    Ok(url.into())
}

/// Admit cards whose identifier has not been surfaced before, in document
/// order, up to `cap` per read.
fn admit_unseen(
    cards: Vec<CardSnapshot>,
    seen: &mut HashSet<String>,
    cap: usize,
) -> Vec<Candidate> {
    let mut fresh = Vec::new();
    for card in cards.into_iter().take(cap.max(1)) {
        if card.id.is_empty() || !seen.insert(card.id.clone()) {
            continue;
        }
        fresh.push(Candidate {
            id: card.id,
            title: card.title,
            snippet: card.snippet,
            has_simplified_apply: card.has_apply,
        });
    }
    fresh
}
