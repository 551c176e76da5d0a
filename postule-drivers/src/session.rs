//! Session store: one authenticated browsing context per account.
//!
//! Login state lives primarily in the persistent browser profile directory
//! (`--user-data-dir`); a cookie snapshot on disk is the fallback when the
//! profile is fresh. The store can never fabricate credentials: when neither
//! source yields a logged-in session, the user must complete an interactive
//! login in the opened browser within a bounded wait.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fantoccini::cookies::Cookie;
use postule_common::{PostuleError, Result};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::{behavioral::Pacer, driver::Browser, launch::LaunchOptions, page::Page};

/// Marker rendered only for logged-in accounts.
const LOGGED_IN_SELECTOR: &str = ".global-nav, #global-nav, [data-test-global-nav]";
/// URL fragments of the login / checkpoint walls the site redirects to when
/// it rejects the session.
const AUTH_WALL_FRAGMENTS: &[&str] = &["authwall", "/login", "/uas/", "checkpoint", "/signup"];

const LOGIN_POLL: Duration = Duration::from_secs(5);

/// True if `url` is one of the site's login/checkpoint walls.
pub fn is_auth_wall(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    AUTH_WALL_FRAGMENTS.iter().any(|f| lower.contains(f))
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub launch: LaunchOptions,
    /// Cookie snapshot written atomically after each successful run.
    pub cookies_path: PathBuf,
    /// Page used to probe login state after connecting.
    pub home_url: String,
    /// Upper bound on the interactive-login wait.
    pub login_wait: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            launch: LaunchOptions::default(),
            cookies_path: PathBuf::from("data/cookies.json"),
            home_url: "https://www.linkedin.com/feed/".to_string(),
            login_wait: Duration::from_secs(180),
        }
    }
}

/// A ready, authenticated browsing context. All network activity after
/// acquisition is attributed to this session.
pub struct Session {
    pub browser: Browser,
}

impl Session {
    pub fn page(&self) -> Page {
        self.browser.page()
    }
}

/// Subset of cookie state we snapshot. Expiry is deliberately not carried:
/// restored cookies live for the browser session, which is enough to reach
/// the profile-backed login.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CookieRecord {
    name: String,
    value: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    http_only: bool,
}

pub struct SessionStore {
    opts: SessionOptions,
}

impl SessionStore {
    pub fn new(opts: SessionOptions) -> Self {
        Self { opts }
    }

    /// Return a ready, authenticated browsing context.
    ///
    /// Restores prior persisted state (profile dir, then cookie snapshot)
    /// when present and valid; otherwise waits for an out-of-band
    /// interactive login up to the configured bound and fails with a
    /// session error when the wait expires.
    pub async fn acquire(&self, pacer: Pacer) -> Result<Session> {
        let browser = Browser::connect(&self.opts.launch, pacer).await?;
        let page = browser.page();
        page.goto(&self.opts.home_url).await?;

        if self.logged_in(&page).await {
            info!("session restored from persistent profile");
            return Ok(Session { browser });
        }

        if self.restore_cookies(&page).await? {
            page.goto(&self.opts.home_url).await?;
            if self.logged_in(&page).await {
                info!("session restored from cookie snapshot");
                return Ok(Session { browser });
            }
        }

        info!(
            wait_secs = self.opts.login_wait.as_secs(),
            "no valid persisted session; waiting for interactive login"
        );
        let deadline = tokio::time::Instant::now() + self.opts.login_wait;
        while tokio::time::Instant::now() < deadline {
            sleep(LOGIN_POLL).await;
            if self.logged_in(&page).await {
                info!("interactive login completed");
                let session = Session { browser };
                self.persist(&session).await?;
                return Ok(session);
            }
        }
        Err(PostuleError::SessionInvalid(
            "interactive login did not complete within the configured wait".to_string(),
        ))
    }

    /// Write the current cookie state back atomically: the snapshot goes to
    /// a temp file in the same directory, then renames over the target, so
    /// a crash mid-save cannot corrupt previously saved state.
    pub async fn persist(&self, session: &Session) -> Result<()> {
        let cookies = session
            .browser
            .client
            .get_all_cookies()
            .await
            .map_err(anyhow::Error::from)?;
        let records: Vec<CookieRecord> = cookies
            .iter()
            .map(|c| CookieRecord {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c.domain().map(str::to_string),
                path: c.path().map(str::to_string),
                secure: c.secure().unwrap_or(false),
                http_only: c.http_only().unwrap_or(false),
            })
            .collect();
        write_snapshot_atomically(&self.opts.cookies_path, &records)?;
        info!(count = records.len(), path = %self.opts.cookies_path.display(), "cookie snapshot persisted");
        Ok(())
    }

    async fn logged_in(&self, page: &Page) -> bool {
        let url = match page.current_url().await {
            Ok(url) => url,
            Err(_) => return false,
        };
        if is_auth_wall(&url) {
            return false;
        }
        page.find(LOGGED_IN_SELECTOR).await.is_ok()
    }

    /// Load the snapshot into the live browser. Returns false when no
    /// snapshot exists or it cannot be read.
    async fn restore_cookies(&self, page: &Page) -> Result<bool> {
        let raw = match std::fs::read_to_string(&self.opts.cookies_path) {
            Ok(raw) => raw,
            Err(_) => return Ok(false),
        };
        let records: Vec<CookieRecord> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "cookie snapshot unreadable; ignoring it");
                return Ok(false);
            }
        };
        let count = records.len();
        for record in records {
            let mut cookie = Cookie::new(record.name, record.value);
            if let Some(domain) = record.domain {
                cookie.set_domain(domain);
            }
            if let Some(path) = record.path {
                cookie.set_path(path);
            }
            cookie.set_secure(record.secure);
            cookie.set_http_only(record.http_only);
            if let Err(e) = page.client.add_cookie(cookie).await {
                warn!(error = %e, "skipping one cookie the browser rejected");
            }
        }
        info!(count, "cookie snapshot loaded into browser");
        Ok(count > 0)
    }
}

fn write_snapshot_atomically(target: &Path, records: &[CookieRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).map_err(anyhow::Error::from)?;
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
        }
    }
    let tmp = target.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(anyhow::Error::from)?;
    std::fs::rename(&tmp, target).map_err(anyhow::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_wall_urls_are_recognized() {
        assert!(is_auth_wall("https://www.linkedin.com/authwall?trk=x"));
        assert!(is_auth_wall("https://www.linkedin.com/checkpoint/challenge/x"));
        assert!(is_auth_wall("https://www.linkedin.com/login"));
        assert!(!is_auth_wall("https://www.linkedin.com/feed/"));
        assert!(!is_auth_wall("https://www.linkedin.com/jobs/search/?keywords=rust"));
    }

    #[test]
    fn snapshot_write_replaces_previous_content_whole() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cookies.json");

        let first = vec![CookieRecord {
            name: "li_at".into(),
            value: "aaa".into(),
            domain: Some(".linkedin.com".into()),
            path: Some("/".into()),
            secure: true,
            http_only: true,
        }];
        write_snapshot_atomically(&target, &first).unwrap();

        let second = vec![CookieRecord {
            name: "li_at".into(),
            value: "bbb".into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
        }];
        write_snapshot_atomically(&target, &second).unwrap();

        let loaded: Vec<CookieRecord> =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].value, "bbb");
        // No stray temp file left behind.
        assert!(!target.with_extension("json.tmp").exists());
    }

    #[test]
    fn snapshot_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data/nested/cookies.json");
        write_snapshot_atomically(&target, &[]).unwrap();
        assert!(target.exists());
    }
}
