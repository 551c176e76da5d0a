use std::path::PathBuf;

/// Options controlling how the browser session is launched.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// WebDriver endpoint, e.g. a local Chromedriver.
    pub webdriver_url: String,
    pub headless: bool,
    /// Persistent profile directory. This is what keeps the login alive
    /// between runs; cookies snapshots are only a fallback on top of it.
    pub user_data_dir: PathBuf,
    /// UI language handed to the browser (`--lang`).
    pub lang: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            user_data_dir: PathBuf::from("user_data"),
            lang: "fr-FR".to_string(),
        }
    }
}

/// Construct Chrome command-line arguments for the session.
///
/// The set is the minimal one the apply flow needs: a persistent profile,
/// a stable window size, the configured UI language, and the automation
/// banner suppressed so the site renders the same chrome a person sees.
pub fn build_launch_arguments(opts: &LaunchOptions) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--user-data-dir={}", opts.user_data_dir.display()),
        "--window-size=1280,900".to_string(),
        format!("--lang={}", opts.lang),
    ];
    if opts.headless {
        args.push("--headless".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}
