use anyhow::Result;
use fantoccini::elements::Element;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Produces human-paced delays between discrete UI actions and while typing.
///
/// The bounds come from configuration; every sleep is a pure scheduling
/// delay drawn uniformly from them and has no correctness role.
#[derive(Debug, Clone)]
pub struct Pacer {
    action_min_ms: u64,
    action_max_ms: u64,
    typing_min_ms: u64,
    typing_max_ms: u64,
}

impl Pacer {
    pub fn new(action_min_ms: u64, action_max_ms: u64, typing_min_ms: u64, typing_max_ms: u64) -> Self {
        // Collapse inverted bounds instead of panicking mid-run.
        let (action_min_ms, action_max_ms) = if action_min_ms <= action_max_ms {
            (action_min_ms, action_max_ms)
        } else {
            (action_max_ms, action_min_ms)
        };
        let (typing_min_ms, typing_max_ms) = if typing_min_ms <= typing_max_ms {
            (typing_min_ms, typing_max_ms)
        } else {
            (typing_max_ms, typing_min_ms)
        };
        Self {
            action_min_ms,
            action_max_ms,
            typing_min_ms,
            typing_max_ms,
        }
    }

    /// Build from second-denominated configuration values.
    pub fn from_secs(action_min_secs: f64, action_max_secs: f64, typing_min_ms: u64, typing_max_ms: u64) -> Self {
        Self::new(
            (action_min_secs.max(0.0) * 1000.0) as u64,
            (action_max_secs.max(0.0) * 1000.0) as u64,
            typing_min_ms,
            typing_max_ms,
        )
    }

    /// Sleep for a random duration between the configured action bounds.
    pub async fn action_pause(&self) {
        self.pause_between(self.action_min_ms, self.action_max_ms).await;
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn pause_between(&self, min: u64, max: u64) {
        let mut rng = OsRng;
        let ms = if min >= max { min } else { rng.gen_range(min..=max) };
        sleep(Duration::from_millis(ms)).await;
    }

    /// Type the provided text with small random delays between characters.
    pub async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        for ch in text.chars() {
            element.send_keys(&ch.to_string()).await?;
            self.pause_between(self.typing_min_ms, self.typing_max_ms).await;
        }
        Ok(())
    }
}

impl Default for Pacer {
    /// Bounds tuned for tests and non-interactive use; production pacing
    /// comes from configuration.
    fn default() -> Self {
        Self::new(200, 800, 30, 150)
    }
}
