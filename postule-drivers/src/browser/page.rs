use crate::browser::behavioral::Pacer;
use anyhow::{anyhow, Context, Result};
use fantoccini::{elements::Element, Client, Locator};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

/// Poll cadence for compound waits that cannot go through the WebDriver
/// wait endpoint (multiple selectors, absence checks).
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// High-level page wrapper providing element queries with bounded waits.
///
/// Every wait on this type has an explicit upper bound; exceeding it is an
/// error, never a hang.
#[derive(Clone)]
pub struct Page {
    pub(crate) client: Client,
    pacer: Pacer,
}

impl Page {
    pub fn new(client: Client, pacer: Pacer) -> Self {
        Self { client, pacer }
    }

    /// Navigate to `url` with a small pacing delay first.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.pacer.action_pause().await;
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigating to {url}"))?;
        Ok(())
    }

    /// Return the current page URL as a string.
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    /// Wait up to `timeout` for the first of several selectors to appear.
    ///
    /// The site's structure drifts; callers pass the known variants of a
    /// container and take whichever renders.
    pub async fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> Result<PageElement> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            for selector in selectors {
                if let Ok(element) = self.client.find(Locator::Css(selector)).await {
                    return Ok(PageElement::new(element, self.pacer.clone()));
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(anyhow!(
                    "none of {selectors:?} appeared within {timeout:?}"
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait up to `timeout` for `selector` to be absent or hidden.
    pub async fn wait_for_gone(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.client.find(Locator::Css(selector)).await {
                Err(_) => return Ok(()),
                Ok(element) => {
                    // Stale or hidden both count as gone.
                    match element.is_displayed().await {
                        Ok(false) | Err(_) => return Ok(()),
                        Ok(true) => {}
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(anyhow!("`{selector}` still visible after {timeout:?}"));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Find a single element without waiting.
    pub async fn find(&self, selector: &str) -> Result<PageElement> {
        let element = self.client.find(Locator::Css(selector)).await?;
        Ok(PageElement::new(element, self.pacer.clone()))
    }

    /// Find zero or more elements by CSS selector, in document order.
    pub async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        Ok(elements
            .into_iter()
            .map(|element| PageElement::new(element, self.pacer.clone()))
            .collect())
    }

    /// Visible text of the whole page body.
    pub async fn body_text(&self) -> Result<String> {
        let value = self
            .execute("return (document.body && document.body.innerText) || '';", vec![])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Execute a JavaScript snippet in the page.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client
            .execute(script, args)
            .await
            .map_err(anyhow::Error::from)
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }
}

/// Wrapper for DOM elements with paced interaction helpers.
#[derive(Clone)]
pub struct PageElement {
    pub element: Element,
    pacer: Pacer,
}

impl PageElement {
    pub fn new(element: Element, pacer: Pacer) -> Self {
        Self { element, pacer }
    }

    /// Click with a pacing delay first.
    pub async fn click(&self) -> Result<()> {
        self.pacer.action_pause().await;
        self.element.click().await.map_err(anyhow::Error::from)
    }

    /// Clear the control and type `text` with human-paced keystrokes.
    pub async fn clear_and_type(&self, text: &str) -> Result<()> {
        self.element.clear().await?;
        self.pacer.type_text(&self.element, text).await
    }

    /// Send raw keys without clearing (file inputs take a path this way).
    pub async fn send_keys(&self, text: &str) -> Result<()> {
        self.element.send_keys(text).await.map_err(anyhow::Error::from)
    }

    /// Select the `<select>` option with exactly this visible label.
    pub async fn select_by_label(&self, label: &str) -> Result<()> {
        self.pacer.action_pause().await;
        self.element
            .select_by_label(label)
            .await
            .map_err(anyhow::Error::from)
    }

    /// The element's visible text, trimmed.
    pub async fn text(&self) -> Result<String> {
        Ok(self.element.text().await?.trim().to_string())
    }

    /// Read an attribute value.
    pub async fn attr(&self, attribute: &str) -> Result<Option<String>> {
        self.element.attr(attribute).await.map_err(anyhow::Error::from)
    }

    pub async fn is_displayed(&self) -> Result<bool> {
        self.element.is_displayed().await.map_err(anyhow::Error::from)
    }

    /// Find zero or more descendants by CSS selector.
    pub async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>> {
        let elements = self.element.find_all(Locator::Css(selector)).await?;
        Ok(elements
            .into_iter()
            .map(|element| PageElement::new(element, self.pacer.clone()))
            .collect())
    }
}
