use crate::browser::{
    behavioral::Pacer,
    launch::{build_launch_arguments, LaunchOptions},
    page::Page,
};
use anyhow::{Context, Result};
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;

/// Thin wrapper around a `fantoccini` WebDriver client carrying the pacing
/// engine every derived [`Page`] inherits.
pub struct Browser {
    pub client: Client,
    pacer: Pacer,
}

impl Browser {
    /// Connect to the WebDriver endpoint named in `opts` with the session's
    /// launch arguments applied.
    pub async fn connect(opts: &LaunchOptions, pacer: Pacer) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(build_launch_arguments(opts)));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&opts.webdriver_url)
            .await
            .with_context(|| format!("connecting to WebDriver at {}", opts.webdriver_url))?;

        Ok(Self { client, pacer })
    }

    /// A page handle over the current browser tab.
    pub fn page(&self) -> Page {
        Page::new(self.client.clone(), self.pacer.clone())
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
