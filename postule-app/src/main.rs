use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use postule_common::observability::{init_logging, LogConfig, LogFormat};
use postule_config::{AppConfig, PostuleConfigLoader};
use postule_engine::Engine;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Automated simplified-apply runner for job listings.
#[derive(Debug, Parser)]
#[command(name = "postule", version)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Saved-setup overrides file; its values beat every other source.
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Run the browser headless regardless of configuration.
    #[arg(long)]
    headless: bool,

    /// Search keywords for this run.
    #[arg(long)]
    keywords: Option<String>,

    /// Search location for this run.
    #[arg(long)]
    location: Option<String>,

    /// Stop after this many confirmed applications (0 = unlimited).
    #[arg(long)]
    max_applications: Option<u32>,

    /// Directory for the rolling log file.
    #[arg(long, env = "POSTULE_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    /// Flags as an inline JSON config snippet, or `None` when no flag that
    /// maps to configuration was given.
    fn config_snippet(&self) -> Option<String> {
        let mut overlay = serde_json::Map::new();
        let mut search = serde_json::Map::new();
        if let Some(keywords) = &self.keywords {
            search.insert("keywords".to_string(), json!(keywords));
        }
        if let Some(location) = &self.location {
            search.insert("location".to_string(), json!(location));
        }
        if !search.is_empty() {
            overlay.insert("search".to_string(), search.into());
        }
        if self.headless {
            overlay.insert("session".to_string(), json!({"headless": true}));
        }
        if let Some(cap) = self.max_applications {
            overlay.insert("limits".to_string(), json!({"max_applications": cap}));
        }
        if overlay.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(overlay).to_string())
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut loader = PostuleConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if let Some(snippet) = cli.config_snippet() {
        loader = loader.with_json_str(&snippet);
    }
    if let Some(path) = &cli.overrides {
        loader = loader.with_overrides_file(path);
    }
    Ok(loader.load()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_path = init_logging(LogConfig {
        app_name: "postule",
        log_dir: cli
            .log_dir
            .clone()
            .or_else(|| config.logging.dir.as_ref().map(PathBuf::from)),
        emit_stderr: config.logging.stderr,
        format: match config.logging.format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        },
        default_filter: config.logging.filter.clone(),
    })?;
    info!(log_file = %log_path.display(), "postule starting");

    let engine = Engine::build(&config).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; stopping after the current candidate");
                cancel.cancel();
            }
        });
    }

    let report = engine.run(cancel).await?;
    println!(
        "applied {} | skipped {} | failed {} ({} candidates processed)",
        report.applied,
        report.skipped,
        report.failed,
        report.processed()
    );
    for outcome in &report.outcomes {
        println!(
            "  {} {}: {}",
            outcome.at.format("%H:%M:%S"),
            outcome.kind.describe(),
            outcome.title
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_no_overlay() {
        let cli = Cli::parse_from(["postule"]);
        assert!(cli.config_snippet().is_none());
    }

    #[test]
    fn flags_become_a_config_overlay() {
        let cli = Cli::parse_from([
            "postule",
            "--headless",
            "--keywords",
            "rust backend",
            "--max-applications",
            "5",
        ]);
        let snippet = cli.config_snippet().unwrap();
        let value: serde_json::Value = serde_json::from_str(&snippet).unwrap();
        assert_eq!(value["search"]["keywords"], "rust backend");
        assert_eq!(value["session"]["headless"], true);
        assert_eq!(value["limits"]["max_applications"], 5);
    }

    #[test]
    fn overlay_feeds_the_loader() {
        let cli = Cli::parse_from(["postule", "--location", "Montréal, QC"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.search.location, "Montréal, QC");
    }
}
