//! CLI entry point for the authtokens tool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use authtokens_core::{
    AuthMode, BrowserSession, ChromeOptions, Database, HeadlessBrowser, Identity,
    InteractiveBrowser, Pipeline, PipelineConfig, ReplayScorer, SessionCookieMetadata, Store,
    artifacts,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Authtokens starting");

    // Collect the URL batch: a single URL or a newline-delimited file.
    let urls: Vec<String> = if let Some(path) = &args.filename {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read url list {}", path.display()))?;
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    } else {
        args.url.clone().into_iter().collect()
    };

    if urls.is_empty() {
        info!("No urls to process");
        return Ok(());
    }

    let capture_dir = PathBuf::from(artifacts::DEFAULT_CAPTURE_DIR);
    artifacts::ensure_capture_dir(&capture_dir)?;

    let db = Database::new(&args.database)
        .await
        .context("failed to open results database")?;
    let store = Store::new(db.clone());

    let identity = Identity::new(
        args.email.clone(),
        args.username.clone(),
        args.nickname.clone(),
        args.password.clone(),
    );

    info!("Starting interactive browser session");
    let login = Arc::new(
        InteractiveBrowser::launch(
            identity.clone(),
            args.threshold,
            &ChromeOptions::interactive(args.ignore_alarm),
        )
        .await
        .context("failed to launch interactive browser")?,
    );

    info!("Starting headless browser session");
    let probe = Arc::new(
        HeadlessBrowser::launch(
            identity,
            args.threshold,
            &ChromeOptions::headless(args.ignore_alarm),
        )
        .await
        .context("failed to launch headless browser")?,
    );

    let metadata = Arc::new(SessionCookieMetadata::new(Arc::clone(&login)));
    let scorer = Arc::new(ReplayScorer::new(Arc::clone(&probe)));

    let mode = if args.manual {
        info!("Manual mode active");
        AuthMode::Manual {
            wait: Duration::from_secs(args.seconds_to_login),
        }
    } else {
        info!("Automatic mode active");
        AuthMode::Automatic
    };

    let config = PipelineConfig {
        threshold: args.threshold,
        max_tokens: args.max_tokens,
        per_url_timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        mode,
        capture_dir,
    };

    let login_session: Arc<dyn BrowserSession> = login.clone();
    let probe_session: Arc<dyn BrowserSession> = probe.clone();
    let pipeline = Pipeline::new(login_session, probe_session, metadata, scorer, store, config);

    let run_result = pipeline.run_batch(&urls).await;

    // Both sessions are terminated even when the batch aborted early.
    info!("Quitting browsers");
    if let Err(error) = login.quit().await {
        warn!(error = %error, "interactive browser did not shut down cleanly");
    }
    if let Err(error) = probe.quit().await {
        warn!(error = %error, "headless browser did not shut down cleanly");
    }
    db.close().await;

    let stats = run_result.context("batch aborted")?;
    info!(
        succeeded = stats.succeeded(),
        failed = stats.failed(),
        skipped = stats.skipped(),
        total = stats.total(),
        "Detection complete"
    );

    Ok(())
}
