use crate::config::SweepConfig;
use crate::report::{CsvReportSink, RunSummary};
use anyhow::Context;
use chrono::Utc;
use clicksweep_scanner::{
    CatalogBuilder, ChromiumDriver, Crawler, Driver, Executor, InteractionOutcome, Policy,
    RecoveryController,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Options for configuring a sweep
pub struct SweepOptions {
    pub urls: Vec<String>,
    pub config: SweepConfig,
    pub screenshot: Option<PathBuf>,
    pub show_progress: bool,
}

/// Callback for reporting sweep progress
pub type SweepProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Summaries for every start URL attempted, plus the error that ended the
/// run early if the browser was lost.
#[derive(Debug)]
pub struct SweepResult {
    pub summaries: Vec<RunSummary>,
    pub fatal: Option<String>,
}

/// Assemble the engine from a configuration.
pub fn build_crawler(config: &SweepConfig) -> Crawler {
    let recovery = RecoveryController::new(
        config.recovery,
        config.quiescence_timeout(),
        config.settle(),
    );
    let executor = Executor::new(recovery)
        .with_click_timeout(config.click_timeout())
        .with_settle(config.settle())
        .with_gate(config.gate);

    Crawler::new()
        .with_catalog(CatalogBuilder::with_heuristics(config.heuristics.clone()))
        .with_policy(Policy::new(config.policy.clone()))
        .with_executor(executor)
        .with_scroll(config.scroll_step, config.scroll_settle())
        .with_nav_selector(config.nav_selector.clone())
        .with_footer_selector(config.footer_selector.clone())
        .with_descend(config.descend)
        .with_volume_scope(config.volume_scope)
}

/// Sweep each start URL in turn against one browsing context. Every URL
/// gets a fresh run state; all of them share `sink`.
///
/// A URL that cannot be loaded is recorded and skipped. Losing the browser
/// stops the sweep and is reported through [`SweepResult::fatal`].
pub async fn sweep_urls(
    driver: &dyn Driver,
    crawler: &Crawler,
    urls: &[String],
    sink: &mut CsvReportSink,
    cancel: &CancellationToken,
) -> SweepResult {
    let mut summaries = Vec::new();

    for url in urls {
        if cancel.is_cancelled() {
            info!("Sweep cancelled before {}", url);
            break;
        }

        sink.set_home(url);
        let started_at = Utc::now();
        match crawler.crawl(driver, url, sink, cancel).await {
            Ok(crawl) => {
                let cancelled = crawl.cancelled;
                summaries.push(RunSummary::from_crawl(&crawl, started_at, Utc::now()));
                if cancelled {
                    break;
                }
            }
            Err(e) if e.is_fatal() => {
                error!("Sweep of {} aborted: {}", url, e);
                summaries.push(RunSummary::failed(url, started_at, Utc::now(), e.to_string()));
                return SweepResult {
                    summaries,
                    fatal: Some(e.to_string()),
                };
            }
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                summaries.push(RunSummary::failed(url, started_at, Utc::now(), e.to_string()));
            }
        }
    }

    SweepResult {
        summaries,
        fatal: None,
    }
}

/// Launch Chromium, sweep every start URL into the configured report and
/// shut the browser down. Ctrl-C stops the scope in progress; every attempt
/// that finished before it stays in the report.
pub async fn execute_sweep(
    options: SweepOptions,
    progress_callback: Option<SweepProgressCallback>,
) -> anyhow::Result<SweepResult> {
    let SweepOptions {
        urls,
        config,
        screenshot,
        show_progress,
    } = options;

    let mut sink = CsvReportSink::create(&config.report_path, config.report_layout)
        .with_context(|| format!("Failed to create report {}", config.report_path.display()))?;

    let progress_bar = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        pb.set_message("Launching browser...");
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let attempted = Arc::new(AtomicUsize::new(0));
    let pb_clone = progress_bar.clone();
    let count_clone = attempted.clone();
    let crawler = build_crawler(&config).with_progress_callback(Arc::new(
        move |scope: &str, outcome: &InteractionOutcome| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            let message = format!("[{}] {} → {}", scope, outcome.text, outcome.status);
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!("{} elements | {}", count, message));
            }
            if let Some(ref callback) = progress_callback {
                callback(message);
            }
        },
    ));

    let driver = ChromiumDriver::launch(config.headless)
        .await
        .context("Failed to launch Chromium")?;

    // Only listen for Ctrl-C once there is a browser to shut down.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing up");
            signal_token.cancel();
        }
    });

    if let Some(ref pb) = progress_bar {
        pb.set_message("Sweeping...");
    }

    let result = sweep_urls(&driver, &crawler, &urls, &mut sink, &cancel).await;

    if let Some(path) = screenshot
        && result.fatal.is_none()
        && let Err(e) = driver.screenshot(&path).await
    {
        warn!("Screenshot failed: {}", e);
    }

    if let Err(e) = driver.close().await {
        warn!("Error shutting down browser: {}", e);
    }
    signal_task.abort();

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Sweep finished: {} elements attempted, {} rows in {}",
            attempted.load(Ordering::Relaxed),
            sink.rows_written(),
            sink.path().display()
        ));
    }

    Ok(result)
}
