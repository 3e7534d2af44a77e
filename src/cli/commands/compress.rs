use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;
use indicatif::HumanBytes;
use std::path::PathBuf;

use crate::cli::output::{Output, RunDisplay};
use crate::config::BulkpressConfig;
use crate::parallel::ExecutorState;
use crate::schedule::CompressionLevel;
use crate::session::{Session, SessionOptions};

#[derive(Args)]
pub struct CompressArgs {
    /// Directory to compress
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Compression level, 0 (store) to 9 (ultra); out-of-range values use 5
    #[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
    pub level: i64,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Upper bound on concurrent archiver processes
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Path to the 7-Zip executable
    #[arg(long, value_name = "PATH")]
    pub archiver: Option<PathBuf>,
}

pub async fn execute(args: CompressArgs, config: BulkpressConfig, output: &Output) -> Result<()> {
    let mut config = config;
    if let Some(max_workers) = args.max_workers {
        config = config.with_override("scheduler.max_workers", max_workers);
    }
    if let Some(archiver) = &args.archiver {
        config = config.with_override("archiver.executable", archiver);
    }
    let settings = config.settings()?;
    let level = CompressionLevel::or_default(args.level);

    if !args.yes && !confirm(&args.root)? {
        output.warning("Aborted, nothing was compressed");
        return Ok(());
    }

    let session = Session::start(
        args.root.clone(),
        level,
        SessionOptions {
            settings,
            ..SessionOptions::default()
        },
    );
    output.verbose(&format!("Run {}", session.run_id()));

    // Ctrl-C requests a cooperative stop; in-flight files still finish
    let token = session.token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after in-flight files finish...");
            token.cancel();
        }
    });

    let (verbose, quiet) = (output.is_verbose(), output.is_quiet());
    let summary = tokio::task::spawn_blocking(move || {
        let mut display = RunDisplay::new(verbose, quiet);
        let summary = session.drain(|event| display.handle(event));
        display.finish();
        summary
    })
    .await
    .context("compression run aborted")?;
    ctrl_c.abort();

    match summary.state {
        ExecutorState::Failed => {
            let reason = summary.failure.unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("compression failed: {reason}");
        }
        ExecutorState::Stopped => output.warning(&format!(
            "Stopped: {} of {} files processed, {} not started",
            summary.processed, summary.total, summary.skipped
        )),
        _ if summary.total == 0 => output.info("No eligible files found"),
        _ => output.success(&format!(
            "Compressed {} of {} files in {:.1?}",
            summary.succeeded, summary.total, summary.elapsed
        )),
    }

    if summary.failed > 0 {
        output.warning(&format!("{} files failed and were left untouched", summary.failed));
    }
    if summary.saved_bytes > 0 {
        output.info(&format!("Space saved: {}", HumanBytes(summary.saved_bytes)));
    }
    if summary.dropped_log_lines > 0 {
        output.verbose(&format!("{} log lines dropped", summary.dropped_log_lines));
    }

    Ok(())
}

fn confirm(root: &std::path::Path) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!(
            "Compress eligible files under {} and delete the originals?",
            root.display()
        ))
        .default(false)
        .interact()
        .context("no terminal available for confirmation, pass --yes to proceed")
}
