use anyhow::Result;
use clap::Args;
use indicatif::{HumanBytes, HumanDuration};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{Output, level_prefix};
use crate::config::BulkpressConfig;
use crate::parallel::CancellationToken;
use crate::progress::{ProgressChannel, ProgressEvent};
use crate::schedule::{CompressionLevel, Estimate, Job, Scheduler};
use crate::walk;
use system_profile::SystemProfile;

#[derive(Args)]
pub struct PlanArgs {
    /// Directory to analyse
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Compression level, 0 (store) to 9 (ultra); out-of-range values use 5
    #[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
    pub level: i64,

    /// Number of jobs to list
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    root: &'a PathBuf,
    level: CompressionLevel,
    workers: usize,
    excluded: usize,
    estimate: Estimate,
    extensions: Vec<(String, usize)>,
    jobs: &'a [Job],
}

pub fn execute(args: PlanArgs, config: BulkpressConfig, output: &Output) -> Result<()> {
    let settings = config.settings()?;
    let level = CompressionLevel::or_default(args.level);
    let scheduler = Scheduler::new(&settings.rules, settings.scheduler.clone());

    let (tx, mut rx) = ProgressChannel::new(settings.progress.log_capacity);
    let report = walk::walk(&args.root, scheduler.classifier(), &CancellationToken::new(), &tx)?;
    drop(tx);

    if output.is_verbose() && !args.json {
        while let Some(event) = rx.try_recv() {
            if let ProgressEvent::LogLine { level, message } = event {
                println!("{} {}", level_prefix(level), message);
            }
        }
    }

    let profile = SystemProfile::detect_in(&args.root);
    let plan = scheduler.plan(report.files, level, &profile);
    let shown = &plan.jobs[..plan.jobs.len().min(args.limit)];

    if args.json {
        let report = PlanReport {
            root: &args.root,
            level,
            workers: plan.workers,
            excluded: plan.excluded,
            estimate: plan.estimate,
            extensions: plan.extension_breakdown(10),
            jobs: shown,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output.header(&format!("Plan for {}", args.root.display()));
    output.key_value("Level", &level.to_string());
    output.key_value("Eligible files", &plan.jobs.len().to_string());
    output.key_value("Excluded files", &plan.excluded.to_string());
    output.key_value("Pruned folders", &report.pruned_dirs.to_string());
    output.key_value("Workers", &plan.workers.to_string());
    output.key_value(
        "Total size",
        &HumanBytes(plan.estimate.total_size_bytes).to_string(),
    );
    output.key_value(
        "Estimated time",
        &format!("{} (rough guide)", HumanDuration(plan.estimate.duration())),
    );

    if plan.is_empty() {
        output.warning("No eligible files found");
        return Ok(());
    }

    output.header("File types");
    for (ext, count) in plan.extension_breakdown(10) {
        output.list_item(&format!("{ext}: {count} files"));
    }

    output.header(&format!("First {} of {} jobs", shown.len(), plan.jobs.len()));
    for job in shown {
        output.list_item(&format!(
            "{:>10}  {}  {}",
            HumanBytes(job.descriptor.size_bytes),
            job.descriptor.path.display(),
            job.flags().join(" ")
        ));
    }

    Ok(())
}
