//! Terminal output for the CLI
//!
//! [`Output`] prints styled one-off messages. [`RunDisplay`] renders the
//! event stream of a compression run as a progress bar with log lines above
//! it.

use crate::progress::{LogLevel, ProgressEvent};
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Only printed with `-v`
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<20} {}", style(key).dim(), value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if !self.quiet {
            println!("  • {}", item);
        }
    }
}

/// Styled prefix for a consumer-facing log line
pub fn level_prefix(level: LogLevel) -> String {
    let tag = format!("[{level}]");
    match level {
        LogLevel::Info => style(tag).blue().to_string(),
        LogLevel::Analysis => style(tag).cyan().to_string(),
        LogLevel::Compress => style(tag).magenta().to_string(),
        LogLevel::Success => style(tag).green().to_string(),
        LogLevel::Warning => style(tag).yellow().to_string(),
        LogLevel::Error => style(tag).red().bold().to_string(),
    }
}

/// Progress bar plus log lines for one compression run
pub struct RunDisplay {
    bar: ProgressBar,
    verbose: bool,
    quiet: bool,
}

impl RunDisplay {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
            bar.set_style(bar_style());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };

        Self {
            bar,
            verbose,
            quiet,
        }
    }

    pub fn handle(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StatusChanged(status) => self.bar.set_prefix(status.clone()),
            ProgressEvent::TotalSet(total) => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
            }
            ProgressEvent::JobCompleted {
                processed,
                saved_bytes,
                success,
                ..
            } => {
                self.bar.set_position(*processed as u64);
                if *success && let Some(saved) = saved_bytes {
                    self.bar.set_message(format!("{} saved", HumanBytes(*saved)));
                }
            }
            ProgressEvent::LogLine { level, message } => self.log(*level, message),
            ProgressEvent::EstimateReady(_) => {}
            ProgressEvent::Completed { .. }
            | ProgressEvent::Stopped { .. }
            | ProgressEvent::Failed { .. } => self.bar.finish_and_clear(),
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        if self.quiet && level != LogLevel::Error {
            return;
        }
        // Per-file chatter is only shown with -v
        let chatty = matches!(level, LogLevel::Compress | LogLevel::Analysis)
            || (level == LogLevel::Warning && message.starts_with("Skipped"));
        if chatty && !self.verbose {
            return;
        }
        self.bar.println(format!("{} {}", level_prefix(level), message));
    }

    pub fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {prefix:.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-")
}
