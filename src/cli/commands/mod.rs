use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::output::Output;
use crate::config::BulkpressConfig;

pub mod compress;
pub mod plan;
pub mod profile;

#[derive(Parser)]
#[command(
    name = "bulkpress",
    version = env!("CARGO_PKG_VERSION"),
    about = "Adaptive bulk compression of file trees with 7-Zip",
    long_about = "bulkpress walks a directory tree, picks the files worth compressing, orders \
                  them for fast feedback and directory locality, and compresses each one with \
                  7-Zip on a worker pool sized to the machine. Originals are deleted once their \
                  archive has been written."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress every eligible file under a directory, deleting the originals
    Compress(compress::CompressArgs),
    /// Show what would be compressed, in order, without touching anything
    Plan(plan::PlanArgs),
    /// Show the detected system profile
    Profile(profile::ProfileArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Set up logging based on verbosity
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        let config_path = self.config.as_deref();

        match self.command {
            Some(Commands::Compress(args)) => {
                let config = BulkpressConfig::load_with_custom_config(config_path)?;
                compress::execute(args, config, &output).await
            }
            Some(Commands::Plan(args)) => {
                let config = BulkpressConfig::load_with_custom_config(config_path)?;
                plan::execute(args, config, &output)
            }
            Some(Commands::Profile(args)) => profile::execute(args, &output),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
