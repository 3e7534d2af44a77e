use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::Output;
use system_profile::SystemProfile;

#[derive(Args)]
pub struct ProfileArgs {
    /// Probe the storage holding this directory instead of the temp dir
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Print the profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ProfileArgs, output: &Output) -> Result<()> {
    let profile = match &args.dir {
        Some(dir) => SystemProfile::detect_in(dir),
        None => SystemProfile::get().as_ref().clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    output.header("System profile");
    for line in profile.summary().lines() {
        output.list_item(line);
    }
    for failure in &profile.degraded {
        output.warning(&failure.to_string());
    }

    Ok(())
}
