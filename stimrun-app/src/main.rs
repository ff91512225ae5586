use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

mod app;
mod logging;

use app::App;
use stimrun_run::RunConfig;
use stimrun_schedule::read_table;

#[derive(Parser, Debug)]
#[command(author, version, about = "Present a subject's trial schedule fullscreen")]
struct Args {
    /// Subject id; locates both the trial table and the log file.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    subject: u32,

    /// Monitor index for the fullscreen window.
    #[arg(long, default_value_t = 1)]
    screen: usize,

    /// Directory holding the trial table; the log file is written next to it.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = logging::init(args.subject, &args.data_dir)?;
    info!(subject = args.subject, "presentation run starting");

    // The schedule is validated before any display resource exists, so a
    // missing or malformed table never opens a window.
    let schedule = read_table(args.subject, &args.data_dir)
        .with_context(|| format!("cannot load schedule for subject {}", args.subject))?;
    let order: Vec<&str> = schedule.labels().collect();
    info!(trials = schedule.len(), ?order, "schedule loaded");

    let config = RunConfig {
        screen: args.screen,
        ..RunConfig::default()
    };

    App::new(config, schedule).run()
}
