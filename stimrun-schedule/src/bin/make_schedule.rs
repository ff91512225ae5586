use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use stimrun_schedule::{generate, write_table};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate one subject's randomized trial schedule")]
struct Args {
    /// Subject id; also seeds the permutation.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    subject: u32,

    /// Directory the table is written into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let schedule = generate(args.subject);
    let order: Vec<&str> = schedule.labels().collect();
    let path = write_table(&schedule, &args.out_dir)
        .with_context(|| format!("cannot write schedule for subject {}", args.subject))?;

    info!(
        subject = args.subject,
        order = ?order,
        path = %path.display(),
        "schedule written"
    );

    Ok(())
}
