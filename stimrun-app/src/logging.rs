use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

/// Routes all tracing output to `log_subject-{id}.txt` in `dir`, truncating
/// any previous run's log. The returned guard must stay alive until exit so
/// the writer thread flushes.
pub fn init(subject: u32, dir: &Path) -> Result<WorkerGuard> {
    let path = dir.join(format!("log_subject-{subject}.txt"));
    let file = File::create(&path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Ok(guard)
}
