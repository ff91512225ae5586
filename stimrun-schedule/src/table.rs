use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use stimrun_core::{Schedule, Trial};
use thiserror::Error;

/// Column names of the schedule table, in order.
pub const TABLE_HEADER: &str = "stimuli,onsets";

/// Number of data rows every valid table carries.
pub const TRIAL_ROWS: usize = 3;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule table not found: {}", path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("bad header {found:?}, expected \"stimuli,onsets\"")]
    BadHeader { found: String },
    #[error("line {line}: expected `label,onset`, got {found:?}")]
    BadRow { line: usize, found: String },
    #[error("line {line}: unparsable onset {value:?}")]
    BadOnset { line: usize, value: String },
    #[error("expected 3 trial rows, found {found}")]
    WrongRowCount { found: usize },
}

/// Table file name for a subject, e.g. `trials_subject-7.csv`.
pub fn schedule_filename(subject: u32) -> String {
    format!("trials_subject-{subject}.csv")
}

/// Writes the schedule as a header row plus one `label,onset` row per trial.
/// Returns the path written.
pub fn write_table(schedule: &Schedule, dir: &Path) -> Result<PathBuf, ScheduleError> {
    let path = dir.join(schedule_filename(schedule.subject));
    let mut out = String::with_capacity(64);
    out.push_str(TABLE_HEADER);
    out.push('\n');
    for trial in &schedule.trials {
        out.push_str(&trial.label);
        out.push(',');
        out.push_str(&format_onset(trial.onset_secs));
        out.push('\n');
    }
    fs::write(&path, out)?;
    Ok(path)
}

/// Reads and validates a subject's table back into a `Schedule`.
pub fn read_table(subject: u32, dir: &Path) -> Result<Schedule, ScheduleError> {
    let path = dir.join(schedule_filename(subject));
    let text = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ScheduleError::Missing { path: path.clone(), source }
        } else {
            ScheduleError::Io(source)
        }
    })?;
    parse_table(subject, &text)
}

fn parse_table(subject: u32, text: &str) -> Result<Schedule, ScheduleError> {
    let mut lines = text.lines().enumerate();

    let header = lines.next().map(|(_, l)| l).unwrap_or_default();
    if header != TABLE_HEADER {
        return Err(ScheduleError::BadHeader {
            found: header.to_owned(),
        });
    }

    let mut trials = Vec::with_capacity(TRIAL_ROWS);
    for (idx, row) in lines {
        if row.is_empty() {
            continue;
        }
        let line = idx + 1;
        let (label, onset) = row.rsplit_once(',').ok_or_else(|| ScheduleError::BadRow {
            line,
            found: row.to_owned(),
        })?;
        if label.is_empty() {
            return Err(ScheduleError::BadRow {
                line,
                found: row.to_owned(),
            });
        }
        let onset_secs: f64 = onset.trim().parse().map_err(|_| ScheduleError::BadOnset {
            line,
            value: onset.to_owned(),
        })?;
        trials.push(Trial::new(label, onset_secs));
    }

    if trials.len() != TRIAL_ROWS {
        return Err(ScheduleError::WrongRowCount {
            found: trials.len(),
        });
    }

    Ok(Schedule::new(subject, trials))
}

/// Keeps a decimal point on whole-second onsets so the table reads `4.0`,
/// matching the fixed constants.
fn format_onset(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
