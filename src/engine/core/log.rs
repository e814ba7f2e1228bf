use super::ffmpeg_cmd::CommandPlan;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append a synthesized plan to `<log_dir>/<plan.log_name>`, one command per
/// line under a timestamped header. Returns the log file path.
pub fn write_plan_log(log_dir: &Path, plan: &CommandPlan, binary: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(&plan.log_name);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(
        file,
        "[{}] plan {} ({:?}, {} file(s))",
        timestamp, plan.id, plan.kind, plan.file_count
    )?;
    writeln!(file, "{}", plan.format(binary)?)?;
    writeln!(file)?;
    Ok(log_path)
}
