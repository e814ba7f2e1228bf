use super::error::{ConvError, ConvResult};
use super::state::Normalization;
use super::types::{PeakLevel, TimingWindow};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Check that ffmpeg can be executed and return its version line
pub fn ffmpeg_version(binary: &str) -> Result<String> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .with_context(|| format!("Failed to execute {}. Is ffmpeg installed and in PATH?", binary))?;

    if !output.status.success() {
        anyhow::bail!("{} -version failed with status: {}", binary, output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Measures peak levels for normalization.
pub trait PeakAnalyzer {
    /// One result per source, in order. Any failure fails the whole batch.
    fn analyze(&self, sources: &[PathBuf], timing: Option<TimingWindow>)
    -> ConvResult<Vec<PeakLevel>>;
}

/// Runs ffmpeg's `volumedetect` filter on each source.
#[derive(Debug, Clone)]
pub struct VolumeDetect {
    pub binary: String,
}

impl VolumeDetect {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn detect(&self, source: &Path, timing: Option<TimingWindow>) -> ConvResult<PeakLevel> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-hide_banner").arg("-nostats");
        if let Some(window) = timing {
            cmd.args(window.args());
        }
        cmd.arg("-i")
            .arg(source)
            .args(["-vn", "-sn", "-dn", "-af", "volumedetect", "-f", "null", "-"]);
        debug!(source = %source.display(), "Running volumedetect");

        let output = cmd.output().map_err(|e| {
            ConvError::analysis(format!("failed to execute {}: {}", self.binary, e))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ConvError::analysis(format!(
                "{}: {}",
                source.display(),
                stderr.lines().last().unwrap_or("ffmpeg exited with an error")
            )));
        }
        parse_volumedetect(&stderr).map_err(|e| match e {
            ConvError::Analysis(msg) => {
                ConvError::analysis(format!("{}: {}", source.display(), msg))
            }
            other => other,
        })
    }
}

impl PeakAnalyzer for VolumeDetect {
    fn analyze(
        &self,
        sources: &[PathBuf],
        timing: Option<TimingWindow>,
    ) -> ConvResult<Vec<PeakLevel>> {
        sources.iter().map(|s| self.detect(s, timing)).collect()
    }
}

/// Pull `max_volume` and `mean_volume` out of ffmpeg's stderr
pub fn parse_volumedetect(stderr: &str) -> ConvResult<PeakLevel> {
    let find = |key: &str| -> Option<f64> {
        stderr.lines().find_map(|line| {
            let rest = &line[line.find(key)? + key.len()..];
            rest.trim().trim_end_matches("dB").trim().parse().ok()
        })
    };

    match (find("max_volume:"), find("mean_volume:")) {
        (Some(max_db), Some(mean_db)) => Ok(PeakLevel { max_db, mean_db }),
        _ => Err(ConvError::analysis("no volumedetect result in ffmpeg output")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationEntry {
    pub source: PathBuf,
    pub max_db: f64,
    pub mean_db: f64,
    /// `None` when the file already reaches the threshold
    pub gain_db: Option<f64>,
}

/// Per-file outcome of a peak analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationReport {
    pub threshold_db: f64,
    pub entries: Vec<NormalizationEntry>,
}

impl NormalizationReport {
    pub fn new(sources: &[PathBuf], peaks: &[PeakLevel], norm: &Normalization) -> Self {
        let entries = sources
            .iter()
            .zip(peaks)
            .map(|(source, peak)| NormalizationEntry {
                source: source.clone(),
                max_db: peak.max_db,
                mean_db: peak.mean_db,
                gain_db: norm.gain_for(peak.max_db),
            })
            .collect();
        Self {
            threshold_db: norm.threshold_db,
            entries,
        }
    }

    pub fn required_count(&self) -> usize {
        self.entries.iter().filter(|e| e.gain_db.is_some()).count()
    }

    pub fn verdict(&self) -> &'static str {
        match self.required_count() {
            0 => "Audio normalization is not required in relation to the set threshold",
            n if n == self.entries.len() => "Audio normalization will be applied",
            _ => "Audio normalization is required only for some files",
        }
    }
}
