//! Run-time gates checked before a plan is built, and the file collaborator
//! that vets sources and destinations.

use crate::engine::core::{
    AutomationMode, ConfigState, ConvError, ConvResult, TimingWindow, derive_output_path,
    source_dir,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// State-only gates. Fail-closed: the first unmet condition is returned.
pub fn check_state(state: &ConfigState, timing: Option<TimingWindow>) -> ConvResult<()> {
    if state.normalization_pending() {
        return Err(ConvError::configuration(
            "Audio normalization is enabled but the peak levels have not been analyzed",
        ));
    }
    match state.mode {
        AutomationMode::AddAudioTrack if state.imported_audio.is_none() => {
            Err(ConvError::configuration("No audio track imported"))
        }
        AutomationMode::Slideshow if timing.is_none_or(|t| t.duration_ms == 0) => {
            Err(ConvError::configuration(
                "Slideshow needs a duration per picture (set a timing window)",
            ))
        }
        _ => Ok(()),
    }
}

/// All gates in order: state checks first, then the file inspector.
/// `Ok(None)` means the inspector was cancelled and nothing should run.
pub fn validate(
    state: &ConfigState,
    timing: Option<TimingWindow>,
    inspector: &dyn FileInspector,
    sources: &[PathBuf],
) -> ConvResult<Option<Inspection>> {
    check_state(state, timing)?;
    inspector.inspect(state, sources)
}

/// Files accepted for a run, each paired with its destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub sources: Vec<PathBuf>,
    pub destinations: Vec<PathBuf>,
}

impl Inspection {
    /// Every source goes to `dest`, or next to itself when `dest` is `None`
    pub fn new(sources: Vec<PathBuf>, dest: Option<&Path>) -> Self {
        let destinations = sources
            .iter()
            .map(|s| dest.map(Path::to_path_buf).unwrap_or_else(|| source_dir(s)))
            .collect();
        Self {
            sources,
            destinations,
        }
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&PathBuf, &PathBuf)> {
        self.sources.iter().zip(&self.destinations)
    }

    /// Destination of the first source; single-output modes write there
    pub fn destination(&self) -> &Path {
        self.destinations
            .first()
            .map(PathBuf::as_path)
            .unwrap_or(Path::new("."))
    }
}

/// Vets queued files before synthesis. `Ok(None)` means the user cancelled.
pub trait FileInspector {
    fn inspect(&self, state: &ConfigState, sources: &[PathBuf]) -> ConvResult<Option<Inspection>>;
}

/// Filesystem checks without prompting: missing sources, a missing
/// destination directory and (unless `overwrite`) existing outputs are errors.
#[derive(Debug, Clone, Default)]
pub struct FsInspector {
    pub dest: Option<PathBuf>,
    pub overwrite: bool,
}

impl FsInspector {
    pub fn new(dest: Option<PathBuf>, overwrite: bool) -> Self {
        Self { dest, overwrite }
    }
}

impl FileInspector for FsInspector {
    fn inspect(&self, state: &ConfigState, sources: &[PathBuf]) -> ConvResult<Option<Inspection>> {
        if sources.is_empty() {
            return Err(ConvError::configuration("No files queued"));
        }
        for source in sources {
            if !source.is_file() {
                return Err(ConvError::validation(
                    format!("Source file not found: {}", source.display()),
                    source,
                ));
            }
        }

        let inspection = Inspection::new(sources.to_vec(), self.dest.as_deref());
        for dest in &inspection.destinations {
            if !dest.is_dir() {
                return Err(ConvError::validation(
                    format!("Destination directory not found: {}", dest.display()),
                    dest,
                ));
            }
        }

        // Image and slideshow outputs are numbered, so they never collide
        if matches!(
            state.mode,
            AutomationMode::Standard | AutomationMode::AddAudioTrack
        ) {
            let mut claimed = HashSet::new();
            for (source, dest) in inspection.pairs() {
                let output = derive_output_path(source, Some(dest), state.output_ext.as_deref());
                if !claimed.insert(output.clone()) {
                    return Err(ConvError::validation(
                        format!("Two queued files would write {}", output.display()),
                        output,
                    ));
                }
                if output == *source {
                    return Err(ConvError::validation(
                        format!("Output would overwrite its source: {}", source.display()),
                        source,
                    ));
                }
                if !self.overwrite && output.exists() {
                    return Err(ConvError::validation(
                        format!("Output already exists: {}", output.display()),
                        output,
                    ));
                }
            }
        }

        Ok(Some(inspection))
    }
}
