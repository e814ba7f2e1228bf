use super::error::{ConvError, ConvResult};
use super::ffmpeg_cmd::{Binding, CommandPlan, Pass, PlanKind, RenderPaths, Synthesizer};
use super::state::ConfigState;
use super::types::TimingWindow;
use crate::engine::validate::Inspection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Group every saved profile belongs to
pub const USER_GROUP: &str = "User Profiles";

const STORE_FILE: &str = "user_profiles.json";

/// A reusable, path-agnostic command template.
///
/// `template` holds every pass of the plan, shell-quoted, with placeholders
/// (`{input}`, `{output}`, ...) where paths go. Multi-pass plans put a marker
/// word between passes: `DOUBLE_PASS` for two-pass encodes, `SLIDESHOW` for
/// slideshow stages. Only the marker of the profile's own `kind` splits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub kind: PlanKind,
    /// `None` keeps the source extension (stream copy)
    #[serde(default)]
    pub output_ext: Option<String>,
}

impl Profile {
    pub fn from_plan(name: &str, plan: &CommandPlan) -> ConvResult<Self> {
        Self::from_passes(name, plan.kind, &plan.passes, plan.output_ext.clone())
    }

    /// Profile from the current state without touching the filesystem.
    /// Per-file normalization gain is not stored, only its slot.
    pub fn from_state(name: &str, state: &ConfigState, synth: &Synthesizer) -> ConvResult<Self> {
        let kind = PlanKind::for_state(state);
        let passes = synth.passes(state)?;
        let output_ext = match kind {
            PlanKind::SaveImages => Some(
                state
                    .image_format
                    .unwrap_or_default()
                    .extension()
                    .to_string(),
            ),
            _ => state.output_ext.clone(),
        };
        Self::from_passes(name, kind, &passes, output_ext)
    }

    fn from_passes(
        name: &str,
        kind: PlanKind,
        passes: &[Pass],
        output_ext: Option<String>,
    ) -> ConvResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConvError::configuration("Profile name cannot be empty"));
        }

        let templates = passes
            .iter()
            .map(Pass::to_template)
            .collect::<ConvResult<Vec<_>>>()?;
        let separator = match kind.marker() {
            Some(marker) => format!(" {} ", marker),
            None => " ".to_string(),
        };
        // words are already single-spaced; quoted arguments keep their inner spacing
        let template = templates.join(&separator);

        Ok(Self {
            name: name.to_string(),
            template,
            kind,
            output_ext,
        })
    }

    /// Parse the template back into passes
    pub fn passes(&self) -> ConvResult<Vec<Pass>> {
        let words = shlex::split(&self.template).ok_or_else(|| {
            ConvError::configuration(format!(
                "Profile '{}' has unbalanced quotes in its template",
                self.name
            ))
        })?;

        let Some(marker) = self.kind.marker() else {
            return Ok(vec![Pass::from_words(words)]);
        };

        let mut passes = Vec::new();
        let mut current = Vec::new();
        for word in words {
            if word == marker {
                passes.push(Pass::from_words(std::mem::take(&mut current)));
            } else {
                current.push(word);
            }
        }
        passes.push(Pass::from_words(current));
        if passes.len() != 2 {
            return Err(ConvError::configuration(format!(
                "Profile '{}' should have 2 passes separated by {}, found {}",
                self.name,
                marker,
                passes.len()
            )));
        }
        Ok(passes)
    }

    /// Render every pass for one input and one output file.
    /// Image and slideshow profiles write numbered outputs; use [`Profile::plan`].
    pub fn apply(&self, paths: &RenderPaths<'_>) -> ConvResult<Vec<Vec<String>>> {
        if matches!(self.kind, PlanKind::SaveImages | PlanKind::Slideshow) {
            return Err(ConvError::configuration(format!(
                "Profile '{}' writes numbered outputs and must be planned against its files",
                self.name
            )));
        }
        self.passes()?.iter().map(|p| p.render(paths)).collect()
    }

    /// Bind the profile to inspected files the way a fresh plan would:
    /// numbered image directories, slideshow staging and per-file outputs.
    pub fn plan(
        &self,
        inspection: &Inspection,
        audio: Option<PathBuf>,
        timing: Option<TimingWindow>,
    ) -> ConvResult<CommandPlan> {
        let passes = self.passes()?;
        let shortest = passes.iter().any(|p| p.has_arg("-shortest"));
        let binding = Binding {
            kind: self.kind,
            passes,
            output_ext: self.output_ext.clone(),
            offsets: Vec::new(),
            audio,
            shortest,
        };
        Synthesizer::default().with_timing(timing).bind(binding, inspection)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileGroup {
    group: String,
    profiles: Vec<Profile>,
}

impl Default for ProfileGroup {
    fn default() -> Self {
        Self {
            group: USER_GROUP.to_string(),
            profiles: Vec::new(),
        }
    }
}

/// JSON file holding the `User Profiles` group.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the store, so a failed write never leaves a truncated store behind.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE),
        }
    }

    /// `~/.config/ffconv/profiles` on Linux, platform equivalent elsewhere
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ffconv").join("profiles"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> ConvResult<Vec<Profile>> {
        Ok(self.read_group()?.profiles)
    }

    pub fn get(&self, name: &str) -> ConvResult<Option<Profile>> {
        Ok(self
            .read_group()?
            .profiles
            .into_iter()
            .find(|p| p.name == name))
    }

    /// Insert or replace by name. Returns true when an existing profile was replaced.
    pub fn add(&self, profile: Profile) -> ConvResult<bool> {
        let mut group = self.read_group()?;
        let replaced = match group.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => {
                *existing = profile.clone();
                true
            }
            None => {
                group.profiles.push(profile.clone());
                false
            }
        };
        self.write_group(&group)?;
        info!(name = %profile.name, replaced, "Saved profile");
        Ok(replaced)
    }

    /// Returns false when no profile has that name
    pub fn remove(&self, name: &str) -> ConvResult<bool> {
        let mut group = self.read_group()?;
        let before = group.profiles.len();
        group.profiles.retain(|p| p.name != name);
        if group.profiles.len() == before {
            return Ok(false);
        }
        self.write_group(&group)?;
        info!(name, "Removed profile");
        Ok(true)
    }

    fn read_group(&self) -> ConvResult<ProfileGroup> {
        if !self.path.exists() {
            return Ok(ProfileGroup::default());
        }
        let json =
            fs::read_to_string(&self.path).map_err(|e| ConvError::persistence(e, &self.path))?;
        let group: ProfileGroup =
            serde_json::from_str(&json).map_err(|e| ConvError::persistence(e, &self.path))?;
        if group.group != USER_GROUP {
            return Err(ConvError::persistence(
                format!("unexpected profile group '{}'", group.group),
                &self.path,
            ));
        }
        Ok(group)
    }

    fn write_group(&self, group: &ProfileGroup) -> ConvResult<()> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| ConvError::persistence(e, dir))?;

        let json =
            serde_json::to_string_pretty(group).map_err(|e| ConvError::persistence(e, &self.path))?;
        let tmp = dir.join(format!(".{}.{}.tmp", STORE_FILE, Uuid::new_v4()));
        debug!(tmp = %tmp.display(), "Writing profile store");

        let written = fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(json.as_bytes())?;
                f.sync_all()
            })
            .and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(ConvError::persistence(e, &self.path));
        }
        Ok(())
    }
}
