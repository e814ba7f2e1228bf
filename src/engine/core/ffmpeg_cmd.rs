use super::error::{ConvError, ConvResult};
use super::scan::{SuffixAllocator, base_name, derive_output_path};
use super::state::ConfigState;
use super::tables::{ImageFormat, SLIDESHOW_OUTPUT_FPS};
use super::types::{AutomationMode, Passing, TimingWindow};
use crate::engine::validate::{self, Inspection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;
use uuid::Uuid;

/// One argv entry of a pass. Paths and per-file values are placeholders
/// resolved at render time, so a pass never embeds a raw path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum Token {
    Arg(String),
    /// Primary media input
    Input,
    /// Imported audio track
    Audio,
    Output,
    /// Platform null sink for analysis passes
    Null,
    /// Two-pass statistics prefix
    PassLog,
    /// `-ss <start> -t <duration>` when a timing window is set
    Seek,
    /// `-af volume=<gain>dB` when the file needs normalization
    AudioFilter,
}

impl Token {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Arg(_) => None,
            Self::Input => Some("{input}"),
            Self::Audio => Some("{audio}"),
            Self::Output => Some("{output}"),
            Self::Null => Some("{null}"),
            Self::PassLog => Some("{passlog}"),
            Self::Seek => Some("{seek}"),
            Self::AudioFilter => Some("{afilter}"),
        }
    }

    fn from_word(word: String) -> Self {
        match word.as_str() {
            "{input}" => Self::Input,
            "{audio}" => Self::Audio,
            "{output}" => Self::Output,
            "{null}" => Self::Null,
            "{passlog}" => Self::PassLog,
            "{seek}" => Self::Seek,
            "{afilter}" => Self::AudioFilter,
            _ => Self::Arg(word),
        }
    }
}

/// Values substituted for placeholders when a pass is rendered.
#[derive(Debug, Clone, Copy)]
pub struct RenderPaths<'a> {
    pub input: &'a Path,
    pub audio: Option<&'a Path>,
    pub output: &'a Path,
    pub passlog: Option<&'a Path>,
    pub seek: Option<TimingWindow>,
    pub audio_filter: Option<&'a str>,
}

impl<'a> RenderPaths<'a> {
    pub fn new(input: &'a Path, output: &'a Path) -> Self {
        Self {
            input,
            audio: None,
            output,
            passlog: None,
            seek: None,
            audio_filter: None,
        }
    }
}

/// One ffmpeg invocation, without the binary name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    pub tokens: Vec<Token>,
}

impl Pass {
    pub fn render(&self, paths: &RenderPaths<'_>) -> ConvResult<Vec<String>> {
        let mut args = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match token {
                Token::Arg(a) => args.push(a.clone()),
                Token::Input => args.push(path_arg(paths.input)),
                Token::Output => args.push(path_arg(paths.output)),
                Token::Null => args.push(null_output_target().to_string()),
                Token::Audio => {
                    let audio = paths.audio.ok_or_else(|| {
                        ConvError::configuration("Command needs an imported audio track")
                    })?;
                    args.push(path_arg(audio));
                }
                Token::PassLog => {
                    let log = paths.passlog.ok_or_else(|| {
                        ConvError::configuration("Command needs a two-pass log prefix")
                    })?;
                    args.push(path_arg(log));
                }
                Token::Seek => {
                    if let Some(window) = paths.seek {
                        args.extend(window.args());
                    }
                }
                Token::AudioFilter => {
                    if let Some(filter) = paths.audio_filter {
                        args.push("-af".to_string());
                        args.push(filter.to_string());
                    }
                }
            }
        }
        Ok(args)
    }

    /// Space-joined template: arguments shell-quoted, placeholders bare
    pub fn to_template(&self) -> ConvResult<String> {
        let mut words = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match (token, token.placeholder()) {
                (_, Some(p)) => words.push(p.to_string()),
                (Token::Arg(a), None) => {
                    let quoted = shlex::try_quote(a).map_err(|e| {
                        ConvError::configuration(format!("Cannot quote argument '{}': {}", a, e))
                    })?;
                    words.push(quoted.into_owned());
                }
                (_, None) => {}
            }
        }
        Ok(words.join(" "))
    }

    pub fn from_template(template: &str) -> ConvResult<Self> {
        let words = shlex::split(template).ok_or_else(|| {
            ConvError::configuration(format!("Unbalanced quotes in template: {}", template))
        })?;
        Ok(Self::from_words(words))
    }

    pub(crate) fn from_words(words: Vec<String>) -> Self {
        Self {
            tokens: words.into_iter().map(Token::from_word).collect(),
        }
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Arg(a) if a == arg))
    }

    pub fn uses(&self, token: &Token) -> bool {
        self.tokens.contains(token)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Builder shared by every command grammar. Empty values are skipped so
/// optional slots never leave gaps in the argv.
#[derive(Debug, Default)]
pub struct CmdBuilder {
    tokens: Vec<Token>,
}

impl CmdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        let arg = arg.into();
        let trimmed = arg.trim();
        if !trimmed.is_empty() {
            self.tokens.push(Token::Arg(trimmed.to_string()));
        }
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for a in args {
            self.arg(a);
        }
        self
    }

    /// `flag value` when a value is present
    pub fn opt(&mut self, flag: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.arg(flag).arg(v);
        }
        self
    }

    pub fn token(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn build(&mut self) -> Pass {
        Pass {
            tokens: std::mem::take(&mut self.tokens),
        }
    }
}

fn null_output_target() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

pub fn two_pass_log_prefix(plan_id: Uuid) -> PathBuf {
    std::env::temp_dir()
        .join("ffconv_2pass")
        .join(plan_id.to_string())
        .join("ffmpeg2pass")
}

fn slideshow_staging_dir(plan_id: Uuid) -> PathBuf {
    std::env::temp_dir()
        .join("ffconv_slideshow")
        .join(plan_id.to_string())
}

/// Encoder settings that come from the application config rather than the
/// session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderEnv {
    pub loglevel: String,
    pub threads: Option<u32>,
    pub cpu_used: Option<i32>,
}

impl Default for EncoderEnv {
    fn default() -> Self {
        Self {
            loglevel: "error".to_string(),
            threads: None,
            cpu_used: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanKind {
    #[default]
    Normal,
    DoublePass,
    SaveImages,
    Slideshow,
}

impl PlanKind {
    pub fn for_state(state: &ConfigState) -> Self {
        match state.mode {
            AutomationMode::ExtractImages => Self::SaveImages,
            AutomationMode::Slideshow => Self::Slideshow,
            AutomationMode::Standard | AutomationMode::AddAudioTrack => match state.passing {
                Passing::Double => Self::DoublePass,
                Passing::Single => Self::Normal,
            },
        }
    }

    /// Reserved word separating passes in a saved template
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::DoublePass => Some("DOUBLE_PASS"),
            Self::Slideshow => Some("SLIDESHOW"),
            Self::Normal | Self::SaveImages => None,
        }
    }

    fn log_name(self) -> &'static str {
        match self {
            Self::Normal | Self::DoublePass => "ffconv_conversion.log",
            Self::SaveImages => "ffconv_images.log",
            Self::Slideshow => "ffconv_slideshow.log",
        }
    }
}

/// One queued source and where its result goes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanJob {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Directory the executor must create before running (image extraction)
    pub create_dir: Option<PathBuf>,
    pub audio_filter: Option<String>,
}

/// Everything the executor needs for one run.
#[derive(Debug, Clone, Serialize)]
pub struct CommandPlan {
    pub id: Uuid,
    pub kind: PlanKind,
    pub passes: Vec<Pass>,
    pub jobs: Vec<PlanJob>,
    pub audio: Option<PathBuf>,
    /// Final slideshow video; per-file outputs live in `jobs`
    pub output: Option<PathBuf>,
    /// Image sequence read by the second slideshow stage
    pub stage_input: Option<PathBuf>,
    pub output_ext: Option<String>,
    pub shortest: bool,
    pub log_name: String,
    pub file_count: usize,
    pub timing: Option<TimingWindow>,
    pub passlog: PathBuf,
}

impl CommandPlan {
    fn paths_for<'a>(&'a self, job: &'a PlanJob) -> RenderPaths<'a> {
        RenderPaths {
            input: &job.source,
            audio: self.audio.as_deref(),
            output: &job.output,
            passlog: Some(&self.passlog),
            seek: self.timing,
            audio_filter: job.audio_filter.as_deref(),
        }
    }

    /// Rendered argv lists in execution order
    pub fn invocations(&self) -> ConvResult<Vec<Vec<String>>> {
        let mut out = Vec::new();
        if self.kind == PlanKind::Slideshow {
            let (stage1, stage2) = match self.passes.as_slice() {
                [a, b] => (a, b),
                _ => {
                    return Err(ConvError::configuration(
                        "Slideshow plan needs exactly two stages",
                    ));
                }
            };
            for job in &self.jobs {
                out.push(stage1.render(&self.paths_for(job))?);
            }
            let input = self.stage_input.as_deref().unwrap_or(Path::new(""));
            let output = self.output.as_deref().unwrap_or(Path::new(""));
            let mut paths = RenderPaths::new(input, output);
            paths.audio = self.audio.as_deref();
            out.push(stage2.render(&paths)?);
            return Ok(out);
        }

        for job in &self.jobs {
            let paths = self.paths_for(job);
            for pass in &self.passes {
                out.push(pass.render(&paths)?);
            }
        }
        Ok(out)
    }

    /// Directories the executor creates before the first invocation
    pub fn dirs_to_create(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .jobs
            .iter()
            .filter_map(|j| j.create_dir.clone())
            .collect();
        if let Some(stage) = self.stage_input.as_ref().and_then(|p| p.parent()) {
            dirs.push(stage.to_path_buf());
        }
        if self.kind == PlanKind::DoublePass {
            if let Some(parent) = self.passlog.parent() {
                dirs.push(parent.to_path_buf());
            }
        }
        dirs
    }

    pub fn to_commands(&self, binary: &str) -> ConvResult<Vec<Command>> {
        Ok(self
            .invocations()?
            .into_iter()
            .map(|args| {
                let mut cmd = Command::new(binary);
                cmd.args(args);
                cmd
            })
            .collect())
    }

    /// Shell-safe text of the whole plan, one invocation per line
    pub fn format(&self, binary: &str) -> ConvResult<String> {
        let lines = self
            .invocations()?
            .into_iter()
            .map(|args| format_ffmpeg_cmd(binary, &args))
            .collect::<ConvResult<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }
}

/// Format one invocation as a shell-safe string for display
pub fn format_ffmpeg_cmd(binary: &str, args: &[String]) -> ConvResult<String> {
    let words = std::iter::once(binary).chain(args.iter().map(String::as_str));
    shlex::try_join(words)
        .map_err(|e| ConvError::configuration(format!("Cannot quote command: {}", e)))
}

/// What a plan needs besides the files: passes and the per-run values that
/// decide output names.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub kind: PlanKind,
    pub passes: Vec<Pass>,
    /// Video extension, or the image extension for image extraction
    pub output_ext: Option<String>,
    /// Normalization filter per queued file
    pub offsets: Vec<Option<String>>,
    pub audio: Option<PathBuf>,
    pub shortest: bool,
}

/// Turns a normalized [`ConfigState`] into passes and plans.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    pub env: EncoderEnv,
    pub timing: Option<TimingWindow>,
}

impl Synthesizer {
    pub fn new(env: EncoderEnv) -> Self {
        Self { env, timing: None }
    }

    pub fn with_timing(mut self, timing: Option<TimingWindow>) -> Self {
        self.timing = timing;
        self
    }

    /// Placeholder passes for the state's mode, no filesystem access
    pub fn passes(&self, state: &ConfigState) -> ConvResult<Vec<Pass>> {
        let passes = match PlanKind::for_state(state) {
            PlanKind::Normal if state.is_copy() => vec![self.copy_pass(state)],
            PlanKind::Normal => vec![self.encode_pass(state, None)],
            PlanKind::DoublePass => vec![self.analysis_pass(state), self.encode_pass(state, Some(2))],
            PlanKind::SaveImages => vec![self.images_pass(state)],
            PlanKind::Slideshow => {
                let window = self.timing.filter(|t| t.duration_ms > 0).ok_or_else(|| {
                    ConvError::configuration("Slideshow needs a duration per picture")
                })?;
                vec![self.slideshow_stage(state), self.slideshow_video(state, window)]
            }
        };
        Ok(passes)
    }

    /// Run the state gates, then bind passes to the inspected files.
    pub fn synthesize(&self, state: &ConfigState, inspection: &Inspection) -> ConvResult<CommandPlan> {
        validate::check_state(state, self.timing)?;

        let kind = PlanKind::for_state(state);
        let passes = self.passes(state)?;

        let offsets = state.normalization.offsets();
        if state.normalization.enabled && offsets.len() != inspection.count() {
            return Err(ConvError::configuration(format!(
                "Peak analysis covers {} file(s) but {} are queued",
                offsets.len(),
                inspection.count()
            )));
        }

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
        let binding = Binding {
            kind,
            passes,
            output_ext,
            offsets,
            audio: state.imported_audio.clone(),
            shortest: state.shortest,
        };
        self.bind(binding, inspection)
    }

    /// Attach passes to the inspected files: per-file outputs, numbered
    /// image directories or the slideshow staging area.
    pub(crate) fn bind(&self, binding: Binding, inspection: &Inspection) -> ConvResult<CommandPlan> {
        if inspection.sources.is_empty() {
            return Err(ConvError::configuration("No files queued"));
        }
        let Binding {
            kind,
            passes,
            output_ext,
            offsets,
            audio,
            shortest,
        } = binding;

        let id = Uuid::new_v4();
        let mut alloc = SuffixAllocator::new();
        let mut jobs = Vec::with_capacity(inspection.count());
        let mut output = None;
        let mut stage_input = None;

        match kind {
            PlanKind::Normal | PlanKind::DoublePass => {
                let mut claimed = HashSet::new();
                for (i, (source, dest)) in inspection.pairs().enumerate() {
                    let target = derive_output_path(source, Some(dest), output_ext.as_deref());
                    if !claimed.insert(target.clone()) {
                        return Err(ConvError::validation(
                            format!("Two queued files would write {}", target.display()),
                            target,
                        ));
                    }
                    jobs.push(PlanJob {
                        source: source.clone(),
                        output: target,
                        create_dir: None,
                        audio_filter: offsets.get(i).cloned().flatten(),
                    });
                }
            }
            PlanKind::SaveImages => {
                let ext = output_ext
                    .as_deref()
                    .unwrap_or(ImageFormat::default().extension());
                for (source, dest) in inspection.pairs() {
                    let base = base_name(source);
                    let n = alloc.next(dest, &format!("{}-IMAGES_", base))?;
                    let dir = dest.join(format!("{}-IMAGES_{}", base, n));
                    jobs.push(PlanJob {
                        source: source.clone(),
                        output: dir.join(format!("{}-%d.{}", base, ext)),
                        create_dir: Some(dir),
                        audio_filter: None,
                    });
                }
            }
            PlanKind::Slideshow => {
                let staging = slideshow_staging_dir(id);
                for (i, source) in inspection.sources.iter().enumerate() {
                    jobs.push(PlanJob {
                        source: source.clone(),
                        output: staging.join(format!("{:04}.png", i + 1)),
                        create_dir: None,
                        audio_filter: None,
                    });
                }
                stage_input = Some(staging.join("%04d.png"));

                let dest = inspection.destination();
                let ext = output_ext.as_deref().unwrap_or("mp4");
                let n = alloc.next(dest, "Slideshow_")?;
                output = Some(dest.join(format!("Slideshow_{}.{}", n, ext)));
            }
        }

        let plan = CommandPlan {
            id,
            kind,
            passes,
            jobs,
            audio,
            output,
            stage_input,
            output_ext,
            shortest,
            log_name: kind.log_name().to_string(),
            file_count: inspection.count(),
            timing: self.timing,
            passlog: two_pass_log_prefix(id),
        };
        info!(
            id = %plan.id,
            kind = ?plan.kind,
            files = plan.file_count,
            "Synthesized command plan"
        );
        Ok(plan)
    }

    // ------------------------------------------------------------------
    // Grammar pieces
    // ------------------------------------------------------------------

    fn head(&self, b: &mut CmdBuilder, state: &ConfigState) {
        b.token(Token::Seek).arg("-i").token(Token::Input);
        if state.imported_audio.is_some() {
            b.arg("-i").token(Token::Audio);
        }
        b.arg("-loglevel").arg(&self.env.loglevel);
    }

    fn tail(&self, b: &mut CmdBuilder) {
        if let Some(t) = self.env.threads {
            b.arg("-threads").arg(t.to_string());
        }
        if let Some(c) = self.env.cpu_used {
            b.arg("-cpu-used").arg(c.to_string());
        }
    }

    fn video_codec(b: &mut CmdBuilder, state: &ConfigState) {
        b.arg("-c:v").arg(&state.video_codec);
        b.opt("-vtag", state.video_tag.as_deref());
    }

    fn x264_options(b: &mut CmdBuilder, state: &ConfigState) {
        b.opt("-preset", state.preset.as_deref())
            .opt("-profile:v", state.profile.as_deref())
            .opt("-tune", state.tune.as_deref());
    }

    fn picture(b: &mut CmdBuilder, state: &ConfigState) {
        b.opt("-aspect", state.aspect.as_deref())
            .opt("-r", state.frame_rate.as_deref());
    }

    fn filters(b: &mut CmdBuilder, state: &ConfigState) {
        let graph = state.compose();
        if !graph.is_empty() {
            b.arg("-vf").arg(graph);
        }
    }

    fn audio(b: &mut CmdBuilder, state: &ConfigState) {
        b.args(state.audio.codec_args())
            .args(state.audio.param_args());
    }

    fn stream_map(b: &mut CmdBuilder, state: &ConfigState) {
        b.args(state.map.args().iter().copied());
        if state.shortest && state.imported_audio.is_some() {
            b.arg("-shortest");
        }
    }

    fn copy_pass(&self, state: &ConfigState) -> Pass {
        let mut b = CmdBuilder::new();
        self.head(&mut b, state);
        if state.normalization.enabled {
            b.token(Token::AudioFilter);
        }
        b.arg("-c:v").arg("copy");
        Self::picture(&mut b, state);
        Self::audio(&mut b, state);
        self.tail(&mut b);
        Self::stream_map(&mut b, state);
        b.arg("-y").token(Token::Output);
        b.build()
    }

    /// Standard encode; `Some(2)` makes it the second pass of a two-pass run
    fn encode_pass(&self, state: &ConfigState, pass: Option<u32>) -> Pass {
        let mut b = CmdBuilder::new();
        self.head(&mut b, state);
        if state.normalization.enabled {
            b.token(Token::AudioFilter);
        }
        Self::video_codec(&mut b, state);
        b.args(state.quality.args());
        Self::x264_options(&mut b, state);
        Self::picture(&mut b, state);
        Self::filters(&mut b, state);
        b.opt("-pix_fmt", state.pix_fmt.as_deref());
        Self::audio(&mut b, state);
        self.tail(&mut b);
        if let Some(n) = pass {
            b.arg("-pass").arg(n.to_string()).arg("-passlogfile").token(Token::PassLog);
        }
        Self::stream_map(&mut b, state);
        b.arg("-y").token(Token::Output);
        b.build()
    }

    /// First pass: video statistics only, written to the null sink
    fn analysis_pass(&self, state: &ConfigState) -> Pass {
        let mut b = CmdBuilder::new();
        b.token(Token::Seek).arg("-i").token(Token::Input);
        b.arg("-loglevel").arg(&self.env.loglevel).arg("-an");
        Self::video_codec(&mut b, state);
        b.args(state.quality.args());
        Self::x264_options(&mut b, state);
        Self::picture(&mut b, state);
        Self::filters(&mut b, state);
        b.opt("-pix_fmt", state.pix_fmt.as_deref());
        self.tail(&mut b);
        b.arg("-pass").arg("1").arg("-passlogfile").token(Token::PassLog);
        b.arg("-f").arg("rawvideo").arg("-y").token(Token::Null);
        b.build()
    }

    fn images_pass(&self, state: &ConfigState) -> Pass {
        let format = state.image_format.unwrap_or(ImageFormat::default());
        let mut b = CmdBuilder::new();
        b.token(Token::Seek).arg("-i").token(Token::Input);
        b.arg("-loglevel").arg(&self.env.loglevel).arg("-an");
        b.opt("-r", state.frame_rate.as_deref());
        Self::filters(&mut b, state);
        b.arg("-pix_fmt").arg(format.pix_fmt());
        self.tail(&mut b);
        b.arg("-y").token(Token::Output);
        b.build()
    }

    /// Stage 1: normalize each picture (resize etc.) into the staging sequence
    fn slideshow_stage(&self, state: &ConfigState) -> Pass {
        let mut b = CmdBuilder::new();
        b.arg("-i").token(Token::Input);
        b.arg("-loglevel").arg(&self.env.loglevel);
        Self::filters(&mut b, state);
        b.arg("-y").token(Token::Output);
        b.build()
    }

    /// Stage 2: one picture every `window.duration` seconds
    fn slideshow_video(&self, state: &ConfigState, window: TimingWindow) -> Pass {
        let mut b = CmdBuilder::new();
        b.arg("-loglevel").arg(&self.env.loglevel);
        b.arg("-framerate").arg(format!("1/{}", window.duration_secs()));
        b.arg("-i").token(Token::Input);
        if state.imported_audio.is_some() {
            b.arg("-i").token(Token::Audio);
        }
        b.arg("-c:v").arg("libx264");
        b.args(state.quality.args());
        Self::x264_options(&mut b, state);
        b.arg("-vf")
            .arg(format!("fps={},format=yuv420p", SLIDESHOW_OUTPUT_FPS));
        Self::audio(&mut b, state);
        self.tail(&mut b);
        Self::stream_map(&mut b, state);
        b.arg("-y").token(Token::Output);
        b.build()
    }
}
