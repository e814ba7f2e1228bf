use crate::cli::{Cli, Commands, ConvOptions, ProfileAction, TimeOptions};
use anyhow::{Context, Result, anyhow, bail};
use ffconv::config::Config;
use ffconv::engine::{
    self, AudioParam, AudioParamsResult, AutomationMode, CommandPlan, ConfigState, Event,
    FsInspector, Inspection, LacingResult, NormalizationReport, PeakAnalyzer, PlanKind, Profile,
    RenderPaths, ResizeResult, RotateResult, Synthesizer, TimingWindow, VolumeDetect, summary,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info, warn};

pub fn run(cli: Cli) {
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::CheckFfmpeg => handle_check_ffmpeg(&config),
        Commands::Plan { options, json } => handle_plan(&config, &options, json),
        Commands::Summary { options } => handle_summary(&config, &options),
        Commands::Analyze {
            files,
            threshold,
            time,
        } => handle_analyze(&config, &files, threshold, &time),
        Commands::SaveProfile { name, options } => handle_save_profile(&config, &name, &options),
        Commands::Profiles { action } => handle_profiles(&config, action),
        Commands::ApplyProfile {
            name,
            input,
            output,
            audio,
            time,
        } => handle_apply_profile(&config, &name, &input, output, audio, &time),
        Commands::InitConfig => handle_init_config(),
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn handle_check_ffmpeg(config: &Config) -> Result<()> {
    let version = engine::ffmpeg_version(&config.ffmpeg.binary)?;
    println!("✓ {}", version);
    Ok(())
}

fn handle_plan(config: &Config, options: &ConvOptions, json: bool) -> Result<()> {
    let timing = timing_window(&options.time)?;
    let (state, sources) = prepare(config, options, timing)?;

    let inspector = FsInspector::new(
        options.dest.clone(),
        options.overwrite || config.defaults.overwrite,
    );
    let Some(inspection) = engine::validate(&state, timing, &inspector, &sources)? else {
        println!("Cancelled");
        return Ok(());
    };

    let plan = Synthesizer::new(config.encoder_env())
        .with_timing(timing)
        .synthesize(&state, &inspection)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&PlanView::new(&plan, config)?)?);
    } else {
        print_plan(&plan, &config.ffmpeg.binary)?;
    }

    if let Some(log_dir) = &config.paths.log_dir {
        let log_path = engine::write_plan_log(log_dir, &plan, &config.ffmpeg.binary)?;
        debug!(path = %log_path.display(), "Plan logged");
    }
    Ok(())
}

fn handle_summary(config: &Config, options: &ConvOptions) -> Result<()> {
    let timing = timing_window(&options.time)?;
    let (state, sources) = prepare(config, options, timing)?;
    print!("{}", summary::render(&state, sources.len(), timing));
    Ok(())
}

fn handle_analyze(
    config: &Config,
    files: &[PathBuf],
    threshold: Option<f64>,
    time: &TimeOptions,
) -> Result<()> {
    let timing = timing_window(time)?;
    let sources = engine::collect_sources(files, false);
    if sources.is_empty() {
        bail!("No video files found");
    }

    let mut state = config.initial_state()?;
    state.apply(Event::NormalizeToggled(true))?;
    if let Some(db) = threshold {
        state.apply(Event::NormalizeThresholdChanged(db))?;
    }

    let analyzer = VolumeDetect::new(&config.ffmpeg.binary);
    let peaks = analyzer.analyze(&sources, timing)?;
    let report = NormalizationReport::new(&sources, &peaks, &state.normalization);

    println!("Threshold: {:.1} dB\n", report.threshold_db);
    for entry in &report.entries {
        let gain = entry
            .gain_db
            .map_or("-".to_string(), |g| format!("{:+.1} dB", g));
        println!(
            "{}  max {:.1} dB  mean {:.1} dB  gain {}",
            entry.source.display(),
            entry.max_db,
            entry.mean_db,
            gain
        );
    }
    println!("\n{}", report.verdict());
    Ok(())
}

fn handle_save_profile(config: &Config, name: &str, options: &ConvOptions) -> Result<()> {
    let timing = timing_window(&options.time)?;
    let state = build_state(config, options)?;
    let synth = Synthesizer::new(config.encoder_env()).with_timing(timing);

    let profile = Profile::from_state(name, &state, &synth)?;
    let store = config.profile_store()?;
    let replaced = store.add(profile)?;
    if replaced {
        println!("Profile '{}' replaced in {}", name, store.path().display());
    } else {
        println!("Profile '{}' saved to {}", name, store.path().display());
    }
    Ok(())
}

fn handle_profiles(config: &Config, action: ProfileAction) -> Result<()> {
    let store = config.profile_store()?;
    match action {
        ProfileAction::List => {
            let profiles = store.list()?;
            if profiles.is_empty() {
                println!("No profiles in {}", store.path().display());
            }
            for profile in profiles {
                println!(
                    "{}  (.{})",
                    profile.name,
                    profile.output_ext.as_deref().unwrap_or("same as source")
                );
            }
        }
        ProfileAction::Show { name } => {
            let profile = store
                .get(&name)?
                .ok_or_else(|| anyhow!("No profile named '{}'", name))?;
            println!("{}", profile.template);
        }
        ProfileAction::Remove { name } => {
            if !store.remove(&name)? {
                bail!("No profile named '{}'", name);
            }
            println!("Profile '{}' removed", name);
        }
    }
    Ok(())
}

fn handle_apply_profile(
    config: &Config,
    name: &str,
    input: &Path,
    output: Option<PathBuf>,
    audio: Option<PathBuf>,
    time: &TimeOptions,
) -> Result<()> {
    let store = config.profile_store()?;
    let profile = store
        .get(name)?
        .ok_or_else(|| anyhow!("No profile named '{}'", name))?;
    let timing = timing_window(time)?;

    // numbered outputs: `--output` names the destination directory
    if matches!(profile.kind, PlanKind::SaveImages | PlanKind::Slideshow) {
        let sources = match profile.kind {
            PlanKind::Slideshow => engine::collect_sources(&[input.to_path_buf()], true),
            _ => vec![input.to_path_buf()],
        };
        if sources.is_empty() {
            bail!("No pictures found in {}", input.display());
        }
        let inspection = Inspection::new(sources, output.as_deref());
        let plan = profile.plan(&inspection, audio, timing)?;
        return print_plan(&plan, &config.ffmpeg.binary);
    }

    let output = output.unwrap_or_else(|| {
        engine::derive_output_path(input, None, profile.output_ext.as_deref())
    });
    if output == input {
        bail!("Output would overwrite its source: {}", input.display());
    }
    let passlog = engine::two_pass_log_prefix(uuid::Uuid::new_v4());

    let mut paths = RenderPaths::new(input, &output);
    paths.audio = audio.as_deref();
    paths.passlog = Some(&passlog);
    paths.seek = timing;

    for args in profile.apply(&paths)? {
        println!("{}", engine::format_ffmpeg_cmd(&config.ffmpeg.binary, &args)?);
    }
    Ok(())
}

/// Directories to create, then every invocation, one per line
fn print_plan(plan: &CommandPlan, binary: &str) -> Result<()> {
    for dir in plan.dirs_to_create() {
        let dir = dir.to_string_lossy().into_owned();
        println!("{}", engine::format_ffmpeg_cmd("mkdir", &["-p".to_string(), dir])?);
    }
    println!("{}", plan.format(binary)?);
    Ok(())
}

fn handle_init_config() -> Result<()> {
    match Config::load() {
        Ok(cfg) => {
            match Config::config_path() {
                Ok(path) if path.exists() => {
                    println!("Config loaded successfully from {}", path.display())
                }
                Ok(path) => {
                    cfg.save()?;
                    println!("Default config saved to {}", path.display());
                }
                Err(e) => println!("Config loaded, but config path unknown: {:#}", e),
            }
            println!("{:#?}", cfg);
        }
        Err(e) => {
            println!("Config invalid: {:#}", e);
            println!("Fix or remove the file to regenerate defaults.");
        }
    }
    Ok(())
}

/// Option state plus the queued sources, with peaks measured when normalization is on
fn prepare(
    config: &Config,
    options: &ConvOptions,
    timing: Option<TimingWindow>,
) -> Result<(ConfigState, Vec<PathBuf>)> {
    let mut state = build_state(config, options)?;
    let sources = engine::collect_sources(
        &options.files,
        state.mode == AutomationMode::Slideshow,
    );
    info!(count = sources.len(), mode = state.mode.id(), "Files queued");

    if state.normalization_pending() && !sources.is_empty() {
        let analyzer = VolumeDetect::new(&config.ffmpeg.binary);
        match analyzer.analyze(&sources, timing) {
            Ok(peaks) => {
                let report = NormalizationReport::new(&sources, &peaks, &state.normalization);
                eprintln!("{}", report.verdict());
                state.apply(Event::PeakAnalysisCompleted(peaks))?;
            }
            Err(e) => {
                warn!(error = %e, "Peak analysis failed");
                state.apply(Event::PeakAnalysisFailed)?;
                return Err(e).context("Peak analysis failed");
            }
        }
    }
    Ok((state, sources))
}

/// Replays the command-line options as option events, in dialog order
pub fn build_state(config: &Config, options: &ConvOptions) -> Result<ConfigState> {
    let mut state = config.initial_state()?;
    for (flag, event) in option_events(config, options)? {
        state
            .apply(event)
            .with_context(|| format!("--{} rejected", flag))?;
    }
    Ok(state)
}

fn option_events(
    config: &Config,
    options: &ConvOptions,
) -> Result<Vec<(&'static str, Event)>> {
    let mut events = Vec::new();

    if let Some(mode) = options.mode {
        events.push(("mode", Event::AutomationModeSelected(mode)));
        if mode == AutomationMode::ExtractImages && options.images.is_none() {
            events.push(("mode", Event::ImageFormatSelected(config.image_format()?)));
        }
    }
    if let Some(container) = options.container {
        events.push(("container", Event::ContainerSelected(container)));
    }
    if let Some(format) = options.images {
        events.push(("images", Event::ImageFormatSelected(format)));
    }
    if let Some(audio) = &options.add_audio {
        events.push(("add-audio", Event::AudioImported(audio.clone())));
    }
    if options.no_shortest {
        events.push(("no-shortest", Event::ShortestToggled(false)));
    }
    if options.two_pass {
        events.push(("two-pass", Event::TwoPassToggled(true)));
    }
    if let Some(crf) = options.crf {
        events.push(("crf", Event::CrfChanged(crf)));
    }
    if let Some(kbps) = options.bitrate {
        events.push(("bitrate", Event::BitrateChanged(kbps)));
    }
    if options.preset.is_some() {
        events.push(("preset", Event::PresetSelected(options.preset.clone())));
    }
    if options.profile.is_some() {
        events.push(("profile", Event::ProfileSelected(options.profile.clone())));
    }
    if options.tune.is_some() {
        events.push(("tune", Event::TuneSelected(options.tune.clone())));
    }
    if options.aspect.is_some() {
        events.push(("aspect", Event::AspectSelected(options.aspect.clone())));
    }
    if options.rate.is_some() {
        events.push(("rate", Event::FrameRateSelected(options.rate.clone())));
    }

    if options.crop.is_some() {
        events.push(("crop", Event::Crop(options.crop.clone())));
    }
    if options.scale.is_some() || options.setdar.is_some() || options.setsar.is_some() {
        events.push((
            "scale",
            Event::Resize(ResizeResult {
                scale: options.scale.clone(),
                setdar: options.setdar.clone(),
                setsar: options.setsar.clone(),
            }),
        ));
    }
    if let Some(degrees) = options.rotate {
        events.push(("rotate", Event::Rotate(rotation(degrees)?)));
    }
    if let Some(filter) = &options.deinterlace {
        events.push(("deinterlace", Event::Lacing(LacingResult::Deinterlace(filter.clone()))));
    }
    if let Some(filter) = &options.interlace {
        events.push(("interlace", Event::Lacing(LacingResult::Interlace(filter.clone()))));
    }
    if options.denoise.is_some() {
        events.push(("denoise", Event::Denoise(options.denoise.clone())));
    }

    if let Some(codec) = options.audio {
        events.push(("audio", Event::AudioCodecSelected(codec)));
    }
    if let Some(params) = audio_params(options) {
        events.push(("audio-bitrate", Event::AudioParams(params)));
    }

    if options.normalize {
        events.push(("normalize", Event::NormalizeToggled(true)));
        if let Some(db) = options.threshold {
            events.push(("threshold", Event::NormalizeThresholdChanged(db)));
        }
    }
    Ok(events)
}

fn rotation(degrees: i32) -> Result<RotateResult> {
    let (filter, label) = match degrees.rem_euclid(360) {
        0 => (None, ""),
        90 => (Some("transpose=1"), "Rotate 90° clockwise"),
        180 => (Some("transpose=2,transpose=2"), "Rotate 180°"),
        270 => (Some("transpose=2"), "Rotate 90° counterclockwise"),
        _ => bail!("rotation must be a multiple of 90 degrees, got {}", degrees),
    };
    Ok(RotateResult {
        filter: filter.map(str::to_string),
        label: label.to_string(),
    })
}

/// PCM codecs take their depth through the codec name; others use `-sample_fmt`
fn audio_params(options: &ConvOptions) -> Option<AudioParamsResult> {
    let pcm = options.audio.is_some_and(|c| c.is_pcm());
    let params = AudioParamsResult {
        channel: options
            .audio_channels
            .map(|n| AudioParam::new(n.to_string(), format!("-ac {}", n))),
        rate: options
            .audio_rate
            .map(|hz| AudioParam::new(format!("{} Hz", hz), format!("-ar {}", hz))),
        bitrate: options
            .audio_bitrate
            .as_ref()
            .map(|b| AudioParam::new(b.clone(), format!("-b:a {}", b))),
        depth: options.audio_depth.map(|bits| {
            let arg = if pcm {
                format!("-c:a pcm_s{}le", bits)
            } else if bits <= 16 {
                "-sample_fmt s16".to_string()
            } else {
                "-sample_fmt s32".to_string()
            };
            AudioParam::new(format!("{} bit", bits), arg)
        }),
    };
    (params != AudioParamsResult::default()).then_some(params)
}

fn timing_window(time: &TimeOptions) -> Result<Option<TimingWindow>> {
    let start = time
        .start
        .as_deref()
        .map(engine::parse_clock)
        .transpose()?;
    let duration = time
        .duration
        .as_deref()
        .map(engine::parse_clock)
        .transpose()?;
    match (start, duration) {
        (None, None) => Ok(None),
        (start, Some(duration)) => Ok(Some(TimingWindow::new(start.unwrap_or(0), duration))),
        (Some(_), None) => bail!("--start needs --duration"),
    }
}

#[derive(Serialize)]
struct PlanView {
    id: String,
    kind: engine::PlanKind,
    file_count: usize,
    output_ext: Option<String>,
    dirs_to_create: Vec<PathBuf>,
    commands: Vec<Vec<String>>,
}

impl PlanView {
    fn new(plan: &CommandPlan, config: &Config) -> Result<Self> {
        let commands = plan
            .invocations()?
            .into_iter()
            .map(|args| {
                std::iter::once(config.ffmpeg.binary.clone())
                    .chain(args)
                    .collect()
            })
            .collect();
        Ok(Self {
            id: plan.id.to_string(),
            kind: plan.kind,
            file_count: plan.file_count,
            output_ext: plan.output_ext.clone(),
            dirs_to_create: plan.dirs_to_create(),
            commands,
        })
    }
}
