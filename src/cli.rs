use clap::{ArgAction, Args, Parser, Subcommand};
use ffconv::engine::{AudioCodec, AutomationMode, Container, ImageFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffconv")]
#[command(about = "FFmpeg conversion planner with rule-checked options and reusable profiles", long_about = None)]
#[command(version)]
pub struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check if ffmpeg is installed
    CheckFfmpeg,

    /// Show the ffmpeg commands for the queued files without executing them
    Plan {
        #[command(flatten)]
        options: ConvOptions,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration summary
    Summary {
        #[command(flatten)]
        options: ConvOptions,
    },

    /// Measure peak levels and report which files need normalization
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Peak target in dB (defaults to the configured threshold)
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,

        #[command(flatten)]
        time: TimeOptions,
    },

    /// Save the current options as a named user profile
    SaveProfile {
        /// Profile name
        name: String,

        #[command(flatten)]
        options: ConvOptions,
    },

    /// List, show or remove saved profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Render a saved profile for one input file
    ApplyProfile {
        /// Profile name
        name: String,

        /// Input file, or a picture directory for slideshow profiles
        input: PathBuf,

        /// Output file (defaults to the input name with the profile's extension).
        /// Image and slideshow profiles take a destination directory instead.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Audio file for profiles that import an audio track
        #[arg(long)]
        audio: Option<PathBuf>,

        #[command(flatten)]
        time: TimeOptions,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// List saved profiles
    List,

    /// Print the command template of a profile
    Show { name: String },

    /// Delete a profile
    Remove { name: String },
}

/// Start offset and duration, as `HH:MM:SS[.mmm]`, `MM:SS` or seconds
#[derive(Args, Clone, Default)]
pub struct TimeOptions {
    /// Seek to this position before reading the input
    #[arg(long, value_name = "TIME")]
    pub start: Option<String>,

    /// Stop after this duration (per picture in slideshow mode)
    #[arg(long, value_name = "TIME")]
    pub duration: Option<String>,
}

/// Conversion options, applied in the order the option dialogs would be used
#[derive(Args, Clone, Default)]
pub struct ConvOptions {
    /// Files or directories to queue
    pub files: Vec<PathBuf>,

    /// Automation mode: standard, add-audio, extract-images, slideshow
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<AutomationMode>,

    /// Container and codec preset (mkv-h264, mp4-h264, webm, copy, ...)
    #[arg(short, long, value_parser = parse_container)]
    pub container: Option<Container>,

    /// Constant rate factor
    #[arg(long, conflicts_with = "bitrate")]
    pub crf: Option<u32>,

    /// Video bitrate in kbit/s (two-pass or non-x264 containers)
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Encode in two passes (not available for stream copy)
    #[arg(long)]
    pub two_pass: bool,

    /// x264 preset
    #[arg(long)]
    pub preset: Option<String>,

    /// x264 profile
    #[arg(long)]
    pub profile: Option<String>,

    /// x264 tune
    #[arg(long)]
    pub tune: Option<String>,

    /// Display aspect ratio, e.g. 16:9
    #[arg(long)]
    pub aspect: Option<String>,

    /// Output frame rate
    #[arg(long)]
    pub rate: Option<String>,

    /// Crop filter, e.g. crop=1280:720:0:0
    #[arg(long)]
    pub crop: Option<String>,

    /// Scale filter, e.g. scale=1280:-1
    #[arg(long)]
    pub scale: Option<String>,

    /// setdar filter
    #[arg(long)]
    pub setdar: Option<String>,

    /// setsar filter
    #[arg(long)]
    pub setsar: Option<String>,

    /// Rotation in degrees: 90, 180, 270 (or -90)
    #[arg(long, allow_hyphen_values = true)]
    pub rotate: Option<i32>,

    /// Deinterlace (default filter yadif)
    #[arg(long, num_args = 0..=1, default_missing_value = "yadif",
          conflicts_with = "interlace")]
    pub deinterlace: Option<String>,

    /// Interlace (default filter interlace)
    #[arg(long, num_args = 0..=1, default_missing_value = "interlace")]
    pub interlace: Option<String>,

    /// Denoise filter, e.g. hqdn3d
    #[arg(long, num_args = 0..=1, default_missing_value = "hqdn3d")]
    pub denoise: Option<String>,

    /// Audio codec (default, wav, flac, aac, alac, ac3, ogg, mp3, copy, silent)
    #[arg(long, value_parser = parse_audio_codec)]
    pub audio: Option<AudioCodec>,

    /// Audio bitrate, e.g. 192k
    #[arg(long)]
    pub audio_bitrate: Option<String>,

    /// Audio sample rate in Hz
    #[arg(long)]
    pub audio_rate: Option<u32>,

    /// Audio channel count
    #[arg(long)]
    pub audio_channels: Option<u32>,

    /// Bits per sample (16, 24, 32)
    #[arg(long)]
    pub audio_depth: Option<u32>,

    /// Import an audio file to replace the source audio
    #[arg(long, value_name = "FILE")]
    pub add_audio: Option<PathBuf>,

    /// Do not stop at the shortest stream
    #[arg(long)]
    pub no_shortest: bool,

    /// Image format for extracted images (jpg, png, bmp)
    #[arg(long, value_parser = parse_image_format)]
    pub images: Option<ImageFormat>,

    #[command(flatten)]
    pub time: TimeOptions,

    /// Normalize audio peaks (runs volumedetect on every queued file)
    #[arg(long)]
    pub normalize: bool,

    /// Normalization peak target in dB
    #[arg(long, allow_hyphen_values = true, requires = "normalize")]
    pub threshold: Option<f64>,

    /// Destination directory (defaults to each source's directory)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Allow existing outputs to be replaced
    #[arg(long)]
    pub overwrite: bool,
}

fn parse_mode(s: &str) -> Result<AutomationMode, String> {
    AutomationMode::from_id(s).ok_or_else(|| format!("unknown mode '{}'", s))
}

fn parse_container(s: &str) -> Result<Container, String> {
    Container::from_id(s).ok_or_else(|| {
        let ids: Vec<&str> = Container::ALL.iter().map(|c| c.id()).collect();
        format!("unknown container '{}' (expected one of: {})", s, ids.join(", "))
    })
}

fn parse_audio_codec(s: &str) -> Result<AudioCodec, String> {
    AudioCodec::from_id(s).ok_or_else(|| format!("unknown audio codec '{}'", s))
}

fn parse_image_format(s: &str) -> Result<ImageFormat, String> {
    ImageFormat::from_id(s).ok_or_else(|| format!("unknown image format '{}'", s))
}

pub fn parse() -> Cli {
    Cli::parse()
}
