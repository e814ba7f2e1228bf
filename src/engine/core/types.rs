use super::error::{ConvError, ConvResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// End-to-end pipeline variant. Each one has its own command grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationMode {
    #[default]
    Standard,
    /// Standard conversion muxed with an imported audio file
    AddAudioTrack,
    ExtractImages,
    Slideshow,
}

impl AutomationMode {
    pub fn id(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::AddAudioTrack => "add-audio",
            Self::ExtractImages => "extract-images",
            Self::Slideshow => "slideshow",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "Default",
            Self::AddAudioTrack => "Add audio stream to a movie",
            Self::ExtractImages => "Video to images converter",
            Self::Slideshow => "Picture slideshow maker",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "standard" | "default" => Some(Self::Standard),
            "add-audio" | "add-audio-track" => Some(Self::AddAudioTrack),
            "extract-images" | "images" => Some(Self::ExtractImages),
            "slideshow" => Some(Self::Slideshow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Passing {
    #[default]
    Single,
    Double,
}

impl fmt::Display for Passing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Double => write!(f, "double"),
        }
    }
}

/// Active rate-control mode. Exactly one is in effect at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Crf(u32),
    /// kbit/s
    Bitrate(u32),
    Copy,
}

impl Quality {
    pub fn args(self) -> Vec<String> {
        match self {
            Self::Crf(crf) => vec!["-crf".to_string(), crf.to_string()],
            Self::Bitrate(kbps) => vec!["-b:v".to_string(), format!("{}k", kbps)],
            Self::Copy => Vec::new(),
        }
    }

    pub fn crf(self) -> Option<u32> {
        match self {
            Self::Crf(v) => Some(v),
            _ => None,
        }
    }

    pub fn bitrate(self) -> Option<u32> {
        match self {
            Self::Bitrate(v) => Some(v),
            _ => None,
        }
    }
}

/// Stream selection (`-map`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamMap {
    #[default]
    All,
    /// Video from the primary input, audio from the imported track
    VideoWithImportedAudio,
}

impl StreamMap {
    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::All => &["-map", "0"],
            Self::VideoWithImportedAudio => &["-map", "0:v:0", "-map", "1:a:0"],
        }
    }
}

/// One audio parameter as returned by the audio settings dialog:
/// a display label and the argument fragment (e.g. `-b:a 192k`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioParam {
    pub label: String,
    pub arg: String,
}

impl AudioParam {
    pub fn new(label: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            arg: arg.into(),
        }
    }
}

/// Optional seek/duration selection from the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingWindow {
    pub start_offset_ms: u64,
    pub duration_ms: u64,
}

impl TimingWindow {
    pub fn new(start_offset_ms: u64, duration_ms: u64) -> Self {
        Self {
            start_offset_ms,
            duration_ms,
        }
    }

    /// `-ss <start> -t <duration>`, placed before the primary input
    pub fn args(&self) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format_clock(self.start_offset_ms),
            "-t".to_string(),
            format_clock(self.duration_ms),
        ]
    }

    /// Duration in seconds without trailing zeros ("5", "2.5")
    pub fn duration_secs(&self) -> String {
        let secs = self.duration_ms / 1000;
        let millis = self.duration_ms % 1000;
        if millis == 0 {
            secs.to_string()
        } else {
            format!("{}.{:03}", secs, millis)
                .trim_end_matches('0')
                .to_string()
        }
    }
}

/// Format milliseconds as `HH:MM:SS.mmm`
pub fn format_clock(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Parse `HH:MM:SS[.mmm]`, `MM:SS[.mmm]` or plain seconds into milliseconds
pub fn parse_clock(input: &str) -> ConvResult<u64> {
    let bad = || ConvError::configuration(format!("Invalid time value: '{}'", input));
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(bad());
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(bad());
    }

    // whole hours/minutes, leading field unbounded, later ones below 60
    let (whole, last) = parts.split_at(parts.len() - 1);
    let mut total_secs: u64 = 0;
    for (i, part) in whole.iter().enumerate() {
        let value: u64 = part.parse().map_err(|_| bad())?;
        if i > 0 && value >= 60 {
            return Err(bad());
        }
        total_secs = total_secs
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(bad)?;
    }
    if !whole.is_empty() {
        total_secs = total_secs.checked_mul(60).ok_or_else(bad)?;
    }

    let seconds: f64 = last[0].parse().map_err(|_| bad())?;
    if !seconds.is_finite() || seconds < 0.0 || (!whole.is_empty() && seconds >= 60.0) {
        return Err(bad());
    }
    let fraction_ms = seconds * 1000.0;
    if fraction_ms >= u64::MAX as f64 {
        return Err(bad());
    }

    total_secs
        .checked_mul(1000)
        .and_then(|ms| ms.checked_add(fraction_ms.round() as u64))
        .ok_or_else(bad)
}

/// Result of a peak-level analysis for one file, in dBFS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakLevel {
    pub max_db: f64,
    pub mean_db: f64,
}

// ============================================================================
// Sub-parameter dialog results. `None` from a dialog means "cancelled".
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizeResult {
    pub scale: Option<String>,
    pub setdar: Option<String>,
    pub setsar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotateResult {
    /// Filter fragment, e.g. `transpose=1`; `None` clears rotation
    pub filter: Option<String>,
    /// Human-readable orientation shown in the summary
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LacingResult {
    Off,
    Deinterlace(String),
    Interlace(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioParamsResult {
    pub channel: Option<AudioParam>,
    pub rate: Option<AudioParam>,
    pub bitrate: Option<AudioParam>,
    /// For PCM this names the codec (`-c:a pcm_s24le`), otherwise a sample format
    pub depth: Option<AudioParam>,
}
