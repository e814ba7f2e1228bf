use super::filters;
use super::tables::{
    AudioCodec, Container, DEFAULT_BITRATE_KBPS, DEFAULT_CRF, DEFAULT_NORMALIZE_DB, ImageFormat,
    VideoEncoder,
};
use super::types::{AudioParam, AutomationMode, Passing, PeakLevel, Quality, StreamMap};
use std::path::PathBuf;

/// Which option groups the user may currently edit.
/// Handlers for disabled groups reject their events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    pub filters: bool,
    pub two_pass: bool,
    /// CRF slider / bitrate entry
    pub quality: bool,
    /// x264 preset, profile, tune
    pub x264_advanced: bool,
    pub audio: bool,
    pub audio_params: bool,
    pub normalization: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            filters: true,
            two_pass: true,
            quality: true,
            x264_advanced: true,
            audio: true,
            audio_params: false,
            normalization: true,
        }
    }
}

/// Video filter fragments, each optional and independently set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub crop: Option<String>,
    pub scale: Option<String>,
    pub setdar: Option<String>,
    pub setsar: Option<String>,
    pub rotate: Option<String>,
    pub rotate_label: String,
    pub deinterlace: Option<String>,
    pub interlace: Option<String>,
    pub denoise: Option<String>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        filters::compose(self).is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioSettings {
    pub codec: AudioCodec,
    pub channel: Option<AudioParam>,
    pub rate: Option<AudioParam>,
    pub bitrate: Option<AudioParam>,
    pub depth: Option<AudioParam>,
}

impl AudioSettings {
    pub fn for_codec(codec: AudioCodec) -> Self {
        Self {
            codec,
            ..Self::default()
        }
    }

    pub fn has_params(&self) -> bool {
        self.channel.is_some() || self.rate.is_some() || self.bitrate.is_some() || self.depth.is_some()
    }

    /// Codec arguments. A PCM depth selection replaces the codec name.
    pub fn codec_args(&self) -> Vec<String> {
        if self.codec.is_pcm() {
            if let Some(depth) = &self.depth {
                return split_fragment(&depth.arg);
            }
        }
        self.codec.args().iter().map(|s| s.to_string()).collect()
    }

    /// `[bitrate] [rate] [channel] [depth]` in that order
    pub fn param_args(&self) -> Vec<String> {
        let depth = if self.codec.is_pcm() { None } else { self.depth.as_ref() };
        [self.bitrate.as_ref(), self.rate.as_ref(), self.channel.as_ref(), depth]
            .into_iter()
            .flatten()
            .flat_map(|p| split_fragment(&p.arg))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub enabled: bool,
    /// Target max peak level in dB; files peaking below it get raised
    pub threshold_db: f64,
    /// Per-file analysis results, in file order
    pub peaks: Option<Vec<PeakLevel>>,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_db: DEFAULT_NORMALIZE_DB,
            peaks: None,
        }
    }
}

impl Normalization {
    /// Per-file gain filter, `None` where the file already reaches the threshold
    pub fn offsets(&self) -> Vec<Option<String>> {
        let Some(peaks) = &self.peaks else {
            return Vec::new();
        };
        if !self.enabled {
            return Vec::new();
        }
        peaks
            .iter()
            .map(|p| {
                self.gain_for(p.max_db)
                    .map(|gain| format!("volume={:.1}dB", gain))
            })
            .collect()
    }

    /// Gain needed to lift a peak to the threshold, rounded to 0.1 dB
    pub fn gain_for(&self, max_db: f64) -> Option<f64> {
        if max_db >= self.threshold_db {
            None
        } else {
            Some(((self.threshold_db - max_db) * 10.0).round() / 10.0)
        }
    }
}

/// Complete option record of one conversion session.
///
/// Mutated only through [`ConfigState::apply`]; the rule engine keeps the
/// cross-field invariants (single quality mode, audio/container compatibility,
/// exclusive lacing) true after every event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigState {
    pub mode: AutomationMode,

    // Video
    pub container: Container,
    pub video_codec: String,
    pub video_tag: Option<String>,
    /// `None` keeps the source extension (stream copy)
    pub output_ext: Option<String>,
    pub pix_fmt: Option<String>,
    pub passing: Passing,
    pub quality: Quality,
    /// Last CRF entered, restored when CRF becomes active again
    pub crf_setting: u32,
    /// Last bitrate entered (kbit/s)
    pub bitrate_setting: u32,
    pub preset: Option<String>,
    pub profile: Option<String>,
    pub tune: Option<String>,
    pub aspect: Option<String>,
    pub frame_rate: Option<String>,
    pub filters: FilterSet,

    // Audio
    pub audio: AudioSettings,
    pub allowed_audio: Vec<AudioCodec>,
    pub normalization: Normalization,
    pub imported_audio: Option<PathBuf>,
    pub map: StreamMap,
    pub shortest: bool,

    // Image extraction
    pub image_format: Option<ImageFormat>,

    pub controls: Controls,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self::new(DEFAULT_CRF, DEFAULT_BITRATE_KBPS)
    }
}

impl ConfigState {
    /// Fresh session state for the default container with the given
    /// quality presets
    pub fn new(crf: u32, bitrate_kbps: u32) -> Self {
        let container = Container::default();
        let mut state = Self {
            mode: AutomationMode::Standard,
            container,
            video_codec: container.video_codec().to_string(),
            video_tag: None,
            output_ext: container.extension().map(str::to_string),
            pix_fmt: None,
            passing: Passing::Single,
            quality: Quality::Crf(crf),
            crf_setting: crf,
            bitrate_setting: bitrate_kbps,
            preset: None,
            profile: None,
            tune: None,
            aspect: None,
            frame_rate: None,
            filters: FilterSet::default(),
            audio: AudioSettings::default(),
            allowed_audio: container.audio_codecs().to_vec(),
            normalization: Normalization::default(),
            imported_audio: None,
            map: StreamMap::All,
            shortest: false,
            image_format: None,
            controls: Controls::default(),
        };
        state.apply_container(container);
        state
    }

    pub fn encoder(&self) -> VideoEncoder {
        self.container.encoder()
    }

    pub fn is_copy(&self) -> bool {
        self.encoder() == VideoEncoder::Copy
    }

    /// Composed filter graph, empty when no fragment is set
    pub fn compose(&self) -> String {
        filters::compose(&self.filters)
    }

    /// Normalization is on but peak levels have not been measured yet
    pub fn normalization_pending(&self) -> bool {
        self.normalization.enabled && self.normalization.peaks.is_none()
    }
}

/// Split a dialog-provided argument fragment into argv entries.
/// Falls back to whitespace splitting on unbalanced quotes.
pub(crate) fn split_fragment(fragment: &str) -> Vec<String> {
    shlex::split(fragment)
        .unwrap_or_else(|| fragment.split_whitespace().map(str::to_string).collect())
}
