//! Rule engine: every user selection is an [`Event`] applied to a
//! [`ConfigState`]. Handlers validate first and mutate second, so a rejected
//! event leaves the state exactly as it was.

use super::error::{ConvError, ConvResult};
use super::state::{AudioSettings, ConfigState, FilterSet};
use super::tables::{
    AudioCodec, CRF_RANGE, Container, DEFAULT_PIX_FMT, ImageFormat, VideoEncoder, X264_PRESETS,
    X264_PROFILES, X264_TUNES,
};
use super::types::{
    AudioParamsResult, AutomationMode, LacingResult, Passing, PeakLevel, Quality, ResizeResult,
    RotateResult, StreamMap,
};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Discrete selection events. A cancelled dialog produces no event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ContainerSelected(Container),
    AudioCodecSelected(AudioCodec),
    AutomationModeSelected(AutomationMode),
    TwoPassToggled(bool),
    CrfChanged(u32),
    BitrateChanged(u32),
    PresetSelected(Option<String>),
    ProfileSelected(Option<String>),
    TuneSelected(Option<String>),
    AspectSelected(Option<String>),
    FrameRateSelected(Option<String>),
    ImageFormatSelected(ImageFormat),
    AudioImported(PathBuf),
    ShortestToggled(bool),
    NormalizeToggled(bool),
    NormalizeThresholdChanged(f64),
    PeakAnalysisCompleted(Vec<PeakLevel>),
    PeakAnalysisFailed,

    // Sub-parameter dialog results
    Crop(Option<String>),
    Resize(ResizeResult),
    Rotate(RotateResult),
    Lacing(LacingResult),
    Deinterlace(Option<String>),
    Interlace(Option<String>),
    Denoise(Option<String>),
    AudioParams(AudioParamsResult),
    FiltersCleared,
}

impl ConfigState {
    /// Apply one event. On error the state is unchanged.
    pub fn apply(&mut self, event: Event) -> ConvResult<()> {
        debug!(?event, "Applying selection event");
        let result = self.dispatch(event);
        if let Err(e) = &result {
            warn!("Selection rejected: {}", e);
        }
        result
    }

    /// Apply events in order, stopping at the first rejection
    pub fn apply_all(&mut self, events: impl IntoIterator<Item = Event>) -> ConvResult<()> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> ConvResult<()> {
        match event {
            Event::ContainerSelected(c) => self.select_container(c),
            Event::AudioCodecSelected(a) => self.select_audio_codec(a),
            Event::AutomationModeSelected(m) => {
                self.select_mode(m);
                Ok(())
            }
            Event::TwoPassToggled(on) => self.toggle_two_pass(on),
            Event::CrfChanged(v) => self.set_crf(v),
            Event::BitrateChanged(v) => self.set_bitrate(v),
            Event::PresetSelected(v) => {
                let v = self.x264_choice("preset", v, X264_PRESETS)?;
                self.preset = v;
                Ok(())
            }
            Event::ProfileSelected(v) => {
                let v = self.x264_choice("profile", v, X264_PROFILES)?;
                self.profile = v;
                Ok(())
            }
            Event::TuneSelected(v) => {
                let v = self.x264_choice("tune", v, X264_TUNES)?;
                self.tune = v;
                Ok(())
            }
            Event::AspectSelected(v) => {
                self.aspect = non_empty(v);
                Ok(())
            }
            Event::FrameRateSelected(v) => {
                self.frame_rate = non_empty(v);
                Ok(())
            }
            Event::ImageFormatSelected(f) => self.select_image_format(f),
            Event::AudioImported(path) => self.import_audio(path),
            Event::ShortestToggled(on) => self.toggle_shortest(on),
            Event::NormalizeToggled(on) => self.toggle_normalization(on),
            Event::NormalizeThresholdChanged(db) => self.set_threshold(db),
            Event::PeakAnalysisCompleted(peaks) => self.store_peaks(peaks),
            Event::PeakAnalysisFailed => {
                self.reset_normalization();
                Ok(())
            }
            Event::Crop(v) => self.set_filter(|f| {
                f.crop = non_empty(v).map(|s| {
                    if s.starts_with("crop=") {
                        s
                    } else {
                        format!("crop={}", s)
                    }
                })
            }),
            Event::Resize(r) => self.set_filter(|f| {
                f.scale = non_empty(r.scale);
                f.setdar = non_empty(r.setdar);
                f.setsar = non_empty(r.setsar);
            }),
            Event::Rotate(r) => self.set_filter(|f| {
                f.rotate = non_empty(r.filter);
                f.rotate_label = if f.rotate.is_some() { r.label } else { String::new() };
            }),
            Event::Lacing(r) => self.set_filter(|f| match r {
                LacingResult::Off => {
                    f.deinterlace = None;
                    f.interlace = None;
                }
                LacingResult::Deinterlace(s) => {
                    f.deinterlace = non_empty(Some(s));
                    f.interlace = None;
                }
                LacingResult::Interlace(s) => {
                    f.interlace = non_empty(Some(s));
                    f.deinterlace = None;
                }
            }),
            Event::Deinterlace(v) => {
                let v = non_empty(v);
                if v.is_some() && self.filters.interlace.is_some() {
                    return Err(ConvError::configuration(
                        "Deinterlace cannot be set while interlace is active",
                    ));
                }
                self.set_filter(|f| f.deinterlace = v)
            }
            Event::Interlace(v) => {
                let v = non_empty(v);
                if v.is_some() && self.filters.deinterlace.is_some() {
                    return Err(ConvError::configuration(
                        "Interlace cannot be set while deinterlace is active",
                    ));
                }
                self.set_filter(|f| f.interlace = v)
            }
            Event::Denoise(v) => self.set_filter(|f| f.denoise = non_empty(v)),
            Event::AudioParams(r) => self.set_audio_params(r),
            Event::FiltersCleared => {
                if self.filters.is_empty() {
                    return Err(ConvError::configuration("No filter enabled"));
                }
                self.filters = FilterSet::default();
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Container, audio codec, mode
    // ------------------------------------------------------------------

    fn select_container(&mut self, container: Container) -> ConvResult<()> {
        match self.mode {
            AutomationMode::Slideshow if !container.is_h264() => {
                return Err(ConvError::configuration(format!(
                    "Slideshow requires an h264 container, not {}",
                    container.label()
                )));
            }
            AutomationMode::ExtractImages if container == Container::CopyVideo => {
                return Err(ConvError::configuration(
                    "Image extraction cannot use the copy video codec",
                ));
            }
            _ => {}
        }
        self.apply_container(container);
        self.enforce_mode_controls();
        Ok(())
    }

    /// Container rules without mode checks. Also used to build the initial state.
    pub(crate) fn apply_container(&mut self, container: Container) {
        self.container = container;
        self.video_codec = container.video_codec().to_string();
        self.video_tag = container.video_tag().map(str::to_string);
        self.output_ext = container.extension().map(str::to_string);
        self.allowed_audio = container.audio_codecs().to_vec();
        self.reset_audio();

        match container.encoder() {
            VideoEncoder::X264 => {
                self.controls.filters = true;
                self.controls.two_pass = true;
                self.controls.quality = true;
                self.controls.x264_advanced = true;
                self.pix_fmt = Some(DEFAULT_PIX_FMT.to_string());
                self.quality = match self.passing {
                    Passing::Double => Quality::Bitrate(self.bitrate_setting),
                    Passing::Single => Quality::Crf(self.crf_setting),
                };
            }
            VideoEncoder::Copy => {
                self.controls.filters = false;
                self.controls.two_pass = false;
                self.controls.quality = false;
                self.controls.x264_advanced = false;
                self.filters = FilterSet::default();
                self.passing = Passing::Single;
                self.quality = Quality::Copy;
                self.pix_fmt = None;
                self.clear_x264_advanced();
            }
            VideoEncoder::Other => {
                self.controls.filters = true;
                self.controls.two_pass = true;
                self.controls.quality = true;
                self.controls.x264_advanced = false;
                self.pix_fmt = None;
                self.quality = Quality::Bitrate(self.bitrate_setting);
                self.clear_x264_advanced();
            }
        }
    }

    fn select_audio_codec(&mut self, codec: AudioCodec) -> ConvResult<()> {
        if !self.controls.audio {
            return Err(ConvError::configuration(
                "Audio settings are not available in this mode",
            ));
        }
        if !self.allowed_audio.contains(&codec) {
            return Err(ConvError::configuration(format!(
                "Audio codec '{}' is not compatible with {}",
                codec.label(),
                self.container.label()
            )));
        }

        self.audio = AudioSettings::for_codec(codec);
        if codec.is_passthrough() {
            self.controls.audio_params = false;
            self.controls.normalization = false;
            self.reset_normalization();
        } else {
            self.controls.audio_params = codec != AudioCodec::Default;
            self.controls.normalization = true;
        }
        Ok(())
    }

    fn select_mode(&mut self, mode: AutomationMode) {
        self.mode = mode;
        self.passing = Passing::Single;
        self.tune = None;
        self.image_format = None;
        self.shortest = false;
        self.map = StreamMap::All;

        let container = match mode {
            AutomationMode::ExtractImages if self.container == Container::CopyVideo => {
                Container::MkvH264
            }
            AutomationMode::Slideshow if !self.container.is_h264() => Container::Mp4H264,
            _ => self.container,
        };

        match mode {
            AutomationMode::Standard => {
                self.imported_audio = None;
            }
            AutomationMode::AddAudioTrack | AutomationMode::Slideshow => {
                if self.imported_audio.is_some() {
                    self.map = StreamMap::VideoWithImportedAudio;
                    self.shortest = true;
                }
            }
            AutomationMode::ExtractImages => {
                self.image_format = Some(ImageFormat::default());
            }
        }

        self.apply_container(container);
        if mode == AutomationMode::Slideshow {
            self.tune = Some("stillimage".to_string());
        }
        self.enforce_mode_controls();
    }

    /// Mode-level overrides applied on top of the container rules
    fn enforce_mode_controls(&mut self) {
        match self.mode {
            AutomationMode::Standard => {
                self.controls.audio = true;
            }
            AutomationMode::AddAudioTrack => {
                self.controls.audio = self.imported_audio.is_some();
            }
            AutomationMode::ExtractImages => {
                self.controls.two_pass = false;
                self.controls.quality = false;
                self.controls.x264_advanced = false;
                self.controls.audio = false;
                self.controls.audio_params = false;
                self.controls.normalization = false;
                self.passing = Passing::Single;
            }
            AutomationMode::Slideshow => {
                self.controls.two_pass = false;
                self.passing = Passing::Single;
                self.quality = Quality::Crf(self.crf_setting);
                self.controls.audio = self.imported_audio.is_some();
            }
        }
        if !self.controls.audio {
            self.controls.audio_params = false;
            self.controls.normalization = false;
            self.reset_normalization();
        }
    }

    // ------------------------------------------------------------------
    // Video quality
    // ------------------------------------------------------------------

    fn toggle_two_pass(&mut self, on: bool) -> ConvResult<()> {
        if !self.controls.two_pass {
            return Err(ConvError::configuration(
                "Two-pass encoding is not available for this selection",
            ));
        }
        if on {
            self.passing = Passing::Double;
            self.quality = Quality::Bitrate(self.bitrate_setting);
        } else {
            self.passing = Passing::Single;
            self.quality = match self.encoder() {
                VideoEncoder::X264 => Quality::Crf(self.crf_setting),
                VideoEncoder::Other => Quality::Bitrate(self.bitrate_setting),
                VideoEncoder::Copy => Quality::Copy,
            };
        }
        Ok(())
    }

    fn set_crf(&mut self, crf: u32) -> ConvResult<()> {
        if !CRF_RANGE.contains(&crf) {
            return Err(ConvError::configuration(format!(
                "CRF must be between {} and {}, got {}",
                CRF_RANGE.start(),
                CRF_RANGE.end(),
                crf
            )));
        }
        if !matches!(self.quality, Quality::Crf(_)) {
            return Err(ConvError::configuration(
                "CRF is not available: bitrate or stream copy is active",
            ));
        }
        self.crf_setting = crf;
        self.quality = Quality::Crf(crf);
        Ok(())
    }

    fn set_bitrate(&mut self, kbps: u32) -> ConvResult<()> {
        if kbps == 0 {
            return Err(ConvError::configuration("Bitrate must be greater than 0"));
        }
        if !matches!(self.quality, Quality::Bitrate(_)) {
            return Err(ConvError::configuration(
                "Bitrate is not available: CRF or stream copy is active",
            ));
        }
        self.bitrate_setting = kbps;
        self.quality = Quality::Bitrate(kbps);
        Ok(())
    }

    fn x264_choice(
        &self,
        what: &str,
        value: Option<String>,
        allowed: &[&str],
    ) -> ConvResult<Option<String>> {
        let value = non_empty(value);
        let Some(v) = value else {
            return Ok(None);
        };
        if !self.controls.x264_advanced {
            return Err(ConvError::configuration(format!(
                "x264 {} is not available for {}",
                what,
                self.container.label()
            )));
        }
        if !allowed.contains(&v.as_str()) {
            return Err(ConvError::configuration(format!(
                "Unknown x264 {} '{}' (expected one of: {})",
                what,
                v,
                allowed.join(", ")
            )));
        }
        Ok(Some(v))
    }

    fn clear_x264_advanced(&mut self) {
        self.preset = None;
        self.profile = None;
        self.tune = None;
    }

    fn select_image_format(&mut self, format: ImageFormat) -> ConvResult<()> {
        if self.mode != AutomationMode::ExtractImages {
            return Err(ConvError::configuration(
                "Image format applies only to image extraction",
            ));
        }
        self.image_format = Some(format);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Imported audio and normalization
    // ------------------------------------------------------------------

    fn import_audio(&mut self, path: PathBuf) -> ConvResult<()> {
        if !matches!(
            self.mode,
            AutomationMode::AddAudioTrack | AutomationMode::Slideshow
        ) {
            return Err(ConvError::configuration(format!(
                "Importing an audio track is not available in {} mode",
                self.mode.label()
            )));
        }
        let first_import = self.imported_audio.is_none();
        self.imported_audio = Some(path);
        self.map = StreamMap::VideoWithImportedAudio;
        if first_import {
            self.shortest = true;
        }
        self.controls.audio = true;
        if !self.audio.codec.is_passthrough() {
            self.controls.normalization = true;
        }
        Ok(())
    }

    fn toggle_shortest(&mut self, on: bool) -> ConvResult<()> {
        if self.imported_audio.is_none() {
            return Err(ConvError::configuration("No audio track imported"));
        }
        self.shortest = on;
        Ok(())
    }

    fn toggle_normalization(&mut self, on: bool) -> ConvResult<()> {
        if on && !self.controls.normalization {
            return Err(ConvError::configuration(
                "Audio normalization is not available for this audio selection",
            ));
        }
        self.normalization.enabled = on;
        self.normalization.peaks = None;
        Ok(())
    }

    fn set_threshold(&mut self, db: f64) -> ConvResult<()> {
        if !db.is_finite() || !(-99.0..=0.0).contains(&db) {
            return Err(ConvError::configuration(format!(
                "Normalization threshold must be between -99.0 and 0.0 dB, got {}",
                db
            )));
        }
        self.normalization.threshold_db = db;
        Ok(())
    }

    fn store_peaks(&mut self, peaks: Vec<PeakLevel>) -> ConvResult<()> {
        if !self.normalization.enabled {
            return Err(ConvError::configuration("Audio normalization is not enabled"));
        }
        self.normalization.peaks = Some(peaks);
        Ok(())
    }

    fn reset_audio(&mut self) {
        self.audio = AudioSettings::default();
        self.controls.audio_params = false;
        self.controls.normalization = true;
        self.reset_normalization();
    }

    fn reset_normalization(&mut self) {
        self.normalization.enabled = false;
        self.normalization.peaks = None;
    }

    // ------------------------------------------------------------------
    // Filters and audio parameters
    // ------------------------------------------------------------------

    fn set_filter(&mut self, update: impl FnOnce(&mut FilterSet)) -> ConvResult<()> {
        if !self.controls.filters {
            return Err(ConvError::configuration(
                "Video filters are not available with stream copy",
            ));
        }
        update(&mut self.filters);
        Ok(())
    }

    fn set_audio_params(&mut self, result: AudioParamsResult) -> ConvResult<()> {
        if !self.controls.audio_params {
            return Err(ConvError::configuration(format!(
                "Audio parameters are not available for '{}'",
                self.audio.codec.label()
            )));
        }
        self.audio.channel = result.channel;
        self.audio.rate = result.rate;
        self.audio.bitrate = result.bitrate;
        self.audio.depth = result.depth;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
