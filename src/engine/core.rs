mod error;
mod ffmpeg_cmd;
mod ffmpeg_info;
mod filters;
mod log;
mod profile;
mod rules;
mod scan;
mod state;
pub mod summary;
mod tables;
mod types;

pub use error::{ConvError, ConvResult};
pub use ffmpeg_cmd::{
    CmdBuilder, CommandPlan, EncoderEnv, Pass, PlanJob, PlanKind, RenderPaths, Synthesizer, Token,
    format_ffmpeg_cmd, two_pass_log_prefix,
};
pub use ffmpeg_info::{
    NormalizationEntry, NormalizationReport, PeakAnalyzer, VolumeDetect, ffmpeg_version,
    parse_volumedetect,
};
pub use filters::compose;
pub use log::write_plan_log;
pub use profile::{Profile, ProfileStore, USER_GROUP};
pub use rules::Event;
pub use scan::{
    SuffixAllocator, base_name, collect_sources, derive_output_path, is_image_file, is_video_file,
    next_suffix, source_dir,
};
pub use state::{AudioSettings, ConfigState, Controls, FilterSet, Normalization};
pub use tables::{
    AudioCodec, CRF_RANGE, Container, DEFAULT_BITRATE_KBPS, DEFAULT_CRF, DEFAULT_NORMALIZE_DB,
    ImageFormat, VideoEncoder, X264_PRESETS, X264_PROFILES, X264_TUNES,
};
pub use types::{
    AudioParam, AudioParamsResult, AutomationMode, LacingResult, Passing, PeakLevel, Quality,
    ResizeResult, RotateResult, StreamMap, TimingWindow, format_clock, parse_clock,
};
