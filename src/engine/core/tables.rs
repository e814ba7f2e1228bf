//! Static option tables: containers, audio codecs, image formats and the
//! x264 preset/profile/tune lists.
//! Lookups by id and by label live here so the rule engine, the CLI and the
//! summary formatter stay in sync.

use serde::{Deserialize, Serialize};

/// Which encoder family a container selection drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoder {
    /// libx264, the primary software encoder with the full option set
    X264,
    /// Any other encoder (mpeg4, theora, vpx); bitrate only, no preset/profile/tune
    Other,
    /// Stream copy, no re-encode
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Container {
    AviXvid,
    AviMpeg4,
    AviH264,
    Mp4Mpeg4,
    Mp4H264,
    M4vH264,
    #[default]
    MkvH264,
    OggTheora,
    Webm,
    FlvH264,
    CopyVideo,
}

impl Container {
    pub const ALL: [Container; 11] = [
        Container::AviXvid,
        Container::AviMpeg4,
        Container::AviH264,
        Container::Mp4Mpeg4,
        Container::Mp4H264,
        Container::M4vH264,
        Container::MkvH264,
        Container::OggTheora,
        Container::Webm,
        Container::FlvH264,
        Container::CopyVideo,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::AviXvid => "avi-xvid",
            Self::AviMpeg4 => "avi-mpeg4",
            Self::AviH264 => "avi-h264",
            Self::Mp4Mpeg4 => "mp4-mpeg4",
            Self::Mp4H264 => "mp4-h264",
            Self::M4vH264 => "m4v-h264",
            Self::MkvH264 => "mkv-h264",
            Self::OggTheora => "ogg-theora",
            Self::Webm => "webm",
            Self::FlvH264 => "flv-h264",
            Self::CopyVideo => "copy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AviXvid => "AVI (XVID mpeg4)",
            Self::AviMpeg4 => "AVI (FFmpeg mpeg4)",
            Self::AviH264 => "AVI (ITU h264)",
            Self::Mp4Mpeg4 => "MP4 (mpeg4)",
            Self::Mp4H264 => "MP4 (HQ h264/AVC)",
            Self::M4vH264 => "M4V (HQ h264/AVC)",
            Self::MkvH264 => "MKV (h264)",
            Self::OggTheora => "OGG theora",
            Self::Webm => "WebM (HTML5)",
            Self::FlvH264 => "FLV (HQ h264/AVC)",
            Self::CopyVideo => "Copy video codec",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// ffmpeg video codec name (`-c:v <name>`)
    pub fn video_codec(self) -> &'static str {
        match self {
            Self::AviXvid | Self::AviMpeg4 | Self::Mp4Mpeg4 => "mpeg4",
            Self::AviH264 | Self::Mp4H264 | Self::M4vH264 | Self::MkvH264 | Self::FlvH264 => {
                "libx264"
            }
            Self::OggTheora => "libtheora",
            Self::Webm => "libvpx",
            Self::CopyVideo => "copy",
        }
    }

    /// Fourcc override, only XVID needs one
    pub fn video_tag(self) -> Option<&'static str> {
        match self {
            Self::AviXvid => Some("xvid"),
            _ => None,
        }
    }

    /// Output extension. `None` for stream copy: the source extension is kept.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::AviXvid | Self::AviMpeg4 | Self::AviH264 => Some("avi"),
            Self::Mp4Mpeg4 | Self::Mp4H264 => Some("mp4"),
            Self::M4vH264 => Some("m4v"),
            Self::MkvH264 => Some("mkv"),
            Self::OggTheora => Some("ogg"),
            Self::Webm => Some("webm"),
            Self::FlvH264 => Some("flv"),
            Self::CopyVideo => None,
        }
    }

    pub fn encoder(self) -> VideoEncoder {
        match self.video_codec() {
            "libx264" => VideoEncoder::X264,
            "copy" => VideoEncoder::Copy,
            _ => VideoEncoder::Other,
        }
    }

    pub fn is_h264(self) -> bool {
        self.encoder() == VideoEncoder::X264
    }

    /// Audio codecs that can be muxed into this container
    pub fn audio_codecs(self) -> &'static [AudioCodec] {
        use AudioCodec::*;
        match self.extension() {
            Some("avi") => &[Default, Wav, Ac3, Mp3, Copy, Silent],
            Some("flv") | Some("mp4") => &[Default, Aac, Ac3, Mp3, Copy, Silent],
            Some("m4v") => &[Default, Aac, Alac, Copy, Silent],
            Some("mkv") => &[Default, Wav, Flac, Aac, Ac3, Ogg, Mp3, Copy, Silent],
            Some("webm") => &[Default, Ogg, Copy, Silent],
            Some("ogg") => &[Default, Flac, Ogg, Copy, Silent],
            // stream copy keeps the source container, so only broadly muxable codecs
            _ => &[Default, Flac, Aac, Ac3, Mp3, Copy, Silent],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioCodec {
    #[default]
    Default,
    Wav,
    Flac,
    Aac,
    Alac,
    Ac3,
    Ogg,
    Mp3,
    Copy,
    Silent,
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 10] = [
        AudioCodec::Default,
        AudioCodec::Wav,
        AudioCodec::Flac,
        AudioCodec::Aac,
        AudioCodec::Alac,
        AudioCodec::Ac3,
        AudioCodec::Ogg,
        AudioCodec::Mp3,
        AudioCodec::Copy,
        AudioCodec::Silent,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Aac => "aac",
            Self::Alac => "alac",
            Self::Ac3 => "ac3",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Copy => "copy",
            Self::Silent => "silent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "Default (managed by FFmpeg)",
            Self::Wav => "Wav (Raw, No_MultiChannel)",
            Self::Flac => "Flac (Lossless, No_MultiChannel)",
            Self::Aac => "Aac (Lossy, MultiChannel)",
            Self::Alac => "Alac (Lossless, m4v, No_MultiChannel)",
            Self::Ac3 => "Ac3 (Lossy, MultiChannel)",
            Self::Ogg => "Ogg (Lossy, No_MultiChannel)",
            Self::Mp3 => "Mp3 (Lossy, No_MultiChannel)",
            Self::Copy => "Try to copy audio source",
            Self::Silent => "No audio stream (silent)",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// Codec arguments; empty for the ffmpeg-managed default
    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Default => &[],
            Self::Wav => &["-c:a", "pcm_s16le"],
            Self::Flac => &["-c:a", "flac"],
            Self::Aac => &["-c:a", "aac"],
            Self::Alac => &["-c:a", "alac"],
            Self::Ac3 => &["-c:a", "ac3"],
            Self::Ogg => &["-c:a", "libvorbis"],
            Self::Mp3 => &["-c:a", "libmp3lame"],
            Self::Copy => &["-c:a", "copy"],
            Self::Silent => &["-an"],
        }
    }

    /// Copy and silent carry no encoder, so no parameters and no normalization
    pub fn is_passthrough(self) -> bool {
        matches!(self, Self::Copy | Self::Silent)
    }

    /// PCM codecs pick their sample depth through the codec name itself
    pub fn is_pcm(self) -> bool {
        matches!(self, Self::Wav)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Bmp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }

    pub fn pix_fmt(self) -> &'static str {
        match self {
            Self::Jpg => "yuvj420p",
            Self::Png => "rgb24",
            Self::Bmp => "bgr24",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }
}

pub const X264_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

pub const X264_PROFILES: &[&str] = &["baseline", "main", "high", "high10", "high444"];

pub const X264_TUNES: &[&str] = &[
    "film",
    "animation",
    "grain",
    "stillimage",
    "psnr",
    "ssim",
    "fastdecode",
    "zerolatency",
];

/// x264 CRF bounds (8-bit)
pub const CRF_RANGE: std::ops::RangeInclusive<u32> = 0..=51;

pub const DEFAULT_CRF: u32 = 23;
pub const DEFAULT_BITRATE_KBPS: u32 = 1500;
pub const DEFAULT_PIX_FMT: &str = "yuv420p";
pub const DEFAULT_NORMALIZE_DB: f64 = -1.0;

/// Output frame rate forced on slideshow videos
pub const SLIDESHOW_OUTPUT_FPS: u32 = 25;
