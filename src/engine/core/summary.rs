//! Read-only preview of the resolved configuration, one `label: value` per
//! line in a fixed, mode-specific order.

use super::state::ConfigState;
use super::tables::ImageFormat;
use super::types::{AudioParam, AutomationMode, TimingWindow, format_clock};

const NONE: &str = "-";

pub fn render(state: &ConfigState, queued: usize, timing: Option<TimingWindow>) -> String {
    let rows = rows(state, queued, timing);
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    let mut out = String::from("SUMMARY\n\n");
    for (label, value) in rows {
        out.push_str(&format!("{:<width$}  {}\n", format!("{}:", label), value, width = width + 1));
    }
    out
}

/// Labels and values in display order
pub fn rows(
    state: &ConfigState,
    queued: usize,
    timing: Option<TimingWindow>,
) -> Vec<(&'static str, String)> {
    let time = match timing {
        Some(t) => format!(
            "start {} | duration {}",
            format_clock(t.start_offset_ms),
            format_clock(t.duration_ms)
        ),
        None => "Disabled".to_string(),
    };

    match state.mode {
        AutomationMode::ExtractImages => vec![
            ("File to queue", queued.to_string()),
            (
                "Images format",
                state
                    .image_format
                    .unwrap_or(ImageFormat::default())
                    .extension()
                    .to_string(),
            ),
            ("Video rate", opt(&state.frame_rate)),
            ("Filters", or_none(state.compose())),
            ("Time selection", time),
        ],
        AutomationMode::Slideshow => {
            let slide = timing
                .map(|t| format!("{} s", t.duration_secs()))
                .unwrap_or_else(|| "Not set".to_string());
            let mut rows = vec![
                ("Uploaded images", queued.to_string()),
                ("Video format", opt(&state.output_ext)),
                ("Resolution (size)", slideshow_size(state.filters.scale.as_deref())),
                ("CRF", state.quality.crf().map_or(NONE.to_string(), |c| c.to_string())),
                ("Preset h264", opt(&state.preset)),
                ("Profile h264", opt(&state.profile)),
                ("Tune h264", opt(&state.tune)),
            ];
            rows.extend(audio_rows(state));
            rows.extend([
                ("Audio normalization", "Not applicable".to_string()),
                ("Map", state.map.args().join(" ")),
                ("Time to slide between images", slide),
                ("Stop at shortest", yes_no(state.shortest)),
            ]);
            rows
        }
        AutomationMode::Standard | AutomationMode::AddAudioTrack if state.is_copy() => {
            let mut rows = vec![
                ("File to queue", queued.to_string()),
                ("Video format", state.container.label().to_string()),
                ("Video codec", state.video_codec.clone()),
                ("Video aspect", opt(&state.aspect)),
                ("Video rate", opt(&state.frame_rate)),
            ];
            rows.extend(audio_rows(state));
            rows.extend(tail_rows(state, time));
            rows
        }
        AutomationMode::Standard | AutomationMode::AddAudioTrack => {
            let mut rows = vec![
                ("File to queue", queued.to_string()),
                ("Video format", state.container.label().to_string()),
                ("Video codec", state.video_codec.clone()),
                (
                    "Video bitrate",
                    state
                        .quality
                        .bitrate()
                        .map_or(NONE.to_string(), |b| format!("{}k", b)),
                ),
                ("CRF", state.quality.crf().map_or(NONE.to_string(), |c| c.to_string())),
                ("Pass", state.passing.to_string()),
                ("Deinterlacing", opt(&state.filters.deinterlace)),
                ("Interlacing", opt(&state.filters.interlace)),
                ("Applied filters", or_none(state.compose())),
                ("Video aspect", opt(&state.aspect)),
                ("Video rate", opt(&state.frame_rate)),
                ("Preset h264", opt(&state.preset)),
                ("Profile h264", opt(&state.profile)),
                ("Tune h264", opt(&state.tune)),
                ("Orientation", or_none(state.filters.rotate_label.clone())),
            ];
            rows.extend(audio_rows(state));
            rows.extend(tail_rows(state, time));
            rows
        }
    }
}

fn audio_rows(state: &ConfigState) -> Vec<(&'static str, String)> {
    let added = state
        .imported_audio
        .as_ref()
        .map_or(NONE.to_string(), |p| p.display().to_string());
    vec![
        ("Audio stream added", added),
        ("Audio codec", state.audio.codec.label().to_string()),
        ("Audio channel", param(&state.audio.channel)),
        ("Audio rate", param(&state.audio.rate)),
        ("Audio bitrate", param(&state.audio.bitrate)),
        ("Bit per sample", param(&state.audio.depth)),
    ]
}

fn tail_rows(state: &ConfigState, time: String) -> Vec<(&'static str, String)> {
    let normalization = if state.normalization.enabled {
        format!("Enabled ({:.1} dB)", state.normalization.threshold_db)
    } else {
        "Disabled".to_string()
    };
    vec![
        ("Audio normalization", normalization),
        ("Map", state.map.args().join(" ")),
        ("Time selection", time),
        ("Stop at shortest", yes_no(state.shortest)),
    ]
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NONE.to_string())
}

fn or_none(value: String) -> String {
    if value.is_empty() { NONE.to_string() } else { value }
}

fn param(value: &Option<AudioParam>) -> String {
    value
        .as_ref()
        .map_or(NONE.to_string(), |p| p.label.clone())
}

fn yes_no(on: bool) -> String {
    if on { "Yes" } else { "No" }.to_string()
}

/// `scale=w=1280:h=720` or `scale=1280:720` as `1280 X 720`
fn slideshow_size(scale: Option<&str>) -> String {
    let Some(scale) = scale else {
        return "As from source".to_string();
    };
    let body = scale.strip_prefix("scale=").unwrap_or(scale);
    let dims: Vec<&str> = body
        .split(':')
        .map(|part| part.rsplit('=').next().unwrap_or(part))
        .collect();
    match dims.as_slice() {
        [w, h, ..] => format!("{} X {}", w, h),
        _ => body.to_string(),
    }
}
