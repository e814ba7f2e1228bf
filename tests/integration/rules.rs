// Integration tests for the option rule engine
//
// Container, mode and quality selections are replayed as events; every
// resulting state must be internally consistent and rejected events must
// leave the state untouched.

use ffconv::engine::{
    AudioCodec, AutomationMode, ConfigState, Container, Event, ImageFormat, Passing, Quality,
    StreamMap,
};
use proptest::prelude::*;
use std::path::PathBuf;

use crate::common::assertions::*;
use crate::common::helpers::*;

// ============================================================================
// Container and quality
// ============================================================================

#[test]
fn test_mkv_h264_single_pass_uses_crf() {
    let state = state_with([Event::ContainerSelected(Container::MkvH264)]);
    assert_eq!(state.quality, Quality::Crf(23));
    assert_eq!(state.passing, Passing::Single);

    let passes = render_passes(&state, None);
    assert_eq!(passes.len(), 1);
    assert_flag_value(&passes[0], "-c:v", "libx264");
    assert_flag_value(&passes[0], "-crf", "23");
    assert_lacks_arg(&passes[0], "-b:v");
}

#[test]
fn test_two_pass_switches_to_bitrate() {
    let state = state_with([
        Event::ContainerSelected(Container::MkvH264),
        Event::TwoPassToggled(true),
    ]);
    assert_eq!(state.quality, Quality::Bitrate(1500));

    let passes = render_passes(&state, None);
    assert_eq!(passes.len(), 2);
    let (first, second) = (&passes[0], &passes[1]);

    assert_flag_value(first, "-pass", "1");
    assert_flag_value(first, "-f", "rawvideo");
    assert_has_arg(first, "-an");
    assert_lacks_arg(first, "-c:a");
    assert_flag_value(first, "-passlogfile", PASSLOG);

    assert_flag_value(second, "-pass", "2");
    assert_flag_value(second, "-b:v", "1500k");
    assert_lacks_arg(second, "-crf");
    assert_eq!(second.last().map(String::as_str), Some(OUTPUT));
}

#[test]
fn test_copy_after_two_pass_resets_to_single() {
    let state = state_with([
        Event::ContainerSelected(Container::MkvH264),
        Event::TwoPassToggled(true),
        Event::ContainerSelected(Container::CopyVideo),
    ]);
    assert_eq!(state.passing, Passing::Single);
    assert_eq!(state.quality, Quality::Copy);
    assert!(!state.controls.two_pass);
    assert!(!state.controls.filters);

    let passes = render_passes(&state, None);
    assert_eq!(passes.len(), 1);
    assert_flag_value(&passes[0], "-c:v", "copy");
}

#[test]
fn test_non_x264_single_pass_keeps_bitrate() {
    let state = state_with([
        Event::ContainerSelected(Container::Webm),
        Event::BitrateChanged(900),
    ]);
    let passes = render_passes(&state, None);
    assert_flag_value(&passes[0], "-b:v", "900k");
    assert_lacks_arg(&passes[0], "-pix_fmt");
}

#[test]
fn test_crf_setting_survives_container_round_trip() {
    let state = state_with([
        Event::CrfChanged(18),
        Event::ContainerSelected(Container::Webm),
        Event::ContainerSelected(Container::Mp4H264),
    ]);
    assert_eq!(state.quality, Quality::Crf(18));
}

#[test]
fn test_out_of_range_crf_is_rejected() {
    let mut state = ConfigState::default();
    let before = state.clone();
    assert!(state.apply(Event::CrfChanged(52)).is_err());
    assert_eq!(state, before);
}

#[test]
fn test_x264_options_require_x264() {
    let mut state = state_with([Event::ContainerSelected(Container::Webm)]);
    let err = state
        .apply(Event::PresetSelected(Some("slow".into())))
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(state.preset, None);
}

// ============================================================================
// Modes
// ============================================================================

#[test]
fn test_slideshow_rejects_non_h264_container() {
    let mut state = state_with([Event::AutomationModeSelected(AutomationMode::Slideshow)]);
    assert!(state.container.is_h264());
    assert_eq!(state.tune.as_deref(), Some("stillimage"));

    let before = state.clone();
    assert!(state.apply(Event::ContainerSelected(Container::Webm)).is_err());
    assert_eq!(state, before);
}

#[test]
fn test_image_extraction_forbids_copy() {
    let mut state = state_with([
        Event::ContainerSelected(Container::CopyVideo),
        Event::AutomationModeSelected(AutomationMode::ExtractImages),
    ]);
    assert_ne!(state.container, Container::CopyVideo);
    assert_eq!(state.image_format, Some(ImageFormat::Jpg));
    assert!(state.apply(Event::ContainerSelected(Container::CopyVideo)).is_err());
    assert!(state.apply(Event::TwoPassToggled(true)).is_err());
}

#[test]
fn test_audio_import_maps_imported_track() {
    let state = state_with([
        Event::AutomationModeSelected(AutomationMode::AddAudioTrack),
        Event::AudioImported(PathBuf::from(AUDIO)),
    ]);
    assert_eq!(state.map, StreamMap::VideoWithImportedAudio);
    assert!(state.shortest);

    let passes = render_passes(&state, None);
    let args = &passes[0];
    assert_before(args, INPUT, AUDIO);
    assert_has_arg(args, "1:a:0");
    assert_has_arg(args, "-shortest");
}

#[test]
fn test_audio_import_only_in_audio_modes() {
    let mut state = ConfigState::default();
    assert!(state.apply(Event::AudioImported(PathBuf::from(AUDIO))).is_err());
    assert_eq!(state.imported_audio, None);
}

#[test]
fn test_returning_to_standard_drops_imported_audio() {
    let state = state_with([
        Event::AutomationModeSelected(AutomationMode::AddAudioTrack),
        Event::AudioImported(PathBuf::from(AUDIO)),
        Event::AutomationModeSelected(AutomationMode::Standard),
    ]);
    assert_eq!(state.imported_audio, None);
    assert_eq!(state.map, StreamMap::All);
    assert!(!state.shortest);
}

#[test]
fn test_audio_codec_must_fit_container() {
    let mut state = state_with([Event::ContainerSelected(Container::Webm)]);
    assert!(state.apply(Event::AudioCodecSelected(AudioCodec::Mp3)).is_err());
    assert!(state.apply(Event::AudioCodecSelected(AudioCodec::Ogg)).is_ok());
}

#[test]
fn test_silent_audio_disables_normalization() {
    let mut state = state_with([Event::NormalizeToggled(true)]);
    state
        .apply(Event::AudioCodecSelected(AudioCodec::Silent))
        .unwrap();
    assert!(!state.normalization.enabled);
    assert!(state.apply(Event::NormalizeToggled(true)).is_err());

    let passes = render_passes(&state, None);
    assert_has_arg(&passes[0], "-an");
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

fn container_strategy() -> impl Strategy<Value = Container> {
    prop::sample::select(Container::ALL.to_vec())
}

fn mode_strategy() -> impl Strategy<Value = AutomationMode> {
    prop::sample::select(vec![
        AutomationMode::Standard,
        AutomationMode::AddAudioTrack,
        AutomationMode::ExtractImages,
        AutomationMode::Slideshow,
    ])
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        container_strategy().prop_map(Event::ContainerSelected),
        mode_strategy().prop_map(Event::AutomationModeSelected),
        any::<bool>().prop_map(Event::TwoPassToggled),
        (0u32..60).prop_map(Event::CrfChanged),
        (0u32..5000).prop_map(Event::BitrateChanged),
        prop::sample::select(AudioCodec::ALL.to_vec()).prop_map(Event::AudioCodecSelected),
        Just(Event::AudioImported(PathBuf::from(AUDIO))),
        any::<bool>().prop_map(Event::NormalizeToggled),
    ]
}

proptest! {
    #[test]
    fn prop_copy_never_carries_rate_control(events in prop::collection::vec(event_strategy(), 0..12)) {
        let mut state = ConfigState::default();
        for event in events {
            let _ = state.apply(event);
        }
        if state.is_copy() {
            prop_assert_eq!(state.quality, Quality::Copy);
            prop_assert_eq!(state.passing, Passing::Single);
            let passes = render_passes(&state, None);
            for pass in &passes {
                prop_assert!(!pass.iter().any(|a| a == "-crf" || a == "-b:v"));
            }
        }
    }

    #[test]
    fn prop_double_pass_implies_bitrate(events in prop::collection::vec(event_strategy(), 0..12)) {
        let mut state = ConfigState::default();
        for event in events {
            let _ = state.apply(event);
        }
        if state.passing == Passing::Double {
            prop_assert!(matches!(state.quality, Quality::Bitrate(_)));
            prop_assert!(!state.is_copy());
        }
        prop_assert!(state.allowed_audio.contains(&state.audio.codec));
    }

    #[test]
    fn prop_rejected_events_leave_state_unchanged(
        setup in prop::collection::vec(event_strategy(), 0..8),
        event in event_strategy(),
    ) {
        let mut state = ConfigState::default();
        for e in setup {
            let _ = state.apply(e);
        }
        let before = state.clone();
        if state.apply(event).is_err() {
            prop_assert_eq!(state, before);
        }
    }
}
