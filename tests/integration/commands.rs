// Command synthesis snapshots: exact argv for the common option sets.
// Passes are rendered with fixed paths so plan ids never leak in.

use ffconv::engine::{
    AudioCodec, AudioParam, AudioParamsResult, AutomationMode, Container, Event, ImageFormat,
    PeakLevel, PlanKind, TimingWindow,
};
use insta::assert_snapshot;
use std::path::PathBuf;

use crate::common::assertions::*;
use crate::common::helpers::*;

fn to_string(cmd: &std::process::Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

#[test]
fn snapshot_standard_x264() {
    let state = state_with([]);
    let plan = plan_for(&state, &["/in/clip.mp4"], None);
    assert_eq!(plan.kind, PlanKind::Normal);

    let cmds = plan.to_commands("ffmpeg").unwrap();
    assert_eq!(cmds.len(), 1);
    assert_snapshot!(
        to_string(&cmds[0]),
        @"ffmpeg -i /in/clip.mp4 -loglevel error -c:v libx264 -crf 23 -pix_fmt yuv420p -map 0 -y /out/clip.mkv"
    );
}

#[cfg(unix)]
#[test]
fn snapshot_two_pass() {
    let state = state_with([Event::TwoPassToggled(true), Event::BitrateChanged(2000)]);
    let passes = render_passes(&state, None);
    assert_snapshot!(
        joined(&passes[0]),
        @"-i /in/clip.mp4 -loglevel error -an -c:v libx264 -b:v 2000k -pix_fmt yuv420p -pass 1 -passlogfile /tmp/ffconv_2pass/test/ffmpeg2pass -f rawvideo -y /dev/null"
    );
    assert_snapshot!(
        joined(&passes[1]),
        @"-i /in/clip.mp4 -loglevel error -c:v libx264 -b:v 2000k -pix_fmt yuv420p -pass 2 -passlogfile /tmp/ffconv_2pass/test/ffmpeg2pass -map 0 -y /out/clip.mkv"
    );
}

#[test]
fn snapshot_x264_options_with_time_window() {
    let state = state_with([
        Event::PresetSelected(Some("slow".into())),
        Event::TuneSelected(Some("film".into())),
        Event::AspectSelected(Some("16:9".into())),
        Event::FrameRateSelected(Some("25".into())),
    ]);
    let mut paths = fixed_paths();
    paths.seek = Some(TimingWindow::new(1_500, 90_000));
    let passes = ffconv::engine::Synthesizer::default()
        .passes(&state)
        .unwrap();
    let args = render_all(&passes, &paths).remove(0);
    assert_snapshot!(
        joined(&args),
        @"-ss 00:00:01.500 -t 00:01:30.000 -i /in/clip.mp4 -loglevel error -c:v libx264 -crf 23 -preset slow -tune film -aspect 16:9 -r 25 -pix_fmt yuv420p -map 0 -y /out/clip.mkv"
    );
}

#[test]
fn snapshot_copy_with_audio_params() {
    let state = state_with([
        Event::ContainerSelected(Container::CopyVideo),
        Event::AudioCodecSelected(AudioCodec::Aac),
        Event::AudioParams(AudioParamsResult {
            bitrate: Some(AudioParam::new("192k", "-b:a 192k")),
            rate: Some(AudioParam::new("48000 Hz", "-ar 48000")),
            ..Default::default()
        }),
    ]);
    let passes = render_passes(&state, None);
    assert_eq!(passes.len(), 1);
    assert_snapshot!(
        joined(&passes[0]),
        @"-i /in/clip.mp4 -loglevel error -c:v copy -c:a aac -b:a 192k -ar 48000 -map 0 -y /out/clip.mkv"
    );
}

#[test]
fn snapshot_extract_images() {
    let state = state_with([
        Event::AutomationModeSelected(AutomationMode::ExtractImages),
        Event::ImageFormatSelected(ImageFormat::Png),
        Event::FrameRateSelected(Some("1".into())),
    ]);
    let passes = render_passes(&state, None);
    assert_snapshot!(
        joined(&passes[0]),
        @"-i /in/clip.mp4 -loglevel error -an -r 1 -pix_fmt rgb24 -y /out/clip.mkv"
    );
}

#[test]
fn snapshot_slideshow_stages() {
    let state = state_with([Event::AutomationModeSelected(AutomationMode::Slideshow)]);
    let passes = render_passes(&state, Some(TimingWindow::new(0, 4_000)));
    assert_eq!(passes.len(), 2);
    assert_snapshot!(
        joined(&passes[0]),
        @"-i /in/clip.mp4 -loglevel error -y /out/clip.mkv"
    );
    assert_snapshot!(
        joined(&passes[1]),
        @"-loglevel error -framerate 1/4 -i /in/clip.mp4 -c:v libx264 -crf 23 -tune stillimage -vf fps=25,format=yuv420p -map 0 -y /out/clip.mkv"
    );
}

#[test]
fn test_pcm_depth_replaces_codec() {
    let state = state_with([
        Event::AudioCodecSelected(AudioCodec::Wav),
        Event::AudioParams(AudioParamsResult {
            depth: Some(AudioParam::new("24 bit", "-c:a pcm_s24le")),
            channel: Some(AudioParam::new("2", "-ac 2")),
            ..Default::default()
        }),
    ]);
    let args = &render_passes(&state, None)[0];
    assert_flag_value(args, "-c:a", "pcm_s24le");
    assert_lacks_arg(args, "pcm_s16le");
    assert_before(args, "pcm_s24le", "-ac");
}

#[test]
fn test_slideshow_with_imported_audio_stops_at_shortest() {
    let state = state_with([
        Event::AutomationModeSelected(AutomationMode::Slideshow),
        Event::AudioImported(PathBuf::from(AUDIO)),
    ]);
    let passes = render_passes(&state, Some(TimingWindow::new(0, 2_500)));
    let video = &passes[1];
    assert_flag_value(video, "-framerate", "1/2.5");
    assert_before(video, INPUT, AUDIO);
    assert_has_arg(video, "-shortest");
    assert_lacks_arg(&passes[0], AUDIO);
}

#[test]
fn test_normalization_gain_only_where_needed() {
    let state = state_with([
        Event::NormalizeToggled(true),
        Event::NormalizeThresholdChanged(-1.0),
        Event::PeakAnalysisCompleted(vec![
            PeakLevel { max_db: -6.3, mean_db: -22.0 },
            PeakLevel { max_db: -0.5, mean_db: -15.0 },
        ]),
    ]);
    let plan = plan_for(&state, &["/in/a.mp4", "/in/b.mp4"], None);
    let cmds = plan.invocations().unwrap();

    assert_flag_value(&cmds[0], "-af", "volume=5.3dB");
    assert_before(&cmds[0], "-af", "-c:v");
    assert_lacks_arg(&cmds[1], "-af");
}

#[test]
fn test_format_is_shell_safe() {
    let state = state_with([]);
    let plan = plan_for(&state, &["/in/it's here.mp4"], None);
    let text = plan.format("ffmpeg").unwrap();
    let words = shlex::split(&text).unwrap();
    assert_eq!(words[2], "/in/it's here.mp4");
    assert_eq!(words.last().unwrap(), "/out/it's here.mkv");
}
