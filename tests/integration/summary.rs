// Summary formatter: row order per mode and values that track the state

use ffconv::engine::summary::{render, rows};
use ffconv::engine::{AutomationMode, Container, Event, RotateResult, TimingWindow};
use std::path::PathBuf;

use crate::common::helpers::*;

fn labels(rows: Vec<(&'static str, String)>) -> Vec<&'static str> {
    rows.into_iter().map(|(label, _)| label).collect()
}

fn value<'a>(rows: &'a [(&'static str, String)], label: &str) -> &'a str {
    rows.iter()
        .find(|(l, _)| *l == label)
        .map(|(_, v)| v.as_str())
        .unwrap_or_else(|| panic!("no row '{}'", label))
}

#[test]
fn test_standard_rows_in_order() {
    let state = state_with([]);
    let labels = labels(rows(&state, 1, None));
    assert_eq!(labels.first(), Some(&"File to queue"));
    assert_eq!(labels.last(), Some(&"Stop at shortest"));
    let pos = |l: &str| labels.iter().position(|x| *x == l).unwrap();
    assert!(pos("Video bitrate") < pos("CRF"));
    assert!(pos("Orientation") < pos("Audio stream added"));
    assert!(pos("Audio normalization") < pos("Map"));
}

#[test]
fn test_values_follow_state() {
    let state = state_with([
        Event::TwoPassToggled(true),
        Event::Rotate(RotateResult {
            filter: Some("transpose=1".into()),
            label: "Rotate 90° clockwise".into(),
        }),
    ]);
    let rows = rows(&state, 4, Some(TimingWindow::new(0, 60_000)));
    assert_eq!(value(&rows, "File to queue"), "4");
    assert_eq!(value(&rows, "Video bitrate"), "1500k");
    assert_eq!(value(&rows, "CRF"), "-");
    assert_eq!(value(&rows, "Pass"), "double");
    assert_eq!(value(&rows, "Applied filters"), "transpose=1");
    assert_eq!(value(&rows, "Orientation"), "Rotate 90° clockwise");
    assert_eq!(
        value(&rows, "Time selection"),
        "start 00:00:00.000 | duration 00:01:00.000"
    );
}

#[test]
fn test_copy_rows_skip_encoder_settings() {
    let state = state_with([Event::ContainerSelected(Container::CopyVideo)]);
    let labels = labels(rows(&state, 1, None));
    assert!(!labels.contains(&"CRF"));
    assert!(!labels.contains(&"Preset h264"));
    assert!(labels.contains(&"Video rate"));
}

#[test]
fn test_slideshow_summary() {
    let state = state_with([
        Event::AutomationModeSelected(AutomationMode::Slideshow),
        Event::AudioImported(PathBuf::from(AUDIO)),
    ]);
    let rows = rows(&state, 12, Some(TimingWindow::new(0, 3_500)));
    assert_eq!(value(&rows, "Uploaded images"), "12");
    assert_eq!(value(&rows, "Time to slide between images"), "3.5 s");
    assert_eq!(value(&rows, "Audio stream added"), AUDIO);
    assert_eq!(value(&rows, "Stop at shortest"), "Yes");
    assert_eq!(value(&rows, "Map"), "-map 0:v:0 -map 1:a:0");
}

#[test]
fn test_render_aligns_values() {
    let state = state_with([Event::AutomationModeSelected(AutomationMode::ExtractImages)]);
    let text = render(&state, 2, None);
    assert!(text.starts_with("SUMMARY\n\n"));

    let columns: Vec<usize> = text
        .lines()
        .skip(2)
        .map(|line| {
            let after = &line[line.find(':').unwrap() + 1..];
            line.len() - after.trim_start().len()
        })
        .collect();
    assert!(columns.windows(2).all(|w| w[0] == w[1]), "{}", text);
}
