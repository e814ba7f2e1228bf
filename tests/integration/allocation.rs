// Output numbering and run-time validation against a real directory tree

use ffconv::engine::{
    AutomationMode, ConfigState, ConvError, Event, FileInspector, FsInspector, Inspection,
    PlanKind, Synthesizer, TimingWindow, collect_sources, next_suffix, validate,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::common::helpers::*;

fn touch(path: &Path) {
    fs::write(path, b"").unwrap();
}

#[test]
fn test_next_image_dir_after_gap() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("foo-IMAGES_1")).unwrap();
    fs::create_dir(tmp.path().join("foo-IMAGES_3")).unwrap();
    fs::create_dir(tmp.path().join("bar-IMAGES_9")).unwrap();
    touch(&tmp.path().join("foo-IMAGES_x"));

    assert_eq!(next_suffix(tmp.path(), "foo-IMAGES_").unwrap(), 4);
    assert_eq!(next_suffix(tmp.path(), "baz-IMAGES_").unwrap(), 1);
}

#[test]
fn test_slideshow_number_counts_existing_videos() {
    let tmp = TempDir::new().unwrap();
    touch(&tmp.path().join("Slideshow_2.mp4"));
    assert_eq!(next_suffix(tmp.path(), "Slideshow_").unwrap(), 3);
}

#[test]
fn test_missing_destination_is_validation_error() {
    let tmp = TempDir::new().unwrap();
    let err = next_suffix(&tmp.path().join("nope"), "Slideshow_").unwrap_err();
    assert!(matches!(err, ConvError::Validation { .. }));
}

#[test]
fn test_images_plan_reserves_numbers_within_run() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("take.mp4");
    let b = tmp.path().join("take.mkv");
    touch(&a);
    touch(&b);
    fs::create_dir(tmp.path().join("take-IMAGES_1")).unwrap();

    let state = state_with([Event::AutomationModeSelected(AutomationMode::ExtractImages)]);
    let inspection = Inspection::new(vec![a, b], Some(tmp.path()));
    let plan = Synthesizer::default().synthesize(&state, &inspection).unwrap();

    assert_eq!(plan.kind, PlanKind::SaveImages);
    let dirs = plan.dirs_to_create();
    assert_eq!(
        dirs,
        vec![tmp.path().join("take-IMAGES_2"), tmp.path().join("take-IMAGES_3")]
    );
    assert_eq!(
        plan.jobs[0].output,
        tmp.path().join("take-IMAGES_2").join("take-%d.jpg")
    );
    // nothing is created while planning
    assert!(!tmp.path().join("take-IMAGES_2").exists());
}

#[test]
fn test_slideshow_plan_stages_then_renders_once() {
    let tmp = TempDir::new().unwrap();
    let pics = tmp.path().join("pics");
    fs::create_dir(&pics).unwrap();
    for name in ["b.png", "a.jpg", "notes.txt"] {
        touch(&pics.join(name));
    }
    touch(&pics.join("Slideshow_1.mkv"));

    let sources = collect_sources(&[pics.clone()], true);
    assert_eq!(sources, vec![pics.join("a.jpg"), pics.join("b.png")]);

    let state = state_with([Event::AutomationModeSelected(AutomationMode::Slideshow)]);
    let inspection = Inspection::new(sources, None);
    let plan = Synthesizer::default()
        .with_timing(Some(TimingWindow::new(0, 5_000)))
        .synthesize(&state, &inspection)
        .unwrap();

    assert_eq!(plan.output, Some(pics.join("Slideshow_2.mkv")));
    let cmds = plan.invocations().unwrap();
    assert_eq!(cmds.len(), 3);

    let stage = plan.stage_input.clone().unwrap();
    assert!(stage.ends_with("%04d.png"));
    assert_eq!(plan.jobs[1].output, stage.with_file_name("0002.png"));
    assert!(cmds[2].contains(&stage.to_string_lossy().to_string()));
    assert!(plan.dirs_to_create().contains(&stage.parent().unwrap().to_path_buf()));
}

#[test]
fn test_add_audio_without_track_fails_validation() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("clip.mp4");
    touch(&src);

    let state = state_with([Event::AutomationModeSelected(AutomationMode::AddAudioTrack)]);
    let err = validate(&state, None, &FsInspector::default(), &[src]).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("No audio track imported"));
}

#[test]
fn test_validate_accepts_then_plans() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    fs::create_dir(&out).unwrap();
    let src = tmp.path().join("clip.avi");
    touch(&src);

    let inspection = validate(
        &ConfigState::default(),
        None,
        &FsInspector::new(Some(out.clone()), false),
        &[src.clone()],
    )
    .unwrap()
    .unwrap();
    assert_eq!(inspection.destination(), out.as_path());

    let plan = Synthesizer::default()
        .synthesize(&ConfigState::default(), &inspection)
        .unwrap();
    assert_eq!(plan.jobs[0].output, out.join("clip.mkv"));
}

struct Cancelled;

impl FileInspector for Cancelled {
    fn inspect(
        &self,
        _state: &ConfigState,
        _sources: &[PathBuf],
    ) -> ffconv::engine::ConvResult<Option<Inspection>> {
        Ok(None)
    }
}

#[test]
fn test_cancelled_inspection_yields_nothing() {
    let result = validate(&ConfigState::default(), None, &Cancelled, &[PathBuf::from(INPUT)]);
    assert_eq!(result.unwrap(), None);
}

#[test]
fn test_same_stem_sources_cannot_share_an_output() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    fs::create_dir(&out).unwrap();
    for dir in ["a", "b"] {
        fs::create_dir(tmp.path().join(dir)).unwrap();
    }
    let a = tmp.path().join("a").join("clip.mp4");
    let b = tmp.path().join("b").join("clip.avi");
    touch(&a);
    touch(&b);
    let sources = vec![a.clone(), b.clone()];

    let err = validate(
        &ConfigState::default(),
        None,
        &FsInspector::new(Some(out.clone()), false),
        &sources,
    )
    .unwrap_err();
    assert!(matches!(err, ConvError::Validation { .. }));
    assert!(err.to_string().contains("Two queued files would write"));

    let shared = Inspection::new(sources.clone(), Some(out.as_path()));
    let err = Synthesizer::default()
        .synthesize(&ConfigState::default(), &shared)
        .unwrap_err();
    assert!(matches!(err, ConvError::Validation { .. }));

    // each next to its own source is fine
    let apart = validate(&ConfigState::default(), None, &FsInspector::default(), &sources)
        .unwrap()
        .unwrap();
    let plan = Synthesizer::default()
        .synthesize(&ConfigState::default(), &apart)
        .unwrap();
    assert_ne!(plan.jobs[0].output, plan.jobs[1].output);
}
