// Filter compositor tests: the -vf graph is always assembled in the same
// order no matter which dialog ran first, and disabling everything again
// yields no -vf at all.

use ffconv::engine::{
    ConfigState, Container, Event, LacingResult, ResizeResult, RotateResult, compose,
};
use proptest::prelude::*;

use crate::common::assertions::*;
use crate::common::helpers::*;

fn rotate_90() -> Event {
    Event::Rotate(RotateResult {
        filter: Some("transpose=1".into()),
        label: "Rotate 90° clockwise".into(),
    })
}

fn resize() -> Event {
    Event::Resize(ResizeResult {
        scale: Some("scale=1280:720".into()),
        setdar: Some("setdar=16/9".into()),
        setsar: None,
    })
}

#[test]
fn test_graph_order_independent_of_dialog_order() {
    let state = state_with([
        Event::Denoise(Some("hqdn3d".into())),
        Event::Lacing(LacingResult::Deinterlace("yadif".into())),
        rotate_90(),
        resize(),
        Event::Crop(Some("640:480:0:0".into())),
    ]);
    assert_eq!(
        state.compose(),
        "crop=640:480:0:0,scale=1280:720,setdar=16/9,transpose=1,yadif,hqdn3d"
    );

    let passes = render_passes(&state, None);
    assert_flag_value(
        &passes[0],
        "-vf",
        "crop=640:480:0:0,scale=1280:720,setdar=16/9,transpose=1,yadif,hqdn3d",
    );
}

#[test]
fn test_clearing_filters_drops_vf() {
    let mut state = state_with([rotate_90(), Event::Denoise(Some("hqdn3d".into()))]);
    state.apply(Event::FiltersCleared).unwrap();
    assert!(state.filters.is_empty());
    assert_eq!(state.filters.rotate_label, "");

    let passes = render_passes(&state, None);
    assert_lacks_arg(&passes[0], "-vf");

    let err = state.apply(Event::FiltersCleared).unwrap_err();
    assert!(err.to_string().contains("No filter enabled"));
}

#[test]
fn test_deinterlace_and_interlace_are_exclusive() {
    let mut state = state_with([Event::Deinterlace(Some("yadif".into()))]);
    assert!(state.apply(Event::Interlace(Some("interlace".into()))).is_err());

    // the lacing dialog replaces one with the other
    state
        .apply(Event::Lacing(LacingResult::Interlace("interlace".into())))
        .unwrap();
    assert_eq!(state.filters.deinterlace, None);
    assert_eq!(state.compose(), "interlace");
}

#[test]
fn test_filters_unavailable_for_stream_copy() {
    let mut state = state_with([resize(), Event::ContainerSelected(Container::CopyVideo)]);
    assert!(state.filters.is_empty());
    assert!(state.apply(rotate_90()).is_err());
}

#[test]
fn test_two_pass_carries_filters_in_both_passes() {
    let state = state_with([Event::TwoPassToggled(true), rotate_90()]);
    for pass in render_passes(&state, None) {
        assert_flag_value(&pass, "-vf", "transpose=1");
    }
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

#[derive(Debug, Clone)]
enum Slot {
    Crop,
    Resize,
    Rotate,
    Lacing,
    Denoise,
}

impl Slot {
    fn enable(&self) -> Event {
        match self {
            Slot::Crop => Event::Crop(Some("crop=100:100:0:0".into())),
            Slot::Resize => resize(),
            Slot::Rotate => rotate_90(),
            Slot::Lacing => Event::Lacing(LacingResult::Deinterlace("yadif".into())),
            Slot::Denoise => Event::Denoise(Some("hqdn3d".into())),
        }
    }

    fn disable(&self) -> Event {
        match self {
            Slot::Crop => Event::Crop(None),
            Slot::Resize => Event::Resize(ResizeResult::default()),
            Slot::Rotate => Event::Rotate(RotateResult::default()),
            Slot::Lacing => Event::Lacing(LacingResult::Off),
            Slot::Denoise => Event::Denoise(None),
        }
    }
}

fn slots() -> impl Strategy<Value = Vec<Slot>> {
    Just(vec![Slot::Crop, Slot::Resize, Slot::Rotate, Slot::Lacing, Slot::Denoise])
        .prop_shuffle()
}

proptest! {
    #[test]
    fn prop_any_enable_order_gives_same_graph(order in slots()) {
        let mut state = ConfigState::default();
        for slot in &order {
            state.apply(slot.enable()).unwrap();
        }
        prop_assert_eq!(
            state.compose(),
            "crop=100:100:0:0,scale=1280:720,setdar=16/9,transpose=1,yadif,hqdn3d"
        );
    }

    #[test]
    fn prop_disabling_in_any_order_composes_empty(enable in slots(), disable in slots()) {
        let mut state = ConfigState::default();
        for slot in &enable {
            state.apply(slot.enable()).unwrap();
        }
        for slot in &disable {
            state.apply(slot.disable()).unwrap();
        }
        prop_assert_eq!(compose(&state.filters), "");
        prop_assert!(state.filters.is_empty());
    }
}
