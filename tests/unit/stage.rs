use futures::FutureExt as _;

use super::*;
use crate::clock::FrameClock;
use crate::foundation::core::Fps;
use crate::object::headless::{HeadlessLog, HeadlessObjects, ObjectEvent};

fn stage() -> (Rc<FrameClock>, Rc<HeadlessObjects>, Stage) {
    let clock = Rc::new(FrameClock::new(Fps::new(10, 1).unwrap()));
    let objects = Rc::new(HeadlessObjects::new(HeadlessLog::new()).with_clock(clock.clone()));
    let elements = StandardElements::new(objects.clone(), StageConfig::default());
    let stage = Stage::new(clock.clone(), elements);
    (clock, objects, stage)
}

fn props(element: &str, literals: &[(&str, &str)]) -> ElementProperties {
    ElementProperties::parse(element, literals.iter().copied()).unwrap()
}

fn run_all(stage: &Stage, batch: Vec<ElementProperties>) {
    let transitions = batch
        .into_iter()
        .map(|p| stage.transition(p, TransitionOptions::None).unwrap())
        .collect();
    Transition::run_all(transitions).now_or_never().unwrap().unwrap();
}

#[test]
fn slots_are_created_lazily_under_canonical_names() {
    let (_, _, stage) = stage();
    assert!(stage.element_names().is_empty());
    let first = stage.element("figure").unwrap();
    let second = stage.element("figure1").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    stage.element("figure2").unwrap();
    assert_eq!(stage.element_names(), vec!["figure1", "figure2"]);
    assert!(stage.element("sprite1").is_err());
    assert!(stage.element("figure01").is_err());
}

#[test]
fn batches_construct_every_object_before_attaching() {
    let (_, objects, stage) = stage();
    run_all(
        &stage,
        vec![
            props("background", &[("value", "room")]),
            props("figure", &[("value", "alice")]),
        ],
    );
    let kinds: Vec<&str> = objects
        .log()
        .events()
        .iter()
        .map(|e| match e {
            ObjectEvent::Created { .. } => "created",
            ObjectEvent::Attached { .. } => "attached",
            ObjectEvent::Detached { .. } => "detached",
            ObjectEvent::Destroyed { .. } => "destroyed",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "created", "attached", "attached"]);
}

#[test]
fn selectors_fan_out_to_matching_slots() {
    let (clock, _, stage) = stage();
    run_all(
        &stage,
        vec![
            props("background", &[("value", "room")]),
            props("figure", &[("value", "alice")]),
        ],
    );
    let figures = ElementPropertyMatcher::parse("figure*").unwrap();
    let figure_alpha = ElementPropertyMatcher::parse("figure.alpha").unwrap();
    let backgrounds = ElementPropertyMatcher::parse("background.value").unwrap();
    assert!(stage.has_transition(&figures));
    assert!(!stage.has_transition(&figure_alpha));
    assert!(stage.has_transition(&backgrounds));

    // Figures fade in over 500 ms, backgrounds over 1000 ms.
    let mut waiting = stage.wait(&figures);
    for _ in 0..5 {
        clock.next_frame();
    }
    assert!((&mut waiting).now_or_never().is_some());
    assert!(!stage.has_transition(&figures));
    assert!(stage.has_transition(&backgrounds));

    stage.snap(&ElementPropertyMatcher::any());
    assert!(!stage.has_transition(&ElementPropertyMatcher::any()));
    assert_eq!(clock.frame_callback_count(), 0);
}

#[test]
fn destroy_releases_every_object() {
    let (clock, objects, stage) = stage();
    run_all(
        &stage,
        vec![
            props("background", &[("value", "room")]),
            props("music", &[("value", "theme")]),
        ],
    );
    assert_eq!(objects.log().live_count(), 2);
    stage.destroy();
    assert_eq!(objects.log().live_count(), 0);
    assert!(stage.element_names().is_empty());
    assert_eq!(clock.frame_callback_count(), 0);
}

#[test]
fn transition_rejects_unknown_slots_before_running() {
    let (_, _, stage) = stage();
    let properties = ElementProperties::new(ElementType::Figure, 0);
    assert!(stage.transition(properties, TransitionOptions::None).is_err());
}
