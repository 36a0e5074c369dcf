use futures::FutureExt as _;

use super::*;
use crate::clock::FrameClock;
use crate::element::{ChoiceKind, ImageKind, TextKind, VideoKind};
use crate::foundation::core::{Fps, ScreenSize};
use crate::matcher::{AnyMatcher, NameMatcher};
use crate::object::ObjectFactory;
use crate::object::headless::{HeadlessLog, HeadlessObjects, ObjectEvent};

/// 10 fps: one frame every 100 ms.
struct Fixture {
    clock: Rc<FrameClock>,
    objects: Rc<HeadlessObjects>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_objects(|objects| objects)
    }

    fn with_objects(configure: impl FnOnce(HeadlessObjects) -> HeadlessObjects) -> Self {
        let clock = Rc::new(FrameClock::new(Fps::new(10, 1).unwrap()));
        let objects = HeadlessObjects::new(HeadlessLog::new()).with_clock(clock.clone());
        Self {
            clock,
            objects: Rc::new(configure(objects)),
        }
    }

    fn factory(&self) -> Rc<dyn ObjectFactory> {
        self.objects.clone()
    }

    fn background(&self) -> ContentElement<ImageKind> {
        let kind = ImageKind::new(
            self.factory(),
            ScreenSize {
                width: 1280,
                height: 720,
            },
            1.0,
        );
        ContentElement::new("background1", kind, self.clock.clone())
    }

    fn frames(&self, count: usize) {
        for _ in 0..count {
            self.clock.next_frame();
        }
    }

    fn number(&self, element_type: ElementType, source: &str, name: &str) -> f64 {
        let state = self.objects.log().find(element_type, source).unwrap();
        state.properties[name].as_number().unwrap()
    }

    fn destroyed(&self, element_type: ElementType, source: &str) -> bool {
        self.objects.log().find(element_type, source).unwrap().destroyed
    }
}

fn run(transition: Transition) -> StageResult<()> {
    transition.run().now_or_never().expect("transition stalled")
}

fn background(value: &str) -> ElementProperties {
    ElementProperties::new(ElementType::Background, 1).with_value(value)
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

fn assert_indexes_consistent<K: ContentKind>(element: &ContentElement<K>) {
    let state = element.inner.state.borrow();
    assert_eq!(state.object_transitions.len(), state.property_transitions.len());
    for (_, animation) in state.object_transitions.iter() {
        assert_eq!(
            state
                .property_transitions
                .iter()
                .filter(|(_, a)| *a == animation)
                .count(),
            1
        );
    }
}

#[test]
fn entering_object_fades_in() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();

    let state = f.objects.log().find(ElementType::Background, "a").unwrap();
    assert!(state.attached);
    assert_eq!(f.number(ElementType::Background, "a", "value"), 0.0);
    assert_eq!(element.running_transitions(), 1);
    assert!(element.has_transition(&NameMatcher("value".into())));
    assert!(!element.has_transition(&NameMatcher("alpha".into())));

    f.frames(5);
    assert_close(f.number(ElementType::Background, "a", "value"), 0.5);
    f.frames(5);
    assert_eq!(f.number(ElementType::Background, "a", "value"), 1.0);
    assert_eq!(element.running_transitions(), 0);
    assert_eq!(f.clock.frame_callback_count(), 0);
    assert_eq!(
        element.current_properties().unwrap(),
        background("a"),
    );
}

#[test]
fn changing_source_cross_fades() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);

    run(element.transition(background("b"), TransitionOptions::None)).unwrap();
    assert_eq!(element.running_transitions(), 2);
    f.frames(3);
    assert_close(f.number(ElementType::Background, "a", "value"), 0.7);
    assert_close(f.number(ElementType::Background, "b", "value"), 0.3);
    assert!(!f.destroyed(ElementType::Background, "a"));

    f.frames(7);
    assert!(f.destroyed(ElementType::Background, "a"));
    assert_eq!(f.number(ElementType::Background, "b", "value"), 1.0);
    let current = element.current_object().unwrap();
    assert_eq!(
        f.objects.log().object(current.id()).unwrap().source,
        "b"
    );
    assert_eq!(f.objects.log().live_count(), 1);
    assert_indexes_consistent(&element);
}

#[test]
fn superseding_transition_settles_previous_one_first() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);
    run(element.transition(background("b"), TransitionOptions::None)).unwrap();
    f.frames(5);

    run(element.transition(background("c"), TransitionOptions::None)).unwrap();
    assert!(f.destroyed(ElementType::Background, "a"));
    assert_eq!(element.running_transitions(), 2);
    assert_eq!(
        element.inner.state.borrow().property_transitions.get(&"value").len(),
        2
    );
    assert_eq!(f.number(ElementType::Background, "b", "value"), 1.0);
    assert_eq!(f.number(ElementType::Background, "c", "value"), 0.0);
    assert_indexes_consistent(&element);

    f.frames(10);
    assert!(f.destroyed(ElementType::Background, "b"));
    assert_eq!(element.running_transitions(), 0);
    assert_indexes_consistent(&element);
}

#[test]
fn snap_finishes_matching_transitions() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);
    run(element.transition(background("b"), TransitionOptions::None)).unwrap();

    element.snap(&NameMatcher("alpha".into()));
    assert_eq!(element.running_transitions(), 2);

    element.snap(&AnyMatcher);
    assert_eq!(element.running_transitions(), 0);
    assert!(f.destroyed(ElementType::Background, "a"));
    assert_eq!(f.number(ElementType::Background, "b", "value"), 1.0);
    assert_eq!(f.clock.frame_callback_count(), 0);
    assert!(element.wait(&AnyMatcher).now_or_never().is_some());
}

#[test]
fn wait_completes_when_transitions_settle() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    let mut waiting = element.wait(&AnyMatcher);
    f.frames(9);
    assert!((&mut waiting).now_or_never().is_none());
    f.frames(1);
    assert!(waiting.now_or_never().is_some());
}

#[test]
fn property_change_animates_existing_object() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);

    let moved = background("a")
        .with("alpha", PropertyValue::Number(0.5))
        .with("transitionDuration", PropertyValue::Time {
            value: 200.0,
            unit: crate::property::value::TimeUnit::Ms,
        });
    run(element.transition(moved, TransitionOptions::None)).unwrap();
    assert_eq!(f.objects.log().events().len(), 2);
    assert!(element.has_transition(&NameMatcher("alpha".into())));
    assert!(!element.has_transition(&NameMatcher("value".into())));
    f.frames(2);
    assert_eq!(f.number(ElementType::Background, "a", "alpha"), 0.5);
    assert_eq!(element.running_transitions(), 0);
}

#[test]
fn clearing_the_slot_fades_out_and_destroys() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);

    run(element.transition(ElementProperties::new(ElementType::Background, 1), TransitionOptions::None))
        .unwrap();
    assert!(element.current_object().is_none());
    f.frames(10);
    assert!(f.destroyed(ElementType::Background, "a"));
    assert_eq!(f.objects.log().live_count(), 0);
}

#[test]
fn empty_to_empty_is_a_no_op() {
    let f = Fixture::new();
    let element = f.background();
    let mut transition =
        element.transition(ElementProperties::new(ElementType::Background, 1), TransitionOptions::None);
    assert!(matches!(transition.resume().unwrap(), TransitionStep::Pending(_)));
    assert!(matches!(transition.resume().unwrap(), TransitionStep::Done));
    assert!(transition.is_done());
    assert!(f.objects.log().events().is_empty());
    assert!(element.current_object().is_none());
}

#[test]
fn failed_construction_leaves_slot_untouched() {
    let f = Fixture::with_objects(|objects| objects.with_failing_source("broken"));
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);
    f.objects.log().take_events();

    let err = run(element.transition(background("broken"), TransitionOptions::None)).unwrap_err();
    assert!(format!("{err:#}").contains("broken"));
    assert!(f.objects.log().events().is_empty());
    assert_eq!(
        element.current_properties().unwrap(),
        background("a"),
    );
    assert_eq!(element.running_transitions(), 0);
}

#[test]
fn text_waits_for_the_old_text_to_leave() {
    let f = Fixture::new();
    let element = ContentElement::new("text1", TextKind::new(f.factory(), true), f.clock.clone());
    let text = |value: &str| ElementProperties::new(ElementType::Text, 1).with_value(value);

    run(element.transition(text("hi"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);

    // Exit takes 50 ms; entering "bye" takes 150 ms after that.
    run(element.transition(text("bye"), TransitionOptions::None)).unwrap();
    assert_eq!(f.number(ElementType::Text, "bye", "value"), 0.0);
    f.frames(1);
    assert!(f.destroyed(ElementType::Text, "hi"));
    assert_close(f.number(ElementType::Text, "bye", "value"), 1.0 / 3.0);
    f.frames(1);
    assert_eq!(f.number(ElementType::Text, "bye", "value"), 1.0);
}

#[test]
fn animate_sets_and_deanimate_restores() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.snap(&AnyMatcher);

    let alpha = NameMatcher("alpha".into());
    element
        .animate(&alpha, &PropertyValue::Number(0.0), &PropertyValue::Number(0.5), 0.5)
        .unwrap();
    assert_eq!(f.number(ElementType::Background, "a", "alpha"), 0.25);
    assert_eq!(f.number(ElementType::Background, "a", "scaleX"), 1.0);

    element.deanimate(&alpha).unwrap();
    assert_eq!(f.number(ElementType::Background, "a", "alpha"), 1.0);
}

#[test]
fn non_numeric_properties_are_not_animatable() {
    let f = Fixture::new();
    let element = ContentElement::new("choice1", ChoiceKind::new(f.factory()), f.clock.clone());
    run(element.transition(
        ElementProperties::new(ElementType::Choice, 1).with_value("go"),
        TransitionOptions::None,
    ))
    .unwrap();

    let err = element
        .animate(
            &NameMatcher("enabled".into()),
            &PropertyValue::Boolean(true),
            &PropertyValue::Boolean(false),
            0.5,
        )
        .unwrap_err();
    assert!(err.to_string().contains("isn't animatable"));
}

#[test]
fn media_playback_counts_as_a_transition() {
    let f = Fixture::with_objects(|objects| objects.with_media_duration("bell", 300.0));
    let volume = Rc::new(crate::element::AudioVolumeSetting::unity());
    let element = ContentElement::new(
        "sound1",
        crate::element::AudioKind::new(f.factory(), volume.clone()),
        f.clock.clone(),
    );
    run(element.transition(
        ElementProperties::new(ElementType::Sound, 1).with_value("bell"),
        TransitionOptions::None,
    ))
    .unwrap();
    assert_eq!(volume.len(), 1);

    let playback = NameMatcher("playback".into());
    assert_eq!(element.running_transitions(), 0);
    assert!(element.has_transition(&playback));
    assert!(!element.has_transition(&NameMatcher("value".into())));
    let mut waiting = element.wait(&playback);
    f.frames(2);
    assert!((&mut waiting).now_or_never().is_none());
    f.frames(1);
    assert!(!element.has_transition(&playback));
    assert!(waiting.now_or_never().is_some());

    element.destroy();
    assert!(f.destroyed(ElementType::Sound, "bell"));
    assert!(volume.is_empty());
}

#[test]
fn instant_cross_fade_destroys_outgoing_object_last() {
    let f = Fixture::new();
    let element = ContentElement::new("video1", VideoKind::new(f.factory()), f.clock.clone());
    let video = |value: &str| ElementProperties::new(ElementType::Video, 1).with_value(value);
    run(element.transition(video("a"), TransitionOptions::None)).unwrap();
    let a = element.current_object().unwrap().id();

    run(element.transition(
        video("b").with("alpha", PropertyValue::Number(0.5)),
        TransitionOptions::None,
    ))
    .unwrap();
    assert!(f.destroyed(ElementType::Video, "a"));
    assert_eq!(f.number(ElementType::Video, "a", "alpha"), 0.5);
    assert_eq!(f.number(ElementType::Video, "b", "alpha"), 0.5);
    assert_eq!(f.number(ElementType::Video, "b", "value"), 1.0);
    assert_eq!(element.running_transitions(), 0);

    let events = f.objects.log().events();
    let last_for_a = events
        .iter()
        .rev()
        .find(|event| match event {
            ObjectEvent::Created { id, .. }
            | ObjectEvent::Attached { id }
            | ObjectEvent::Detached { id }
            | ObjectEvent::Destroyed { id } => *id == a,
        })
        .unwrap();
    assert_eq!(*last_for_a, ObjectEvent::Destroyed { id: a });
    assert_indexes_consistent(&element);
}

#[test]
fn destroy_releases_current_object() {
    let f = Fixture::new();
    let element = f.background();
    run(element.transition(background("a"), TransitionOptions::None)).unwrap();
    element.destroy();
    assert_eq!(element.running_transitions(), 0);
    assert!(element.current_object().is_none());
    let events = f.objects.log().events();
    let id = f.objects.log().find(ElementType::Background, "a").unwrap().id;
    assert!(events.contains(&ObjectEvent::Detached { id }));
    assert_eq!(events.last(), Some(&ObjectEvent::Destroyed { id }));
}
