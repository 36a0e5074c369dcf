use futures::FutureExt as _;

use super::*;
use crate::clock::FrameClock;
use crate::foundation::core::Fps;

fn objects() -> HeadlessObjects {
    HeadlessObjects::new(HeadlessLog::new())
}

#[test]
fn lifecycle_is_logged_in_order() {
    let objects = objects();
    let image = objects
        .create_image(ElementType::Figure, "alice")
        .now_or_never()
        .unwrap()
        .unwrap();
    image.attach();
    image.detach();
    image.destroy();
    let id = image.id();
    assert_eq!(
        objects.log().events(),
        vec![
            ObjectEvent::Created {
                id,
                element_type: ElementType::Figure,
                source: "alice".to_string()
            },
            ObjectEvent::Attached { id },
            ObjectEvent::Detached { id },
            ObjectEvent::Destroyed { id },
        ]
    );
    assert_eq!(objects.log().live_count(), 0);
}

#[test]
fn properties_are_typed_and_known() {
    let objects = objects();
    let choice = objects.create_choice("go").now_or_never().unwrap().unwrap();
    assert_eq!(choice.property("enabled").unwrap(), ResolvedValue::Boolean(true));
    choice
        .set_property("script", ResolvedValue::String("jump".into()))
        .unwrap();
    assert_eq!(
        objects.log().find(ElementType::Choice, "go").unwrap().properties["script"],
        ResolvedValue::String("jump".into())
    );
    assert!(choice.set_property("enabled", ResolvedValue::Number(1.0)).is_err());
    let err = choice.property("alpha").unwrap_err();
    assert!(err.to_string().contains("property error:"));
}

#[test]
fn failing_sources_do_not_create_objects() {
    let objects = objects().with_failing_source("broken");
    let result = objects
        .create_image(ElementType::Background, "broken")
        .now_or_never()
        .unwrap();
    assert!(result.is_err());
    assert!(objects.log().events().is_empty());
}

#[test]
fn text_counts_grapheme_clusters() {
    let objects = objects();
    let text = objects
        .create_text(ElementType::Text, "ae\u{301}👍🏽")
        .now_or_never()
        .unwrap()
        .unwrap();
    assert_eq!(text.transition_element_count(), 3);
}

#[test]
fn media_plays_for_its_duration() {
    let clock = Rc::new(FrameClock::new(Fps::new(10, 1).unwrap()));
    let objects = objects()
        .with_clock(clock.clone())
        .with_media_duration("bell", 200.0);
    let sound = objects
        .create_audio(ElementType::Sound, "bell")
        .now_or_never()
        .unwrap()
        .unwrap();
    assert!(!sound.is_playing());
    sound.attach();
    assert!(sound.is_playing());
    let mut finished = sound.playback_finished();
    assert!((&mut finished).now_or_never().is_none());

    clock.next_frame();
    assert!(sound.is_playing());
    clock.next_frame();
    assert!(!sound.is_playing());
    assert!(finished.now_or_never().is_some());
}

#[test]
fn snapping_and_looping_media() {
    let objects = objects();
    let music = objects
        .create_audio(ElementType::Music, "theme")
        .now_or_never()
        .unwrap()
        .unwrap();
    music.set_property("loop", ResolvedValue::Boolean(true)).unwrap();
    music.attach();
    assert!(music.is_looping());
    assert!(music.is_playing());
    let finished = music.playback_finished();
    music.snap_playback();
    assert!(!music.is_playing());
    assert!(finished.now_or_never().is_some());
}

#[test]
fn effective_volume_multiplies_setting() {
    let objects = objects();
    let voice = objects
        .create_audio(ElementType::Voice, "v1")
        .now_or_never()
        .unwrap()
        .unwrap();
    voice.set_property("volume", ResolvedValue::Number(0.5)).unwrap();
    voice.set_setting_volume(0.5);
    let object = objects.get(voice.id()).unwrap();
    assert_eq!(object.effective_volume(), 0.25);
}

#[test]
fn layers_track_opacity() {
    let layer = HeadlessLayer::new();
    assert!(!layer.is_visible());
    layer.show();
    layer.set_opacity(0.25);
    assert!(layer.is_visible());
    assert_eq!(layer.opacity(), 0.25);
    layer.hide();
    assert!(!layer.is_visible());
}

#[test]
fn destroyed_objects_reject_writes() {
    let objects = objects();
    let image = objects
        .create_image(ElementType::Figure, "alice")
        .now_or_never()
        .unwrap()
        .unwrap();
    image.set_property("alpha", ResolvedValue::Number(0.5)).unwrap();
    image.destroy();
    let err = image
        .set_property("alpha", ResolvedValue::Number(1.0))
        .unwrap_err();
    assert!(err.to_string().contains("destroyed"), "{err}");
    assert_eq!(
        objects.log().find(ElementType::Figure, "alice").unwrap().properties["alpha"],
        ResolvedValue::Number(0.5)
    );
}

#[test]
fn live_only_log_forgets_destroyed_objects() {
    let objects = HeadlessObjects::new(HeadlessLog::live_only());
    let create = |source: &str| {
        let image = objects
            .create_image(ElementType::Figure, source)
            .now_or_never()
            .unwrap()
            .unwrap();
        image.attach();
        image
    };
    for i in 0..50 {
        create(&format!("extra{i}")).destroy();
    }
    let kept = create("alice");
    let bob = create("bob");
    bob.destroy();

    let log = objects.log();
    assert_eq!(log.live_count(), 1);
    assert!(log.object(bob.id()).is_none());
    assert!(log.events().is_empty());
    let attached: Vec<_> = log.attached().into_iter().map(|o| o.source).collect();
    assert_eq!(attached, vec!["alice".to_string()]);
    assert!(log.object(kept.id()).unwrap().attached);
}
