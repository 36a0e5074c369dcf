use super::*;

fn props(element: &str, literals: &[(&str, &str)]) -> ElementProperties {
    ElementProperties::parse(element, literals.iter().copied()).unwrap()
}

fn image_options() -> ImageResolveOptions {
    ImageResolveOptions {
        value_changed: false,
        screen_width: 1280.0,
        screen_height: 720.0,
        image_width: 400.0,
        image_height: 600.0,
        figure: Some((1, 2)),
        avatar_position: Some((10.0, 20.0)),
    }
}

#[test]
fn figure_defaults_place_it_on_screen() {
    let r = ImageResolved::resolve(&props("figure", &[("value", "a")]), &image_options()).unwrap();
    assert_eq!(r.value, 1.0);
    assert_eq!(r.anchor_x, 200.0);
    assert_eq!(r.anchor_y, 600.0);
    assert!((r.position_x - 1280.0 / 3.0).abs() < 1e-9);
    assert_eq!(r.position_y, 720.0);
    assert_eq!(r.offset_x, 1280.0);
    assert_eq!(r.offset_y, 720.0);
    assert_eq!(r.pivot_x, 200.0);
    assert_eq!(r.pivot_y, 300.0);
    assert_eq!(r.scale_x, 1.0);
    assert_eq!(r.rotation, 0.0);
    assert_eq!(r.alpha, 1.0);
}

#[test]
fn background_and_avatar_defaults() {
    let bg = ImageResolved::resolve(&props("background", &[]), &image_options()).unwrap();
    assert_eq!(bg.anchor_x, 0.0);
    assert_eq!(bg.position_x, 0.0);
    assert_eq!(bg.offset_y, 0.0);

    let avatar = ImageResolved::resolve(&props("avatar", &[]), &image_options()).unwrap();
    assert_eq!(avatar.position_x, 10.0);
    assert_eq!(avatar.position_y, 20.0);
}

#[test]
fn explicit_image_values_use_their_bases() {
    let p = props(
        "figure",
        &[
            ("anchor_x", "25%"),
            ("position_y", "50%"),
            ("scale_x", "150%"),
            ("rotation", "0.25turn"),
            ("alpha", "0.5"),
            ("offset_x", "12px"),
        ],
    );
    let r = ImageResolved::resolve(&p, &image_options()).unwrap();
    assert_eq!(r.anchor_x, 100.0);
    assert_eq!(r.position_y, 360.0);
    assert_eq!(r.scale_x, 1.5);
    assert_eq!(r.rotation, 90.0);
    assert_eq!(r.alpha, 0.5);
    assert_eq!(r.offset_x, 12.0);
}

#[test]
fn value_changed_resolves_logical_value_to_zero() {
    let options = ImageResolveOptions {
        value_changed: true,
        ..image_options()
    };
    let r = ImageResolved::resolve(&props("figure", &[]), &options).unwrap();
    assert_eq!(r.value, 0.0);
    assert_eq!(TextResolved::resolve(true).value, 0.0);
    assert_eq!(TextResolved::resolve(false).value, 1.0);
}

#[test]
fn unknown_property_names_are_rejected() {
    let err = ImageResolved::resolve_property("volume", None, ElementType::Figure, &image_options())
        .unwrap_err();
    assert!(err.to_string().contains("unexpected property name"));
    assert!(TextResolved::resolve_property("alpha", false).is_err());
}

#[test]
fn named_access_matches_fields() {
    let r = ImageResolved::resolve(&props("figure", &[]), &image_options()).unwrap();
    for name in ImageResolved::NAMES {
        assert!(r.get(name).is_some(), "{name}");
    }
    assert_eq!(r.get("pivotY"), Some(ResolvedValue::Number(300.0)));
    assert_eq!(r.get("nope"), None);
}

#[test]
fn choice_audio_video_defaults() {
    let c = ChoiceResolved::resolve(&props("choice", &[]), false).unwrap();
    assert!(c.enabled);
    assert_eq!(c.script, "");
    assert_eq!(c.get("enabled"), Some(ResolvedValue::Boolean(true)));

    let music = AudioResolved::resolve(&props("music", &[]), false).unwrap();
    assert!(music.looping);
    assert_eq!(music.volume, 1.0);
    let sound = AudioResolved::resolve(&props("sound", &[("volume", "50%")]), false).unwrap();
    assert!(!sound.looping);
    assert_eq!(sound.volume, 0.5);

    let video = VideoResolved::resolve(&props("video", &[("loop", "true")]), true).unwrap();
    assert_eq!(video.value, 0.0);
    assert!(video.looping);
    assert_eq!(video.get("loop"), Some(ResolvedValue::Boolean(true)));
}

#[test]
fn animation_timing_is_resolved() {
    let p = props(
        "animation",
        &[
            ("value", "figure*.alpha"),
            ("duration", "2s"),
            ("delay", "100ms"),
            ("direction", "alternate"),
            ("iteration_count", "infinite"),
            ("value_1", "0"),
            ("value_2", "1"),
        ],
    );
    let r = AnimationResolved::resolve(&p).unwrap();
    assert!(r.matcher.is_some());
    assert_eq!(r.timing.duration, 2000.0);
    assert_eq!(r.timing.delay, 100.0);
    assert_eq!(r.timing.direction, AnimationDirection::Alternate);
    assert_eq!(r.timing.iteration_count, f64::INFINITY);
    assert_eq!(r.timing.easing, Easing::Linear);
    assert_eq!(r.keyframes.len(), 2);
    assert_eq!(r.keyframes[0].offset, 0.0);
    assert_eq!(r.keyframes[1].offset, 1.0);
}

#[test]
fn missing_offsets_are_spaced_evenly() {
    let p = props(
        "animation",
        &[
            ("value", "figure"),
            ("value_1", "0"),
            ("value_2", "1"),
            ("value_3", "0"),
            ("offset_3", "0.5"),
            ("value_4", "1"),
            ("value_5", "0"),
        ],
    );
    let r = AnimationResolved::resolve(&p).unwrap();
    let offsets: Vec<f64> = r.keyframes.iter().map(|k| k.offset).collect();
    assert_eq!(offsets, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn keyframe_validation() {
    let cases: &[&[(&str, &str)]] = &[
        &[("value", "figure"), ("value_1", "0")],
        &[("value", "figure"), ("value_1", "0"), ("value_3", "1")],
        &[("value", "figure"), ("value_1", "0"), ("value_2", "1"), ("offset_3", "1")],
        &[("value", "figure"), ("value_1", "0"), ("value_2", "1"), ("offset_1", "0.1")],
        &[("value", "figure"), ("value_1", "0"), ("value_2", "1"), ("offset_2", "0.9")],
        &[
            ("value", "figure"),
            ("value_1", "0"),
            ("value_2", "1"),
            ("value_3", "1"),
            ("value_4", "1"),
            ("offset_2", "0.6"),
            ("offset_3", "0.4"),
        ],
        &[
            ("value", "figure"),
            ("value_1", "0"),
            ("value_2", "1"),
            ("value_3", "1"),
            ("offset_2", "1.5"),
        ],
    ];
    for literals in cases {
        let err = AnimationResolved::resolve(&props("animation", literals)).unwrap_err();
        assert!(err.to_string().contains("validation error:"), "{err}");
    }
}

#[test]
fn keyframes_are_optional_without_selector() {
    let r = AnimationResolved::resolve(&props("animation", &[])).unwrap();
    assert!(r.matcher.is_none());
    assert!(r.keyframes.is_empty());
    assert!(r.segment(0.5).is_none());
}

#[test]
fn segment_fraction_is_normalized() {
    let p = props(
        "animation",
        &[
            ("value", "figure"),
            ("value_1", "0"),
            ("value_2", "1"),
            ("offset_2", "0.5"),
            ("value_3", "0"),
        ],
    );
    let r = AnimationResolved::resolve(&p).unwrap();
    let s = r.segment(0.25).unwrap();
    assert_eq!(s.start.offset, 0.0);
    assert_eq!(s.end.offset, 0.5);
    assert!((s.fraction - 0.5).abs() < 1e-12);

    let s = r.segment(0.75).unwrap();
    assert_eq!(s.start.offset, 0.5);
    assert!((s.fraction - 0.5).abs() < 1e-12);

    let s = r.segment(1.0).unwrap();
    assert_eq!(s.end.offset, 1.0);
    assert_eq!(s.fraction, 1.0);
}

#[test]
fn effect_parameters_parse_as_json_list() {
    let p = props(
        "effect",
        &[("value", "cross-fade"), ("parameters", "500, \"x\"")],
    );
    let r = EffectResolved::resolve(&p).unwrap();
    assert_eq!(r.name.as_deref(), Some("cross-fade"));
    assert_eq!(
        r.parameters,
        vec![serde_json::json!(500), serde_json::json!("x")]
    );

    let empty = EffectResolved::resolve(&props("effect", &[])).unwrap();
    assert_eq!(empty.name, None);
    assert!(empty.parameters.is_empty());

    let bad = props("effect", &[("value", "cross-fade"), ("parameters", "{")]);
    assert!(EffectResolved::resolve(&bad).is_err());
}
