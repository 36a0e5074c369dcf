use super::*;

#[test]
fn element_names_split_type_and_index() {
    assert_eq!(
        parse_element_name("figure").unwrap(),
        (ElementType::Figure, 1)
    );
    assert_eq!(
        parse_element_name("figure12").unwrap(),
        (ElementType::Figure, 12)
    );
    assert!(parse_element_name("figure0").is_err());
    assert!(parse_element_name("figure07").is_err());
    assert!(parse_element_name("42").is_err());
    assert!(parse_element_name("sprite").is_err());
}

#[test]
fn image_properties_use_single_token_names() {
    let p = Property::parse("figure2", "anchor_x", "50%").unwrap();
    assert_eq!(p.element_type, ElementType::Figure);
    assert_eq!(p.index, 2);
    assert_eq!(p.name, "anchorX");
    assert_eq!(p.value, PropertyValue::Percentage(50.0));

    let p = Property::parse("background", "transition_duration", "2s").unwrap();
    assert_eq!(p.name, "transitionDuration");
    assert_eq!(p.value.time(), Some(2000.0));
}

#[test]
fn value_accepts_none_and_strings() {
    let p = Property::parse("music", "value", "none").unwrap();
    assert!(p.value.is_none());
    let p = Property::parse("music", "value", "theme").unwrap();
    assert_eq!(p.value.string(), Some("theme"));
}

#[test]
fn properties_are_scoped_to_their_element_type() {
    assert!(Property::parse("text", "alpha", "1").is_err());
    assert!(Property::parse("choice", "enabled", "false").is_ok());
    assert!(Property::parse("sound", "loop", "true").is_ok());
    assert!(Property::parse("video", "alpha", "50%").is_ok());
    assert!(Property::parse("effect", "parameters", "500").is_ok());
    assert!(Property::parse("animation", "transition_duration", "1s").is_err());
}

#[test]
fn keyframe_properties_keep_indexed_names() {
    let p = Property::parse("animation", "offset_2", "0.5").unwrap();
    assert_eq!(p.name, "offset_2");
    let p = Property::parse("animation", "value_1", "90deg").unwrap();
    assert_eq!(p.name, "value_1");
    assert_eq!(p.value.angle(), Some(90.0));
    assert!(Property::parse("animation", "value_0", "1").is_err());
    assert!(Property::parse("animation", "direction", "sideways").is_err());
    assert!(Property::parse("animation", "iteration_count", "infinite").is_ok());
}

#[test]
fn invalid_literal_is_reported() {
    let err = Property::parse("figure", "rotation", "fast").unwrap_err();
    assert!(err.to_string().contains("invalid value \"fast\""));
}

#[test]
fn element_properties_merge_and_reset() {
    let mut props =
        ElementProperties::parse("figure2", [("value", "alice"), ("alpha", "0.5")]).unwrap();
    assert_eq!(props.element_name(), "figure2");
    assert_eq!(props.get("alpha"), Some(&PropertyValue::Number(0.5)));

    props
        .apply(Property::parse("figure2", "alpha", "initial").unwrap())
        .unwrap();
    assert_eq!(props.get("alpha"), None);

    let other = Property::parse("figure3", "alpha", "1").unwrap();
    assert!(props.apply(other).is_err());
}
