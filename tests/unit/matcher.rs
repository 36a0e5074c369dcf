use super::*;

#[test]
fn slot_glob_with_implicit_any_property() {
    let m = ElementPropertyMatcher::parse("figure*").unwrap();
    let props = m.property_matcher("figure2");
    assert!(props.matches("alpha"));
    assert!(props.matches("value"));
    assert!(m.property_matcher("background").is_empty());
}

#[test]
fn property_names_are_single_token() {
    let m = ElementPropertyMatcher::parse("figure3 . anchor_x").unwrap();
    let props = m.property_matcher("figure3");
    assert!(props.matches("anchorX"));
    assert!(!props.matches("anchorY"));
    assert!(!props.matches("anchor_x"));
}

#[test]
fn singular_index_is_optional_in_selector() {
    let m = ElementPropertyMatcher::parse("figure.alpha").unwrap();
    assert!(m.property_matcher("figure1").matches("alpha"));
    assert!(m.property_matcher("figure").matches("alpha"));
    assert!(!m.property_matcher("figure2").matches("alpha"));
    assert!(!m.property_matcher("figure11").matches("alpha"));
}

#[test]
fn several_selectors_union_per_slot() {
    let m = ElementPropertyMatcher::parse_all(["background.alpha", "background.scale_*", "text"])
        .unwrap();
    let bg = m.property_matcher("background");
    assert!(bg.matches("alpha"));
    assert!(bg.matches("scaleX"));
    assert!(!bg.matches("value"));
    assert!(m.property_matcher("text").matches("value"));
}

#[test]
fn any_matches_everything() {
    let m = ElementPropertyMatcher::any();
    assert!(m.property_matcher("whatever7").matches("playback"));
    assert!(AnyMatcher.matches(""));
}

#[test]
fn too_many_segments_is_an_error() {
    let err = ElementPropertyMatcher::parse("a.b.c").unwrap_err();
    assert!(err.to_string().contains("matcher error:"));
    assert!(ElementPropertyMatcher::parse("figure[.alpha").is_err());
}

#[test]
fn property_case_conversion() {
    assert_eq!(to_property_case("anchor_x"), "anchorX");
    assert_eq!(to_property_case("transition_duration"), "transitionDuration");
    assert_eq!(to_property_case("_private"), "_private");
    assert_eq!(to_property_case("value"), "value");
    assert_eq!(to_property_case("trailing_"), "trailing_");
}

#[test]
fn name_matcher_is_exact() {
    let m = NameMatcher("playback".to_string());
    assert!(m.matches("playback"));
    assert!(!m.matches("play"));
    assert_eq!(GlobPattern::new("a*").unwrap().as_str(), "a*");
}
