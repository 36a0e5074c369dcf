use super::*;

const POSITION: &[ValueKind] = &[ValueKind::Zero, ValueKind::Length, ValueKind::Percentage];
const SCALAR: &[ValueKind] = &[ValueKind::Number, ValueKind::Percentage];

#[test]
fn kinds_are_tried_in_order() {
    assert_eq!(PropertyValue::parse("0", POSITION), Some(PropertyValue::Zero));
    assert_eq!(PropertyValue::parse("0", SCALAR), Some(PropertyValue::Number(0.0)));
    assert_eq!(
        PropertyValue::parse("12.5px", POSITION),
        Some(PropertyValue::Length(12.5))
    );
    assert_eq!(
        PropertyValue::parse("50%", POSITION),
        Some(PropertyValue::Percentage(50.0))
    );
    assert_eq!(PropertyValue::parse("12", POSITION), None);
}

#[test]
fn initial_is_always_accepted() {
    assert_eq!(
        PropertyValue::parse("initial", &[ValueKind::Boolean]),
        Some(PropertyValue::Initial)
    );
}

#[test]
fn units_resolve_to_canonical_values() {
    let deg = PropertyValue::parse("0.5turn", &[ValueKind::Angle]).unwrap();
    assert_eq!(deg.angle(), Some(180.0));
    let rad = PropertyValue::parse("3.141592653589793rad", &[ValueKind::Angle]).unwrap();
    assert!((rad.angle().unwrap() - 180.0).abs() < 1e-9);

    let ms = PropertyValue::parse("250ms", &[ValueKind::Time]).unwrap();
    assert_eq!(ms.time(), Some(250.0));
    let s = PropertyValue::parse("1.5s", &[ValueKind::Time]).unwrap();
    assert_eq!(s.time(), Some(1500.0));

    assert_eq!(PropertyValue::Percentage(50.0).percentage(800.0), Some(400.0));
    assert_eq!(PropertyValue::Zero.zero(), Some(0.0));
    assert_eq!(PropertyValue::Zero.number(), None);
}

#[test]
fn numbers_reject_non_finite_literals_except_infinite() {
    assert_eq!(PropertyValue::parse("NaN", &[ValueKind::Number]), None);
    assert_eq!(PropertyValue::parse("inf", &[ValueKind::Number]), None);
    assert_eq!(
        PropertyValue::parse("infinite", &[ValueKind::Number]),
        Some(PropertyValue::Number(f64::INFINITY))
    );
}

#[test]
fn enums_booleans_and_strings() {
    let dirs: &[ValueKind] = &[ValueKind::Enum(&["normal", "reverse"])];
    assert_eq!(
        PropertyValue::parse("reverse", dirs),
        Some(PropertyValue::Enum("reverse".to_string()))
    );
    assert_eq!(PropertyValue::parse("sideways", dirs), None);
    assert_eq!(
        PropertyValue::parse("true", &[ValueKind::Boolean]),
        Some(PropertyValue::Boolean(true))
    );
    assert_eq!(
        PropertyValue::parse("none", &[ValueKind::None, ValueKind::String]),
        Some(PropertyValue::None)
    );
    assert_eq!(
        PropertyValue::parse("forest", &[ValueKind::None, ValueKind::String]),
        Some(PropertyValue::String("forest".to_string()))
    );
}

#[test]
fn display_round_trips_literals() {
    for (literal, kinds) in [
        ("12px", POSITION),
        ("50%", POSITION),
        ("0", POSITION),
        ("0.5", SCALAR),
    ] {
        let v = PropertyValue::parse(literal, kinds).unwrap();
        assert_eq!(v.to_string(), literal);
    }
}
