use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn endpoints_are_pinned() {
    for e in [
        Easing::Linear,
        Easing::EASE,
        Easing::EASE_IN,
        Easing::EASE_OUT,
        Easing::EASE_IN_OUT,
        Easing::MATERIAL_EMPHASIZED_DECELERATE,
    ] {
        assert!(approx(e.apply(0.0, false), 0.0), "{e:?}");
        assert!(approx(e.apply(1.0, false), 1.0), "{e:?}");
    }
}

#[test]
fn ease_in_out_is_symmetric_around_half() {
    let e = Easing::EASE_IN_OUT;
    assert!(approx(e.apply(0.5, false), 0.5));
    let a = e.apply(0.2, false);
    let b = e.apply(0.8, false);
    assert!(approx(a + b, 1.0));
}

#[test]
fn ease_in_lags_and_ease_out_leads() {
    assert!(Easing::EASE_IN.apply(0.3, false) < 0.3);
    assert!(Easing::EASE_OUT.apply(0.3, false) > 0.3);
}

#[test]
fn bezier_is_monotonic() {
    let mut last = 0.0;
    for i in 0..=100 {
        let v = Easing::EASE.apply(f64::from(i) / 100.0, false);
        assert!(v + 1e-9 >= last);
        last = v;
    }
}

#[test]
fn step_end_holds_until_the_end() {
    let e = Easing::STEP_END;
    assert_eq!(e.apply(0.0, false), 0.0);
    assert_eq!(e.apply(0.99, false), 0.0);
    assert_eq!(e.apply(1.0, false), 1.0);
}

#[test]
fn step_start_jumps_immediately_unless_before() {
    let e = Easing::STEP_START;
    assert_eq!(e.apply(0.0, false), 1.0);
    assert_eq!(e.apply(0.0, true), 0.0);
    assert_eq!(e.apply(0.5, false), 1.0);
}

#[test]
fn multi_step_positions() {
    let both = Easing::Steps {
        count: 2,
        position: StepPosition::Both,
    };
    assert!(approx(both.apply(0.0, false), 1.0 / 3.0));
    assert!(approx(both.apply(0.6, false), 2.0 / 3.0));
    assert!(approx(both.apply(1.0, false), 1.0));

    let none = Easing::Steps {
        count: 3,
        position: StepPosition::None,
    };
    assert_eq!(none.apply(0.0, false), 0.0);
    assert!(approx(none.apply(0.5, false), 0.5));
    assert_eq!(none.apply(1.0, false), 1.0);
}

#[test]
fn names_resolve() {
    assert_eq!(Easing::from_name("linear").unwrap(), Easing::Linear);
    assert_eq!(Easing::from_name("ease").unwrap(), Easing::EASE);
    assert_eq!(Easing::from_name("step_end").unwrap(), Easing::STEP_END);
    assert!(Easing::from_name("bounce").is_err());
}
