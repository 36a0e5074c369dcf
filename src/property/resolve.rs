//! Shared resolution rules: logical value, transition duration and transition easing.

use crate::animation::ease::Easing;
use crate::foundation::error::{StageError, StageResult};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::value::PropertyValue;

/// Resolve an optional raw value; absent and `initial` mean "use the default".
///
/// A present value that `resolve` does not accept is an error.
pub fn resolve_value<T>(
    value: Option<&PropertyValue>,
    resolve: impl FnOnce(&PropertyValue) -> Option<T>,
) -> StageResult<Option<T>> {
    match value {
        None | Some(PropertyValue::Initial) => Ok(None),
        Some(value) => resolve(value)
            .map(Some)
            .ok_or_else(|| StageError::resolve(format!("unable to resolve value \"{value}\""))),
    }
}

/// Zero, a pixel length, or a percentage of `base`.
pub(crate) fn position(value: &PropertyValue, base: f64) -> Option<f64> {
    value
        .zero()
        .or_else(|| value.length())
        .or_else(|| value.percentage(base))
}

/// A plain number, or a percentage of 1.
pub(crate) fn scalar(value: &PropertyValue) -> Option<f64> {
    value.number().or_else(|| value.percentage(1.0))
}

pub(crate) fn angle(value: &PropertyValue) -> Option<f64> {
    value.zero().or_else(|| value.angle())
}

pub(crate) fn time(value: &PropertyValue) -> Option<f64> {
    value.zero().or_else(|| value.time())
}

/// Source id of a slot, `None` when the slot is empty.
pub fn resolve_element_value(properties: &ElementProperties) -> StageResult<Option<String>> {
    let value = resolve_value(properties.get("value"), |v| match v {
        PropertyValue::None => Some(None),
        PropertyValue::String(s) => Some(Some(s.clone())),
        _ => None,
    })?;
    Ok(value.flatten().filter(|s| !s.is_empty()))
}

/// Default transition duration of a content slot type, in milliseconds.
pub fn default_transition_duration(
    element_type: ElementType,
    element_count: u32,
) -> StageResult<f64> {
    use ElementType as T;
    Ok(match element_type {
        T::Background => 1000.0,
        T::Figure | T::Foreground | T::Avatar => 500.0,
        T::Name => 0.0,
        T::Text => 50.0 * f64::from(element_count),
        T::Choice => 500.0,
        T::Music => 1000.0,
        T::Sound | T::Voice | T::Video => 0.0,
        T::Animation | T::Effect => {
            return Err(StageError::resolve(format!(
                "unexpected element type \"{element_type}\""
            )));
        }
    })
}

/// Transition duration for `element_count` transition elements; an explicit
/// `transitionDuration` wins over the default.
pub fn resolve_transition_duration(
    properties: &ElementProperties,
    element_count: u32,
) -> StageResult<f64> {
    let default = default_transition_duration(properties.element_type, element_count)?;
    Ok(resolve_value(properties.get("transitionDuration"), time)?.unwrap_or(default))
}

/// Default easing name of one property on a content slot type.
pub fn default_transition_easing(
    element_type: ElementType,
    property_name: &str,
) -> StageResult<&'static str> {
    use ElementType as T;
    let linear = match element_type {
        T::Background | T::Figure | T::Foreground | T::Avatar => {
            matches!(property_name, "value" | "alpha")
        }
        T::Name | T::Text | T::Choice => property_name == "value",
        T::Music | T::Sound | T::Voice => matches!(property_name, "value" | "volume"),
        T::Video => matches!(property_name, "value" | "alpha" | "volume"),
        T::Animation | T::Effect => {
            return Err(StageError::resolve(format!(
                "unexpected element type \"{element_type}\""
            )));
        }
    };
    Ok(if linear { "linear" } else { "ease" })
}

/// Easing for one property; an explicit `transitionEasing` wins over the default.
pub fn resolve_transition_easing(
    properties: &ElementProperties,
    property_name: &str,
) -> StageResult<Easing> {
    let default = default_transition_easing(properties.element_type, property_name)?;
    let name = resolve_value(properties.get("transitionEasing"), |v| {
        v.string().map(str::to_string)
    })?;
    Easing::from_name(name.as_deref().unwrap_or(default))
}

#[cfg(test)]
#[path = "../../tests/unit/property/resolve.rs"]
mod tests;
