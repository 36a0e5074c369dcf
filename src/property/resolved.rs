//! Per-kind resolved property records.
//!
//! A record is an immutable snapshot of concrete, defaulted values computed for one
//! transition step. Content records expose their values by name through
//! [`ResolvedProperties`], which is what the slot controller diffs and animates.

use std::fmt;

use crate::animation::anim::{AnimationDirection, AnimationTiming};
use crate::animation::ease::Easing;
use crate::foundation::error::{StageError, StageResult};
use crate::matcher::ElementPropertyMatcher;
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolve::{angle, position, resolve_element_value, resolve_value, scalar, time};
use crate::property::value::PropertyValue;

/// Concrete value of one resolved property.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Number(f64),
    Boolean(bool),
    String(String),
}

impl ResolvedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ResolvedValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ResolvedValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for ResolvedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// Named access to a resolved record.
pub trait ResolvedProperties: Clone + fmt::Debug + PartialEq {
    /// Property names in diffing order.
    const NAMES: &'static [&'static str];

    fn get(&self, name: &str) -> Option<ResolvedValue>;
}

fn unexpected_property(name: &str) -> StageError {
    StageError::resolve(format!("unexpected property name \"{name}\""))
}

fn logical_value(value_changed: bool) -> f64 {
    if value_changed { 0.0 } else { 1.0 }
}

/// Context needed to resolve image geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageResolveOptions {
    pub value_changed: bool,
    pub screen_width: f64,
    pub screen_height: f64,
    /// Natural width divided by density.
    pub image_width: f64,
    pub image_height: f64,
    /// `(index, count)` of a figure.
    pub figure: Option<(u32, u32)>,
    pub avatar_position: Option<(f64, f64)>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageResolved {
    pub value: f64,
    pub anchor_x: f64,
    pub anchor_y: f64,
    pub position_x: f64,
    pub position_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub pivot_x: f64,
    pub pivot_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub rotation: f64,
    pub alpha: f64,
}

impl ImageResolved {
    pub fn resolve(properties: &ElementProperties, options: &ImageResolveOptions) -> StageResult<Self> {
        let r = |name: &str| {
            Self::resolve_property(name, properties.get(name), properties.element_type, options)
        };
        Ok(Self {
            value: r("value")?,
            anchor_x: r("anchorX")?,
            anchor_y: r("anchorY")?,
            position_x: r("positionX")?,
            position_y: r("positionY")?,
            offset_x: r("offsetX")?,
            offset_y: r("offsetY")?,
            pivot_x: r("pivotX")?,
            pivot_y: r("pivotY")?,
            scale_x: r("scaleX")?,
            scale_y: r("scaleY")?,
            skew_x: r("skewX")?,
            skew_y: r("skewY")?,
            rotation: r("rotation")?,
            alpha: r("alpha")?,
        })
    }

    pub fn resolve_property(
        name: &str,
        value: Option<&PropertyValue>,
        element_type: ElementType,
        options: &ImageResolveOptions,
    ) -> StageResult<f64> {
        let figure = element_type == ElementType::Figure;
        let avatar = element_type == ElementType::Avatar;
        let (image_w, image_h) = (options.image_width, options.image_height);
        let (screen_w, screen_h) = (options.screen_width, options.screen_height);
        let resolved = match name {
            "value" => return Ok(logical_value(options.value_changed)),
            "anchorX" => resolve_value(value, |v| position(v, image_w))?
                .unwrap_or(if figure { image_w / 2.0 } else { 0.0 }),
            "anchorY" => resolve_value(value, |v| position(v, image_h))?
                .unwrap_or(if figure { image_h } else { 0.0 }),
            "positionX" => {
                let default = if figure {
                    let (index, count) = options.figure.unwrap_or((1, 1));
                    f64::from(index) / f64::from(count + 1) * screen_w
                } else if avatar {
                    options.avatar_position.map_or(0.0, |(x, _)| x)
                } else {
                    0.0
                };
                resolve_value(value, |v| position(v, screen_w))?.unwrap_or(default)
            }
            "positionY" => {
                let default = if figure {
                    screen_h
                } else if avatar {
                    options.avatar_position.map_or(0.0, |(_, y)| y)
                } else {
                    0.0
                };
                resolve_value(value, |v| position(v, screen_h))?.unwrap_or(default)
            }
            "offsetX" => resolve_value(value, |v| position(v, screen_w))?
                .unwrap_or(if figure { screen_w } else { 0.0 }),
            "offsetY" => resolve_value(value, |v| position(v, screen_h))?
                .unwrap_or(if figure { screen_h } else { 0.0 }),
            "pivotX" => resolve_value(value, |v| position(v, image_w))?.unwrap_or(image_w / 2.0),
            "pivotY" => resolve_value(value, |v| position(v, image_h))?.unwrap_or(image_h / 2.0),
            "scaleX" | "scaleY" | "alpha" => resolve_value(value, scalar)?.unwrap_or(1.0),
            "skewX" | "skewY" | "rotation" => resolve_value(value, angle)?.unwrap_or(0.0),
            _ => return Err(unexpected_property(name)),
        };
        Ok(resolved)
    }
}

impl ResolvedProperties for ImageResolved {
    const NAMES: &'static [&'static str] = &[
        "value", "anchorX", "anchorY", "positionX", "positionY", "offsetX", "offsetY", "pivotX",
        "pivotY", "scaleX", "scaleY", "skewX", "skewY", "rotation", "alpha",
    ];

    fn get(&self, name: &str) -> Option<ResolvedValue> {
        let v = match name {
            "value" => self.value,
            "anchorX" => self.anchor_x,
            "anchorY" => self.anchor_y,
            "positionX" => self.position_x,
            "positionY" => self.position_y,
            "offsetX" => self.offset_x,
            "offsetY" => self.offset_y,
            "pivotX" => self.pivot_x,
            "pivotY" => self.pivot_y,
            "scaleX" => self.scale_x,
            "scaleY" => self.scale_y,
            "skewX" => self.skew_x,
            "skewY" => self.skew_y,
            "rotation" => self.rotation,
            "alpha" => self.alpha,
            _ => return None,
        };
        Some(ResolvedValue::Number(v))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextResolved {
    pub value: f64,
}

impl TextResolved {
    pub fn resolve(value_changed: bool) -> Self {
        Self {
            value: logical_value(value_changed),
        }
    }

    pub fn resolve_property(name: &str, value_changed: bool) -> StageResult<ResolvedValue> {
        match name {
            "value" => Ok(logical_value(value_changed).into()),
            _ => Err(unexpected_property(name)),
        }
    }
}

impl ResolvedProperties for TextResolved {
    const NAMES: &'static [&'static str] = &["value"];

    fn get(&self, name: &str) -> Option<ResolvedValue> {
        (name == "value").then_some(ResolvedValue::Number(self.value))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceResolved {
    pub value: f64,
    pub enabled: bool,
    pub script: String,
}

impl ChoiceResolved {
    pub fn resolve(properties: &ElementProperties, value_changed: bool) -> StageResult<Self> {
        let r = |name: &str| Self::resolve_property(name, properties.get(name), value_changed);
        let enabled = r("enabled")?.as_bool().unwrap_or(true);
        let script = r("script")?.as_str().map(str::to_string).unwrap_or_default();
        Ok(Self {
            value: logical_value(value_changed),
            enabled,
            script,
        })
    }

    pub fn resolve_property(
        name: &str,
        value: Option<&PropertyValue>,
        value_changed: bool,
    ) -> StageResult<ResolvedValue> {
        Ok(match name {
            "value" => logical_value(value_changed).into(),
            "enabled" => resolve_value(value, PropertyValue::boolean)?
                .unwrap_or(true)
                .into(),
            "script" => resolve_value(value, |v| v.string().map(str::to_string))?
                .unwrap_or_default()
                .into(),
            _ => return Err(unexpected_property(name)),
        })
    }
}

impl ResolvedProperties for ChoiceResolved {
    const NAMES: &'static [&'static str] = &["value", "enabled", "script"];

    fn get(&self, name: &str) -> Option<ResolvedValue> {
        match name {
            "value" => Some(self.value.into()),
            "enabled" => Some(self.enabled.into()),
            "script" => Some(self.script.clone().into()),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioResolved {
    pub value: f64,
    pub volume: f64,
    pub looping: bool,
}

impl AudioResolved {
    pub fn resolve(properties: &ElementProperties, value_changed: bool) -> StageResult<Self> {
        let element_type = properties.element_type;
        let r = |name: &str| {
            Self::resolve_property(name, properties.get(name), element_type, value_changed)
        };
        Ok(Self {
            value: logical_value(value_changed),
            volume: r("volume")?.as_number().unwrap_or(1.0),
            looping: r("loop")?.as_bool().unwrap_or(false),
        })
    }

    pub fn resolve_property(
        name: &str,
        value: Option<&PropertyValue>,
        element_type: ElementType,
        value_changed: bool,
    ) -> StageResult<ResolvedValue> {
        Ok(match name {
            "value" => logical_value(value_changed).into(),
            "volume" => resolve_value(value, scalar)?.unwrap_or(1.0).into(),
            "loop" => resolve_value(value, PropertyValue::boolean)?
                .unwrap_or(element_type == ElementType::Music)
                .into(),
            _ => return Err(unexpected_property(name)),
        })
    }
}

impl ResolvedProperties for AudioResolved {
    const NAMES: &'static [&'static str] = &["value", "volume", "loop"];

    fn get(&self, name: &str) -> Option<ResolvedValue> {
        match name {
            "value" => Some(self.value.into()),
            "volume" => Some(self.volume.into()),
            "loop" => Some(self.looping.into()),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoResolved {
    pub value: f64,
    pub alpha: f64,
    pub volume: f64,
    pub looping: bool,
}

impl VideoResolved {
    pub fn resolve(properties: &ElementProperties, value_changed: bool) -> StageResult<Self> {
        let r = |name: &str| Self::resolve_property(name, properties.get(name), value_changed);
        Ok(Self {
            value: logical_value(value_changed),
            alpha: r("alpha")?.as_number().unwrap_or(1.0),
            volume: r("volume")?.as_number().unwrap_or(1.0),
            looping: r("loop")?.as_bool().unwrap_or(false),
        })
    }

    pub fn resolve_property(
        name: &str,
        value: Option<&PropertyValue>,
        value_changed: bool,
    ) -> StageResult<ResolvedValue> {
        Ok(match name {
            "value" => logical_value(value_changed).into(),
            "alpha" | "volume" => resolve_value(value, scalar)?.unwrap_or(1.0).into(),
            "loop" => resolve_value(value, PropertyValue::boolean)?
                .unwrap_or(false)
                .into(),
            _ => return Err(unexpected_property(name)),
        })
    }
}

impl ResolvedProperties for VideoResolved {
    const NAMES: &'static [&'static str] = &["value", "alpha", "volume", "loop"];

    fn get(&self, name: &str) -> Option<ResolvedValue> {
        match name {
            "value" => Some(self.value.into()),
            "alpha" => Some(self.alpha.into()),
            "volume" => Some(self.volume.into()),
            "loop" => Some(self.looping.into()),
            _ => None,
        }
    }
}

/// One keyframe of an animation slot; the value is resolved by each target slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    pub offset: f64,
    pub value: PropertyValue,
}

/// Keyframe pair surrounding a progress value.
#[derive(Clone, Copy, Debug)]
pub struct KeyframeSegment<'a> {
    pub start: &'a Keyframe,
    pub end: &'a Keyframe,
    /// Position between `start` and `end`, 0 at `start` and 1 at `end`.
    pub fraction: f64,
}

#[derive(Clone, Debug)]
pub struct AnimationResolved {
    pub matcher: Option<ElementPropertyMatcher>,
    pub timing: AnimationTiming,
    pub keyframes: Vec<Keyframe>,
}

fn direction_from_name(name: &str) -> StageResult<AnimationDirection> {
    match name {
        "normal" => Ok(AnimationDirection::Normal),
        "reverse" => Ok(AnimationDirection::Reverse),
        "alternate" => Ok(AnimationDirection::Alternate),
        "alternate_reverse" => Ok(AnimationDirection::AlternateReverse),
        _ => Err(StageError::resolve(format!(
            "unsupported animation direction \"{name}\""
        ))),
    }
}

fn keyframe_index(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.starts_with('0') {
        return None;
    }
    digits.parse::<usize>().ok().filter(|i| *i >= 1).map(|i| i - 1)
}

fn invalid_keyframes(msg: String) -> StageError {
    StageError::validation(msg)
}

impl AnimationResolved {
    pub fn resolve(properties: &ElementProperties) -> StageResult<Self> {
        let matcher = resolve_element_value(properties)?
            .map(|selector| ElementPropertyMatcher::parse(&selector))
            .transpose()?;
        let duration = resolve_value(properties.get("duration"), time)?.unwrap_or(0.0);
        let easing_name = resolve_value(properties.get("easing"), |v| {
            v.string().map(str::to_string)
        })?;
        let easing = Easing::from_name(easing_name.as_deref().unwrap_or("linear"))?;
        let delay = resolve_value(properties.get("delay"), time)?.unwrap_or(0.0);
        let direction = match resolve_value(properties.get("direction"), |v| {
            v.enum_name().map(str::to_string)
        })? {
            Some(name) => direction_from_name(&name)?,
            None => AnimationDirection::Normal,
        };
        let iteration_count =
            resolve_value(properties.get("iterationCount"), PropertyValue::number)?.unwrap_or(1.0);
        let iteration_start =
            resolve_value(properties.get("iterationStart"), PropertyValue::number)?.unwrap_or(0.0);
        let keyframes = Self::resolve_keyframes(properties, matcher.is_some())?;
        Ok(Self {
            matcher,
            timing: AnimationTiming {
                duration,
                easing,
                delay,
                end_delay: 0.0,
                direction,
                iteration_count,
                iteration_start,
            },
            keyframes,
        })
    }

    fn resolve_keyframes(properties: &ElementProperties, required: bool) -> StageResult<Vec<Keyframe>> {
        let mut offsets: Vec<Option<f64>> = Vec::new();
        let mut values: Vec<Option<PropertyValue>> = Vec::new();
        for (name, value) in &properties.values {
            if let Some(index) = keyframe_index(name, "offset_") {
                if offsets.len() <= index {
                    offsets.resize(index + 1, None);
                }
                offsets[index] = resolve_value(Some(value), scalar)?;
            } else if let Some(index) = keyframe_index(name, "value_") {
                if values.len() <= index {
                    values.resize(index + 1, None);
                }
                values[index] = Some(value.clone());
            }
        }
        if !required && offsets.is_empty() && values.is_empty() {
            return Ok(Vec::new());
        }
        if values.len() < 2 {
            return Err(invalid_keyframes(
                "animation must have at least 2 keyframes".to_string(),
            ));
        }
        if let Some(missing) = values.iter().position(Option::is_none) {
            return Err(invalid_keyframes(format!("missing value {}", missing + 1)));
        }
        if offsets.len() > values.len() {
            return Err(invalid_keyframes(format!(
                "missing value for offset {}",
                offsets.len()
            )));
        }
        let count = values.len();
        offsets.resize(count, None);

        match offsets[0] {
            None => offsets[0] = Some(0.0),
            Some(first) if first != 0.0 => {
                return Err(invalid_keyframes(format!(
                    "the first offset must be 0 but is {first}"
                )));
            }
            Some(_) => {}
        }
        match offsets[count - 1] {
            None => offsets[count - 1] = Some(1.0),
            Some(last) if last != 1.0 => {
                return Err(invalid_keyframes(format!(
                    "the last offset must be 1 but is {last}"
                )));
            }
            Some(_) => {}
        }

        let mut previous = 0.0;
        for (i, offset) in offsets.iter().enumerate().skip(1) {
            let Some(offset) = *offset else { continue };
            if !(0.0..=1.0).contains(&offset) {
                return Err(invalid_keyframes(format!(
                    "offset {} ({offset}) must be in [0, 1]",
                    i + 1
                )));
            }
            if offset <= previous {
                return Err(invalid_keyframes(format!(
                    "offset {} ({offset}) must be greater than its previous offset ({previous})",
                    i + 1
                )));
            }
            previous = offset;
        }

        // Space missing offsets evenly between their defined neighbours.
        let mut pre = 0;
        while pre < count - 1 {
            let post = (pre + 1..count)
                .find(|&i| offsets[i].is_some())
                .unwrap_or(count - 1);
            let (a, b) = (offsets[pre].unwrap_or(0.0), offsets[post].unwrap_or(1.0));
            for (i, slot) in offsets.iter_mut().enumerate().take(post).skip(pre + 1) {
                *slot = Some(a + (i - pre) as f64 / (post - pre) as f64 * (b - a));
            }
            pre = post;
        }

        Ok(offsets
            .into_iter()
            .zip(values)
            .filter_map(|(offset, value)| {
                Some(Keyframe {
                    offset: offset?,
                    value: value?,
                })
            })
            .collect())
    }

    /// Keyframe segment containing `progress`; progress past the last offset stays in the
    /// last segment.
    pub fn segment(&self, progress: f64) -> Option<KeyframeSegment<'_>> {
        let len = self.keyframes.len();
        if len < 2 {
            return None;
        }
        let end_index = (1..len)
            .find(|&i| progress < self.keyframes[i].offset)
            .unwrap_or(len - 1);
        let start = &self.keyframes[end_index - 1];
        let end = &self.keyframes[end_index];
        let span = end.offset - start.offset;
        let fraction = if span > 0.0 {
            (progress - start.offset) / span
        } else {
            1.0
        };
        Some(KeyframeSegment {
            start,
            end,
            fraction,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectResolved {
    /// Effect name; `None` when the slot is empty.
    pub name: Option<String>,
    pub parameters: Vec<serde_json::Value>,
}

impl EffectResolved {
    pub fn resolve(properties: &ElementProperties) -> StageResult<Self> {
        let name = resolve_element_value(properties)?;
        let parameters = match resolve_value(properties.get("parameters"), |v| {
            v.string().map(str::to_string)
        })? {
            Some(body) if !body.is_empty() => serde_json::from_str(&format!("[{body}]"))
                .map_err(|e| StageError::resolve(format!("invalid effect parameters \"{body}\": {e}")))?,
            _ => Vec::new(),
        };
        Ok(Self { name, parameters })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/property/resolved.rs"]
mod tests;
