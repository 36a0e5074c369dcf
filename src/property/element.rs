use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{StageError, StageResult};
use crate::property::value::{PropertyValue, ValueKind};

/// Kind of slot a property set belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Background,
    Figure,
    Foreground,
    Avatar,
    Name,
    Text,
    Choice,
    Music,
    Sound,
    Voice,
    Video,
    Animation,
    Effect,
}

impl ElementType {
    pub const ALL: [Self; 13] = [
        Self::Background,
        Self::Figure,
        Self::Foreground,
        Self::Avatar,
        Self::Name,
        Self::Text,
        Self::Choice,
        Self::Music,
        Self::Sound,
        Self::Voice,
        Self::Video,
        Self::Animation,
        Self::Effect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Figure => "figure",
            Self::Foreground => "foreground",
            Self::Avatar => "avatar",
            Self::Name => "name",
            Self::Text => "text",
            Self::Choice => "choice",
            Self::Music => "music",
            Self::Sound => "sound",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Effect => "effect",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            Self::Background | Self::Figure | Self::Foreground | Self::Avatar
        )
    }

    pub fn is_audio(self) -> bool {
        matches!(self, Self::Music | Self::Sound | Self::Voice)
    }

    /// Types whose slots hold a visual or audible object.
    pub fn is_content(self) -> bool {
        !matches!(self, Self::Animation | Self::Effect)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StageError::validation(format!("unsupported element type \"{s}\"")))
    }
}

/// Split `figure2` into its type and 1-based index; a missing index means 1.
pub fn parse_element_name(name: &str) -> StageResult<(ElementType, u32)> {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(name.len(), |(i, _)| i);
    let (type_name, digits) = name.split_at(digits_start);
    if type_name.is_empty() || digits.starts_with('0') {
        return Err(StageError::validation(format!(
            "unsupported element name \"{name}\""
        )));
    }
    let element_type = type_name.parse::<ElementType>()?;
    let index = if digits.is_empty() {
        1
    } else {
        digits
            .parse::<u32>()
            .map_err(|_| StageError::validation(format!("unsupported element name \"{name}\"")))?
    };
    Ok((element_type, index))
}

/// Raw properties of one slot.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementProperties {
    pub element_type: ElementType,
    pub index: u32,
    #[serde(default)]
    pub values: BTreeMap<String, PropertyValue>,
}

impl ElementProperties {
    pub fn new(element_type: ElementType, index: u32) -> Self {
        Self {
            element_type,
            index,
            values: BTreeMap::new(),
        }
    }

    /// Registry name of the slot, e.g. `figure2`.
    pub fn element_name(&self) -> String {
        format!("{}{}", self.element_type, self.index)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Set a value; `initial` removes it.
    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        if value == PropertyValue::Initial {
            self.values.remove(&name);
        } else {
            self.values.insert(name, value);
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.set(name, value);
        self
    }

    /// Shorthand for a string `value`.
    pub fn with_value(self, value: &str) -> Self {
        self.with("value", PropertyValue::String(value.to_string()))
    }

    /// Merge a parsed property addressed to this slot.
    pub fn apply(&mut self, property: Property) -> StageResult<()> {
        if property.element_type != self.element_type || property.index != self.index {
            return Err(StageError::validation(format!(
                "property \"{}\" targets {}{} but was applied to {}",
                property.name,
                property.element_type,
                property.index,
                self.element_name()
            )));
        }
        self.set(property.name, property.value);
        Ok(())
    }

    /// Parse script literals for one slot.
    pub fn parse<'a>(
        element_name: &str,
        literals: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> StageResult<Self> {
        let (element_type, index) = parse_element_name(element_name)?;
        let mut properties = Self::new(element_type, index);
        for (name, literal) in literals {
            properties.apply(Property::parse(element_name, name, literal)?)?;
        }
        Ok(properties)
    }
}

/// One parsed property assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub element_type: ElementType,
    pub index: u32,
    /// Single-token property name (`anchorX`), or `offset_N` / `value_N` for keyframes.
    pub name: String,
    pub value: PropertyValue,
}

const VALUE: &[ValueKind] = &[ValueKind::None, ValueKind::String];
const DURATION: &[ValueKind] = &[ValueKind::Zero, ValueKind::Time];
const STRING: &[ValueKind] = &[ValueKind::String];
const POSITION: &[ValueKind] = &[ValueKind::Zero, ValueKind::Length, ValueKind::Percentage];
const SCALAR: &[ValueKind] = &[ValueKind::Number, ValueKind::Percentage];
const ANGLE: &[ValueKind] = &[ValueKind::Zero, ValueKind::Angle];
const BOOLEAN: &[ValueKind] = &[ValueKind::Boolean];
const NUMBER: &[ValueKind] = &[ValueKind::Number];
const KEYFRAME_VALUE: &[ValueKind] = &[
    ValueKind::Zero,
    ValueKind::Angle,
    ValueKind::Length,
    ValueKind::Number,
    ValueKind::Percentage,
];
pub(crate) const DIRECTION_NAMES: &[&str] = &["normal", "reverse", "alternate", "alternate_reverse"];
const DIRECTION: &[ValueKind] = &[ValueKind::Enum(DIRECTION_NAMES)];

fn is_indexed(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix).is_some_and(|digits| {
        !digits.is_empty()
            && !digits.starts_with('0')
            && digits.chars().all(|c| c.is_ascii_digit())
    })
}

/// Stored name and accepted value kinds of a script property on a slot type.
fn property_spec(element_type: ElementType, name: &str) -> Option<(String, &'static [ValueKind])> {
    use ElementType as T;

    if name == "value" {
        return Some((name.to_string(), VALUE));
    }
    if element_type.is_content() {
        match name {
            "transition_duration" => return Some(("transitionDuration".into(), DURATION)),
            "transition_easing" => return Some(("transitionEasing".into(), STRING)),
            _ => {}
        }
    }
    let kinds: &'static [ValueKind] = match (element_type, name) {
        (t, "anchor_x" | "anchor_y" | "position_x" | "position_y" | "offset_x" | "offset_y")
            if t.is_image() =>
        {
            POSITION
        }
        (t, "pivot_x" | "pivot_y") if t.is_image() => POSITION,
        (t, "scale_x" | "scale_y") if t.is_image() => SCALAR,
        (t, "skew_x" | "skew_y" | "rotation") if t.is_image() => ANGLE,
        (t, "alpha") if t.is_image() => SCALAR,
        (T::Choice, "enabled") => BOOLEAN,
        (T::Choice, "script") => STRING,
        (t, "volume") if t.is_audio() => SCALAR,
        (t, "loop") if t.is_audio() => BOOLEAN,
        (T::Video, "alpha" | "volume") => SCALAR,
        (T::Video, "loop") => BOOLEAN,
        (T::Animation, "delay" | "duration") => DURATION,
        (T::Animation, "direction") => DIRECTION,
        (T::Animation, "easing") => STRING,
        (T::Animation, "iteration_count" | "iteration_start") => NUMBER,
        (T::Animation, n) if is_indexed(n, "offset_") => {
            return Some((n.to_string(), SCALAR));
        }
        (T::Animation, n) if is_indexed(n, "value_") => {
            return Some((n.to_string(), KEYFRAME_VALUE));
        }
        (T::Effect, "parameters") => STRING,
        _ => return None,
    };
    Some((crate::matcher::to_property_case(name), kinds))
}

impl Property {
    /// Parse a script assignment such as `figure2`, `anchor_x`, `50%`.
    pub fn parse(element_name: &str, property_name: &str, literal: &str) -> StageResult<Self> {
        let (element_type, index) = parse_element_name(element_name)?;
        let (name, kinds) = property_spec(element_type, property_name).ok_or_else(|| {
            StageError::validation(format!(
                "unexpected property name \"{property_name}\" on element type \"{element_type}\""
            ))
        })?;
        let value = PropertyValue::parse(literal, kinds).ok_or_else(|| {
            StageError::validation(format!(
                "invalid value \"{literal}\" for property \"{property_name}\""
            ))
        })?;
        Ok(Self {
            element_type,
            index,
            name,
            value,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/property/element.rs"]
mod tests;
