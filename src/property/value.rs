use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    Deg,
    Rad,
    Turn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Ms,
    S,
}

/// Raw, unresolved property value as written in a script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Reset to the default.
    Initial,
    None,
    Zero,
    Number(f64),
    /// Percentage as written, `50%` is `Percentage(50.0)`.
    Percentage(f64),
    /// Length in pixels.
    Length(f64),
    Angle { value: f64, unit: AngleUnit },
    Time { value: f64, unit: TimeUnit },
    Boolean(bool),
    String(String),
    Enum(String),
}

/// Kinds of value a property accepts, tried in order while parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    None,
    Zero,
    Number,
    Percentage,
    Length,
    Angle,
    Time,
    Boolean,
    String,
    Enum(&'static [&'static str]),
}

fn parse_number(source: &str) -> Option<f64> {
    let source = source.trim();
    if source == "infinite" {
        return Some(f64::INFINITY);
    }
    source.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_with_unit(source: &str, unit: &str) -> Option<f64> {
    source
        .trim()
        .strip_suffix(unit)
        .and_then(|n| n.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl ValueKind {
    fn parse(self, source: &str) -> Option<PropertyValue> {
        match self {
            Self::None => (source == "none").then_some(PropertyValue::None),
            Self::Zero => (source.trim() == "0").then_some(PropertyValue::Zero),
            Self::Number => parse_number(source).map(PropertyValue::Number),
            Self::Percentage => parse_with_unit(source, "%").map(PropertyValue::Percentage),
            Self::Length => parse_with_unit(source, "px").map(PropertyValue::Length),
            Self::Angle => [
                ("deg", AngleUnit::Deg),
                ("rad", AngleUnit::Rad),
                ("turn", AngleUnit::Turn),
            ]
            .into_iter()
            .find_map(|(suffix, unit)| {
                parse_with_unit(source, suffix).map(|value| PropertyValue::Angle { value, unit })
            }),
            Self::Time => [("ms", TimeUnit::Ms), ("s", TimeUnit::S)]
                .into_iter()
                .find_map(|(suffix, unit)| {
                    parse_with_unit(source, suffix).map(|value| PropertyValue::Time { value, unit })
                }),
            Self::Boolean => match source {
                "true" => Some(PropertyValue::Boolean(true)),
                "false" => Some(PropertyValue::Boolean(false)),
                _ => None,
            },
            Self::String => Some(PropertyValue::String(source.to_string())),
            Self::Enum(names) => names
                .contains(&source)
                .then(|| PropertyValue::Enum(source.to_string())),
        }
    }
}

impl PropertyValue {
    /// Parse `source` as the first accepted kind that matches; `initial` is always accepted.
    pub fn parse(source: &str, kinds: &[ValueKind]) -> Option<Self> {
        if source == "initial" {
            return Some(Self::Initial);
        }
        kinds.iter().find_map(|kind| kind.parse(source))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn zero(&self) -> Option<f64> {
        matches!(self, Self::Zero).then_some(0.0)
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Percentage of `base`.
    pub fn percentage(&self, base: f64) -> Option<f64> {
        match self {
            Self::Percentage(v) => Some(v / 100.0 * base),
            _ => None,
        }
    }

    /// Length in pixels.
    pub fn length(&self) -> Option<f64> {
        match self {
            Self::Length(v) => Some(*v),
            _ => None,
        }
    }

    /// Angle in degrees.
    pub fn angle(&self) -> Option<f64> {
        match self {
            Self::Angle { value, unit } => Some(match unit {
                AngleUnit::Deg => *value,
                AngleUnit::Rad => value.to_degrees(),
                AngleUnit::Turn => value * 360.0,
            }),
            _ => None,
        }
    }

    /// Time in milliseconds.
    pub fn time(&self) -> Option<f64> {
        match self {
            Self::Time { value, unit } => Some(match unit {
                TimeUnit::Ms => *value,
                TimeUnit::S => value * 1000.0,
            }),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn enum_name(&self) -> Option<&str> {
        match self {
            Self::Enum(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::None => f.write_str("none"),
            Self::Zero => f.write_str("0"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Percentage(v) => write!(f, "{v}%"),
            Self::Length(v) => write!(f, "{v}px"),
            Self::Angle { value, unit } => {
                let unit = match unit {
                    AngleUnit::Deg => "deg",
                    AngleUnit::Rad => "rad",
                    AngleUnit::Turn => "turn",
                };
                write!(f, "{value}{unit}")
            }
            Self::Time { value, unit } => {
                let unit = match unit {
                    TimeUnit::Ms => "ms",
                    TimeUnit::S => "s",
                };
                write!(f, "{value}{unit}")
            }
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) | Self::Enum(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/property/value.rs"]
mod tests;
