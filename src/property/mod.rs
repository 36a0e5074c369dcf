//! Raw script properties and their resolution into concrete values.

pub mod element;
pub mod resolve;
pub mod resolved;
pub mod value;

pub use element::{ElementProperties, ElementType, Property, parse_element_name};
pub use resolve::{
    resolve_element_value, resolve_transition_duration, resolve_transition_easing, resolve_value,
};
pub use resolved::{
    AnimationResolved, AudioResolved, ChoiceResolved, EffectResolved, ImageResolveOptions,
    ImageResolved, Keyframe, KeyframeSegment, ResolvedProperties, ResolvedValue, TextResolved,
    VideoResolved,
};
pub use value::{AngleUnit, PropertyValue, TimeUnit, ValueKind};
