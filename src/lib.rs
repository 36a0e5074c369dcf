#![forbid(unsafe_code)]

pub mod animation;
pub mod clock;
pub mod config;
pub mod element;
pub mod foundation;
pub mod matcher;
pub mod object;
pub mod offline;
pub mod property;
pub mod stage;

pub use animation::anim::{Animation, AnimationDirection, AnimationPlayState, AnimationTiming};
pub use animation::ease::Easing;
pub use clock::{Clock, FrameClock, RealtimeClock};
pub use config::StageConfig;
pub use element::{Element, Transition, TransitionOptions, TransitionStep};
pub use foundation::core::{Fps, FrameIndex, FrameRange, ScreenSize};
pub use foundation::error::{AnimationAborted, StageError, StageResult};
pub use matcher::{ElementPropertyMatcher, Matcher};
pub use offline::{CueSheet, FrameDump, OfflineExport};
pub use property::{ElementProperties, ElementType, Property, PropertyValue};
pub use stage::{ElementFactory, Stage, StandardElements};
