//! Visual objects owned by content slots.
//!
//! Objects are opaque to the slot controller: it only reads and writes named resolved
//! properties, attaches, detaches and destroys them. Methods take `&self` because an object
//! is shared between its slot and the animations writing to it.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::foundation::error::StageResult;
use crate::foundation::ids::ObjectId;
use crate::property::element::ElementType;
use crate::property::resolved::ResolvedValue;

pub mod headless;

pub trait VisualObject {
    fn id(&self) -> ObjectId;

    /// Fails with a property error for a name the object does not know.
    fn property(&self, name: &str) -> StageResult<ResolvedValue>;

    fn set_property(&self, name: &str, value: ResolvedValue) -> StageResult<()>;

    fn attach(&self);

    fn detach(&self);

    /// Release every resource; the object is not used afterwards.
    fn destroy(&self);
}

pub trait ImageObject: VisualObject {
    /// Size in asset pixels, before density scaling.
    fn natural_size(&self) -> (f64, f64);
}

pub trait TextObject: VisualObject {
    /// Number of units the text is revealed by (grapheme clusters).
    fn transition_element_count(&self) -> u32;
}

pub trait ChoiceObject: VisualObject {
    fn set_highlighted(&self, highlighted: bool);

    fn select(&self);
}

/// Audio and video objects.
pub trait MediaObject: VisualObject {
    fn is_playing(&self) -> bool;

    fn is_looping(&self) -> bool;

    /// Completes once playback stops, immediately when it is not playing.
    fn playback_finished(&self) -> LocalBoxFuture<'static, ()>;

    /// Stop playback as if it had reached its end.
    fn snap_playback(&self);

    /// Volume multiplier from user settings.
    fn set_setting_volume(&self, volume: f64);
}

/// Result of an asynchronous object construction.
pub type ObjectFuture<O> = LocalBoxFuture<'static, anyhow::Result<Rc<O>>>;

/// Constructs visual objects from source ids.
pub trait ObjectFactory {
    fn create_image(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn ImageObject>;

    fn create_text(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn TextObject>;

    fn create_choice(&self, source: &str) -> ObjectFuture<dyn ChoiceObject>;

    fn create_audio(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn MediaObject>;

    fn create_video(&self, source: &str) -> ObjectFuture<dyn MediaObject>;
}
