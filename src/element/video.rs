use std::rc::Rc;

use crate::element::content::ContentKind;
use crate::element::TransitionOptions;
use crate::foundation::error::StageResult;
use crate::object::{MediaObject, ObjectFactory, ObjectFuture};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolved::{ResolvedValue, VideoResolved};
use crate::property::value::PropertyValue;

/// Video slots.
pub struct VideoKind {
    objects: Rc<dyn ObjectFactory>,
}

impl VideoKind {
    pub fn new(objects: Rc<dyn ObjectFactory>) -> Self {
        Self { objects }
    }
}

impl ContentKind for VideoKind {
    type Object = dyn MediaObject;
    type Resolved = VideoResolved;

    fn cross_fade(&self) -> bool {
        true
    }

    fn resolve_properties(
        &self,
        properties: &ElementProperties,
        _object: &dyn MediaObject,
        value_changed: bool,
        _options: &TransitionOptions,
    ) -> StageResult<VideoResolved> {
        VideoResolved::resolve(properties, value_changed)
    }

    fn resolve_property(
        &self,
        name: &str,
        value: Option<&PropertyValue>,
        _element_type: ElementType,
        _object: &dyn MediaObject,
        _options: &TransitionOptions,
    ) -> StageResult<ResolvedValue> {
        VideoResolved::resolve_property(name, value, false)
    }

    fn create_object(&self, _element_type: ElementType, source: &str) -> ObjectFuture<dyn MediaObject> {
        self.objects.create_video(source)
    }

    fn playback<'a>(&self, object: &'a dyn MediaObject) -> Option<&'a dyn MediaObject> {
        Some(object)
    }
}
