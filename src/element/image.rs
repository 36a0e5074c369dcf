use std::rc::Rc;

use crate::element::content::ContentKind;
use crate::element::TransitionOptions;
use crate::foundation::core::ScreenSize;
use crate::foundation::error::StageResult;
use crate::object::{ImageObject, ObjectFactory, ObjectFuture};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolved::{ImageResolveOptions, ImageResolved, ResolvedValue};
use crate::property::value::PropertyValue;

/// Background, figure, foreground and avatar slots.
pub struct ImageKind {
    objects: Rc<dyn ObjectFactory>,
    screen: ScreenSize,
    density: f64,
}

impl ImageKind {
    /// `density` is the number of asset pixels per screen pixel.
    pub fn new(objects: Rc<dyn ObjectFactory>, screen: ScreenSize, density: f64) -> Self {
        Self {
            objects,
            screen,
            density,
        }
    }

    fn resolve_options(
        &self,
        object: &dyn ImageObject,
        value_changed: bool,
        options: &TransitionOptions,
    ) -> ImageResolveOptions {
        let (width, height) = object.natural_size();
        let (figure, avatar_position) = match *options {
            TransitionOptions::None => (None, None),
            TransitionOptions::Figure { index, count } => (Some((index, count)), None),
            TransitionOptions::Avatar {
                position_x,
                position_y,
            } => (None, Some((position_x, position_y))),
        };
        ImageResolveOptions {
            value_changed,
            screen_width: self.screen.width_f64(),
            screen_height: self.screen.height_f64(),
            image_width: width / self.density,
            image_height: height / self.density,
            figure,
            avatar_position,
        }
    }
}

impl ContentKind for ImageKind {
    type Object = dyn ImageObject;
    type Resolved = ImageResolved;

    fn cross_fade(&self) -> bool {
        true
    }

    fn resolve_properties(
        &self,
        properties: &ElementProperties,
        object: &dyn ImageObject,
        value_changed: bool,
        options: &TransitionOptions,
    ) -> StageResult<ImageResolved> {
        ImageResolved::resolve(properties, &self.resolve_options(object, value_changed, options))
    }

    fn resolve_property(
        &self,
        name: &str,
        value: Option<&PropertyValue>,
        element_type: ElementType,
        object: &dyn ImageObject,
        options: &TransitionOptions,
    ) -> StageResult<ResolvedValue> {
        let options = self.resolve_options(object, false, options);
        ImageResolved::resolve_property(name, value, element_type, &options).map(Into::into)
    }

    fn create_object(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn ImageObject> {
        self.objects.create_image(element_type, source)
    }
}
