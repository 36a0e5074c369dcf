use std::rc::Rc;

use crate::element::content::ContentKind;
use crate::element::TransitionOptions;
use crate::foundation::error::StageResult;
use crate::object::{ObjectFactory, ObjectFuture, TextObject};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolved::{ResolvedValue, TextResolved};
use crate::property::value::PropertyValue;

/// Name and text slots. Texts never cross-fade: the old text leaves before the new one is
/// revealed.
pub struct TextKind {
    objects: Rc<dyn ObjectFactory>,
    enter_by_grapheme_cluster: bool,
}

impl TextKind {
    /// With `enter_by_grapheme_cluster`, an entering text's default duration scales with
    /// its grapheme count.
    pub fn new(objects: Rc<dyn ObjectFactory>, enter_by_grapheme_cluster: bool) -> Self {
        Self {
            objects,
            enter_by_grapheme_cluster,
        }
    }
}

impl ContentKind for TextKind {
    type Object = dyn TextObject;
    type Resolved = TextResolved;

    fn cross_fade(&self) -> bool {
        false
    }

    fn resolve_properties(
        &self,
        _properties: &ElementProperties,
        _object: &dyn TextObject,
        value_changed: bool,
        _options: &TransitionOptions,
    ) -> StageResult<TextResolved> {
        Ok(TextResolved::resolve(value_changed))
    }

    fn resolve_property(
        &self,
        name: &str,
        _value: Option<&PropertyValue>,
        _element_type: ElementType,
        _object: &dyn TextObject,
        _options: &TransitionOptions,
    ) -> StageResult<ResolvedValue> {
        TextResolved::resolve_property(name, false)
    }

    fn create_object(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn TextObject> {
        self.objects.create_text(element_type, source)
    }

    fn transition_element_count(&self, object: &dyn TextObject, is_enter: bool) -> u32 {
        if is_enter && self.enter_by_grapheme_cluster {
            object.transition_element_count()
        } else {
            1
        }
    }
}
