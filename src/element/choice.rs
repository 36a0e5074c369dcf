use std::rc::Rc;

use crate::element::content::{ContentElement, ContentKind};
use crate::element::TransitionOptions;
use crate::foundation::error::StageResult;
use crate::object::{ChoiceObject, ObjectFactory, ObjectFuture};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolved::{ChoiceResolved, ResolvedValue};
use crate::property::value::PropertyValue;

/// Choice slots: a selectable option carrying the script to run when chosen.
pub struct ChoiceKind {
    objects: Rc<dyn ObjectFactory>,
}

impl ChoiceKind {
    pub fn new(objects: Rc<dyn ObjectFactory>) -> Self {
        Self { objects }
    }
}

impl ContentKind for ChoiceKind {
    type Object = dyn ChoiceObject;
    type Resolved = ChoiceResolved;

    fn cross_fade(&self) -> bool {
        false
    }

    fn resolve_properties(
        &self,
        properties: &ElementProperties,
        _object: &dyn ChoiceObject,
        value_changed: bool,
        _options: &TransitionOptions,
    ) -> StageResult<ChoiceResolved> {
        ChoiceResolved::resolve(properties, value_changed)
    }

    fn resolve_property(
        &self,
        name: &str,
        value: Option<&PropertyValue>,
        _element_type: ElementType,
        _object: &dyn ChoiceObject,
        _options: &TransitionOptions,
    ) -> StageResult<ResolvedValue> {
        ChoiceResolved::resolve_property(name, value, false)
    }

    fn create_object(&self, _element_type: ElementType, source: &str) -> ObjectFuture<dyn ChoiceObject> {
        self.objects.create_choice(source)
    }
}

impl ContentElement<ChoiceKind> {
    /// Script of the current choice, `None` for an empty slot.
    pub fn script(&self) -> StageResult<Option<String>> {
        let Some(object) = self.current_object() else {
            return Ok(None);
        };
        Ok(object.property("script")?.as_str().map(str::to_string))
    }

    pub fn is_enabled(&self) -> StageResult<bool> {
        let Some(object) = self.current_object() else {
            return Ok(false);
        };
        Ok(object.property("enabled")?.as_bool().unwrap_or(false))
    }

    pub fn set_highlighted(&self, highlighted: bool) {
        if let Some(object) = self.current_object() {
            object.set_highlighted(highlighted);
        }
    }

    pub fn select(&self) {
        if let Some(object) = self.current_object() {
            object.select();
        }
    }
}
