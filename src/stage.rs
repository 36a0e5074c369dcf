//! Registry of named slots sharing one clock.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, FutureExt as _, LocalBoxFuture};

use crate::clock::Clock;
use crate::config::StageConfig;
use crate::element::{
    AnimationElement, AudioKind, AudioVolumeSetting, BuiltinEffects, ChoiceKind, ContentElement,
    Element, EffectElement, EffectFactory, ElementMap, ElementRegistry, ImageKind, TextKind,
    Transition, TransitionOptions, VideoKind,
};
use crate::foundation::error::StageResult;
use crate::matcher::ElementPropertyMatcher;
use crate::object::ObjectFactory;
use crate::property::element::{ElementProperties, ElementType, parse_element_name};

/// Creates the slot controller for a slot name on first use.
pub trait ElementFactory {
    fn create_element(
        &self,
        name: &str,
        element_type: ElementType,
        registry: &ElementRegistry,
        clock: Rc<dyn Clock>,
    ) -> StageResult<Rc<dyn Element>>;
}

/// Slot controllers for every element type, backed by one object factory.
pub struct StandardElements {
    objects: Rc<dyn ObjectFactory>,
    config: StageConfig,
    effects: Rc<dyn EffectFactory>,
    audio_volume: Rc<AudioVolumeSetting>,
}

impl StandardElements {
    pub fn new(objects: Rc<dyn ObjectFactory>, config: StageConfig) -> Self {
        Self {
            objects,
            config,
            effects: Rc::new(BuiltinEffects::new()),
            audio_volume: Rc::new(AudioVolumeSetting::unity()),
        }
    }

    pub fn with_effects(mut self, effects: Rc<dyn EffectFactory>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_audio_volume(mut self, audio_volume: Rc<AudioVolumeSetting>) -> Self {
        self.audio_volume = audio_volume;
        self
    }

    pub fn audio_volume(&self) -> &Rc<AudioVolumeSetting> {
        &self.audio_volume
    }
}

impl ElementFactory for StandardElements {
    fn create_element(
        &self,
        name: &str,
        element_type: ElementType,
        registry: &ElementRegistry,
        clock: Rc<dyn Clock>,
    ) -> StageResult<Rc<dyn Element>> {
        use ElementType as T;
        let objects = Rc::clone(&self.objects);
        let element: Rc<dyn Element> = match element_type {
            T::Background | T::Figure | T::Foreground | T::Avatar => {
                let kind = ImageKind::new(objects, self.config.screen, self.config.density);
                Rc::new(ContentElement::new(name, kind, clock))
            }
            T::Name | T::Text => {
                let kind = TextKind::new(objects, self.config.enter_by_grapheme_cluster);
                Rc::new(ContentElement::new(name, kind, clock))
            }
            T::Choice => Rc::new(ContentElement::new(name, ChoiceKind::new(objects), clock)),
            T::Music | T::Sound | T::Voice => {
                let kind = AudioKind::new(objects, Rc::clone(&self.audio_volume));
                Rc::new(ContentElement::new(name, kind, clock))
            }
            T::Video => Rc::new(ContentElement::new(name, VideoKind::new(objects), clock)),
            T::Animation => Rc::new(AnimationElement::new(name, registry, clock)),
            T::Effect => Rc::new(EffectElement::new(name, Rc::clone(&self.effects), clock)),
        };
        Ok(element)
    }
}

/// Named slots of one scene.
pub struct Stage {
    clock: Rc<dyn Clock>,
    elements: ElementRegistry,
    factory: Box<dyn ElementFactory>,
}

impl Stage {
    pub fn new(clock: Rc<dyn Clock>, factory: impl ElementFactory + 'static) -> Self {
        Self {
            clock,
            elements: Rc::new(RefCell::new(ElementMap::new())),
            factory: Box::new(factory),
        }
    }

    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    /// Slot controller for `name`, created on first use. `figure` and `figure1` name the
    /// same slot.
    pub fn element(&self, name: &str) -> StageResult<Rc<dyn Element>> {
        let (element_type, index) = parse_element_name(name)?;
        let key = format!("{element_type}{index}");
        if let Some(element) = self.elements.borrow().get(&key) {
            return Ok(Rc::clone(element));
        }
        let element = self.factory.create_element(
            &key,
            element_type,
            &self.elements,
            Rc::clone(&self.clock),
        )?;
        tracing::debug!(element = %key, "created element");
        self.elements.borrow_mut().insert(key, Rc::clone(&element));
        Ok(element)
    }

    pub fn element_names(&self) -> Vec<String> {
        self.elements.borrow().keys().cloned().collect()
    }

    fn snapshot(&self) -> Vec<(String, Rc<dyn Element>)> {
        self.elements
            .borrow()
            .iter()
            .map(|(name, element)| (name.clone(), Rc::clone(element)))
            .collect()
    }

    /// Start a transition of the slot addressed by `properties`.
    #[tracing::instrument(skip_all, fields(element = %properties.element_name()))]
    pub fn transition(
        &self,
        properties: ElementProperties,
        options: TransitionOptions,
    ) -> StageResult<Transition> {
        let element = self.element(&properties.element_name())?;
        Ok(element.transition(properties, options))
    }

    pub fn has_transition(&self, matcher: &ElementPropertyMatcher) -> bool {
        self.snapshot()
            .iter()
            .any(|(name, element)| element.has_transition(&matcher.property_matcher(name)))
    }

    pub fn wait(&self, matcher: &ElementPropertyMatcher) -> LocalBoxFuture<'static, ()> {
        let pending: Vec<_> = self
            .snapshot()
            .iter()
            .map(|(name, element)| element.wait(&matcher.property_matcher(name)))
            .collect();
        future::join_all(pending).map(|_| ()).boxed_local()
    }

    #[tracing::instrument(skip_all)]
    pub fn snap(&self, matcher: &ElementPropertyMatcher) {
        for (name, element) in self.snapshot() {
            element.snap(&matcher.property_matcher(&name));
        }
    }

    /// Destroy every slot, then the clock.
    pub fn destroy(&self) {
        for (name, element) in self.snapshot() {
            tracing::debug!(element = %name, "destroying element");
            element.destroy();
        }
        self.elements.borrow_mut().clear();
        self.clock.destroy();
    }
}

#[cfg(test)]
#[path = "../tests/unit/stage.rs"]
mod tests;
