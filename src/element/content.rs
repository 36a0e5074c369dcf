//! Generic controller of a slot that owns a visual object.
//!
//! The controller keeps at most one current object. A transition that changes the slot's
//! source constructs the incoming object in its asynchronous step, then in its final step
//! attaches it with the outgoing state and animates every changed property of both
//! objects. An object is destroyed only when its `value` animation settles at 0.
//!
//! Running property animations are indexed twice, by object and by property name; an
//! animation is present in exactly one entry of each index while it runs and in neither
//! once it settles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt as _, LocalBoxFuture};

use crate::animation::anim::{Animation, AnimationTiming, Lerp};
use crate::animation::ease::Easing;
use crate::clock::Clock;
use crate::element::multimap::MultiMap;
use crate::element::{Element, Transition, TransitionOptions, TransitionProcedure, TransitionStep};
use crate::foundation::error::{StageError, StageResult};
use crate::foundation::ids::ObjectId;
use crate::matcher::Matcher;
use crate::object::{MediaObject, ObjectFuture, VisualObject};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolve::{
    resolve_element_value, resolve_transition_duration, resolve_transition_easing,
};
use crate::property::resolved::{ResolvedProperties, ResolvedValue};
use crate::property::value::PropertyValue;

/// Kind-specific behavior plugged into a [`ContentElement`].
pub trait ContentKind: 'static {
    type Object: ?Sized + VisualObject + 'static;
    type Resolved: ResolvedProperties;

    /// Whether the outgoing and incoming objects transition concurrently. Without
    /// cross-fade the incoming object waits for the outgoing one to leave.
    fn cross_fade(&self) -> bool;

    fn resolve_properties(
        &self,
        properties: &ElementProperties,
        object: &Self::Object,
        value_changed: bool,
        options: &TransitionOptions,
    ) -> StageResult<Self::Resolved>;

    /// Resolve a single raw value for property `name`, as if the value were unchanged.
    fn resolve_property(
        &self,
        name: &str,
        value: Option<&PropertyValue>,
        element_type: ElementType,
        object: &Self::Object,
        options: &TransitionOptions,
    ) -> StageResult<ResolvedValue>;

    fn create_object(&self, element_type: ElementType, source: &str) -> ObjectFuture<Self::Object>;

    fn attach_object(&self, object: &Self::Object) {
        object.attach();
    }

    fn detach_object(&self, object: &Self::Object) {
        object.detach();
    }

    fn destroy_object(&self, object: &Self::Object) {
        object.destroy();
    }

    /// Units the default duration scales with, e.g. graphemes of an entering text.
    fn transition_element_count(&self, _object: &Self::Object, _is_enter: bool) -> u32 {
        1
    }

    /// Media playback answering to the `playback` pseudo-property.
    fn playback<'a>(&self, _object: &'a Self::Object) -> Option<&'a dyn MediaObject> {
        None
    }
}

struct Current<O: ?Sized> {
    object: Rc<O>,
    properties: ElementProperties,
    options: TransitionOptions,
}

impl<O: ?Sized> Clone for Current<O> {
    fn clone(&self) -> Self {
        Self {
            object: Rc::clone(&self.object),
            properties: self.properties.clone(),
            options: self.options,
        }
    }
}

struct ContentState<O: ?Sized> {
    current: Option<Current<O>>,
    object_transitions: MultiMap<ObjectId, Animation>,
    property_transitions: MultiMap<&'static str, Animation>,
}

struct ContentInner<K: ContentKind> {
    name: String,
    kind: K,
    clock: Rc<dyn Clock>,
    state: RefCell<ContentState<K::Object>>,
}

/// Slot controller for image, text, choice, audio and video slots.
///
/// Cloning yields another handle to the same slot.
pub struct ContentElement<K: ContentKind> {
    inner: Rc<ContentInner<K>>,
}

impl<K: ContentKind> Clone for ContentElement<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Resolved inputs of the final transition step, computed before anything is mutated.
struct Plan<R> {
    old_old: Option<R>,
    old_new: Option<R>,
    new_old: Option<R>,
    new_new: Option<R>,
    old_duration: f64,
    new_delay: f64,
    new_duration: f64,
    easings: Vec<Easing>,
}

fn snapshot_value<R: ResolvedProperties>(snapshot: &Option<R>, name: &str) -> Option<ResolvedValue> {
    snapshot.as_ref().and_then(|r| r.get(name))
}

impl<K: ContentKind> ContentElement<K> {
    pub fn new(name: impl Into<String>, kind: K, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(ContentInner {
                name: name.into(),
                kind,
                clock,
                state: RefCell::new(ContentState {
                    current: None,
                    object_transitions: MultiMap::default(),
                    property_transitions: MultiMap::default(),
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> &K {
        &self.inner.kind
    }

    pub fn current_object(&self) -> Option<Rc<K::Object>> {
        self.current().map(|c| c.object)
    }

    pub fn current_properties(&self) -> Option<ElementProperties> {
        self.current().map(|c| c.properties)
    }

    /// Number of running property animations.
    pub fn running_transitions(&self) -> usize {
        self.inner.state.borrow().property_transitions.len()
    }

    fn current(&self) -> Option<Current<K::Object>> {
        self.inner.state.borrow().current.clone()
    }

    fn plan(
        &self,
        old: Option<&Current<K::Object>>,
        new_object: Option<&Rc<K::Object>>,
        value_changed: bool,
        has_new_value: bool,
        properties: &ElementProperties,
        options: &TransitionOptions,
    ) -> StageResult<Plan<K::Resolved>> {
        let kind = &self.inner.kind;
        let cross_fade = kind.cross_fade();

        let (old_old, old_new) = match old {
            Some(old) => {
                let old_old =
                    kind.resolve_properties(&old.properties, &old.object, false, &old.options)?;
                let (target, target_options) = if cross_fade && has_new_value {
                    (properties, options)
                } else {
                    (&old.properties, &old.options)
                };
                let old_new =
                    kind.resolve_properties(target, &old.object, value_changed, target_options)?;
                (Some(old_old), Some(old_new))
            }
            None => (None, None),
        };
        let (new_old, new_new) = match new_object {
            Some(object) => {
                let (origin, origin_options) = match old {
                    Some(old) if cross_fade => (&old.properties, &old.options),
                    _ => (properties, options),
                };
                let new_old = kind.resolve_properties(origin, object, value_changed, origin_options)?;
                let new_new = kind.resolve_properties(properties, object, false, options)?;
                (Some(new_old), Some(new_new))
            }
            None => (None, None),
        };

        let old_duration = match old {
            Some(old) => resolve_transition_duration(
                properties,
                kind.transition_element_count(&old.object, false),
            )?,
            None => 0.0,
        };
        let new_delay = if cross_fade { 0.0 } else { old_duration };
        let new_duration = match new_object {
            Some(object) => {
                resolve_transition_duration(properties, kind.transition_element_count(object, true))?
            }
            None => 0.0,
        };
        let easings = K::Resolved::NAMES
            .iter()
            .map(|name| resolve_transition_easing(properties, name))
            .collect::<StageResult<Vec<_>>>()?;

        Ok(Plan {
            old_old,
            old_new,
            new_old,
            new_new,
            old_duration,
            new_delay,
            new_duration,
            easings,
        })
    }

    fn apply(
        &self,
        old: Option<Current<K::Object>>,
        value_changed: bool,
        has_new_value: bool,
        new_object: Option<Rc<K::Object>>,
        properties: ElementProperties,
        options: TransitionOptions,
    ) -> StageResult<()> {
        let kind = &self.inner.kind;
        let plan = match self.plan(
            old.as_ref(),
            new_object.as_ref(),
            value_changed,
            has_new_value,
            &properties,
            &options,
        ) {
            Ok(plan) => plan,
            Err(err) => {
                if let Some(object) = &new_object {
                    kind.destroy_object(object);
                }
                return Err(err);
            }
        };

        if let (Some(object), Some(entry)) = (&new_object, &plan.new_old) {
            for &name in K::Resolved::NAMES {
                let Some(value) = entry.get(name) else { continue };
                if let Err(err) = object.set_property(name, value) {
                    kind.destroy_object(object);
                    return Err(err);
                }
            }
            kind.attach_object(object);
            tracing::debug!(element = %self.inner.name, object = ?object.id(), "attached object");
        }

        let mut first_error = None;
        // The outgoing object's `value` animation starts last: settling it at 0 destroys the
        // object, which a zero duration does inside `play`.
        let mut old_value_transition = None;
        for (i, &name) in K::Resolved::NAMES.iter().enumerate() {
            let old_target = snapshot_value(&plan.old_new, name);
            let new_target = snapshot_value(&plan.new_new, name);
            let old_changed = snapshot_value(&plan.old_old, name) != old_target;
            let new_changed = snapshot_value(&plan.new_old, name) != new_target;
            if old_changed || new_changed {
                let running = self.inner.state.borrow().property_transitions.get(&name).to_vec();
                for animation in running {
                    animation.finish_or_cancel();
                }
            }

            let easing = plan.easings[i];
            if old_changed && let (Some(old), Some(target)) = (&old, old_target) {
                if name == "value" {
                    old_value_transition = Some((target, easing));
                } else if let Err(err) =
                    self.transition_property(&old.object, name, target, 0.0, plan.old_duration, easing)
                {
                    first_error.get_or_insert(err);
                }
            }
            if new_changed && let (Some(object), Some(target)) = (&new_object, new_target) {
                if let Err(err) = self.transition_property(
                    object,
                    name,
                    target,
                    plan.new_delay,
                    plan.new_duration,
                    easing,
                ) {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let (Some(old), Some((target, easing))) = (&old, old_value_transition)
            && let Err(err) =
                self.transition_property(&old.object, "value", target, 0.0, plan.old_duration, easing)
        {
            first_error.get_or_insert(err);
        }

        let next = if has_new_value {
            new_object
                .or_else(|| old.map(|o| o.object))
                .map(|object| Current {
                    object,
                    properties,
                    options,
                })
        } else {
            None
        };
        self.inner.state.borrow_mut().current = next;

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn transition_property(
        &self,
        object: &Rc<K::Object>,
        name: &'static str,
        target: ResolvedValue,
        delay: f64,
        duration: f64,
        easing: Easing,
    ) -> StageResult<()> {
        let Some(to) = target.as_number() else {
            return object.set_property(name, target);
        };
        let from = object.property(name)?.as_number().ok_or_else(|| {
            StageError::property(format!("property \"{name}\" of {} is not numeric", self.inner.name))
        })?;

        let timing = AnimationTiming {
            duration,
            easing,
            delay,
            ..AnimationTiming::default()
        };
        let updated = Rc::clone(object);
        let settled = Rc::clone(object);
        let element: Weak<ContentInner<K>> = Rc::downgrade(&self.inner);
        let animation = Animation::new(
            Rc::clone(&self.inner.clock),
            timing,
            move |progress, _| {
                let value = f64::lerp(&from, &to, progress);
                if let Err(err) = updated.set_property(name, value.into()) {
                    tracing::error!(%err, property = name, "failed to update property");
                }
            },
            move |_, animation| {
                if let Some(inner) = element.upgrade() {
                    ContentElement { inner }.on_transition_settled(&settled, name, to, animation);
                }
            },
        );
        {
            let mut state = self.inner.state.borrow_mut();
            state.object_transitions.insert(object.id(), animation.clone());
            state.property_transitions.insert(name, animation.clone());
        }
        tracing::debug!(
            element = %self.inner.name,
            object = ?object.id(),
            property = name,
            from,
            to,
            delay,
            duration,
            "transition property"
        );
        animation.play()
    }

    fn on_transition_settled(
        &self,
        object: &Rc<K::Object>,
        name: &'static str,
        target: f64,
        animation: &Animation,
    ) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.object_transitions.remove(&object.id(), animation);
            state.property_transitions.remove(&name, animation);
        }
        if name != "value" || target != 0.0 {
            return;
        }
        let running = self
            .inner
            .state
            .borrow()
            .object_transitions
            .get(&object.id())
            .to_vec();
        for animation in running {
            animation.finish_or_cancel();
        }
        let kind = &self.inner.kind;
        kind.detach_object(object);
        kind.destroy_object(object);
        tracing::debug!(element = %self.inner.name, object = ?object.id(), "destroyed object");
    }

    fn current_playback(&self, matcher: &dyn Matcher) -> Option<Rc<K::Object>> {
        if !matcher.matches("playback") {
            return None;
        }
        self.current_object().filter(|object| {
            self.inner
                .kind
                .playback(object)
                .is_some_and(|media| !media.is_looping())
        })
    }
}

impl<K: ContentKind> Element for ContentElement<K> {
    fn transition(&self, properties: ElementProperties, options: TransitionOptions) -> Transition {
        Transition::new(ContentTransition {
            element: self.clone(),
            properties: Some(properties),
            options,
            phase: Phase::Start,
        })
    }

    fn has_transition(&self, matcher: &dyn Matcher) -> bool {
        let running = self
            .inner
            .state
            .borrow()
            .property_transitions
            .keys()
            .any(|name| matcher.matches(name));
        if running {
            return true;
        }
        self.current_playback(matcher).is_some_and(|object| {
            self.inner
                .kind
                .playback(&object)
                .is_some_and(|media| media.is_playing())
        })
    }

    fn wait(&self, matcher: &dyn Matcher) -> LocalBoxFuture<'static, ()> {
        let mut pending: Vec<LocalBoxFuture<'static, ()>> = self
            .inner
            .state
            .borrow()
            .property_transitions
            .iter()
            .filter(|(name, _)| matcher.matches(name))
            .map(|(_, animation)| animation.finished_or_canceled())
            .collect();
        if let Some(object) = self.current_playback(matcher)
            && let Some(media) = self.inner.kind.playback(&object)
        {
            pending.push(media.playback_finished());
        }
        future::join_all(pending).map(|_| ()).boxed_local()
    }

    fn snap(&self, matcher: &dyn Matcher) {
        if let Some(object) = self.current_playback(matcher)
            && let Some(media) = self.inner.kind.playback(&object)
        {
            media.snap_playback();
        }
        let running: Vec<Animation> = self
            .inner
            .state
            .borrow()
            .property_transitions
            .iter()
            .filter(|(name, _)| matcher.matches(name))
            .map(|(_, animation)| animation.clone())
            .collect();
        for animation in running {
            animation.finish_or_cancel();
        }
    }

    fn animate(
        &self,
        matcher: &dyn Matcher,
        start: &PropertyValue,
        end: &PropertyValue,
        fraction: f64,
    ) -> StageResult<()> {
        let Some(current) = self.current() else {
            return Ok(());
        };
        let kind = &self.inner.kind;
        let element_type = current.properties.element_type;
        for &name in K::Resolved::NAMES {
            if !matcher.matches(name) {
                continue;
            }
            let resolve = |value: &PropertyValue, which: &str| -> StageResult<f64> {
                kind.resolve_property(name, Some(value), element_type, &current.object, &current.options)?
                    .as_number()
                    .ok_or_else(|| {
                        StageError::transition(format!(
                            "{which} value of animation ({value}) isn't animatable for property \"{name}\""
                        ))
                    })
            };
            let from = resolve(start, "start")?;
            let to = resolve(end, "end")?;
            current
                .object
                .set_property(name, f64::lerp(&from, &to, fraction).into())?;
        }
        Ok(())
    }

    fn deanimate(&self, matcher: &dyn Matcher) -> StageResult<()> {
        let Some(current) = self.current() else {
            return Ok(());
        };
        let kind = &self.inner.kind;
        for &name in K::Resolved::NAMES {
            if !matcher.matches(name) {
                continue;
            }
            let value = kind.resolve_property(
                name,
                current.properties.get(name),
                current.properties.element_type,
                &current.object,
                &current.options,
            )?;
            current.object.set_property(name, value)?;
        }
        Ok(())
    }

    fn destroy(&self) {
        let running: Vec<Animation> = self
            .inner
            .state
            .borrow()
            .object_transitions
            .iter()
            .map(|(_, animation)| animation.clone())
            .collect();
        for animation in running {
            animation.finish_or_cancel();
        }
        let current = self.inner.state.borrow_mut().current.take();
        if let Some(current) = current {
            let kind = &self.inner.kind;
            kind.detach_object(&current.object);
            kind.destroy_object(&current.object);
            tracing::debug!(element = %self.inner.name, object = ?current.object.id(), "destroyed object");
        }
    }
}

type Construction<O> = Rc<RefCell<Option<anyhow::Result<Rc<O>>>>>;

enum Phase<O: ?Sized> {
    Start,
    Unchanged,
    Apply {
        old: Option<Current<O>>,
        value_changed: bool,
        has_new_value: bool,
        construction: Option<Construction<O>>,
    },
    Finished,
}

struct ContentTransition<K: ContentKind> {
    element: ContentElement<K>,
    properties: Option<ElementProperties>,
    options: TransitionOptions,
    phase: Phase<K::Object>,
}

impl<K: ContentKind> ContentTransition<K> {
    fn start(&mut self, properties: &ElementProperties) -> StageResult<TransitionStep> {
        let old = self.element.current();
        let old_value = match &old {
            Some(old) => resolve_element_value(&old.properties)?,
            None => None,
        };
        let new_value = resolve_element_value(properties)?;
        if old_value.is_none() && new_value.is_none() {
            self.phase = Phase::Unchanged;
            return Ok(TransitionStep::ready());
        }

        let value_changed = old_value != new_value;
        let (construction, step) = match &new_value {
            Some(source) if value_changed => {
                tracing::debug!(
                    element = %self.element.name(),
                    source = %source,
                    "constructing object"
                );
                let slot: Construction<K::Object> = Rc::new(RefCell::new(None));
                let result = Rc::clone(&slot);
                let pending = self
                    .element
                    .inner
                    .kind
                    .create_object(properties.element_type, source)
                    .map(move |created| *result.borrow_mut() = Some(created))
                    .boxed_local();
                (Some(slot), TransitionStep::Pending(pending))
            }
            _ => (None, TransitionStep::ready()),
        };
        self.phase = Phase::Apply {
            old,
            value_changed,
            has_new_value: new_value.is_some(),
            construction,
        };
        Ok(step)
    }
}

impl<K: ContentKind> TransitionProcedure for ContentTransition<K> {
    fn resume(&mut self) -> StageResult<TransitionStep> {
        match std::mem::replace(&mut self.phase, Phase::Finished) {
            Phase::Start => {
                let Some(properties) = self.properties.take() else {
                    return Ok(TransitionStep::Done);
                };
                let step = self.start(&properties);
                self.properties = Some(properties);
                step
            }
            Phase::Unchanged | Phase::Finished => Ok(TransitionStep::Done),
            Phase::Apply {
                old,
                value_changed,
                has_new_value,
                construction,
            } => {
                let Some(properties) = self.properties.take() else {
                    return Ok(TransitionStep::Done);
                };
                let new_object = match construction {
                    None => None,
                    Some(slot) => match slot.borrow_mut().take() {
                        None => {
                            return Err(StageError::transition(format!(
                                "{} resumed before its object construction settled",
                                self.element.name()
                            )));
                        }
                        Some(Err(err)) => {
                            return Err(StageError::Other(err.context(format!(
                                "failed to create object for {}",
                                self.element.name()
                            ))));
                        }
                        Some(Ok(object)) => Some(object),
                    },
                };
                self.element.apply(
                    old,
                    value_changed,
                    has_new_value,
                    new_object,
                    properties,
                    self.options,
                )?;
                Ok(TransitionStep::Done)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/element/content.rs"]
mod tests;
