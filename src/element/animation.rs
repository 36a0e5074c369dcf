//! Animation slots: keyframe animations over the properties of other slots.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt as _, LocalBoxFuture};

use crate::animation::anim::Animation;
use crate::clock::Clock;
use crate::element::{
    Element, ElementMap, ElementRegistry, Transition, TransitionOptions, TransitionProcedure,
    TransitionStep,
};
use crate::foundation::error::StageResult;
use crate::matcher::{ElementPropertyMatcher, Matcher};
use crate::property::element::ElementProperties;
use crate::property::resolved::AnimationResolved;
use crate::property::value::PropertyValue;

#[derive(Default)]
struct AnimationState {
    properties: Option<ElementProperties>,
    animation: Option<Animation>,
}

struct AnimationInner {
    name: String,
    registry: Weak<RefCell<ElementMap>>,
    clock: Rc<dyn Clock>,
    state: RefCell<AnimationState>,
}

/// Slot whose value selects `element.property` targets animated through keyframes.
///
/// Every frame, each slot of the stage resolves the surrounding keyframe values with its
/// own resolver and interpolates the matched properties; once the animation settles, the
/// targets are restored to their own values.
#[derive(Clone)]
pub struct AnimationElement {
    inner: Rc<AnimationInner>,
}

fn snapshot(registry: &Weak<RefCell<ElementMap>>) -> Vec<(String, Rc<dyn Element>)> {
    registry
        .upgrade()
        .map(|elements| {
            elements
                .borrow()
                .iter()
                .map(|(name, element)| (name.clone(), Rc::clone(element)))
                .collect()
        })
        .unwrap_or_default()
}

impl AnimationElement {
    pub fn new(name: impl Into<String>, registry: &ElementRegistry, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(AnimationInner {
                name: name.into(),
                registry: Rc::downgrade(registry),
                clock,
                state: RefCell::new(AnimationState::default()),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().animation.is_some()
    }

    fn finite_animation(&self, matcher: &dyn Matcher) -> Option<Animation> {
        if !matcher.matches("playback") {
            return None;
        }
        self.inner
            .state
            .borrow()
            .animation
            .clone()
            .filter(|animation| animation.timing().iteration_count != f64::INFINITY)
    }

    fn apply(&self, properties: ElementProperties) -> StageResult<()> {
        let unchanged = self.inner.state.borrow().properties.as_ref() == Some(&properties);
        if unchanged {
            return Ok(());
        }

        let old = self.inner.state.borrow_mut().animation.take();
        if let Some(old) = old {
            old.finish_or_cancel();
        }

        let resolved = match AnimationResolved::resolve(&properties) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.inner.state.borrow_mut().properties = Some(properties);
                return Err(err);
            }
        };
        let Some(matcher) = resolved.matcher.clone() else {
            self.inner.state.borrow_mut().properties = Some(properties);
            return Ok(());
        };

        let timing = resolved.timing;
        let registry = self.inner.registry.clone();
        let update_matcher = matcher.clone();
        let element = Rc::downgrade(&self.inner);
        let settle_registry = registry.clone();
        let animation = Animation::new(
            Rc::clone(&self.inner.clock),
            timing,
            move |progress, _| animate_all(&registry, &update_matcher, &resolved, progress),
            move |_, animation| {
                deanimate_all(&settle_registry, &matcher);
                if let Some(inner) = element.upgrade() {
                    let mut state = inner.state.borrow_mut();
                    if state.animation.as_ref() == Some(animation) {
                        state.animation = None;
                    }
                }
            },
        );
        {
            let mut state = self.inner.state.borrow_mut();
            state.properties = Some(properties);
            state.animation = Some(animation.clone());
        }
        tracing::debug!(element = %self.inner.name, timing = ?animation.timing(), "play animation");
        animation.play()
    }
}

fn animate_all(
    registry: &Weak<RefCell<ElementMap>>,
    matcher: &ElementPropertyMatcher,
    resolved: &AnimationResolved,
    progress: f64,
) {
    let Some(segment) = resolved.segment(progress) else {
        return;
    };
    for (name, element) in snapshot(registry) {
        let properties = matcher.property_matcher(&name);
        if let Err(err) = element.animate(
            &properties,
            &segment.start.value,
            &segment.end.value,
            segment.fraction,
        ) {
            tracing::error!(%err, element = %name, "failed to animate element");
        }
    }
}

fn deanimate_all(registry: &Weak<RefCell<ElementMap>>, matcher: &ElementPropertyMatcher) {
    for (name, element) in snapshot(registry) {
        if let Err(err) = element.deanimate(&matcher.property_matcher(&name)) {
            tracing::error!(%err, element = %name, "failed to restore element");
        }
    }
}

struct AnimationTransition {
    element: AnimationElement,
    properties: Option<ElementProperties>,
    started: bool,
}

impl TransitionProcedure for AnimationTransition {
    fn resume(&mut self) -> StageResult<TransitionStep> {
        if !self.started {
            self.started = true;
            return Ok(TransitionStep::ready());
        }
        if let Some(properties) = self.properties.take() {
            self.element.apply(properties)?;
        }
        Ok(TransitionStep::Done)
    }
}

impl Element for AnimationElement {
    fn transition(&self, properties: ElementProperties, _options: TransitionOptions) -> Transition {
        Transition::new(AnimationTransition {
            element: self.clone(),
            properties: Some(properties),
            started: false,
        })
    }

    fn has_transition(&self, matcher: &dyn Matcher) -> bool {
        self.finite_animation(matcher).is_some()
    }

    fn wait(&self, matcher: &dyn Matcher) -> LocalBoxFuture<'static, ()> {
        match self.finite_animation(matcher) {
            Some(animation) => animation.finished_or_canceled(),
            None => future::ready(()).boxed_local(),
        }
    }

    fn snap(&self, matcher: &dyn Matcher) {
        if let Some(animation) = self.finite_animation(matcher) {
            animation.finish_or_cancel();
        }
    }

    fn animate(
        &self,
        _matcher: &dyn Matcher,
        _start: &PropertyValue,
        _end: &PropertyValue,
        _fraction: f64,
    ) -> StageResult<()> {
        Ok(())
    }

    fn deanimate(&self, _matcher: &dyn Matcher) -> StageResult<()> {
        Ok(())
    }

    fn destroy(&self) {
        let animation = self.inner.state.borrow().animation.clone();
        if let Some(animation) = animation {
            animation.finish_or_cancel();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/element/animation.rs"]
mod tests;
