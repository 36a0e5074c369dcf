//! In-memory visual objects for tests and offline export.
//!
//! Every headless object writes its lifecycle events and property values into a shared
//! [`HeadlessLog`], so a driver can inspect what a renderer would have shown without
//! rendering anything.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::{self, FutureExt as _, LocalBoxFuture};
use indexmap::IndexMap;
use unicode_segmentation::UnicodeSegmentation as _;

use crate::clock::Clock;
use crate::element::effect::EffectLayer;
use crate::foundation::error::{StageError, StageResult};
use crate::foundation::ids::{CallbackId, ObjectId};
use crate::object::{
    ChoiceObject, ImageObject, MediaObject, ObjectFactory, ObjectFuture, TextObject, VisualObject,
};
use crate::property::element::ElementType;
use crate::property::resolved::{
    AudioResolved, ChoiceResolved, ImageResolved, ResolvedProperties, ResolvedValue, TextResolved,
    VideoResolved,
};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ObjectEvent {
    Created {
        id: ObjectId,
        element_type: ElementType,
        source: String,
    },
    Attached {
        id: ObjectId,
    },
    Detached {
        id: ObjectId,
    },
    Destroyed {
        id: ObjectId,
    },
}

/// Last known state of one headless object.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ObjectState {
    pub id: ObjectId,
    pub element_type: ElementType,
    pub source: String,
    pub attached: bool,
    pub destroyed: bool,
    pub properties: IndexMap<String, ResolvedValue>,
}

/// Object states in creation order, plus the lifecycle events recorded so far.
///
/// A log created with [`HeadlessLog::live_only`] drops an object's state once it is destroyed
/// and records no events, so its size follows the live objects only.
pub struct HeadlessLog {
    history: bool,
    events: RefCell<Vec<ObjectEvent>>,
    objects: RefCell<IndexMap<ObjectId, ObjectState>>,
}

impl HeadlessLog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::with_history(true))
    }

    pub fn live_only() -> Rc<Self> {
        Rc::new(Self::with_history(false))
    }

    fn with_history(history: bool) -> Self {
        Self {
            history,
            events: RefCell::new(Vec::new()),
            objects: RefCell::new(IndexMap::new()),
        }
    }

    pub fn events(&self) -> Vec<ObjectEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<ObjectEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn object(&self, id: ObjectId) -> Option<ObjectState> {
        self.objects.borrow().get(&id).cloned()
    }

    /// Most recently created object for `source`.
    pub fn find(&self, element_type: ElementType, source: &str) -> Option<ObjectState> {
        self.objects
            .borrow()
            .values()
            .rev()
            .find(|o| o.element_type == element_type && o.source == source)
            .cloned()
    }

    /// Attached, not yet destroyed objects in creation order.
    pub fn attached(&self) -> Vec<ObjectState> {
        self.objects
            .borrow()
            .values()
            .filter(|o| o.attached && !o.destroyed)
            .cloned()
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.objects.borrow().values().filter(|o| !o.destroyed).count()
    }

    fn record(&self, event: ObjectEvent) {
        let mut objects = self.objects.borrow_mut();
        match &event {
            ObjectEvent::Created { .. } => {}
            ObjectEvent::Attached { id } => {
                if let Some(o) = objects.get_mut(id) {
                    o.attached = true;
                }
            }
            ObjectEvent::Detached { id } => {
                if let Some(o) = objects.get_mut(id) {
                    o.attached = false;
                }
            }
            ObjectEvent::Destroyed { id } => {
                if !self.history {
                    objects.shift_remove(id);
                } else if let Some(o) = objects.get_mut(id) {
                    o.attached = false;
                    o.destroyed = true;
                }
            }
        }
        drop(objects);
        tracing::trace!(?event, "headless object event");
        if self.history {
            self.events.borrow_mut().push(event);
        }
    }
}

fn initial_properties(element_type: ElementType) -> IndexMap<String, ResolvedValue> {
    use ElementType as T;
    let (names, booleans, strings): (&[&str], &[&str], &[&str]) = match element_type {
        T::Background | T::Figure | T::Foreground | T::Avatar => (ImageResolved::NAMES, &[], &[]),
        T::Name | T::Text => (TextResolved::NAMES, &[], &[]),
        T::Choice => (ChoiceResolved::NAMES, &["enabled"], &["script"]),
        T::Music | T::Sound | T::Voice => (AudioResolved::NAMES, &["loop"], &[]),
        T::Video => (VideoResolved::NAMES, &["loop"], &[]),
        T::Animation | T::Effect => (&[], &[], &[]),
    };
    names
        .iter()
        .map(|&name| {
            let value = if booleans.contains(&name) {
                ResolvedValue::Boolean(name == "enabled")
            } else if strings.contains(&name) {
                ResolvedValue::String(String::new())
            } else if matches!(name, "value" | "scaleX" | "scaleY" | "alpha" | "volume") {
                ResolvedValue::Number(1.0)
            } else {
                ResolvedValue::Number(0.0)
            };
            (name.to_string(), value)
        })
        .collect()
}

struct Playback {
    clock: Option<Rc<dyn Clock>>,
    duration: Option<f64>,
    timer: CallbackId,
    playing: Cell<bool>,
    waiters: RefCell<Vec<oneshot::Sender<()>>>,
    setting_volume: Cell<f64>,
}

/// Headless implementation of every visual object kind.
pub struct HeadlessObject {
    id: ObjectId,
    element_type: ElementType,
    source: String,
    log: Rc<HeadlessLog>,
    natural_size: (f64, f64),
    playback: Option<Playback>,
    highlighted: Cell<bool>,
    selected: Cell<bool>,
    this: Weak<HeadlessObject>,
}

impl HeadlessObject {
    fn new(
        log: Rc<HeadlessLog>,
        element_type: ElementType,
        source: &str,
        natural_size: (f64, f64),
        playback: Option<Playback>,
    ) -> Rc<Self> {
        let id = ObjectId::next();
        log.objects.borrow_mut().insert(
            id,
            ObjectState {
                id,
                element_type,
                source: source.to_string(),
                attached: false,
                destroyed: false,
                properties: initial_properties(element_type),
            },
        );
        log.record(ObjectEvent::Created {
            id,
            element_type,
            source: source.to_string(),
        });
        Rc::new_cyclic(|this| Self {
            id,
            element_type,
            source: source.to_string(),
            log,
            natural_size,
            playback,
            highlighted: Cell::new(false),
            selected: Cell::new(false),
            this: this.clone(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted.get()
    }

    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    /// Volume after the logical value, the `volume` property and the user setting.
    pub fn effective_volume(&self) -> f64 {
        let number = |name: &str| {
            self.property(name)
                .ok()
                .and_then(|v| v.as_number())
                .unwrap_or(1.0)
        };
        let setting = self.playback.as_ref().map_or(1.0, |p| p.setting_volume.get());
        number("value") * number("volume") * setting
    }

    fn stop_playback(&self) {
        let Some(playback) = &self.playback else {
            return;
        };
        if let Some(clock) = &playback.clock {
            clock.remove_timeout_callback(playback.timer);
        }
        playback.playing.set(false);
        for waiter in playback.waiters.borrow_mut().drain(..) {
            let _ = waiter.send(());
        }
    }
}

impl VisualObject for HeadlessObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn property(&self, name: &str) -> StageResult<ResolvedValue> {
        self.log
            .objects
            .borrow()
            .get(&self.id)
            .and_then(|o| o.properties.get(name).cloned())
            .ok_or_else(|| {
                StageError::property(format!(
                    "unknown property \"{name}\" on {} object",
                    self.element_type
                ))
            })
    }

    fn set_property(&self, name: &str, value: ResolvedValue) -> StageResult<()> {
        let mut objects = self.log.objects.borrow_mut();
        let state = objects
            .get_mut(&self.id)
            .filter(|o| !o.destroyed)
            .ok_or_else(|| {
                StageError::property(format!(
                    "cannot set \"{name}\" on destroyed {} object \"{}\"",
                    self.element_type, self.source
                ))
            })?;
        let slot = state
            .properties
            .get_mut(name)
            .ok_or_else(|| {
                StageError::property(format!(
                    "unknown property \"{name}\" on {} object",
                    self.element_type
                ))
            })?;
        if std::mem::discriminant(slot) != std::mem::discriminant(&value) {
            return Err(StageError::property(format!(
                "cannot set {} property \"{name}\" to \"{value}\"",
                self.element_type
            )));
        }
        *slot = value;
        Ok(())
    }

    fn attach(&self) {
        self.log.record(ObjectEvent::Attached { id: self.id });
        let Some(playback) = &self.playback else {
            return;
        };
        playback.playing.set(true);
        if self.is_looping() {
            return;
        }
        if let (Some(clock), Some(duration)) = (&playback.clock, playback.duration) {
            let this = self.this.clone();
            clock.add_timeout_callback(
                duration,
                playback.timer,
                Rc::new(move |_| {
                    if let Some(this) = this.upgrade()
                        && !this.is_looping()
                    {
                        this.stop_playback();
                    }
                }),
            );
        }
    }

    fn detach(&self) {
        self.stop_playback();
        self.log.record(ObjectEvent::Detached { id: self.id });
    }

    fn destroy(&self) {
        self.stop_playback();
        self.log.record(ObjectEvent::Destroyed { id: self.id });
    }
}

impl ImageObject for HeadlessObject {
    fn natural_size(&self) -> (f64, f64) {
        self.natural_size
    }
}

impl TextObject for HeadlessObject {
    fn transition_element_count(&self) -> u32 {
        u32::try_from(self.source.graphemes(true).count()).unwrap_or(u32::MAX)
    }
}

impl ChoiceObject for HeadlessObject {
    fn set_highlighted(&self, highlighted: bool) {
        self.highlighted.set(highlighted);
    }

    fn select(&self) {
        self.selected.set(true);
    }
}

impl MediaObject for HeadlessObject {
    fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.playing.get())
    }

    fn is_looping(&self) -> bool {
        self.property("loop")
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn playback_finished(&self) -> LocalBoxFuture<'static, ()> {
        match &self.playback {
            Some(playback) if playback.playing.get() => {
                let (tx, rx) = oneshot::channel();
                playback.waiters.borrow_mut().push(tx);
                rx.map(|_| ()).boxed_local()
            }
            _ => future::ready(()).boxed_local(),
        }
    }

    fn snap_playback(&self) {
        self.stop_playback();
    }

    fn set_setting_volume(&self, volume: f64) {
        if let Some(playback) = &self.playback {
            playback.setting_volume.set(volume);
        }
    }
}

/// Object factory producing [`HeadlessObject`]s.
pub struct HeadlessObjects {
    log: Rc<HeadlessLog>,
    clock: Option<Rc<dyn Clock>>,
    default_natural_size: (f64, f64),
    natural_sizes: HashMap<String, (f64, f64)>,
    media_durations: HashMap<String, f64>,
    failing: HashSet<String>,
    created: RefCell<Vec<Weak<HeadlessObject>>>,
}

impl HeadlessObjects {
    pub fn new(log: Rc<HeadlessLog>) -> Self {
        Self {
            log,
            clock: None,
            default_natural_size: (100.0, 100.0),
            natural_sizes: HashMap::new(),
            media_durations: HashMap::new(),
            failing: HashSet::new(),
            created: RefCell::new(Vec::new()),
        }
    }

    /// Clock used to end media playback after its duration.
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_default_natural_size(mut self, width: f64, height: f64) -> Self {
        self.default_natural_size = (width, height);
        self
    }

    pub fn with_natural_size(mut self, source: &str, width: f64, height: f64) -> Self {
        self.natural_sizes.insert(source.to_string(), (width, height));
        self
    }

    /// Media without a duration plays until it is snapped or detached.
    pub fn with_media_duration(mut self, source: &str, millis: f64) -> Self {
        self.media_durations.insert(source.to_string(), millis);
        self
    }

    /// Construction of `source` fails.
    pub fn with_failing_source(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }

    pub fn log(&self) -> &Rc<HeadlessLog> {
        &self.log
    }

    /// Live object with the given id.
    pub fn get(&self, id: ObjectId) -> Option<Rc<HeadlessObject>> {
        self.created
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .find(|o| o.id == id)
    }

    fn create(
        &self,
        element_type: ElementType,
        source: &str,
        media: bool,
    ) -> anyhow::Result<Rc<HeadlessObject>> {
        if self.failing.contains(source) {
            anyhow::bail!("failed to load {element_type} \"{source}\"");
        }
        let natural_size = self
            .natural_sizes
            .get(source)
            .copied()
            .unwrap_or(self.default_natural_size);
        let playback = media.then(|| Playback {
            clock: self.clock.clone(),
            duration: self.media_durations.get(source).copied(),
            timer: CallbackId::next(),
            playing: Cell::new(false),
            waiters: RefCell::new(Vec::new()),
            setting_volume: Cell::new(1.0),
        });
        let object = HeadlessObject::new(
            self.log.clone(),
            element_type,
            source,
            natural_size,
            playback,
        );
        let mut created = self.created.borrow_mut();
        created.retain(|o| o.strong_count() > 0);
        created.push(Rc::downgrade(&object));
        Ok(object)
    }
}

impl ObjectFactory for HeadlessObjects {
    fn create_image(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn ImageObject> {
        let object = self
            .create(element_type, source, false)
            .map(|o| o as Rc<dyn ImageObject>);
        future::ready(object).boxed_local()
    }

    fn create_text(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn TextObject> {
        let object = self
            .create(element_type, source, false)
            .map(|o| o as Rc<dyn TextObject>);
        future::ready(object).boxed_local()
    }

    fn create_choice(&self, source: &str) -> ObjectFuture<dyn ChoiceObject> {
        let object = self
            .create(ElementType::Choice, source, false)
            .map(|o| o as Rc<dyn ChoiceObject>);
        future::ready(object).boxed_local()
    }

    fn create_audio(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn MediaObject> {
        let object = self
            .create(element_type, source, true)
            .map(|o| o as Rc<dyn MediaObject>);
        future::ready(object).boxed_local()
    }

    fn create_video(&self, source: &str) -> ObjectFuture<dyn MediaObject> {
        let object = self
            .create(ElementType::Video, source, true)
            .map(|o| o as Rc<dyn MediaObject>);
        future::ready(object).boxed_local()
    }
}

/// Overlay layer that only remembers its opacity.
#[derive(Debug)]
pub struct HeadlessLayer {
    opacity: Cell<f64>,
    visible: Cell<bool>,
}

impl HeadlessLayer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            opacity: Cell::new(1.0),
            visible: Cell::new(false),
        })
    }

    pub fn opacity(&self) -> f64 {
        self.opacity.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

impl EffectLayer for HeadlessLayer {
    fn show(&self) {
        self.opacity.set(1.0);
        self.visible.set(true);
    }

    fn set_opacity(&self, opacity: f64) {
        self.opacity.set(opacity);
    }

    fn hide(&self) {
        self.visible.set(false);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/object/headless.rs"]
mod tests;
