use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::FutureExt as _;
use indexmap::IndexMap;

use crate::element::content::ContentKind;
use crate::element::TransitionOptions;
use crate::foundation::error::StageResult;
use crate::foundation::ids::ObjectId;
use crate::object::{MediaObject, ObjectFactory, ObjectFuture};
use crate::property::element::{ElementProperties, ElementType};
use crate::property::resolved::{AudioResolved, ResolvedValue};
use crate::property::value::PropertyValue;

/// Looks up the user's volume for an audio source.
pub type VolumeLookup = Box<dyn Fn(ElementType, &str) -> f64>;

struct Tracked {
    object: Weak<dyn MediaObject>,
    element_type: ElementType,
    source: String,
}

/// User volume settings applied to every live audio object.
pub struct AudioVolumeSetting {
    lookup: VolumeLookup,
    objects: RefCell<IndexMap<ObjectId, Tracked>>,
}

impl AudioVolumeSetting {
    pub fn new(lookup: impl Fn(ElementType, &str) -> f64 + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
            objects: RefCell::new(IndexMap::new()),
        }
    }

    /// Full volume for every source.
    pub fn unity() -> Self {
        Self::new(|_, _| 1.0)
    }

    pub fn on_created(&self, object: &Rc<dyn MediaObject>, element_type: ElementType, source: &str) {
        object.set_setting_volume((self.lookup)(element_type, source));
        self.objects.borrow_mut().insert(
            object.id(),
            Tracked {
                object: Rc::downgrade(object),
                element_type,
                source: source.to_string(),
            },
        );
    }

    pub fn on_destroyed(&self, object: &dyn MediaObject) {
        self.objects.borrow_mut().shift_remove(&object.id());
    }

    /// Reapply the lookup to every live object after the settings changed.
    pub fn on_changed(&self) {
        let tracked: Vec<(Rc<dyn MediaObject>, f64)> = self
            .objects
            .borrow()
            .values()
            .filter_map(|t| {
                let object = t.object.upgrade()?;
                Some((object, (self.lookup)(t.element_type, &t.source)))
            })
            .collect();
        for (object, volume) in tracked {
            object.set_setting_volume(volume);
        }
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

/// Music, sound and voice slots.
pub struct AudioKind {
    objects: Rc<dyn ObjectFactory>,
    volume: Rc<AudioVolumeSetting>,
}

impl AudioKind {
    pub fn new(objects: Rc<dyn ObjectFactory>, volume: Rc<AudioVolumeSetting>) -> Self {
        Self { objects, volume }
    }
}

impl ContentKind for AudioKind {
    type Object = dyn MediaObject;
    type Resolved = AudioResolved;

    fn cross_fade(&self) -> bool {
        true
    }

    fn resolve_properties(
        &self,
        properties: &ElementProperties,
        _object: &dyn MediaObject,
        value_changed: bool,
        _options: &TransitionOptions,
    ) -> StageResult<AudioResolved> {
        AudioResolved::resolve(properties, value_changed)
    }

    fn resolve_property(
        &self,
        name: &str,
        value: Option<&PropertyValue>,
        element_type: ElementType,
        _object: &dyn MediaObject,
        _options: &TransitionOptions,
    ) -> StageResult<ResolvedValue> {
        AudioResolved::resolve_property(name, value, element_type, false)
    }

    fn create_object(&self, element_type: ElementType, source: &str) -> ObjectFuture<dyn MediaObject> {
        let volume = Rc::clone(&self.volume);
        let source_id = source.to_string();
        self.objects
            .create_audio(element_type, source)
            .map(move |created| {
                created.inspect(|object| volume.on_created(object, element_type, &source_id))
            })
            .boxed_local()
    }

    fn destroy_object(&self, object: &dyn MediaObject) {
        self.volume.on_destroyed(object);
        object.destroy();
    }

    fn playback<'a>(&self, object: &'a dyn MediaObject) -> Option<&'a dyn MediaObject> {
        Some(object)
    }
}
