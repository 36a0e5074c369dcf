//! Offline export: scripted cue sheets played on the discrete frame clock.
//!
//! A [`CueSheet`] lists property updates stamped with the frame they are issued at. The
//! [`OfflineExport`] driver applies them to a [`Stage`] built on headless objects and dumps
//! what a renderer would show at every frame. Time only advances between frames, so two
//! runs of one cue sheet produce identical dumps.

use std::collections::BTreeMap;
use std::rc::Rc;

use futures::FutureExt as _;
use indexmap::IndexMap;

use crate::clock::{Clock, FrameClock};
use crate::config::StageConfig;
use crate::element::{BuiltinEffects, Transition, TransitionOptions};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{StageError, StageResult};
use crate::matcher::ElementPropertyMatcher;
use crate::object::headless::{HeadlessLayer, HeadlessLog, HeadlessObjects, ObjectState};
use crate::property::element::{ElementProperties, ElementType, Property, parse_element_name};
use crate::property::resolve::resolve_element_value;
use crate::property::resolved::ResolvedValue;
use crate::stage::{Stage, StandardElements};

/// Overlay layer name of the built-in cross-fade effect.
pub const CROSS_FADE_LAYER: &str = "cross-fade";

/// Facts about sources that headless objects cannot discover on their own.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssetHints {
    /// Natural `[width, height]` of image sources, in asset pixels.
    pub natural_sizes: BTreeMap<String, [f64; 2]>,
    /// Playback length of media sources, in milliseconds.
    pub media_durations: BTreeMap<String, f64>,
}

/// Script assignments for one slot, e.g. `{"value": "alice", "anchor_x": "50%"}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CueCommand {
    pub element: String,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl CueCommand {
    fn parse(&self) -> StageResult<Vec<Property>> {
        self.properties
            .iter()
            .map(|(name, literal)| Property::parse(&self.element, name, literal))
            .collect()
    }
}

/// Updates issued together at one frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cue {
    pub frame: u64,
    /// Selectors snapped before the commands run, e.g. `["*"]` to skip ahead.
    #[serde(default)]
    pub snap: Vec<String>,
    #[serde(default)]
    pub commands: Vec<CueCommand>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CueSheet {
    #[serde(default)]
    pub config: StageConfig,
    /// Number of frames to export.
    pub frames: u64,
    #[serde(default)]
    pub assets: AssetHints,
    /// Default `[x, y]` of avatar slots.
    #[serde(default)]
    pub avatar_position: Option<[f64; 2]>,
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl CueSheet {
    /// Parse and validate a JSON cue sheet.
    pub fn from_json(json: &str) -> StageResult<Self> {
        let sheet: Self = serde_json::from_str(json)
            .map_err(|e| StageError::validation(format!("invalid cue sheet: {e}")))?;
        sheet.validate()?;
        Ok(sheet)
    }

    pub fn validate(&self) -> StageResult<()> {
        self.config.validate()?;
        if self.frames == 0 {
            return Err(StageError::validation("frames must be > 0"));
        }
        for cue in &self.cues {
            if cue.frame >= self.frames {
                return Err(StageError::validation(format!(
                    "cue at frame {} is past the last frame ({})",
                    cue.frame,
                    self.frames - 1
                )));
            }
            if !cue.snap.is_empty() {
                ElementPropertyMatcher::parse_all(cue.snap.iter().map(String::as_str))?;
            }
            for command in &cue.commands {
                command.parse()?;
            }
        }
        Ok(())
    }

    /// Number of property assignments over all cues.
    pub fn command_count(&self) -> usize {
        self.cues
            .iter()
            .flat_map(|cue| &cue.commands)
            .map(|command| command.properties.len())
            .sum()
    }
}

/// One attached object as a renderer would draw it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ObjectDump {
    pub element_type: ElementType,
    pub source: String,
    pub properties: IndexMap<String, ResolvedValue>,
}

impl From<ObjectState> for ObjectDump {
    fn from(state: ObjectState) -> Self {
        Self {
            element_type: state.element_type,
            source: state.source,
            properties: state.properties,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct LayerDump {
    pub visible: bool,
    pub opacity: f64,
}

/// Stage contents at one frame, after that frame's cues ran.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameDump {
    pub frame: u64,
    /// Clock time in milliseconds.
    pub time: f64,
    /// Attached objects in creation order.
    pub objects: Vec<ObjectDump>,
    pub layers: IndexMap<String, LayerDump>,
}

/// Plays a [`CueSheet`] frame by frame.
pub struct OfflineExport {
    sheet: CueSheet,
    clock: Rc<FrameClock>,
    log: Rc<HeadlessLog>,
    layers: IndexMap<String, Rc<HeadlessLayer>>,
    stage: Stage,
    /// Accumulated raw properties per slot.
    properties: IndexMap<String, ElementProperties>,
    /// `(index, count)` of every occupied figure slot.
    figures: IndexMap<String, (u32, u32)>,
    next_cue: usize,
}

impl OfflineExport {
    pub fn new(sheet: CueSheet) -> StageResult<Self> {
        sheet.validate()?;
        let clock = Rc::new(FrameClock::new(sheet.config.fps));
        let log = HeadlessLog::live_only();
        let mut objects = HeadlessObjects::new(Rc::clone(&log)).with_clock(clock.clone());
        for (source, [width, height]) in &sheet.assets.natural_sizes {
            objects = objects.with_natural_size(source, *width, *height);
        }
        for (source, millis) in &sheet.assets.media_durations {
            objects = objects.with_media_duration(source, *millis);
        }

        let layer = HeadlessLayer::new();
        let effects = BuiltinEffects::new().with_layer(CROSS_FADE_LAYER, layer.clone());
        let elements =
            StandardElements::new(Rc::new(objects), sheet.config).with_effects(Rc::new(effects));
        let stage = Stage::new(clock.clone(), elements);

        let mut sheet = sheet;
        sheet.cues.sort_by_key(|cue| cue.frame);
        Ok(Self {
            sheet,
            clock,
            log,
            layers: IndexMap::from([(CROSS_FADE_LAYER.to_string(), layer)]),
            stage,
            properties: IndexMap::new(),
            figures: IndexMap::new(),
            next_cue: 0,
        })
    }

    pub fn frame(&self) -> FrameIndex {
        self.clock.frame()
    }

    pub fn is_done(&self) -> bool {
        self.clock.frame().0 >= self.sheet.frames
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Run the cues of the current frame, dump the stage, then advance one frame.
    pub fn step(&mut self) -> StageResult<FrameDump> {
        let frame = self.clock.frame().0;
        while let Some(cue) = self.sheet.cues.get(self.next_cue)
            && cue.frame <= frame
        {
            let cue = cue.clone();
            self.next_cue += 1;
            self.apply(&cue)?;
        }
        let dump = self.dump();
        self.clock.next_frame();
        Ok(dump)
    }

    /// Dump every remaining frame.
    pub fn run(mut self) -> StageResult<Vec<FrameDump>> {
        let mut dumps = Vec::new();
        while !self.is_done() {
            dumps.push(self.step()?);
        }
        self.stage.destroy();
        Ok(dumps)
    }

    fn apply(&mut self, cue: &Cue) -> StageResult<()> {
        tracing::debug!(frame = cue.frame, commands = cue.commands.len(), "applying cue");
        if !cue.snap.is_empty() {
            let matcher = ElementPropertyMatcher::parse_all(cue.snap.iter().map(String::as_str))?;
            self.stage.snap(&matcher);
        }

        let mut touched: Vec<String> = Vec::new();
        for command in &cue.commands {
            let (element_type, index) = parse_element_name(&command.element)?;
            let slot = self
                .properties
                .entry(format!("{element_type}{index}"))
                .or_insert_with(|| ElementProperties::new(element_type, index));
            for property in command.parse()? {
                slot.apply(property)?;
            }
            let name = slot.element_name();
            if !touched.contains(&name) {
                touched.push(name);
            }
        }

        // Figures move whenever the set of occupied figure slots changes.
        let figures = self.figure_layout()?;
        for (name, placement) in &figures {
            if self.figures.get(name) != Some(placement) && !touched.contains(name) {
                touched.push(name.clone());
            }
        }
        self.figures = figures;

        let mut transitions = Vec::with_capacity(touched.len());
        for name in &touched {
            let Some(properties) = self.properties.get(name) else {
                continue;
            };
            let options = self.options(name, properties.element_type);
            transitions.push(self.stage.transition(properties.clone(), options)?);
        }
        Transition::run_all(transitions)
            .now_or_never()
            .ok_or_else(|| {
                StageError::transition(format!(
                    "transitions issued at frame {} did not settle within the frame",
                    cue.frame
                ))
            })?
    }

    fn figure_layout(&self) -> StageResult<IndexMap<String, (u32, u32)>> {
        let mut occupied = Vec::new();
        for (name, properties) in &self.properties {
            if properties.element_type == ElementType::Figure
                && resolve_element_value(properties)?.is_some()
            {
                occupied.push((properties.index, name.clone()));
            }
        }
        occupied.sort();
        let count = u32::try_from(occupied.len())
            .map_err(|_| StageError::validation("too many figures"))?;
        Ok(occupied
            .into_iter()
            .zip(1..)
            .map(|((_, name), position)| (name, (position, count)))
            .collect())
    }

    fn options(&self, name: &str, element_type: ElementType) -> TransitionOptions {
        match element_type {
            ElementType::Figure => self
                .figures
                .get(name)
                .map_or(TransitionOptions::None, |&(index, count)| {
                    TransitionOptions::Figure { index, count }
                }),
            ElementType::Avatar => self
                .sheet
                .avatar_position
                .map_or(TransitionOptions::None, |[position_x, position_y]| {
                    TransitionOptions::Avatar {
                        position_x,
                        position_y,
                    }
                }),
            _ => TransitionOptions::None,
        }
    }

    fn dump(&self) -> FrameDump {
        FrameDump {
            frame: self.clock.frame().0,
            time: self.clock.time(),
            objects: self.log.attached().into_iter().map(ObjectDump::from).collect(),
            layers: self
                .layers
                .iter()
                .map(|(name, layer)| {
                    (
                        name.clone(),
                        LayerDump {
                            visible: layer.is_visible(),
                            opacity: layer.opacity(),
                        },
                    )
                })
                .collect(),
        }
    }
}
