use crate::foundation::core::{Fps, ScreenSize};
use crate::foundation::error::{StageError, StageResult};

/// Stage-wide settings shared by every slot.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub fps: Fps,
    pub screen: ScreenSize,
    /// Asset pixels per logical pixel.
    pub density: f64,
    /// Scale the default text enter duration with the grapheme count.
    pub enter_by_grapheme_cluster: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            screen: ScreenSize::default(),
            density: 1.0,
            enter_by_grapheme_cluster: true,
        }
    }
}

impl StageConfig {
    pub fn validate(&self) -> StageResult<()> {
        self.fps.validate()?;
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(StageError::validation("screen width/height must be > 0"));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(StageError::validation(format!(
                "density must be > 0, got {}",
                self.density
            )));
        }
        Ok(())
    }
}
