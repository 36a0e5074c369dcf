use crate::foundation::error::{StageError, StageResult};

/// Where the jumps of a step easing happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// Jump at the start of each step.
    Start,
    /// Jump at the end of each step.
    End,
    /// Jump at both ends; `count + 1` levels.
    Both,
    /// No jump at either end; `count - 1` intervals.
    None,
}

/// Easing functions mapping directed progress to transformed progress.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Easing {
    /// Identity.
    Linear,
    /// CSS-style cubic Bézier through `(0,0)`, `(x1,y1)`, `(x2,y2)`, `(1,1)`.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// CSS-style step function.
    Steps { count: u32, position: StepPosition },
}

const fn bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Easing {
    Easing::CubicBezier { x1, y1, x2, y2 }
}

impl Easing {
    pub const EASE: Self = bezier(0.25, 0.1, 0.25, 1.0);
    pub const EASE_IN: Self = bezier(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: Self = bezier(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: Self = bezier(0.42, 0.0, 0.58, 1.0);

    pub const MATERIAL_STANDARD: Self = bezier(0.2, 0.0, 0.0, 1.0);
    pub const MATERIAL_STANDARD_DECELERATE: Self = bezier(0.0, 0.0, 0.0, 1.0);
    pub const MATERIAL_STANDARD_ACCELERATE: Self = bezier(0.3, 0.0, 1.0, 1.0);
    pub const MATERIAL_EMPHASIZED_DECELERATE: Self = bezier(0.05, 0.7, 0.1, 1.0);
    pub const MATERIAL_EMPHASIZED_ACCELERATE: Self = bezier(0.3, 0.0, 0.8, 0.15);

    pub const STEP_START: Self = Self::Steps {
        count: 1,
        position: StepPosition::Start,
    };
    pub const STEP_END: Self = Self::Steps {
        count: 1,
        position: StepPosition::End,
    };

    /// Look up an easing by the name used in property values.
    pub fn from_name(name: &str) -> StageResult<Self> {
        match name {
            "linear" => Ok(Self::Linear),
            "ease" => Ok(Self::EASE),
            "ease_in" => Ok(Self::EASE_IN),
            "ease_out" => Ok(Self::EASE_OUT),
            "ease_in_out" => Ok(Self::EASE_IN_OUT),
            "step_start" => Ok(Self::STEP_START),
            "step_end" => Ok(Self::STEP_END),
            _ => Err(StageError::resolve(format!("unsupported easing \"{name}\""))),
        }
    }

    /// Apply to directed progress `t`.
    ///
    /// `before` is set while the animation sits in its before phase; only step easings
    /// observe it.
    pub fn apply(self, t: f64, before: bool) -> f64 {
        match self {
            Self::Linear => t,
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier_ease(t, x1, y1, x2, y2),
            Self::Steps { count, position } => steps_ease(t, before, count, position),
        }
    }
}

fn cubic_bezier(p1: f64, p2: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    if x1 == y1 && x2 == y2 {
        return t;
    }
    // x(s) is monotonic for x1, x2 in [0, 1]; bisect for the parameter whose x equals t.
    let mut lo = 0.0;
    let mut hi = 1.0;
    let mut mid = t;
    for _ in 0..48 {
        let x = cubic_bezier(x1, x2, mid);
        if (x - t).abs() < 1e-9 {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(y1, y2, mid)
}

fn steps_ease(t: f64, before: bool, count: u32, position: StepPosition) -> f64 {
    let steps = f64::from(count.max(1));
    let mut current = (t * steps).floor();
    if matches!(position, StepPosition::Start | StepPosition::Both) {
        current += 1.0;
    }
    if before && (t * steps) % 1.0 == 0.0 {
        current -= 1.0;
    }
    if t >= 0.0 && current < 0.0 {
        current = 0.0;
    }
    let jumps = match position {
        StepPosition::Start | StepPosition::End => steps,
        StepPosition::Both => steps + 1.0,
        StepPosition::None => (steps - 1.0).max(1.0),
    };
    if t <= 1.0 && current > jumps {
        current = jumps;
    }
    current / jumps
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
