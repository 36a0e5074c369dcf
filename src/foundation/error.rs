pub type StageResult<T> = Result<T, StageError>;

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("animation error: {0}")]
    Animation(String),

    #[error("resolve error: {0}")]
    Resolve(String),

    #[error("property error: {0}")]
    Property(String),

    #[error("matcher error: {0}")]
    Matcher(String),

    #[error("transition error: {0}")]
    Transition(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn resolve(msg: impl Into<String>) -> Self {
        Self::Resolve(msg.into())
    }

    pub fn property(msg: impl Into<String>) -> Self {
        Self::Property(msg.into())
    }

    pub fn matcher(msg: impl Into<String>) -> Self {
        Self::Matcher(msg.into())
    }

    pub fn transition(msg: impl Into<String>) -> Self {
        Self::Transition(msg.into())
    }
}

/// Rejection carried by an animation's finished result when it is canceled.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("animation was aborted")]
pub struct AnimationAborted;
