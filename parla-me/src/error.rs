//! Error types for parla-me

use parla_core::Error as CoreError;
use parla_spk::SpeechError;
use thiserror::Error;

/// Avatar errors
///
/// Missing clips and morph targets are recoverable: callers log them and carry on.
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Avatar exposes no morph target managers")]
    NoMorphTargets,

    #[error("Morph target not found: {0}")]
    MorphTargetNotFound(String),

    #[error("Animation not found: {0}")]
    ClipNotFound(String),

    #[error("Duplicate animation name: {0}")]
    DuplicateClip(String),

    #[error("Invalid blend: {0}")]
    InvalidBlend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Speaking turn error: {0}")]
    Turn(String),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl AvatarError {
    /// Missing-resource conditions never stop playback
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AvatarError::NoMorphTargets
                | AvatarError::MorphTargetNotFound(_)
                | AvatarError::ClipNotFound(_)
        )
    }
}

impl From<AvatarError> for CoreError {
    fn from(err: AvatarError) -> Self {
        CoreError::Avatar(err.to_string())
    }
}
