//! parla-me: the avatar side of lip sync
//!
//! - Viseme playback scheduler driving the mesh morph targets
//! - Animation clip library with an Idle/Talking state machine
//! - Cross-fader for weighted transitions between clips
//! - Speaking turns that tie synthesis, audio playback and visemes together

pub mod animation;
pub mod avatar;
pub mod config;
pub mod crossfade;
pub mod error;
pub mod morph;
pub mod scheduler;
pub mod turn;
pub mod viseme;

pub use animation::{AnimationClip, AnimationLibrary, FrameRange};
pub use avatar::{Avatar, AvatarEvent, AvatarState};
pub use config::{AvatarConfig, BlendTiming};
pub use crossfade::{BlendProgress, BlendSession, CrossFader};
pub use error::AvatarError;
pub use morph::{
    reset_influences, AvatarMesh, MorphTarget, MorphTargetManager, MorphTargets, SharedMorphTargets,
};
pub use scheduler::{apply_viseme, Replay, VisemeScheduler};
pub use turn::{Speaker, TurnOutcome, TurnReport};
pub use viseme::{viseme_name, VISEME_NAMES};
