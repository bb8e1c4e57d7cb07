//! Animation clips and the avatar's clip library

use crate::error::AvatarError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Inclusive frame range a clip is restricted to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameRange {
    pub from: u32,
    pub to: u32,
}

/// A named, loopable animation timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    name: String,
    weight: f32,
    speed: f32,
    playing: bool,
    looping: bool,
    frame_range: Option<FrameRange>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            speed: 1.0,
            playing: false,
            looping: false,
            frame_range: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn frame_range(&self) -> Option<FrameRange> {
        self.frame_range
    }

    /// Start over the whole timeline at normal speed
    pub fn start(&mut self, looping: bool, weight: f32) {
        self.playing = true;
        self.looping = looping;
        self.speed = 1.0;
        self.frame_range = None;
        self.set_weight(weight);
    }

    /// Start restricted to `[from, to]`
    pub fn start_range(&mut self, from: u32, to: u32, looping: bool) {
        self.start(looping, 1.0);
        self.frame_range = Some(FrameRange {
            from: from.min(to),
            to: from.max(to),
        });
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        }
    }
}

/// Name-addressed clip collection, loaded once per avatar
#[derive(Debug, Clone, Default)]
pub struct AnimationLibrary {
    clips: Vec<AnimationClip>,
}

impl AnimationLibrary {
    /// Build from clip names. Duplicate names are rejected.
    pub fn new<I, S>(names: I) -> Result<Self, AvatarError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut library = Self::default();
        for name in names {
            library.add_clip(AnimationClip::new(name))?;
        }
        Ok(library)
    }

    pub fn add_clip(&mut self, clip: AnimationClip) -> Result<(), AvatarError> {
        if self.get(clip.name()).is_some() {
            return Err(AvatarError::DuplicateClip(clip.name().to_string()));
        }
        debug!("Loaded animation clip: {}", clip.name());
        self.clips.push(clip);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AnimationClip> {
        self.clips.iter_mut().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clip names in load order
    pub fn names(&self) -> Vec<&str> {
        self.clips.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of clips currently playing
    pub fn playing(&self) -> Vec<&str> {
        self.clips
            .iter()
            .filter(|c| c.playing)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn stop_all(&mut self) {
        for clip in &mut self.clips {
            clip.stop();
        }
    }

    /// Stop everything, then start `name`. Returns false for an unknown name,
    /// which leaves nothing playing.
    pub fn play_clip(&mut self, name: &str, looping: bool) -> bool {
        self.stop_all();
        match self.get_mut(name) {
            Some(clip) => {
                clip.start(looping, 1.0);
                info!("Playing animation {} (loop: {})", name, looping);
                true
            }
            None => {
                warn!("Animation not found: {}", name);
                false
            }
        }
    }

    /// Like [`play_clip`](Self::play_clip), restricted to a frame range
    pub fn play_clip_range(&mut self, name: &str, from: u32, to: u32, looping: bool) -> bool {
        self.stop_all();
        match self.get_mut(name) {
            Some(clip) => {
                clip.start_range(from, to, looping);
                info!("Playing animation {} frames {}..={}", name, from, to);
                true
            }
            None => {
                warn!("Animation not found: {}", name);
                false
            }
        }
    }

    /// Play the first clip whose name contains `fragment`.
    ///
    /// Clips are only stopped when a match exists.
    pub fn play_first_matching(&mut self, fragment: &str, looping: bool) -> Option<String> {
        let name = self
            .clips
            .iter()
            .find(|c| c.name.contains(fragment))
            .map(|c| c.name.clone());

        match name {
            Some(name) => {
                self.play_clip(&name, looping);
                Some(name)
            }
            None => {
                warn!("No animation matching '{}'", fragment);
                None
            }
        }
    }
}
