//! Configuration for avatar lip sync and animation

use serde::{Deserialize, Serialize};

/// Avatar configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AvatarConfig {
    /// Influence applied to the active viseme's morph target (0.0-1.0, default 0.6)
    pub viseme_influence: f32,

    /// Sort buffered visemes by offset before replay (default false: replay in received order)
    pub sort_visemes: bool,

    /// Clip played while the avatar is idle
    pub idle_clip: String,

    /// Clip played while the avatar is talking
    pub talk_clip: String,

    /// How the cross-fader advances per frame
    pub blend_timing: BlendTiming,

    /// Frame rate assumed by fixed-step blending and used by the blend driver (default 60)
    pub assumed_frame_rate: f32,

    /// Speed multiplier given to the target clip of a blend (default 2.0)
    pub blend_target_speed: f32,

    /// Return to idle when speech audio cannot be decoded
    pub reset_on_decode_failure: bool,

    /// Capacity of the avatar event broadcast channel
    pub event_buffer: usize,
}

/// Blend step policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlendTiming {
    /// Every frame advances by `1 / (duration * assumed_frame_rate)`
    FixedFrameRate,
    /// Every frame advances by `elapsed / duration`
    ElapsedTime,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            viseme_influence: 0.6,
            sort_visemes: false,
            idle_clip: "Idle".to_string(),
            talk_clip: "Talk".to_string(),
            blend_timing: BlendTiming::FixedFrameRate,
            assumed_frame_rate: 60.0,
            blend_target_speed: 2.0,
            reset_on_decode_failure: true,
            event_buffer: 64,
        }
    }
}

impl AvatarConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.viseme_influence.is_finite() || !(0.0..=1.0).contains(&self.viseme_influence) {
            return Err("Viseme influence must be between 0.0 and 1.0".to_string());
        }
        if self.viseme_influence == 0.0 {
            return Err("Viseme influence of 0.0 would never move the mouth".to_string());
        }

        if !self.assumed_frame_rate.is_finite() || !(1.0..=480.0).contains(&self.assumed_frame_rate) {
            return Err("Assumed frame rate must be between 1 and 480".to_string());
        }

        if !self.blend_target_speed.is_finite()
            || self.blend_target_speed <= 0.0
            || self.blend_target_speed > 10.0
        {
            return Err("Blend target speed must be greater than 0.0 and at most 10.0".to_string());
        }

        validate_clip_name("idle_clip", &self.idle_clip)?;
        validate_clip_name("talk_clip", &self.talk_clip)?;

        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn validate_clip_name(field: &str, name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if name.len() > 256 {
        return Err(format!("{} too long (max 256 chars)", field));
    }
    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(format!("{} contains invalid characters", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AvatarConfig::default();
        assert_eq!(config.viseme_influence, 0.6);
        assert_eq!(config.assumed_frame_rate, 60.0);
        assert_eq!(config.blend_target_speed, 2.0);
        assert_eq!(config.blend_timing, BlendTiming::FixedFrameRate);
        assert!(!config.sort_visemes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = AvatarConfig::default();
        config.viseme_influence = 1.5;
        assert!(config.validate().is_err());
        config.viseme_influence = 0.0;
        assert!(config.validate().is_err());

        let mut config = AvatarConfig::default();
        config.assumed_frame_rate = 0.0;
        assert!(config.validate().is_err());
        config.assumed_frame_rate = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = AvatarConfig::default();
        config.blend_target_speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = AvatarConfig::default();
        config.talk_clip = String::new();
        assert!(config.validate().is_err());
        config.talk_clip = "Talk\n".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blend_timing_serde() {
        let config: AvatarConfig =
            serde_json::from_str(r#"{"blend_timing": "elapsed_time", "talk_clip": "Talking"}"#)
                .unwrap();
        assert_eq!(config.blend_timing, BlendTiming::ElapsedTime);
        assert_eq!(config.talk_clip, "Talking");
        assert_eq!(config.idle_clip, "Idle");
    }
}
