//! Cross-fading between two animation clips
//!
//! A blend starts the source at full weight and the target at zero, both
//! looping, then moves weight from one to the other a frame at a time. Once
//! the fraction reaches 1 the source is stopped and the session is dropped.

use crate::animation::AnimationLibrary;
use crate::config::{AvatarConfig, BlendTiming};
use crate::error::AvatarError;
use std::time::Duration;
use tracing::{debug, info, warn};

// Absorbs accumulated rounding so a whole number of fixed steps finishes on time
const FRACTION_EPSILON: f64 = 1e-9;

/// One active cross-fade
#[derive(Debug, Clone, PartialEq)]
pub struct BlendSession {
    pub source: String,
    pub target: String,
    pub fraction: f64,
    pub duration_secs: f64,
}

/// Result of advancing the cross-fader by one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendProgress {
    /// No blend in progress
    Inactive,
    /// Weights moved; `fraction` is the target's weight
    Blending { fraction: f64 },
    /// The blend completed on this frame
    Finished,
}

pub struct CrossFader {
    timing: BlendTiming,
    frame_rate: f64,
    target_speed: f32,
    session: Option<BlendSession>,
}

impl CrossFader {
    pub fn new(config: &AvatarConfig) -> Self {
        Self {
            timing: config.blend_timing,
            frame_rate: f64::from(config.assumed_frame_rate),
            target_speed: config.blend_target_speed,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&BlendSession> {
        self.session.as_ref()
    }

    pub fn timing(&self) -> BlendTiming {
        self.timing
    }

    /// Begin cross-fading `source` into `target` over `duration_secs`.
    ///
    /// Any session already running is replaced. Unknown clips leave the
    /// library and the current session untouched.
    pub fn blend(
        &mut self,
        animations: &mut AnimationLibrary,
        source: &str,
        target: &str,
        duration_secs: f64,
    ) -> Result<(), AvatarError> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(AvatarError::InvalidBlend(format!(
                "duration must be positive, got {}",
                duration_secs
            )));
        }
        if source == target {
            return Err(AvatarError::InvalidBlend(format!(
                "cannot blend {} into itself",
                source
            )));
        }
        for name in [source, target] {
            if !animations.contains(name) {
                warn!("Animation not found: {}", name);
                return Err(AvatarError::ClipNotFound(name.to_string()));
            }
        }

        if let Some(previous) = self.session.take() {
            debug!(
                "Replacing blend {} -> {} at {:.3}",
                previous.source, previous.target, previous.fraction
            );
        }

        if let Some(clip) = animations.get_mut(source) {
            clip.start(true, 1.0);
        }
        if let Some(clip) = animations.get_mut(target) {
            clip.start(true, 0.0);
            clip.set_speed(self.target_speed);
        }

        info!(
            "Blending {} -> {} over {:.2}s",
            source, target, duration_secs
        );
        self.session = Some(BlendSession {
            source: source.to_string(),
            target: target.to_string(),
            fraction: 0.0,
            duration_secs,
        });
        Ok(())
    }

    /// Advance the active blend by one frame. `elapsed` is the time since the
    /// previous frame and is only used in elapsed-time mode.
    pub fn step(&mut self, animations: &mut AnimationLibrary, elapsed: Duration) -> BlendProgress {
        let Some(session) = self.session.as_mut() else {
            return BlendProgress::Inactive;
        };

        let increment = match self.timing {
            BlendTiming::FixedFrameRate => 1.0 / (session.duration_secs * self.frame_rate),
            BlendTiming::ElapsedTime => elapsed.as_secs_f64() / session.duration_secs,
        };
        session.fraction += increment;

        if session.fraction < 1.0 - FRACTION_EPSILON {
            let fraction = session.fraction;
            if let Some(clip) = animations.get_mut(&session.source) {
                clip.set_weight((1.0 - fraction) as f32);
            }
            if let Some(clip) = animations.get_mut(&session.target) {
                clip.set_weight(fraction as f32);
            }
            return BlendProgress::Blending { fraction };
        }

        if let Some(clip) = animations.get_mut(&session.source) {
            clip.stop();
        }
        if let Some(clip) = animations.get_mut(&session.target) {
            clip.set_weight(1.0);
        }
        info!("Blend {} -> {} finished", session.source, session.target);
        self.session = None;
        BlendProgress::Finished
    }

    /// Drop the active session, leaving clip weights where they are
    pub fn cancel(&mut self) -> Option<BlendSession> {
        let session = self.session.take();
        if let Some(session) = &session {
            debug!("Blend {} -> {} cancelled", session.source, session.target);
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn setup(timing: BlendTiming) -> (CrossFader, AnimationLibrary) {
        let config = AvatarConfig {
            blend_timing: timing,
            ..AvatarConfig::default()
        };
        let lib = AnimationLibrary::new(["Idle", "Talk", "Wave"]).unwrap();
        (CrossFader::new(&config), lib)
    }

    #[test]
    fn test_blend_start_state() {
        let (mut fader, mut lib) = setup(BlendTiming::FixedFrameRate);
        fader.blend(&mut lib, "Idle", "Talk", 2.0).unwrap();

        let idle = lib.get("Idle").unwrap();
        let talk = lib.get("Talk").unwrap();
        assert!(idle.is_playing() && idle.is_looping());
        assert!(talk.is_playing() && talk.is_looping());
        assert_eq!(idle.weight(), 1.0);
        assert_eq!(talk.weight(), 0.0);
        assert_eq!(talk.speed(), 2.0);
    }

    #[test]
    fn test_fixed_step_weights_sum_to_one() {
        let (mut fader, mut lib) = setup(BlendTiming::FixedFrameRate);
        fader.blend(&mut lib, "Idle", "Talk", 2.0).unwrap();

        let mut frames = 0;
        loop {
            frames += 1;
            match fader.step(&mut lib, FRAME) {
                BlendProgress::Blending { .. } => {
                    let sum = lib.get("Idle").unwrap().weight() + lib.get("Talk").unwrap().weight();
                    assert!((sum - 1.0).abs() < 1e-5);
                    if frames == 60 {
                        assert!((lib.get("Talk").unwrap().weight() - 0.5).abs() < 0.01);
                    }
                }
                BlendProgress::Finished => break,
                BlendProgress::Inactive => panic!("blend ended early"),
            }
        }

        assert!((119..=121).contains(&frames), "finished after {} frames", frames);
        assert!(!lib.get("Idle").unwrap().is_playing());
        assert_eq!(lib.get("Talk").unwrap().weight(), 1.0);
        assert!(!fader.is_active());
        assert_eq!(fader.step(&mut lib, FRAME), BlendProgress::Inactive);
    }

    #[test]
    fn test_elapsed_time_is_frame_rate_independent() {
        let (mut fader, mut lib) = setup(BlendTiming::ElapsedTime);
        fader.blend(&mut lib, "Idle", "Talk", 1.0).unwrap();

        // 30 fps for half a second
        for _ in 0..15 {
            fader.step(&mut lib, Duration::from_secs_f64(1.0 / 30.0));
        }
        assert!((lib.get("Talk").unwrap().weight() - 0.5).abs() < 0.01);

        assert_eq!(fader.step(&mut lib, Duration::from_millis(600)), BlendProgress::Finished);
    }

    #[test]
    fn test_unknown_clip_is_noop() {
        let (mut fader, mut lib) = setup(BlendTiming::FixedFrameRate);
        lib.play_clip("Wave", true);

        let err = fader.blend(&mut lib, "Idle", "Dance", 2.0).unwrap_err();
        assert!(matches!(err, AvatarError::ClipNotFound(name) if name == "Dance"));
        assert!(!fader.is_active());
        assert_eq!(lib.playing(), vec!["Wave"]);
    }

    #[test]
    fn test_invalid_duration() {
        let (mut fader, mut lib) = setup(BlendTiming::FixedFrameRate);
        assert!(matches!(
            fader.blend(&mut lib, "Idle", "Talk", 0.0),
            Err(AvatarError::InvalidBlend(_))
        ));
        assert!(matches!(
            fader.blend(&mut lib, "Idle", "Talk", f64::NAN),
            Err(AvatarError::InvalidBlend(_))
        ));
        assert!(matches!(
            fader.blend(&mut lib, "Idle", "Idle", 1.0),
            Err(AvatarError::InvalidBlend(_))
        ));
    }

    #[test]
    fn test_new_blend_replaces_session() {
        let (mut fader, mut lib) = setup(BlendTiming::FixedFrameRate);
        fader.blend(&mut lib, "Idle", "Talk", 2.0).unwrap();
        for _ in 0..10 {
            fader.step(&mut lib, FRAME);
        }

        fader.blend(&mut lib, "Talk", "Wave", 1.0).unwrap();
        let session = fader.session().unwrap();
        assert_eq!(session.source, "Talk");
        assert_eq!(session.fraction, 0.0);
        assert_eq!(lib.get("Talk").unwrap().weight(), 1.0);

        assert!(fader.cancel().is_some());
        assert!(fader.cancel().is_none());
    }
}
