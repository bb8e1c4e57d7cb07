//! Avatar: animation state machine, cross-fade driver and viseme scheduler

use crate::animation::AnimationLibrary;
use crate::config::AvatarConfig;
use crate::crossfade::{BlendProgress, CrossFader};
use crate::error::AvatarError;
use crate::morph::{MorphTargets, SharedMorphTargets};
use crate::scheduler::VisemeScheduler;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Animation state of the avatar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AvatarState {
    Idle,
    Talking,
}

/// Notifications published by the avatar
#[derive(Debug, Clone, PartialEq)]
pub enum AvatarEvent {
    SpeakingStarted,
    SpeakingEnded,
    BlendFinished { source: String, target: String },
}

pub struct Avatar {
    config: Arc<AvatarConfig>,
    animations: Arc<Mutex<AnimationLibrary>>,
    // Lock order: fader before animations
    fader: Arc<Mutex<CrossFader>>,
    blend_driver: Mutex<Option<JoinHandle<()>>>,
    scheduler: Arc<VisemeScheduler>,
    state: RwLock<AvatarState>,
    events: broadcast::Sender<AvatarEvent>,
}

impl Avatar {
    /// Assemble an avatar from its mesh morph targets and loaded clips
    pub fn new(
        config: AvatarConfig,
        morphs: SharedMorphTargets,
        animations: AnimationLibrary,
    ) -> Result<Self, AvatarError> {
        config.validate().map_err(AvatarError::Config)?;

        let manager_count = morphs.lock().manager_count();
        info!(
            "Avatar loaded: {} animation(s) [{}], {} morph target manager(s)",
            animations.len(),
            animations.names().join(", "),
            manager_count
        );
        for clip in [&config.idle_clip, &config.talk_clip] {
            if !animations.contains(clip) {
                warn!("Avatar has no '{}' animation", clip);
            }
        }
        if manager_count == 0 {
            warn!("Avatar has no morph targets; lip sync will be skipped");
        }

        let (events, _) = broadcast::channel(config.event_buffer);
        let scheduler = Arc::new(VisemeScheduler::new(&config, morphs));
        let fader = Arc::new(Mutex::new(CrossFader::new(&config)));

        Ok(Self {
            config: Arc::new(config),
            animations: Arc::new(Mutex::new(animations)),
            fader,
            blend_driver: Mutex::new(None),
            scheduler,
            state: RwLock::new(AvatarState::Idle),
            events,
        })
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    pub fn state(&self) -> AvatarState {
        *self.state.read()
    }

    pub fn scheduler(&self) -> Arc<VisemeScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn animations(&self) -> Arc<Mutex<AnimationLibrary>> {
        Arc::clone(&self.animations)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AvatarEvent> {
        self.events.subscribe()
    }

    /// Play the idle clip, looping
    pub fn start_idle(&self) -> bool {
        self.cancel_blend();
        *self.state.write() = AvatarState::Idle;
        self.animations.lock().play_clip(&self.config.idle_clip, true)
    }

    /// Idle -> Talking
    pub fn speaking_started(&self) {
        self.cancel_blend();
        *self.state.write() = AvatarState::Talking;
        self.animations.lock().play_clip(&self.config.talk_clip, true);
        info!("Speaking started");
        self.publish(AvatarEvent::SpeakingStarted);
    }

    /// Talking -> Idle. Also ends the viseme turn.
    pub fn speaking_ended(&self) {
        self.cancel_blend();
        *self.state.write() = AvatarState::Idle;
        self.animations.lock().play_clip(&self.config.idle_clip, true);
        self.scheduler.reset();
        info!("Speaking ended");
        self.publish(AvatarEvent::SpeakingEnded);
    }

    /// Start a cross-fade that the host advances with [`tick`](Self::tick)
    ///
    /// A rejected blend leaves any running blend and its driver untouched.
    pub fn blend(&self, source: &str, target: &str, duration_secs: f64) -> Result<(), AvatarError> {
        let mut fader = self.fader.lock();
        let mut animations = self.animations.lock();
        fader.blend(&mut animations, source, target, duration_secs)?;
        self.abort_driver();
        Ok(())
    }

    /// Start a cross-fade advanced by a timer at the configured frame rate.
    ///
    /// Replaces any blend already running along with its driver.
    pub fn spawn_blend(&self, source: &str, target: &str, duration_secs: f64) -> Result<(), AvatarError> {
        self.blend(source, target, duration_secs)?;

        let fader = Arc::clone(&self.fader);
        let animations = Arc::clone(&self.animations);
        let events = self.events.clone();
        let (source, target) = (source.to_string(), target.to_string());
        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.assumed_frame_rate));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately, so the first step lands at t=0
            let mut last = Instant::now();

            loop {
                ticker.tick().await;
                let now = Instant::now();
                let progress = {
                    let mut fader = fader.lock();
                    let mut animations = animations.lock();
                    fader.step(&mut animations, now - last)
                };
                last = now;

                match progress {
                    BlendProgress::Blending { .. } => {}
                    BlendProgress::Finished => {
                        let _ = events.send(AvatarEvent::BlendFinished { source, target });
                        break;
                    }
                    BlendProgress::Inactive => break,
                }
            }
        });

        *self.blend_driver.lock() = Some(handle);
        Ok(())
    }

    /// Advance a host-driven blend by one frame
    pub fn tick(&self, elapsed: Duration) -> BlendProgress {
        let progress = {
            let mut fader = self.fader.lock();
            let mut animations = self.animations.lock();
            fader.step(&mut animations, elapsed)
        };
        if progress == BlendProgress::Finished {
            debug!("Host-driven blend finished");
        }
        progress
    }

    pub fn is_blending(&self) -> bool {
        self.fader.lock().is_active()
    }

    /// Stop any blend and its driver, leaving clip weights as they are
    pub fn cancel_blend(&self) {
        self.abort_driver();
        self.fader.lock().cancel();
    }

    fn abort_driver(&self) {
        if let Some(handle) = self.blend_driver.lock().take() {
            handle.abort();
        }
    }

    fn publish(&self, event: AvatarEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Drop for Avatar {
    fn drop(&mut self) {
        self.abort_driver();
    }
}
