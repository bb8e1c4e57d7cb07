//! Viseme playback scheduler
//!
//! Buffers the viseme events of one speaking turn and replays them against
//! the avatar's morph targets. Timers are armed relative to [`VisemeScheduler::play`],
//! which runs after synthesis has completed, so replay is shifted by the
//! synthesis duration.
//!
//! Every turn has a generation id. [`VisemeScheduler::reset`] advances it, and
//! a timer whose generation is no longer current does nothing when it fires.

use crate::config::AvatarConfig;
use crate::error::AvatarError;
use crate::morph::{reset_influences, MorphTargets, SharedMorphTargets};
use crate::viseme::viseme_name;
use parking_lot::Mutex;
use parla_spk::VisemeEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Reset every influence, then set `influence` on each target named `name`.
///
/// Returns the number of targets set.
pub fn apply_viseme(
    morphs: &mut dyn MorphTargets,
    name: &str,
    influence: f32,
) -> Result<usize, AvatarError> {
    if morphs.manager_count() == 0 {
        return Err(AvatarError::NoMorphTargets);
    }

    reset_influences(morphs);

    let mut applied = 0;
    morphs.for_each_target(&mut |target| {
        if target.name() == name {
            target.set_influence(influence);
            applied += 1;
        }
    });

    if applied == 0 {
        return Err(AvatarError::MorphTargetNotFound(name.to_string()));
    }
    Ok(applied)
}

/// Replays buffered visemes on the avatar's morph targets
pub struct VisemeScheduler {
    morphs: SharedMorphTargets,
    buffer: Mutex<Vec<VisemeEvent>>,
    generation: Arc<AtomicU64>,
    influence: f32,
    sort: bool,
}

impl VisemeScheduler {
    pub fn new(config: &AvatarConfig, morphs: SharedMorphTargets) -> Self {
        Self {
            morphs,
            buffer: Mutex::new(Vec::new()),
            generation: Arc::new(AtomicU64::new(0)),
            influence: config.viseme_influence,
            sort: config.sort_visemes,
        }
    }

    /// Append an event. Emission order is trusted; nothing is reordered here.
    pub fn record(&self, id: u32, offset_ms: f64) {
        self.record_event(VisemeEvent::new(id, offset_ms));
    }

    pub fn record_event(&self, event: VisemeEvent) {
        self.buffer.lock().push(event);
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Snapshot of the buffered events
    pub fn events(&self) -> Vec<VisemeEvent> {
        self.buffer.lock().clone()
    }

    /// Current turn generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Arm one timer per buffered event, each firing `offset_ms` after now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn play(&self) -> Replay {
        let mut events = self.events();
        if self.sort {
            events.sort_by(|a, b| a.offset_ms.total_cmp(&b.offset_ms));
        }

        let generation = self.generation();
        let start = Instant::now();
        info!(
            "Replaying {} visemes (generation {})",
            events.len(),
            generation
        );

        let handles = events
            .into_iter()
            .filter_map(|event| {
                let Some(deadline) = Duration::try_from_secs_f64(event.offset_ms / 1000.0)
                    .ok()
                    .and_then(|offset| start.checked_add(offset))
                else {
                    warn!(
                        "Viseme {} has an unschedulable offset ({} ms), skipping",
                        event.id, event.offset_ms
                    );
                    return None;
                };

                let morphs = Arc::clone(&self.morphs);
                let current = Arc::clone(&self.generation);
                let influence = self.influence;

                Some(tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;

                    let Some(name) = viseme_name(event.id) else {
                        debug!("Viseme id {} has no mapped morph target, skipping", event.id);
                        return;
                    };

                    // reset() advances the generation under this lock
                    let mut guard = morphs.lock();
                    if current.load(Ordering::SeqCst) != generation {
                        debug!("Dropping stale viseme {} from generation {}", event.id, generation);
                        return;
                    }
                    match apply_viseme(&mut *guard, name, influence) {
                        Ok(count) => debug!("Applied {} to {} target(s)", name, count),
                        Err(e) => log_apply_error(&e),
                    }
                }))
            })
            .collect();

        Replay {
            generation,
            handles,
        }
    }

    /// Apply one viseme immediately. Failures are logged and returned.
    pub fn apply_viseme(&self, name: &str) -> Result<usize, AvatarError> {
        let mut guard = self.morphs.lock();
        apply_viseme(&mut *guard, name, self.influence).map_err(|e| {
            log_apply_error(&e);
            e
        })
    }

    /// End the current turn: drop buffered events, invalidate pending timers,
    /// and zero every influence.
    pub fn reset(&self) {
        let previous = {
            let mut morphs = self.morphs.lock();
            let previous = self.generation.fetch_add(1, Ordering::SeqCst);
            reset_influences(&mut *morphs);
            previous
        };
        let dropped = {
            let mut buffer = self.buffer.lock();
            let dropped = buffer.len();
            buffer.clear();
            dropped
        };
        debug!(
            "Viseme scheduler reset: generation {} -> {}, {} events dropped",
            previous,
            previous + 1,
            dropped
        );
    }
}

fn log_apply_error(e: &AvatarError) {
    match e {
        AvatarError::MorphTargetNotFound(_) => warn!("{}", e),
        _ => error!("Failed to apply viseme: {}", e),
    }
}

/// Timers armed by one [`VisemeScheduler::play`] call
pub struct Replay {
    generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl Replay {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Resolve once every timer has fired
    pub async fn finished(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Viseme timer did not complete: {}", e);
            }
        }
    }
}
