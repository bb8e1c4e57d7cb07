//! Speaking turns: synthesize, then play audio and visemes together
//!
//! A turn runs as one sequence:
//! 1. synthesize the text, buffering every viseme the engine emits
//! 2. switch the avatar to Talking
//! 3. decode the audio
//! 4. play the audio and replay the visemes concurrently, waiting for both
//! 5. switch the avatar back to Idle, which ends the viseme turn
//!
//! Turns are serialized: a second `speak` waits until the first has ended.

use crate::avatar::Avatar;
use crate::error::AvatarError;
use parla_spk::{
    AudioDecoder, AudioOutput, SynthesisSession, TimedAudioOutput, WavDecoder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How a turn ended. None of these are fatal to the avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnOutcome {
    Spoken,
    SynthesisFailed(String),
    DecodeFailed(String),
    PlaybackFailed(String),
}

/// Summary of one speaking turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn_id: Uuid,
    pub visemes: usize,
    pub audio_duration: Option<Duration>,
    pub outcome: TurnOutcome,
}

impl TurnReport {
    pub fn is_spoken(&self) -> bool {
        self.outcome == TurnOutcome::Spoken
    }
}

/// Drives speaking turns for one avatar
pub struct Speaker {
    avatar: Arc<Avatar>,
    session: SynthesisSession,
    decoder: Arc<dyn AudioDecoder>,
    output: Arc<dyn AudioOutput>,
    turns: Semaphore,
}

impl Speaker {
    pub fn new(
        avatar: Arc<Avatar>,
        session: SynthesisSession,
        decoder: Arc<dyn AudioDecoder>,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        Self {
            avatar,
            session,
            decoder,
            output,
            turns: Semaphore::new(1),
        }
    }

    /// WAV decoding and a timed output
    pub fn with_defaults(avatar: Arc<Avatar>, session: SynthesisSession) -> Self {
        Self::new(
            avatar,
            session,
            Arc::new(WavDecoder),
            Arc::new(TimedAudioOutput),
        )
    }

    pub fn avatar(&self) -> &Arc<Avatar> {
        &self.avatar
    }

    pub fn session(&self) -> &SynthesisSession {
        &self.session
    }

    /// Speak `text` as one turn.
    ///
    /// Failures along the way are logged and reported in the returned
    /// [`TurnReport`]; the avatar is always left in a consistent state.
    pub async fn speak(&self, text: &str) -> Result<TurnReport, AvatarError> {
        let _permit = self
            .turns
            .acquire()
            .await
            .map_err(|e| AvatarError::Turn(e.to_string()))?;

        let turn_id = Uuid::new_v4();
        let scheduler = self.avatar.scheduler();
        if !scheduler.is_empty() {
            debug!("Discarding {} visemes left from a previous turn", scheduler.len());
            scheduler.reset();
        }
        info!("Turn {} started", turn_id);

        let synthesized = self
            .session
            .synthesize(text, |event| scheduler.record_event(event))
            .await;
        let visemes = scheduler.len();

        let audio = match synthesized {
            Ok(audio) => audio,
            Err(e) => {
                error!("Turn {}: synthesis failed: {}", turn_id, e);
                scheduler.reset();
                return Ok(TurnReport {
                    turn_id,
                    visemes,
                    audio_duration: None,
                    outcome: TurnOutcome::SynthesisFailed(e.to_string()),
                });
            }
        };

        self.avatar.speaking_started();

        let decoded = match self.decoder.decode(&audio) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Turn {}: audio decode failed: {}", turn_id, e);
                if self.avatar.config().reset_on_decode_failure {
                    self.avatar.speaking_ended();
                } else {
                    // Visemes still play; the avatar stays Talking until the next turn ends
                    let replay = scheduler.play();
                    warn!(
                        "Turn {}: {} visemes replaying without audio, avatar left talking",
                        turn_id,
                        replay.len()
                    );
                }
                return Ok(TurnReport {
                    turn_id,
                    visemes,
                    audio_duration: None,
                    outcome: TurnOutcome::DecodeFailed(e.to_string()),
                });
            }
        };

        let replay = scheduler.play();
        let (played, ()) = tokio::join!(self.output.play(&decoded), replay.finished());

        let outcome = match played {
            Ok(()) => TurnOutcome::Spoken,
            Err(e) => {
                error!("Turn {}: playback failed: {}", turn_id, e);
                TurnOutcome::PlaybackFailed(e.to_string())
            }
        };

        self.avatar.speaking_ended();
        info!(
            "Turn {} ended: {} visemes over {} ms of audio",
            turn_id,
            visemes,
            decoded.duration.as_millis()
        );

        Ok(TurnReport {
            turn_id,
            visemes,
            audio_duration: Some(decoded.duration),
            outcome,
        })
    }
}
