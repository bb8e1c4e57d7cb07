//! Scripted TTS engine
//! Replays a fixed viseme track and a fixed outcome, for demos and tests

use crate::config::VoiceConfig;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use crate::viseme::VisemeEvent;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone)]
enum Outcome {
    Audio(Bytes),
    Failure(String),
}

/// Engine that emits a predetermined viseme track and outcome
#[derive(Debug, Clone)]
pub struct ScriptedTtsEngine {
    name: String,
    visemes: Vec<VisemeEvent>,
    outcome: Outcome,
    emit_interval: Option<Duration>,
}

impl ScriptedTtsEngine {
    /// Engine that succeeds with `audio` after emitting `visemes`
    pub fn new(visemes: Vec<VisemeEvent>, audio: Bytes) -> Self {
        Self {
            name: "scripted".to_string(),
            visemes,
            outcome: Outcome::Audio(audio),
            emit_interval: None,
        }
    }

    /// Engine that emits `visemes` and then fails with `detail`
    pub fn failing(visemes: Vec<VisemeEvent>, detail: impl Into<String>) -> Self {
        Self {
            name: "scripted".to_string(),
            visemes,
            outcome: Outcome::Failure(detail.into()),
            emit_interval: None,
        }
    }

    /// Pause between emitted events, simulating a streaming synthesizer
    pub fn with_emit_interval(mut self, interval: Duration) -> Self {
        self.emit_interval = Some(interval);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl TtsEngine for ScriptedTtsEngine {
    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceConfig,
        visemes: mpsc::UnboundedSender<VisemeEvent>,
    ) -> Result<Bytes, SpeechError> {
        debug!(
            "Scripted synthesis of {} chars, {} visemes",
            text.chars().count(),
            self.visemes.len()
        );

        for event in &self.visemes {
            if let Some(interval) = self.emit_interval {
                tokio::time::sleep(interval).await;
            }
            if visemes.send(*event).is_err() {
                // Receiver gone; the caller abandoned this turn
                break;
            }
        }

        match &self.outcome {
            Outcome::Audio(audio) => Ok(audio.clone()),
            Outcome::Failure(detail) => Err(SpeechError::Engine(detail.clone())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emits_in_order_then_returns_audio() {
        let track = vec![VisemeEvent::new(10, 0.0), VisemeEvent::new(11, 100.0)];
        let engine = ScriptedTtsEngine::new(track.clone(), Bytes::from_static(b"audio"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let audio = engine
            .synthesize("hello", &VoiceConfig::default(), tx)
            .await
            .unwrap();
        assert_eq!(audio, Bytes::from_static(b"audio"));

        assert_eq!(rx.recv().await, Some(track[0]));
        assert_eq!(rx.recv().await, Some(track[1]));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_failing_engine() {
        let engine = ScriptedTtsEngine::failing(vec![], "quota exceeded");
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = engine
            .synthesize("hello", &VoiceConfig::default(), tx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
