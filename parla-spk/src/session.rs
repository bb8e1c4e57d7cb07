//! Synthesis session: drives one engine call and publishes its notifications

use crate::config::SpeechConfig;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use crate::viseme::VisemeEvent;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

/// Notifications published while a synthesis call runs
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    Started { chars: usize, timestamp_ms: i64 },
    Viseme(VisemeEvent),
    Completed { audio_bytes: usize, timestamp_ms: i64 },
    Failed { detail: String, timestamp_ms: i64 },
}

/// Wraps a [`TtsEngine`] with text validation, a timeout, and event fan-out
pub struct SynthesisSession {
    config: Arc<SpeechConfig>,
    engine: Arc<dyn TtsEngine>,
    events: broadcast::Sender<SynthesisEvent>,
}

impl SynthesisSession {
    pub fn new(config: SpeechConfig, engine: Arc<dyn TtsEngine>) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let (events, _) = broadcast::channel(config.event_buffer);
        Ok(Self {
            config: Arc::new(config),
            engine,
            events,
        })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Subscribe to synthesis notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SynthesisEvent> {
        self.events.subscribe()
    }

    /// Synthesize `text`, handing each viseme to `on_viseme` as it arrives.
    ///
    /// Resolves once the engine reports its terminal outcome. Every viseme the
    /// engine emitted before completing is delivered before this returns.
    pub async fn synthesize<F>(&self, text: &str, mut on_viseme: F) -> Result<Bytes, SpeechError>
    where
        F: FnMut(VisemeEvent) + Send,
    {
        self.validate_text(text)?;

        let chars = text.chars().count();
        info!("Synthesis started ({} chars, engine {})", chars, self.engine.name());
        self.publish(SynthesisEvent::Started {
            chars,
            timestamp_ms: now_ms(),
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let timeout_secs = self.config.synthesis_timeout_secs;
        let synthesis = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.engine.synthesize(text, &self.config.voice, tx),
        );
        tokio::pin!(synthesis);

        let outcome = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => {
                    self.deliver(event, &mut on_viseme);
                }
                result = &mut synthesis => {
                    break result;
                }
            }
        };

        // Events queued in the same poll as completion
        while let Ok(event) = rx.try_recv() {
            self.deliver(event, &mut on_viseme);
        }

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(SpeechError::Timeout(timeout_secs)),
        };

        match &result {
            Ok(audio) => {
                info!("Synthesis finished ({} bytes of audio)", audio.len());
                self.publish(SynthesisEvent::Completed {
                    audio_bytes: audio.len(),
                    timestamp_ms: now_ms(),
                });
            }
            Err(e) => {
                error!("Synthesis did not complete successfully: {}", e);
                self.publish(SynthesisEvent::Failed {
                    detail: e.to_string(),
                    timestamp_ms: now_ms(),
                });
            }
        }

        result
    }

    fn deliver<F>(&self, event: VisemeEvent, on_viseme: &mut F)
    where
        F: FnMut(VisemeEvent),
    {
        debug!("Viseme {} at {:.1} ms", event.id, event.offset_ms);
        self.publish(SynthesisEvent::Viseme(event));
        on_viseme(event);
    }

    fn publish(&self, event: SynthesisEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn validate_text(&self, text: &str) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::Synthesizer("Text cannot be empty".to_string()));
        }
        if text.contains('\0') {
            return Err(SpeechError::Synthesizer("Text contains null bytes".to_string()));
        }
        let max = self.config.max_text_length;
        if text.chars().count() > max {
            return Err(SpeechError::Synthesizer(format!(
                "Text too long (max {} characters)",
                max
            )));
        }
        Ok(())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
