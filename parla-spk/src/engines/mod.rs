//! TTS engine implementations

pub mod scripted;

use crate::config::VoiceConfig;
use crate::error::SpeechError;
use crate::viseme::VisemeEvent;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

pub use scripted::ScriptedTtsEngine;

/// Trait for TTS engines
///
/// One call is one synthesis turn. Viseme events go out on `visemes` in
/// emission order while audio is generated; the returned value is the single
/// terminal outcome (encoded audio, or the upstream error detail).
#[async_trait]
pub trait TtsEngine: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
        visemes: mpsc::UnboundedSender<VisemeEvent>,
    ) -> Result<Bytes, SpeechError>;

    /// Get engine name
    fn name(&self) -> &str;
}
