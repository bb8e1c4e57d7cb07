//! parla-spk: speech synthesis side of the avatar
//!
//! Provides the contracts the avatar needs from a speech service:
//! - Viseme events with SDK tick conversion
//! - The `TtsEngine` trait and a scripted engine
//! - WAV decoding and timed audio output
//! - A synthesis session that validates text, enforces a timeout and
//!   broadcasts started/viseme/completed notifications

pub mod audio;
pub mod config;
pub mod engines;
pub mod error;
pub mod session;
pub mod viseme;

pub use audio::{silent_wav, AudioDecoder, AudioOutput, DecodedAudio, TimedAudioOutput, WavDecoder};
pub use config::{SpeechConfig, VoiceConfig};
pub use engines::{ScriptedTtsEngine, TtsEngine};
pub use error::SpeechError;
pub use session::{SynthesisEvent, SynthesisSession};
pub use viseme::VisemeEvent;
