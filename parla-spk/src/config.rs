//! Configuration for speech synthesis

use serde::{Deserialize, Serialize};

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Voice settings
    pub voice: VoiceConfig,

    /// Maximum text length in characters (default 5000)
    pub max_text_length: usize,

    /// Seconds to wait for one synthesis call before giving up (default 30)
    pub synthesis_timeout_secs: u64,

    /// Capacity of the synthesis event broadcast channel
    pub event_buffer: usize,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier (engine default when unset)
    pub name: Option<String>,

    /// Language code (e.g., "en-US", "en-GB")
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: VoiceConfig::default(),
            max_text_length: 5000,
            synthesis_timeout_secs: 30,
            event_buffer: 256,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en-US".to_string(),
        }
    }
}

impl SpeechConfig {
    /// Apply environment overrides (`PARLA_SPEECH_VOICE`)
    pub fn apply_env(&mut self) {
        if let Ok(voice) = std::env::var("PARLA_SPEECH_VOICE") {
            if !voice.trim().is_empty() {
                self.voice.name = Some(voice);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.voice.validate()?;

        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.max_text_length > 100_000 {
            return Err("max_text_length too large (max 100000)".to_string());
        }

        if self.synthesis_timeout_secs == 0 {
            return Err("synthesis_timeout_secs must be greater than 0".to_string());
        }
        if self.synthesis_timeout_secs > 600 {
            return Err("synthesis_timeout_secs too large (max 600)".to_string());
        }

        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl VoiceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }
        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }
        if !self
            .language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("Language code contains invalid characters".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err("Voice name cannot be empty if provided".to_string());
            }
            if name.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }
            if name.chars().any(|c| c == '\0' || c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}
