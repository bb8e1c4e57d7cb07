//! Audio decoding and playback for synthesized speech

use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Decoded speech audio, reduced to what playback timing needs
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
    pub data: Bytes,
}

/// Turns encoded synthesis output into playable audio
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, data: &Bytes) -> Result<DecodedAudio, SpeechError>;
}

/// Plays decoded audio, resolving once playback has finished
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, audio: &DecodedAudio) -> Result<(), SpeechError>;
}

/// RIFF/WAVE decoder
#[derive(Debug, Default, Clone)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, data: &Bytes) -> Result<DecodedAudio, SpeechError> {
        if data.is_empty() {
            return Err(SpeechError::Decode("Audio data is empty".to_string()));
        }

        let reader = hound::WavReader::new(Cursor::new(data.as_ref()))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(SpeechError::Decode("WAV sample rate is 0".to_string()));
        }

        // hound reports the length in frames (samples per channel)
        let frames = reader.duration();
        let duration = Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64);
        debug!(
            "Decoded WAV: {} frames at {} Hz, {} channel(s), {:?}",
            frames, spec.sample_rate, spec.channels, duration
        );

        Ok(DecodedAudio {
            duration,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            data: data.clone(),
        })
    }
}

/// Output that holds for the audio's duration without producing sound.
/// Stands in for a device sink; timing is identical.
#[derive(Debug, Default, Clone)]
pub struct TimedAudioOutput;

#[async_trait]
impl AudioOutput for TimedAudioOutput {
    async fn play(&self, audio: &DecodedAudio) -> Result<(), SpeechError> {
        debug!("Audio duration: {} ms", audio.duration.as_millis());
        tokio::time::sleep(audio.duration).await;
        Ok(())
    }
}

/// Encode `duration` of 16-bit mono silence as a WAV file
pub fn silent_wav(duration: Duration, sample_rate: u32) -> Result<Bytes, SpeechError> {
    if sample_rate == 0 {
        return Err(SpeechError::Config("Sample rate must be greater than 0".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = (duration.as_secs_f64() * sample_rate as f64).round() as u64;

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for _ in 0..frames {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_silent_wav_duration() {
        let wav = silent_wav(Duration::from_millis(1500), 16_000).unwrap();
        let audio = WavDecoder.decode(&wav).unwrap();

        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.duration, Duration::from_millis(1500));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = WavDecoder.decode(&Bytes::from_static(b"definitely not a wav file"));
        assert!(matches!(result, Err(SpeechError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_empty() {
        let result = WavDecoder.decode(&Bytes::new());
        assert!(matches!(result, Err(SpeechError::Decode(_))));
    }

    #[test]
    fn test_silent_wav_rejects_zero_rate() {
        assert!(silent_wav(Duration::from_secs(1), 0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_output_waits_duration() {
        let wav = silent_wav(Duration::from_millis(250), 8_000).unwrap();
        let audio = WavDecoder.decode(&wav).unwrap();

        let start = tokio::time::Instant::now();
        TimedAudioOutput.play(&audio).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(260));
    }
}
