//! services/api/src/adapters/sst.rs
//!
//! This module contains the adapter for OpenAI's Speech-to-Text (Whisper) service.
//! It implements the `SpeechToTextService` port from the `core` crate.
//!
//! The browser streams raw little-endian PCM16 mono frames; they are wrapped
//! into a WAV container before upload.

use async_openai::{
    config::OpenAIConfig,
    types::audio::{AudioInput, CreateTranscriptionRequest},
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use bloomie_core::ports::{PortError, PortResult, SpeechToTextService};
use hound::{WavSpec, WavWriter};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechToTextService` port using the OpenAI Whisper API.
#[derive(Clone)]
pub struct OpenAiSstAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    sample_rate: u32,
    /// ISO-639-1 hint; `None` lets Whisper detect the language (English or Turkish).
    language: Option<String>,
}

impl OpenAiSstAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String, sample_rate: u32, language: Option<String>) -> Self {
        Self { client, model, sample_rate, language }
    }
}

/// Wraps mono PCM16 samples in a WAV header. A trailing odd byte is dropped.
pub fn pcm16_to_wav(pcm_data: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for chunk in pcm_data.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

/// True when the bytes already carry a RIFF/WAVE header (uploaded files).
pub fn is_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

//=========================================================================================
// `SpeechToTextService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechToTextService for OpenAiSstAdapter {
    async fn transcribe_audio(&self, audio_data: &[u8]) -> PortResult<String> {
        if audio_data.len() < 2 {
            return Err(PortError::InvalidInput("No audio was recorded".to_string()));
        }
        let wav_data = if is_wav(audio_data) {
            audio_data.to_vec()
        } else {
            pcm16_to_wav(audio_data, self.sample_rate)
                .map_err(|e| PortError::Unexpected(format!("Failed to encode WAV: {}", e)))?
        };

        let request = CreateTranscriptionRequest {
            file: AudioInput::from_vec_u8("voice_command.wav".into(), wav_data),
            model: self.model.clone(),
            language: self.language.clone(),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response.text.trim().to_string())
    }
}
