//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::adapters::TokioNotificationScheduler;
use crate::config::Config;
use bloomie_core::ports::{DatabaseService, SpeechToTextService, TextToSpeechService, VoiceParams};
use bloomie_core::CareService;
use std::sync::Arc;
use tracing::warn;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub stt: Arc<dyn SpeechToTextService>,
    pub tts: Arc<dyn TextToSpeechService>,
    pub care: Arc<CareService>,
    /// Concrete type so WebSocket handlers can subscribe to fired notifications.
    pub notifications: Arc<TokioNotificationScheduler>,
    pub voice_params: VoiceParams,
}

//=========================================================================================
// VoiceSession (Specific to One WebSocket Connection)
//=========================================================================================

/// Roughly 100 seconds of 48 kHz PCM16 mono.
pub const MAX_RECORDING_BYTES: usize = 10 * 1024 * 1024;

/// The recording handle of one connection. At most one recording is active;
/// audio pushed while idle is dropped.
#[derive(Debug, Default)]
pub struct VoiceSession {
    buffer: Option<Vec<u8>>,
    truncated: bool,
}

impl VoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.buffer.is_some()
    }

    /// Starts a recording. Returns `false` when one was already active; its
    /// audio is thrown away and a fresh recording begins.
    pub fn acquire(&mut self) -> bool {
        let was_idle = self.buffer.is_none();
        if !was_idle {
            warn!("Recording restarted before the previous one ended");
        }
        self.buffer = Some(Vec::new());
        self.truncated = false;
        was_idle
    }

    /// Appends audio to the active recording. Returns `false` if the frame was
    /// dropped (idle session or size cap reached).
    pub fn push(&mut self, frame: &[u8]) -> bool {
        let Some(buffer) = self.buffer.as_mut() else {
            return false;
        };
        if buffer.len() + frame.len() > MAX_RECORDING_BYTES {
            if !self.truncated {
                warn!(bytes = buffer.len(), "Recording hit the size cap, dropping further audio");
                self.truncated = true;
            }
            return false;
        }
        buffer.extend_from_slice(frame);
        true
    }

    /// Ends the recording and hands over its audio. `None` if nothing was recording.
    pub fn release(&mut self) -> Option<Vec<u8>> {
        self.truncated = false;
        self.buffer.take()
    }

    /// Ends the recording without keeping its audio.
    pub fn discard(&mut self) {
        self.buffer = None;
        self.truncated = false;
    }
}
