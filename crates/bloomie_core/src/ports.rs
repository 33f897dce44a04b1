//! crates/bloomie_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the external collaborators.
//! These traits form the boundary of the hexagonal architecture: the care
//! heuristics only ever talk to a store, a notification scheduler, speech
//! services and a remote AI parser through them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    LogEntry, NewLogEntry, NewReminder, NotificationId, Nurture, NurtureDraft, ParsedCommand,
    ParsedLog, Reminder, ScheduleRequest, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Timed out after {0} ms")]
    Timeout(u128),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Nurtures (always scoped to their owner) ---
    async fn create_nurture(&self, user_id: Uuid, draft: &NurtureDraft) -> PortResult<Nurture>;

    async fn get_nurture(&self, user_id: Uuid, nurture_id: Uuid) -> PortResult<Nurture>;

    async fn list_nurtures(&self, user_id: Uuid) -> PortResult<Vec<Nurture>>;

    async fn update_nurture(
        &self,
        user_id: Uuid,
        nurture_id: Uuid,
        draft: &NurtureDraft,
    ) -> PortResult<Nurture>;

    async fn delete_nurture(&self, user_id: Uuid, nurture_id: Uuid) -> PortResult<()>;

    // --- Logs (returned newest first) ---
    async fn create_log(&self, entry: &NewLogEntry) -> PortResult<LogEntry>;

    async fn list_logs_for_nurture(&self, nurture_id: Uuid) -> PortResult<Vec<LogEntry>>;

    async fn list_logs_for_user(&self, user_id: Uuid) -> PortResult<Vec<LogEntry>>;

    // --- Reminders ---
    async fn create_reminder(&self, reminder: &NewReminder) -> PortResult<Reminder>;

    async fn list_reminders(&self, user_id: Uuid, include_completed: bool) -> PortResult<Vec<Reminder>>;

    /// Marks a reminder complete. There is no way back to incomplete.
    async fn complete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder>;

    async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder>;
}

#[async_trait]
pub trait SpeechToTextService: Send + Sync {
    /// Transcribes a slice of audio data into text.
    async fn transcribe_audio(&self, audio_data: &[u8]) -> PortResult<String>;
}

/// Voice settings for speech synthesis. `None` means the adapter's default voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub voice: Option<String>,
    pub speed: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self { voice: None, speed: 1.0 }
    }
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn synthesize(&self, text: &str, params: &VoiceParams) -> PortResult<Vec<u8>>;
}

/// The remote AI parser. Primary source of truth for log and voice parsing;
/// the local heuristics only stand in when it fails.
#[async_trait]
pub trait CareParsingService: Send + Sync {
    async fn parse_log(&self, text: &str, nurture: &Nurture) -> PortResult<ParsedLog>;

    async fn parse_voice_command(
        &self,
        transcript: &str,
        nurtures: &[Nurture],
    ) -> PortResult<ParsedCommand>;

    async fn answer_question(&self, question: &str, nurture: Option<&Nurture>) -> PortResult<String>;
}

#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Asks the delivery channel for permission to show notifications.
    async fn request_permission(&self) -> PortResult<bool>;

    async fn schedule(&self, request: &ScheduleRequest) -> PortResult<NotificationId>;

    async fn cancel(&self, id: &str) -> PortResult<()>;

    async fn cancel_all(&self) -> PortResult<()>;
}
