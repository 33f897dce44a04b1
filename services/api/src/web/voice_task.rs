//! services/api/src/web/voice_task.rs
//!
//! One voice command, end to end: (audio →) transcript → parsed command →
//! care action → a short reply that the client shows and speaks. Shared by
//! the REST voice endpoints and the WebSocket session.

use crate::web::state::AppState;
use bloomie_core::domain::{Intent, Nurture, ParsedCommand};
use bloomie_core::fallback::{ParseSource, Resolved};
use bloomie_core::ports::{PortError, PortResult};
use bloomie_core::CommandOutcome;
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// What the server did with a voice command.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommandReply {
    pub transcript: String,
    /// `log`, `reminder`, `question`, `photo` or `unknown`.
    pub intent: String,
    /// `logged`, `reminder_set`, `answered`, `open_camera` or `needs_nurture`.
    pub outcome: String,
    /// Sentence to display and speak back.
    pub reply: String,
    /// True when the remote parser was unavailable and local heuristics answered.
    pub degraded: bool,
    pub nurture_id: Option<Uuid>,
    pub log_id: Option<Uuid>,
    pub reminder_id: Option<Uuid>,
    /// Smart reminders created as a side effect of a log.
    pub reminders_created: usize,
}

fn intent_label(intent: Intent) -> &'static str {
    match intent {
        Intent::Log => "log",
        Intent::Reminder => "reminder",
        Intent::Question => "question",
        Intent::Photo => "photo",
        Intent::Unknown => "unknown",
    }
}

/// "30 minutes", "1 hour", "2.5 hours".
fn humanize_hours(hours: f64) -> String {
    if hours < 1.0 {
        let minutes = (hours * 60.0).round().max(1.0) as u64;
        return format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" });
    }
    let rounded = (hours * 10.0).round() / 10.0;
    if rounded == 1.0 {
        "1 hour".to_string()
    } else if rounded.fract() == 0.0 {
        format!("{} hours", rounded as u64)
    } else {
        format!("{} hours", rounded)
    }
}

fn nurture_name(nurtures: &[Nurture], id: Option<Uuid>) -> Option<&str> {
    let id = id?;
    nurtures.iter().find(|n| n.id == id).map(|n| n.name.as_str())
}

pub fn build_reply(
    transcript: &str,
    resolved: &Resolved<ParsedCommand>,
    outcome: CommandOutcome,
    nurtures: &[Nurture],
) -> CommandReply {
    let command = &resolved.value;
    let mut reply = CommandReply {
        transcript: transcript.to_string(),
        intent: intent_label(command.intent).to_string(),
        outcome: String::new(),
        reply: String::new(),
        degraded: resolved.is_degraded(),
        nurture_id: command.nurture_id,
        log_id: None,
        reminder_id: None,
        reminders_created: 0,
    };

    match outcome {
        CommandOutcome::Logged(logged) => {
            let name = nurture_name(nurtures, Some(logged.log.nurture_id)).unwrap_or("them");
            let action = logged.log.parsed.action.clone().unwrap_or_else(|| "that".to_string());
            reply.outcome = "logged".to_string();
            reply.reply = format!("Got it, I logged {} for {}.", action, name);
            if !logged.reminders.is_empty() {
                reply.reply.push_str(" I also set a reminder for what's coming up next.");
            }
            reply.degraded |= logged.source == ParseSource::Local;
            reply.nurture_id = Some(logged.log.nurture_id);
            reply.log_id = Some(logged.log.id);
            reply.reminders_created = logged.reminders.len();
        }
        CommandOutcome::ReminderSet(reminder) => {
            let hours = (reminder.scheduled_at - reminder.created_at).num_seconds().max(60) as f64 / 3600.0;
            reply.outcome = "reminder_set".to_string();
            reply.reply = format!(
                "Okay, I'll remind you to {} in {}.",
                command.action.trim(),
                humanize_hours(command.reminder_hours.unwrap_or(hours))
            );
            reply.reminder_id = Some(reminder.id);
        }
        CommandOutcome::Answered { answer, source } => {
            reply.outcome = "answered".to_string();
            reply.reply = answer;
            reply.degraded |= source == ParseSource::Local;
        }
        CommandOutcome::OpenCamera { nurture_id } => {
            reply.outcome = "open_camera".to_string();
            reply.reply = match nurture_name(nurtures, nurture_id) {
                Some(name) => format!("Opening the camera for {}.", name),
                None => "Opening the camera.".to_string(),
            };
            reply.nurture_id = nurture_id;
        }
        CommandOutcome::NeedsNurture { .. } => {
            reply.outcome = "needs_nurture".to_string();
            reply.reply = "Who is this for? Say their name along with what you did.".to_string();
        }
    }
    reply
}

/// Parses and carries out a transcript for a user.
pub async fn process_transcript(app_state: &AppState, user_id: Uuid, transcript: &str) -> PortResult<CommandReply> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(PortError::InvalidInput("I didn't catch that. Please try again.".to_string()));
    }
    let started = Instant::now();

    let nurtures = app_state.db.list_nurtures(user_id).await?;
    let resolved = app_state.care.parser().parse_voice_command(transcript, &nurtures).await;
    let outcome = app_state
        .care
        .execute_command(user_id, &resolved.value, transcript, Utc::now())
        .await?;
    let reply = build_reply(transcript, &resolved, outcome, &nurtures);

    info!(
        user_id = %user_id,
        intent = %reply.intent,
        outcome = %reply.outcome,
        degraded = reply.degraded,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Voice command handled"
    );
    Ok(reply)
}

/// Transcribes recorded audio, then handles it like a typed transcript.
pub async fn process_audio(app_state: &AppState, user_id: Uuid, audio: &[u8]) -> PortResult<CommandReply> {
    let transcript = app_state.stt.transcribe_audio(audio).await?;
    info!(user_id = %user_id, "Transcribed voice command: '{}'", transcript);
    process_transcript(app_state, user_id, &transcript).await
}
