//! crates/bloomie_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format; serde
//! derives exist so the heuristics tables and API payloads can reuse them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

//=========================================================================================
// Nurtures
//=========================================================================================

/// The three kinds of things a user can look after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NurtureKind {
    Baby,
    Pet,
    Plant,
}

impl NurtureKind {
    pub const ALL: [NurtureKind; 3] = [NurtureKind::Baby, NurtureKind::Pet, NurtureKind::Plant];

    pub fn as_str(&self) -> &'static str {
        match self {
            NurtureKind::Baby => "baby",
            NurtureKind::Pet => "pet",
            NurtureKind::Plant => "plant",
        }
    }
}

impl fmt::Display for NurtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NurtureKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baby" => Ok(NurtureKind::Baby),
            "pet" => Ok(NurtureKind::Pet),
            "plant" => Ok(NurtureKind::Plant),
            other => Err(PortError::InvalidInput(format!("unknown nurture kind '{}'", other))),
        }
    }
}

/// Kind-specific, all-optional details about a nurture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NurtureMetadata {
    pub species: Option<String>,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: Option<String>,
    /// Days between waterings, as entered by the owner.
    pub water_frequency: Option<u32>,
    /// Hours between feedings, as entered by the owner.
    pub feeding_interval_hours: Option<u32>,
}

/// A tracked baby, pet, or plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nurture {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: NurtureKind,
    pub metadata: NurtureMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The editable part of a nurture, used for both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurtureDraft {
    pub name: String,
    pub kind: NurtureKind,
    #[serde(default)]
    pub metadata: NurtureMetadata,
}

impl NurtureDraft {
    pub fn validate(&self) -> PortResult<()> {
        if self.name.trim().is_empty() {
            return Err(PortError::InvalidInput("nurture name must not be empty".to_string()));
        }
        if self.metadata.water_frequency == Some(0) {
            return Err(PortError::InvalidInput("water_frequency must be at least 1 day".to_string()));
        }
        if self.metadata.feeding_interval_hours == Some(0) {
            return Err(PortError::InvalidInput(
                "feeding_interval_hours must be at least 1 hour".to_string(),
            ));
        }
        Ok(())
    }
}

//=========================================================================================
// Activity categories
//=========================================================================================

/// Coarse category of a care action, shared by every nurture kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Feeding,
    Watering,
    Sunlight,
    Fertilizing,
    Walking,
    Medicine,
    ParasiteTreatment,
    Diaper,
    Sleep,
    Other,
}

impl ActivityCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityCategory::Feeding => "feeding",
            ActivityCategory::Watering => "watering",
            ActivityCategory::Sunlight => "sunlight",
            ActivityCategory::Fertilizing => "fertilizing",
            ActivityCategory::Walking => "walking",
            ActivityCategory::Medicine => "medicine",
            ActivityCategory::ParasiteTreatment => "parasite_treatment",
            ActivityCategory::Diaper => "diaper",
            ActivityCategory::Sleep => "sleep",
            ActivityCategory::Other => "other",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//=========================================================================================
// Logs
//=========================================================================================

/// The structured half of a log entry, filled by the remote parser or the
/// local fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedLog {
    pub action: Option<String>,
    pub subject: Option<String>,
    pub amount: Option<String>,
    pub notes: Option<String>,
}

/// One care record for a nurture. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub nurture_id: Uuid,
    pub user_id: Uuid,
    pub raw_input: String,
    pub parsed: ParsedLog,
    pub mood: Option<String>,
    pub health_score: Option<u8>,
    pub photo_uris: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Text the activity classifier looks at: the parsed action (if any)
    /// followed by what the user actually typed or said.
    pub fn activity_text(&self) -> String {
        match self.parsed.action.as_deref() {
            Some(action) if !action.trim().is_empty() => format!("{} {}", action, self.raw_input),
            _ => self.raw_input.clone(),
        }
    }
}

/// A log entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub nurture_id: Uuid,
    pub user_id: Uuid,
    pub raw_input: String,
    pub parsed: ParsedLog,
    pub mood: Option<String>,
    pub health_score: Option<u8>,
    pub photo_uris: Vec<String>,
}

/// Optional fields a user can attach to a log besides its text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogExtras {
    pub mood: Option<String>,
    pub health_score: Option<u8>,
    #[serde(default)]
    pub photo_uris: Vec<String>,
}

pub const HEALTH_SCORE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

impl LogExtras {
    pub fn validate(&self) -> PortResult<()> {
        match self.health_score {
            Some(score) if !HEALTH_SCORE_RANGE.contains(&score) => Err(PortError::InvalidInput(
                format!("health_score must be between 1 and 5, got {}", score),
            )),
            _ => Ok(()),
        }
    }
}

//=========================================================================================
// Reminders
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPattern {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatPattern::Hourly => "hourly",
            RepeatPattern::Daily => "daily",
            RepeatPattern::Weekly => "weekly",
            RepeatPattern::Monthly => "monthly",
        }
    }
}

impl FromStr for RepeatPattern {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(RepeatPattern::Hourly),
            "daily" => Ok(RepeatPattern::Daily),
            "weekly" => Ok(RepeatPattern::Weekly),
            "monthly" => Ok(RepeatPattern::Monthly),
            other => Err(PortError::InvalidInput(format!("unknown repeat pattern '{}'", other))),
        }
    }
}

/// A scheduled notification tied to a user and usually to a nurture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nurture_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub repeat: Option<RepeatPattern>,
    pub repeat_interval: Option<u32>,
    pub is_ai_generated: bool,
    pub is_completed: bool,
    pub notification_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A reminder that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub user_id: Uuid,
    pub nurture_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub repeat: Option<RepeatPattern>,
    pub repeat_interval: Option<u32>,
    pub is_ai_generated: bool,
    pub notification_id: Option<String>,
}

impl NewReminder {
    /// A reminder must fire strictly after the moment it is created.
    pub fn ensure_future(&self, now: DateTime<Utc>) -> PortResult<()> {
        if self.title.trim().is_empty() {
            return Err(PortError::InvalidInput("reminder title must not be empty".to_string()));
        }
        if self.scheduled_at <= now {
            return Err(PortError::InvalidInput(format!(
                "reminder must be scheduled in the future (got {})",
                self.scheduled_at.to_rfc3339()
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// Notification scheduling
//=========================================================================================

/// Correlation data delivered alongside a fired notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub user_id: Uuid,
    pub nurture_id: Option<Uuid>,
    pub action: Option<ActivityCategory>,
}

/// Everything the notification scheduler needs to fire one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub title: String,
    pub body: String,
    pub fire_in_seconds: u64,
    pub payload: NotificationPayload,
}

/// Opaque identifier handed back by the notification scheduler.
pub type NotificationId = String;

//=========================================================================================
// Voice commands
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Log,
    Reminder,
    Question,
    Photo,
    Unknown,
}

/// Longest delay a spoken reminder may ask for: one year.
pub const MAX_REMINDER_HOURS: f64 = 24.0 * 365.0;

/// The structured reading of one voice transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub intent: Intent,
    pub nurture_name: Option<String>,
    pub nurture_id: Option<Uuid>,
    pub action: String,
    pub reminder_hours: Option<f64>,
    pub question: Option<String>,
}

//=========================================================================================
// Users and auth
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reminder_at(scheduled_at: DateTime<Utc>) -> NewReminder {
        NewReminder {
            user_id: Uuid::new_v4(),
            nurture_id: None,
            title: "Water the fern".to_string(),
            description: None,
            scheduled_at,
            repeat: None,
            repeat_interval: None,
            is_ai_generated: false,
            notification_id: None,
        }
    }

    #[test]
    fn reminder_in_the_past_or_now_is_rejected() {
        let now = Utc::now();
        assert!(reminder_at(now).ensure_future(now).is_err());
        assert!(reminder_at(now - Duration::minutes(5)).ensure_future(now).is_err());
        assert!(reminder_at(now + Duration::seconds(1)).ensure_future(now).is_ok());
    }

    #[test]
    fn health_score_outside_range_is_rejected() {
        let extras = LogExtras { health_score: Some(6), ..Default::default() };
        assert!(matches!(extras.validate(), Err(PortError::InvalidInput(_))));
        let extras = LogExtras { health_score: Some(0), ..Default::default() };
        assert!(extras.validate().is_err());
        let extras = LogExtras { health_score: Some(5), ..Default::default() };
        assert!(extras.validate().is_ok());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Plant".parse::<NurtureKind>().unwrap(), NurtureKind::Plant);
        assert!("robot".parse::<NurtureKind>().is_err());
    }

    #[test]
    fn activity_text_prefers_parsed_action() {
        let entry = LogEntry {
            id: Uuid::new_v4(),
            nurture_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            raw_input: "gave her 120ml".to_string(),
            parsed: ParsedLog { action: Some("bottle".to_string()), ..Default::default() },
            mood: None,
            health_score: None,
            photo_uris: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(entry.activity_text(), "bottle gave her 120ml");
    }
}
