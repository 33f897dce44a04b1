//! crates/bloomie_core/src/care.rs
//!
//! Wires the heuristics to the ports: after a log is saved the nurture's
//! reminder categories are estimated and overdue ones emitted; voice commands
//! are turned into logs, reminders or answers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::classifier::{ActivityClassifier, KeywordTable};
use crate::domain::{
    ActivityCategory, Intent, LogEntry, LogExtras, NewLogEntry, NewReminder, NotificationPayload,
    Nurture, NurtureKind, ParsedCommand, Reminder, ScheduleRequest, MAX_REMINDER_HOURS,
};
use crate::fallback::{ParseSource, ResilientParser};
use crate::intervals::{DueInfo, IntervalEstimator, SpeciesTable, TieBreak};
use crate::ports::{DatabaseService, NotificationScheduler, PortError, PortResult};
use crate::reminders::{Emission, ReminderEmitter};
use crate::voice::{VoiceIntentParser, VoiceLexicon};

//=========================================================================================
// Heuristic tables
//=========================================================================================

/// Data-driven tables behind the heuristics. Every section defaults to the
/// built-in table, so a JSON file only needs the parts it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicsConfig {
    #[serde(default)]
    pub activities: KeywordTable,
    #[serde(default)]
    pub voice: VoiceLexicon,
    #[serde(default)]
    pub species: SpeciesTable,
}

impl HeuristicsConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The pure, stateless half of the care logic.
pub struct CareHeuristics {
    estimator: IntervalEstimator,
    voice: VoiceIntentParser,
}

impl CareHeuristics {
    pub fn new(config: HeuristicsConfig, tie_break: TieBreak) -> Self {
        let classifier = ActivityClassifier::new(config.activities);
        Self {
            estimator: IntervalEstimator::new(classifier, config.species).with_tie_break(tie_break),
            voice: VoiceIntentParser::new(config.voice),
        }
    }

    pub fn builtin() -> Self {
        Self::new(HeuristicsConfig::default(), TieBreak::default())
    }

    pub fn classifier(&self) -> &ActivityClassifier {
        self.estimator.classifier()
    }

    pub fn estimator(&self) -> &IntervalEstimator {
        &self.estimator
    }

    pub fn voice(&self) -> &VoiceIntentParser {
        &self.voice
    }
}

/// Categories that produce automatic reminders for each kind.
pub fn reminder_categories(kind: NurtureKind) -> &'static [ActivityCategory] {
    match kind {
        NurtureKind::Plant => &[ActivityCategory::Watering, ActivityCategory::Fertilizing],
        NurtureKind::Pet => &[
            ActivityCategory::Feeding,
            ActivityCategory::Walking,
            ActivityCategory::ParasiteTreatment,
        ],
        NurtureKind::Baby => &[ActivityCategory::Feeding, ActivityCategory::Diaper],
    }
}

//=========================================================================================
// Orchestration
//=========================================================================================

/// A stored log plus whatever reminders it caused.
#[derive(Debug, Clone)]
pub struct LoggedCare {
    pub log: LogEntry,
    pub source: ParseSource,
    pub reminders: Vec<Reminder>,
}

/// What a voice command ended up doing.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Logged(LoggedCare),
    ReminderSet(Reminder),
    Answered { answer: String, source: ParseSource },
    /// The client should open the camera, optionally for a nurture.
    OpenCamera { nurture_id: Option<Uuid> },
    /// A log was requested but no known nurture was named.
    NeedsNurture { action: String },
}

pub struct CareService {
    db: Arc<dyn DatabaseService>,
    scheduler: Arc<dyn NotificationScheduler>,
    parser: Arc<ResilientParser>,
    emitter: ReminderEmitter,
}

impl CareService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        scheduler: Arc<dyn NotificationScheduler>,
        parser: Arc<ResilientParser>,
        emitter: ReminderEmitter,
    ) -> Self {
        Self { db, scheduler, parser, emitter }
    }

    pub fn parser(&self) -> &ResilientParser {
        &self.parser
    }

    fn heuristics(&self) -> &CareHeuristics {
        self.parser.heuristics()
    }

    /// Current estimate for each reminder category of the nurture.
    pub async fn due_overview(&self, nurture: &Nurture, now: DateTime<Utc>) -> PortResult<Vec<DueInfo>> {
        let logs = self.db.list_logs_for_nurture(nurture.id).await?;
        let estimator = self.heuristics().estimator();
        Ok(reminder_categories(nurture.kind)
            .iter()
            .filter_map(|&category| estimator.estimate_due(nurture, &logs, category, now))
            .collect())
    }

    /// Estimates every reminder category and stores a reminder for each
    /// emission. No de-duplication happens here; see `DuplicatePolicy`.
    pub async fn check_nurture(&self, nurture: &Nurture, now: DateTime<Utc>) -> PortResult<Vec<Reminder>> {
        let mut created = Vec::new();
        for due in self.due_overview(nurture, now).await? {
            let Some(emission) = self.emitter.emit(nurture, &due).await else {
                continue;
            };
            let reminder = self.db.create_reminder(&ai_reminder(nurture, &emission, now)).await?;
            created.push(reminder);
        }
        if !created.is_empty() {
            info!(nurture_id = %nurture.id, count = created.len(), "Created smart reminders");
        }
        Ok(created)
    }

    pub async fn record_log(
        &self,
        user_id: Uuid,
        nurture: &Nurture,
        text: &str,
        extras: LogExtras,
        now: DateTime<Utc>,
    ) -> PortResult<LoggedCare> {
        if nurture.user_id != user_id {
            return Err(PortError::Unauthorized);
        }
        extras.validate()?;
        if text.trim().is_empty() {
            return Err(PortError::InvalidInput("log text must not be empty".to_string()));
        }

        let parsed = self.parser.parse_log(text, nurture).await;
        let log = self
            .db
            .create_log(&NewLogEntry {
                nurture_id: nurture.id,
                user_id,
                raw_input: text.trim().to_string(),
                parsed: parsed.value,
                mood: extras.mood,
                health_score: extras.health_score,
                photo_uris: extras.photo_uris,
            })
            .await?;

        // Reminder inference is best effort: the log is already stored.
        let reminders = match self.check_nurture(nurture, now).await {
            Ok(reminders) => reminders,
            Err(e) => {
                error!(nurture_id = %nurture.id, "Smart reminder check failed: {}", e);
                Vec::new()
            }
        };

        Ok(LoggedCare { log, source: parsed.source, reminders })
    }

    /// Schedules and stores a user-requested reminder.
    pub async fn schedule_reminder(&self, mut reminder: NewReminder, now: DateTime<Utc>) -> PortResult<Reminder> {
        reminder.ensure_future(now)?;
        let fire_in_seconds = (reminder.scheduled_at - now).num_seconds().max(1) as u64;
        let request = ScheduleRequest {
            title: reminder.title.clone(),
            body: reminder.description.clone().unwrap_or_else(|| reminder.title.clone()),
            fire_in_seconds,
            payload: NotificationPayload {
                user_id: reminder.user_id,
                nurture_id: reminder.nurture_id,
                action: None,
            },
        };
        match self.scheduler.schedule(&request).await {
            Ok(id) => reminder.notification_id = Some(id),
            Err(e) => error!(user_id = %reminder.user_id, "Failed to schedule reminder notification: {}", e),
        }
        self.db.create_reminder(&reminder).await
    }

    pub async fn complete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder> {
        let reminder = self.db.complete_reminder(user_id, reminder_id).await?;
        self.cancel_notification(&reminder).await;
        Ok(reminder)
    }

    pub async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder> {
        let reminder = self.db.delete_reminder(user_id, reminder_id).await?;
        self.cancel_notification(&reminder).await;
        Ok(reminder)
    }

    async fn cancel_notification(&self, reminder: &Reminder) {
        if let Some(id) = &reminder.notification_id {
            if let Err(e) = self.scheduler.cancel(id).await {
                warn!(reminder_id = %reminder.id, "Failed to cancel notification: {}", e);
            }
        }
    }

    /// Carries out a parsed voice command for a user.
    pub async fn execute_command(
        &self,
        user_id: Uuid,
        command: &ParsedCommand,
        transcript: &str,
        now: DateTime<Utc>,
    ) -> PortResult<CommandOutcome> {
        let nurture = match command.nurture_id {
            Some(id) => Some(self.db.get_nurture(user_id, id).await?),
            None => None,
        };

        match command.intent {
            Intent::Log | Intent::Unknown => match nurture {
                Some(nurture) => {
                    let logged = self
                        .record_log(user_id, &nurture, transcript, LogExtras::default(), now)
                        .await?;
                    Ok(CommandOutcome::Logged(logged))
                }
                None => Ok(CommandOutcome::NeedsNurture { action: command.action.clone() }),
            },
            Intent::Reminder => {
                let scheduled_at = reminder_time(now, command.reminder_hours.unwrap_or(1.0))?;
                let title = match &nurture {
                    Some(n) => format!("{}: {}", n.name, command.action),
                    None => command.action.clone(),
                };
                let reminder = self
                    .schedule_reminder(
                        NewReminder {
                            user_id,
                            nurture_id: nurture.as_ref().map(|n| n.id),
                            title,
                            description: Some(transcript.trim().to_string()),
                            scheduled_at,
                            repeat: None,
                            repeat_interval: None,
                            is_ai_generated: false,
                            notification_id: None,
                        },
                        now,
                    )
                    .await?;
                Ok(CommandOutcome::ReminderSet(reminder))
            }
            Intent::Question => {
                let question = command.question.as_deref().unwrap_or(transcript);
                let answer = self.parser.answer_question(question, nurture.as_ref()).await;
                Ok(CommandOutcome::Answered { answer: answer.value, source: answer.source })
            }
            Intent::Photo => Ok(CommandOutcome::OpenCamera { nurture_id: nurture.map(|n| n.id) }),
        }
    }
}

/// When a spoken reminder `hours` from `now` fires, at least a second out.
fn reminder_time(now: DateTime<Utc>, hours: f64) -> PortResult<DateTime<Utc>> {
    if !(hours.is_finite() && hours > 0.0 && hours <= MAX_REMINDER_HOURS) {
        return Err(PortError::InvalidInput(format!("reminder delay out of range: {} hours", hours)));
    }
    Duration::try_seconds((hours * 3600.0).round().max(1.0) as i64)
        .and_then(|delay| now.checked_add_signed(delay))
        .ok_or_else(|| PortError::InvalidInput(format!("reminder delay out of range: {} hours", hours)))
}

fn ai_reminder(nurture: &Nurture, emission: &Emission, now: DateTime<Utc>) -> NewReminder {
    NewReminder {
        user_id: nurture.user_id,
        nurture_id: Some(nurture.id),
        title: emission.request.title.clone(),
        description: Some(emission.request.body.clone()),
        scheduled_at: now + Duration::seconds(emission.request.fire_in_seconds as i64),
        repeat: None,
        repeat_interval: None,
        is_ai_generated: true,
        notification_id: emission.notification_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_builtin_sections() {
        let config = HeuristicsConfig::from_json(
            r#"{"voice": {"reminder_keywords": ["ping"], "question_keywords": [], "photo_keywords": [],
                "durations": [], "fillers": [], "default_reminder_hours": 3.0}}"#,
        )
        .unwrap();
        assert_eq!(config.activities, KeywordTable::builtin());
        assert_eq!(config.species, SpeciesTable::builtin());

        let heuristics = CareHeuristics::new(config, TieBreak::FirstSeen);
        let command = heuristics.voice().parse("ping me", &[]);
        assert_eq!(command.intent, Intent::Reminder);
        assert_eq!(command.reminder_hours, Some(3.0));
    }

    #[test]
    fn reminder_time_rejects_unusable_delays() {
        let now = Utc::now();
        assert_eq!(reminder_time(now, 2.0).unwrap(), now + Duration::hours(2));
        assert_eq!(reminder_time(now, 0.0001).unwrap(), now + Duration::seconds(1));
        for hours in [1e12, f64::INFINITY, f64::NAN, -3.0, 0.0] {
            assert!(matches!(reminder_time(now, hours), Err(PortError::InvalidInput(_))), "{}", hours);
        }
    }

    #[test]
    fn every_kind_has_reminder_categories_with_baselines() {
        let heuristics = CareHeuristics::builtin();
        let now = Utc::now();
        for kind in NurtureKind::ALL {
            let nurture = Nurture {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                name: "n".to_string(),
                kind,
                metadata: crate::domain::NurtureMetadata {
                    species: Some("dog".to_string()),
                    ..Default::default()
                },
                created_at: now,
                updated_at: now,
            };
            for &category in reminder_categories(kind) {
                assert!(heuristics.estimator().baseline_hours(&nurture, category, now).is_some());
            }
        }
    }
}
