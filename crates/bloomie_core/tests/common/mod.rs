//! In-memory fakes of the core ports for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bloomie_core::domain::NotificationId;
use bloomie_core::{
    DatabaseService, LogEntry, NewLogEntry, NewReminder, NotificationScheduler, Nurture,
    NurtureDraft, PortError, PortResult, Reminder, ScheduleRequest, User, UserCredentials,
};
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    pub nurtures: Mutex<Vec<Nurture>>,
    pub logs: Mutex<Vec<LogEntry>>,
    pub reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryStore {
    /// Inserts a log with an explicit timestamp, bypassing `create_log`.
    pub fn seed_log(&self, nurture: &Nurture, text: &str, at: DateTime<Utc>) -> LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4(),
            nurture_id: nurture.id,
            user_id: nurture.user_id,
            raw_input: text.to_string(),
            parsed: Default::default(),
            mood: None,
            health_score: None,
            photo_uris: vec![],
            created_at: at,
        };
        self.logs.lock().unwrap().push(entry.clone());
        entry
    }

    pub fn reminder_count(&self) -> usize {
        self.reminders.lock().unwrap().len()
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user_with_email(&self, email: &str, _hashed_password: &str) -> PortResult<User> {
        Ok(User { user_id: Uuid::new_v4(), email: Some(email.to_string()) })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        Err(PortError::NotFound(email.to_string()))
    }

    async fn create_auth_session(&self, _s: &str, _u: Uuid, _e: DateTime<Utc>) -> PortResult<()> {
        Ok(())
    }

    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
        Err(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
        Ok(())
    }

    async fn create_nurture(&self, user_id: Uuid, draft: &NurtureDraft) -> PortResult<Nurture> {
        let now = Utc::now();
        let nurture = Nurture {
            id: Uuid::new_v4(),
            user_id,
            name: draft.name.clone(),
            kind: draft.kind,
            metadata: draft.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        self.nurtures.lock().unwrap().push(nurture.clone());
        Ok(nurture)
    }

    async fn get_nurture(&self, user_id: Uuid, nurture_id: Uuid) -> PortResult<Nurture> {
        self.nurtures
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == nurture_id && n.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Nurture {} not found", nurture_id)))
    }

    async fn list_nurtures(&self, user_id: Uuid) -> PortResult<Vec<Nurture>> {
        Ok(self.nurtures.lock().unwrap().iter().filter(|n| n.user_id == user_id).cloned().collect())
    }

    async fn update_nurture(&self, user_id: Uuid, nurture_id: Uuid, draft: &NurtureDraft) -> PortResult<Nurture> {
        let mut nurtures = self.nurtures.lock().unwrap();
        let nurture = nurtures
            .iter_mut()
            .find(|n| n.id == nurture_id && n.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Nurture {} not found", nurture_id)))?;
        nurture.name = draft.name.clone();
        nurture.kind = draft.kind;
        nurture.metadata = draft.metadata.clone();
        nurture.updated_at = Utc::now();
        Ok(nurture.clone())
    }

    async fn delete_nurture(&self, user_id: Uuid, nurture_id: Uuid) -> PortResult<()> {
        self.nurtures.lock().unwrap().retain(|n| !(n.id == nurture_id && n.user_id == user_id));
        self.logs.lock().unwrap().retain(|l| l.nurture_id != nurture_id);
        Ok(())
    }

    async fn create_log(&self, entry: &NewLogEntry) -> PortResult<LogEntry> {
        let log = LogEntry {
            id: Uuid::new_v4(),
            nurture_id: entry.nurture_id,
            user_id: entry.user_id,
            raw_input: entry.raw_input.clone(),
            parsed: entry.parsed.clone(),
            mood: entry.mood.clone(),
            health_score: entry.health_score,
            photo_uris: entry.photo_uris.clone(),
            created_at: Utc::now(),
        };
        self.logs.lock().unwrap().push(log.clone());
        Ok(log)
    }

    async fn list_logs_for_nurture(&self, nurture_id: Uuid) -> PortResult<Vec<LogEntry>> {
        let mut logs: Vec<LogEntry> =
            self.logs.lock().unwrap().iter().filter(|l| l.nurture_id == nurture_id).cloned().collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }

    async fn list_logs_for_user(&self, user_id: Uuid) -> PortResult<Vec<LogEntry>> {
        let mut logs: Vec<LogEntry> =
            self.logs.lock().unwrap().iter().filter(|l| l.user_id == user_id).cloned().collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }

    async fn create_reminder(&self, reminder: &NewReminder) -> PortResult<Reminder> {
        let stored = Reminder {
            id: Uuid::new_v4(),
            user_id: reminder.user_id,
            nurture_id: reminder.nurture_id,
            title: reminder.title.clone(),
            description: reminder.description.clone(),
            scheduled_at: reminder.scheduled_at,
            repeat: reminder.repeat,
            repeat_interval: reminder.repeat_interval,
            is_ai_generated: reminder.is_ai_generated,
            is_completed: false,
            notification_id: reminder.notification_id.clone(),
            created_at: Utc::now(),
        };
        self.reminders.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_reminders(&self, user_id: Uuid, include_completed: bool) -> PortResult<Vec<Reminder>> {
        Ok(self
            .reminders
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && (include_completed || !r.is_completed))
            .cloned()
            .collect())
    }

    async fn complete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder> {
        let mut reminders = self.reminders.lock().unwrap();
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == reminder_id && r.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Reminder {} not found", reminder_id)))?;
        reminder.is_completed = true;
        Ok(reminder.clone())
    }

    async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder> {
        let mut reminders = self.reminders.lock().unwrap();
        let index = reminders
            .iter()
            .position(|r| r.id == reminder_id && r.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Reminder {} not found", reminder_id)))?;
        Ok(reminders.remove(index))
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    pub scheduled: Mutex<Vec<ScheduleRequest>>,
    pub cancelled: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingScheduler {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn scheduled(&self) -> Vec<ScheduleRequest> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn request_permission(&self) -> PortResult<bool> {
        Ok(true)
    }

    async fn schedule(&self, request: &ScheduleRequest) -> PortResult<NotificationId> {
        if self.fail {
            return Err(PortError::Unexpected("notification service unavailable".to_string()));
        }
        let mut scheduled = self.scheduled.lock().unwrap();
        scheduled.push(request.clone());
        Ok(format!("notif-{}", scheduled.len()))
    }

    async fn cancel(&self, id: &str) -> PortResult<()> {
        self.cancelled.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn cancel_all(&self) -> PortResult<()> {
        self.cancelled.lock().unwrap().push("*".to_string());
        Ok(())
    }
}
