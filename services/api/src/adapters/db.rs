//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use bloomie_core::domain::{
    LogEntry, NewLogEntry, NewReminder, Nurture, NurtureDraft, NurtureMetadata, ParsedLog,
    Reminder, RepeatPattern, User, UserCredentials,
};
use bloomie_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: &str, id: impl std::fmt::Display) -> impl FnOnce(sqlx::Error) -> PortError {
    let label = format!("{} {} not found", what, id);
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(label),
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

impl UserRecord {
    fn into_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct NurtureRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    kind: String,
    metadata: Json<NurtureMetadata>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NurtureRecord {
    fn to_domain(self) -> PortResult<Nurture> {
        Ok(Nurture {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            kind: self.kind.parse()?,
            metadata: self.metadata.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LogRecord {
    id: Uuid,
    nurture_id: Uuid,
    user_id: Uuid,
    raw_input: String,
    parsed: Json<ParsedLog>,
    mood: Option<String>,
    health_score: Option<i16>,
    photo_uris: Vec<String>,
    created_at: DateTime<Utc>,
}

impl LogRecord {
    fn to_domain(self) -> LogEntry {
        LogEntry {
            id: self.id,
            nurture_id: self.nurture_id,
            user_id: self.user_id,
            raw_input: self.raw_input,
            parsed: self.parsed.0,
            mood: self.mood,
            health_score: self.health_score.and_then(|s| u8::try_from(s).ok()),
            photo_uris: self.photo_uris,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReminderRecord {
    id: Uuid,
    user_id: Uuid,
    nurture_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    scheduled_at: DateTime<Utc>,
    repeat: Option<String>,
    repeat_interval: Option<i32>,
    is_ai_generated: bool,
    is_completed: bool,
    notification_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReminderRecord {
    fn to_domain(self) -> PortResult<Reminder> {
        Ok(Reminder {
            id: self.id,
            user_id: self.user_id,
            nurture_id: self.nurture_id,
            title: self.title,
            description: self.description,
            scheduled_at: self.scheduled_at,
            repeat: self.repeat.as_deref().map(str::parse::<RepeatPattern>).transpose()?,
            repeat_interval: self.repeat_interval.and_then(|i| u32::try_from(i).ok()),
            is_ai_generated: self.is_ai_generated,
            is_completed: self.is_completed,
            notification_id: self.notification_id,
            created_at: self.created_at,
        })
    }
}

const NURTURE_COLUMNS: &str = "id, user_id, name, kind, metadata, created_at, updated_at";
const LOG_COLUMNS: &str =
    "id, nurture_id, user_id, raw_input, parsed, mood, health_score, photo_uris, created_at";
const REMINDER_COLUMNS: &str = "id, user_id, nurture_id, title, description, scheduled_at, repeat, \
     repeat_interval, is_ai_generated, is_completed, notification_id, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id",
        )
        .bind(Uuid::new_v4())
        .bind(email.trim().to_lowercase())
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::InvalidInput("An account with this email already exists".to_string())
            }
            other => unexpected(other),
        })?;

        Ok(User { user_id, email: Some(email.trim().to_lowercase()) })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("User", email))?;
        Ok(record.into_credentials())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (session_id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE session_id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_nurture(&self, user_id: Uuid, draft: &NurtureDraft) -> PortResult<Nurture> {
        let sql = format!(
            "INSERT INTO nurtures (id, user_id, name, kind, metadata) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            NURTURE_COLUMNS
        );
        sqlx::query_as::<_, NurtureRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(draft.name.trim())
            .bind(draft.kind.as_str())
            .bind(Json(&draft.metadata))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn get_nurture(&self, user_id: Uuid, nurture_id: Uuid) -> PortResult<Nurture> {
        let sql = format!("SELECT {} FROM nurtures WHERE id = $1 AND user_id = $2", NURTURE_COLUMNS);
        sqlx::query_as::<_, NurtureRecord>(&sql)
            .bind(nurture_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Nurture", nurture_id))?
            .to_domain()
    }

    async fn list_nurtures(&self, user_id: Uuid) -> PortResult<Vec<Nurture>> {
        let sql = format!(
            "SELECT {} FROM nurtures WHERE user_id = $1 ORDER BY created_at ASC",
            NURTURE_COLUMNS
        );
        sqlx::query_as::<_, NurtureRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(NurtureRecord::to_domain)
            .collect()
    }

    async fn update_nurture(
        &self,
        user_id: Uuid,
        nurture_id: Uuid,
        draft: &NurtureDraft,
    ) -> PortResult<Nurture> {
        let sql = format!(
            "UPDATE nurtures SET name = $3, kind = $4, metadata = $5, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            NURTURE_COLUMNS
        );
        sqlx::query_as::<_, NurtureRecord>(&sql)
            .bind(nurture_id)
            .bind(user_id)
            .bind(draft.name.trim())
            .bind(draft.kind.as_str())
            .bind(Json(&draft.metadata))
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Nurture", nurture_id))?
            .to_domain()
    }

    async fn delete_nurture(&self, user_id: Uuid, nurture_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM nurtures WHERE id = $1 AND user_id = $2")
            .bind(nurture_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Nurture {} not found", nurture_id)));
        }
        Ok(())
    }

    async fn create_log(&self, entry: &NewLogEntry) -> PortResult<LogEntry> {
        let sql = format!(
            "INSERT INTO care_logs (id, nurture_id, user_id, raw_input, parsed, mood, health_score, photo_uris) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            LOG_COLUMNS
        );
        let record = sqlx::query_as::<_, LogRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.nurture_id)
            .bind(entry.user_id)
            .bind(&entry.raw_input)
            .bind(Json(&entry.parsed))
            .bind(&entry.mood)
            .bind(entry.health_score.map(i16::from))
            .bind(&entry.photo_uris)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_logs_for_nurture(&self, nurture_id: Uuid) -> PortResult<Vec<LogEntry>> {
        let sql = format!(
            "SELECT {} FROM care_logs WHERE nurture_id = $1 ORDER BY created_at DESC",
            LOG_COLUMNS
        );
        let records = sqlx::query_as::<_, LogRecord>(&sql)
            .bind(nurture_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(LogRecord::to_domain).collect())
    }

    async fn list_logs_for_user(&self, user_id: Uuid) -> PortResult<Vec<LogEntry>> {
        let sql = format!(
            "SELECT {} FROM care_logs WHERE user_id = $1 ORDER BY created_at DESC",
            LOG_COLUMNS
        );
        let records = sqlx::query_as::<_, LogRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(LogRecord::to_domain).collect())
    }

    async fn create_reminder(&self, reminder: &NewReminder) -> PortResult<Reminder> {
        let sql = format!(
            "INSERT INTO reminders (id, user_id, nurture_id, title, description, scheduled_at, repeat, \
             repeat_interval, is_ai_generated, notification_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            REMINDER_COLUMNS
        );
        sqlx::query_as::<_, ReminderRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(reminder.user_id)
            .bind(reminder.nurture_id)
            .bind(reminder.title.trim())
            .bind(&reminder.description)
            .bind(reminder.scheduled_at)
            .bind(reminder.repeat.map(|r| r.as_str()))
            .bind(reminder.repeat_interval.and_then(|i| i32::try_from(i).ok()))
            .bind(reminder.is_ai_generated)
            .bind(&reminder.notification_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn list_reminders(&self, user_id: Uuid, include_completed: bool) -> PortResult<Vec<Reminder>> {
        let sql = format!(
            "SELECT {} FROM reminders WHERE user_id = $1 AND ($2 OR NOT is_completed) \
             ORDER BY scheduled_at ASC",
            REMINDER_COLUMNS
        );
        sqlx::query_as::<_, ReminderRecord>(&sql)
            .bind(user_id)
            .bind(include_completed)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?
            .into_iter()
            .map(ReminderRecord::to_domain)
            .collect()
    }

    async fn complete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder> {
        let sql = format!(
            "UPDATE reminders SET is_completed = TRUE WHERE id = $1 AND user_id = $2 RETURNING {}",
            REMINDER_COLUMNS
        );
        sqlx::query_as::<_, ReminderRecord>(&sql)
            .bind(reminder_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Reminder", reminder_id))?
            .to_domain()
    }

    async fn delete_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> PortResult<Reminder> {
        let sql = format!(
            "DELETE FROM reminders WHERE id = $1 AND user_id = $2 RETURNING {}",
            REMINDER_COLUMNS
        );
        sqlx::query_as::<_, ReminderRecord>(&sql)
            .bind(reminder_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Reminder", reminder_id))?
            .to_domain()
    }
}
