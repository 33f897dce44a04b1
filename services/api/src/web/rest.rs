//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, LoginRequest, SessionResponse, SignupRequest},
    state::AppState,
    voice_task::{process_audio, process_transcript, CommandReply},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use bloomie_core::domain::{
    LogEntry, LogExtras, NewReminder, Nurture, NurtureDraft, NurtureMetadata, ParsedLog, Reminder,
    RepeatPattern,
};
use bloomie_core::export::export_logs_csv;
use bloomie_core::fallback::ParseSource;
use bloomie_core::health::{summarize_health, HealthTrend};
use bloomie_core::intervals::DueInfo;
use bloomie_core::ports::PortError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
        list_nurtures_handler,
        create_nurture_handler,
        get_nurture_handler,
        update_nurture_handler,
        delete_nurture_handler,
        list_logs_handler,
        create_log_handler,
        due_handler,
        health_handler,
        list_reminders_handler,
        create_reminder_handler,
        complete_reminder_handler,
        delete_reminder_handler,
        voice_command_handler,
        voice_transcription_handler,
        export_logs_handler,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, AuthResponse, SessionResponse,
            NurtureRequest, NurtureResponse, CreateLogRequest, LogResponse, CreateLogResponse,
            DueResponse, HealthResponse, CreateReminderRequest, ReminderResponse,
            VoiceCommandRequest, CommandReply,
        )
    ),
    tags(
        (name = "Bloomie API", description = "Care logs, smart reminders and voice commands for babies, pets and plants.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error mapping
//=========================================================================================

type HandlerError = (StatusCode, String);

/// Maps a port error to the HTTP status the client sees. Internal details
/// are logged, not returned.
pub fn port_error_response(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Timeout(ms) => {
            error!("Upstream timed out after {} ms", ms);
            (StatusCode::GATEWAY_TIMEOUT, "Upstream service timed out".to_string())
        }
        PortError::Unexpected(msg) => {
            error!("Unexpected error: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct NurtureRequest {
    pub name: String,
    /// `baby`, `pet` or `plant`.
    pub kind: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: NurtureMetadata,
}

impl NurtureRequest {
    fn into_draft(self) -> Result<NurtureDraft, PortError> {
        let draft = NurtureDraft { name: self.name, kind: self.kind.parse()?, metadata: self.metadata };
        draft.validate()?;
        Ok(draft)
    }
}

#[derive(Serialize, ToSchema)]
pub struct NurtureResponse {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    #[schema(value_type = Object)]
    pub metadata: NurtureMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Nurture> for NurtureResponse {
    fn from(n: Nurture) -> Self {
        Self {
            id: n.id,
            name: n.name,
            kind: n.kind.as_str().to_string(),
            metadata: n.metadata,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLogRequest {
    pub text: String,
    pub mood: Option<String>,
    /// 1 (poor) to 5 (great).
    pub health_score: Option<u8>,
    #[serde(default)]
    pub photo_uris: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LogResponse {
    pub id: Uuid,
    pub nurture_id: Uuid,
    pub raw_input: String,
    #[schema(value_type = Object)]
    pub parsed: ParsedLog,
    pub mood: Option<String>,
    pub health_score: Option<u8>,
    pub photo_uris: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LogEntry> for LogResponse {
    fn from(l: LogEntry) -> Self {
        Self {
            id: l.id,
            nurture_id: l.nurture_id,
            raw_input: l.raw_input,
            parsed: l.parsed,
            mood: l.mood,
            health_score: l.health_score,
            photo_uris: l.photo_uris,
            created_at: l.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CreateLogResponse {
    pub log: LogResponse,
    /// True when the log was parsed by the local heuristics.
    pub degraded: bool,
    pub reminders: Vec<ReminderResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct DueResponse {
    pub category: String,
    pub baseline_hours: f64,
    pub due_in_hours: f64,
    pub overdue: bool,
    pub last_serviced_at: Option<DateTime<Utc>>,
}

impl From<DueInfo> for DueResponse {
    fn from(d: DueInfo) -> Self {
        Self {
            category: d.category.label().to_string(),
            baseline_hours: d.baseline_hours,
            due_in_hours: d.due_in_hours,
            overdue: d.overdue,
            last_serviced_at: d.last_serviced_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct HealthQuery {
    /// Window size in days (default 30).
    pub days: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub days: u32,
    pub entries: usize,
    pub scored_entries: usize,
    pub average_score: Option<f64>,
    pub latest_score: Option<u8>,
    pub latest_mood: Option<String>,
    /// `improving`, `steady` or `declining`; absent with fewer than two scores.
    pub trend: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateReminderRequest {
    pub nurture_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    /// `hourly`, `daily`, `weekly` or `monthly`.
    pub repeat: Option<String>,
    pub repeat_interval: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ReminderResponse {
    pub id: Uuid,
    pub nurture_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub repeat: Option<String>,
    pub repeat_interval: Option<u32>,
    pub is_ai_generated: bool,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Reminder> for ReminderResponse {
    fn from(r: Reminder) -> Self {
        Self {
            id: r.id,
            nurture_id: r.nurture_id,
            title: r.title,
            description: r.description,
            scheduled_at: r.scheduled_at,
            repeat: r.repeat.map(|p| p.as_str().to_string()),
            repeat_interval: r.repeat_interval,
            is_ai_generated: r.is_ai_generated,
            is_completed: r.is_completed,
            created_at: r.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ListRemindersQuery {
    /// Include completed reminders (default false).
    pub include_completed: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct VoiceCommandRequest {
    pub transcript: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ExportQuery {
    /// Only export this nurture's logs.
    pub nurture_id: Option<Uuid>,
}

//=========================================================================================
// Nurtures
//=========================================================================================

#[utoipa::path(
    get,
    path = "/nurtures",
    responses((status = 200, description = "The user's nurtures", body = [NurtureResponse]))
)]
pub async fn list_nurtures_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let nurtures = app_state.db.list_nurtures(user_id).await.map_err(port_error_response)?;
    Ok(Json(nurtures.into_iter().map(NurtureResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/nurtures",
    request_body = NurtureRequest,
    responses(
        (status = 201, description = "Nurture created", body = NurtureResponse),
        (status = 400, description = "Invalid name, kind or metadata")
    )
)]
pub async fn create_nurture_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<NurtureRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let draft = req.into_draft().map_err(port_error_response)?;
    let nurture = app_state.db.create_nurture(user_id, &draft).await.map_err(port_error_response)?;
    info!(user_id = %user_id, nurture_id = %nurture.id, kind = %nurture.kind, "Nurture created");
    Ok((StatusCode::CREATED, Json(NurtureResponse::from(nurture))))
}

#[utoipa::path(
    get,
    path = "/nurtures/{id}",
    params(("id" = Uuid, Path, description = "Nurture id")),
    responses(
        (status = 200, description = "The nurture", body = NurtureResponse),
        (status = 404, description = "No such nurture for this user")
    )
)]
pub async fn get_nurture_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let nurture = app_state.db.get_nurture(user_id, id).await.map_err(port_error_response)?;
    Ok(Json(NurtureResponse::from(nurture)))
}

#[utoipa::path(
    put,
    path = "/nurtures/{id}",
    params(("id" = Uuid, Path, description = "Nurture id")),
    request_body = NurtureRequest,
    responses(
        (status = 200, description = "Nurture updated", body = NurtureResponse),
        (status = 404, description = "No such nurture for this user")
    )
)]
pub async fn update_nurture_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<NurtureRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let draft = req.into_draft().map_err(port_error_response)?;
    let nurture = app_state.db.update_nurture(user_id, id, &draft).await.map_err(port_error_response)?;
    Ok(Json(NurtureResponse::from(nurture)))
}

#[utoipa::path(
    delete,
    path = "/nurtures/{id}",
    params(("id" = Uuid, Path, description = "Nurture id")),
    responses(
        (status = 204, description = "Nurture and its logs deleted"),
        (status = 404, description = "No such nurture for this user")
    )
)]
pub async fn delete_nurture_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    app_state.db.delete_nurture(user_id, id).await.map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Logs, due estimates and health
//=========================================================================================

#[utoipa::path(
    get,
    path = "/nurtures/{id}/logs",
    params(("id" = Uuid, Path, description = "Nurture id")),
    responses((status = 200, description = "Logs, newest first", body = [LogResponse]))
)]
pub async fn list_logs_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let nurture = app_state.db.get_nurture(user_id, id).await.map_err(port_error_response)?;
    let logs = app_state.db.list_logs_for_nurture(nurture.id).await.map_err(port_error_response)?;
    Ok(Json(logs.into_iter().map(LogResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/nurtures/{id}/logs",
    params(("id" = Uuid, Path, description = "Nurture id")),
    request_body = CreateLogRequest,
    responses(
        (status = 201, description = "Log stored; smart reminders may have been created", body = CreateLogResponse),
        (status = 400, description = "Empty text or health score outside 1-5")
    )
)]
pub async fn create_log_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateLogRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let nurture = app_state.db.get_nurture(user_id, id).await.map_err(port_error_response)?;
    let extras = LogExtras { mood: req.mood, health_score: req.health_score, photo_uris: req.photo_uris };
    let logged = app_state
        .care
        .record_log(user_id, &nurture, &req.text, extras, Utc::now())
        .await
        .map_err(port_error_response)?;

    let response = CreateLogResponse {
        log: LogResponse::from(logged.log),
        degraded: logged.source == ParseSource::Local,
        reminders: logged.reminders.into_iter().map(ReminderResponse::from).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/nurtures/{id}/due",
    params(("id" = Uuid, Path, description = "Nurture id")),
    responses((status = 200, description = "Due estimate per reminder category", body = [DueResponse]))
)]
pub async fn due_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let nurture = app_state.db.get_nurture(user_id, id).await.map_err(port_error_response)?;
    let due = app_state.care.due_overview(&nurture, Utc::now()).await.map_err(port_error_response)?;
    Ok(Json(due.into_iter().map(DueResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/nurtures/{id}/health",
    params(("id" = Uuid, Path, description = "Nurture id"), HealthQuery),
    responses((status = 200, description = "Health summary for the window", body = HealthResponse))
)]
pub async fn health_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Query(query): Query<HealthQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let days = query.days.unwrap_or(30).clamp(1, 3650);
    let nurture = app_state.db.get_nurture(user_id, id).await.map_err(port_error_response)?;
    let logs = app_state.db.list_logs_for_nurture(nurture.id).await.map_err(port_error_response)?;
    let summary = summarize_health(&logs, Utc::now() - Duration::days(i64::from(days)));

    Ok(Json(HealthResponse {
        days,
        entries: summary.entries,
        scored_entries: summary.scored_entries,
        average_score: summary.average_score,
        latest_score: summary.latest_score,
        latest_mood: summary.latest_mood,
        trend: summary.trend.map(|t| {
            match t {
                HealthTrend::Improving => "improving",
                HealthTrend::Steady => "steady",
                HealthTrend::Declining => "declining",
            }
            .to_string()
        }),
    }))
}

//=========================================================================================
// Reminders
//=========================================================================================

#[utoipa::path(
    get,
    path = "/reminders",
    params(ListRemindersQuery),
    responses((status = 200, description = "Reminders ordered by time", body = [ReminderResponse]))
)]
pub async fn list_reminders_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListRemindersQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let reminders = app_state
        .db
        .list_reminders(user_id, query.include_completed.unwrap_or(false))
        .await
        .map_err(port_error_response)?;
    Ok(Json(reminders.into_iter().map(ReminderResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/reminders",
    request_body = CreateReminderRequest,
    responses(
        (status = 201, description = "Reminder scheduled", body = ReminderResponse),
        (status = 400, description = "Empty title or time not in the future")
    )
)]
pub async fn create_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateReminderRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Some(nurture_id) = req.nurture_id {
        app_state.db.get_nurture(user_id, nurture_id).await.map_err(port_error_response)?;
    }
    let repeat = req
        .repeat
        .as_deref()
        .map(str::parse::<RepeatPattern>)
        .transpose()
        .map_err(port_error_response)?;

    let reminder = app_state
        .care
        .schedule_reminder(
            NewReminder {
                user_id,
                nurture_id: req.nurture_id,
                title: req.title,
                description: req.description,
                scheduled_at: req.scheduled_at,
                repeat,
                repeat_interval: req.repeat_interval,
                is_ai_generated: false,
                notification_id: None,
            },
            Utc::now(),
        )
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(ReminderResponse::from(reminder))))
}

#[utoipa::path(
    post,
    path = "/reminders/{id}/complete",
    params(("id" = Uuid, Path, description = "Reminder id")),
    responses(
        (status = 200, description = "Reminder completed", body = ReminderResponse),
        (status = 404, description = "No such reminder for this user")
    )
)]
pub async fn complete_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let reminder = app_state.care.complete_reminder(user_id, id).await.map_err(port_error_response)?;
    Ok(Json(ReminderResponse::from(reminder)))
}

#[utoipa::path(
    delete,
    path = "/reminders/{id}",
    params(("id" = Uuid, Path, description = "Reminder id")),
    responses(
        (status = 204, description = "Reminder deleted and its notification cancelled"),
        (status = 404, description = "No such reminder for this user")
    )
)]
pub async fn delete_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    app_state.care.delete_reminder(user_id, id).await.map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Voice
//=========================================================================================

#[utoipa::path(
    post,
    path = "/voice/commands",
    request_body = VoiceCommandRequest,
    responses(
        (status = 200, description = "Command handled", body = CommandReply),
        (status = 400, description = "Empty transcript")
    )
)]
pub async fn voice_command_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<VoiceCommandRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let reply = process_transcript(&app_state, user_id, &req.transcript)
        .await
        .map_err(port_error_response)?;
    Ok(Json(reply))
}

/// Transcribe an uploaded recording and handle it as a voice command.
///
/// Accepts a multipart/form-data request with a single audio part (WAV, or
/// raw PCM16 mono at the configured sample rate).
#[utoipa::path(
    post,
    path = "/voice/transcriptions",
    request_body(content_type = "multipart/form-data", description = "The recorded audio."),
    responses(
        (status = 200, description = "Command handled", body = CommandReply),
        (status = 400, description = "Missing or empty audio")
    )
)]
pub async fn voice_transcription_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read multipart data: {}", e)))?
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "Multipart form must include an audio file".to_string()))?;
    let audio = field
        .bytes()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read audio bytes: {}", e)))?;

    let reply = process_audio(&app_state, user_id, &audio).await.map_err(port_error_response)?;
    Ok(Json(reply))
}

//=========================================================================================
// Export
//=========================================================================================

#[utoipa::path(
    get,
    path = "/exports/logs.csv",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV export of care logs", content_type = "text/csv", body = String),
        (status = 404, description = "No such nurture for this user")
    )
)]
pub async fn export_logs_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let (nurtures, logs) = match query.nurture_id {
        Some(id) => {
            let nurture = app_state.db.get_nurture(user_id, id).await.map_err(port_error_response)?;
            let logs = app_state.db.list_logs_for_nurture(id).await.map_err(port_error_response)?;
            (vec![nurture], logs)
        }
        None => {
            let nurtures = app_state.db.list_nurtures(user_id).await.map_err(port_error_response)?;
            let logs = app_state.db.list_logs_for_user(user_id).await.map_err(port_error_response)?;
            (nurtures, logs)
        }
    };

    let csv = export_logs_csv(&nurtures, &logs).map_err(|e| {
        error!("Failed to export logs: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export logs".to_string())
    })?;
    info!(user_id = %user_id, rows = logs.len(), "Exported care logs");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"bloomie-logs.csv\""),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_statuses() {
        assert_eq!(port_error_response(PortError::NotFound("x".into())).0, StatusCode::NOT_FOUND);
        assert_eq!(port_error_response(PortError::InvalidInput("x".into())).0, StatusCode::BAD_REQUEST);
        assert_eq!(port_error_response(PortError::Unauthorized).0, StatusCode::UNAUTHORIZED);
        assert_eq!(port_error_response(PortError::Timeout(10)).0, StatusCode::GATEWAY_TIMEOUT);
        let (status, body) = port_error_response(PortError::Unexpected("db password leaked".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("password"));
    }

    #[test]
    fn nurture_request_validates_kind_and_name() {
        let req = NurtureRequest { name: "Fern".into(), kind: "plant".into(), metadata: NurtureMetadata::default() };
        assert!(req.into_draft().is_ok());
        let req = NurtureRequest { name: "Fern".into(), kind: "rock".into(), metadata: NurtureMetadata::default() };
        assert!(matches!(req.into_draft(), Err(PortError::InvalidInput(_))));
        let req = NurtureRequest { name: "  ".into(), kind: "pet".into(), metadata: NurtureMetadata::default() };
        assert!(req.into_draft().is_err());
    }

    #[test]
    fn openapi_document_lists_the_voice_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/voice/commands"));
        assert!(doc.paths.paths.contains_key("/nurtures/{id}/logs"));
    }
}
