//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        tts::voice_from_name, DbAdapter, OpenAiCareParser, OpenAiSstAdapter, OpenAiTtsAdapter,
        TokioNotificationScheduler,
    },
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, session_handler, signup_handler},
        require_auth,
        rest::{
            complete_reminder_handler, create_log_handler, create_nurture_handler,
            create_reminder_handler, delete_nurture_handler, delete_reminder_handler, due_handler,
            export_logs_handler, get_nurture_handler, health_handler, list_logs_handler,
            list_nurtures_handler, list_reminders_handler, update_nurture_handler,
            voice_command_handler, voice_transcription_handler, ApiDoc,
        },
        state::{AppState, MAX_RECORDING_BYTES},
        ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, types::audio::SpeechModel, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use bloomie_core::{
    fallback::ResilientParser,
    ports::{CareParsingService, NotificationScheduler, VoiceParams},
    reminders::ReminderEmitter,
    CareHeuristics, CareService, HeuristicsConfig,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Load the Care Heuristics ---
    let heuristics_config = match &config.heuristics_path {
        Some(path) => {
            info!("Loading heuristic tables from {}", path.display());
            HeuristicsConfig::from_json(&tokio::fs::read_to_string(path).await?)?
        }
        None => HeuristicsConfig::default(),
    };
    let heuristics = Arc::new(CareHeuristics::new(heuristics_config, config.tie_break));

    // --- 4. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let sst_adapter = Arc::new(OpenAiSstAdapter::new(
        openai_client.clone(),
        config.sst_model.clone(),
        config.stt_sample_rate,
        config.stt_language.clone(),
    ));

    let tts_voice = voice_from_name(&config.tts_voice).ok_or_else(|| {
        ApiError::Internal(format!("Invalid TTS voice specified in config: '{}'", config.tts_voice))
    })?;
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(openai_client.clone(), SpeechModel::Tts1Hd, tts_voice));

    let remote_parser: Option<Arc<dyn CareParsingService>> = if config.remote_parse_enabled {
        let parser = OpenAiCareParser::new(openai_client.clone(), config.parse_model.clone())
            .map_err(|e| ApiError::Internal(format!("Failed to build the care parser: {}", e)))?;
        let parser: Arc<dyn CareParsingService> = Arc::new(parser);
        Some(parser)
    } else {
        warn!("Remote parsing disabled; every request uses the local heuristics.");
        None
    };
    let parser = Arc::new(ResilientParser::new(remote_parser, heuristics, config.remote_parse_timeout));

    let notifications = Arc::new(TokioNotificationScheduler::new());
    if !notifications.request_permission().await? {
        warn!("Notification permission denied; reminders will be stored without alerts.");
    }
    let emitter = ReminderEmitter::new(notifications.clone()).with_policy(config.duplicate_policy);
    let care = Arc::new(CareService::new(db_adapter.clone(), notifications.clone(), parser, emitter));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        stt: sst_adapter,
        tts: tts_adapter,
        care,
        notifications: notifications.clone(),
        voice_params: VoiceParams { voice: Some(config.tts_voice.clone()), speed: config.tts_speed },
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid ALLOWED_ORIGIN '{}': {}", config.allowed_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/session", get(session_handler))
        .route("/nurtures", get(list_nurtures_handler).post(create_nurture_handler))
        .route(
            "/nurtures/{id}",
            get(get_nurture_handler).put(update_nurture_handler).delete(delete_nurture_handler),
        )
        .route("/nurtures/{id}/logs", get(list_logs_handler).post(create_log_handler))
        .route("/nurtures/{id}/due", get(due_handler))
        .route("/nurtures/{id}/health", get(health_handler))
        .route("/reminders", get(list_reminders_handler).post(create_reminder_handler))
        .route("/reminders/{id}", axum::routing::delete(delete_reminder_handler))
        .route("/reminders/{id}/complete", post(complete_reminder_handler))
        .route("/voice/commands", post(voice_command_handler))
        .route("/voice/transcriptions", post(voice_transcription_handler))
        .route("/exports/logs.csv", get(export_logs_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), require_auth));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_RECORDING_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down; cancelling pending notifications.");
            notifications.shutdown();
        })
        .await?;

    Ok(())
}
