//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use bloomie_core::intervals::TieBreak;
use bloomie_core::reminders::DuplicatePolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub allowed_origin: String,
    pub openai_api_key: Option<String>,
    pub sst_model: String,
    pub stt_sample_rate: u32,
    pub stt_language: Option<String>,
    pub tts_voice: String,
    pub tts_speed: f32,
    pub parse_model: String,
    pub remote_parse_enabled: bool,
    pub remote_parse_timeout: Duration,
    /// Optional JSON file replacing parts of the built-in heuristic tables.
    pub heuristics_path: Option<PathBuf>,
    pub tie_break: TieBreak,
    pub duplicate_policy: DuplicatePolicy,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:3000"))?;
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;
        let allowed_origin = var_or("ALLOWED_ORIGIN", "http://localhost:8081");

        // --- Speech ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let sst_model = var_or("SST_MODEL", "whisper-1");
        let stt_sample_rate: u32 = parse_var("STT_SAMPLE_RATE", &var_or("STT_SAMPLE_RATE", "48000"))?;
        if stt_sample_rate == 0 {
            return Err(ConfigError::InvalidValue(
                "STT_SAMPLE_RATE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let stt_language = lookup("STT_LANGUAGE").filter(|l| !l.trim().is_empty());
        let tts_voice = var_or("TTS_VOICE", "nova");
        let tts_speed: f32 = parse_var("TTS_SPEED", &var_or("TTS_SPEED", "1.0"))?;
        if !(0.25..=4.0).contains(&tts_speed) {
            return Err(ConfigError::InvalidValue(
                "TTS_SPEED".to_string(),
                format!("{} is outside 0.25..=4.0", tts_speed),
            ));
        }

        // --- Care parsing ---
        let parse_model = var_or("PARSE_MODEL", "gpt-4o-mini");
        let remote_parse_enabled = parse_bool("REMOTE_PARSE_ENABLED", &var_or("REMOTE_PARSE_ENABLED", "true"))?;
        let timeout_ms: u64 =
            parse_var("REMOTE_PARSE_TIMEOUT_MS", &var_or("REMOTE_PARSE_TIMEOUT_MS", "4000"))?;
        let heuristics_path = lookup("HEURISTICS_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let tie_break = parse_policy("LOG_TIE_BREAK", &var_or("LOG_TIE_BREAK", "first"))?;
        let duplicate_policy = parse_policy("REMINDER_DUPLICATES", &var_or("REMINDER_DUPLICATES", "allow"))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
            openai_api_key,
            sst_model,
            stt_sample_rate,
            stt_language,
            tts_voice,
            tts_speed,
            parse_model,
            remote_parse_enabled,
            remote_parse_timeout: Duration::from_millis(timeout_ms),
            heuristics_path,
            tie_break,
            duplicate_policy,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

// The core policies report parse failures as `PortError`.
fn parse_policy<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = bloomie_core::PortError>,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", other),
        )),
    }
}
