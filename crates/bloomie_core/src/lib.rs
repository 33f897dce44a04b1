pub mod care;
pub mod classifier;
pub mod domain;
pub mod export;
pub mod fallback;
pub mod health;
pub mod intervals;
pub mod ports;
pub mod reminders;
pub mod text;
pub mod voice;

pub use care::{CareHeuristics, CareService, CommandOutcome, HeuristicsConfig, LoggedCare};
pub use domain::{
    ActivityCategory, Intent, LogEntry, LogExtras, NewLogEntry, NewReminder, Nurture, NurtureDraft,
    NurtureKind, NurtureMetadata, ParsedCommand, ParsedLog, Reminder, ScheduleRequest, User,
    UserCredentials,
};
pub use ports::{
    CareParsingService, DatabaseService, NotificationScheduler, PortError, PortResult,
    SpeechToTextService, TextToSpeechService, VoiceParams,
};
