pub mod care_llm;
pub mod db;
pub mod notifications;
pub mod sst;
pub mod tts;

pub use care_llm::OpenAiCareParser;
pub use db::DbAdapter;
pub use notifications::{FiredNotification, TokioNotificationScheduler};
pub use sst::OpenAiSstAdapter;
pub use tts::OpenAiTtsAdapter;
