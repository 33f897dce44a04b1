//! crates/bloomie_core/src/fallback.rs
//!
//! Two-stage parsing: try the remote AI parser under a bounded timeout, and on
//! any failure (timeout, transport error, invalid response) fall back to the
//! local heuristics. Results carry their source so callers can show lower
//! confidence for degraded answers.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::care::CareHeuristics;
use crate::domain::{ActivityCategory, Intent, Nurture, ParsedCommand, ParsedLog, MAX_REMINDER_HOURS};
use crate::ports::{CareParsingService, PortError, PortResult};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(4);

const OFFLINE_ANSWER: &str =
    "I can't reach the care assistant right now. Please try asking again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    Remote,
    /// Produced by the local heuristics after the remote path failed.
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ParseSource,
}

impl<T> Resolved<T> {
    fn remote(value: T) -> Self {
        Self { value, source: ParseSource::Remote }
    }

    fn local(value: T) -> Self {
        Self { value, source: ParseSource::Local }
    }

    pub fn is_degraded(&self) -> bool {
        self.source == ParseSource::Local
    }
}

pub struct ResilientParser {
    remote: Option<Arc<dyn CareParsingService>>,
    heuristics: Arc<CareHeuristics>,
    timeout: Duration,
}

impl ResilientParser {
    /// `remote = None` runs purely on the local heuristics.
    pub fn new(
        remote: Option<Arc<dyn CareParsingService>>,
        heuristics: Arc<CareHeuristics>,
        timeout: Duration,
    ) -> Self {
        Self { remote, heuristics, timeout }
    }

    pub fn heuristics(&self) -> &CareHeuristics {
        &self.heuristics
    }

    /// Runs a remote call under the configured timeout.
    async fn call_remote<T, F>(&self, call: F) -> PortResult<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(PortError::Timeout(self.timeout.as_millis())))
    }

    async fn attempt<T, F>(&self, operation: &'static str, call: F) -> Option<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        match self.call_remote(call).await {
            Ok(value) => Some(value),
            Err(PortError::Timeout(ms)) => {
                warn!(operation, timeout_ms = ms as u64, "Remote parse timed out, using local heuristics");
                None
            }
            Err(e) => {
                warn!(operation, "Remote parse failed, using local heuristics: {}", e);
                None
            }
        }
    }

    pub async fn parse_voice_command(&self, transcript: &str, nurtures: &[Nurture]) -> Resolved<ParsedCommand> {
        if let Some(remote) = &self.remote {
            let call = remote.parse_voice_command(transcript, nurtures);
            if let Some(command) = self.attempt("parse_voice_command", call).await {
                match reconcile_remote_command(command, transcript, nurtures) {
                    Ok(command) => return Resolved::remote(command),
                    Err(e) => warn!("Discarding remote voice parse: {}", e),
                }
            }
        }
        debug!("Parsing voice command locally");
        Resolved::local(self.heuristics.voice().parse(transcript, nurtures))
    }

    pub async fn parse_log(&self, text: &str, nurture: &Nurture) -> Resolved<ParsedLog> {
        if let Some(remote) = &self.remote {
            if let Some(parsed) = self.attempt("parse_log", remote.parse_log(text, nurture)).await {
                return Resolved::remote(parsed);
            }
        }
        Resolved::local(self.local_log(text, nurture))
    }

    pub async fn answer_question(&self, question: &str, nurture: Option<&Nurture>) -> Resolved<String> {
        if let Some(remote) = &self.remote {
            let call = remote.answer_question(question, nurture);
            if let Some(answer) = self.attempt("answer_question", call).await {
                if !answer.trim().is_empty() {
                    return Resolved::remote(answer.trim().to_string());
                }
            }
        }
        Resolved::local(OFFLINE_ANSWER.to_string())
    }

    fn local_log(&self, text: &str, nurture: &Nurture) -> ParsedLog {
        let category = self.heuristics.classifier().classify(text, nurture.kind);
        ParsedLog {
            action: (category != ActivityCategory::Other).then(|| category.label().to_string()),
            subject: Some(nurture.name.clone()),
            amount: None,
            notes: (!text.trim().is_empty()).then(|| text.trim().to_string()),
        }
    }
}

/// Checks a remote voice parse against what we know locally. Names are
/// resolved to ids of known nurtures; unknown names are dropped.
fn reconcile_remote_command(
    mut command: ParsedCommand,
    transcript: &str,
    nurtures: &[Nurture],
) -> PortResult<ParsedCommand> {
    if command.intent == Intent::Reminder {
        match command.reminder_hours {
            Some(hours) if hours.is_finite() && hours > 0.0 && hours <= MAX_REMINDER_HOURS => {}
            other => {
                return Err(PortError::InvalidInput(format!(
                    "reminder without a usable duration: {:?}",
                    other
                )))
            }
        }
    } else {
        command.reminder_hours = None;
    }

    let by_id = command
        .nurture_id
        .and_then(|id| nurtures.iter().find(|n| n.id == id));
    let by_name = command.nurture_name.as_deref().and_then(|name| {
        let wanted = name.trim().to_lowercase();
        nurtures.iter().find(|n| n.name.trim().to_lowercase() == wanted)
    });
    match by_id.or(by_name) {
        Some(nurture) => {
            command.nurture_id = Some(nurture.id);
            command.nurture_name = Some(nurture.name.clone());
        }
        None => {
            command.nurture_id = None;
            command.nurture_name = None;
        }
    }

    if command.action.trim().is_empty() {
        command.action = transcript.to_string();
    }
    if command.intent == Intent::Question && command.question.is_none() {
        command.question = Some(transcript.trim().to_string());
    }
    Ok(command)
}
