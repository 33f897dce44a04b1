//! services/api/src/adapters/care_llm.rs
//!
//! The remote AI parser. Implements `CareParsingService` with OpenAI chat
//! completions: free-text logs and voice transcripts come back as small JSON
//! objects, questions as plain text. Anything that does not parse is an
//! error, and the core fallback then uses the local heuristics.

const LOG_INSTRUCTIONS: &str = r#"You turn short care notes about a baby, pet or plant into JSON.
The note may be in English or Turkish.

Reply with ONE JSON object and nothing else:
{"action": string|null, "subject": string|null, "amount": string|null, "notes": string|null}

- action: the care activity, lowercase, e.g. "feeding", "watering", "walking", "diaper", "medicine", "sleep".
- subject: who or what was cared for.
- amount: quantity with unit if mentioned ("120 ml", "2 cups").
- notes: anything else worth keeping, otherwise null."#;

const COMMAND_INSTRUCTIONS: &str = r#"You read one spoken command from a parent, pet owner or plant owner.
The transcript may be in English or Turkish.

Reply with ONE JSON object and nothing else:
{"intent": "log"|"reminder"|"question"|"photo"|"unknown",
 "nurture_name": string|null,
 "action": string,
 "reminder_hours": number|null,
 "question": string|null}

- intent: "reminder" when they ask to be reminded later, "question" when they ask something,
  "photo" when they want to take a picture, "log" when they report something they did.
- nurture_name: must be one of KNOWN NAMES exactly, or null.
- action: the care activity in a few words, without the name or the time phrase.
- reminder_hours: hours from now for reminders (30 minutes = 0.5), otherwise null.
- question: the question text for questions, otherwise null."#;

const QUESTION_INSTRUCTIONS: &str = r#"You are Bloomie, a warm and practical care assistant for babies, pets and plants.
Answer in the language of the question, in two to four short sentences that sound natural when read aloud.
Give concrete, safe guidance. For anything that sounds like a medical emergency, tell them to contact a doctor or vet right away."#;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use bloomie_core::domain::{Intent, Nurture, ParsedCommand, ParsedLog};
use bloomie_core::ports::{CareParsingService, PortError, PortResult};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

//=========================================================================================
// Wire formats of the model replies
//=========================================================================================

#[derive(Debug, Deserialize)]
struct RemoteLog {
    action: Option<String>,
    subject: Option<String>,
    amount: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteCommand {
    intent: Intent,
    nurture_name: Option<String>,
    #[serde(default)]
    action: String,
    reminder_hours: Option<f64>,
    question: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct OpenAiCareParser {
    client: Client<OpenAIConfig>,
    model: String,
    fenced: Regex,
}

impl OpenAiCareParser {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Result<Self, regex::Error> {
        Ok(Self {
            client,
            model,
            fenced: Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")?,
        })
    }

    /// Pulls the JSON object out of a reply, tolerating code fences and chatter.
    fn extract_json<'a>(&self, reply: &'a str) -> Option<&'a str> {
        if let Some(inner) = self.fenced.captures(reply).and_then(|c| c.get(1)) {
            return Some(inner.as_str());
        }
        let start = reply.find('{')?;
        let end = reply.rfind('}')?;
        (start < end).then(|| &reply[start..=end])
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, reply: &str) -> PortResult<T> {
        let json = self
            .extract_json(reply)
            .ok_or_else(|| PortError::Unexpected("Model reply contained no JSON object".to_string()))?;
        serde_json::from_str(json).map_err(|e| PortError::Unexpected(format!("Invalid model JSON: {}", e)))
    }

    fn decode_log(&self, reply: &str) -> PortResult<ParsedLog> {
        let remote: RemoteLog = self.decode(reply)?;
        Ok(ParsedLog {
            action: non_empty(remote.action).map(|a| a.to_lowercase()),
            subject: non_empty(remote.subject),
            amount: non_empty(remote.amount),
            notes: non_empty(remote.notes),
        })
    }

    /// Id resolution and sanity checks happen in the core fallback.
    fn decode_command(&self, reply: &str) -> PortResult<ParsedCommand> {
        let remote: RemoteCommand = self.decode(reply)?;
        Ok(ParsedCommand {
            intent: remote.intent,
            nurture_name: non_empty(remote.nurture_name),
            nurture_id: None,
            action: remote.action.trim().to_string(),
            reminder_hours: remote.reminder_hours,
            question: non_empty(remote.question),
        })
    }

    async fn complete(&self, system: &str, user: String, max_tokens: u32) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(max_tokens)
            .temperature(0.2)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("Empty completion".to_string()))?;
        debug!(model = %self.model, "Remote parser replied: {}", content);
        Ok(content)
    }
}

/// One-line description of a nurture for prompts.
fn describe(nurture: &Nurture) -> String {
    let mut parts = vec![format!("{} ({})", nurture.name, nurture.kind)];
    if let Some(species) = &nurture.metadata.species {
        parts.push(format!("species: {}", species));
    }
    if let Some(breed) = &nurture.metadata.breed {
        parts.push(format!("breed: {}", breed));
    }
    if let Some(birth) = nurture.metadata.birth_date {
        let days = (Utc::now().date_naive() - birth).num_days();
        parts.push(format!("age: {} days", days.max(0)));
    }
    parts.join(", ")
}

//=========================================================================================
// `CareParsingService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CareParsingService for OpenAiCareParser {
    async fn parse_log(&self, text: &str, nurture: &Nurture) -> PortResult<ParsedLog> {
        let user = format!("NURTURE: {}\nNOTE: {}", describe(nurture), text);
        let reply = self.complete(LOG_INSTRUCTIONS, user, 200).await?;
        self.decode_log(&reply)
    }

    async fn parse_voice_command(&self, transcript: &str, nurtures: &[Nurture]) -> PortResult<ParsedCommand> {
        let names: Vec<&str> = nurtures.iter().map(|n| n.name.as_str()).collect();
        let user = format!("KNOWN NAMES: {}\nTRANSCRIPT: {}", names.join(", "), transcript);
        let reply = self.complete(COMMAND_INSTRUCTIONS, user, 200).await?;
        self.decode_command(&reply)
    }

    async fn answer_question(&self, question: &str, nurture: Option<&Nurture>) -> PortResult<String> {
        let user = match nurture {
            Some(n) => format!("ABOUT: {}\nQUESTION: {}", describe(n), question),
            None => format!("QUESTION: {}", question),
        };
        let answer = self.complete(QUESTION_INSTRUCTIONS, user, 400).await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> OpenAiCareParser {
        let client = Client::with_config(OpenAIConfig::new().with_api_key("test-key"));
        OpenAiCareParser::new(client, "gpt-4o-mini".to_string()).unwrap()
    }

    #[test]
    fn fenced_command_reply_is_decoded() {
        let reply = "Sure!\n```json\n{\"intent\": \"reminder\", \"nurture_name\": \"Max\", \
                     \"action\": \"feed\", \"reminder_hours\": 2, \"question\": null}\n```";
        let command = parser().decode_command(reply).unwrap();
        assert_eq!(command.intent, Intent::Reminder);
        assert_eq!(command.nurture_name.as_deref(), Some("Max"));
        assert_eq!(command.reminder_hours, Some(2.0));
        assert_eq!(command.nurture_id, None);
    }

    #[test]
    fn bare_log_reply_is_normalized() {
        let reply = r#"{"action": " Watering ", "subject": "Fern", "amount": "", "notes": null}"#;
        let log = parser().decode_log(reply).unwrap();
        assert_eq!(log.action.as_deref(), Some("watering"));
        assert_eq!(log.subject.as_deref(), Some("Fern"));
        assert_eq!(log.amount, None);
    }

    #[test]
    fn replies_without_json_are_errors() {
        assert!(matches!(
            parser().decode_command("I am not sure what you mean."),
            Err(PortError::Unexpected(_))
        ));
        assert!(parser().decode_command(r#"{"intent": "dance"}"#).is_err());
    }
}
