//! crates/bloomie_core/src/voice.rs
//!
//! Local, keyword-driven reading of voice transcripts. This is the fallback
//! behind the remote AI parser; each call is independent and pure.

use serde::{Deserialize, Serialize};

use crate::domain::{Intent, Nurture, ParsedCommand, MAX_REMINDER_HOURS};
use crate::text::{contains_phrase, strip_phrase, Boundary};

/// A spoken duration and the number of hours it stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPhrase {
    pub phrase: String,
    pub hours: f64,
}

/// Keyword sets and phrase tables the parser runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLexicon {
    pub reminder_keywords: Vec<String>,
    pub question_keywords: Vec<String>,
    pub photo_keywords: Vec<String>,
    /// Checked in order; the first phrase found decides the duration.
    pub durations: Vec<DurationPhrase>,
    /// Removed as whole words from the action text.
    pub fillers: Vec<String>,
    pub default_reminder_hours: f64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// Phrases match as whole words. Longer phrases still go first where one
// ends another: "half an hour" must win over "an hour".
const BUILTIN_DURATIONS: &[(&str, f64)] = &[
    ("half an hour", 0.5),
    ("yarım saat", 0.5),
    ("30 minutes", 0.5),
    ("thirty minutes", 0.5),
    ("15 minutes", 0.25),
    ("fifteen minutes", 0.25),
    ("45 minutes", 0.75),
    ("24 hours", 24.0),
    ("twenty four hours", 24.0),
    ("12 hours", 12.0),
    ("twelve hours", 12.0),
    ("8 hours", 8.0),
    ("eight hours", 8.0),
    ("two hours", 2.0),
    ("2 hours", 2.0),
    ("three hours", 3.0),
    ("3 hours", 3.0),
    ("four hours", 4.0),
    ("4 hours", 4.0),
    ("five hours", 5.0),
    ("5 hours", 5.0),
    ("six hours", 6.0),
    ("6 hours", 6.0),
    ("an hour", 1.0),
    ("one hour", 1.0),
    ("1 hour", 1.0),
    ("bir saat", 1.0),
    ("iki saat", 2.0),
    ("üç saat", 3.0),
    ("dört saat", 4.0),
    ("beş saat", 5.0),
    ("altı saat", 6.0),
    ("tomorrow", 24.0),
    ("yarın", 24.0),
    ("next week", 168.0),
    ("gelecek hafta", 168.0),
];

impl VoiceLexicon {
    pub fn builtin() -> Self {
        Self {
            reminder_keywords: strings(&["remind", "don't let me forget", "hatırlat", "unutma"]),
            question_keywords: strings(&[
                "how", "what", "why", "when", "should", "?", "nasıl", "neden", "ne zaman", "ne kadar",
            ]),
            photo_keywords: strings(&["photo", "picture", "selfie", "fotoğraf", "resim"]),
            durations: BUILTIN_DURATIONS
                .iter()
                .map(|(phrase, hours)| DurationPhrase { phrase: phrase.to_string(), hours: *hours })
                .collect(),
            fillers: strings(&["remind me", "please", "later", "to", "about", "in", "lütfen", "sonra"]),
            default_reminder_hours: 1.0,
        }
    }
}

impl Default for VoiceLexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoiceIntentParser {
    lexicon: VoiceLexicon,
}

impl VoiceIntentParser {
    pub fn new(lexicon: VoiceLexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &VoiceLexicon {
        &self.lexicon
    }

    pub fn parse(&self, transcript: &str, nurtures: &[Nurture]) -> ParsedCommand {
        let lowered = transcript.to_lowercase();
        let nurture = match_nurture(&lowered, nurtures);
        let intent = self.classify_intent(&lowered);
        let reminder_hours = (intent == Intent::Reminder).then(|| self.reminder_hours(&lowered));
        let question = (intent == Intent::Question).then(|| transcript.trim().to_string());

        ParsedCommand {
            intent,
            nurture_name: nurture.map(|n| n.name.clone()),
            nurture_id: nurture.map(|n| n.id),
            action: self.extract_action(transcript, nurture),
            reminder_hours,
            question,
        }
    }

    /// Priority order is reminder, question, photo; anything else is a log.
    pub fn classify_intent(&self, lowered: &str) -> Intent {
        let has_any = |keywords: &[String]| {
            keywords.iter().any(|k| contains_phrase(lowered, k, Boundary::WordStart))
        };
        if has_any(&self.lexicon.reminder_keywords) {
            Intent::Reminder
        } else if has_any(&self.lexicon.question_keywords) {
            Intent::Question
        } else if has_any(&self.lexicon.photo_keywords) {
            Intent::Photo
        } else {
            Intent::Log
        }
    }

    /// Table phrases first, then a plain "<number> <unit>" such as
    /// "36 hours" or "3 saat". Delays beyond a year are ignored.
    pub fn reminder_hours(&self, lowered: &str) -> f64 {
        self.lexicon
            .durations
            .iter()
            .find(|d| contains_phrase(lowered, &d.phrase, Boundary::WholeWord))
            .map(|d| d.hours)
            .or_else(|| numeric_duration(lowered))
            .filter(|hours| hours.is_finite() && *hours > 0.0 && *hours <= MAX_REMINDER_HOURS)
            .unwrap_or(self.lexicon.default_reminder_hours)
    }

    /// Strips the nurture name, every duration phrase (matched or not) and
    /// the filler words; falls back to the full transcript if nothing is left.
    fn extract_action(&self, transcript: &str, nurture: Option<&Nurture>) -> String {
        let mut text = transcript.to_string();
        if let Some(nurture) = nurture {
            text = strip_phrase(&text, &nurture.name, Boundary::Anywhere);
        }
        for duration in &self.lexicon.durations {
            text = strip_phrase(&text, &duration.phrase, Boundary::WholeWord);
        }
        text = strip_numeric_durations(&text);
        for filler in &self.lexicon.fillers {
            text = strip_phrase(&text, filler, Boundary::WholeWord);
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let action = collapsed.trim_end_matches(',').trim_end();
        if action.is_empty() {
            transcript.to_string()
        } else {
            action.to_string()
        }
    }
}

/// First nurture (in caller order) whose name occurs in the transcript.
fn match_nurture<'a>(lowered: &str, nurtures: &'a [Nurture]) -> Option<&'a Nurture> {
    nurtures.iter().find(|n| {
        let name = n.name.trim().to_lowercase();
        !name.is_empty() && lowered.contains(&name)
    })
}

const HOUR_UNITS: &[&str] = &["hour", "hours", "hr", "hrs", "saat"];
const MINUTE_UNITS: &[&str] = &["minute", "minutes", "min", "mins", "dakika"];
const DAY_UNITS: &[&str] = &["day", "days", "gün"];

/// Hours for a "<number> <unit>" word pair, if it is one.
fn pair_hours(number: &str, unit: &str) -> Option<f64> {
    if !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = number.parse().ok()?;
    let unit = unit.trim_end_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
    if HOUR_UNITS.contains(&unit.as_str()) {
        Some(value)
    } else if MINUTE_UNITS.contains(&unit.as_str()) {
        Some(value / 60.0)
    } else if DAY_UNITS.contains(&unit.as_str()) {
        Some(value * 24.0)
    } else {
        None
    }
}

/// First "<number> <unit>" pair in the text, in hours.
fn numeric_duration(text: &str) -> Option<f64> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.windows(2).find_map(|pair| pair_hours(pair[0], pair[1]))
}

/// Drops every "<number> <unit>" pair, keeping punctuation trailing the unit.
fn strip_numeric_durations(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut kept = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if let Some(unit) = words.get(i + 1).filter(|unit| pair_hours(words[i], unit).is_some()) {
            let trailing = unit.trim_start_matches(|c: char| c.is_alphanumeric());
            if !trailing.is_empty() {
                kept.push(trailing);
            }
            i += 2;
            continue;
        }
        kept.push(words[i]);
        i += 1;
    }
    kept.join(" ")
}
