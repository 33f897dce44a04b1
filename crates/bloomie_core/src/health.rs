//! crates/bloomie_core/src/health.rs
//!
//! Health tracking over a nurture's logs: mood and 1-5 health scores.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTrend {
    Improving,
    Steady,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    pub entries: usize,
    pub scored_entries: usize,
    pub average_score: Option<f64>,
    pub latest_score: Option<u8>,
    pub latest_mood: Option<String>,
    /// Compares the oldest and newest score in the window; needs two scores.
    pub trend: Option<HealthTrend>,
}

/// Summarizes the logs created at or after `since`. Input order does not matter.
pub fn summarize_health(logs: &[LogEntry], since: DateTime<Utc>) -> HealthSummary {
    let mut window: Vec<&LogEntry> = logs.iter().filter(|l| l.created_at >= since).collect();
    window.sort_by_key(|l| l.created_at);

    let scores: Vec<u8> = window.iter().filter_map(|l| l.health_score).collect();
    let average_score = (!scores.is_empty())
        .then(|| scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64);

    let trend = match (scores.first(), scores.last()) {
        (Some(first), Some(last)) if scores.len() >= 2 => Some(match last.cmp(first) {
            std::cmp::Ordering::Greater => HealthTrend::Improving,
            std::cmp::Ordering::Equal => HealthTrend::Steady,
            std::cmp::Ordering::Less => HealthTrend::Declining,
        }),
        _ => None,
    };

    HealthSummary {
        entries: window.len(),
        scored_entries: scores.len(),
        average_score,
        latest_score: scores.last().copied(),
        latest_mood: window.iter().rev().find_map(|l| l.mood.clone()),
        trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParsedLog;
    use chrono::Duration;
    use uuid::Uuid;

    fn entry(days_ago: i64, score: Option<u8>, mood: Option<&str>) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            nurture_id: Uuid::nil(),
            user_id: Uuid::nil(),
            raw_input: "check-up".to_string(),
            parsed: ParsedLog::default(),
            mood: mood.map(str::to_string),
            health_score: score,
            photo_uris: vec![],
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn summary_over_window() {
        let logs = vec![
            entry(1, Some(4), None),
            entry(40, Some(1), Some("sick")),
            entry(5, Some(2), Some("tired")),
            entry(3, None, Some("happy")),
        ];
        let summary = summarize_health(&logs, Utc::now() - Duration::days(30));
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.scored_entries, 2);
        assert_eq!(summary.average_score, Some(3.0));
        assert_eq!(summary.latest_score, Some(4));
        assert_eq!(summary.latest_mood.as_deref(), Some("happy"));
        assert_eq!(summary.trend, Some(HealthTrend::Improving));
    }

    #[test]
    fn empty_window_has_no_scores() {
        let summary = summarize_health(&[], Utc::now());
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.average_score, None);
        assert_eq!(summary.trend, None);
    }
}
