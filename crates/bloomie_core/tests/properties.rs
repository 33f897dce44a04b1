mod common;

use bloomie_core::classifier::ActivityClassifier;
use bloomie_core::export::export_logs_csv;
use bloomie_core::intervals::IntervalEstimator;
use bloomie_core::reminders::ReminderEmitter;
use bloomie_core::voice::VoiceIntentParser;
use bloomie_core::{
    ActivityCategory, Intent, LogEntry, Nurture, NurtureKind, NurtureMetadata, ParsedLog,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::RecordingScheduler;
use std::sync::Arc;
use uuid::Uuid;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
}

fn nurture(name: &str, kind: NurtureKind, metadata: NurtureMetadata) -> Nurture {
    Nurture {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        kind,
        metadata,
        created_at: fixed_now() - Duration::days(365),
        updated_at: fixed_now() - Duration::days(365),
    }
}

fn log(nurture: &Nurture, text: &str, action: Option<&str>, at: DateTime<Utc>) -> LogEntry {
    LogEntry {
        id: Uuid::new_v4(),
        nurture_id: nurture.id,
        user_id: nurture.user_id,
        raw_input: text.to_string(),
        parsed: ParsedLog { action: action.map(str::to_string), ..Default::default() },
        mood: None,
        health_score: None,
        photo_uris: vec![],
        created_at: at,
    }
}

#[test]
fn every_keyword_alone_classifies_to_its_category() {
    let classifier = ActivityClassifier::default();
    for kind in NurtureKind::ALL {
        let pairs: Vec<(String, ActivityCategory)> =
            classifier.keywords_for(kind).map(|(k, c)| (k.to_string(), c)).collect();
        for (keyword, category) in &pairs {
            // Only texts that contain exactly one keyword of the table qualify.
            let others = pairs
                .iter()
                .filter(|(other, _)| other != keyword && keyword.contains(other.as_str()))
                .count();
            if others > 0 {
                continue;
            }
            let text = format!("today: {} done", keyword);
            assert_eq!(classifier.classify(&text, kind), *category, "keyword '{}' for {}", keyword, kind);
        }
    }
}

#[test]
fn empty_text_is_other_for_every_kind() {
    let classifier = ActivityClassifier::default();
    for kind in NurtureKind::ALL {
        assert_eq!(classifier.classify("", kind), ActivityCategory::Other);
    }
}

#[test]
fn no_logs_means_not_overdue_and_full_baseline() {
    let estimator = IntervalEstimator::default();
    let cases = [
        (nurture("Fern", NurtureKind::Plant, NurtureMetadata::default()), ActivityCategory::Watering),
        (nurture("Fern", NurtureKind::Plant, NurtureMetadata::default()), ActivityCategory::Fertilizing),
        (nurture("Rex", NurtureKind::Pet, NurtureMetadata::default()), ActivityCategory::Feeding),
        (nurture("Rex", NurtureKind::Pet, NurtureMetadata::default()), ActivityCategory::ParasiteTreatment),
        (nurture("Ada", NurtureKind::Baby, NurtureMetadata::default()), ActivityCategory::Feeding),
        (nurture("Ada", NurtureKind::Baby, NurtureMetadata::default()), ActivityCategory::Diaper),
    ];
    for (nurture, category) in cases {
        let due = estimator.estimate_due(&nurture, &[], category, fixed_now()).unwrap();
        assert!(!due.overdue, "{} {}", nurture.kind, category);
        assert_eq!(due.due_in_hours, due.baseline_hours);
        assert!(due.baseline_hours > 0.0);
    }
}

#[test]
fn watering_exactly_one_interval_ago_is_overdue() {
    let estimator = IntervalEstimator::default();
    let fern = nurture(
        "Fern",
        NurtureKind::Plant,
        NurtureMetadata { water_frequency: Some(7), ..Default::default() },
    );
    let logs = [log(&fern, "watered", None, fixed_now() - Duration::days(7))];
    let due = estimator.estimate_due(&fern, &logs, ActivityCategory::Watering, fixed_now()).unwrap();
    assert_eq!(due.baseline_hours, 168.0);
    assert!(due.due_in_hours <= 24.0);
    assert!(due.overdue);
}

#[test]
fn watering_within_slack_is_already_overdue() {
    let estimator = IntervalEstimator::default();
    let fern = nurture(
        "Fern",
        NurtureKind::Plant,
        NurtureMetadata { water_frequency: Some(7), ..Default::default() },
    );
    let logs = [log(&fern, "gave it water", Some("watering"), fixed_now() - Duration::hours(150))];
    let due = estimator.estimate_due(&fern, &logs, ActivityCategory::Watering, fixed_now()).unwrap();
    assert!((due.due_in_hours - 18.0).abs() < 1e-9);
    assert!(due.overdue);
}

#[test]
fn reminder_parse_matches_documented_example() {
    let parser = VoiceIntentParser::default();
    let max = nurture("Max", NurtureKind::Pet, NurtureMetadata::default());
    let cmd = parser.parse("Remind me to feed Max in two hours", &[max]);
    assert_eq!(cmd.intent, Intent::Reminder);
    assert_eq!(cmd.nurture_name.as_deref(), Some("Max"));
    assert_eq!(cmd.reminder_hours, Some(2.0));
    let action = cmd.action.to_lowercase();
    assert!(action.contains("feed"));
    assert!(!action.contains("max"));
    assert!(!action.contains("two hours"));
    assert!(!action.contains("remind"));
}

#[test]
fn question_parse_matches_documented_example() {
    let parser = VoiceIntentParser::default();
    assert_eq!(parser.parse("How often should I water my fern?", &[]).intent, Intent::Question);
}

#[test]
fn csv_export_has_header_plus_one_line_per_log_and_round_trips() {
    let fern = nurture("Fern, the Boston", NurtureKind::Plant, NurtureMetadata::default());
    let rex = nurture("Rex \"the dog\"", NurtureKind::Pet, NurtureMetadata::default());
    let logs = vec![
        log(&fern, "watered, 200ml", Some("watering"), fixed_now()),
        log(&rex, "walk in the park", Some("walk"), fixed_now() - Duration::hours(2)),
        log(&rex, "fed \"premium\" kibble", Some("feeding"), fixed_now() - Duration::hours(3)),
    ];

    let csv = export_logs_csv(&[fern.clone(), rex.clone()], &logs).unwrap();
    assert_eq!(csv.lines().count(), logs.len() + 1);

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), logs.len());
    let expected = [(&fern.name, "watering"), (&rex.name, "walk"), (&rex.name, "feeding")];
    for (row, (name, action)) in rows.iter().zip(expected) {
        assert_eq!(&row[1], name.as_str());
        assert_eq!(&row[3], action);
    }
}

#[tokio::test]
async fn emitting_twice_schedules_twice() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let emitter = ReminderEmitter::new(scheduler.clone());
    let estimator = IntervalEstimator::default();
    let rex = nurture("Rex", NurtureKind::Pet, NurtureMetadata::default());
    let logs = [log(&rex, "fed", None, fixed_now() - Duration::hours(12))];
    let due = estimator.estimate_due(&rex, &logs, ActivityCategory::Feeding, fixed_now()).unwrap();

    let first = emitter.emit(&rex, &due).await.unwrap();
    let second = emitter.emit(&rex, &due).await.unwrap();

    assert_eq!(first.request, second.request);
    assert_ne!(first.notification_id, second.notification_id);
    assert_eq!(scheduler.scheduled().len(), 2);
}
