mod common;

use bloomie_core::fallback::{ParseSource, ResilientParser, DEFAULT_REMOTE_TIMEOUT};
use bloomie_core::reminders::{DuplicatePolicy, ReminderEmitter};
use bloomie_core::{
    ActivityCategory, CareHeuristics, CareService, CommandOutcome, DatabaseService, Intent,
    LogExtras, NewReminder, NurtureDraft, NurtureKind, NurtureMetadata, ParsedCommand, PortError,
};
use chrono::{Duration, Utc};
use common::{InMemoryStore, RecordingScheduler};
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    store: Arc<InMemoryStore>,
    scheduler: Arc<RecordingScheduler>,
    care: CareService,
}

fn harness_with(scheduler: RecordingScheduler, policy: DuplicatePolicy) -> Harness {
    let store = Arc::new(InMemoryStore::default());
    let scheduler = Arc::new(scheduler);
    let parser = Arc::new(ResilientParser::new(
        None,
        Arc::new(CareHeuristics::builtin()),
        DEFAULT_REMOTE_TIMEOUT,
    ));
    let emitter = ReminderEmitter::new(scheduler.clone()).with_policy(policy);
    let care = CareService::new(store.clone(), scheduler.clone(), parser, emitter);
    Harness { store, scheduler, care }
}

fn harness() -> Harness {
    harness_with(RecordingScheduler::default(), DuplicatePolicy::Allow)
}

fn draft(name: &str, kind: NurtureKind, species: Option<&str>) -> NurtureDraft {
    NurtureDraft {
        name: name.to_string(),
        kind,
        metadata: NurtureMetadata { species: species.map(str::to_string), ..Default::default() },
    }
}

#[tokio::test]
async fn stale_feeding_log_produces_a_smart_reminder() {
    let h = harness();
    let user = Uuid::new_v4();
    let rex = h.store.create_nurture(user, &draft("Rex", NurtureKind::Pet, None)).await.unwrap();
    h.store.seed_log(&rex, "fed kibble", Utc::now() - Duration::hours(11));
    h.store.seed_log(&rex, "flea drops", Utc::now() - Duration::days(2));

    let reminders = h.care.check_nurture(&rex, Utc::now()).await.unwrap();

    assert_eq!(reminders.len(), 1);
    let reminder = &reminders[0];
    assert!(reminder.is_ai_generated);
    assert!(!reminder.is_completed);
    assert_eq!(reminder.nurture_id, Some(rex.id));
    assert!(reminder.title.contains("Rex"));
    assert_eq!(reminder.notification_id.as_deref(), Some("notif-1"));

    let scheduled = h.scheduler.scheduled();
    assert_eq!(scheduled[0].payload.action, Some(ActivityCategory::Feeding));
    assert_eq!(scheduled[0].fire_in_seconds, 60);
}

#[tokio::test]
async fn recording_a_log_runs_the_reminder_check() {
    let h = harness();
    let user = Uuid::new_v4();
    let fern = h.store.create_nurture(user, &draft("Fern", NurtureKind::Plant, Some("fern"))).await.unwrap();
    // Fern waters every 3 days; last watered 2.5 days ago, so due within the 24h slack.
    h.store.seed_log(&fern, "watered", Utc::now() - Duration::hours(60));

    let logged = h
        .care
        .record_log(
            user,
            &fern,
            "Repotted into a bigger pot",
            LogExtras { health_score: Some(4), ..Default::default() },
            Utc::now(),
        )
        .await
        .unwrap();

    assert_eq!(logged.source, ParseSource::Local);
    assert_eq!(logged.log.health_score, Some(4));
    assert_eq!(logged.log.parsed.subject.as_deref(), Some("Fern"));
    assert_eq!(logged.reminders.len(), 1);
    let fire = h.scheduler.scheduled()[0].fire_in_seconds;
    assert!(fire > 11 * 3600 && fire <= 12 * 3600, "fire_in_seconds = {}", fire);
}

#[tokio::test]
async fn logs_for_someone_elses_nurture_are_rejected() {
    let h = harness();
    let owner = Uuid::new_v4();
    let fern = h.store.create_nurture(owner, &draft("Fern", NurtureKind::Plant, None)).await.unwrap();
    let result = h
        .care
        .record_log(Uuid::new_v4(), &fern, "watered", LogExtras::default(), Utc::now())
        .await;
    assert!(matches!(result, Err(PortError::Unauthorized)));
}

#[tokio::test]
async fn scheduler_failure_still_stores_the_reminder() {
    let h = harness_with(RecordingScheduler::failing(), DuplicatePolicy::Allow);
    let user = Uuid::new_v4();
    let ada = h.store.create_nurture(user, &draft("Ada", NurtureKind::Baby, None)).await.unwrap();
    h.store.seed_log(&ada, "changed diaper", Utc::now() - Duration::hours(4));
    h.store.seed_log(&ada, "bottle 90ml", Utc::now() - Duration::hours(1));

    let reminders = h.care.check_nurture(&ada, Utc::now()).await.unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].notification_id, None);
}

#[tokio::test]
async fn repeated_checks_duplicate_unless_replace_policy() {
    let user = Uuid::new_v4();

    let allow = harness();
    let rex = allow.store.create_nurture(user, &draft("Rex", NurtureKind::Pet, None)).await.unwrap();
    allow.store.seed_log(&rex, "fed", Utc::now() - Duration::hours(20));
    allow.care.check_nurture(&rex, Utc::now()).await.unwrap();
    allow.care.check_nurture(&rex, Utc::now()).await.unwrap();
    assert_eq!(allow.store.reminder_count(), 2);
    assert!(allow.scheduler.cancelled.lock().unwrap().is_empty());

    let replace = harness_with(RecordingScheduler::default(), DuplicatePolicy::ReplacePending);
    let rex = replace.store.create_nurture(user, &draft("Rex", NurtureKind::Pet, None)).await.unwrap();
    replace.store.seed_log(&rex, "fed", Utc::now() - Duration::hours(20));
    replace.care.check_nurture(&rex, Utc::now()).await.unwrap();
    replace.care.check_nurture(&rex, Utc::now()).await.unwrap();
    assert_eq!(*replace.scheduler.cancelled.lock().unwrap(), vec!["notif-1".to_string()]);
}

#[tokio::test]
async fn voice_reminder_command_schedules_in_the_future() {
    let h = harness();
    let user = Uuid::new_v4();
    let max = h.store.create_nurture(user, &draft("Max", NurtureKind::Pet, Some("dog"))).await.unwrap();
    let transcript = "Remind me to feed Max in two hours";
    let now = Utc::now();

    let resolved = h.care.parser().parse_voice_command(transcript, &[max.clone()]).await;
    assert_eq!(resolved.value.intent, Intent::Reminder);
    let outcome = h.care.execute_command(user, &resolved.value, transcript, now).await.unwrap();

    match outcome {
        CommandOutcome::ReminderSet(reminder) => {
            assert_eq!(reminder.nurture_id, Some(max.id));
            assert_eq!(reminder.scheduled_at, now + Duration::hours(2));
            assert_eq!(reminder.title, "Max: feed");
            assert!(!reminder.is_ai_generated);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(h.scheduler.scheduled()[0].fire_in_seconds, 7200);
}

#[tokio::test]
async fn reminder_command_with_an_absurd_delay_is_rejected() {
    let h = harness();
    let user = Uuid::new_v4();
    let command = ParsedCommand {
        intent: Intent::Reminder,
        nurture_name: None,
        nurture_id: None,
        action: "feed".to_string(),
        reminder_hours: Some(1e12),
        question: None,
    };
    let result = h.care.execute_command(user, &command, "remind me to feed", Utc::now()).await;
    assert!(matches!(result, Err(PortError::InvalidInput(_))));
    assert!(h.scheduler.scheduled().is_empty());
}

#[tokio::test]
async fn voice_log_without_nurture_asks_for_one() {
    let h = harness();
    let user = Uuid::new_v4();
    let resolved = h.care.parser().parse_voice_command("fed the cat", &[]).await;
    let outcome = h.care.execute_command(user, &resolved.value, "fed the cat", Utc::now()).await.unwrap();
    assert!(matches!(outcome, CommandOutcome::NeedsNurture { .. }));
}

#[tokio::test]
async fn voice_question_degrades_to_offline_answer() {
    let h = harness();
    let user = Uuid::new_v4();
    let transcript = "How often should I water my fern?";
    let resolved = h.care.parser().parse_voice_command(transcript, &[]).await;
    let outcome = h.care.execute_command(user, &resolved.value, transcript, Utc::now()).await.unwrap();
    match outcome {
        CommandOutcome::Answered { source, .. } => assert_eq!(source, ParseSource::Local),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn past_reminders_are_rejected_and_completion_cancels_notification() {
    let h = harness();
    let user = Uuid::new_v4();
    let now = Utc::now();
    let mut reminder = NewReminder {
        user_id: user,
        nurture_id: None,
        title: "Vet appointment".to_string(),
        description: None,
        scheduled_at: now - Duration::minutes(1),
        repeat: None,
        repeat_interval: None,
        is_ai_generated: false,
        notification_id: None,
    };
    assert!(matches!(
        h.care.schedule_reminder(reminder.clone(), now).await,
        Err(PortError::InvalidInput(_))
    ));

    reminder.scheduled_at = now + Duration::days(1);
    let stored = h.care.schedule_reminder(reminder, now).await.unwrap();
    let completed = h.care.complete_reminder(user, stored.id).await.unwrap();
    assert!(completed.is_completed);
    assert_eq!(*h.scheduler.cancelled.lock().unwrap(), vec!["notif-1".to_string()]);
    assert!(h.store.list_reminders(user, false).await.unwrap().is_empty());
}
