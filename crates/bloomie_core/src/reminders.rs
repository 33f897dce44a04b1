//! crates/bloomie_core/src/reminders.rs
//!
//! Turns an overdue estimate into a notification request and hands it to the
//! notification scheduler. Scheduling is best effort: failures are logged and
//! swallowed, never returned to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{ActivityCategory, NotificationId, NotificationPayload, Nurture, ScheduleRequest};
use crate::intervals::{slack_hours, DueInfo};
use crate::ports::{NotificationScheduler, PortError};

/// Offset used for categories that are already overdue when detected.
pub const IMMEDIATE_OFFSET_SECS: u64 = 60;
/// A scheduled notification always fires at least this far in the future.
pub const MIN_OFFSET_SECS: u64 = 1;

/// What to do when the same (nurture, category) condition is emitted twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every emission schedules its own notification.
    #[default]
    Allow,
    /// Cancel the notification previously emitted for the same condition.
    ReplacePending,
}

impl FromStr for DuplicatePolicy {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(DuplicatePolicy::Allow),
            "replace" | "replace_pending" => Ok(DuplicatePolicy::ReplacePending),
            other => Err(PortError::InvalidInput(format!("unknown duplicate policy '{}'", other))),
        }
    }
}

/// Categories that only trigger once overdue get a short fixed delay;
/// the others are reminded ahead of time, at the due moment itself.
pub fn is_immediate(category: ActivityCategory) -> bool {
    slack_hours(category) <= 0.0
}

fn template(category: ActivityCategory) -> (&'static str, &'static str) {
    match category {
        ActivityCategory::Feeding => (
            "Feeding time for {name}",
            "It's been a while since {name} last ate. Time for a meal!",
        ),
        ActivityCategory::Watering => (
            "{name} will be thirsty soon",
            "{name} is due for watering. Don't forget to give it a drink.",
        ),
        ActivityCategory::Fertilizing => (
            "Fertilizer day for {name}",
            "{name} is due for fertilizer soon.",
        ),
        ActivityCategory::Walking => (
            "Walk time for {name}",
            "{name} hasn't been out for a walk in a while.",
        ),
        ActivityCategory::ParasiteTreatment => (
            "Parasite treatment for {name}",
            "{name}'s flea and tick treatment is coming up.",
        ),
        ActivityCategory::Diaper => (
            "Diaper check for {name}",
            "It's been a few hours since {name}'s last diaper change.",
        ),
        ActivityCategory::Medicine => (
            "Medicine for {name}",
            "{name} may be due for medicine.",
        ),
        ActivityCategory::Sunlight | ActivityCategory::Sleep | ActivityCategory::Other => (
            "Care reminder for {name}",
            "Take a moment to check in on {name}.",
        ),
    }
}

/// Builds the notification for an estimate, or `None` if it is not overdue.
pub fn plan_reminder(nurture: &Nurture, due: &DueInfo) -> Option<ScheduleRequest> {
    if !due.overdue {
        return None;
    }
    let (title, body) = template(due.category);
    let fire_in_seconds = if is_immediate(due.category) {
        IMMEDIATE_OFFSET_SECS
    } else {
        let seconds = (due.due_in_hours * 3600.0).ceil();
        if seconds.is_finite() && seconds > MIN_OFFSET_SECS as f64 {
            seconds as u64
        } else {
            MIN_OFFSET_SECS
        }
    };

    Some(ScheduleRequest {
        title: title.replace("{name}", &nurture.name),
        body: body.replace("{name}", &nurture.name),
        fire_in_seconds,
        payload: NotificationPayload {
            user_id: nurture.user_id,
            nurture_id: Some(nurture.id),
            action: Some(due.category),
        },
    })
}

/// A planned notification together with the scheduler's id, when scheduling
/// succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub request: ScheduleRequest,
    pub notification_id: Option<NotificationId>,
}

pub struct ReminderEmitter {
    scheduler: Arc<dyn NotificationScheduler>,
    policy: DuplicatePolicy,
    pending: Mutex<HashMap<(Uuid, ActivityCategory), NotificationId>>,
}

impl ReminderEmitter {
    pub fn new(scheduler: Arc<dyn NotificationScheduler>) -> Self {
        Self {
            scheduler,
            policy: DuplicatePolicy::default(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Plans and schedules a reminder for an overdue estimate.
    ///
    /// Returns `None` when nothing is due. A scheduling failure still returns
    /// the planned request, with no notification id.
    pub async fn emit(&self, nurture: &Nurture, due: &DueInfo) -> Option<Emission> {
        let request = plan_reminder(nurture, due)?;
        let key = (nurture.id, due.category);

        if self.policy == DuplicatePolicy::ReplacePending {
            let previous = self.pending.lock().await.remove(&key);
            if let Some(previous) = previous {
                if let Err(e) = self.scheduler.cancel(&previous).await {
                    warn!(notification_id = %previous, "Failed to cancel superseded reminder: {}", e);
                }
            }
        }

        let notification_id = match self.scheduler.schedule(&request).await {
            Ok(id) => {
                info!(
                    nurture_id = %nurture.id,
                    category = %due.category,
                    fire_in_seconds = request.fire_in_seconds,
                    "Scheduled care reminder"
                );
                Some(id)
            }
            Err(e) => {
                error!(
                    nurture_id = %nurture.id,
                    category = %due.category,
                    "Failed to schedule care reminder: {}", e
                );
                None
            }
        };

        if self.policy == DuplicatePolicy::ReplacePending {
            if let Some(id) = &notification_id {
                self.pending.lock().await.insert(key, id.clone());
            }
        }

        Some(Emission { request, notification_id })
    }
}
