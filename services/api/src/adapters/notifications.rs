//! services/api/src/adapters/notifications.rs
//!
//! In-process implementation of the `NotificationScheduler` port. Each
//! scheduled notification is one tokio task sleeping until its fire time;
//! cancelling trips its `CancellationToken`. Fired notifications go out on a
//! broadcast channel that the WebSocket handler forwards to the owner's open
//! connections. Delivery is best effort: with nobody listening the
//! notification is dropped.

use async_trait::async_trait;
use bloomie_core::domain::{NotificationId, NotificationPayload, ScheduleRequest};
use bloomie_core::ports::{NotificationScheduler, PortResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// A notification whose time has come.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredNotification {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
    pub fired_at: DateTime<Utc>,
}

pub struct TokioNotificationScheduler {
    sender: broadcast::Sender<FiredNotification>,
    pending: Arc<Mutex<HashMap<NotificationId, CancellationToken>>>,
    shutdown: CancellationToken,
}

impl TokioNotificationScheduler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            pending: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Receives every notification fired after this call, for all users.
    pub fn subscribe(&self) -> broadcast::Receiver<FiredNotification> {
        self.sender.subscribe()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Stops every pending timer for good.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Default for TokioNotificationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationScheduler for TokioNotificationScheduler {
    /// Delivery happens over the app's own connections, so it is always allowed.
    async fn request_permission(&self) -> PortResult<bool> {
        Ok(true)
    }

    async fn schedule(&self, request: &ScheduleRequest) -> PortResult<NotificationId> {
        let id = Uuid::new_v4().to_string();
        let token = self.shutdown.child_token();
        self.pending.lock().await.insert(id.clone(), token.clone());

        let sender = self.sender.clone();
        let pending = self.pending.clone();
        let delay = Duration::from_secs(request.fire_in_seconds);
        let notification = FiredNotification {
            id: id.clone(),
            title: request.title.clone(),
            body: request.body.clone(),
            payload: request.payload.clone(),
            fired_at: Utc::now(),
        };

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(notification_id = %notification.id, "Notification cancelled before firing");
                }
                _ = tokio::time::sleep(delay) => {
                    pending.lock().await.remove(&notification.id);
                    let fired = FiredNotification { fired_at: Utc::now(), ..notification };
                    let receivers = sender.send(fired).unwrap_or(0);
                    debug!(receivers, "Notification fired");
                }
            }
        });

        info!(notification_id = %id, fire_in_seconds = request.fire_in_seconds, "Notification scheduled");
        Ok(id)
    }

    /// Unknown or already fired ids are ignored.
    async fn cancel(&self, id: &str) -> PortResult<()> {
        if let Some(token) = self.pending.lock().await.remove(id) {
            token.cancel();
        }
        Ok(())
    }

    async fn cancel_all(&self) -> PortResult<()> {
        let drained: Vec<CancellationToken> = self.pending.lock().await.drain().map(|(_, t)| t).collect();
        for token in drained {
            token.cancel();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(fire_in_seconds: u64) -> ScheduleRequest {
        ScheduleRequest {
            title: "Feeding time for Rex".to_string(),
            body: "Rex is hungry.".to_string(),
            fire_in_seconds,
            payload: NotificationPayload { user_id: Uuid::new_v4(), nurture_id: None, action: None },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn notification_fires_after_its_delay() {
        let scheduler = TokioNotificationScheduler::new();
        let mut rx = scheduler.subscribe();

        let id = scheduler.schedule(&request(60)).await.unwrap();
        assert_eq!(scheduler.pending_count().await, 1);

        let fired = tokio::time::timeout(Duration::from_secs(61), rx.recv()).await.unwrap().unwrap();
        assert_eq!(fired.id, id);
        assert_eq!(fired.title, "Feeding time for Rex");
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_notification_never_fires() {
        let scheduler = TokioNotificationScheduler::new();
        let mut rx = scheduler.subscribe();

        let id = scheduler.schedule(&request(30)).await.unwrap();
        scheduler.cancel(&id).await.unwrap();

        assert!(tokio::time::timeout(Duration::from_secs(120), rx.recv()).await.is_err());
        assert_eq!(scheduler.pending_count().await, 0);
        // Cancelling again is harmless.
        scheduler.cancel(&id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_every_timer() {
        let scheduler = TokioNotificationScheduler::new();
        let mut rx = scheduler.subscribe();
        for delay in [10, 20, 30] {
            scheduler.schedule(&request(delay)).await.unwrap();
        }
        scheduler.cancel_all().await.unwrap();
        assert!(tokio::time::timeout(Duration::from_secs(60), rx.recv()).await.is_err());
    }
}
