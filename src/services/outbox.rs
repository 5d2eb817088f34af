use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::AppResult;
use crate::models::{NewNotification, Notification};
use crate::repository::NotificationRepository;

/// Receives notifications once their transaction has committed.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, notification: &Notification);
}

/// Default sink: one structured log line per delivered notification.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) {
        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            kind = ?notification.kind,
            title = %notification.title,
            "Notification delivered"
        );
    }
}

/// Handle to the single dispatcher task. Cloning shares the same channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationDispatcher {
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Notification>();

        let handle = tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                sink.deliver(&notification).await;
            }
            tracing::debug!("Notification dispatcher stopped");
        });

        (Self { sender }, handle)
    }

    pub fn publish(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::warn!("Notification dispatcher is not running, delivery skipped");
        }
    }
}

/// Notifications produced by one handler, written in the handler's
/// transaction and published only after it commits.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<NewNotification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: NewNotification) {
        self.pending.push(notification);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Inserts the queued rows, commits `tx` and hands the stored rows to
    /// the dispatcher. Nothing is published when any step fails.
    pub async fn commit(
        self,
        mut tx: Transaction<'_, Postgres>,
        dispatcher: &NotificationDispatcher,
    ) -> AppResult<Vec<Notification>> {
        let mut stored = Vec::with_capacity(self.pending.len());
        for notification in &self.pending {
            stored.push(NotificationRepository::insert(&mut *tx, notification).await?);
        }

        tx.commit().await?;

        for notification in &stored {
            dispatcher.publish(notification.clone());
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    use crate::models::NotificationType;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.id);
        }
    }

    fn notification() -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "New Payment Received".to_string(),
            message: "Payment of ZMW 5000.00 received for Villa".to_string(),
            is_read: false,
            kind: NotificationType::Payment,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn dispatcher_delivers_in_publish_order() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, handle) = NotificationDispatcher::spawn(sink.clone());

        let first = notification();
        let second = notification();
        dispatcher.publish(first.clone());
        dispatcher.publish(second.clone());
        drop(dispatcher);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*sink.seen.lock().unwrap(), vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn publishing_after_shutdown_does_not_panic() {
        let (dispatcher, handle) = NotificationDispatcher::spawn(Arc::new(LogSink));
        handle.abort();
        let _ = handle.await;

        dispatcher.publish(notification());
    }

    #[test]
    fn outbox_queues_in_order() {
        let landlord = Uuid::new_v4();
        let mut outbox = Outbox::new();
        assert!(outbox.is_empty());

        outbox.push(NewNotification::review_received(landlord, 5, "Villa"));
        outbox.push(NewNotification::agreement_created(Uuid::new_v4(), "Villa"));

        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox.pending[0].user_id, landlord);
    }
}
