//! Out-of-band notification delivery (email, push).
//!
//! Delivery is fire-and-forget: it runs after the owning transaction has
//! committed, at most once, and its failures never reach the caller.

use std::sync::Arc;

use async_trait::async_trait;
use store::Notification;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Errors reported by a delivery channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery channel unavailable: {0}")]
    Unavailable(String),
}

/// A channel that pushes notifications to users.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Delivery channel that only writes a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            recipient = %notification.recipient_id,
            kind = %notification.kind,
            "Notification delivered"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryDeliveryState {
    delivered: Vec<Notification>,
    fail_on_deliver: bool,
}

/// In-memory delivery channel for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDelivery {
    state: Arc<RwLock<InMemoryDeliveryState>>,
}

impl InMemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the channel to fail every delivery.
    pub async fn set_fail_on_deliver(&self, fail: bool) {
        self.state.write().await.fail_on_deliver = fail;
    }

    /// Returns everything delivered so far.
    pub async fn delivered(&self) -> Vec<Notification> {
        self.state.read().await.delivered.clone()
    }
}

#[async_trait]
impl NotificationDelivery for InMemoryDelivery {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let mut state = self.state.write().await;
        if state.fail_on_deliver {
            return Err(DeliveryError::Unavailable("mail relay down".to_string()));
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}

/// Spawns deliveries on the runtime without waiting for them.
#[derive(Clone)]
pub struct DeliveryDispatcher {
    delivery: Arc<dyn NotificationDelivery>,
}

impl DeliveryDispatcher {
    pub fn new(delivery: Arc<dyn NotificationDelivery>) -> Self {
        Self { delivery }
    }

    pub fn dispatch(&self, notification: Notification) {
        let delivery = self.delivery.clone();
        tokio::spawn(async move {
            if let Err(e) = delivery.deliver(&notification).await {
                metrics::counter!("notification_delivery_failures_total").increment(1);
                warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{NotificationId, NotificationKind, UserId};

    fn notification() -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient_id: UserId::new(),
            kind: NotificationKind::OrderConfirmed,
            message: "confirmed".to_string(),
            reference_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn records_deliveries() {
        let delivery = InMemoryDelivery::new();
        delivery.deliver(&notification()).await.unwrap();
        assert_eq!(delivery.delivered().await.len(), 1);
    }

    #[tokio::test]
    async fn fail_toggle() {
        let delivery = InMemoryDelivery::new();
        delivery.set_fail_on_deliver(true).await;
        assert!(delivery.deliver(&notification()).await.is_err());
        assert!(delivery.delivered().await.is_empty());
    }

    async fn wait_for_deliveries(delivery: &InMemoryDelivery, count: usize) -> usize {
        for _ in 0..50 {
            let delivered = delivery.delivered().await.len();
            if delivered >= count {
                return delivered;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        delivery.delivered().await.len()
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let delivery = InMemoryDelivery::new();
        let dispatcher = DeliveryDispatcher::new(Arc::new(delivery.clone()));

        dispatcher.dispatch(notification());
        assert_eq!(wait_for_deliveries(&delivery, 1).await, 1);
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let delivery = InMemoryDelivery::new();
        delivery.set_fail_on_deliver(true).await;
        let dispatcher = DeliveryDispatcher::new(Arc::new(delivery.clone()));

        dispatcher.dispatch(notification());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(delivery.delivered().await.is_empty());
    }
}
