//! Notification sink: an append-only log per recipient.

use std::sync::Arc;

use chrono::Utc;
use common::{NotificationId, NotificationKind, OrderId, UserId};
use store::{MarketStore, Notification, UnitOfWork};
use tracing::instrument;

use crate::delivery::DeliveryDispatcher;
use crate::{DomainError, Result};

/// Appends notifications and serves the recipient's read path.
///
/// Writes tied to an order go through [`NotificationSink::emit_in`] so they
/// commit or roll back with the order; delivery is dispatched only after
/// commit.
#[derive(Clone)]
pub struct NotificationSink {
    store: Arc<dyn MarketStore>,
    dispatcher: DeliveryDispatcher,
}

impl NotificationSink {
    pub fn new(store: Arc<dyn MarketStore>, dispatcher: DeliveryDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Builds an unread notification stamped now.
    pub fn compose(
        recipient: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        reference_id: Option<OrderId>,
    ) -> Notification {
        Notification {
            id: NotificationId::new(),
            recipient_id: recipient,
            kind,
            message: message.into(),
            reference_id,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    /// Appends a notification on its own and dispatches delivery.
    #[instrument(skip(self, message))]
    pub async fn emit(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        message: &str,
        reference_id: Option<OrderId>,
    ) -> Result<NotificationId> {
        if self.store.get_user(recipient).await?.is_none() {
            return Err(DomainError::not_found("user", recipient));
        }

        let notification = Self::compose(recipient, kind, message, reference_id);
        self.store.insert_notification(&notification).await?;
        let id = notification.id;
        self.dispatcher.dispatch(notification);
        Ok(id)
    }

    /// Stages a notification inside a unit of work.
    pub async fn emit_in(
        &self,
        uow: &mut dyn UnitOfWork,
        notification: &Notification,
    ) -> Result<()> {
        uow.insert_notification(notification).await?;
        Ok(())
    }

    /// Hands a committed notification to the delivery channel.
    pub fn dispatch(&self, notification: Notification) {
        self.dispatcher.dispatch(notification);
    }

    pub async fn list(&self, recipient: UserId, unread_only: bool) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications(recipient, unread_only).await?)
    }

    /// Flips the read flag on one of the recipient's own notifications.
    pub async fn mark_read(&self, id: NotificationId, recipient: UserId) -> Result<()> {
        if self.store.mark_notification_read(id, recipient).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("notification", id))
        }
    }

    /// Marks everything read; returns how many notifications changed.
    pub async fn mark_all_read(&self, recipient: UserId) -> Result<u64> {
        Ok(self.store.mark_all_notifications_read(recipient).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::InMemoryDelivery;
    use common::Role;
    use store::{InMemoryMarketStore, User};

    async fn sink_with_user() -> (NotificationSink, InMemoryDelivery, UserId) {
        let store = Arc::new(InMemoryMarketStore::new());
        let user = User {
            id: UserId::new(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Buyer,
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.unwrap();
        let delivery = InMemoryDelivery::new();
        let sink = NotificationSink::new(
            store,
            DeliveryDispatcher::new(Arc::new(delivery.clone())),
        );
        (sink, delivery, user.id)
    }

    #[tokio::test]
    async fn emit_requires_existing_recipient() {
        let (sink, _, _) = sink_with_user().await;
        let err = sink
            .emit(UserId::new(), NotificationKind::NewOrder, "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::MissingReference { entity: "user" }
        ));
    }

    #[tokio::test]
    async fn read_flags() {
        let (sink, _, user) = sink_with_user().await;
        let first = sink
            .emit(user, NotificationKind::OrderConfirmed, "one", None)
            .await
            .unwrap();
        sink.emit(user, NotificationKind::OrderShipped, "two", None)
            .await
            .unwrap();

        sink.mark_read(first, user).await.unwrap();
        let unread = sink.list(user, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].message, "two");

        assert!(matches!(
            sink.mark_read(first, UserId::new()).await,
            Err(DomainError::NotFound { .. })
        ));
        assert_eq!(sink.mark_all_read(user).await.unwrap(), 1);
        assert!(sink.list(user, true).await.unwrap().is_empty());
    }
}
