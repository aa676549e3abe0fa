//! Order state machine: placement, transitions, and the read side.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{NotificationKind, OrderId, OrderStatus, ProductId, Quantity};
use store::{MarketStore, Notification, Order, OrderQuery, UnitOfWork};
use tracing::{debug, info, instrument};

use crate::inventory::{InventoryLedger, lock_product};
use crate::notification::NotificationSink;
use crate::principal::Principal;
use crate::search_sync::SearchSync;
use crate::{DomainError, Rejection, Result};

/// Which side of an order a listing is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderRole {
    /// Orders where the actor is buyer or seller.
    #[default]
    Any,
    Buyer,
    Seller,
}

/// Returns true if `to` is reachable from `from` in one step.
pub fn is_legal_transition(from: OrderStatus, to: OrderStatus) -> bool {
    match to {
        OrderStatus::Confirmed => from.can_confirm(),
        OrderStatus::Shipped => from.can_ship(),
        OrderStatus::Delivered => from.can_deliver(),
        OrderStatus::Cancelled => from.can_cancel(),
        OrderStatus::Pending => false,
    }
}

/// Checks that `actor` may move `order` to `to`.
///
/// Forward moves belong to the seller; either party may cancel.
fn authorize(order: &Order, actor: &Principal, to: OrderStatus) -> Result<()> {
    let allowed = match to {
        OrderStatus::Cancelled => {
            actor.user_id == order.buyer_id || actor.user_id == order.seller_id
        }
        _ => actor.user_id == order.seller_id,
    };
    if allowed {
        return Ok(());
    }
    Err(match to {
        OrderStatus::Cancelled => Rejection::NotOrderParticipant,
        _ => Rejection::NotOrderSeller,
    }
    .into())
}

fn transition_message(order: &Order, product_name: &str, reason: Option<&str>) -> String {
    match order.status {
        OrderStatus::Confirmed => format!(
            "Your order #{} for {product_name} has been confirmed",
            order.id
        ),
        OrderStatus::Shipped => format!("Your order #{} for {product_name} has shipped", order.id),
        OrderStatus::Delivered => format!(
            "Your order #{} for {product_name} has been delivered",
            order.id
        ),
        _ => match reason {
            Some(reason) => format!("Order #{} has been cancelled: {reason}", order.id),
            None => format!("Order #{} has been cancelled", order.id),
        },
    }
}

fn notification_kind(status: OrderStatus) -> NotificationKind {
    match status {
        OrderStatus::Confirmed => NotificationKind::OrderConfirmed,
        OrderStatus::Shipped => NotificationKind::OrderShipped,
        OrderStatus::Delivered => NotificationKind::OrderDelivered,
        OrderStatus::Cancelled => NotificationKind::OrderCancelled,
        OrderStatus::Pending => NotificationKind::NewOrder,
    }
}

/// Creates orders and drives them through their lifecycle.
///
/// Every mutating operation runs in one unit of work: the locks, the stock
/// change, the order write and the notification commit together or not at
/// all. Search refresh and delivery happen after commit.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn MarketStore>,
    ledger: InventoryLedger,
    notifications: NotificationSink,
    search: SearchSync,
    lock_timeout: Duration,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn MarketStore>,
        ledger: InventoryLedger,
        notifications: NotificationSink,
        search: SearchSync,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            notifications,
            search,
            lock_timeout,
        }
    }

    /// Places an order and reserves its stock.
    ///
    /// Checks run in a fixed order and stop at the first failure: the product
    /// exists and is available, the buyer is not the seller, the quantity is
    /// positive and covered by stock, and the buyer has no active order on
    /// the product.
    #[instrument(skip(self), fields(buyer = %actor.user_id))]
    pub async fn place_order(
        &self,
        actor: Principal,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_place_order(actor, product_id, quantity).await;
        metrics::histogram!("place_order_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok((order, notification)) => {
                metrics::counter!("orders_placed_total").increment(1);
                info!(
                    order_id = %order.id,
                    %product_id,
                    quantity = %order.quantity,
                    total = %order.total_price,
                    "Order placed"
                );
                self.search.refresh(product_id).await;
                self.notifications.dispatch(notification);
                Ok(order)
            }
            Err(DomainError::Rejected(rejection)) => {
                metrics::counter!("orders_rejected_total", "reason" => rejection.reason())
                    .increment(1);
                debug!(%product_id, reason = rejection.reason(), "Order rejected");
                Err(rejection.into())
            }
            Err(e) => Err(e),
        }
    }

    async fn try_place_order(
        &self,
        actor: Principal,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(Order, Notification)> {
        // An unknown buyer could never be notified, so the order could
        // never leave pending.
        if self.store.get_user(actor.user_id).await?.is_none() {
            return Err(DomainError::not_found("user", actor.user_id));
        }

        let mut uow = self.store.begin().await?;
        let product = lock_product(uow.as_mut(), product_id, self.lock_timeout).await?;

        if !product.is_available() {
            return Err(Rejection::ProductUnavailable.into());
        }
        if product.seller_id == actor.user_id {
            return Err(Rejection::SelfPurchase.into());
        }
        if !quantity.is_positive() {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        if quantity > product.stock {
            return Err(Rejection::InsufficientStock {
                requested: quantity,
                available: product.stock,
            }
            .into());
        }
        if uow.has_active_order(actor.user_id, product_id).await? {
            return Err(Rejection::DuplicateActiveOrder.into());
        }

        self.ledger
            .reserve_in(uow.as_mut(), product_id, quantity)
            .await?;

        let total_price = product
            .price
            .times(quantity)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            buyer_id: actor.user_id,
            seller_id: product.seller_id,
            product_id,
            quantity,
            total_price,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        uow.insert_order(&order).await?;

        let notification = NotificationSink::compose(
            product.seller_id,
            NotificationKind::NewOrder,
            format!("New order #{} received for {}", order.id, product.name),
            Some(order.id),
        );
        self.notifications
            .emit_in(uow.as_mut(), &notification)
            .await?;

        uow.commit().await?;
        Ok((order, notification))
    }

    /// Seller accepts a pending order.
    pub async fn confirm(&self, actor: Principal, order_id: OrderId) -> Result<Order> {
        self.transition(actor, order_id, OrderStatus::Confirmed, None)
            .await
    }

    /// Buyer or seller withdraws a pending or confirmed order; its stock goes
    /// back to the product.
    pub async fn cancel(
        &self,
        actor: Principal,
        order_id: OrderId,
        reason: Option<&str>,
    ) -> Result<Order> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        self.transition(actor, order_id, OrderStatus::Cancelled, reason)
            .await
    }

    /// Seller hands a confirmed order to the carrier.
    pub async fn ship(&self, actor: Principal, order_id: OrderId) -> Result<Order> {
        self.transition(actor, order_id, OrderStatus::Shipped, None)
            .await
    }

    /// Seller records that a shipped order arrived.
    pub async fn deliver(&self, actor: Principal, order_id: OrderId) -> Result<Order> {
        self.transition(actor, order_id, OrderStatus::Delivered, None)
            .await
    }

    #[instrument(skip(self, actor, reason), fields(actor = %actor.user_id))]
    async fn transition(
        &self,
        actor: Principal,
        order_id: OrderId,
        to: OrderStatus,
        reason: Option<&str>,
    ) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let mut order = self.lock_order(uow.as_mut(), order_id).await?;

        if let Err(e) = authorize(&order, &actor, to) {
            debug!(%order_id, error = %e, "Transition refused");
            return Err(e);
        }
        if !is_legal_transition(order.status, to) {
            debug!(%order_id, from = %order.status, "Illegal transition");
            return Err(Rejection::IllegalTransition {
                from: order.status,
                to,
            }
            .into());
        }

        let product_name = if to == OrderStatus::Cancelled {
            let product = self
                .ledger
                .release_in(uow.as_mut(), order.product_id, order.quantity)
                .await?;
            product.name
        } else {
            self.store
                .get_product(order.product_id)
                .await?
                .map(|p| p.name)
                .unwrap_or_else(|| "product".to_string())
        };

        let from = order.status;
        order.status = to;
        order.updated_at = Utc::now();
        uow.update_order_status(order.id, to, order.updated_at)
            .await?;

        let notification = NotificationSink::compose(
            order.buyer_id,
            notification_kind(to),
            transition_message(&order, &product_name, reason),
            Some(order.id),
        );
        self.notifications
            .emit_in(uow.as_mut(), &notification)
            .await?;

        uow.commit().await?;

        metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
        info!(%order_id, %from, %to, "Order status changed");
        if to == OrderStatus::Cancelled {
            self.search.refresh(order.product_id).await;
        }
        self.notifications.dispatch(notification);
        Ok(order)
    }

    async fn lock_order(&self, uow: &mut dyn UnitOfWork, order_id: OrderId) -> Result<Order> {
        uow.lock_order(order_id, self.lock_timeout)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }

    /// Fetches an order the actor takes part in.
    pub async fn get_order(&self, actor: Principal, order_id: OrderId) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;
        if order.buyer_id != actor.user_id && order.seller_id != actor.user_id {
            return Err(Rejection::NotOrderParticipant.into());
        }
        Ok(order)
    }

    /// Lists the actor's orders newest first.
    pub async fn list_orders(
        &self,
        actor: Principal,
        status: Option<OrderStatus>,
        role: OrderRole,
    ) -> Result<Vec<Order>> {
        let mut query = match role {
            OrderRole::Any => OrderQuery::for_participant(actor.user_id),
            OrderRole::Buyer => OrderQuery::new().buyer(actor.user_id),
            OrderRole::Seller => OrderQuery::new().seller(actor.user_id),
        };
        query.status = status;
        Ok(self.store.list_orders(&query).await?)
    }
}
