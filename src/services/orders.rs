//! Order reads and the status lifecycle.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::aggregates::{Order, OrderStatus, OrderStatusPolicy, StatusChange};
use crate::domain::value_objects::OrderId;
use crate::messaging::EventPublisher;
use crate::store::{OrderFilter, Stores};
use crate::{EcommerceError, Resource, Result};

#[derive(Clone)]
pub struct OrderService {
    stores: Stores,
    events: Arc<dyn EventPublisher>,
    policy: OrderStatusPolicy,
}

impl OrderService {
    #[must_use]
    pub fn new(stores: Stores, events: Arc<dyn EventPublisher>, policy: OrderStatusPolicy) -> Self {
        Self { stores, events, policy }
    }

    pub fn policy(&self) -> OrderStatusPolicy { self.policy }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId, filter: OrderFilter) -> Result<Order> {
        self.stores.orders.find_order(id, filter).await?.ok_or(EcommerceError::NotFound(Resource::Order))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        Ok(self.stores.orders.list_orders(filter).await?)
    }

    /// Moves an order to `status` under the configured policy. Re-sending the
    /// current status returns the order as stored.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut order = self.get_order(id, OrderFilter::all()).await?;

        match order.update_status(status, self.policy, Utc::now())? {
            StatusChange::Unchanged => return Ok(order),
            StatusChange::Changed { from, to, out_of_order } => {
                if out_of_order {
                    tracing::warn!(order_id = %id, %from, %to, "order status moved outside the forward lifecycle");
                } else {
                    tracing::info!(order_id = %id, %from, %to, "order status updated");
                }
            }
        }

        let events = order.take_events();
        let order = self.stores.orders.save_order(&order).await?;
        self.events.publish_all(events).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::aggregates::{Cart, PaymentMethod, ShippingAddress};
    use crate::domain::pricing::Charges;
    use crate::domain::value_objects::{ProductId, UserId};
    use crate::messaging::LogPublisher;

    async fn stored_order(stores: &Stores, owner: UserId, method: PaymentMethod) -> Order {
        let mut cart = Cart::new(owner);
        cart.add_line(ProductId::new(), None, Decimal::new(50, 0));
        let mut order = Order::place(&cart, ShippingAddress::default(), Charges::default(), method);
        order.take_events();
        stores.orders.save_order(&order).await.unwrap()
    }

    fn service(stores: &Stores, policy: OrderStatusPolicy) -> OrderService {
        OrderService::new(stores.clone(), Arc::new(LogPublisher), policy)
    }

    #[tokio::test]
    async fn test_delivered_cash_order_is_paid() {
        let stores = Stores::memory();
        let order = stored_order(&stores, UserId::new(), PaymentMethod::Cash).await;
        let updated = service(&stores, OrderStatusPolicy::Lenient).update_status(order.id(), OrderStatus::Delivered).await.unwrap();
        assert!(updated.is_delivered() && updated.is_paid());
        assert!(updated.delivered_at().is_some() && updated.paid_at().is_some());
        assert_eq!(updated.version(), order.version() + 1);
    }

    #[tokio::test]
    async fn test_same_status_twice_keeps_timestamp() {
        let stores = Stores::memory();
        let order = stored_order(&stores, UserId::new(), PaymentMethod::Card).await;
        let service = service(&stores, OrderStatusPolicy::Lenient);
        let first = service.update_status(order.id(), OrderStatus::Shipped).await.unwrap();
        let second = service.update_status(order.id(), OrderStatus::Shipped).await.unwrap();
        assert_eq!(first.status_changed_at(), second.status_changed_at());
        assert_eq!(first.version(), second.version());
    }

    #[tokio::test]
    async fn test_forward_only_rejects_backward_move() {
        let stores = Stores::memory();
        let order = stored_order(&stores, UserId::new(), PaymentMethod::Card).await;
        let service = service(&stores, OrderStatusPolicy::ForwardOnly);
        service.update_status(order.id(), OrderStatus::Delivered).await.unwrap();
        assert!(matches!(
            service.update_status(order.id(), OrderStatus::Processing).await,
            Err(EcommerceError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_respect_owner_filter() {
        let stores = Stores::memory();
        let owner = UserId::new();
        let mine = stored_order(&stores, owner, PaymentMethod::Cash).await;
        stored_order(&stores, UserId::new(), PaymentMethod::Cash).await;
        let service = service(&stores, OrderStatusPolicy::Lenient);

        assert_eq!(service.list_orders(OrderFilter::all()).await.unwrap().len(), 2);
        let own = service.list_orders(OrderFilter::owned_by(owner)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id(), mine.id());
        assert!(matches!(
            service.get_order(mine.id(), OrderFilter::owned_by(UserId::new())).await,
            Err(EcommerceError::NotFound(Resource::Order))
        ));
    }

    #[tokio::test]
    async fn test_missing_order() {
        let stores = Stores::memory();
        assert!(matches!(
            service(&stores, OrderStatusPolicy::Lenient).update_status(OrderId::new(), OrderStatus::Shipped).await,
            Err(EcommerceError::NotFound(Resource::Order))
        ));
    }
}
