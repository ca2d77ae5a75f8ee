//! Shared order store
//!
//! [`OrderStore`] is a cheap-to-clone handle around the current
//! [`OrderState`]. Every mutation runs the pure reducer and then sends a
//! snapshot of the new state to every subscriber before returning, so a
//! subscriber never observes a later event ahead of the state it caused.
//!
//! ```
//! use libwashday::cart::{NewCartItem, OrderStore};
//! use rust_decimal::Decimal;
//!
//! let store = OrderStore::new();
//! let updates = store.subscribe();
//!
//! store.add_item(NewCartItem {
//!     service_id: "s1".to_string(),
//!     service_name: "Wash & Iron".to_string(),
//!     service_type: "washiron".to_string(),
//!     category_id: Some("c1".to_string()),
//!     category_name: Some("Shirts".to_string()),
//!     quantity: 2,
//!     unit_price: Decimal::from(4),
//!     description: None,
//!     icon_name: None,
//! });
//!
//! let snapshot = updates.try_recv().unwrap();
//! assert_eq!(snapshot.total_items(), 2);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rust_decimal::Decimal;

use super::actions::OrderAction;
use super::reducer::reduce;
use super::state::{CartLineItem, NewCartItem, OrderState, ServiceGroup};

#[derive(Default)]
struct Inner {
    state: OrderState,
    subscribers: Vec<Sender<OrderState>>,
}

/// Handle to the in-progress order
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("OrderStore")
            .field("state", &inner.state)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl OrderStore {
    /// Create a store holding the empty draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store starting from `state`
    pub fn with_state(state: OrderState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register for state snapshots
    ///
    /// Dropping the receiver unsubscribes on the next dispatch.
    pub fn subscribe(&self) -> Receiver<OrderState> {
        let (tx, rx) = unbounded();
        self.lock().subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Apply an action and notify subscribers
    pub fn dispatch(&self, action: OrderAction) {
        let mut inner = self.lock();
        tracing::trace!(?action, "order store dispatch");

        let current = std::mem::take(&mut inner.state);
        inner.state = reduce(current, action);

        let snapshot = inner.state.clone();
        inner
            .subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Snapshot of the current draft
    pub fn state(&self) -> OrderState {
        self.lock().state.clone()
    }

    pub fn add_item(&self, item: NewCartItem) {
        self.dispatch(OrderAction::AddItem(item));
    }

    pub fn update_item_quantity(&self, id: &str, quantity: u32) {
        self.dispatch(OrderAction::UpdateItemQuantity {
            id: id.to_string(),
            quantity,
        });
    }

    pub fn remove_item(&self, id: &str) {
        self.dispatch(OrderAction::RemoveItem { id: id.to_string() });
    }

    pub fn clear_cart(&self) {
        self.dispatch(OrderAction::ClearCart);
    }

    pub fn set_pickup_schedule(&self, date: &str, time: &str) {
        self.dispatch(OrderAction::SetPickupSchedule {
            date: date.to_string(),
            time: time.to_string(),
        });
    }

    pub fn set_delivery_schedule(&self, date: &str, time: &str) {
        self.dispatch(OrderAction::SetDeliverySchedule {
            date: date.to_string(),
            time: time.to_string(),
        });
    }

    pub fn set_addresses(&self, pickup: &str, delivery: &str, notes: &str) {
        self.dispatch(OrderAction::SetAddresses {
            pickup: pickup.to_string(),
            delivery: delivery.to_string(),
            notes: notes.to_string(),
        });
    }

    pub fn reset_order(&self) {
        self.dispatch(OrderAction::ResetOrder);
    }

    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().state.items.clone()
    }

    pub fn total_items(&self) -> u32 {
        self.lock().state.total_items()
    }

    pub fn total_price(&self) -> Decimal {
        self.lock().state.total_price()
    }

    pub fn items_by_service(&self) -> Vec<ServiceGroup> {
        self.lock().state.items_by_service()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::state::tests::new_item;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribers_see_state_before_dispatch_returns() {
        let store = OrderStore::new();
        let rx = store.subscribe();

        store.add_item(new_item("s1", Some("c1"), dec!(10), 2));
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.total_items(), 2);

        store.update_item_quantity("s1-c1", 5);
        assert_eq!(rx.try_recv().unwrap().total_price(), dec!(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_every_subscriber_is_notified() {
        let store = OrderStore::new();
        let a = store.subscribe();
        let b = store.subscribe();

        store.set_pickup_schedule("2024-06-01", "13:00 - 15:00");

        assert_eq!(a.try_recv().unwrap().pickup_date, "2024-06-01");
        assert_eq!(b.try_recv().unwrap().pickup_time, "13:00 - 15:00");
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let store = OrderStore::new();
        let keep = store.subscribe();
        let gone = store.subscribe();
        assert_eq!(store.subscriber_count(), 2);

        drop(gone);
        store.clear_cart();

        assert_eq!(store.subscriber_count(), 1);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let store = OrderStore::new();
        let other = store.clone();

        other.add_item(new_item("s1", None, dec!(35), 1));
        assert_eq!(store.total_items(), 1);
        assert_eq!(store.items()[0].id(), "s1-custom");
    }

    #[test]
    fn test_scenario_two_adds_then_reset() {
        let store = OrderStore::new();
        store.add_item(new_item("s1", Some("c1"), dec!(10), 2));
        store.add_item(new_item("s1", Some("c1"), dec!(10), 3));

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(items[0].total_price(), dec!(50));

        store.set_addresses("Home", "Office", "");
        store.reset_order();
        assert_eq!(store.state(), OrderState::default());
        assert_eq!(store.total_price(), Decimal::ZERO);
        assert!(store.items_by_service().is_empty());
    }

    #[test]
    fn test_with_state_starts_from_snapshot() {
        let mut state = OrderState::new();
        state.delivery_notes = "Leave at door".to_string();
        let store = OrderStore::with_state(state);
        assert_eq!(store.state().delivery_notes, "Leave at door");
    }
}
