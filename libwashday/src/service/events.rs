//! Event bus for session and order changes
//!
//! Services emit events after successful remote writes; front-ends
//! subscribe to refresh their views. Built on `tokio::sync::broadcast`, so
//! emitting never blocks and events are dropped when nobody listens.
//!
//! ```
//! use libwashday::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(Event::SessionChanged { user_id: Some("u1".to_string()) });
//!
//! if let Ok(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::OrderStatus;

pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer before lagging receivers lose events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Signed in (`Some`) or signed out (`None`)
    SessionChanged { user_id: Option<String> },

    OrderPlaced { order_id: String, total: Decimal },

    OrderUpdated { order_id: String, status: OrderStatus },

    DefaultAddressChanged { user_id: String, address_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let event = Event::OrderPlaced {
            order_id: "o1".to_string(),
            total: dec!(47),
        };
        bus.emit(event.clone());

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(Event::SessionChanged { user_id: None });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(Event::OrderUpdated {
            order_id: "o1".to_string(),
            status: OrderStatus::Cancelled,
        })
        .unwrap();
        assert_eq!(json["type"], "order_updated");
        assert_eq!(json["status"], "cancelled");
    }
}
