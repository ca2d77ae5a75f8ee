//! Order history, placement and tracking

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use super::events::{Event, EventBus};
use super::fetched::Fetched;
use super::{select_one, select_rows};
use crate::backend::{decode_first, decode_rows, encode_row, Backend, Query};
use crate::cart::{NewCartItem, OrderState, OrderStore};
use crate::error::{BackendError, Result, WashdayError};
use crate::money::OrderQuote;
use crate::types::{
    tables, NewOrder, NewOrderItem, Order, OrderItem, OrderStats, OrderStatus, OrderWithItems,
    Profile,
};

/// Progress of an order through pickup, cleaning and delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStep {
    Ordered,
    PickedUp,
    Processing,
    OutForDelivery,
    Delivered,
}

impl TrackingStep {
    pub const ALL: [TrackingStep; 5] = [
        TrackingStep::Ordered,
        TrackingStep::PickedUp,
        TrackingStep::Processing,
        TrackingStep::OutForDelivery,
        TrackingStep::Delivered,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Ordered => "Order Placed",
            Self::PickedUp => "Picked Up",
            Self::Processing => "Processing",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
        }
    }
}

/// Where an order stands; cancelled orders leave the step sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum Tracking {
    Cancelled,
    Step(TrackingStep),
}

/// Derive the tracking position from status and facility flags
///
/// The furthest stage either source reports wins.
pub fn tracking(order: &Order) -> Tracking {
    let by_status = match order.status {
        OrderStatus::Cancelled => return Tracking::Cancelled,
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Unknown => {
            TrackingStep::Ordered
        }
        OrderStatus::PickedUp => TrackingStep::PickedUp,
        OrderStatus::Processing => TrackingStep::Processing,
        OrderStatus::OutForDelivery => TrackingStep::OutForDelivery,
        OrderStatus::Delivered => TrackingStep::Delivered,
    };

    let by_flags = if order.is_dropoff_completed {
        TrackingStep::Delivered
    } else if order.is_facility_processing {
        TrackingStep::Processing
    } else if order.is_pickup_completed {
        TrackingStep::PickedUp
    } else {
        TrackingStep::Ordered
    };

    Tracking::Step(by_status.max(by_flags))
}

/// Orders of the signed-in user
#[derive(Clone)]
pub struct OrderService {
    backend: Arc<dyn Backend>,
    events: EventBus,
}

impl OrderService {
    pub fn new(backend: Arc<dyn Backend>, events: EventBus) -> Self {
        Self { backend, events }
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: &str) -> Fetched<Vec<Order>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_desc("created_at");
        Fetched::from_list(
            select_rows(self.backend.as_ref(), tables::ORDERS, &query).await,
            "orders",
        )
    }

    pub async fn order(&self, order_id: &str) -> Fetched<Order> {
        let query = Query::new().eq("id", order_id);
        Fetched::from_option(
            select_one(self.backend.as_ref(), tables::ORDERS, &query).await,
            "order",
        )
    }

    /// Order plus its line rows
    pub async fn with_items(&self, order_id: &str) -> Fetched<OrderWithItems> {
        Fetched::from_option(self.fetch_with_items(order_id).await, "order with items")
    }

    async fn fetch_with_items(&self, order_id: &str) -> Result<Option<OrderWithItems>> {
        let query = Query::new().eq("id", order_id);
        let Some(order) = select_one::<Order>(self.backend.as_ref(), tables::ORDERS, &query).await?
        else {
            return Ok(None);
        };

        let query = Query::new().eq("order_id", order_id);
        let items = select_rows(self.backend.as_ref(), tables::ORDER_ITEMS, &query).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    pub async fn create(&self, order: &NewOrder) -> Result<Order> {
        let rows = self
            .backend
            .insert(tables::ORDERS, vec![encode_row(order)?])
            .await?;
        decode_first(rows)?.ok_or_else(|| BackendError::NotFound(tables::ORDERS.to_string()).into())
    }

    pub async fn add_items(&self, items: &[NewOrderItem]) -> Result<Vec<OrderItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let rows = items.iter().map(encode_row).collect::<Result<Vec<_>>>()?;
        decode_rows(self.backend.insert(tables::ORDER_ITEMS, rows).await?)
    }

    /// Patch arbitrary order columns
    pub async fn update(&self, order_id: &str, patch: Value) -> Result<Order> {
        let rows = self
            .backend
            .update(tables::ORDERS, &Query::new().eq("id", order_id), patch)
            .await?;
        decode_first(rows)?.ok_or_else(|| BackendError::NotFound(tables::ORDERS.to_string()).into())
    }

    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let order = self
            .update(
                order_id,
                json!({
                    "status": status,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        tracing::info!(order_id = %order_id, status = %status, "order status updated");
        self.events.emit(Event::OrderUpdated {
            order_id: order.id.clone(),
            status,
        });
        Ok(order)
    }

    pub async fn cancel(&self, order_id: &str) -> Result<Order> {
        self.update_status(order_id, OrderStatus::Cancelled).await
    }

    /// Submit a finished draft
    ///
    /// Writes the order row, then one item row per cart line. If the item
    /// insert fails the order row stays behind with no items; the error is
    /// returned and the caller keeps its cart.
    pub async fn place_order(
        &self,
        profile: &Profile,
        email: &str,
        state: &OrderState,
        quote: &OrderQuote,
    ) -> Result<Order> {
        if state.is_empty() {
            return Err(WashdayError::InvalidInput("cart is empty".to_string()));
        }

        let groups = state.items_by_service();
        let first = groups.first().and_then(|g| g.items.first());

        let new_order = NewOrder {
            user_id: profile.id.clone(),
            customer_name: profile.full_name(),
            email: email.to_string(),
            phone: profile.phone.clone(),
            shipping_address: state.delivery_address.clone(),
            pickup_address: state.pickup_address.clone(),
            status: OrderStatus::Pending,
            special_instructions: state.delivery_notes.clone(),
            subtotal: quote.subtotal,
            shipping_fee: quote.delivery_fee,
            total_amount: quote.total,
            pickup_date: state.pickup_date.clone(),
            delivery_date: state.delivery_date.clone(),
            estimated_pickup_time: state.pickup_time.clone(),
            estimated_dropoff_time: state.delivery_time.clone(),
            service_id: first.map(|l| l.service_id.clone()).unwrap_or_default(),
            service_name: first.map(|l| l.service_name.clone()).unwrap_or_default(),
            category_id: first.and_then(|l| l.category_id.clone()),
            category_name: first.and_then(|l| l.category_name.clone()),
        };

        let order = self.create(&new_order).await?;

        let lines: Vec<NewOrderItem> = state
            .items
            .iter()
            .map(|line| NewOrderItem {
                order_id: order.id.clone(),
                service_id: line.service_id.clone(),
                service_name: line.service_name.clone(),
                service_type: line.service_type.clone(),
                category_id: line.category_id.clone(),
                category_name: line.category_name.clone(),
                description: line.description.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price(),
            })
            .collect();
        if let Err(e) = self.add_items(&lines).await {
            tracing::error!(order_id = %order.id, error = %e, "order created without items");
            return Err(e);
        }

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "order placed"
        );
        self.events.emit(Event::OrderPlaced {
            order_id: order.id.clone(),
            total: order.total_amount,
        });
        Ok(order)
    }

    /// Totals over the user's non-cancelled orders
    pub async fn stats(&self, user_id: &str) -> Fetched<OrderStats> {
        let query = Query::new()
            .eq("user_id", user_id)
            .neq("status", "cancelled");
        let orders: Result<Vec<Order>> =
            select_rows(self.backend.as_ref(), tables::ORDERS, &query).await;

        match orders {
            Ok(orders) => Fetched::Data(order_stats(&orders)),
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch order stats");
                Fetched::Failed(e.to_string())
            }
        }
    }

    /// Replace the cart with the lines of a past order
    ///
    /// Each item row keeps its own service and category, so the refilled
    /// cart has the same lines and total as the order it copies. Rows that
    /// predate per-line details borrow the order's category when they
    /// belong to the order's service.
    pub fn reorder(&self, store: &OrderStore, past: &OrderWithItems) {
        store.clear_cart();
        let order = &past.order;
        for item in &past.items {
            let same_service = item.service_id == order.service_id;
            let (category_id, category_name) = if item.category_id.is_some() || !same_service {
                (item.category_id.clone(), item.category_name.clone())
            } else {
                (order.category_id.clone(), order.category_name.clone())
            };
            let service_name = item.service_name.clone().unwrap_or_else(|| {
                if same_service {
                    order.service_name.clone()
                } else {
                    String::new()
                }
            });

            store.add_item(NewCartItem {
                service_id: item.service_id.clone(),
                service_name,
                service_type: item.service_type.clone().unwrap_or_default(),
                category_id,
                category_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                description: item
                    .description
                    .clone()
                    .or_else(|| Some(format!("Reorder of {}", order.order_number))),
                icon_name: None,
            });
        }
        tracing::debug!(order_id = %order.id, lines = past.items.len(), "cart refilled from order");
    }
}

fn order_stats(orders: &[Order]) -> OrderStats {
    if orders.is_empty() {
        return OrderStats::empty();
    }

    let total_spent: Decimal = orders.iter().map(|o| o.total_amount).sum();
    let average = (total_spent / Decimal::from(orders.len())).round_dp(2);

    OrderStats {
        total_orders: orders.len(),
        total_spent,
        average_order_value: average,
        last_order_date: orders.iter().filter_map(|o| o.created_at).max(),
    }
}
