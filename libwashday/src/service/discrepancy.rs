//! Review of items the facility reported differently from the order
//!
//! After pickup the facility may change an item (count, type, price) and
//! flag the order with `has_discrepancy`. The customer approves or declines
//! each changed item; the whole list is written back on every decision.

use std::sync::Arc;

use serde_json::json;

use super::fetched::Fetched;
use super::{select_one, select_rows};
use crate::backend::{decode_first, encode_row, Backend, Query};
use crate::error::{BackendError, Result, WashdayError};
use crate::types::{tables, DiscrepancyStatus, FacilityUpdatedItem, Order};

#[derive(Clone)]
pub struct DiscrepancyService {
    backend: Arc<dyn Backend>,
}

impl DiscrepancyService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Flagged orders that carry at least one updated item
    pub async fn list(&self, user_id: &str) -> Fetched<Vec<Order>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("has_discrepancy", true)
            .order_desc("created_at");
        let orders: Result<Vec<Order>> =
            select_rows(self.backend.as_ref(), tables::ORDERS, &query).await;

        Fetched::from_list(
            orders.map(|orders| orders.into_iter().filter(has_updated_items).collect()),
            "discrepancy orders",
        )
    }

    pub async fn approve(&self, order_id: &str, index: usize) -> Result<Order> {
        self.decide(order_id, index, DiscrepancyStatus::Approved, None)
            .await
    }

    pub async fn decline(&self, order_id: &str, index: usize, reason: &str) -> Result<Order> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WashdayError::InvalidInput(
                "a reason is required to decline an item".to_string(),
            ));
        }
        self.decide(order_id, index, DiscrepancyStatus::Declined, Some(reason))
            .await
    }

    async fn decide(
        &self,
        order_id: &str,
        index: usize,
        status: DiscrepancyStatus,
        reason: Option<&str>,
    ) -> Result<Order> {
        let order: Order = select_one(
            self.backend.as_ref(),
            tables::ORDERS,
            &Query::new().eq("id", order_id),
        )
        .await?
        .ok_or_else(|| BackendError::NotFound(tables::ORDERS.to_string()))?;

        let mut items = order.facility_updated_items.unwrap_or_default();
        let count = items.len();
        let item = items.get_mut(index).ok_or_else(|| {
            WashdayError::InvalidInput(format!(
                "order {} has {} updated items, no item #{}",
                order_id, count, index
            ))
        })?;
        item.status = status;
        item.decline_reason = reason.map(str::to_string);

        tracing::info!(order_id = %order_id, index, status = %status, "discrepancy item decided");

        let rows = self
            .backend
            .update(
                tables::ORDERS,
                &Query::new().eq("id", order_id),
                json!({ "facility_updated_items": encode_row(&items)? }),
            )
            .await?;
        decode_first(rows)?
            .ok_or_else(|| BackendError::NotFound(tables::ORDERS.to_string()).into())
    }
}

fn has_updated_items(order: &Order) -> bool {
    order
        .facility_updated_items
        .as_ref()
        .is_some_and(|items| !items.is_empty())
}

/// Items still waiting for a decision
pub fn pending_items(order: &Order) -> Vec<(usize, &FacilityUpdatedItem)> {
    order
        .facility_updated_items
        .iter()
        .flatten()
        .enumerate()
        .filter(|(_, item)| item.status == DiscrepancyStatus::Pending)
        .collect()
}
