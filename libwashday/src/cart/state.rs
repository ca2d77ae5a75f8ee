//! Order draft state
//!
//! The draft is a plain value. Every transition goes through
//! [`reduce`](super::reducer::reduce); the derived queries here are pure
//! functions of the current value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category segment used in line ids when a line has no category
pub const NO_CATEGORY: &str = "custom";

/// Line identity: `serviceId-categoryId`, or `serviceId-custom` when the
/// category is missing or empty
pub fn line_id(service_id: &str, category_id: Option<&str>) -> String {
    let category = category_id.filter(|c| !c.is_empty()).unwrap_or(NO_CATEGORY);
    format!("{}-{}", service_id, category)
}

/// Item handed to the store; id and total are computed on insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub service_id: String,
    pub service_name: String,
    /// Free-form tag such as `washiron` or `custom`
    pub service_type: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub description: Option<String>,
    pub icon_name: Option<String>,
}

/// One line of the cart
///
/// The line total is always `unit_price × quantity`; it is computed on read
/// and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineItem {
    id: String,
    pub service_id: String,
    pub service_name: String,
    pub service_type: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub description: Option<String>,
    pub icon_name: Option<String>,
}

impl CartLineItem {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Copy of this line with a different quantity
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

impl From<NewCartItem> for CartLineItem {
    fn from(item: NewCartItem) -> Self {
        Self {
            id: line_id(&item.service_id, item.category_id.as_deref()),
            service_id: item.service_id,
            service_name: item.service_name,
            service_type: item.service_type,
            category_id: item.category_id,
            category_name: item.category_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            description: item.description,
            icon_name: item.icon_name,
        }
    }
}

impl Serialize for CartLineItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("CartLineItem", 11)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("service_id", &self.service_id)?;
        s.serialize_field("service_name", &self.service_name)?;
        s.serialize_field("service_type", &self.service_type)?;
        s.serialize_field("category_id", &self.category_id)?;
        s.serialize_field("category_name", &self.category_name)?;
        s.serialize_field("quantity", &self.quantity)?;
        s.serialize_field("unit_price", &self.unit_price)?;
        s.serialize_field("total_price", &self.total_price())?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("icon_name", &self.icon_name)?;
        s.end()
    }
}

/// Cart lines belonging to one service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceGroup {
    pub service_id: String,
    pub service_name: String,
    pub items: Vec<CartLineItem>,
}

/// The in-progress order
///
/// Empty strings mean "not chosen yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderState {
    /// Lines in insertion order
    pub items: Vec<CartLineItem>,
    pub pickup_date: String,
    pub pickup_time: String,
    pub delivery_date: String,
    pub delivery_time: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub delivery_notes: String,
}

impl OrderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(&self, id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Sum of quantities over all lines
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Sum of line totals
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartLineItem::total_price).sum()
    }

    /// Lines grouped by service, groups ordered by first appearance
    pub fn items_by_service(&self) -> Vec<ServiceGroup> {
        let mut groups: Vec<ServiceGroup> = Vec::new();
        for line in &self.items {
            match groups.iter_mut().find(|g| g.service_id == line.service_id) {
                Some(group) => group.items.push(line.clone()),
                None => groups.push(ServiceGroup {
                    service_id: line.service_id.clone(),
                    service_name: line.service_name.clone(),
                    items: vec![line.clone()],
                }),
            }
        }
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_schedule(&self) -> bool {
        !self.pickup_date.is_empty()
            && !self.pickup_time.is_empty()
            && !self.delivery_date.is_empty()
            && !self.delivery_time.is_empty()
    }

    pub fn has_addresses(&self) -> bool {
        !self.pickup_address.is_empty() && !self.delivery_address.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn new_item(service: &str, category: Option<&str>, price: Decimal, qty: u32) -> NewCartItem {
        NewCartItem {
            service_id: service.to_string(),
            service_name: format!("Service {}", service),
            service_type: "washiron".to_string(),
            category_id: category.map(str::to_string),
            category_name: category.map(|c| format!("Category {}", c)),
            quantity: qty,
            unit_price: price,
            description: None,
            icon_name: None,
        }
    }

    #[test]
    fn test_line_id() {
        assert_eq!(line_id("s1", Some("c1")), "s1-c1");
        assert_eq!(line_id("s1", Some("")), "s1-custom");
        assert_eq!(line_id("s1", None), "s1-custom");
    }

    #[test]
    fn test_line_total_is_derived() {
        let mut line = CartLineItem::from(new_item("s1", Some("c1"), dec!(2.5), 4));
        assert_eq!(line.total_price(), dec!(10));

        line.quantity = 6;
        assert_eq!(line.total_price(), dec!(15));
    }

    #[test]
    fn test_line_serializes_total() {
        let line = CartLineItem::from(new_item("s1", None, dec!(35), 1));
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["id"], "s1-custom");
        assert_eq!(value["total_price"], serde_json::json!(35.0));
    }

    #[test]
    fn test_empty_state_queries() {
        let state = OrderState::new();
        assert_eq!(state.total_items(), 0);
        assert_eq!(state.total_price(), Decimal::ZERO);
        assert!(state.items_by_service().is_empty());
        assert!(!state.has_schedule());
        assert!(!state.has_addresses());
    }

    #[test]
    fn test_items_by_service_keeps_first_appearance_order() {
        let state = OrderState {
            items: vec![
                new_item("s2", Some("c1"), dec!(1), 1).into(),
                new_item("s1", Some("c2"), dec!(1), 1).into(),
                new_item("s2", Some("c3"), dec!(1), 1).into(),
            ],
            ..OrderState::default()
        };

        let groups = state.items_by_service();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].service_id, "s2");
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].service_id, "s1");

        // Partition: every line exactly once
        let total: usize = groups.iter().map(|g| g.items.len()).sum();
        assert_eq!(total, state.items.len());
    }
}
