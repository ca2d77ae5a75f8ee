//! Row types exchanged with the hosted backend
//!
//! Field names follow the backend's column names so rows (de)serialize
//! without renaming. Optional and defaulted fields tolerate partially
//! populated rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend table names
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
    pub const SERVICES: &str = "services";
    pub const CATEGORIES: &str = "categories";
    pub const ITEMS: &str = "items";
    pub const USER_ADDRESSES: &str = "user_addresses";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default = "empty_object")]
    pub preferences: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Item ids the user marked as favorite
    pub fn favorites(&self) -> Vec<String> {
        self.preferences
            .get("favorites")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Currency chosen in the account settings, if any
    pub fn preferred_currency(&self) -> Option<&str> {
        self.preferences.get("currency").and_then(Value::as_str)
    }
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub price_starts_at: Decimal,
    #[serde(default)]
    pub price_unit: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    /// Service type tag, e.g. `washiron` or `custom`
    pub service_identifier: String,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default = "default_true")]
    pub status: bool,
    pub color_hex: Option<String>,
    pub icon_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Service {
    pub fn is_custom(&self) -> bool {
        self.service_identifier == crate::icons::CUSTOM_SERVICE_TYPE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub service_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
    pub icon_name: Option<String>,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default = "default_true")]
    pub status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default = "default_true")]
    pub status: bool,
    pub icon_name: Option<String>,
}

/// An item annotated with its parent category for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    #[serde(flatten)]
    pub item: Item,
    pub category_name: String,
    /// Category icon, falling back to the item's own icon
    pub display_icon: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    PickedUp,
    Processing,
    OutForDelivery,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::PickedUp => "picked_up",
            Self::Processing => "processing",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub order_number: String,
    pub user_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub shipping_address: String,
    /// Where the courier collects; empty on rows written before it was recorded
    #[serde(default)]
    pub pickup_address: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub special_instructions: String,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pickup_date: String,
    #[serde(default)]
    pub delivery_date: String,
    #[serde(default)]
    pub estimated_pickup_time: String,
    #[serde(default)]
    pub estimated_dropoff_time: String,
    #[serde(default)]
    pub is_pickup_completed: bool,
    #[serde(default)]
    pub is_facility_processing: bool,
    #[serde(default)]
    pub is_dropoff_completed: bool,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    #[serde(default)]
    pub has_discrepancy: bool,
    pub facility_updated_items: Option<Vec<FacilityUpdatedItem>>,
    pub facility_notes: Option<String>,
    pub customer_item_decision: Option<String>,
}

/// Insert payload for a new order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub user_id: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub pickup_address: String,
    pub status: OrderStatus,
    pub special_instructions: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
    pub pickup_date: String,
    pub delivery_date: String,
    pub estimated_pickup_time: String,
    pub estimated_dropoff_time: String,
    pub service_id: String,
    pub service_name: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub service_id: String,
    /// Line details; absent on older rows, which fall back to the order's
    pub service_name: Option<String>,
    pub service_type: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for one cart line of a placed order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrderItem {
    pub order_id: String,
    pub service_id: String,
    pub service_name: String,
    pub service_type: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Customer decision on an item the facility reported differently
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

impl std::fmt::Display for DiscrepancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

/// An item entry the facility changed after pickup
///
/// Unknown keys are kept in `extra` so the list can be written back intact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacilityUpdatedItem {
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub quantity: u32,
    pub price: Option<Decimal>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub status: DiscrepancyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub street: String,
    pub house_number: String,
    pub additional_info: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Address {
    /// Single-line form used for order fields
    pub fn one_line(&self) -> String {
        let mut line = format!("{} {}", self.street, self.house_number);
        if let Some(info) = self.additional_info.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(", ");
            line.push_str(info);
        }
        format!("{}, {} {}", line, self.postal_code, self.city)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAddress {
    pub user_id: String,
    pub name: String,
    pub street: String,
    pub house_number: String,
    pub additional_info: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Aggregates over a user's non-cancelled orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderStats {
    pub total_orders: usize,
    pub total_spent: Decimal,
    pub average_order_value: Decimal,
    pub last_order_date: Option<DateTime<Utc>>,
}

impl OrderStats {
    pub fn empty() -> Self {
        Self {
            total_orders: 0,
            total_spent: Decimal::ZERO,
            average_order_value: Decimal::ZERO,
            last_order_date: None,
        }
    }
}
