//! Actions applied to the order draft

use super::state::NewCartItem;

/// Every transition the order draft supports
#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    /// Add a line, merging into an existing line with the same id
    AddItem(NewCartItem),

    /// Set a line's quantity; zero removes the line
    UpdateItemQuantity { id: String, quantity: u32 },

    RemoveItem { id: String },

    /// Drop all lines, keeping schedule and addresses
    ClearCart,

    SetPickupSchedule { date: String, time: String },

    SetDeliverySchedule { date: String, time: String },

    SetAddresses {
        pickup: String,
        delivery: String,
        notes: String,
    },

    /// Back to the empty draft
    ResetOrder,
}
