//! In-progress order: cart lines plus schedule and address fields
//!
//! - Actions: what can happen to the draft
//! - State: the draft itself and its derived queries
//! - Reducer: pure function (State, Action) -> State
//! - Store: shared handle that applies actions and notifies subscribers

pub mod actions;
pub mod reducer;
pub mod state;
pub mod store;

pub use actions::OrderAction;
pub use reducer::reduce;
pub use state::{line_id, CartLineItem, NewCartItem, OrderState, ServiceGroup};
pub use store::OrderStore;
