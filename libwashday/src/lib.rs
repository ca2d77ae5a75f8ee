//! Washday - client library for a pickup-and-delivery laundry service
//!
//! This library holds everything a front-end needs to take a laundry order:
//! the cart store, the checkout flow, typed access to the hosted backend,
//! and the pricing and icon helpers used for display.

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod icons;
pub mod logging;
pub mod money;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use cart::{CartLineItem, NewCartItem, OrderAction, OrderState, OrderStore};
pub use checkout::{CheckoutFlow, CheckoutStep};
pub use config::Config;
pub use error::{Result, WashdayError};
pub use service::{Fetched, WashdayService};
pub use types::{Order, OrderStatus, Profile};
