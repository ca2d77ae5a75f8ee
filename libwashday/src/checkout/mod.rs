//! Checkout: service, items, cart, time slots, addresses, summary

pub mod flow;
pub mod schedule;
pub mod selection;

pub use flow::{CheckoutFlow, CheckoutStep};
pub use schedule::{DateRange, ScheduleSelection, TIME_SLOTS};
pub use selection::{AddressSelection, ItemSelection, SelectedService};
