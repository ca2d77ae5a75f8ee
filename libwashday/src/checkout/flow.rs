//! Checkout state machine
//!
//! Six steps in fixed order, each gated by a completion predicate. Moving
//! forward runs the step's exit action against the [`OrderStore`]; moving
//! back is always allowed and keeps everything entered so far.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::schedule::{format_date, ScheduleSelection};
use super::selection::{AddressSelection, ItemSelection, SelectedService};
use crate::cart::{OrderState, OrderStore};
use crate::config::PricingConfig;
use crate::error::{CheckoutError, Result};
use crate::money::OrderQuote;
use crate::service::orders::OrderService;
use crate::types::{CatalogItem, Order, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    ServiceSelection,
    ItemSelection,
    Cart,
    TimeSlotSelection,
    AddressSelection,
    OrderSummary,
}

impl CheckoutStep {
    pub const ALL: [CheckoutStep; 6] = [
        CheckoutStep::ServiceSelection,
        CheckoutStep::ItemSelection,
        CheckoutStep::Cart,
        CheckoutStep::TimeSlotSelection,
        CheckoutStep::AddressSelection,
        CheckoutStep::OrderSummary,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ServiceSelection => "service selection",
            Self::ItemSelection => "item selection",
            Self::Cart => "cart",
            Self::TimeSlotSelection => "time slot selection",
            Self::AddressSelection => "address selection",
            Self::OrderSummary => "order summary",
        };
        write!(f, "{}", label)
    }
}

/// One pass through checkout
///
/// Holds the per-step selections; only exit actions write into the shared
/// store. Nothing here is persisted.
#[derive(Debug)]
pub struct CheckoutFlow {
    store: OrderStore,
    pricing: PricingConfig,
    step: CheckoutStep,
    service: Option<SelectedService>,
    items: ItemSelection,
    schedule: ScheduleSelection,
    addresses: AddressSelection,
}

impl CheckoutFlow {
    pub fn new(store: OrderStore, pricing: PricingConfig, today: NaiveDate) -> Self {
        Self {
            store,
            pricing,
            step: CheckoutStep::ServiceSelection,
            service: None,
            items: ItemSelection::default(),
            schedule: ScheduleSelection::new(today),
            addresses: AddressSelection::new(),
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn service(&self) -> Option<&SelectedService> {
        self.service.as_ref()
    }

    /// Choose the service; a different service starts a fresh item selection
    pub fn select_service(&mut self, service: SelectedService) {
        if self.service.as_ref() != Some(&service) {
            self.items = ItemSelection::default();
        }
        self.service = Some(service);
    }

    /// Catalog for the chosen service, as fetched by the caller
    pub fn load_catalog(&mut self, catalog: Vec<CatalogItem>) {
        self.items = ItemSelection::new(catalog);
    }

    pub fn items(&self) -> &ItemSelection {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ItemSelection {
        &mut self.items
    }

    pub fn schedule(&self) -> &ScheduleSelection {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut ScheduleSelection {
        &mut self.schedule
    }

    pub fn addresses(&self) -> &AddressSelection {
        &self.addresses
    }

    pub fn addresses_mut(&mut self) -> &mut AddressSelection {
        &mut self.addresses
    }

    /// Whether the current step's predicate holds
    pub fn can_continue(&self) -> bool {
        match self.step {
            CheckoutStep::ServiceSelection => self.service.is_some(),
            CheckoutStep::ItemSelection => self
                .service
                .as_ref()
                .is_some_and(|s| self.items.is_complete(s)),
            CheckoutStep::Cart => self.store.total_items() > 0,
            CheckoutStep::TimeSlotSelection => self.schedule.is_complete(),
            CheckoutStep::AddressSelection => self.addresses.is_complete(),
            CheckoutStep::OrderSummary => false,
        }
    }

    /// Run the exit action and move to the next step
    ///
    /// # Errors
    ///
    /// [`CheckoutError::StepIncomplete`] while the predicate is false, and
    /// always from the terminal summary step, which completes through
    /// [`CheckoutFlow::confirm`].
    pub fn advance(&mut self) -> std::result::Result<CheckoutStep, CheckoutError> {
        if !self.can_continue() {
            return Err(CheckoutError::StepIncomplete(self.step));
        }

        match self.step {
            CheckoutStep::ItemSelection => {
                let service = self.service.as_ref().ok_or(CheckoutError::NoServiceSelected)?;
                for item in self.items.to_cart_items(service, &self.pricing) {
                    self.store.add_item(item);
                }
                self.items = ItemSelection::new(self.items.catalog().to_vec());
            }
            CheckoutStep::TimeSlotSelection => {
                let (Some(pickup), Some(delivery), Some(pickup_slot), Some(delivery_slot)) = (
                    self.schedule.pickup_date(),
                    self.schedule.delivery_date(),
                    self.schedule.pickup_slot(),
                    self.schedule.delivery_slot(),
                ) else {
                    return Err(CheckoutError::StepIncomplete(self.step));
                };
                self.store.set_pickup_schedule(&format_date(pickup), pickup_slot);
                self.store.set_delivery_schedule(&format_date(delivery), delivery_slot);
            }
            CheckoutStep::AddressSelection => {
                let (Some(pickup), Some(delivery)) = (self.addresses.pickup(), self.addresses.delivery())
                else {
                    return Err(CheckoutError::StepIncomplete(self.step));
                };
                self.store.set_addresses(pickup, delivery, self.addresses.notes());
            }
            CheckoutStep::ServiceSelection | CheckoutStep::Cart | CheckoutStep::OrderSummary => {}
        }

        if let Some(next) = self.step.next() {
            tracing::debug!(from = %self.step, to = %next, "checkout advance");
            self.step = next;
        }
        Ok(self.step)
    }

    /// Jump straight to the cart step, e.g. after refilling the store
    /// from a past order
    pub fn open_cart(&mut self) -> std::result::Result<CheckoutStep, CheckoutError> {
        if self.store.total_items() == 0 {
            return Err(CheckoutError::StepIncomplete(CheckoutStep::Cart));
        }
        self.step = CheckoutStep::Cart;
        Ok(self.step)
    }

    /// Step back; entered data is kept
    pub fn back(&mut self) -> CheckoutStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// From the cart, return to service selection to add another service
    pub fn add_another_service(&mut self) {
        self.service = None;
        self.items = ItemSelection::default();
        self.step = CheckoutStep::ServiceSelection;
    }

    /// Price breakdown of the current cart
    pub fn quote(&self) -> OrderQuote {
        let state = self.store.state();
        OrderQuote::new(state.total_price(), state.total_items(), self.pricing.delivery_fee)
    }

    /// Draft ready for submission, if the flow reached the summary
    pub fn summary(&self) -> std::result::Result<OrderState, CheckoutError> {
        if self.step != CheckoutStep::OrderSummary {
            return Err(CheckoutError::StepIncomplete(self.step));
        }
        Ok(self.store.state())
    }

    /// Submit the order, then reset the store and the flow
    ///
    /// The store is left untouched when submission fails so the user can
    /// retry.
    pub async fn confirm(
        &mut self,
        orders: &OrderService,
        profile: &Profile,
        email: &str,
    ) -> Result<Order> {
        let state = self.summary()?;
        let quote = self.quote();
        let order = orders.place_order(profile, email, &state, &quote).await?;

        self.store.reset_order();
        let today = self.schedule.today();
        *self = Self::new(self.store.clone(), self.pricing.clone(), today);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::schedule::parse_date;
    use crate::checkout::selection::tests::{catalog_item, wash_service};
    use rust_decimal_macros::dec;

    fn flow() -> CheckoutFlow {
        CheckoutFlow::new(
            OrderStore::new(),
            PricingConfig::default(),
            parse_date("2024-06-01").unwrap(),
        )
    }

    fn catalog() -> Vec<CatalogItem> {
        vec![
            catalog_item("shirt", "c1", Some(dec!(4))),
            catalog_item("duvet", "c2", Some(dec!(20))),
        ]
    }

    #[test]
    fn test_step_order_and_labels() {
        assert_eq!(CheckoutStep::ServiceSelection.next(), Some(CheckoutStep::ItemSelection));
        assert_eq!(CheckoutStep::OrderSummary.next(), None);
        assert_eq!(CheckoutStep::ServiceSelection.previous(), None);
        assert_eq!(CheckoutStep::Cart.previous(), Some(CheckoutStep::ItemSelection));
        assert_eq!(CheckoutStep::TimeSlotSelection.to_string(), "time slot selection");
    }

    #[test]
    fn test_forward_blocked_until_service_chosen() {
        let mut flow = flow();
        assert_eq!(
            flow.advance(),
            Err(CheckoutError::StepIncomplete(CheckoutStep::ServiceSelection))
        );

        flow.select_service(wash_service());
        assert_eq!(flow.advance(), Ok(CheckoutStep::ItemSelection));
    }

    #[test]
    fn test_item_selection_exit_pushes_lines() {
        let mut flow = flow();
        flow.select_service(wash_service());
        flow.advance().unwrap();
        flow.load_catalog(catalog());

        assert!(!flow.can_continue());
        flow.items_mut().quick_add(&[("shirt", 3), ("duvet", 1)]).unwrap();
        assert_eq!(flow.advance(), Ok(CheckoutStep::Cart));

        let state = flow.store().state();
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.total_price(), dec!(32));
        assert_eq!(flow.items().total_selected(), 0);
    }

    #[test]
    fn test_full_walk_writes_schedule_and_addresses() {
        let mut flow = flow();
        flow.select_service(wash_service());
        flow.advance().unwrap();
        flow.load_catalog(catalog());
        flow.items_mut().increment("shirt").unwrap();
        flow.advance().unwrap();
        assert_eq!(flow.advance(), Ok(CheckoutStep::TimeSlotSelection));

        flow.schedule_mut()
            .select_dates(parse_date("2024-06-03").unwrap(), parse_date("2024-06-05").unwrap())
            .unwrap();
        flow.schedule_mut().set_pickup_slot("09:00 - 11:00").unwrap();
        assert_eq!(flow.advance(), Ok(CheckoutStep::AddressSelection));

        assert!(!flow.can_continue());
        flow.addresses_mut().set_pickup("Main Street 1");
        flow.addresses_mut().set_delivery("Office Park 7");
        flow.addresses_mut().set_notes("Back door");
        assert_eq!(flow.advance(), Ok(CheckoutStep::OrderSummary));

        let state = flow.summary().unwrap();
        assert_eq!(state.pickup_date, "2024-06-03");
        assert_eq!(state.pickup_time, "09:00 - 11:00");
        assert_eq!(state.delivery_date, "2024-06-05");
        assert_eq!(state.delivery_time, "15:00 - 17:00");
        assert_eq!(state.delivery_notes, "Back door");

        assert_eq!(
            flow.advance(),
            Err(CheckoutError::StepIncomplete(CheckoutStep::OrderSummary))
        );
        assert_eq!(flow.quote().total, dec!(9));
    }

    #[test]
    fn test_empty_cart_blocks_cart_step() {
        let mut flow = flow();
        flow.select_service(wash_service());
        flow.advance().unwrap();
        flow.load_catalog(catalog());
        flow.items_mut().increment("shirt").unwrap();
        flow.advance().unwrap();

        flow.store().clear_cart();
        assert_eq!(
            flow.advance(),
            Err(CheckoutError::StepIncomplete(CheckoutStep::Cart))
        );
    }

    #[test]
    fn test_back_keeps_data() {
        let mut flow = flow();
        flow.select_service(wash_service());
        flow.advance().unwrap();
        flow.load_catalog(catalog());
        flow.items_mut().increment("duvet").unwrap();

        assert_eq!(flow.back(), CheckoutStep::ServiceSelection);
        assert_eq!(flow.back(), CheckoutStep::ServiceSelection);
        flow.select_service(wash_service());
        flow.advance().unwrap();
        assert_eq!(flow.items().quantity("duvet"), 1);
    }

    #[test]
    fn test_add_another_service_returns_to_start() {
        let mut flow = flow();
        flow.select_service(wash_service());
        flow.advance().unwrap();
        flow.load_catalog(catalog());
        flow.items_mut().increment("shirt").unwrap();
        flow.advance().unwrap();

        flow.add_another_service();
        assert_eq!(flow.step(), CheckoutStep::ServiceSelection);
        assert!(flow.service().is_none());
        assert_eq!(flow.store().total_items(), 1);
    }

    #[test]
    fn test_summary_requires_terminal_step() {
        let flow = flow();
        assert!(flow.summary().is_err());
    }

    #[tokio::test]
    async fn test_confirm_submits_and_resets() {
        use crate::backend::mock::MockBackend;
        use crate::service::events::EventBus;
        use crate::types::tables;
        use std::sync::Arc;

        let backend = Arc::new(MockBackend::new());
        let orders = OrderService::new(backend.clone(), EventBus::default());
        let profile: Profile =
            serde_json::from_value(serde_json::json!({ "id": "u1", "first_name": "Ada" })).unwrap();

        let mut flow = flow();
        flow.select_service(wash_service());
        flow.advance().unwrap();
        flow.load_catalog(catalog());
        flow.items_mut().increment("duvet").unwrap();
        flow.advance().unwrap();
        flow.advance().unwrap();
        flow.advance().unwrap();
        flow.addresses_mut().set_pickup("Main Street 1");
        flow.addresses_mut().set_delivery("Main Street 1");
        flow.advance().unwrap();

        let order = flow.confirm(&orders, &profile, "ada@example.com").await.unwrap();
        assert_eq!(order.total_amount, dec!(25));
        assert_eq!(order.email, "ada@example.com");
        assert_eq!(backend.rows(tables::ORDER_ITEMS).len(), 1);

        assert_eq!(flow.step(), CheckoutStep::ServiceSelection);
        assert!(flow.store().state().is_empty());
    }

    #[test]
    fn test_open_cart_needs_lines() {
        let mut flow = flow();
        assert_eq!(
            flow.open_cart(),
            Err(CheckoutError::StepIncomplete(CheckoutStep::Cart))
        );

        flow.store()
            .add_item(crate::cart::state::tests::new_item("s1", None, dec!(10), 2));
        assert_eq!(flow.open_cart(), Ok(CheckoutStep::Cart));
        assert_eq!(flow.advance(), Ok(CheckoutStep::TimeSlotSelection));
    }
}
