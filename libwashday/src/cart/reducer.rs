//! Pure reducer for the order draft
//!
//! `(OrderState, OrderAction) -> OrderState` with no I/O. Notification and
//! sharing live in the store.

use super::actions::OrderAction;
use super::state::{line_id, CartLineItem, OrderState};

/// Apply `action` to `state` and return the new draft
///
/// Invalid targets (unknown ids) leave the state unchanged.
pub fn reduce(state: OrderState, action: OrderAction) -> OrderState {
    match action {
        OrderAction::AddItem(item) => {
            if item.quantity == 0 {
                return state;
            }

            let id = line_id(&item.service_id, item.category_id.as_deref());
            let mut items = state.items;
            match items.iter_mut().find(|line| line.id() == id) {
                // Unit price stays as first added; quantity saturates
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity)
                }
                None => items.push(CartLineItem::from(item)),
            }
            OrderState { items, ..state }
        }

        OrderAction::UpdateItemQuantity { id, quantity } => {
            let items = state
                .items
                .into_iter()
                .map(|line| {
                    if line.id() == id {
                        line.with_quantity(quantity)
                    } else {
                        line
                    }
                })
                .filter(|line| line.quantity > 0)
                .collect();
            OrderState { items, ..state }
        }

        OrderAction::RemoveItem { id } => {
            let mut items = state.items;
            items.retain(|line| line.id() != id);
            OrderState { items, ..state }
        }

        OrderAction::ClearCart => OrderState {
            items: Vec::new(),
            ..state
        },

        OrderAction::SetPickupSchedule { date, time } => OrderState {
            pickup_date: date,
            pickup_time: time,
            ..state
        },

        OrderAction::SetDeliverySchedule { date, time } => OrderState {
            delivery_date: date,
            delivery_time: time,
            ..state
        },

        OrderAction::SetAddresses {
            pickup,
            delivery,
            notes,
        } => OrderState {
            pickup_address: pickup,
            delivery_address: delivery,
            delivery_notes: notes,
            ..state
        },

        OrderAction::ResetOrder => OrderState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::state::tests::new_item;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn add(state: OrderState, service: &str, category: Option<&str>, price: Decimal, qty: u32) -> OrderState {
        reduce(state, OrderAction::AddItem(new_item(service, category, price, qty)))
    }

    #[test]
    fn test_reducer_is_pure() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(10), 1);
        let before = state.clone();

        let next = reduce(state.clone(), OrderAction::ClearCart);
        assert_eq!(state, before);
        assert!(next.items.is_empty());
    }

    #[test]
    fn test_repeated_adds_merge_quantities() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(10), 2);
        let state = add(state, "s1", Some("c1"), dec!(10), 3);

        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].quantity, 5);
        assert_eq!(state.items[0].total_price(), dec!(50));
    }

    #[test]
    fn test_merged_quantity_saturates() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(1), 4_000_000_000);
        let state = add(state, "s1", Some("c1"), dec!(1), 4_000_000_000);
        let state = add(state, "s2", None, dec!(1), 1);

        assert_eq!(state.items[0].quantity, u32::MAX);
        assert_eq!(state.total_items(), u32::MAX);
    }

    #[test]
    fn test_merge_keeps_first_unit_price() {
        let mut state = OrderState::new();
        for (price, qty) in [(dec!(4), 1), (dec!(9), 2), (dec!(1), 4)] {
            state = add(state, "s1", Some("c1"), price, qty);
        }

        let line = state.item("s1-c1").unwrap();
        assert_eq!(line.quantity, 7);
        assert_eq!(line.unit_price, dec!(4));
        assert_eq!(line.total_price(), dec!(28));
    }

    #[test]
    fn test_add_with_zero_quantity_is_ignored() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(10), 0);
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_distinct_categories_make_distinct_lines() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(10), 1);
        let state = add(state, "s1", Some("c2"), dec!(5), 1);
        let state = add(state, "s1", None, dec!(35), 1);

        let ids: Vec<_> = state.items.iter().map(|l| l.id().to_string()).collect();
        assert_eq!(ids, vec!["s1-c1", "s1-c2", "s1-custom"]);
    }

    #[test]
    fn test_update_quantity_recomputes_total() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 1);
        let state = reduce(
            state,
            OrderAction::UpdateItemQuantity {
                id: "s1-c1".to_string(),
                quantity: 4,
            },
        );
        assert_eq!(state.items[0].total_price(), dec!(12));
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 2);
        let state = add(state, "s2", Some("c9"), dec!(1), 1);
        let state = reduce(
            state,
            OrderAction::UpdateItemQuantity {
                id: "s1-c1".to_string(),
                quantity: 0,
            },
        );

        assert!(state.item("s1-c1").is_none());
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_update_and_remove_unknown_id_are_noops() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 2);
        let before = state.clone();

        let state = reduce(
            state,
            OrderAction::UpdateItemQuantity {
                id: "nope".to_string(),
                quantity: 9,
            },
        );
        let state = reduce(state, OrderAction::RemoveItem { id: "nope".to_string() });
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_item() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 2);
        let state = reduce(state, OrderAction::RemoveItem { id: "s1-c1".to_string() });
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_clear_cart_keeps_schedule_and_addresses() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 2);
        let state = reduce(
            state,
            OrderAction::SetPickupSchedule {
                date: "2024-06-01".to_string(),
                time: "13:00 - 15:00".to_string(),
            },
        );
        let state = reduce(
            state,
            OrderAction::SetAddresses {
                pickup: "Home".to_string(),
                delivery: "Office".to_string(),
                notes: "Ring twice".to_string(),
            },
        );
        let state = reduce(state, OrderAction::ClearCart);

        assert!(state.items.is_empty());
        assert_eq!(state.pickup_date, "2024-06-01");
        assert_eq!(state.delivery_address, "Office");
        assert_eq!(state.delivery_notes, "Ring twice");
    }

    #[test]
    fn test_schedules_are_independent() {
        let state = reduce(
            OrderState::new(),
            OrderAction::SetPickupSchedule {
                date: "2024-06-01".to_string(),
                time: "13:00 - 15:00".to_string(),
            },
        );
        let state = reduce(
            state,
            OrderAction::SetDeliverySchedule {
                date: "2024-06-02".to_string(),
                time: "15:00 - 17:00".to_string(),
            },
        );
        let state = reduce(
            state,
            OrderAction::SetPickupSchedule {
                date: "2024-06-01".to_string(),
                time: "09:00 - 11:00".to_string(),
            },
        );

        assert_eq!(state.pickup_time, "09:00 - 11:00");
        assert_eq!(state.delivery_date, "2024-06-02");
        assert_eq!(state.delivery_time, "15:00 - 17:00");
    }

    #[test]
    fn test_total_price_matches_sum_of_lines() {
        let mut state = OrderState::new();
        state = add(state, "s1", Some("c1"), dec!(2.50), 3);
        state = add(state, "s2", Some("c2"), dec!(12), 1);
        state = add(state, "s1", Some("c1"), dec!(99), 1);
        state = reduce(
            state,
            OrderAction::UpdateItemQuantity {
                id: "s2-c2".to_string(),
                quantity: 2,
            },
        );

        let expected: Decimal = state
            .items
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        assert_eq!(state.total_price(), expected);
        assert_eq!(state.total_price(), dec!(34));
        assert_eq!(state.total_items(), 6);
    }

    #[test]
    fn test_two_services_make_two_groups() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 1);
        let state = add(state, "s2", Some("c2"), dec!(4), 1);

        let groups = state.items_by_service();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].service_id, "s1");
        assert_eq!(groups[0].items[0].id(), "s1-c1");
        assert_eq!(groups[1].service_id, "s2");
        assert_eq!(groups[1].items[0].id(), "s2-c2");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let state = add(OrderState::new(), "s1", Some("c1"), dec!(3), 1);
        let state = reduce(
            state,
            OrderAction::SetDeliverySchedule {
                date: "2024-06-02".to_string(),
                time: "15:00 - 17:00".to_string(),
            },
        );
        let state = reduce(state, OrderAction::ResetOrder);

        assert_eq!(state, OrderState::default());
        assert_eq!(state.total_items(), 0);
        assert_eq!(state.total_price(), Decimal::ZERO);
        assert!(state.items_by_service().is_empty());
    }
}
