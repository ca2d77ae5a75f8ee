//! Text and JSON rendering of command results

use clap::ValueEnum;
use libwashday::cart::OrderState;
use libwashday::config::PricingConfig;
use libwashday::error::BackendError;
use libwashday::icons::{valid_icon, IconKind};
use libwashday::money::{format_price, OrderQuote};
use libwashday::service::orders::{tracking, Tracking, TrackingStep};
use libwashday::types::{Address, CatalogItem, Category, Order, OrderStats, Service};
use libwashday::{Fetched, WashdayError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Lists: empty is fine, a failed read is an error
pub fn list<T>(fetched: Fetched<Vec<T>>) -> Result<Vec<T>, WashdayError> {
    match fetched {
        Fetched::Data(rows) => Ok(rows),
        Fetched::Empty => Ok(Vec::new()),
        Fetched::Failed(reason) => Err(BackendError::Unavailable(reason).into()),
    }
}

/// Single rows: missing is `NotFound`
pub fn one<T>(fetched: Fetched<T>, what: &str) -> Result<T, WashdayError> {
    fetched.into_result(|| BackendError::NotFound(what.to_string()).into())
}

pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn services(services: &[Service], pricing: &PricingConfig) {
    for service in services {
        let icon = valid_icon(service.icon_name.as_deref(), IconKind::Service, None);
        let popular = if service.is_popular { " *" } else { "" };
        println!(
            "{}  {}{}  [{}]  from {} {}",
            service.id,
            service.name,
            popular,
            icon,
            format_price(service.price_starts_at, pricing),
            service.price_unit
        );
    }
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        let icon = valid_icon(category.icon_name.as_deref(), IconKind::Category, None);
        println!("{}  {}  [{}]", category.id, category.name, icon);
    }
}

pub fn items(items: &[CatalogItem], pricing: &PricingConfig) {
    for entry in items {
        let price = entry
            .item
            .price
            .map(|p| format_price(p, pricing))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  ({})  {}",
            entry.item.id, entry.item.name, entry.category_name, price
        );
    }
}

pub fn orders(orders: &[Order], pricing: &PricingConfig) {
    for order in orders {
        let placed = order
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}  {}  {}  {}  {}  {}",
            order.id,
            order.order_number,
            placed,
            order.status,
            order.service_name,
            format_price(order.total_amount, pricing)
        );
    }
}

pub fn tracking_text(order: &Order) {
    println!("Order {} ({})", order.order_number, order.id);
    match tracking(order) {
        Tracking::Cancelled => println!("  cancelled"),
        Tracking::Step(current) => {
            for step in TrackingStep::ALL {
                let mark = if step < current {
                    "x"
                } else if step == current {
                    ">"
                } else {
                    " "
                };
                println!("  [{}] {}", mark, step.title());
            }
        }
    }
}

pub fn stats(stats: &OrderStats, pricing: &PricingConfig) {
    println!("Orders:        {}", stats.total_orders);
    println!("Total spent:   {}", format_price(stats.total_spent, pricing));
    println!(
        "Average order: {}",
        format_price(stats.average_order_value, pricing)
    );
    if let Some(last) = stats.last_order_date {
        println!("Last order:    {}", last.format("%Y-%m-%d"));
    }
}

pub fn addresses(addresses: &[Address]) {
    for address in addresses {
        let default = if address.is_default { " (default)" } else { "" };
        println!(
            "{}  {}{}  {}",
            address.id,
            address.name,
            default,
            address.one_line()
        );
    }
}

pub fn draft(state: &OrderState, quote: &OrderQuote, pricing: &PricingConfig) {
    for group in state.items_by_service() {
        println!("{}", group.service_name);
        for line in &group.items {
            let label = line
                .category_name
                .as_deref()
                .or(line.description.as_deref())
                .unwrap_or("item");
            println!(
                "  {} x {}  {}",
                line.quantity,
                label,
                format_price(line.total_price(), pricing)
            );
        }
    }
    println!("Pickup:   {} {}", state.pickup_date, state.pickup_time);
    println!("Delivery: {} {}", state.delivery_date, state.delivery_time);
    println!("From:     {}", state.pickup_address);
    println!("To:       {}", state.delivery_address);
    if !state.delivery_notes.is_empty() {
        println!("Notes:    {}", state.delivery_notes);
    }
    println!("Subtotal: {}", format_price(quote.subtotal, pricing));
    println!("Delivery: {}", format_price(quote.delivery_fee, pricing));
    println!("Total:    {}", format_price(quote.total, pricing));
}
