//! `order` and `reorder`: drive the checkout flow from flags

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use libwashday::checkout::schedule::{parse_date, validate_slot};
use libwashday::checkout::SelectedService;
use libwashday::icons::CUSTOM_SERVICE_TYPE;
use libwashday::money::OrderQuote;
use libwashday::{CheckoutFlow, CheckoutStep, OrderState, OrderStore, WashdayError};
use serde_json::json;

use crate::{output, App, Customer};

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Service id or type tag, e.g. `washiron`
    #[arg(long, required_unless_present = "custom", conflicts_with = "custom")]
    pub service: Option<String>,

    /// Item and quantity, e.g. `--item shirt=3` (repeatable)
    #[arg(long = "item", value_name = "ID=QTY", value_parser = parse_pick)]
    pub items: Vec<(String, u32)>,

    /// Custom request instead of catalog items
    #[arg(long)]
    pub custom: bool,

    /// What to do for a custom request
    #[arg(long, requires = "custom")]
    pub description: Option<String>,

    #[command(flatten)]
    pub details: DetailsArgs,
}

/// Schedule and address choices shared by `order` and `reorder`
#[derive(Args, Debug)]
pub struct DetailsArgs {
    /// Pickup date (YYYY-MM-DD); defaults to tomorrow
    #[arg(long, requires = "delivery")]
    pub pickup: Option<String>,

    /// Delivery date (YYYY-MM-DD); must be after pickup
    #[arg(long, requires = "pickup")]
    pub delivery: Option<String>,

    /// Pickup window, e.g. "09:00 - 11:00"
    #[arg(long)]
    pub pickup_slot: Option<String>,

    /// Delivery window
    #[arg(long)]
    pub delivery_slot: Option<String>,

    /// Pickup address; defaults to your default saved address
    #[arg(long)]
    pub pickup_address: Option<String>,

    /// Delivery address; defaults to the pickup address choice
    #[arg(long)]
    pub delivery_address: Option<String>,

    /// Notes for the courier
    #[arg(long)]
    pub notes: Option<String>,

    /// Show the order summary without placing it
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_pick(input: &str) -> Result<(String, u32), String> {
    let (id, qty) = input
        .split_once('=')
        .ok_or_else(|| format!("expected ID=QTY, got '{}'", input))?;
    let qty: u32 = qty
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in '{}'", input))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing item id in '{}'", input));
    }
    Ok((id.to_string(), qty))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn place(app: &mut App, args: OrderArgs) -> Result<()> {
    let customer = app.signed_in().await?;
    let selected = resolve_service(app, &args).await?;

    let mut flow = CheckoutFlow::new(OrderStore::new(), app.pricing().clone(), today());
    flow.select_service(selected.clone());
    flow.advance().map_err(WashdayError::from)?;

    if selected.is_custom() {
        flow.items_mut()
            .set_description(args.description.as_deref().unwrap_or_default());
    } else {
        let catalog = output::list(app.service.catalog().service_items(&selected.id).await)?;
        flow.load_catalog(catalog);
        let picks: Vec<(&str, u32)> = args
            .items
            .iter()
            .filter(|(_, qty)| *qty > 0)
            .map(|(id, qty)| (id.as_str(), *qty))
            .collect();
        flow.items_mut()
            .quick_add(&picks)
            .map_err(WashdayError::from)?;
    }
    // Items, then cart
    flow.advance().map_err(WashdayError::from)?;
    flow.advance().map_err(WashdayError::from)?;

    finish(app, &customer, flow, &args.details).await
}

pub async fn reorder(app: &mut App, order_id: &str, details: DetailsArgs) -> Result<()> {
    let customer = app.signed_in().await?;
    let past = output::one(app.service.orders().with_items(order_id).await, "orders")?;

    let store = OrderStore::new();
    app.service.orders().reorder(&store, &past);

    let mut flow = CheckoutFlow::new(store, app.pricing().clone(), today());
    flow.open_cart().map_err(WashdayError::from)?;
    flow.advance().map_err(WashdayError::from)?;

    // Past slots carry over when still offered
    let schedule = flow.schedule_mut();
    if let Ok(slot) = validate_slot(&past.order.estimated_pickup_time) {
        schedule.set_pickup_slot(slot).map_err(WashdayError::from)?;
    }
    if let Ok(slot) = validate_slot(&past.order.estimated_dropoff_time) {
        schedule.set_delivery_slot(slot).map_err(WashdayError::from)?;
    }

    let mut details = details;
    if details.pickup_address.is_none() && !past.order.shipping_address.is_empty() {
        details.pickup_address = Some(past.order.shipping_address.clone());
    }
    if details.notes.is_none() && !past.order.special_instructions.is_empty() {
        details.notes = Some(past.order.special_instructions.clone());
    }

    finish(app, &customer, flow, &details).await
}

async fn resolve_service(app: &App, args: &OrderArgs) -> Result<SelectedService> {
    let catalog = app.service.catalog();

    if args.custom {
        let service = catalog.service_by_identifier(CUSTOM_SERVICE_TYPE).await;
        return Ok(match service.data() {
            Some(service) => SelectedService::from(&service),
            None => SelectedService {
                id: String::new(),
                name: String::new(),
                service_type: CUSTOM_SERVICE_TYPE.to_string(),
            },
        });
    }

    let wanted = args.service.as_deref().unwrap_or_default();
    if let Some(service) = catalog.service(wanted).await.data() {
        return Ok(SelectedService::from(&service));
    }
    let service = output::one(catalog.service_by_identifier(wanted).await, "services")?;
    Ok(SelectedService::from(&service))
}

/// Time slots, addresses, summary; then place the order or print the draft
async fn finish(
    app: &App,
    customer: &Customer,
    mut flow: CheckoutFlow,
    details: &DetailsArgs,
) -> Result<()> {
    debug_assert_eq!(flow.step(), CheckoutStep::TimeSlotSelection);

    let schedule = flow.schedule_mut();
    if let (Some(pickup), Some(delivery)) = (&details.pickup, &details.delivery) {
        let pickup = parse_date(pickup).map_err(WashdayError::from)?;
        let delivery = parse_date(delivery).map_err(WashdayError::from)?;
        schedule
            .select_dates(pickup, delivery)
            .map_err(WashdayError::from)?;
    }
    if let Some(slot) = &details.pickup_slot {
        schedule.set_pickup_slot(slot).map_err(WashdayError::from)?;
    }
    if let Some(slot) = &details.delivery_slot {
        schedule.set_delivery_slot(slot).map_err(WashdayError::from)?;
    }
    flow.advance().map_err(WashdayError::from)?;

    let saved = app
        .service
        .addresses()
        .list(&customer.profile.id)
        .await
        .into_vec();
    let mut addresses = libwashday::checkout::AddressSelection::from_saved(&saved);
    if let Some(pickup) = &details.pickup_address {
        addresses.set_pickup(pickup);
        if details.delivery_address.is_none() {
            addresses.set_delivery(pickup);
        }
    }
    if let Some(delivery) = &details.delivery_address {
        addresses.set_delivery(delivery);
    }
    if let Some(notes) = &details.notes {
        addresses.set_notes(notes);
    }
    *flow.addresses_mut() = addresses;
    flow.advance().map_err(WashdayError::from)?;

    let quote = flow.quote();
    if details.dry_run {
        let draft = flow.summary().map_err(WashdayError::from)?;
        return print_draft(app, &draft, &quote);
    }

    let order = flow
        .confirm(app.service.orders(), &customer.profile, &customer.email)
        .await?;

    if app.is_json() {
        output::json(&order)
    } else {
        println!("Placed order {} ({})", order.order_number, order.id);
        println!("Total: {}", libwashday::money::format_price(order.total_amount, app.pricing()));
        Ok(())
    }
}

fn print_draft(app: &App, draft: &OrderState, quote: &OrderQuote) -> Result<()> {
    if app.is_json() {
        output::json(&json!({ "draft": draft, "quote": quote }))
    } else {
        output::draft(draft, quote, app.pricing());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pick() {
        assert_eq!(parse_pick("shirt=3"), Ok(("shirt".to_string(), 3)));
        assert_eq!(parse_pick(" duvet = 1"), Ok(("duvet".to_string(), 1)));
        assert!(parse_pick("shirt").is_err());
        assert!(parse_pick("shirt=many").is_err());
        assert!(parse_pick("=2").is_err());
    }
}
