//! Item and address choices made during checkout

use serde::{Deserialize, Serialize};

use crate::cart::NewCartItem;
use crate::config::PricingConfig;
use crate::error::CheckoutError;
use crate::icons::{CUSTOM_ITEM_ICON, CUSTOM_SERVICE_TYPE};
use crate::types::{Address, CatalogItem, Service};

/// The service chosen in the first step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedService {
    pub id: String,
    pub name: String,
    /// Type tag, e.g. `washiron` or `custom`
    pub service_type: String,
}

impl SelectedService {
    pub fn is_custom(&self) -> bool {
        self.service_type == CUSTOM_SERVICE_TYPE
    }
}

impl From<&Service> for SelectedService {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            service_type: service.service_identifier.clone(),
        }
    }
}

/// Quantities picked from a service's catalog, or a custom description
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSelection {
    catalog: Vec<CatalogItem>,
    /// Selection order is kept so cart lines appear in the order picked
    quantities: Vec<(String, u32)>,
    description: String,
}

impl ItemSelection {
    pub fn new(catalog: Vec<CatalogItem>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    fn find(&self, item_id: &str) -> Result<&CatalogItem, CheckoutError> {
        self.catalog
            .iter()
            .find(|c| c.item.id == item_id)
            .ok_or_else(|| CheckoutError::UnknownItem(item_id.to_string()))
    }

    fn entry(&mut self, item_id: &str) -> &mut u32 {
        let index = match self.quantities.iter().position(|(id, _)| id == item_id) {
            Some(index) => index,
            None => {
                self.quantities.push((item_id.to_string(), 0));
                self.quantities.len() - 1
            }
        };
        &mut self.quantities[index].1
    }

    pub fn quantity(&self, item_id: &str) -> u32 {
        self.quantities
            .iter()
            .find(|(id, _)| id == item_id)
            .map_or(0, |(_, qty)| *qty)
    }

    pub fn set_quantity(&mut self, item_id: &str, quantity: u32) -> Result<(), CheckoutError> {
        self.find(item_id)?;
        *self.entry(item_id) = quantity;
        Ok(())
    }

    pub fn increment(&mut self, item_id: &str) -> Result<u32, CheckoutError> {
        self.find(item_id)?;
        let qty = self.entry(item_id);
        *qty = qty.saturating_add(1);
        Ok(*qty)
    }

    /// Decrease by one, never below zero
    pub fn decrement(&mut self, item_id: &str) -> Result<u32, CheckoutError> {
        self.find(item_id)?;
        let qty = self.entry(item_id);
        *qty = qty.saturating_sub(1);
        Ok(*qty)
    }

    /// Add several quantities at once; nothing changes if any id is unknown
    ///
    /// Quantities saturate at `u32::MAX`.
    pub fn quick_add(&mut self, picks: &[(&str, u32)]) -> Result<(), CheckoutError> {
        for (item_id, _) in picks {
            self.find(item_id)?;
        }
        for (item_id, quantity) in picks {
            let qty = self.entry(item_id);
            *qty = qty.saturating_add(*quantity);
        }
        Ok(())
    }

    /// Total units selected
    pub fn total_selected(&self) -> u32 {
        self.quantities
            .iter()
            .fold(0u32, |acc, (_, qty)| acc.saturating_add(*qty))
    }

    /// Units selected from one category
    pub fn category_total(&self, category_id: &str) -> u32 {
        self.quantities
            .iter()
            .filter(|(id, _)| {
                self.catalog
                    .iter()
                    .any(|c| c.item.id == *id && c.item.category_id == category_id)
            })
            .fold(0u32, |acc, (_, qty)| acc.saturating_add(*qty))
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Some quantity is positive, or for a custom service the description is non-blank
    pub fn is_complete(&self, service: &SelectedService) -> bool {
        if service.is_custom() {
            !self.description.trim().is_empty()
        } else {
            self.total_selected() > 0
        }
    }

    /// Cart lines for the current selection
    pub fn to_cart_items(&self, service: &SelectedService, pricing: &PricingConfig) -> Vec<NewCartItem> {
        if service.is_custom() {
            let description = self.description.trim();
            if description.is_empty() {
                return Vec::new();
            }
            return vec![custom_item(service, description, pricing)];
        }

        self.quantities
            .iter()
            .filter(|(_, qty)| *qty > 0)
            .filter_map(|(id, qty)| {
                let entry = self.catalog.iter().find(|c| c.item.id == *id)?;
                Some(NewCartItem {
                    service_id: service.id.clone(),
                    service_name: service.name.clone(),
                    service_type: service.service_type.clone(),
                    category_id: Some(entry.item.category_id.clone()),
                    category_name: Some(entry.category_name.clone()),
                    quantity: *qty,
                    unit_price: entry.item.price.unwrap_or(pricing.fallback_unit_price),
                    description: None,
                    icon_name: entry.display_icon.clone(),
                })
            })
            .collect()
    }
}

/// A single custom request line
pub fn custom_item(service: &SelectedService, description: &str, pricing: &PricingConfig) -> NewCartItem {
    let service_id = if service.id.is_empty() {
        CUSTOM_SERVICE_TYPE.to_string()
    } else {
        service.id.clone()
    };
    let service_name = if service.name.is_empty() {
        "Custom Service".to_string()
    } else {
        service.name.clone()
    };

    NewCartItem {
        service_id,
        service_name,
        service_type: CUSTOM_SERVICE_TYPE.to_string(),
        category_id: None,
        category_name: None,
        quantity: 1,
        unit_price: pricing.custom_item_price,
        description: Some(description.trim().to_string()),
        icon_name: Some(CUSTOM_ITEM_ICON.to_string()),
    }
}

/// Pickup/delivery address choice plus courier notes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSelection {
    pickup: Option<String>,
    delivery: Option<String>,
    notes: String,
}

impl AddressSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-select the user's default saved address for both legs
    pub fn from_saved(addresses: &[Address]) -> Self {
        let default = addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| addresses.first())
            .map(Address::one_line);
        Self {
            pickup: default.clone(),
            delivery: default,
            notes: String::new(),
        }
    }

    pub fn set_pickup(&mut self, address: &str) {
        self.pickup = Some(address.trim().to_string()).filter(|a| !a.is_empty());
    }

    pub fn set_delivery(&mut self, address: &str) {
        self.delivery = Some(address.trim().to_string()).filter(|a| !a.is_empty());
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.notes = notes.to_string();
    }

    pub fn pickup(&self) -> Option<&str> {
        self.pickup.as_deref()
    }

    pub fn delivery(&self) -> Option<&str> {
        self.delivery.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_complete(&self) -> bool {
        self.pickup.is_some() && self.delivery.is_some()
    }
}
