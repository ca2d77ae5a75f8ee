//! Saved pickup and delivery addresses

use std::sync::Arc;

use serde_json::{json, Value};

use super::events::{Event, EventBus};
use super::fetched::Fetched;
use super::select_rows;
use crate::backend::{decode_first, encode_row, Backend, Query};
use crate::error::{BackendError, Result};
use crate::types::{tables, Address, NewAddress};

#[derive(Clone)]
pub struct AddressService {
    backend: Arc<dyn Backend>,
    events: EventBus,
}

impl AddressService {
    pub fn new(backend: Arc<dyn Backend>, events: EventBus) -> Self {
        Self { backend, events }
    }

    /// Default address first, then oldest first
    pub async fn list(&self, user_id: &str) -> Fetched<Vec<Address>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_desc("is_default")
            .order_asc("created_at");
        Fetched::from_list(
            select_rows(self.backend.as_ref(), tables::USER_ADDRESSES, &query).await,
            "addresses",
        )
    }

    pub async fn add(&self, address: &NewAddress) -> Result<Address> {
        let rows = self
            .backend
            .insert(tables::USER_ADDRESSES, vec![encode_row(address)?])
            .await?;
        decode_first(rows)?.ok_or_else(not_found)
    }

    pub async fn update(&self, address_id: &str, patch: Value) -> Result<Address> {
        let rows = self
            .backend
            .update(
                tables::USER_ADDRESSES,
                &Query::new().eq("id", address_id),
                patch,
            )
            .await?;
        decode_first(rows)?.ok_or_else(not_found)
    }

    pub async fn delete(&self, address_id: &str) -> Result<()> {
        self.backend
            .delete(tables::USER_ADDRESSES, &Query::new().eq("id", address_id))
            .await
    }

    /// Make one address the user's only default
    ///
    /// Two separate writes: clear the flag on every address of the user,
    /// then set it on `address_id`. They are not atomic. A reader between
    /// the writes sees no default, and if the second write fails the user
    /// is left without one.
    pub async fn set_default(&self, user_id: &str, address_id: &str) -> Result<Address> {
        self.backend
            .update(
                tables::USER_ADDRESSES,
                &Query::new().eq("user_id", user_id),
                json!({ "is_default": false }),
            )
            .await?;

        tracing::warn!(
            user_id = %user_id,
            address_id = %address_id,
            "default address cleared; setting new default in a separate write"
        );

        let rows = self
            .backend
            .update(
                tables::USER_ADDRESSES,
                &Query::new().eq("id", address_id).eq("user_id", user_id),
                json!({ "is_default": true }),
            )
            .await?;
        let address: Address = decode_first(rows)?.ok_or_else(not_found)?;

        self.events.emit(Event::DefaultAddressChanged {
            user_id: user_id.to_string(),
            address_id: address.id.clone(),
        });
        Ok(address)
    }
}

fn not_found() -> crate::error::WashdayError {
    BackendError::NotFound(tables::USER_ADDRESSES.to_string()).into()
}
