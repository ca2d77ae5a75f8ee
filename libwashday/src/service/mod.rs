//! Service layer for Washday
//!
//! Typed access to the hosted backend, shared by every front-end.
//!
//! # Architecture
//!
//! `WashdayService` is the entry point. It owns one backend handle and one
//! event bus and hands them to the sub-services:
//!
//! - `CatalogService`: services, categories and items
//! - `OrderService`: order history, placement, tracking and stats
//! - `AddressService`: saved addresses
//! - `ProfileService`: profile rows and favorites
//! - `DiscrepancyService`: review of items the facility changed
//! - `AuthSession`: the signed-in user
//!
//! Reads resolve to [`Fetched`]; writes return [`Result`].
//!
//! ```no_run
//! use libwashday::service::WashdayService;
//!
//! # async fn example() -> libwashday::Result<()> {
//! let service = WashdayService::new()?;
//!
//! let services = service.catalog().active_services().await;
//! for s in services.into_vec() {
//!     println!("{}", s.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod addresses;
pub mod auth;
pub mod catalog;
pub mod discrepancy;
pub mod events;
pub mod fetched;
pub mod orders;
pub mod profiles;
pub mod scope;

pub use fetched::Fetched;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use self::addresses::AddressService;
use self::auth::AuthSession;
use self::catalog::CatalogService;
use self::discrepancy::DiscrepancyService;
use self::events::{EventBus, EventReceiver};
use self::orders::OrderService;
use self::profiles::ProfileService;
use crate::backend::{self, decode_first, decode_rows, Backend, Query};
use crate::{Config, Result};

/// Select and decode rows
pub(crate) async fn select_rows<T: DeserializeOwned>(
    backend: &dyn Backend,
    table: &str,
    query: &Query,
) -> Result<Vec<T>> {
    decode_rows(backend.select(table, query).await?)
}

/// Select and decode the first matching row
pub(crate) async fn select_one<T: DeserializeOwned>(
    backend: &dyn Backend,
    table: &str,
    query: &Query,
) -> Result<Option<T>> {
    let query = query.clone().limit(1);
    decode_first(backend.select(table, &query).await?)
}

/// Main service facade
///
/// All sub-services share the same `Arc<dyn Backend>` and event bus. The
/// auth session is held behind the facade so the access token set on sign
/// in applies to every later table request.
pub struct WashdayService {
    config: Arc<Config>,
    backend: Arc<dyn Backend>,
    catalog: CatalogService,
    orders: OrderService,
    addresses: AddressService,
    profiles: ProfileService,
    discrepancies: DiscrepancyService,
    auth: AuthSession,
    event_bus: EventBus,
}

impl WashdayService {
    /// Create a service from the default configuration file
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config)
    }

    /// Create a service with the backend selected by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let backend = backend::from_config(&config)?;
        Ok(Self::with_backend(backend, config))
    }

    /// Create a service around an existing backend
    pub fn with_backend(backend: Arc<dyn Backend>, config: Config) -> Self {
        tracing::debug!(backend = backend.name(), "initializing service layer");

        let config = Arc::new(config);
        let event_bus = EventBus::default();

        let catalog = CatalogService::new(Arc::clone(&backend));
        let orders = OrderService::new(Arc::clone(&backend), event_bus.clone());
        let addresses = AddressService::new(Arc::clone(&backend), event_bus.clone());
        let profiles = ProfileService::new(Arc::clone(&backend));
        let discrepancies = DiscrepancyService::new(Arc::clone(&backend));
        let auth = AuthSession::new(Arc::clone(&backend), profiles.clone(), event_bus.clone());

        Self {
            config,
            backend,
            catalog,
            orders,
            addresses,
            profiles,
            discrepancies,
            auth,
            event_bus,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The raw backend, for calls the sub-services do not cover
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn addresses(&self) -> &AddressService {
        &self.addresses
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn discrepancies(&self) -> &DiscrepancyService {
        &self.discrepancies
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Mutable access for sign in and sign out
    pub fn auth_mut(&mut self) -> &mut AuthSession {
        &mut self.auth
    }

    /// Subscribe to session and order events
    ///
    /// Multiple subscribers are supported; each receives every event
    /// emitted after it subscribed.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::service::events::Event;
    use crate::types::tables;
    use serde_json::json;

    fn service() -> WashdayService {
        let backend = MockBackend::new()
            .with_rows(
                tables::SERVICES,
                vec![json!({ "id": "s1", "name": "Wash & Iron", "service_identifier": "washiron", "status": true })],
            )
            .with_account("u1", "ada@example.com", "secret");
        WashdayService::with_backend(Arc::new(backend), Config::default_config())
    }

    #[tokio::test]
    async fn test_facade_shares_backend() {
        let service = service();
        assert_eq!(service.backend().name(), "memory");
        assert_eq!(service.catalog().active_services().await.into_vec().len(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_reaches_subscribers() {
        let mut service = service();
        let mut rx = service.subscribe();

        service
            .auth_mut()
            .sign_in("ada@example.com", "secret")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            Event::SessionChanged {
                user_id: Some("u1".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_select_one_limits_to_first_row() {
        let backend = MockBackend::new().with_rows(
            tables::ITEMS,
            vec![
                json!({ "id": "a", "sequence": 2 }),
                json!({ "id": "b", "sequence": 1 }),
            ],
        );
        let row: Option<serde_json::Value> = select_one(
            &backend,
            tables::ITEMS,
            &Query::new().order_asc("sequence"),
        )
        .await
        .unwrap();
        assert_eq!(row.unwrap()["id"], "b");
    }
}
