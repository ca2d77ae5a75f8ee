//! Services, categories and items

use std::sync::Arc;

use futures::future::try_join_all;

use super::fetched::Fetched;
use super::{select_one, select_rows};
use crate::backend::{Backend, Query};
use crate::types::{tables, CatalogItem, Category, Item, Service};

const UNKNOWN_CATEGORY: &str = "Unknown Category";

/// Read-only access to the service catalog
#[derive(Clone)]
pub struct CatalogService {
    backend: Arc<dyn Backend>,
}

impl CatalogService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Active services ordered by `sequence`
    pub async fn active_services(&self) -> Fetched<Vec<Service>> {
        let query = Query::new().eq("status", true).order_asc("sequence");
        Fetched::from_list(
            select_rows(self.backend.as_ref(), tables::SERVICES, &query).await,
            "active services",
        )
    }

    /// Active services flagged popular
    pub async fn popular_services(&self) -> Fetched<Vec<Service>> {
        let query = Query::new()
            .eq("status", true)
            .eq("is_popular", true)
            .order_asc("sequence");
        Fetched::from_list(
            select_rows(self.backend.as_ref(), tables::SERVICES, &query).await,
            "popular services",
        )
    }

    pub async fn service(&self, service_id: &str) -> Fetched<Service> {
        let query = Query::new().eq("id", service_id);
        Fetched::from_option(
            select_one(self.backend.as_ref(), tables::SERVICES, &query).await,
            "service",
        )
    }

    /// Active service by its type tag
    pub async fn service_by_identifier(&self, identifier: &str) -> Fetched<Service> {
        let query = Query::new()
            .eq("service_identifier", identifier)
            .eq("status", true);
        Fetched::from_option(
            select_one(self.backend.as_ref(), tables::SERVICES, &query).await,
            "service by identifier",
        )
    }

    /// Active categories of a service ordered by `sequence`
    pub async fn categories(&self, service_id: &str) -> Fetched<Vec<Category>> {
        let query = Query::new()
            .eq("service_id", service_id)
            .eq("status", true)
            .order_asc("sequence");
        Fetched::from_list(
            select_rows(self.backend.as_ref(), tables::CATEGORIES, &query).await,
            "categories",
        )
    }

    pub async fn category(&self, category_id: &str) -> Fetched<Category> {
        let query = Query::new().eq("id", category_id);
        Fetched::from_option(
            select_one(self.backend.as_ref(), tables::CATEGORIES, &query).await,
            "category",
        )
    }

    /// Active items of a category, annotated with the category's name and icon
    ///
    /// A missing category does not fail the read; items then carry
    /// "Unknown Category" and their own icon.
    pub async fn items(&self, category_id: &str) -> Fetched<Vec<CatalogItem>> {
        let query = Query::new()
            .eq("category_id", category_id)
            .eq("status", true)
            .order_asc("sequence");
        let items: Fetched<Vec<Item>> = Fetched::from_list(
            select_rows(self.backend.as_ref(), tables::ITEMS, &query).await,
            "items",
        );

        match items {
            Fetched::Data(items) => {
                let category = self.category(category_id).await.data();
                Fetched::Data(annotate(items, category.as_ref()))
            }
            Fetched::Empty => Fetched::Empty,
            Fetched::Failed(reason) => Fetched::Failed(reason),
        }
    }

    /// Items of every category of a service, in category then item order
    pub async fn service_items(&self, service_id: &str) -> Fetched<Vec<CatalogItem>> {
        let categories = match self.categories(service_id).await {
            Fetched::Data(categories) => categories,
            Fetched::Empty => return Fetched::Empty,
            Fetched::Failed(reason) => return Fetched::Failed(reason),
        };

        // One request per category, run together; results keep category order
        let requests = categories.iter().map(|category| async move {
            let query = Query::new()
                .eq("category_id", category.id.as_str())
                .eq("status", true)
                .order_asc("sequence");
            select_rows::<Item>(self.backend.as_ref(), tables::ITEMS, &query)
                .await
                .map(|items| annotate(items, Some(category)))
                .map_err(|e| (category.id.clone(), e))
        });

        let all: Vec<CatalogItem> = match try_join_all(requests).await {
            Ok(groups) => groups.into_iter().flatten().collect(),
            Err((category_id, e)) => {
                tracing::error!(error = %e, category = %category_id, "failed to fetch items");
                return Fetched::Failed(e.to_string());
            }
        };

        if all.is_empty() {
            Fetched::Empty
        } else {
            Fetched::Data(all)
        }
    }
}

fn annotate(items: Vec<Item>, category: Option<&Category>) -> Vec<CatalogItem> {
    items
        .into_iter()
        .map(|item| {
            let display_icon = category
                .and_then(|c| c.icon_name.clone())
                .or_else(|| item.icon_name.clone());
            CatalogItem {
                category_name: category
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
                display_icon,
                item,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, MockOp};
    use serde_json::json;

    fn backend() -> Arc<MockBackend> {
        Arc::new(
            MockBackend::new()
                .with_rows(
                    tables::SERVICES,
                    vec![
                        json!({ "id": "s2", "name": "Dry Cleaning", "service_identifier": "drycleaning", "sequence": 2, "status": true, "is_popular": true }),
                        json!({ "id": "s1", "name": "Wash & Iron", "service_identifier": "washiron", "sequence": 1, "status": true }),
                        json!({ "id": "s9", "name": "Old", "service_identifier": "old", "sequence": 0, "status": false }),
                    ],
                )
                .with_rows(
                    tables::CATEGORIES,
                    vec![
                        json!({ "id": "c2", "service_id": "s1", "name": "Bedding", "sequence": 2, "status": true }),
                        json!({ "id": "c1", "service_id": "s1", "name": "Shirts", "icon_name": "shirt-outline", "sequence": 1, "status": true }),
                    ],
                )
                .with_rows(
                    tables::ITEMS,
                    vec![
                        json!({ "id": "i2", "category_id": "c1", "name": "Blouse", "price": 5.0, "sequence": 2, "status": true }),
                        json!({ "id": "i1", "category_id": "c1", "name": "Shirt", "price": 4.0, "sequence": 1, "status": true }),
                        json!({ "id": "i3", "category_id": "c2", "name": "Duvet", "sequence": 1, "status": true, "icon_name": "bed-outline" }),
                        json!({ "id": "i4", "category_id": "ghost", "name": "Orphan", "sequence": 1, "status": true, "icon_name": "star-outline" }),
                    ],
                ),
        )
    }

    #[tokio::test]
    async fn test_active_services_sorted_and_filtered() {
        let catalog = CatalogService::new(backend());
        let services = catalog.active_services().await.data().unwrap();
        let ids: Vec<_> = services.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_popular_and_lookup() {
        let catalog = CatalogService::new(backend());
        let popular = catalog.popular_services().await.data().unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].id, "s2");

        let by_tag = catalog.service_by_identifier("washiron").await.data().unwrap();
        assert_eq!(by_tag.id, "s1");
        assert_eq!(catalog.service_by_identifier("old").await, Fetched::Empty);
        assert_eq!(catalog.service("nope").await, Fetched::Empty);
    }

    #[tokio::test]
    async fn test_items_annotated_with_category() {
        let catalog = CatalogService::new(backend());
        let items = catalog.items("c1").await.data().unwrap();

        assert_eq!(items[0].item.id, "i1");
        assert_eq!(items[0].category_name, "Shirts");
        assert_eq!(items[0].display_icon.as_deref(), Some("shirt-outline"));
    }

    #[tokio::test]
    async fn test_items_fall_back_to_item_icon_and_unknown_category() {
        let catalog = CatalogService::new(backend());

        let bedding = catalog.items("c2").await.data().unwrap();
        assert_eq!(bedding[0].display_icon.as_deref(), Some("bed-outline"));

        let orphans = catalog.items("ghost").await.data().unwrap();
        assert_eq!(orphans[0].category_name, "Unknown Category");
        assert_eq!(orphans[0].display_icon.as_deref(), Some("star-outline"));
    }

    #[tokio::test]
    async fn test_service_items_spans_categories() {
        let catalog = CatalogService::new(backend());
        let items = catalog.service_items("s1").await.data().unwrap();
        let ids: Vec<_> = items.iter().map(|c| c.item.id.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i2", "i3"]);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_swallowed() {
        let backend = backend();
        backend.fail_on(MockOp::Select, Some(tables::SERVICES), "connection reset");
        let catalog = CatalogService::new(backend.clone());

        match catalog.active_services().await {
            Fetched::Failed(reason) => assert!(reason.contains("connection reset")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_category_is_empty_not_failed() {
        let catalog = CatalogService::new(backend());
        assert_eq!(catalog.items("c404").await, Fetched::Empty);
        assert_eq!(catalog.categories("s2").await, Fetched::Empty);
    }
}
