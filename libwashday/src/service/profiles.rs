//! Profile rows and favorites

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::fetched::Fetched;
use super::select_one;
use crate::backend::{decode_first, encode_row, Backend, Query};
use crate::error::{BackendError, Result};
use crate::types::{tables, Profile, ProfileUpdate};

#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn Backend>,
}

impl ProfileService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, user_id: &str) -> Fetched<Profile> {
        let query = Query::new().eq("id", user_id);
        Fetched::from_option(
            select_one(self.backend.as_ref(), tables::PROFILES, &query).await,
            "profile",
        )
    }

    /// Create the profile row, or overwrite the one with the same id
    pub async fn upsert(&self, profile: &Profile) -> Result<Profile> {
        let mut row = encode_row(profile)?;
        if let Value::Object(map) = &mut row {
            map.retain(|_, v| !v.is_null());
        }
        let rows = self.backend.upsert(tables::PROFILES, vec![row], "id").await?;
        decode_first(rows)?.ok_or_else(not_found)
    }

    pub async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
        let mut patch = encode_row(update)?;
        if let Value::Object(map) = &mut patch {
            map.insert(
                "updated_at".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        let rows = self
            .backend
            .update(tables::PROFILES, &Query::new().eq("id", user_id), patch)
            .await?;
        decode_first(rows)?.ok_or_else(not_found)
    }

    /// Add or remove `item_id` from the favorites in `preferences`
    ///
    /// Other preference keys are kept. Returns the updated profile.
    pub async fn toggle_favorite(&self, profile: &Profile, item_id: &str) -> Result<Profile> {
        let preferences = toggled_favorites(&profile.preferences, item_id);
        let update = ProfileUpdate {
            preferences: Some(preferences),
            ..Default::default()
        };
        self.update(&profile.id, &update).await
    }
}

fn toggled_favorites(preferences: &Value, item_id: &str) -> Value {
    let mut prefs = match preferences {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let mut favorites: Vec<Value> = prefs
        .get("favorites")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let before = favorites.len();
    favorites.retain(|v| v.as_str() != Some(item_id));
    if favorites.len() == before {
        favorites.push(json!(item_id));
    }

    prefs.insert("favorites".to_string(), Value::Array(favorites));
    Value::Object(prefs)
}

fn not_found() -> crate::error::WashdayError {
    BackendError::NotFound(tables::PROFILES.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new().with_rows(
            tables::PROFILES,
            vec![json!({
                "id": "u1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "phone": "",
                "preferences": { "currency": "EUR", "favorites": ["i1"] }
            })],
        ))
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let prefs = json!({ "currency": "EUR" });
        let added = toggled_favorites(&prefs, "i2");
        assert_eq!(added["favorites"], json!(["i2"]));
        assert_eq!(added["currency"], "EUR");

        let removed = toggled_favorites(&added, "i2");
        assert_eq!(removed["favorites"], json!([]));
    }

    #[tokio::test]
    async fn test_toggle_favorite_writes_preferences() {
        let profiles = ProfileService::new(backend());
        let profile = profiles.get("u1").await.data().unwrap();

        let updated = profiles.toggle_favorite(&profile, "i7").await.unwrap();
        assert_eq!(updated.favorites(), vec!["i1", "i7"]);
        assert_eq!(updated.preferred_currency(), Some("EUR"));

        let updated = profiles.toggle_favorite(&updated, "i1").await.unwrap();
        assert_eq!(updated.favorites(), vec!["i7"]);
    }

    #[tokio::test]
    async fn test_update_leaves_unset_fields() {
        let profiles = ProfileService::new(backend());
        let updated = profiles
            .update(
                "u1",
                &ProfileUpdate {
                    phone: Some("0612345678".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone, "0612345678");
        assert_eq!(updated.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_upsert_creates_then_overwrites() {
        let backend = Arc::new(MockBackend::new());
        let profiles = ProfileService::new(backend.clone());
        let mut profile: Profile =
            serde_json::from_value(json!({ "id": "u9", "first_name": "Grace" })).unwrap();

        profiles.upsert(&profile).await.unwrap();
        profile.last_name = "Hopper".to_string();
        let stored = profiles.upsert(&profile).await.unwrap();

        assert_eq!(stored.full_name(), "Grace Hopper");
        assert_eq!(backend.rows(tables::PROFILES).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_is_empty() {
        let profiles = ProfileService::new(backend());
        assert_eq!(profiles.get("nobody").await, Fetched::Empty);
    }
}
