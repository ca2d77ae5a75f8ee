//! Signed-in user and profile
//!
//! `AuthSession` holds at most one session. Signing in sets the backend's
//! access token, so later table requests run as that user, and loads the
//! profile row. Every change of user is announced on the event bus.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::events::{Event, EventBus};
use super::fetched::Fetched;
use super::profiles::ProfileService;
use crate::backend::{AuthUser, Backend, Session};
use crate::error::{AuthError, Result};
use crate::types::{Profile, ProfileUpdate};

pub struct AuthSession {
    backend: Arc<dyn Backend>,
    profiles: ProfileService,
    events: EventBus,
    session: Option<Session>,
    profile: Option<Profile>,
}

impl AuthSession {
    pub fn new(backend: Arc<dyn Backend>, profiles: ProfileService, events: EventBus) -> Self {
        Self {
            backend,
            profiles,
            events,
            session: None,
            profile: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// Email of the signed-in user, empty if unknown
    pub fn email(&self) -> &str {
        self.current_user()
            .and_then(|u| u.email.as_deref())
            .unwrap_or_default()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.activate(session.clone()).await;
        Ok(session)
    }

    /// Register, then create the profile row
    ///
    /// `full_name` is split at the first space into first and last name.
    /// The account exists once the server accepts it, so a failed profile
    /// write leaves the user signed in without a profile.
    pub async fn sign_up(&mut self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let session = self.backend.sign_up(email.trim(), password).await?;
        self.backend
            .set_access_token(Some(session.access_token.clone()));

        let (first_name, last_name) = split_full_name(full_name);
        let profile = Profile {
            id: session.user.id.clone(),
            first_name,
            last_name,
            phone: String::new(),
            address: None,
            city: None,
            postal_code: None,
            preferences: Value::Object(Map::new()),
            created_at: None,
            updated_at: None,
        };
        let profile = match self.profiles.upsert(&profile).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(
                    user_id = %session.user.id,
                    error = %e,
                    "profile not created at sign up"
                );
                None
            }
        };

        tracing::info!(user_id = %session.user.id, "signed up");
        self.session = Some(session.clone());
        self.profile = profile;
        self.announce();
        Ok(session)
    }

    /// Resume a stored session after checking it with the server
    pub async fn restore(&mut self, session: Session) -> Result<AuthUser> {
        if session.is_expired_at(chrono::Utc::now().timestamp()) {
            return Err(AuthError::Rejected("session expired".to_string()).into());
        }

        let user = self.backend.get_user(&session.access_token).await?;
        tracing::debug!(user_id = %user.id, "session restored");
        self.activate(Session {
            user: user.clone(),
            ..session
        })
        .await;
        Ok(user)
    }

    /// Revoke the session and forget it locally
    ///
    /// The local state is cleared even when the server call fails; the
    /// error is still returned.
    pub async fn sign_out(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        let result = self.backend.sign_out(&session).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "server sign out failed; clearing local session");
        }

        self.profile = None;
        self.backend.set_access_token(None);
        self.announce();
        result
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<Profile> {
        let user_id = self.require_user()?.id.clone();
        let profile = self.profiles.update(&user_id, update).await?;
        self.profile = Some(profile.clone());
        Ok(profile)
    }

    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        let session = self.session.as_ref().ok_or(AuthError::NotSignedIn)?;
        if new_password.is_empty() {
            return Err(AuthError::Rejected("password must not be empty".to_string()).into());
        }
        self.backend.update_password(session, new_password).await
    }

    /// Re-read the profile row of the signed-in user
    pub async fn refresh_profile(&mut self) -> Fetched<Profile> {
        let Some(user) = self.current_user() else {
            return Fetched::Empty;
        };
        let fetched = self.profiles.get(&user.id.clone()).await;
        if let Fetched::Data(profile) = &fetched {
            self.profile = Some(profile.clone());
        }
        fetched
    }

    fn require_user(&self) -> Result<&AuthUser> {
        Ok(self.current_user().ok_or(AuthError::NotSignedIn)?)
    }

    async fn activate(&mut self, session: Session) {
        self.backend
            .set_access_token(Some(session.access_token.clone()));
        self.profile = self.profiles.get(&session.user.id).await.data();
        if self.profile.is_none() {
            tracing::warn!(user_id = %session.user.id, "signed in without a profile row");
        }
        self.session = Some(session);
        self.announce();
    }

    fn announce(&self) {
        self.events.emit(Event::SessionChanged {
            user_id: self.current_user().map(|u| u.id.clone()),
        });
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("backend", &self.backend.name())
            .field("session", &self.session)
            .field("profile", &self.profile.as_ref().map(|p| &p.id))
            .finish()
    }
}

fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (full_name.trim().to_string(), String::new()),
    }
}
