//! Login, logout, registration and token refresh against the identity
//! endpoints, plus the published "current user" state.
//!
//! The current user lives in a `watch` channel owned by [`AuthSession`].
//! Only the mutating operations here write to it; views hold a receiver from
//! [`AuthSession::subscribe`] or read it with [`AuthSession::current_user`].

use crate::config::ApiSettings;
use crate::models::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, Role, Session,
    UserProfile,
};
use crate::routes::{Navigator, Route};
use crate::services::session_store::{SessionKey, SessionStore};
use portal_core::observability::TracedClientExt;
use portal_core::AppError;
use reqwest::Client;
use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use validator::Validate;

pub struct AuthSession {
    client: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    current_user: watch::Sender<Option<UserProfile>>,
    navigator: Navigator,
}

/// Build the HTTP client shared by the identity endpoints and the API.
pub fn build_http_client(settings: &ApiSettings) -> Result<Client, AppError> {
    let mut builder = Client::builder();
    if let Some(secs) = settings.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(AppError::from)
}

impl AuthSession {
    /// Create the manager and hydrate the current user from `store`.
    pub fn new(
        client: Client,
        settings: &ApiSettings,
        store: Arc<dyn SessionStore>,
        navigator: Navigator,
    ) -> Self {
        let (current_user, _rx) = watch::channel(None);
        let session = Self {
            client,
            base_url: settings.normalized_base_url(),
            store,
            current_user,
            navigator,
        };
        session.hydrate();
        session
    }

    /// Load the cached profile; a profile that does not parse ends the
    /// session instead of failing startup.
    fn hydrate(&self) {
        let Some(raw) = self.store.get(SessionKey::User) else {
            return;
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(user) => {
                tracing::debug!(user_id = user.id, "Restored user from session store");
                self.current_user.send_replace(Some(user));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored user profile is corrupt, logging out");
                self.logout();
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// `POST /auth/register/`. Does not log the new user in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, AppError> {
        request.validate()?;

        let user: UserProfile = self
            .post_json("/auth/register/", request)
            .await
            .map_err(AppError::into_validation_error)?;

        tracing::info!(user_id = user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// `POST /auth/login/`; persists both tokens and the profile, then
    /// publishes the user.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        request
            .validate()
            .map_err(|e| AppError::from(e).into_auth_error())?;

        let response: LoginResponse = self
            .post_json("/auth/login/", &request)
            .await
            .map_err(AppError::into_auth_error)?;

        let user_json = serde_json::to_string(&response.user)?;
        if let Err(e) = self.persist_login(&response.access, &response.refresh, &user_json) {
            tracing::error!(error = %e, "Failed to persist session, discarding partial login");
            if let Err(clear_err) = self.store.clear() {
                tracing::error!(error = %clear_err, "Failed to clear partial session");
            }
            return Err(e);
        }
        self.current_user.send_replace(Some(response.user.clone()));

        tracing::info!(
            user_id = response.user.id,
            role = %response.user.raw_role,
            "User logged in successfully"
        );

        Ok(Session {
            access_token: Secret::new(response.access),
            refresh_token: Secret::new(response.refresh),
            user: Some(response.user),
        })
    }

    fn persist_login(&self, access: &str, refresh: &str, user_json: &str) -> Result<(), AppError> {
        self.store.set(SessionKey::AccessToken, access)?;
        self.store.set(SessionKey::RefreshToken, refresh)?;
        self.store.set(SessionKey::User, user_json)
    }

    /// Clear the persisted session, publish no user and send the view
    /// layer back to the login screen. Never fails.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
        self.current_user.send_replace(None);
        self.navigator.navigate(Route::Login);
        tracing::info!("Session ended");
    }

    /// Exchange the stored refresh token for a new access token.
    pub async fn refresh(&self) -> Result<String, AppError> {
        let refresh_token = self
            .store
            .get(SessionKey::RefreshToken)
            .ok_or_else(|| AppError::AuthError("No refresh token available".to_string()))?;

        let response: RefreshResponse = self
            .post_json(
                "/auth/token/refresh/",
                &RefreshRequest {
                    refresh: &refresh_token,
                },
            )
            .await
            .map_err(AppError::into_auth_error)?;

        self.store.set(SessionKey::AccessToken, &response.access)?;
        if let Some(rotated) = &response.refresh {
            self.store.set(SessionKey::RefreshToken, rotated)?;
        }

        tracing::debug!(rotated = response.refresh.is_some(), "Access token refreshed");
        Ok(response.access)
    }

    /// Persist and publish a freshly fetched profile.
    pub fn set_current_user(&self, user: UserProfile) -> Result<(), AppError> {
        let user_json = serde_json::to_string(&user)?;
        self.store.set(SessionKey::User, &user_json)?;
        self.current_user.send_replace(Some(user));
        Ok(())
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.current_user.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.current_user.subscribe()
    }

    pub fn role(&self) -> Option<Role> {
        self.current_user.borrow().as_ref().and_then(UserProfile::role)
    }

    pub fn is_student(&self) -> bool {
        self.role() == Some(Role::Student)
    }

    pub fn is_teacher(&self) -> bool {
        self.role() == Some(Role::Teacher)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get(SessionKey::AccessToken).is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(SessionKey::AccessToken)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.store.get(SessionKey::RefreshToken).is_some()
    }

    /// Unauthenticated JSON POST to an identity endpoint.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .traced_post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                AppError::from(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let err = AppError::from_response(response).await;
            tracing::warn!(%url, status = status.as_u16(), error = %err, "Identity request rejected");
            return Err(err);
        }

        Ok(response.json::<T>().await?)
    }
}
