use crate::config::Settings;
use crate::routes::{Navigator, Route};
use crate::services::api_client::ApiClient;
use crate::services::auth_session::{build_http_client, AuthSession};
use crate::services::session_store::{FileSessionStore, SessionStore};
use crate::PortalState;
use portal_core::AppError;
use std::sync::Arc;

/// Wire the portal against the session file named in `settings`.
pub fn build_portal(settings: &Settings) -> Result<PortalState, AppError> {
    let store = FileSessionStore::open(settings.session.path.clone());
    tracing::debug!(path = %store.path().display(), "Using session file");
    build_portal_with_store(settings, Arc::new(store))
}

pub fn build_portal_with_store(
    settings: &Settings,
    store: Arc<dyn SessionStore>,
) -> Result<PortalState, AppError> {
    let client = build_http_client(&settings.api)?;
    let navigator = Navigator::new(Route::Login);

    let auth = Arc::new(AuthSession::new(
        client.clone(),
        &settings.api,
        store,
        navigator,
    ));
    let api = Arc::new(ApiClient::new(client, auth.clone()));

    Ok(PortalState::new(auth, api))
}
