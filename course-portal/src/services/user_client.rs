use crate::models::UserProfile;
use crate::services::api_client::ApiClient;
use portal_core::AppError;
use std::sync::Arc;

/// `/auth/me/`: the profile of whoever holds the access token.
pub struct UserClient {
    api: Arc<ApiClient>,
}

impl UserClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch the profile and make it the published current user.
    pub async fn fetch_current_user(&self) -> Result<UserProfile, AppError> {
        let user: UserProfile = self.api.get_json("/auth/me/").await?;
        self.api.auth().set_current_user(user.clone())?;
        Ok(user)
    }
}
