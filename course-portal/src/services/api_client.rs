//! Authenticated request pipeline.
//!
//! Attaches the bearer token to every call. A 401 with a refresh token on
//! hand triggers exactly one refresh and one resend of the same request;
//! a failed refresh, or a resend that fails again, ends the session.

use crate::services::auth_session::AuthSession;
use portal_core::observability::{new_request_id, TracedClientExt};
use portal_core::AppError;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A request that can be sent more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub request_id: String,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            request_id: new_request_id(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, AppError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(client: Client, auth: Arc<AuthSession>) -> Self {
        Self {
            client,
            base_url: auth.base_url().to_string(),
            auth,
        }
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    /// Send `request`, refreshing the access token once on a 401.
    ///
    /// Returns the successful response; every failure is mapped through
    /// [`AppError::from_status`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, AppError> {
        let token = self.auth.access_token();
        let response = self.dispatch(request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        let unauthorized = AppError::from_response(response).await;
        if !self.auth.has_refresh_token() {
            tracing::debug!(
                request_id = %request.request_id,
                path = %request.path,
                "Unauthorized and no refresh token, not retrying"
            );
            return Err(unauthorized);
        }

        let access = match self.auth.refresh().await {
            Ok(access) => access,
            Err(e) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    error = %e,
                    "Token refresh failed, ending session"
                );
                self.auth.logout();
                return Err(unauthorized);
            }
        };

        tracing::debug!(
            request_id = %request.request_id,
            path = %request.path,
            "Retrying request with refreshed token"
        );

        let retried = match self.dispatch(request, Some(&access)).await {
            Ok(response) => ensure_success(response).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &retried {
            tracing::warn!(
                request_id = %request.request_id,
                error = %e,
                "Request failed after token refresh, ending session"
            );
            self.auth.logout();
        }
        retried
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, AppError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .traced_request(request.method.clone(), &url)
            .request_id(&request.request_id);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", request.method, url, e);
            AppError::from(e)
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.execute(&ApiRequest::get(path)).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(method, path).with_json(body)?;
        let response = self.execute(&request).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.execute(&ApiRequest::delete(path)).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, AppError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(AppError::from_response(response).await)
    }
}
