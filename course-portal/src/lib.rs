pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod startup;
pub mod utils;

use middleware::auth::RouteGuard;
use routes::Navigator;
use services::{
    api_client::ApiClient, auth_session::AuthSession, course_client::CourseClient,
    enrollment_client::EnrollmentClient, user_client::UserClient,
};
use std::sync::Arc;

/// Shared client state: the session, the authenticated pipeline and the
/// resource clients built on top of it.
#[derive(Clone)]
pub struct PortalState {
    pub auth: Arc<AuthSession>,
    pub api: Arc<ApiClient>,
    pub guard: RouteGuard,
    pub courses: Arc<CourseClient>,
    pub enrollments: Arc<EnrollmentClient>,
    pub users: Arc<UserClient>,
}

impl PortalState {
    pub fn new(auth: Arc<AuthSession>, api: Arc<ApiClient>) -> Self {
        Self {
            guard: RouteGuard::new(auth.clone()),
            courses: Arc::new(CourseClient::new(api.clone())),
            enrollments: Arc::new(EnrollmentClient::new(api.clone())),
            users: Arc::new(UserClient::new(api.clone())),
            auth,
            api,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        self.auth.navigator()
    }
}
