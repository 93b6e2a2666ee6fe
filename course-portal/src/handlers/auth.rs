use crate::handlers::{describe_error, ViewStatus};
use crate::models::{RegisterRequest, Role, UserProfile};
use crate::routes::Route;
use crate::services::auth_session::AuthSession;
use portal_core::AppError;

#[derive(Debug, Clone, Default)]
pub struct LoginView {
    pub username: String,
    pub password: String,
    pub status: ViewStatus,
}

impl LoginView {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            status: ViewStatus::default(),
        }
    }

    /// Log in and move to the dashboard of the user's role.
    ///
    /// Returns the route navigated to, or `None` with `status` describing
    /// why the login was refused.
    pub async fn submit(&mut self, auth: &AuthSession) -> Option<Route> {
        self.status.reset_messages();
        self.status.loading = true;

        let result = auth.login(&self.username, &self.password).await;
        self.status.loading = false;

        match result {
            Ok(session) => {
                let role = session.user.as_ref().and_then(UserProfile::role);
                let route = Route::dashboard_for(role);
                auth.navigator().navigate(route);
                Some(route)
            }
            Err(err) => {
                tracing::warn!(username = %self.username, error = %err, "Login failed");
                let message = match &err {
                    AppError::NetworkError(_) => describe_error(&err, ""),
                    AppError::AuthError(detail)
                    | AppError::Conflict(detail)
                    | AppError::ServerError {
                        message: detail, ..
                    } if !detail.is_empty() => detail.clone(),
                    _ => "Invalid username or password".to_string(),
                };
                self.status.fail(message);
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterView {
    pub form: RegisterRequest,
    pub status: ViewStatus,
}

impl RegisterView {
    pub fn new(form: RegisterRequest) -> Self {
        Self {
            form,
            status: ViewStatus::default(),
        }
    }

    /// Blank form for a new account of the given role.
    pub fn blank(role: Role) -> Self {
        Self::new(RegisterRequest {
            username: String::new(),
            email: String::new(),
            password: String::new(),
            password2: String::new(),
            role,
            first_name: None,
            last_name: None,
        })
    }

    /// Register the account and send the user to the login screen.
    pub async fn submit(&mut self, auth: &AuthSession) -> Option<UserProfile> {
        self.status.reset_messages();
        self.status.loading = true;

        let result = auth.register(&self.form).await;
        self.status.loading = false;

        match result {
            Ok(user) => {
                self.status
                    .succeed("Registration successful! Redirecting to login...");
                auth.navigator().navigate(Route::Login);
                Some(user)
            }
            Err(err) => {
                tracing::warn!(username = %self.form.username, error = %err, "Registration failed");
                self.status
                    .fail(describe_error(&err, "Registration failed. Please try again."));
                None
            }
        }
    }
}
