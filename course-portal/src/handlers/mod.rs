//! Headless view models for the login, registration and dashboard screens.
//!
//! Views own their state and mutate it only from their own `&mut self`
//! actions. Dropping a view drops any action still in flight, so a late
//! response never reaches a torn-down screen.

pub mod auth;
pub mod student;
pub mod teacher;

use crate::services::auth_session::AuthSession;
use portal_core::AppError;

/// Loading flag and the two message slots every screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStatus {
    pub loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl ViewStatus {
    pub fn reset_messages(&mut self) {
        self.error_message = None;
        self.success_message = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.success_message = Some(message.into());
    }
}

/// Message shown for a failed action.
///
/// Server detail is passed through untouched; `fallback` covers failures
/// with nothing useful to say.
pub fn describe_error(err: &AppError, fallback: &str) -> String {
    match err {
        AppError::Conflict(detail) => detail.clone(),
        AppError::ValidationError(fields) if !fields.is_empty() => fields.to_string(),
        AppError::NetworkError(_) => {
            "Cannot connect to server. Please ensure the backend is running.".to_string()
        }
        AppError::AuthError(_) => "Not authenticated. Please login again.".to_string(),
        AppError::Forbidden(_) => "Access forbidden. Please check your permissions.".to_string(),
        AppError::NotFound(detail) => detail.clone(),
        _ => fallback.to_string(),
    }
}

/// Record a failed action on `status`, ending the session when the
/// backend is unreachable.
///
/// A 401 whose refresh failed has already ended the session in the request
/// pipeline; a 401 with no refresh token leaves it alone.
pub fn report_error(auth: &AuthSession, status: &mut ViewStatus, err: &AppError, fallback: &str) {
    tracing::warn!(error = %err, "{}", fallback);
    status.fail(describe_error(err, fallback));
    if err.is_network() {
        auth.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::FieldErrors;

    #[test]
    fn test_conflict_detail_is_verbatim() {
        let err = AppError::Conflict("Course is already at max capacity.".to_string());
        assert_eq!(
            describe_error(&err, "Failed to apply for course"),
            "Course is already at max capacity."
        );
    }

    #[test]
    fn test_field_errors_are_joined() {
        let mut fields = FieldErrors::new();
        fields.insert("email", "Enter a valid email address.");
        fields.insert("username", "This field may not be blank.");
        let err = AppError::ValidationError(fields);
        assert_eq!(
            describe_error(&err, "Registration failed. Please try again."),
            "email: Enter a valid email address. | username: This field may not be blank."
        );
    }

    #[test]
    fn test_unexpected_errors_use_fallback() {
        let err = AppError::ServerError {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert_eq!(describe_error(&err, "Failed to create course"), "Failed to create course");
    }

    #[test]
    fn test_view_status_messages() {
        let mut status = ViewStatus::default();
        status.fail("nope");
        status.succeed("yes");
        status.reset_messages();
        assert_eq!(status, ViewStatus::default());
    }
}
