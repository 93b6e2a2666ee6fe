use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Key the remote API uses for messages not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single message that is not attached to any field.
    pub fn message(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(NON_FIELD_ERRORS, message);
        errors
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Build from an error body shaped like `{"field": ["msg", ...], ...}`.
    ///
    /// Scalar values are accepted as a single message; anything that is not
    /// an object becomes one non-field message.
    pub fn from_body(body: &Value) -> Self {
        let mut errors = Self::new();
        match body {
            Value::Object(map) => {
                for (field, value) in map {
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                errors.insert(field.as_str(), value_text(item));
                            }
                        }
                        other => errors.insert(field.as_str(), value_text(other)),
                    }
                }
            }
            Value::Null => {}
            other => errors.insert(NON_FIELD_ERRORS, value_text(other)),
        }
        errors
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str(" | ")?;
            }
            first = false;
            if field == NON_FIELD_ERRORS || field == "__all__" {
                write!(f, "{}", messages.join(", "))?;
            } else {
                write!(f, "{}: {}", field, messages.join(", "))?;
            }
        }
        Ok(())
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            let field = field.to_string();
            let field = if field == "__all__" {
                NON_FIELD_ERRORS.to_string()
            } else {
                field
            };
            for error in list {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                fields.insert(field.clone(), message);
            }
        }
        fields
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    DecodeError(String),

    #[error("Session store error: {0}")]
    StoreError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Precondition failure reported to the user like a form error.
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::ValidationError(FieldErrors::message(message))
    }

    /// Map a non-success HTTP response to the error taxonomy.
    ///
    /// `body` is the raw response body; the remote API answers with JSON
    /// shaped either as `{"detail": "..."}` or as a field error map.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let json: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let detail = json
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string);
        let fallback = || {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        };

        match status {
            StatusCode::UNAUTHORIZED => AppError::AuthError(detail.unwrap_or_else(fallback)),
            StatusCode::FORBIDDEN => AppError::Forbidden(detail.unwrap_or_else(fallback)),
            StatusCode::NOT_FOUND => AppError::NotFound(detail.unwrap_or_else(fallback)),
            StatusCode::CONFLICT => AppError::Conflict(detail.unwrap_or_else(fallback)),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                if let Some(detail) = detail {
                    return AppError::Conflict(detail);
                }
                let fields = FieldErrors::from_body(&json);
                let only_non_field = fields.iter().all(|(field, _)| field == NON_FIELD_ERRORS);
                if fields.is_empty() {
                    AppError::ValidationError(FieldErrors::message(fallback()))
                } else if only_non_field {
                    AppError::Conflict(fields.to_string())
                } else {
                    AppError::ValidationError(fields)
                }
            }
            _ => AppError::ServerError {
                status: status.as_u16(),
                message: detail.unwrap_or_else(fallback),
            },
        }
    }

    /// Consume a failed response and map it with [`AppError::from_status`].
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        match response.bytes().await {
            Ok(body) => AppError::from_status(status, &body),
            Err(e) => AppError::from(e),
        }
    }

    /// Text suitable for showing to a user: server-provided detail is
    /// returned verbatim.
    pub fn detail(&self) -> String {
        match self {
            AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::DecodeError(msg) => msg.clone(),
            AppError::ValidationError(fields) => fields.to_string(),
            AppError::ServerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Rewrite a client-side rejection as an authentication failure.
    ///
    /// The identity endpoints answer bad credentials with a mix of 400 and
    /// 401; callers of login and refresh only care that they were refused.
    /// Per-field form errors become an `AuthError` with an empty message.
    pub fn into_auth_error(self) -> Self {
        match self {
            AppError::AuthError(_) => self,
            AppError::ValidationError(ref fields)
                if fields.iter().any(|(field, _)| field != NON_FIELD_ERRORS) =>
            {
                AppError::AuthError(String::new())
            }
            AppError::ValidationError(_)
            | AppError::Conflict(_)
            | AppError::Forbidden(_)
            | AppError::NotFound(_) => AppError::AuthError(self.detail()),
            AppError::ServerError { status, message } if is_client_status(status) => {
                AppError::AuthError(message)
            }
            other => other,
        }
    }

    /// Rewrite any 4xx rejection as a form error, keeping its message.
    ///
    /// Field maps pass through unchanged; transport and 5xx failures are
    /// left alone.
    pub fn into_validation_error(self) -> Self {
        match self {
            AppError::ValidationError(_) => self,
            AppError::AuthError(_)
            | AppError::Conflict(_)
            | AppError::Forbidden(_)
            | AppError::NotFound(_) => AppError::invalid(self.detail()),
            AppError::ServerError { status, message } if is_client_status(status) => {
                AppError::invalid(message)
            }
            other => other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::AuthError(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, AppError::NetworkError(_))
    }
}

fn is_client_status(status: u16) -> bool {
    (400..500).contains(&status)
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::DecodeError(err.to_string())
        } else {
            AppError::NetworkError(err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DecodeError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StoreError(anyhow::Error::new(err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(FieldErrors::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_unauthorized_maps_to_auth_error() {
        let err = AppError::from_status(
            StatusCode::UNAUTHORIZED,
            &body(json!({"detail": "Given token not valid for any token type"})),
        );
        assert!(err.is_unauthorized());
        assert_eq!(err.detail(), "Given token not valid for any token type");
    }

    #[test]
    fn test_detail_on_bad_request_is_conflict_verbatim() {
        let err = AppError::from_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"detail": "Course is already at max capacity."})),
        );
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "Course is already at max capacity."),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_field_errors_only_is_conflict() {
        let err = AppError::from_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"non_field_errors": ["The fields student, course must make a unique set."]})),
        );
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(
            err.detail(),
            "The fields student, course must make a unique set."
        );
    }

    #[test]
    fn test_field_map_is_validation_error() {
        let err = AppError::from_status(
            StatusCode::BAD_REQUEST,
            &body(json!({
                "username": ["A user with that username already exists."],
                "password": ["Passwords do not match.", "This password is too short."]
            })),
        );
        let AppError::ValidationError(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("password").map(|m| m.len()), Some(2));
        assert_eq!(
            fields.to_string(),
            "password: Passwords do not match., This password is too short. | username: A user with that username already exists."
        );
    }

    #[test]
    fn test_non_json_body_falls_back_to_reason() {
        let err = AppError::from_status(StatusCode::NOT_FOUND, b"<html>nope</html>");
        assert_eq!(err.detail(), "Not Found");

        let err = AppError::from_status(StatusCode::BAD_GATEWAY, b"");
        assert!(matches!(err, AppError::ServerError { status: 502, .. }));
    }

    #[test]
    fn test_into_auth_error_keeps_message() {
        let err = AppError::from_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"detail": "No active account found with the given credentials"})),
        )
        .into_auth_error();
        assert!(err.is_unauthorized());
        assert_eq!(
            err.detail(),
            "No active account found with the given credentials"
        );
    }

    #[test]
    fn test_into_auth_error_drops_field_messages() {
        let err = AppError::from_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"username": ["This field may not be blank."]})),
        )
        .into_auth_error();
        assert!(matches!(err, AppError::AuthError(ref d) if d.is_empty()));

        let err = AppError::from_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"non_field_errors": ["Unable to log in."]})),
        )
        .into_auth_error();
        assert_eq!(err.detail(), "Unable to log in.");
    }

    #[test]
    fn test_throttled_login_is_auth_error() {
        let err = AppError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            &body(json!({"detail": "Request was throttled."})),
        );
        assert!(matches!(err, AppError::ServerError { status: 429, .. }));

        let err = err.into_auth_error();
        assert!(matches!(err, AppError::AuthError(ref d) if d == "Request was throttled."));
    }

    #[test]
    fn test_server_failure_is_not_rewritten() {
        let err = AppError::from_status(StatusCode::INTERNAL_SERVER_ERROR, b"").into_auth_error();
        assert!(matches!(err, AppError::ServerError { status: 500, .. }));

        let err = AppError::from_status(StatusCode::BAD_GATEWAY, b"").into_validation_error();
        assert!(matches!(err, AppError::ServerError { status: 502, .. }));
    }

    #[test]
    fn test_client_rejections_become_form_errors() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let err = AppError::from_status(status, &body(json!({"detail": "Nope."})))
                .into_validation_error();
            match err {
                AppError::ValidationError(fields) => assert_eq!(fields.to_string(), "Nope."),
                other => panic!("{} gave {:?}", status, other),
            }
        }
    }

    #[test]
    fn test_non_field_message_display_has_no_prefix() {
        let fields = FieldErrors::message("You must be logged in to apply");
        assert_eq!(fields.to_string(), "You must be logged in to apply");
        assert_eq!(
            AppError::invalid("You must be logged in to apply").detail(),
            "You must be logged in to apply"
        );
    }
}
