use crate::models::{EnrollmentRequest, NewEnrollment};
use crate::services::api_client::ApiClient;
use portal_core::AppError;
use reqwest::Method;
use std::sync::Arc;

const ENROLLMENT_REQUESTS: &str = "/enrollment-requests/";

/// `/enrollment-requests/` collection.
pub struct EnrollmentClient {
    api: Arc<ApiClient>,
}

impl EnrollmentClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<EnrollmentRequest>, AppError> {
        self.api.get_json(ENROLLMENT_REQUESTS).await
    }

    /// Apply `student_id` to `course_id`. Capacity and duplicate checks are
    /// the server's; their messages come back as [`AppError::Conflict`].
    pub async fn create(&self, student_id: i64, course_id: i64) -> Result<EnrollmentRequest, AppError> {
        let body = NewEnrollment {
            student: student_id,
            course: course_id,
        };
        let request: EnrollmentRequest = self
            .api
            .send_json(Method::POST, ENROLLMENT_REQUESTS, &body)
            .await?;
        tracing::info!(
            enrollment_id = request.id,
            student_id,
            course_id,
            waitlisted = request.is_waitlisted,
            "Enrollment requested"
        );
        Ok(request)
    }

    /// Approve a pending request.
    pub async fn enroll(&self, id: i64) -> Result<EnrollmentRequest, AppError> {
        let request: EnrollmentRequest = self
            .api
            .send_json(
                Method::POST,
                &format!("{}{}/enroll/", ENROLLMENT_REQUESTS, id),
                &serde_json::json!({}),
            )
            .await?;
        tracing::info!(enrollment_id = id, status = %request.status, "Enrollment approved");
        Ok(request)
    }
}
