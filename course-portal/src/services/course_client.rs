use crate::models::{Course, CourseDraft};
use crate::services::api_client::ApiClient;
use portal_core::AppError;
use reqwest::Method;
use std::sync::Arc;
use validator::Validate;

const COURSES: &str = "/courses/";

/// `/courses/` collection.
pub struct CourseClient {
    api: Arc<ApiClient>,
}

impl CourseClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Course>, AppError> {
        self.api.get_json(COURSES).await
    }

    pub async fn get(&self, id: i64) -> Result<Course, AppError> {
        self.api.get_json(&format!("{}{}/", COURSES, id)).await
    }

    pub async fn create(&self, draft: &CourseDraft) -> Result<Course, AppError> {
        draft.validate()?;
        let course: Course = self.api.send_json(Method::POST, COURSES, draft).await?;
        tracing::info!(course_id = course.id, code = %course.code, "Course created");
        Ok(course)
    }

    pub async fn update(&self, id: i64, draft: &CourseDraft) -> Result<Course, AppError> {
        draft.validate()?;
        self.api
            .send_json(Method::PUT, &format!("{}{}/", COURSES, id), draft)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.api.delete(&format!("{}{}/", COURSES, id)).await?;
        tracing::info!(course_id = id, "Course deleted");
        Ok(())
    }
}
