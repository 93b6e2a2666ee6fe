use crate::handlers::{report_error, ViewStatus};
use crate::models::{Course, EnrollmentRequest, EnrollmentStatus, UserProfile};
use crate::services::auth_session::AuthSession;
use crate::services::course_client::CourseClient;
use crate::services::enrollment_client::EnrollmentClient;
use crate::PortalState;
use portal_core::AppError;
use std::sync::Arc;

/// Course catalogue plus the student's own enrollment requests.
pub struct StudentDashboard {
    auth: Arc<AuthSession>,
    course_client: Arc<CourseClient>,
    enrollment_client: Arc<EnrollmentClient>,
    pub current_user: Option<UserProfile>,
    pub available_courses: Vec<Course>,
    pub my_enrollments: Vec<EnrollmentRequest>,
    pub status: ViewStatus,
}

impl StudentDashboard {
    pub fn new(state: &PortalState) -> Self {
        Self {
            auth: state.auth.clone(),
            course_client: state.courses.clone(),
            enrollment_client: state.enrollments.clone(),
            current_user: state.auth.current_user(),
            available_courses: Vec::new(),
            my_enrollments: Vec::new(),
            status: ViewStatus::default(),
        }
    }

    /// Load courses and enrollments; the two requests run concurrently and
    /// either may fail without affecting the other.
    pub async fn load(&mut self) {
        self.current_user = self.auth.current_user();
        self.status.loading = true;
        self.status.error_message = None;

        let (courses, enrollments) =
            tokio::join!(self.course_client.list(), self.enrollment_client.list());

        self.apply_courses(courses);
        self.apply_enrollments(enrollments);
        self.status.loading = false;
    }

    pub async fn load_courses(&mut self) {
        self.status.loading = true;
        self.status.error_message = None;
        let courses = self.course_client.list().await;
        self.apply_courses(courses);
        self.status.loading = false;
    }

    pub async fn load_my_enrollments(&mut self) {
        let enrollments = self.enrollment_client.list().await;
        self.apply_enrollments(enrollments);
    }

    fn apply_courses(&mut self, result: Result<Vec<Course>, AppError>) {
        match result {
            Ok(courses) => {
                tracing::debug!(count = courses.len(), "Courses loaded");
                self.available_courses = courses;
            }
            Err(err) => report_error(&self.auth, &mut self.status, &err, "Failed to load courses"),
        }
    }

    fn apply_enrollments(&mut self, result: Result<Vec<EnrollmentRequest>, AppError>) {
        match result {
            Ok(requests) => {
                // The collection may include other students' requests
                self.my_enrollments = match &self.current_user {
                    Some(user) => requests
                        .into_iter()
                        .filter(|r| r.student_id == user.id)
                        .collect(),
                    None => requests,
                };
            }
            Err(err) => report_error(
                &self.auth,
                &mut self.status,
                &err,
                "Failed to load enrollment requests",
            ),
        }
    }

    pub fn is_already_enrolled(&self, course_id: i64) -> bool {
        self.my_enrollments.iter().any(|e| e.course_id == course_id)
    }

    pub fn enrollment_status(&self, course_id: i64) -> Option<EnrollmentStatus> {
        self.my_enrollments
            .iter()
            .find(|e| e.course_id == course_id)
            .map(|e| e.status)
    }

    pub fn is_course_available(course: &Course) -> bool {
        course.has_capacity()
    }

    /// Submit an enrollment request for `course`.
    ///
    /// Missing login and duplicate applications are refused locally as
    /// validation errors; everything else is the server's call.
    pub async fn apply_for_course(&mut self, course: &Course) -> Result<EnrollmentRequest, AppError> {
        self.status.reset_messages();

        let Some(student_id) = self.current_user.as_ref().map(|u| u.id) else {
            let err = AppError::invalid("You must be logged in to apply");
            self.status.fail(err.detail());
            return Err(err);
        };

        if self.is_already_enrolled(course.id) {
            let err = AppError::invalid("You have already applied for this course");
            self.status.fail(err.detail());
            return Err(err);
        }

        match self.enrollment_client.create(student_id, course.id).await {
            Ok(request) => {
                self.status
                    .succeed(format!("Successfully applied for \"{}\"!", course.name));
                self.load_my_enrollments().await;
                Ok(request)
            }
            Err(err) => {
                report_error(&self.auth, &mut self.status, &err, "Failed to apply for course");
                Err(err)
            }
        }
    }
}
