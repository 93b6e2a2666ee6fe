use crate::handlers::{report_error, ViewStatus};
use crate::models::course::DEFAULT_MAX_CAPACITY;
use crate::models::{Course, CourseDraft, EnrollmentRequest, EnrollmentStatus, UserProfile};
use crate::services::auth_session::AuthSession;
use crate::services::course_client::CourseClient;
use crate::services::enrollment_client::EnrollmentClient;
use crate::PortalState;
use portal_core::AppError;
use std::sync::Arc;

/// Fields of the "new course" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseForm {
    pub name: String,
    pub code: String,
    pub description: String,
    pub max_capacity: u32,
}

impl Default for CourseForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            code: String::new(),
            description: String::new(),
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

/// Course management and the queue of enrollment requests.
pub struct TeacherDashboard {
    auth: Arc<AuthSession>,
    course_client: Arc<CourseClient>,
    enrollment_client: Arc<EnrollmentClient>,
    pub current_user: Option<UserProfile>,
    pub courses: Vec<Course>,
    pub enrollment_requests: Vec<EnrollmentRequest>,
    pub course_form: CourseForm,
    pub status: ViewStatus,
}

impl TeacherDashboard {
    pub fn new(state: &PortalState) -> Self {
        Self {
            auth: state.auth.clone(),
            course_client: state.courses.clone(),
            enrollment_client: state.enrollments.clone(),
            current_user: state.auth.current_user(),
            courses: Vec::new(),
            enrollment_requests: Vec::new(),
            course_form: CourseForm::default(),
            status: ViewStatus::default(),
        }
    }

    pub async fn load(&mut self) {
        self.current_user = self.auth.current_user();
        self.status.loading = true;
        self.status.error_message = None;

        let (courses, requests) =
            tokio::join!(self.course_client.list(), self.enrollment_client.list());

        self.apply_courses(courses);
        self.apply_requests(requests);
        self.status.loading = false;
    }

    pub async fn load_courses(&mut self) {
        let courses = self.course_client.list().await;
        self.apply_courses(courses);
    }

    pub async fn load_enrollment_requests(&mut self) {
        let requests = self.enrollment_client.list().await;
        self.apply_requests(requests);
    }

    fn apply_courses(&mut self, result: Result<Vec<Course>, AppError>) {
        match result {
            Ok(courses) => self.courses = courses,
            Err(err) => report_error(&self.auth, &mut self.status, &err, "Failed to load courses"),
        }
    }

    fn apply_requests(&mut self, result: Result<Vec<EnrollmentRequest>, AppError>) {
        match result {
            Ok(requests) => self.enrollment_requests = requests,
            Err(err) => report_error(
                &self.auth,
                &mut self.status,
                &err,
                "Failed to load enrollment requests",
            ),
        }
    }

    /// Create a course from `course_form`, owned by the current user.
    pub async fn create_course(&mut self) -> Result<Course, AppError> {
        self.status.reset_messages();

        let Some(teacher_id) = self.current_user.as_ref().map(|u| u.id) else {
            let err = AppError::invalid("User not authenticated");
            self.status.fail(err.detail());
            return Err(err);
        };

        let draft = CourseDraft {
            name: self.course_form.name.clone(),
            code: self.course_form.code.clone(),
            description: self.course_form.description.clone(),
            max_capacity: self.course_form.max_capacity,
            teacher: teacher_id,
        };

        match self.course_client.create(&draft).await {
            Ok(course) => {
                self.status
                    .succeed(format!("Course \"{}\" created successfully!", course.name));
                self.course_form = CourseForm::default();
                self.load_courses().await;
                Ok(course)
            }
            Err(err) => {
                report_error(&self.auth, &mut self.status, &err, "Failed to create course");
                Err(err)
            }
        }
    }

    pub async fn update_course(&mut self, id: i64, draft: &CourseDraft) -> Result<Course, AppError> {
        self.status.reset_messages();

        match self.course_client.update(id, draft).await {
            Ok(course) => {
                self.status
                    .succeed(format!("Course \"{}\" updated successfully!", course.name));
                self.load_courses().await;
                Ok(course)
            }
            Err(err) => {
                report_error(&self.auth, &mut self.status, &err, "Failed to update course");
                Err(err)
            }
        }
    }

    pub async fn delete_course(&mut self, id: i64) -> Result<(), AppError> {
        self.status.reset_messages();

        match self.course_client.delete(id).await {
            Ok(()) => {
                self.status.succeed("Course deleted successfully");
                self.load_courses().await;
                Ok(())
            }
            Err(err) => {
                report_error(&self.auth, &mut self.status, &err, "Failed to delete course");
                Err(err)
            }
        }
    }

    /// Approve a pending request, then reload both lists so enrolled
    /// counts reflect the change.
    pub async fn approve_enrollment(
        &mut self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentRequest, AppError> {
        self.status.reset_messages();

        match self.enrollment_client.enroll(request.id).await {
            Ok(updated) => {
                self.status.succeed(format!(
                    "Enrollment approved for {}",
                    request.student_label()
                ));
                let (courses, requests) =
                    tokio::join!(self.course_client.list(), self.enrollment_client.list());
                self.apply_courses(courses);
                self.apply_requests(requests);
                Ok(updated)
            }
            Err(err) => {
                report_error(&self.auth, &mut self.status, &err, "Failed to approve enrollment");
                Err(err)
            }
        }
    }

    pub fn pending_requests_for_course(&self, course_id: i64) -> usize {
        self.enrollment_requests
            .iter()
            .filter(|r| r.course_id == course_id && r.status == EnrollmentStatus::Pending)
            .count()
    }
}
