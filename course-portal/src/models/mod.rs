pub mod course;
pub mod enrollment;
pub mod user;

pub use course::{Course, CourseDraft, TeacherSummary};
pub use enrollment::{EnrollmentRequest, EnrollmentStatus, NewEnrollment, StudentSummary};
pub use user::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, Role, Session,
    UserProfile,
};
