use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::course::Course;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Enrolled,
    Rejected,
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnrollmentStatus::Pending => "PENDING",
            EnrollmentStatus::Enrolled => "ENROLLED",
            EnrollmentStatus::Rejected => "REJECTED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub id: i64,
    #[serde(rename = "student")]
    pub student_id: i64,
    #[serde(rename = "course")]
    pub course_id: i64,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_waitlisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_detail: Option<Course>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_detail: Option<StudentSummary>,
}

impl EnrollmentRequest {
    pub fn is_pending(&self) -> bool {
        self.status == EnrollmentStatus::Pending
    }

    /// Name of the student for display, falling back to the id.
    pub fn student_label(&self) -> String {
        self.student_detail
            .as_ref()
            .map(|s| s.username.clone())
            .unwrap_or_else(|| format!("student #{}", self.student_id))
    }
}

/// Body for `POST /enrollment-requests/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewEnrollment {
    pub student: i64,
    pub course: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enrollment_from_server_payload() {
        let request: EnrollmentRequest = serde_json::from_value(json!({
            "id": 11, "student": 1, "course": 3, "status": "PENDING",
            "created_at": "2025-02-01T10:00:00.123456Z",
            "updated_at": "2025-02-01T10:00:00.123456Z",
            "is_waitlisted": true,
            "course_detail": {
                "id": 3, "name": "Compilers", "code": "CS401", "description": "",
                "max_capacity": 2, "teacher": 9, "enrolled_count": 2
            }
        }))
        .unwrap();
        assert!(request.is_pending());
        assert!(request.is_waitlisted);
        assert_eq!(
            request.course_detail.as_ref().map(|c| c.code.as_str()),
            Some("CS401")
        );
        assert_eq!(request.student_label(), "student #1");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result: Result<EnrollmentStatus, _> = serde_json::from_value(json!("CANCELLED"));
        assert!(result.is_err());
        assert_eq!(EnrollmentStatus::Enrolled.to_string(), "ENROLLED");
    }
}
