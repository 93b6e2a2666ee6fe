use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub max_capacity: u32,
    #[serde(rename = "teacher")]
    pub teacher_id: i64,
    #[serde(default)]
    pub enrolled_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_detail: Option<TeacherSummary>,
}

impl Course {
    /// Whether the server-reported count leaves room for another student.
    pub fn has_capacity(&self) -> bool {
        self.enrolled_count < self.max_capacity
    }

    pub fn seats_left(&self) -> u32 {
        self.max_capacity.saturating_sub(self.enrolled_count)
    }
}

pub const DEFAULT_MAX_CAPACITY: u32 = 30;

/// Body for course create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct CourseDraft {
    #[validate(length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Ensure this field has between 1 and 50 characters."))]
    pub code: String,
    pub description: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub max_capacity: u32,
    pub teacher: i64,
}

impl CourseDraft {
    pub fn new(name: impl Into<String>, code: impl Into<String>, teacher: i64) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            description: String::new(),
            max_capacity: DEFAULT_MAX_CAPACITY,
            teacher,
        }
    }

    /// Draft carrying the editable fields of an existing course.
    pub fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            code: course.code.clone(),
            description: course.description.clone(),
            max_capacity: course.max_capacity,
            teacher: course.teacher_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_course_from_server_payload() {
        let course: Course = serde_json::from_value(json!({
            "id": 3, "name": "Compilers", "code": "CS401", "description": "",
            "max_capacity": 2, "teacher": 9, "enrolled_count": 2
        }))
        .unwrap();
        assert_eq!(course.teacher_id, 9);
        assert!(!course.has_capacity());
        assert_eq!(course.seats_left(), 0);
        assert!(course.teacher_detail.is_none());
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = CourseDraft::new("Compilers", "CS401", 9);
        assert_eq!(draft.max_capacity, 30);
        assert!(draft.validate().is_ok());

        draft.code.clear();
        draft.max_capacity = 0;
        let errors = portal_core::FieldErrors::from(draft.validate().unwrap_err());
        assert!(errors.get("code").is_some());
        assert!(errors.get("max_capacity").is_some());
    }

    #[test]
    fn test_draft_serializes_teacher_key() {
        let body = serde_json::to_value(CourseDraft::new("Compilers", "CS401", 9)).unwrap();
        assert_eq!(body["teacher"], 9);
        assert_eq!(body["max_capacity"], 30);
    }
}
