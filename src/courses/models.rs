//! Course catalog and enrollment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only currency courses are priced in
pub const DEFAULT_CURRENCY: &str = "VND";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub teacher_user_id: Option<i64>,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub currency_code: String,
    pub subject_id: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Owner id used by ownership guards
    pub fn owner_id(&self) -> Option<i64> {
        self.teacher_user_id
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub teacher_user_id: i64,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub currency_code: String,
    pub subject_id: Option<String>,
    pub is_published: bool,
}

/// Partial course update. Nullable columns use `Option<Option<_>>` so a
/// request can clear them.
#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub currency_code: Option<String>,
    pub subject_id: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub is_published: Option<bool>,
}

/// Catalog query; empty lists mean "no filter"
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub published_only: bool,
    pub subject_ids: Vec<String>,
    pub teacher_ids: Vec<i64>,
}

impl CourseFilter {
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }

    pub fn taught_by(teacher_id: i64) -> Self {
        Self {
            teacher_ids: vec![teacher_id],
            ..Default::default()
        }
    }

    pub fn matches(&self, course: &Course) -> bool {
        if self.published_only && !course.is_published {
            return false;
        }
        if !self.subject_ids.is_empty()
            && !course
                .subject_id
                .as_ref()
                .is_some_and(|s| self.subject_ids.contains(s))
        {
            return false;
        }
        if !self.teacher_ids.is_empty()
            && !course
                .teacher_user_id
                .is_some_and(|t| self.teacher_ids.contains(&t))
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_user_id: i64,
    pub course_id: i64,
    pub enrollment_date: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub progress: i16,
    pub completed_date: Option<DateTime<Utc>>,
    pub price_at_enrollment: i64,
    pub currency_at_enrollment: String,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_user_id: i64,
    pub course_id: i64,
    pub price_at_enrollment: i64,
    pub currency_at_enrollment: String,
}

/// Course creation payload
#[derive(Debug, Default, Deserialize)]
pub struct CreateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub currency_code: Option<String>,
    pub subject_id: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_published: Option<bool>,
}

/// Course update payload. A key that is present with `null` clears the field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub currency_code: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub subject_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
    pub is_published: Option<bool>,
}

/// Distinguishes an absent key (outer `None`) from an explicit `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollRequest {
    pub course_id: Option<i64>,
}

/// Course as presented to API callers
#[derive(Debug, Clone, Serialize)]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherSummary {
    pub id: i64,
    pub name: String,
}

/// Published catalog listing, with the single subject/teacher echoed back
/// when the filter named exactly one
#[derive(Debug, Clone, Serialize)]
pub struct CourseListing {
    pub courses: Vec<CourseView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<TeacherSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    pub course_id: i64,
    pub course_title: Option<String>,
    pub progress: i16,
    pub enrollment_date: DateTime<Utc>,
    pub price_at_enrollment: i64,
    pub currency_at_enrollment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAnalytics {
    pub course_id: i64,
    pub course_title: String,
    pub enrollment_count: usize,
    pub total_revenue: i64,
    pub currency_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(teacher: Option<i64>, subject: Option<&str>, published: bool) -> Course {
        let now = Utc::now();
        Course {
            id: 1,
            teacher_user_id: teacher,
            title: "Algebra".to_string(),
            category: None,
            description: None,
            image_url: None,
            price: 0,
            currency_code: DEFAULT_CURRENCY.to_string(),
            subject_id: subject.map(str::to_string),
            is_published: published,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_filter_matching() {
        let published = CourseFilter::published();
        assert!(published.matches(&course(Some(1), None, true)));
        assert!(!published.matches(&course(Some(1), None, false)));

        let by_subject = CourseFilter {
            subject_ids: vec!["math".to_string(), "physics".to_string()],
            ..Default::default()
        };
        assert!(by_subject.matches(&course(None, Some("math"), false)));
        assert!(!by_subject.matches(&course(None, Some("art"), false)));
        assert!(!by_subject.matches(&course(None, None, false)));

        let by_teacher = CourseFilter::taught_by(3);
        assert!(by_teacher.matches(&course(Some(3), None, false)));
        assert!(!by_teacher.matches(&course(Some(4), None, false)));
        assert!(!by_teacher.matches(&course(None, None, false)));
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let req: UpdateCourseRequest =
            serde_json::from_str(r#"{"description": null, "title": "New"}"#).unwrap();
        assert_eq!(req.description, Some(None));
        assert_eq!(req.category, None);
        assert_eq!(req.title.as_deref(), Some("New"));
    }

    #[test]
    fn test_course_view_flattens() {
        let view = CourseView {
            course: course(Some(2), Some("math"), true),
            teacher_name: Some("Bob".to_string()),
            subject_name: None,
            enrollment_count: Some(3),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "Algebra");
        assert_eq!(json["teacher_name"], "Bob");
        assert_eq!(json["enrollment_count"], 3);
        assert!(json.get("subject_name").is_none());
    }
}
