//! Course catalog and student enrollment

pub mod models;

use std::collections::HashMap;
use std::sync::Arc;

pub use models::*;

use crate::auth::gate::{either, require_owner, require_role, Guard};
use crate::auth::models::{User, UserRole};
use crate::error::{Error, Result};
use crate::store::DataStore;
use crate::validation;

/// Parse the `$subject` and `$teacher` query values (comma separated)
pub fn parse_filter(subjects: Option<&str>, teachers: Option<&str>) -> Result<CourseFilter> {
    let subject_ids = split_list(subjects).map(str::to_string).collect();
    let teacher_ids = split_list(teachers)
        .map(|t| t.parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| {
            Error::validation("Invalid teacher ID format. Teacher IDs must be integers.")
        })?;

    Ok(CourseFilter {
        published_only: true,
        subject_ids,
        teacher_ids,
    })
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Course operations on behalf of an authenticated user
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DataStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Published courses matching `filter`, with teacher and subject names
    pub async fn list_published(&self, filter: &CourseFilter) -> Result<CourseListing> {
        let mut filter = filter.clone();
        filter.published_only = true;

        let courses = self.store.list_courses(&filter).await?;
        let mut names = NameCache::default();
        let mut views = Vec::with_capacity(courses.len());
        for course in courses {
            views.push(names.describe(self.store.as_ref(), course, None).await?);
        }

        let subject = match filter.subject_ids.as_slice() {
            [only] => self.store.get_subject(only).await?,
            _ => None,
        };
        let teacher = match filter.teacher_ids.as_slice() {
            [only] => self
                .store
                .get_user_by_id(*only)
                .await?
                .filter(|u| u.has_role(UserRole::Teacher))
                .map(|u| TeacherSummary { id: u.id, name: u.name }),
            _ => None,
        };

        Ok(CourseListing {
            courses: views,
            subject,
            teacher,
        })
    }

    /// Load a course or fail with `NotFound`
    pub async fn load(&self, id: i64) -> Result<Course> {
        self.store
            .get_course(id)
            .await?
            .ok_or_else(|| Error::NotFound("Course".to_string()))
    }

    /// A course as seen by `user`; unpublished courses only exist for their owner
    pub async fn get_visible(&self, user: &User, id: i64) -> Result<CourseView> {
        let course = self.load(id).await?;
        if !course.is_published && require_owner(Course::owner_id).check(user, &course).is_err() {
            return Err(Error::NotFound("Course".to_string()));
        }
        NameCache::default()
            .describe(self.store.as_ref(), course, None)
            .await
    }

    pub async fn create(&self, teacher: &User, req: CreateCourseRequest) -> Result<Course> {
        let title = validation::required(req.title.as_deref(), "Title is required")?.to_string();
        let price = validation::validate_price(req.price.unwrap_or(0))?;
        let currency_code = validation::validate_currency(req.currency_code.as_deref())?;
        if let Some(subject_id) = req.subject_id.as_deref() {
            self.require_subject(subject_id).await?;
        }

        let course = self
            .store
            .insert_course(NewCourse {
                teacher_user_id: teacher.id,
                title,
                category: req.category,
                description: req.description,
                image_url: req.image_url,
                price,
                currency_code,
                subject_id: req.subject_id,
                is_published: req.is_published.unwrap_or(false),
            })
            .await?;

        tracing::info!("Teacher {} created course {}", teacher.id, course.id);
        Ok(course)
    }

    /// Apply a partial update to a course owned by `user`
    pub async fn update(&self, user: &User, id: i64, req: UpdateCourseRequest) -> Result<Course> {
        let course = self.load(id).await?;
        require_owner(Course::owner_id).check(user, &course)?;

        if let Some(title) = req.title.as_deref() {
            validation::required(Some(title), "Title cannot be empty")?;
        }
        if let Some(price) = req.price {
            validation::validate_price(price)?;
        }
        let currency_code = req
            .currency_code
            .as_deref()
            .map(|c| validation::validate_currency(Some(c)))
            .transpose()?;
        if let Some(Some(subject_id)) = req.subject_id.as_ref() {
            self.require_subject(subject_id).await?;
        }

        let updated = self
            .store
            .update_course(
                id,
                CourseUpdate {
                    title: req.title,
                    description: req.description,
                    price: req.price,
                    currency_code,
                    subject_id: req.subject_id,
                    category: req.category,
                    image_url: req.image_url,
                    is_published: req.is_published,
                },
            )
            .await?;

        tracing::info!("Course {} updated by user {}", id, user.id);
        Ok(updated)
    }

    /// Delete a course owned by `user`, together with its enrollments
    pub async fn delete(&self, user: &User, id: i64) -> Result<()> {
        let course = self.load(id).await?;
        require_owner(Course::owner_id).check(user, &course)?;

        if !self.store.delete_course(id).await? {
            return Err(Error::NotFound("Course".to_string()));
        }
        tracing::info!("Course {} deleted by user {}", id, user.id);
        Ok(())
    }

    /// Every course taught by `teacher`, published or not, with enrollment counts
    pub async fn my_courses(&self, teacher: &User) -> Result<Vec<CourseView>> {
        let courses = self.store.list_courses(&CourseFilter::taught_by(teacher.id)).await?;
        let mut names = NameCache::default();
        let mut views = Vec::with_capacity(courses.len());
        for course in courses {
            let count = self.store.list_enrollments_for_course(course.id).await?.len();
            let mut view = names.describe(self.store.as_ref(), course, Some(count)).await?;
            view.teacher_name = None;
            views.push(view);
        }
        Ok(views)
    }

    /// Enrollment count and revenue; admins see every course, others only their own
    pub async fn analytics(&self, user: &User, id: i64) -> Result<CourseAnalytics> {
        let course = self.load(id).await?;
        either(require_role([UserRole::Admin]), require_owner(Course::owner_id))
            .check(user, &course)?;

        let enrollments = self.store.list_enrollments_for_course(id).await?;
        Ok(CourseAnalytics {
            course_id: course.id,
            course_title: course.title,
            enrollment_count: enrollments.len(),
            total_revenue: enrollments.iter().map(|e| e.price_at_enrollment).sum(),
            currency_code: course.currency_code,
        })
    }

    /// Enroll `student` in a published course at its current price
    pub async fn enroll(&self, student: &User, course_id: i64) -> Result<EnrollmentView> {
        let course = self
            .store
            .get_course(course_id)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| Error::NotFound("Course".to_string()))?;

        if self.store.find_enrollment(student.id, course_id).await?.is_some() {
            return Err(Error::Conflict(
                "You are already enrolled in this course".to_string(),
            ));
        }

        let enrollment = self
            .store
            .insert_enrollment(NewEnrollment {
                student_user_id: student.id,
                course_id,
                price_at_enrollment: course.price,
                currency_at_enrollment: course.currency_code.clone(),
            })
            .await?;

        tracing::info!("Student {} enrolled in course {}", student.id, course_id);
        Ok(EnrollmentView {
            course_id,
            course_title: Some(course.title),
            progress: enrollment.progress,
            enrollment_date: enrollment.enrollment_date,
            price_at_enrollment: enrollment.price_at_enrollment,
            currency_at_enrollment: enrollment.currency_at_enrollment,
        })
    }

    pub async fn student_enrollments(&self, student: &User) -> Result<Vec<EnrollmentView>> {
        let enrollments = self.store.list_enrollments_for_student(student.id).await?;
        let mut views = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let title = self
                .store
                .get_course(enrollment.course_id)
                .await?
                .map(|c| c.title);
            views.push(EnrollmentView {
                course_id: enrollment.course_id,
                course_title: title,
                progress: enrollment.progress,
                enrollment_date: enrollment.enrollment_date,
                price_at_enrollment: enrollment.price_at_enrollment,
                currency_at_enrollment: enrollment.currency_at_enrollment,
            });
        }
        Ok(views)
    }

    async fn require_subject(&self, subject_id: &str) -> Result<Subject> {
        self.store
            .get_subject(subject_id)
            .await?
            .ok_or_else(|| Error::validation(format!("Subject with ID {} not found", subject_id)))
    }
}

/// Memoized teacher and subject names for one listing
#[derive(Default)]
struct NameCache {
    teachers: HashMap<i64, Option<String>>,
    subjects: HashMap<String, Option<String>>,
}

impl NameCache {
    async fn describe(
        &mut self,
        store: &dyn DataStore,
        course: Course,
        enrollment_count: Option<usize>,
    ) -> Result<CourseView> {
        let teacher_name = match course.teacher_user_id {
            Some(id) => match self.teachers.get(&id) {
                Some(name) => name.clone(),
                None => {
                    let name = store.get_user_by_id(id).await?.map(|u| u.name);
                    self.teachers.insert(id, name.clone());
                    name
                }
            },
            None => None,
        };

        let subject_name = match course.subject_id.as_deref() {
            Some(id) => match self.subjects.get(id) {
                Some(name) => name.clone(),
                None => {
                    let name = store.get_subject(id).await?.map(|s| s.name);
                    self.subjects.insert(id.to_string(), name.clone());
                    name
                }
            },
            None => None,
        };

        Ok(CourseView {
            course,
            teacher_name,
            subject_name,
            enrollment_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter(Some("math, physics,"), Some("3,4")).unwrap();
        assert!(filter.published_only);
        assert_eq!(filter.subject_ids, vec!["math", "physics"]);
        assert_eq!(filter.teacher_ids, vec![3, 4]);

        let empty = parse_filter(None, Some("")).unwrap();
        assert!(empty.subject_ids.is_empty());
        assert!(empty.teacher_ids.is_empty());

        let err = parse_filter(None, Some("3,abc")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid teacher ID format. Teacher IDs must be integers."
        );
    }
}
