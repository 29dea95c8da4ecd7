//! In-memory store backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{DataStore, Document, DocumentStore};
use crate::auth::models::{NewUser, User, UserUpdate};
use crate::courses::models::{
    Course, CourseFilter, CourseUpdate, Enrollment, NewCourse, NewEnrollment, Subject,
};
use crate::error::{Error, Result};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    subjects: BTreeMap<String, Subject>,
    user_subjects: BTreeMap<i64, Vec<String>>,
    courses: BTreeMap<i64, Course>,
    enrollments: BTreeMap<i64, Enrollment>,
    documents: HashMap<String, BTreeMap<String, Document>>,
    next_user_id: i64,
    next_course_id: i64,
    next_enrollment_id: i64,
}

impl State {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// Process-local store; contents are lost on restart
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subject that courses and users may reference
    pub async fn add_subject(&self, id: impl Into<String>, name: impl Into<String>) {
        let subject = Subject {
            id: id.into(),
            name: name.into(),
        };
        self.state
            .write()
            .await
            .subjects
            .insert(subject.id.clone(), subject);
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| {
                u.reset_token.as_deref() == Some(token)
                    && u.reset_token_expiry.is_some_and(|expiry| expiry > now)
            })
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == new.email) {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: State::next_id(&mut state.next_user_id),
            name: new.name,
            email: new.email,
            password: new.password,
            role: new.role,
            phone: new.phone,
            birth_date: new.birth_date,
            gender: new.gender,
            grade: new.grade,
            school: new.school,
            teaching_subject: new.teaching_subject,
            child_grade: new.child_grade,
            is_verified: false,
            verification_token: new.verification_token,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(password) = update.password {
            user.password = password;
        }
        if let Some(verified) = update.is_verified {
            user.is_verified = verified;
        }
        if let Some(token) = update.reset_token {
            user.reset_token = token;
        }
        if let Some(expiry) = update.reset_token_expiry {
            user.reset_token_expiry = expiry;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
        Ok(self.state.read().await.subjects.get(id).cloned())
    }

    async fn add_user_subjects(&self, user_id: i64, subject_ids: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        let known: Vec<String> = subject_ids
            .iter()
            .filter(|id| state.subjects.contains_key(id.as_str()))
            .cloned()
            .collect();

        let linked = state.user_subjects.entry(user_id).or_default();
        for id in known {
            if !linked.contains(&id) {
                linked.push(id);
            }
        }
        Ok(())
    }

    async fn list_user_subjects(&self, user_id: i64) -> Result<Vec<Subject>> {
        let state = self.state.read().await;
        Ok(state
            .user_subjects
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.subjects.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let state = self.state.read().await;
        Ok(state
            .courses
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>> {
        Ok(self.state.read().await.courses.get(&id).cloned())
    }

    async fn insert_course(&self, new: NewCourse) -> Result<Course> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let course = Course {
            id: State::next_id(&mut state.next_course_id),
            teacher_user_id: Some(new.teacher_user_id),
            title: new.title,
            category: new.category,
            description: new.description,
            image_url: new.image_url,
            price: new.price,
            currency_code: new.currency_code,
            subject_id: new.subject_id,
            is_published: new.is_published,
            created_at: now,
            updated_at: now,
        };
        state.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: i64, update: CourseUpdate) -> Result<Course> {
        let mut state = self.state.write().await;
        let course = state
            .courses
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Course {}", id)))?;

        if let Some(title) = update.title {
            course.title = title;
        }
        if let Some(description) = update.description {
            course.description = description;
        }
        if let Some(price) = update.price {
            course.price = price;
        }
        if let Some(currency) = update.currency_code {
            course.currency_code = currency;
        }
        if let Some(subject_id) = update.subject_id {
            course.subject_id = subject_id;
        }
        if let Some(category) = update.category {
            course.category = category;
        }
        if let Some(image_url) = update.image_url {
            course.image_url = image_url;
        }
        if let Some(published) = update.is_published {
            course.is_published = published;
        }
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn delete_course(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.courses.remove(&id).is_none() {
            return Ok(false);
        }
        state.enrollments.retain(|_, e| e.course_id != id);
        Ok(true)
    }

    async fn list_enrollments_for_student(&self, student_id: i64) -> Result<Vec<Enrollment>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .values()
            .filter(|e| e.student_user_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_enrollments_for_course(&self, course_id: i64) -> Result<Vec<Enrollment>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn find_enrollment(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .values()
            .find(|e| e.student_user_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn insert_enrollment(&self, new: NewEnrollment) -> Result<Enrollment> {
        let mut state = self.state.write().await;
        if state
            .enrollments
            .values()
            .any(|e| e.student_user_id == new.student_user_id && e.course_id == new.course_id)
        {
            return Err(Error::Conflict("Already enrolled in this course".to_string()));
        }

        let enrollment = Enrollment {
            id: State::next_id(&mut state.next_enrollment_id),
            student_user_id: new.student_user_id,
            course_id: new.course_id,
            enrollment_date: Utc::now(),
            last_accessed: None,
            progress: 0,
            completed_date: None,
            price_at_enrollment: new.price_at_enrollment,
            currency_at_enrollment: new.currency_at_enrollment,
        };
        state.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, body: Document) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .documents
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), body);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        let mut state = self.state.write().await;
        match state
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        {
            Some(doc) => {
                doc.extend(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .documents
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }
}
