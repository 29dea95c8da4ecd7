//! Storage backends
//!
//! [`DataStore`] holds users, subjects, courses and enrollments;
//! [`DocumentStore`] holds free-form JSON documents grouped by collection.
//! Both are implemented by [`MemoryStore`] and [`PostgresStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::models::{NewUser, User, UserUpdate};
use crate::config::{Config, StoreBackend};
use crate::courses::models::{
    Course, CourseFilter, CourseUpdate, Enrollment, NewCourse, NewEnrollment, Subject,
};
use crate::error::Result;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// A JSON object stored under a collection
pub type Document = serde_json::Map<String, Value>;

/// Relational records behind accounts and the course catalog
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// User holding `token` whose reset window is still open at `now`
    async fn get_user_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Fails with `Error::Conflict` when the email is taken
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    /// Fails with `Error::NotFound` when no such user exists
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User>;

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>>;

    /// Link subjects to a user; unknown subject ids are skipped
    async fn add_user_subjects(&self, user_id: i64, subject_ids: &[String]) -> Result<()>;

    async fn list_user_subjects(&self, user_id: i64) -> Result<Vec<Subject>>;

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>>;

    async fn get_course(&self, id: i64) -> Result<Option<Course>>;

    async fn insert_course(&self, course: NewCourse) -> Result<Course>;

    async fn update_course(&self, id: i64, update: CourseUpdate) -> Result<Course>;

    /// Delete a course and its enrollments; `false` when it did not exist
    async fn delete_course(&self, id: i64) -> Result<bool>;

    async fn list_enrollments_for_student(&self, student_id: i64) -> Result<Vec<Enrollment>>;

    async fn list_enrollments_for_course(&self, course_id: i64) -> Result<Vec<Enrollment>>;

    async fn find_enrollment(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>>;

    /// Fails with `Error::Conflict` when the student is already enrolled
    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment>;
}

/// Keyed JSON documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Insert or replace a document
    async fn put(&self, collection: &str, id: &str, body: Document) -> Result<()>;

    /// Merge `fields` into an existing document; `false` when it is missing
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool>;

    /// `false` when the document did not exist
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

/// Both stores, as selected by configuration
#[derive(Clone)]
pub struct Stores {
    pub data: Arc<dyn DataStore>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            data: store.clone(),
            documents: store,
        }
    }

    /// Open the configured backend
    pub async fn open(config: &Config) -> Result<Self> {
        match config.database.backend {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory store");
                Ok(Self::memory())
            }
            StoreBackend::Postgres => {
                let store = Arc::new(PostgresStore::connect(&config.database).await?);
                Ok(Self {
                    data: store.clone(),
                    documents: store,
                })
            }
        }
    }
}
