//! PostgreSQL store backend
//!
//! Users, courses and enrollments live in the existing relational schema;
//! documents live in a `documents` table with a JSONB body, created on
//! connect if missing. Timestamp columns are `TIMESTAMP WITHOUT TIME ZONE`
//! holding UTC.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};

use super::{DataStore, Document, DocumentStore};
use crate::auth::models::{Gender, NewUser, User, UserRole, UserUpdate};
use crate::auth::password::PasswordHash;
use crate::config::DatabaseConfig;
use crate::courses::models::{
    Course, CourseFilter, CourseUpdate, Enrollment, NewCourse, NewEnrollment, Subject,
};
use crate::error::{Error, Result};

const USER_COLUMNS: &str = "id::int8 AS id, name, email, password, role::text AS role, phone, \
     birth_date, gender::text AS gender, grade, school, teaching_subject, child_grade, \
     is_verified, verification_token, reset_token, reset_token_expiry, \
     COALESCE(created_at, LOCALTIMESTAMP) AS created_at, \
     COALESCE(updated_at, LOCALTIMESTAMP) AS updated_at";

const COURSE_COLUMNS: &str = "id::int8 AS id, teacher_user_id::int8 AS teacher_user_id, title, \
     category, description, image_url, price, currency_code, subject_id, is_published, \
     COALESCE(created_at, LOCALTIMESTAMP) AS created_at, \
     COALESCE(updated_at, LOCALTIMESTAMP) AS updated_at";

const ENROLLMENT_COLUMNS: &str = "id::int8 AS id, COALESCE(student_user_id, 0)::int8 AS student_user_id, \
     course_id::int8 AS course_id, enrollment_date, last_accessed, progress, completed_date, \
     price_at_enrollment, currency_at_enrollment";

const DOCUMENTS_DDL: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body JSONB NOT NULL,
    PRIMARY KEY (collection, id)
)";

/// Store backed by a single pipelined PostgreSQL connection
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect, retrying up to `connect_retries` times
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let conn_string = config.connection_string();
        let attempts = config.connect_retries.max(1);
        let mut attempt = 1;

        let client = loop {
            match tokio_postgres::connect(&conn_string, NoTls).await {
                Ok((client, connection)) => {
                    // Spawn the connection handler
                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            tracing::error!("PostgreSQL connection error: {}", e);
                        }
                    });
                    break client;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "PostgreSQL connection attempt {}/{} failed: {}",
                        attempt,
                        attempts,
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
                }
                Err(e) => return Err(Error::Database(e)),
            }
        };

        client.execute(DOCUMENTS_DDL, &[]).await?;
        tracing::info!(
            "Connected to PostgreSQL at {}:{}/{}",
            config.host,
            config.port,
            config.dbname
        );
        Ok(Self { client })
    }
}

fn utc(ts: NaiveDateTime) -> DateTime<Utc> {
    ts.and_utc()
}

fn conflict_on_unique(e: tokio_postgres::Error, message: &str) -> Error {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        Error::Conflict(message.to_string())
    } else {
        Error::Database(e)
    }
}

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = row.try_get("role")?;
    let gender: Option<String> = row.try_get("gender")?;
    let expiry: Option<NaiveDateTime> = row.try_get("reset_token_expiry")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password: PasswordHash::from_stored(row.try_get::<_, String>("password")?),
        role: role.parse::<UserRole>().map_err(Error::Other)?,
        phone: row.try_get("phone")?,
        birth_date: row.try_get("birth_date")?,
        gender: gender
            .map(|g| g.parse::<Gender>())
            .transpose()
            .map_err(Error::Other)?,
        grade: row.try_get("grade")?,
        school: row.try_get("school")?,
        teaching_subject: row.try_get("teaching_subject")?,
        child_grade: row.try_get("child_grade")?,
        is_verified: row.try_get("is_verified")?,
        verification_token: row.try_get("verification_token")?,
        reset_token: row.try_get("reset_token")?,
        reset_token_expiry: expiry.map(utc),
        created_at: utc(row.try_get("created_at")?),
        updated_at: utc(row.try_get("updated_at")?),
    })
}

fn course_from_row(row: &Row) -> Result<Course> {
    Ok(Course {
        id: row.try_get("id")?,
        teacher_user_id: row.try_get("teacher_user_id")?,
        title: row.try_get("title")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        price: row.try_get("price")?,
        currency_code: row.try_get("currency_code")?,
        subject_id: row.try_get("subject_id")?,
        is_published: row.try_get("is_published")?,
        created_at: utc(row.try_get("created_at")?),
        updated_at: utc(row.try_get("updated_at")?),
    })
}

fn enrollment_from_row(row: &Row) -> Result<Enrollment> {
    let last_accessed: Option<NaiveDateTime> = row.try_get("last_accessed")?;
    let completed: Option<NaiveDateTime> = row.try_get("completed_date")?;

    Ok(Enrollment {
        id: row.try_get("id")?,
        student_user_id: row.try_get("student_user_id")?,
        course_id: row.try_get("course_id")?,
        enrollment_date: utc(row.try_get("enrollment_date")?),
        last_accessed: last_accessed.map(utc),
        progress: row.try_get("progress")?,
        completed_date: completed.map(utc),
        price_at_enrollment: row.try_get("price_at_enrollment")?,
        currency_at_enrollment: row.try_get("currency_at_enrollment")?,
    })
}

fn document_from_row(row: &Row) -> Result<Document> {
    match row.try_get::<_, Value>("body")? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Other(format!(
            "document body is not an object: {}",
            other
        ))),
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1::int8", USER_COLUMNS);
        self.client
            .query_opt(&sql, &[&id])
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        self.client
            .query_opt(&sql, &[&email])
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn get_user_by_reset_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_token = $1 AND reset_token_expiry > $2",
            USER_COLUMNS
        );
        self.client
            .query_opt(&sql, &[&token, &now.naive_utc()])
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        self.client
            .query(&sql, &[])
            .await?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password, role, phone, birth_date, gender, grade, \
             school, teaching_subject, child_grade, is_verified, verification_token) \
             VALUES ($1, $2, $3, $4::text::user_role, $5, $6, $7::text::user_gender, $8, $9, \
             $10, $11, false, $12) RETURNING {}",
            USER_COLUMNS
        );
        let gender = user.gender.map(|g| g.as_str());
        let row = self
            .client
            .query_one(
                &sql,
                &[
                    &user.name,
                    &user.email,
                    &user.password.as_str(),
                    &user.role.as_str(),
                    &user.phone,
                    &user.birth_date,
                    &gender,
                    &user.grade,
                    &user.school,
                    &user.teaching_subject,
                    &user.child_grade,
                    &user.verification_token,
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, "Email already registered"))?;
        user_from_row(&row)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        let sql = format!(
            "UPDATE users SET \
             name = COALESCE($2, name), \
             phone = COALESCE($3, phone), \
             password = COALESCE($4, password), \
             is_verified = COALESCE($5, is_verified), \
             reset_token = CASE WHEN $6::bool THEN $7::varchar ELSE reset_token END, \
             reset_token_expiry = CASE WHEN $8::bool THEN $9::timestamp ELSE reset_token_expiry END, \
             updated_at = LOCALTIMESTAMP \
             WHERE id = $1::int8 RETURNING {}",
            USER_COLUMNS
        );
        let password = update.password.as_ref().map(|p| p.as_str());
        let set_token = update.reset_token.is_some();
        let token = update.reset_token.flatten();
        let set_expiry = update.reset_token_expiry.is_some();
        let expiry = update.reset_token_expiry.flatten().map(|t| t.naive_utc());

        let row = self
            .client
            .query_opt(
                &sql,
                &[
                    &id,
                    &update.name,
                    &update.phone,
                    &password,
                    &update.is_verified,
                    &set_token,
                    &token,
                    &set_expiry,
                    &expiry,
                ],
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))?;
        user_from_row(&row)
    }

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
        let row = self
            .client
            .query_opt("SELECT id, name FROM subjects WHERE id = $1", &[&id])
            .await?;
        row.map(|r| {
            Ok::<_, Error>(Subject {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn add_user_subjects(&self, user_id: i64, subject_ids: &[String]) -> Result<()> {
        if subject_ids.is_empty() {
            return Ok(());
        }
        self.client
            .execute(
                "INSERT INTO user_subjects (user_id, subject_id) \
                 SELECT $1::int8, s.id FROM subjects s \
                 WHERE s.id = ANY($2::text[]) AND NOT EXISTS ( \
                     SELECT 1 FROM user_subjects us \
                     WHERE us.user_id = $1::int8 AND us.subject_id = s.id)",
                &[&user_id, &subject_ids],
            )
            .await?;
        Ok(())
    }

    async fn list_user_subjects(&self, user_id: i64) -> Result<Vec<Subject>> {
        let rows = self
            .client
            .query(
                "SELECT s.id, s.name FROM subjects s \
                 JOIN user_subjects us ON us.subject_id = s.id \
                 WHERE us.user_id = $1::int8 ORDER BY us.id",
                &[&user_id],
            )
            .await?;
        rows.iter()
            .map(|r| {
                Ok::<_, Error>(Subject {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                })
            })
            .collect()
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>> {
        let sql = format!(
            "SELECT {} FROM courses \
             WHERE (NOT $1::bool OR is_published) \
             AND (cardinality($2::text[]) = 0 OR subject_id = ANY($2::text[])) \
             AND (cardinality($3::int8[]) = 0 OR teacher_user_id = ANY($3::int8[])) \
             ORDER BY id",
            COURSE_COLUMNS
        );
        self.client
            .query(
                &sql,
                &[&filter.published_only, &filter.subject_ids, &filter.teacher_ids],
            )
            .await?
            .iter()
            .map(course_from_row)
            .collect()
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1::int8", COURSE_COLUMNS);
        self.client
            .query_opt(&sql, &[&id])
            .await?
            .as_ref()
            .map(course_from_row)
            .transpose()
    }

    async fn insert_course(&self, course: NewCourse) -> Result<Course> {
        let sql = format!(
            "INSERT INTO courses (teacher_user_id, title, category, description, image_url, \
             price, currency_code, subject_id, is_published) \
             VALUES ($1::int8, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            COURSE_COLUMNS
        );
        let row = self
            .client
            .query_one(
                &sql,
                &[
                    &course.teacher_user_id,
                    &course.title,
                    &course.category,
                    &course.description,
                    &course.image_url,
                    &course.price,
                    &course.currency_code,
                    &course.subject_id,
                    &course.is_published,
                ],
            )
            .await?;
        course_from_row(&row)
    }

    async fn update_course(&self, id: i64, update: CourseUpdate) -> Result<Course> {
        let sql = format!(
            "UPDATE courses SET \
             title = COALESCE($2, title), \
             description = CASE WHEN $3::bool THEN $4::text ELSE description END, \
             price = COALESCE($5, price), \
             currency_code = COALESCE($6, currency_code), \
             subject_id = CASE WHEN $7::bool THEN $8::varchar ELSE subject_id END, \
             category = CASE WHEN $9::bool THEN $10::varchar ELSE category END, \
             image_url = CASE WHEN $11::bool THEN $12::varchar ELSE image_url END, \
             is_published = COALESCE($13, is_published), \
             updated_at = LOCALTIMESTAMP \
             WHERE id = $1::int8 RETURNING {}",
            COURSE_COLUMNS
        );
        let set_description = update.description.is_some();
        let description = update.description.flatten();
        let set_subject = update.subject_id.is_some();
        let subject_id = update.subject_id.flatten();
        let set_category = update.category.is_some();
        let category = update.category.flatten();
        let set_image = update.image_url.is_some();
        let image_url = update.image_url.flatten();

        let row = self
            .client
            .query_opt(
                &sql,
                &[
                    &id,
                    &update.title,
                    &set_description,
                    &description,
                    &update.price,
                    &update.currency_code,
                    &set_subject,
                    &subject_id,
                    &set_category,
                    &category,
                    &set_image,
                    &image_url,
                    &update.is_published,
                ],
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Course {}", id)))?;
        course_from_row(&row)
    }

    async fn delete_course(&self, id: i64) -> Result<bool> {
        self.client
            .execute(
                "DELETE FROM student_enrollments WHERE course_id = $1::int8",
                &[&id],
            )
            .await?;
        let deleted = self
            .client
            .execute("DELETE FROM courses WHERE id = $1::int8", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    async fn list_enrollments_for_student(&self, student_id: i64) -> Result<Vec<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM student_enrollments WHERE student_user_id = $1::int8 ORDER BY id",
            ENROLLMENT_COLUMNS
        );
        self.client
            .query(&sql, &[&student_id])
            .await?
            .iter()
            .map(enrollment_from_row)
            .collect()
    }

    async fn list_enrollments_for_course(&self, course_id: i64) -> Result<Vec<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM student_enrollments WHERE course_id = $1::int8 ORDER BY id",
            ENROLLMENT_COLUMNS
        );
        self.client
            .query(&sql, &[&course_id])
            .await?
            .iter()
            .map(enrollment_from_row)
            .collect()
    }

    async fn find_enrollment(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        let sql = format!(
            "SELECT {} FROM student_enrollments \
             WHERE student_user_id = $1::int8 AND course_id = $2::int8",
            ENROLLMENT_COLUMNS
        );
        self.client
            .query_opt(&sql, &[&student_id, &course_id])
            .await?
            .as_ref()
            .map(enrollment_from_row)
            .transpose()
    }

    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment> {
        const DUPLICATE: &str = "Already enrolled in this course";

        if self
            .find_enrollment(enrollment.student_user_id, enrollment.course_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(DUPLICATE.to_string()));
        }

        let sql = format!(
            "INSERT INTO student_enrollments (student_user_id, course_id, enrollment_date, \
             progress, price_at_enrollment, currency_at_enrollment) \
             VALUES ($1::int8, $2::int8, LOCALTIMESTAMP, 0, $3, $4) RETURNING {}",
            ENROLLMENT_COLUMNS
        );
        let row = self
            .client
            .query_one(
                &sql,
                &[
                    &enrollment.student_user_id,
                    &enrollment.course_id,
                    &enrollment.price_at_enrollment,
                    &enrollment.currency_at_enrollment,
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE))?;
        enrollment_from_row(&row)
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        self.client
            .query(
                "SELECT body FROM documents WHERE collection = $1 \
                 ORDER BY length(id), id",
                &[&collection],
            )
            .await?
            .iter()
            .map(document_from_row)
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.client
            .query_opt(
                "SELECT body FROM documents WHERE collection = $1 AND id = $2",
                &[&collection, &id],
            )
            .await?
            .as_ref()
            .map(document_from_row)
            .transpose()
    }

    async fn put(&self, collection: &str, id: &str, body: Document) -> Result<()> {
        let body = Value::Object(body);
        self.client
            .execute(
                "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) \
                 ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body",
                &[&collection, &id, &body],
            )
            .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        let fields = Value::Object(fields);
        let updated = self
            .client
            .execute(
                "UPDATE documents SET body = body || $3::jsonb \
                 WHERE collection = $1 AND id = $2",
                &[&collection, &id, &fields],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let deleted = self
            .client
            .execute(
                "DELETE FROM documents WHERE collection = $1 AND id = $2",
                &[&collection, &id],
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND id = $2)",
                &[&collection, &id],
            )
            .await?;
        Ok(row.try_get(0)?)
    }
}
