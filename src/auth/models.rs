//! Account models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::password::PasswordHash;
use crate::courses::Subject;

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Parent,
    /// Platform administrator; never self-registered
    Admin,
}

impl UserRole {
    /// Roles a caller may pick for themselves at registration
    pub const SELF_REGISTERED: [UserRole; 3] = [UserRole::Student, UserRole::Teacher, UserRole::Parent];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Parent => "parent",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "teacher" => Ok(UserRole::Teacher),
            "parent" => Ok(UserRole::Parent),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

/// A stored user account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: PasswordHash,
    pub role: UserRole,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub teaching_subject: Option<String>,
    pub child_grade: Option<String>,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// Fields for a user about to be inserted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: PasswordHash,
    pub role: UserRole,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub teaching_subject: Option<String>,
    pub child_grade: Option<String>,
    pub verification_token: Option<String>,
}

impl NewUser {
    pub fn new(name: String, email: String, password: PasswordHash, role: UserRole) -> Self {
        Self {
            name,
            email,
            password,
            role,
            phone: None,
            birth_date: None,
            gender: None,
            grade: None,
            school: None,
            teaching_subject: None,
            child_grade: None,
            verification_token: None,
        }
    }
}

/// Partial update of a user; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<PasswordHash>,
    pub is_verified: Option<bool>,
    pub reset_token: Option<Option<String>>,
    pub reset_token_expiry: Option<Option<DateTime<Utc>>>,
}

/// Login credentials
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration payload
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub teaching_subject: Option<String>,
    pub child_grade: Option<String>,
    #[serde(default)]
    pub interested_subjects: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Token plus user, returned by login and registration
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// User information in responses; never carries credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub role: UserRole,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub teaching_subject: Option<String>,
    pub child_grade: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
}

impl UserInfo {
    pub fn with_subjects(mut self, subjects: Vec<Subject>) -> Self {
        self.subjects = subjects;
        self
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            birth_date: user.birth_date,
            gender: user.gender,
            role: user.role,
            grade: user.grade,
            school: user.school,
            teaching_subject: user.teaching_subject,
            child_grade: user.child_grade,
            is_verified: user.is_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
            subjects: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_display_and_parse() {
        for role in [UserRole::Student, UserRole::Teacher, UserRole::Parent, UserRole::Admin] {
            assert_eq!(role.to_string().parse::<UserRole>(), Ok(role));
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_admin_cannot_self_register() {
        assert!(!UserRole::SELF_REGISTERED.contains(&UserRole::Admin));
    }

    #[test]
    fn test_user_info_omits_credentials() {
        let now = Utc::now();
        let user = User {
            id: 7,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: PasswordHash::from_stored("$2b$04$abcdefghijklmnopqrstuv"),
            role: UserRole::Teacher,
            phone: None,
            birth_date: None,
            gender: Some(Gender::Female),
            grade: None,
            school: None,
            teaching_subject: Some("math".to_string()),
            child_grade: None,
            is_verified: false,
            verification_token: Some("verify-me".to_string()),
            reset_token: Some("reset-me".to_string()),
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserInfo::from(user)).unwrap();
        assert_eq!(json["teachingSubject"], "math");
        assert_eq!(json["role"], "teacher");
        assert!(json.get("password").is_none());
        assert!(json.get("resetToken").is_none());
        assert!(json.get("verificationToken").is_none());
        assert!(json.get("subjects").is_none());
    }
}
