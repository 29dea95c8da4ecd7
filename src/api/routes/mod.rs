//! API route handlers

pub mod auth;
pub mod blocks;
pub mod courses;
pub mod student;
pub mod users;

use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::AuthFailure;
use crate::error::Result;

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AuthFailure>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
            kind: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(message.into()),
            kind: None,
        }
    }
}

/// `$select` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct SelectQuery {
    #[serde(rename = "$select")]
    pub select: Option<String>,
}

impl SelectQuery {
    /// Requested field names; empty when every field is wanted
    pub fn fields(&self) -> Vec<&str> {
        self.select
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    }
}

/// Serialize `value` and keep only `fields` plus `id`.
///
/// Unknown field names are ignored; an empty selection keeps everything.
pub fn select_fields<T: Serialize>(value: &T, fields: &[&str]) -> Result<Value> {
    let full = serde_json::to_value(value)?;
    if fields.is_empty() {
        return Ok(full);
    }

    let Value::Object(object) = full else {
        return Ok(full);
    };
    let mut selected = Map::new();
    for field in fields.iter().copied().chain(std::iter::once("id")) {
        if let Some(v) = object.get(field) {
            selected.insert(field.to_string(), v.clone());
        }
    }
    Ok(Value::Object(selected))
}

pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok("healthy"))
}

pub async fn welcome() -> impl IntoResponse {
    Json(ApiResponse::message("Welcome to the WaiEdu API"))
}
