//! Student endpoints under `/main/student`

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api::error::{ApiError, JsonBody};
use crate::api::server::AppState;
use crate::auth::CurrentUser;
use crate::courses::{CourseFilter, EnrollRequest};
use crate::error::Error;

use super::ApiResponse;

pub async fn enrollments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let enrollments = state.catalog.student_enrollments(&user).await?;
    Ok(Json(ApiResponse::with_message(
        "Enrollments retrieved successfully",
        json!({ "enrollments": enrollments }),
    )))
}

pub async fn available_courses(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.catalog.list_published(&CourseFilter::published()).await?;
    let courses: Vec<_> = listing
        .courses
        .into_iter()
        .map(|view| {
            json!({
                "id": view.course.id,
                "title": view.course.title,
                "description": view.course.description,
                "price": view.course.price,
                "currency_code": view.course.currency_code,
            })
        })
        .collect();
    Ok(Json(ApiResponse::with_message(
        "Courses retrieved successfully",
        json!({ "courses": courses }),
    )))
}

pub async fn enroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<EnrollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course_id = req
        .course_id
        .ok_or_else(|| Error::validation("Course ID is required"))?;
    let enrollment = state.catalog.enroll(&user, course_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Enrollment successful",
            json!({ "enrollment": enrollment }),
        )),
    ))
}
