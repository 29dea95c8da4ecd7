//! Course catalog under `/main/courses`

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, JsonBody, PathParam, QueryParams};
use crate::api::server::AppState;
use crate::auth::CurrentUser;
use crate::courses::{parse_filter, CreateCourseRequest, UpdateCourseRequest};

use super::{select_fields, ApiResponse, SelectQuery};

#[derive(Debug, Default, Deserialize)]
pub struct CourseQuery {
    #[serde(rename = "$select")]
    pub select: Option<String>,
    #[serde(rename = "$subject")]
    pub subject: Option<String>,
    #[serde(rename = "$teacher")]
    pub teacher: Option<String>,
}

pub async fn list_courses(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    QueryParams(query): QueryParams<CourseQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = parse_filter(query.subject.as_deref(), query.teacher.as_deref())?;
    let listing = state.catalog.list_published(&filter).await?;

    let fields = SelectQuery {
        select: query.select,
    };
    let fields = fields.fields();
    let courses = listing
        .courses
        .iter()
        .map(|view| {
            let mut selected = select_fields(&view.course, &fields)?;
            if let Value::Object(map) = &mut selected {
                if let Some(name) = &view.teacher_name {
                    map.insert("teacher_name".to_string(), json!(name));
                }
                if let Some(name) = &view.subject_name {
                    map.insert("subject_name".to_string(), json!(name));
                }
            }
            Ok(selected)
        })
        .collect::<crate::error::Result<Vec<_>>>()?;

    let mut data = json!({ "courses": courses });
    if let Some(subject) = listing.subject {
        data["subject"] = json!(subject);
    }
    if let Some(teacher) = listing.teacher {
        data["teacher"] = json!(teacher);
    }
    Ok(Json(ApiResponse::with_message("Courses retrieved successfully", data)))
}

pub async fn get_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
    QueryParams(query): QueryParams<SelectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.catalog.get_visible(&user, id).await?;
    let course = select_fields(&view, &query.fields())?;
    Ok(Json(ApiResponse::ok(json!({ "course": course }))))
}

pub async fn create_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.catalog.create(&user, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Course created successfully",
            json!({ "course": course }),
        )),
    ))
}

pub async fn update_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<UpdateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.catalog.update(&user, id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Course updated successfully",
        json!({ "course": course }),
    )))
}

pub async fn delete_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete(&user, id).await?;
    Ok(Json(ApiResponse::message("Course deleted successfully")))
}

pub async fn my_courses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.catalog.my_courses(&user).await?;
    Ok(Json(ApiResponse::with_message(
        "My courses retrieved successfully",
        json!({ "courses": courses }),
    )))
}

pub async fn course_analytics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = state.catalog.analytics(&user, id).await?;
    Ok(Json(ApiResponse::with_message(
        "Course analytics retrieved successfully",
        json!({ "analytics": analytics }),
    )))
}

pub async fn enroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state.catalog.enroll(&user, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Successfully enrolled in the course",
            json!({ "enrollment": enrollment }),
        )),
    ))
}
