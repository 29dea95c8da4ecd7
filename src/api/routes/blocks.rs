//! 3D block catalog under `/blocks`

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::api::error::{ApiError, JsonBody, PathParam};
use crate::api::server::AppState;
use crate::blocks::DeleteRequest;

use super::ApiResponse;

pub async fn list_blocks(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let blocks = state.blocks.list().await?;
    Ok(Json(ApiResponse::ok(blocks)))
}

pub async fn get_block(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, ApiError> {
    let block = state.blocks.get(&id).await?;
    Ok(Json(ApiResponse::ok(block)))
}

pub async fn create_block(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let block = state.blocks.create(body).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(block))))
}

pub async fn update_block(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let block = state.blocks.update(body).await?;
    Ok(Json(ApiResponse::ok(block)))
}

/// Delete one block by `id` or several by `ids`.
///
/// A bulk request that deletes nothing answers 400 when some ids were
/// unusable and 404 when they simply did not exist.
pub async fn delete_blocks(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    match DeleteRequest::from_body(&body)? {
        DeleteRequest::Single(id) => {
            state.blocks.delete_one(id).await?;
            Ok(Json(ApiResponse::message(format!(
                "Block with ID {} successfully deleted",
                id
            )))
            .into_response())
        }
        DeleteRequest::Many(ids) => {
            let report = state.blocks.delete_many(&ids).await?;
            let status = match (report.nothing_deleted(), report.had_invalid_ids()) {
                (false, _) => StatusCode::OK,
                (true, true) => StatusCode::BAD_REQUEST,
                (true, false) => StatusCode::NOT_FOUND,
            };
            let mut body = ApiResponse::with_message(report.message(), &report);
            body.success = status.is_success();
            Ok((status, Json(body)).into_response())
        }
    }
}
