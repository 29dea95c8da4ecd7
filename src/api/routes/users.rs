//! User directory under `/main/users`

use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};

use crate::api::error::{ApiError, PathParam, QueryParams};
use crate::api::server::AppState;
use crate::auth::{CurrentUser, UserInfo};
use crate::error::Error;

use super::{select_fields, ApiResponse, SelectQuery};

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    QueryParams(query): QueryParams<SelectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = query.fields();
    let users = state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(|user| select_fields(&UserInfo::from(user), &fields))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(ApiResponse::ok(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    PathParam(id): PathParam<i64>,
    QueryParams(query): QueryParams<SelectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("User".to_string()))?;
    let subjects = state.store.list_user_subjects(user.id).await?;
    let info = UserInfo::from(user).with_subjects(subjects);
    Ok(Json(ApiResponse::ok(select_fields(&info, &query.fields())?)))
}
