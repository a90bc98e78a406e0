//! Role handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use yads::Role;
use yads_api::RoleRequest;

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
};

use super::{list_response, or_not_found, AppState, PageParams};

/// `GET /roles`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.page(params.after, params.limit);
    Ok(list_response(state.storage.list_roles(&page).await?))
}

/// `POST /roles`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = req.into_role();
    state.storage.put_role(&role).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// `GET /roles/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Role>, AppError> {
    state
        .storage
        .get_role(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("role", &id))
}

/// `PUT /roles/{id}`
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RoleRequest>,
) -> Result<Json<Role>, AppError> {
    let mut role = state
        .storage
        .get_role(&id)
        .await?
        .ok_or_else(|| AppError::not_found("role", &id))?;
    req.apply_to(&mut role);
    state
        .storage
        .update_role(&role)
        .await
        .map_err(or_not_found("role", &id))?;
    Ok(Json(role))
}

/// `DELETE /roles/{id}`: 409 while rules or edges carry it.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_role(&id)
        .await
        .map_err(or_not_found("role", &id))?;
    Ok(StatusCode::NO_CONTENT)
}
