//! Tag handlers. Tags form a tree through `parentTag`.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use yads::{Tag, Violation};
use yads_api::{TagRequest, ViolationRecord};

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
};

use super::{list_response, or_not_found, AppState, PageParams};

/// `GET /tags`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.page(params.after, params.limit);
    Ok(list_response(state.storage.list_tags(&page).await?))
}

/// `POST /tags`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tag = req.into_tag();
    check_parent(&state, &tag).await?;
    state.storage.put_tag(&tag).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /tags/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, AppError> {
    state
        .storage
        .get_tag(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("tag", &id))
}

/// `PUT /tags/{id}`
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<TagRequest>,
) -> Result<Json<Tag>, AppError> {
    let mut tag = state
        .storage
        .get_tag(&id)
        .await?
        .ok_or_else(|| AppError::not_found("tag", &id))?;
    req.apply_to(&mut tag);
    check_parent(&state, &tag).await?;
    state
        .storage
        .update_tag(&tag)
        .await
        .map_err(or_not_found("tag", &id))?;
    Ok(Json(tag))
}

/// `DELETE /tags/{id}`: removes its document tags; child tags become roots.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_tag(&id)
        .await
        .map_err(or_not_found("tag", &id))?;
    Ok(StatusCode::NO_CONTENT)
}

// --- helpers -----------------------------------------------------------------

/// The parent must exist, and walking up from it must never reach `tag`.
async fn check_parent(state: &AppState, tag: &Tag) -> Result<(), AppError> {
    let Some(parent) = &tag.parent_tag else {
        return Ok(());
    };
    if state.storage.get_tag(parent).await?.is_none() {
        return Err(AppError::unknown_reference("parentTag", parent));
    }

    let mut seen = HashSet::new();
    let mut current = Some(parent.clone());
    while let Some(id) = current {
        if id == tag.id || !seen.insert(id.clone()) {
            return Err(AppError::unprocessable(
                "tag hierarchy would contain a cycle",
                vec![ViolationRecord::new(
                    "parentTag",
                    Violation::new("", format!("{parent} is {} or one of its descendants", tag.name)),
                )],
            ));
        }
        current = state.storage.get_tag(&id).await?.and_then(|t| t.parent_tag);
    }
    Ok(())
}
