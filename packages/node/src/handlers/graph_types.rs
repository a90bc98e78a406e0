//! Graph type handlers. Graph types are reference data.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use yads::GraphType;
use yads_api::GraphTypeRequest;

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
};

use super::{list_response, or_not_found, AppState, PageParams};

/// `GET /graph_types`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.page(params.after, params.limit);
    Ok(list_response(state.storage.list_graph_types(&page).await?))
}

/// `POST /graph_types`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GraphTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let graph_type = req.into_graph_type();
    state.storage.put_graph_type(&graph_type).await?;
    tracing::info!(id = %graph_type.id, title = %graph_type.title, "graph type created");
    Ok((StatusCode::CREATED, Json(graph_type)))
}

/// `GET /graph_types/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GraphType>, AppError> {
    state
        .storage
        .get_graph_type(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("graph type", &id))
}

/// `PUT /graph_types/{id}`
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<GraphTypeRequest>,
) -> Result<Json<GraphType>, AppError> {
    let mut graph_type = state
        .storage
        .get_graph_type(&id)
        .await?
        .ok_or_else(|| AppError::not_found("graph type", &id))?;
    req.apply_to(&mut graph_type);
    state
        .storage
        .update_graph_type(&graph_type)
        .await
        .map_err(or_not_found("graph type", &id))?;
    Ok(Json(graph_type))
}

/// `DELETE /graph_types/{id}`: 409 while rules or edges use it.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_graph_type(&id)
        .await
        .map_err(or_not_found("graph type", &id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::{app, call, create};

    #[tokio::test]
    async fn create_replace_delete() {
        let app = app();
        let id = create(
            &app,
            "/graph_types",
            json!({ "title": "contains", "titleReverse": "contained in", "graphType": "unidirectional" }),
        )
        .await;

        let (status, json) = call(
            &app,
            "PUT",
            &format!("/graph_types/{id}"),
            Some(json!({ "title": "holds", "graphType": "bidirectional" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], "holds");
        assert_eq!(json["graphType"], "bidirectional");
        assert!(json.get("titleReverse").is_none());

        let (status, _) = call(&app, "DELETE", &format!("/graph_types/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/graph_types/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_direction_is_invalid_json() {
        let (status, json) = call(
            &app(),
            "POST",
            "/graph_types",
            Some(json!({ "title": "x", "graphType": "sideways" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "invalid_json");
    }
}
