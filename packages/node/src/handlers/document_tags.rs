//! Document tag handlers: the document/tag association.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use yads::DocumentTag;
use yads_api::DocumentTagRequest;

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
    storage::DocumentTagFilter,
};

use super::{list_response, or_not_found, AppState};

/// Query parameters for `GET /document_tags`.
#[derive(Debug, Deserialize, Default)]
pub struct DocumentTagListParams {
    pub document: Option<String>,
    pub tag: Option<String>,
    pub after: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /document_tags`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<DocumentTagListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = DocumentTagFilter {
        document: params.document,
        tag: params.tag,
        page: state.page(params.after, params.limit),
    };
    Ok(list_response(state.storage.list_document_tags(&filter).await?))
}

/// `POST /document_tags`: 409 if the document already carries the tag.
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DocumentTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state.storage.get_document(&req.document).await?.is_none() {
        return Err(AppError::unknown_reference("document", &req.document));
    }
    if state.storage.get_tag(&req.tag).await?.is_none() {
        return Err(AppError::unknown_reference("tag", &req.tag));
    }
    let document_tag = req.into_document_tag();
    state.storage.put_document_tag(&document_tag).await?;
    Ok((StatusCode::CREATED, Json(document_tag)))
}

/// `GET /document_tags/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentTag>, AppError> {
    state
        .storage
        .get_document_tag(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("document tag", &id))
}

/// `DELETE /document_tags/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_document_tag(&id)
        .await
        .map_err(or_not_found("document tag", &id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::{app, call, create};

    #[tokio::test]
    async fn tag_a_document_once() {
        let app = app();
        let t = create(
            &app,
            "/document_types",
            json!({ "type": "note", "allowedAttributes": { "type": "object" } }),
        )
        .await;
        let doc = create(&app, "/documents", json!({ "documentType": t, "data": {} })).await;
        let tag = create(&app, "/tags", json!({ "name": "urgent" })).await;

        let body = json!({ "document": doc, "tag": tag });
        create(&app, "/document_tags", body.clone()).await;
        let (status, _) = call(&app, "POST", "/document_tags", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, json) = call(&app, "GET", &format!("/document_tags?tag={tag}"), None).await;
        assert_eq!(json["items"].as_array().unwrap().len(), 1);

        // Deleting the document removes its tags.
        call(&app, "DELETE", &format!("/documents/{doc}"), None).await;
        let (_, json) = call(&app, "GET", "/document_tags", None).await;
        assert!(json["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tag_is_400() {
        let app = app();
        let t = create(
            &app,
            "/document_types",
            json!({ "type": "note", "allowedAttributes": { "type": "object" } }),
        )
        .await;
        let doc = create(&app, "/documents", json!({ "documentType": t, "data": {} })).await;
        let (status, json) = call(
            &app,
            "POST",
            "/document_tags",
            Some(json!({ "document": doc, "tag": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "unknown_reference");
    }
}
