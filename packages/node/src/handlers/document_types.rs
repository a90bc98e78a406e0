//! Document type handlers.
//!
//! A document type's `allowedAttributes` must compile as a schema before it
//! is stored; a schema that does not is reported as a 422 on the
//! `allowedAttributes` field rather than surfacing later as a 500 on every
//! document write.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use yads::{DocumentType, ResolutionError, Schema, Violation};
use yads_api::{DocumentTypeRequest, ViolationRecord};

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
};

use super::{list_response, merge_patch, or_not_found, AppState, PageParams};

/// `GET /document_types`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.page(params.after, params.limit);
    Ok(list_response(state.storage.list_document_types(&page).await?))
}

/// `POST /document_types`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DocumentTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_schema(&req.allowed_attributes)?;
    let document_type = req.into_document_type();
    state.storage.put_document_type(&document_type).await?;
    tracing::info!(id = %document_type.id, name = %document_type.type_name, "document type created");
    Ok((StatusCode::CREATED, Json(document_type)))
}

/// `GET /document_types/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentType>, AppError> {
    Ok(Json(fetch(&state, &id).await?))
}

/// `PUT /document_types/{id}`
///
/// Existing documents are not re-validated against the new schema; they are
/// checked the next time they are written.
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<DocumentTypeRequest>,
) -> Result<Json<DocumentType>, AppError> {
    let mut document_type = fetch(&state, &id).await?;
    check_schema(&req.allowed_attributes)?;
    req.apply_to(&mut document_type);
    store(&state, &document_type).await?;
    Ok(Json(document_type))
}

/// `PATCH /document_types/{id}`
///
/// The body is a merge patch over the request form; `allowedAttributes` is
/// merged recursively like any other object.
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<Value>,
) -> Result<Json<DocumentType>, AppError> {
    let mut document_type = fetch(&state, &id).await?;
    let req: DocumentTypeRequest = merge_patch(&DocumentTypeRequest::from(&document_type), &patch)?;
    check_schema(&req.allowed_attributes)?;
    req.apply_to(&mut document_type);
    store(&state, &document_type).await?;
    Ok(Json(document_type))
}

/// `DELETE /document_types/{id}`
///
/// Refused with 409 while documents or graph rules still use the type.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_document_type(&id)
        .await
        .map_err(or_not_found("document type", &id))?;
    state.schemas.invalidate(&id);
    Ok(StatusCode::NO_CONTENT)
}

// --- helpers -----------------------------------------------------------------

async fn fetch(state: &AppState, id: &str) -> Result<DocumentType, AppError> {
    state
        .storage
        .get_document_type(id)
        .await?
        .ok_or_else(|| AppError::not_found("document type", id))
}

async fn store(state: &AppState, document_type: &DocumentType) -> Result<(), AppError> {
    state
        .storage
        .update_document_type(document_type)
        .await
        .map_err(or_not_found("document type", &document_type.id))?;
    state.schemas.invalidate(&document_type.id);
    Ok(())
}

/// Reject a schema that does not compile.
fn check_schema(schema: &Value) -> Result<(), AppError> {
    match Schema::compile(schema) {
        Ok(_) => Ok(()),
        Err(ResolutionError::MalformedSchema { pointer, reason }) => Err(AppError::unprocessable(
            "allowedAttributes is not a usable schema",
            vec![ViolationRecord::new("allowedAttributes", Violation::new(pointer, reason))],
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::{app, call, create};

    fn note_type() -> serde_json::Value {
        json!({
            "type": "note",
            "allowedAttributes": {
                "type": "object",
                "properties": { "title": { "type": "string" } },
                "required": ["title"]
            },
            "defaults": ["title"]
        })
    }

    #[tokio::test]
    async fn create_and_get() {
        let app = app();
        let id = create(&app, "/document_types", note_type()).await;
        let (status, json) = call(&app, "GET", &format!("/document_types/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "note");
        assert_eq!(json["defaults"], json!(["title"]));
    }

    #[tokio::test]
    async fn malformed_schema_is_422_on_allowed_attributes() {
        let app = app();
        let (status, json) = call(
            &app,
            "POST",
            "/document_types",
            Some(json!({ "type": "bad", "allowedAttributes": { "type": "widget" } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["violations"][0]["field"], "allowedAttributes");
        assert_eq!(json["violations"][0]["path"], "/type");
    }

    #[tokio::test]
    async fn duplicate_type_name_conflicts() {
        let app = app();
        create(&app, "/document_types", note_type()).await;
        let (status, json) = call(&app, "POST", "/document_types", Some(note_type())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "conflict");
    }

    #[tokio::test]
    async fn patch_merges_schema() {
        let app = app();
        let id = create(&app, "/document_types", note_type()).await;
        let (status, json) = call(
            &app,
            "PATCH",
            &format!("/document_types/{id}"),
            Some(json!({
                "icon": "note",
                "allowedAttributes": { "properties": { "body": { "type": "string" } } }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["icon"], "note");
        assert_eq!(json["allowedAttributes"]["properties"]["title"]["type"], "string");
        assert_eq!(json["allowedAttributes"]["properties"]["body"]["type"], "string");
    }

    #[tokio::test]
    async fn delete_in_use_conflicts() {
        let app = app();
        let id = create(&app, "/document_types", note_type()).await;
        create(
            &app,
            "/documents",
            json!({ "documentType": id, "data": { "title": "T" } }),
        )
        .await;
        let (status, _) = call(&app, "DELETE", &format!("/document_types/{id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_unknown_is_404() {
        let (status, json) = call(&app(), "DELETE", "/document_types/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "not_found");
    }
}
