//! Graph rule handlers.
//!
//! A rule's four references (two document types, a graph type and an
//! optional role) must exist when it is written. The `(source, target,
//! graph type)` triple is unique; a second rule for it is a 409.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use yads::GraphRule;
use yads_api::GraphRuleRequest;

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
};

use super::{list_response, or_not_found, AppState, PageParams};

/// `GET /graph_rules`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.page(params.after, params.limit);
    Ok(list_response(state.storage.list_graph_rules(&page).await?))
}

/// `POST /graph_rules`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GraphRuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_references(&state, &req).await?;
    let rule = req.into_graph_rule();
    state.storage.put_graph_rule(&rule).await?;
    tracing::info!(
        id = %rule.id,
        source = %rule.document_type_source,
        target = %rule.document_type_target,
        graph_type = %rule.graph_type,
        "graph rule created"
    );
    Ok((StatusCode::CREATED, Json(rule)))
}

/// `GET /graph_rules/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GraphRule>, AppError> {
    state
        .storage
        .get_graph_rule(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("graph rule", &id))
}

/// `PUT /graph_rules/{id}`
///
/// Edges already stored are not re-checked against the changed rule.
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<GraphRuleRequest>,
) -> Result<Json<GraphRule>, AppError> {
    let mut rule = state
        .storage
        .get_graph_rule(&id)
        .await?
        .ok_or_else(|| AppError::not_found("graph rule", &id))?;
    check_references(&state, &req).await?;
    req.apply_to(&mut rule);
    state
        .storage
        .update_graph_rule(&rule)
        .await
        .map_err(or_not_found("graph rule", &id))?;
    Ok(Json(rule))
}

/// `DELETE /graph_rules/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_graph_rule(&id)
        .await
        .map_err(or_not_found("graph rule", &id))?;
    Ok(StatusCode::NO_CONTENT)
}

// --- helpers -----------------------------------------------------------------

async fn check_references(state: &AppState, req: &GraphRuleRequest) -> Result<(), AppError> {
    for (field, id) in [
        ("documentTypeSource", &req.document_type_source),
        ("documentTypeTarget", &req.document_type_target),
    ] {
        if state.storage.get_document_type(id).await?.is_none() {
            return Err(AppError::unknown_reference(field, id));
        }
    }
    if state.storage.get_graph_type(&req.graph_type).await?.is_none() {
        return Err(AppError::unknown_reference("graphType", &req.graph_type));
    }
    if let Some(role) = &req.role {
        if state.storage.get_role(role).await?.is_none() {
            return Err(AppError::unknown_reference("role", role));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, Router};
    use serde_json::{json, Value};

    use crate::handlers::test_support::{app, call, create};

    async fn refs(app: &Router) -> (String, String) {
        let t = create(
            app,
            "/document_types",
            json!({ "type": "group", "allowedAttributes": { "type": "object" } }),
        )
        .await;
        let gt = create(
            app,
            "/graph_types",
            json!({ "title": "contains", "graphType": "unidirectional" }),
        )
        .await;
        (t, gt)
    }

    fn rule(t: &str, gt: &str) -> Value {
        json!({ "documentTypeSource": t, "documentTypeTarget": t, "graphType": gt })
    }

    #[tokio::test]
    async fn duplicate_triple_conflicts() {
        let app = app();
        let (t, gt) = refs(&app).await;
        create(&app, "/graph_rules", rule(&t, &gt)).await;
        let (status, _) = call(&app, "POST", "/graph_rules", Some(rule(&t, &gt))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_references_are_400() {
        let app = app();
        let (t, gt) = refs(&app).await;

        let (status, json) = call(&app, "POST", "/graph_rules", Some(rule(&t, "nope"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "unknown_reference");

        let mut body = rule(&t, &gt);
        body["role"] = json!("nope");
        let (status, json) = call(&app, "POST", "/graph_rules", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("role"));
    }

    #[tokio::test]
    async fn rule_blocks_graph_type_delete() {
        let app = app();
        let (t, gt) = refs(&app).await;
        let id = create(&app, "/graph_rules", rule(&t, &gt)).await;

        let (status, _) = call(&app, "DELETE", &format!("/graph_types/{gt}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&app, "DELETE", &format!("/graph_rules/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &format!("/graph_types/{gt}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
