//! Graph edge handlers.
//!
//! Every write resolves the edge's references and then asks the graph rule
//! engine whether the edge may exist:
//!
//! 1. `documentSource`, `documentTarget`, `graphType` and `role` must name
//!    stored records (else 400 `unknown_reference`).
//! 2. The rule for `(type(source), type(target), graphType)` is looked up.
//! 3. [`yads::validate_edge`] decides; violations are a 422.
//!
//! Edges flagged `graphTypeReversed` pass step 3 unconditionally.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use yads::{
    validate_edge, DocumentType, EdgeCandidate, Graph, GraphType, ResolutionError, Violation,
};
use yads_api::{GraphRequest, ViolationRecord};

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
    storage::GraphFilter,
};

use super::{list_response, merge_patch, or_not_found, AppState};

/// Query parameters for `GET /graphs`.
#[derive(Debug, Deserialize, Default)]
pub struct GraphListParams {
    /// Include only edges with this document at either end.
    pub document: Option<String>,
    pub after: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /graphs`
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<GraphListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = GraphFilter {
        document: params.document,
        page: state.page(params.after, params.limit),
    };
    Ok(list_response(state.storage.list_graphs(&filter).await?))
}

/// `POST /graphs`
pub async fn create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GraphRequest>,
) -> Result<impl IntoResponse, AppError> {
    let graph = req.into_graph();
    check_edge(&state, &graph).await?;
    state.storage.put_graph(&graph).await?;
    tracing::debug!(
        id = %graph.id,
        source = %graph.document_source,
        target = %graph.document_target,
        "graph edge created"
    );
    Ok((StatusCode::CREATED, Json(graph)))
}

/// `GET /graphs/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Graph>, AppError> {
    Ok(Json(fetch(&state, &id).await?))
}

/// `PUT /graphs/{id}`
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<GraphRequest>,
) -> Result<Json<Graph>, AppError> {
    let mut graph = fetch(&state, &id).await?;
    req.apply_to(&mut graph);
    store(&state, &graph).await?;
    Ok(Json(graph))
}

/// `PATCH /graphs/{id}`: merge patch over the request form, then the same
/// checks as PUT.
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<Value>,
) -> Result<Json<Graph>, AppError> {
    let mut graph = fetch(&state, &id).await?;
    let req: GraphRequest = merge_patch(&GraphRequest::from(&graph), &patch)?;
    req.apply_to(&mut graph);
    store(&state, &graph).await?;
    Ok(Json(graph))
}

/// `DELETE /graphs/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .storage
        .delete_graph(&id)
        .await
        .map_err(or_not_found("graph", &id))?;
    Ok(StatusCode::NO_CONTENT)
}

// --- helpers -----------------------------------------------------------------

async fn fetch(state: &AppState, id: &str) -> Result<Graph, AppError> {
    state
        .storage
        .get_graph(id)
        .await?
        .ok_or_else(|| AppError::not_found("graph", id))
}

async fn store(state: &AppState, graph: &Graph) -> Result<(), AppError> {
    check_edge(state, graph).await?;
    state
        .storage
        .update_graph(graph)
        .await
        .map_err(or_not_found("graph", &graph.id))?;
    Ok(())
}

/// Resolve the edge's references and run the rule engine over it.
async fn check_edge(state: &AppState, graph: &Graph) -> Result<(), AppError> {
    let storage = &state.storage;

    let source = storage
        .get_document(&graph.document_source)
        .await?
        .ok_or_else(|| AppError::unknown_reference("documentSource", &graph.document_source))?;
    let target = storage
        .get_document(&graph.document_target)
        .await?
        .ok_or_else(|| AppError::unknown_reference("documentTarget", &graph.document_target))?;
    let graph_type = storage
        .get_graph_type(&graph.graph_type)
        .await?
        .ok_or_else(|| AppError::unknown_reference("graphType", &graph.graph_type))?;
    if let Some(role) = &graph.role {
        if storage.get_role(role).await?.is_none() {
            return Err(AppError::unknown_reference("role", role));
        }
    }

    // A stored document always has a stored type; a miss is a broken store.
    let source_type = storage
        .get_document_type(&source.document_type)
        .await?
        .ok_or_else(|| ResolutionError::MissingDocumentType(source.document_type.clone()))?;
    let target_type = storage
        .get_document_type(&target.document_type)
        .await?
        .ok_or_else(|| ResolutionError::MissingDocumentType(target.document_type.clone()))?;

    if graph.graph_type_reversed {
        tracing::debug!(id = %graph.id, "reversed edge accepted without a rule check");
    }

    let violations = rule_violations(state, graph, &graph_type, &source_type, &target_type).await?;
    if !violations.is_empty() {
        return Err(AppError::unprocessable(
            "edge is not permitted by the graph rules",
            ViolationRecord::for_edge(violations),
        ));
    }
    Ok(())
}

/// Run the rule engine over `graph` with its endpoints' types already
/// resolved.
pub(super) async fn rule_violations(
    state: &AppState,
    graph: &Graph,
    graph_type: &GraphType,
    source_type: &DocumentType,
    target_type: &DocumentType,
) -> Result<Vec<Violation>, AppError> {
    let rule = state
        .storage
        .find_graph_rule(&source_type.id, &target_type.id, &graph_type.id)
        .await?;
    let candidate = EdgeCandidate::for_graph(graph, source_type, target_type, graph_type);
    Ok(validate_edge(&candidate, &rule))
}
